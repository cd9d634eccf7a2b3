use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::postgres::{PgConnectOptions as SqlxConnectOptions, PgSslMode as SqlxSslMode};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::shared::ValidationError;

const APP_NAME_SEEDER: &str = "seeder";

/// Session settings applied to every Postgres connection opened by the seeder.
///
/// Statements are not time limited since a seed run issues millions of small inserts and the
/// read strategies may aggregate large JSON documents.
pub static SEED_PG_OPTIONS: LazyLock<PgConnectionOptions> = LazyLock::new(|| PgConnectionOptions {
    datestyle: "ISO".to_string(),
    client_encoding: "UTF8".to_string(),
    timezone: "UTC".to_string(),
    statement_timeout: 0,
    lock_timeout: 30_000,
    application_name: APP_NAME_SEEDER.to_string(),
});

#[derive(Debug, Clone)]
pub struct PgConnectionOptions {
    pub datestyle: String,
    pub client_encoding: String,
    pub timezone: String,
    pub statement_timeout: u32,
    pub lock_timeout: u32,
    pub application_name: String,
}

impl PgConnectionOptions {
    /// Startup parameters in the form expected by [`SqlxConnectOptions::options`].
    pub fn to_key_value_pairs(&self) -> Vec<(String, String)> {
        [
            ("datestyle", self.datestyle.clone()),
            ("client_encoding", self.client_encoding.clone()),
            ("timezone", self.timezone.clone()),
            ("statement_timeout", self.statement_timeout.to_string()),
            ("lock_timeout", self.lock_timeout.to_string()),
            ("application_name", self.application_name.clone()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
    }
}

/// Configuration for connecting to a Postgres database.
///
/// This intentionally does not implement [`Serialize`] to avoid leaking the password.
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    #[serde(default = "TlsConfig::disabled")]
    pub tls: TlsConfig,
}

/// TLS settings for Postgres connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }

    /// Checks that root certificates are present whenever TLS is enabled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Converts a connection configuration into sqlx connect options for its database.
pub trait IntoConnectOptions<Output> {
    /// `session` settings are sent as startup parameters when given.
    fn with_db(&self, session: Option<&PgConnectionOptions>) -> Output;
}

impl IntoConnectOptions<SqlxConnectOptions> for PgConnectionConfig {
    fn with_db(&self, session: Option<&PgConnectionOptions>) -> SqlxConnectOptions {
        let mut options = SqlxConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.name);

        options = match &self.password {
            Some(password) => options.password(password.expose_secret()),
            None => options,
        };

        options = if self.tls.enabled {
            options
                .ssl_mode(SqlxSslMode::VerifyFull)
                .ssl_root_cert_from_pem(self.tls.trusted_root_certs.as_bytes().to_vec())
        } else {
            options.ssl_mode(SqlxSslMode::Prefer)
        };

        match session {
            Some(session) => options.options(session.to_key_value_pairs()),
            None => options,
        }
    }
}

/// Configuration for connecting to a MySQL database.
///
/// This intentionally does not implement [`Serialize`] to avoid leaking the password.
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    #[serde(default)]
    pub tls: MySqlTlsConfig,
}

/// TLS settings for MySQL connections.
///
/// Server certificates are not verified against a hostname; the CA only scopes which servers are
/// accepted, matching managed MySQL offerings that hand out self-signed server certificates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MySqlTlsConfig {
    #[serde(default)]
    pub enabled: bool,
    pub ca_cert_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
}

impl MySqlTlsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.client_cert_path.is_some() != self.client_key_path.is_some() {
            return Err(ValidationError::IncompleteClientCertificate);
        }

        Ok(())
    }
}

impl MySqlConnectionConfig {
    /// Creates MySQL connect options for the configured database.
    pub fn with_db(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.name);

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        if !self.tls.enabled {
            return options.ssl_mode(MySqlSslMode::Preferred);
        }

        options = options.ssl_mode(MySqlSslMode::Required);
        if let Some(ca_cert_path) = &self.tls.ca_cert_path {
            options = options.ssl_ca(ca_cert_path);
        }
        if let (Some(cert), Some(key)) = (&self.tls.client_cert_path, &self.tls.client_key_path) {
            options = options.ssl_client_cert(cert).ssl_client_key(key);
        }

        options
    }
}
