use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A bounded queue was configured with zero capacity.
    #[error("`{0}` must be greater than zero")]
    ZeroQueueCapacity(&'static str),
    /// A connection pool was configured with zero connections.
    #[error("`max_connections` cannot be zero for store `{0}`")]
    ZeroMaxConnections(&'static str),
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// MySQL TLS is enabled but only one half of the client key pair is set.
    #[error("Invalid MySQL TLS config: `client_cert_path` and `client_key_path` must be set together")]
    IncompleteClientCertificate,
    /// The seed shape yields more records than fit in a `u64`.
    #[error("seed shape is too large: the total number of records overflows a u64")]
    ShapeTooLarge,
}
