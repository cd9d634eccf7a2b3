//! Error types and result definitions for seed runs.
//!
//! Provides a classified error type carrying captured diagnostic metadata. A run reports exactly
//! one [`SeedError`]: the first failure recorded by any pipeline unit.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for seed operations using [`SeedError`] as the error type.
pub type SeedResult<T> = Result<T, SeedError>;

/// Detailed payload stored for every [`SeedError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for seed operations.
///
/// Errors are cheap to clone so the first failure of a run can be stored once and handed back to
/// the caller after every unit has been joined.
#[derive(Debug, Clone)]
pub struct SeedError {
    payload: ErrorPayload,
}

/// Categories of errors that can occur during a seed run.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Generation Errors
    GenerationFailed,

    // Store Errors
    StoreConnectionFailed,
    StoreInsertFailed,
    StoreConstraintViolation,
    StoreQueryFailed,

    // Data Errors
    InvalidData,
    SerializationError,
    DeserializationError,

    // Configuration Errors
    ConfigError,

    // IO Errors
    IoError,

    // Run & Worker Errors
    RunCancelled,
    GeneratorPanic,
    AssemblerPanic,
    IngestWorkerPanic,

    // Unknown / Uncategorized
    Unknown,
}

impl SeedError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Re-tags the error with another kind, keeping every other piece of metadata.
    ///
    /// Stores use this to report driver failures as insert failures while preserving constraint
    /// violations and connection failures.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.payload.kind = kind;
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        SeedError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }
}

impl PartialEq for SeedError {
    fn eq(&self, other: &SeedError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl Eq for SeedError {}

impl Hash for SeedError {
    /// Hashes only the kind and static description so repeated occurrences group together.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.kind.hash(state);
        self.payload.description.hash(state);
    }
}

impl fmt::Display for SeedError {
    /// Renders `[Kind] description @ file:line:col`, followed by the indented detail and, when
    /// one was captured, the backtrace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ErrorPayload {
            kind,
            description,
            detail,
            location,
            backtrace,
            ..
        } = &self.payload;

        write!(f, "[{kind:?}] {description} @ {location}")?;

        if let Some(detail) = detail {
            write_indented(f, "Detail", detail)?;
        }
        if backtrace.status() == BacktraceStatus::Captured {
            write_indented(f, "Backtrace", &backtrace.to_string())?;
        }

        Ok(())
    }
}

impl error::Error for SeedError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, label: &str, text: &str) -> fmt::Result {
    write!(f, "\n  {label}:")?;
    for line in text.lines() {
        write!(f, "\n    {}", line.trim_end())?;
    }

    Ok(())
}

/// Creates a [`SeedError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SeedError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SeedError {
        SeedError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`SeedError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for SeedError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SeedError {
        SeedError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`SeedError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for SeedError {
    #[track_caller]
    fn from(err: std::io::Error) -> SeedError {
        let detail = err.to_string();
        SeedError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`SeedError`].
///
/// Syntax, data and EOF failures map to [`ErrorKind::DeserializationError`] since the seeder only
/// parses JSON documents produced by the read strategies.
impl From<serde_json::Error> for SeedError {
    #[track_caller]
    fn from(err: serde_json::Error) -> SeedError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        SeedError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`SeedError`] with the appropriate error kind.
///
/// Database errors are classified through [`sqlx::error::DatabaseError::kind`] so that key and
/// null violations surface as [`ErrorKind::StoreConstraintViolation`] for both Postgres and
/// MySQL. Transport and pool failures map to [`ErrorKind::StoreConnectionFailed`].
impl From<sqlx::Error> for SeedError {
    #[track_caller]
    fn from(err: sqlx::Error) -> SeedError {
        let (kind, description) = match &err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation => (
                    ErrorKind::StoreConstraintViolation,
                    "Store constraint violated",
                ),
                _ => (ErrorKind::StoreQueryFailed, "Store query failed"),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed => (
                ErrorKind::StoreConnectionFailed,
                "Store connection failed",
            ),
            sqlx::Error::Configuration(_) => {
                (ErrorKind::ConfigError, "Store configuration is invalid")
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => (
                ErrorKind::DeserializationError,
                "Store value could not be decoded",
            ),
            _ => (ErrorKind::StoreQueryFailed, "Store operation failed"),
        };

        let detail = err.to_string();
        SeedError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn display_includes_kind_description_and_detail() {
        let err = SeedError::from((
            ErrorKind::GenerationFailed,
            "Record source failed",
            "item source exhausted",
        ));

        let rendered = err.to_string();

        assert!(rendered.starts_with("[GenerationFailed] Record source failed @ "));
        assert!(rendered.contains("Detail:\n    item source exhausted"));
    }

    #[test]
    fn equality_and_hash_ignore_detail() {
        let first = SeedError::from((ErrorKind::StoreInsertFailed, "Insert failed", "a"));
        let second = SeedError::from((ErrorKind::StoreInsertFailed, "Insert failed", "b"));

        assert_eq!(first, second);

        let mut set = HashSet::new();
        set.insert(first);
        set.insert(second);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn with_kind_preserves_detail() {
        let err = SeedError::from((ErrorKind::StoreQueryFailed, "Query failed", "timeout"))
            .with_kind(ErrorKind::StoreInsertFailed);

        assert_eq!(err.kind(), ErrorKind::StoreInsertFailed);
        assert_eq!(err.detail(), Some("timeout"));
    }

    #[test]
    fn pool_timeout_is_a_connection_failure() {
        let err = SeedError::from(sqlx::Error::PoolTimedOut);

        assert_eq!(err.kind(), ErrorKind::StoreConnectionFailed);
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let err: SeedError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }
}
