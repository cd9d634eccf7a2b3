//! Shorthand for building and returning [`crate::error::SeedError`] values.

/// Builds a [`crate::error::SeedError`] from a kind, a static description and an optional
/// detail and source.
///
/// ```ignore
/// let err = seed_error!(ErrorKind::GenerationFailed, "Record source failed", level);
/// let err = seed_error!(ErrorKind::StoreInsertFailed, "Insert failed", source: io_err);
/// ```
#[macro_export]
macro_rules! seed_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::SeedError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::SeedError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::SeedError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::SeedError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Returns early with a [`crate::error::SeedError`] built by [`seed_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::seed_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::seed_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::seed_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::seed_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
