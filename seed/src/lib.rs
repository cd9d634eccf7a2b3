//! Concurrent generation and ingestion of synthetic forum data.
//!
//! Three record generators feed a single hierarchy assembler which emits insert commands to two
//! ingestion workers, one per store. A coordinator owns cancellation and returns the first error
//! recorded by any unit.

pub mod concurrency;
pub mod error;
pub mod generator;
mod macros;
pub mod pipeline;
pub mod progress;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
