//! Logging setup shared by the seeder binary and the test suites.

pub mod tracing;
