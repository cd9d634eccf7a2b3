//! Stores receiving the generated hierarchy.
//!
//! Every store exposes the same three insert operations through [`Store`]. SQL stores also know
//! how to create their schema and how to read the hierarchy back with different strategies.

mod base;
pub mod memory;
pub mod mysql;
pub mod postgres;
pub mod read;

pub use base::{RowCounts, Store};
