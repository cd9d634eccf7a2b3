//! The units of a seed run.
//!
//! Each unit runs in its own task and is observed through a handle whose `wait` turns a panic
//! into a classified [`crate::error::SeedError`].

pub mod assembler;
pub mod base;
pub mod generator;
pub mod ingest;
