//! Sources of synthetic records.
//!
//! A [`RecordSource`] is a lazy, unbounded sequence of records for one level of the hierarchy.
//! Sources are driven by generator workers which push their output into bounded queues.

mod lorem;

pub use lorem::LoremSource;

use crate::error::SeedResult;
use crate::types::{RecordLevel, SyntheticRecord};

/// Lazy, unbounded producer of records for a single level.
///
/// A source is pulled from one generator task only and is never restarted. An error ends the
/// generator and fails the run.
pub trait RecordSource: Send + 'static {
    fn next_record(&mut self) -> SeedResult<SyntheticRecord>;
}

impl RecordSource for Box<dyn RecordSource> {
    fn next_record(&mut self) -> SeedResult<SyntheticRecord> {
        (**self).next_record()
    }
}

/// One source per hierarchy level.
pub struct RecordSources {
    pub containers: Box<dyn RecordSource>,
    pub groups: Box<dyn RecordSource>,
    pub items: Box<dyn RecordSource>,
}

impl RecordSources {
    /// Lorem ipsum sources seeded from the operating system.
    pub fn lorem() -> Self {
        Self {
            containers: Box::new(LoremSource::new(RecordLevel::Container)),
            groups: Box::new(LoremSource::new(RecordLevel::Group)),
            items: Box::new(LoremSource::new(RecordLevel::Item)),
        }
    }

    /// Lorem ipsum sources with deterministic text, one derived seed per level.
    ///
    /// Ids are still random v4 UUIDs.
    pub fn lorem_with_seed(seed: u64) -> Self {
        Self {
            containers: Box::new(LoremSource::with_seed(RecordLevel::Container, seed)),
            groups: Box::new(LoremSource::with_seed(RecordLevel::Group, seed.wrapping_add(1))),
            items: Box::new(LoremSource::with_seed(RecordLevel::Item, seed.wrapping_add(2))),
        }
    }
}

impl std::fmt::Debug for RecordSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSources").finish_non_exhaustive()
    }
}
