use crate::bail;
use crate::error::{ErrorKind, SeedResult};
use crate::generator::{LoremSource, RecordSource};
use crate::types::{RecordLevel, SyntheticRecord};

/// Record source that yields `succeed` lorem records and then fails on every call.
#[derive(Debug)]
pub struct FailingSource {
    level: RecordLevel,
    inner: LoremSource,
    remaining: u64,
}

impl FailingSource {
    pub fn new(level: RecordLevel, succeed: u64) -> Self {
        Self {
            level,
            inner: LoremSource::with_seed(level, 7),
            remaining: succeed,
        }
    }
}

impl RecordSource for FailingSource {
    fn next_record(&mut self) -> SeedResult<SyntheticRecord> {
        if self.remaining == 0 {
            bail!(
                ErrorKind::GenerationFailed,
                "Record source exhausted",
                format!("injected failure for level {}", self.level)
            );
        }

        self.remaining -= 1;
        self.inner.next_record()
    }
}
