use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::progress::ProgressSink;

/// Progress sink that counts increments and keeps every logged message.
///
/// Clones share their state.
#[derive(Debug, Clone, Default)]
pub struct CountingProgress {
    count: Arc<AtomicU64>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ProgressSink for CountingProgress {
    fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn log(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
