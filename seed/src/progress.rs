//! Progress reporting for the ingestion workers.
//!
//! Each worker owns one [`ProgressSink`] and calls [`ProgressSink::increment`] once per applied
//! command. Sinks are observational only and cannot fail.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Observer of the progress of one ingestion worker.
pub trait ProgressSink: Send + Sync + 'static {
    /// Records one applied command.
    fn increment(&self);

    /// Emits a free-form status line.
    fn log(&self, message: &str);
}

impl<P> ProgressSink for Arc<P>
where
    P: ProgressSink + ?Sized,
{
    fn increment(&self) {
        (**self).increment()
    }

    fn log(&self, message: &str) {
        (**self).log(message)
    }
}

const BAR_TEMPLATE: &str =
    "{prefix:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({per_sec}, eta {eta})";

/// Terminal progress bar backed by `indicatif`.
#[derive(Debug, Clone)]
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// Adds a bar to `multi` expecting `total` commands.
    pub fn new(multi: &MultiProgress, name: &str, total: u64) -> Self {
        let bar = multi.add(ProgressBar::new(total));
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(name.to_string());

        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Stops redrawing and leaves the final state on screen.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressSink for ProgressBarSink {
    fn increment(&self) {
        self.bar.inc(1);
    }

    fn log(&self, message: &str) {
        self.bar.println(message);
    }
}

/// Progress sink that reports through `tracing` every `every` commands.
///
/// Used when no terminal is attached, e.g. in production runs with JSON logs.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    total: u64,
    every: u64,
    applied: AtomicU64,
}

impl LogProgress {
    pub fn new(name: impl Into<String>, total: u64, every: u64) -> Self {
        Self {
            name: name.into(),
            total,
            every: every.max(1),
            applied: AtomicU64::new(0),
        }
    }

    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }
}

impl ProgressSink for LogProgress {
    fn increment(&self) {
        let applied = self.applied.fetch_add(1, Ordering::Relaxed) + 1;
        if applied % self.every == 0 || applied == self.total {
            info!(store = %self.name, applied, total = self.total, "ingestion progress");
        }
    }

    fn log(&self, message: &str) {
        info!(store = %self.name, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_progress_counts_increments() {
        let progress = LogProgress::new("a", 3, 0);

        progress.increment();
        progress.increment();
        progress.log("halfway");

        assert_eq!(progress.applied(), 2);
    }

    #[test]
    fn progress_bar_sink_advances_position() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let sink = Arc::new(ProgressBarSink::new(&multi, "postgres", 14));

        sink.increment();
        sink.increment();
        sink.finish();

        assert_eq!(sink.position(), 2);
    }
}
