//! Progress reporting for corpus traversal.

use core::fmt;
use std::path::Path;

use tracing::info;

/// Snapshot of a traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusProgress {
    /// Groups entered so far.
    pub groups: usize,
    /// Documents picked up, counted before loading.
    pub documents: usize,
    /// Token sequences handed to the consumer.
    pub yielded: usize,
    /// Documents skipped because the loader returned no text.
    pub empty: usize,
    /// Documents skipped because the loader failed.
    pub failed: usize,
}

impl fmt::Display for CorpusProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} groups, {} documents ({} yielded, {} empty, {} failed)",
            self.groups, self.documents, self.yielded, self.empty, self.failed
        )
    }
}

/// Receives progress signals from a [`CorpusStream`](super::CorpusStream).
///
/// All methods default to no-ops.
pub trait ProgressObserver {
    /// A group directory is about to be read.
    fn on_group(&mut self, _group: &Path, _progress: &CorpusProgress) {}

    /// Another `progress_interval` documents have been processed.
    fn on_progress(&mut self, _progress: &CorpusProgress) {}

    /// Traversal ended, either exhausted or stopped by an error.
    fn on_finish(&mut self, _progress: &CorpusProgress) {}
}

impl<P: ProgressObserver + ?Sized> ProgressObserver for &mut P {
    fn on_group(&mut self, group: &Path, progress: &CorpusProgress) {
        (**self).on_group(group, progress);
    }

    fn on_progress(&mut self, progress: &CorpusProgress) {
        (**self).on_progress(progress);
    }

    fn on_finish(&mut self, progress: &CorpusProgress) {
        (**self).on_finish(progress);
    }
}

/// Discards every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Logs progress through `tracing` at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_group(&mut self, group: &Path, progress: &CorpusProgress) {
        info!(
            group = %group.display(),
            documents = progress.documents,
            "reading group"
        );
    }

    fn on_progress(&mut self, progress: &CorpusProgress) {
        info!(documents = progress.documents, "processed {}", progress.documents);
    }

    fn on_finish(&mut self, progress: &CorpusProgress) {
        info!(%progress, "corpus finished");
    }
}
