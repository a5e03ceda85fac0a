//! Coarse progress reporting for long runs.
//!
//! Purely observational: nothing a sink does can change a run's outcome.

/// Receives `(current_index, total_count)` updates, per page or per job.
pub trait ProgressSink: Send + Sync {
    /// A new stage of the run started.
    fn stage(&self, _stage: &str) {}

    fn progress(&self, current: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn progress(&self, current: usize, total: usize) {
        self(current, total)
    }
}

/// Sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn progress(&self, _current: usize, _total: usize) {}
}
