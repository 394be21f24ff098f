//! Progress reporting
//!
//! The `Reconciler` reports the fraction of processed entries to a
//! [`ProgressSink`] once per entry, on its own task. Sinks must return
//! quickly. Delivering progress to another thread or an interactive surface
//! is the sink's job, e.g. through [`WatchProgress`].

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Receiver of batch progress
///
/// `fraction` is in `[0.0, 1.0]`, non-decreasing within one batch, and
/// exactly `1.0` after the last entry of a non-empty batch.
pub trait ProgressSink: Send + Sync {
    /// Called once per processed entry
    fn report(&self, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, fraction: f64) {
        self(fraction)
    }
}

/// Sink that discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _fraction: f64) {}
}

/// Sink that publishes the latest fraction on a watch channel
///
/// Readers only ever see the most recent value, so a slow reader can never
/// stall the batch.
#[derive(Debug)]
pub struct WatchProgress {
    tx: watch::Sender<f64>,
}

impl WatchProgress {
    /// Create a sink starting at `0.0`
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self { tx }
    }

    /// Most recently reported fraction
    pub fn latest(&self) -> f64 {
        *self.tx.borrow()
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }

    /// Subscribe to progress updates as a stream
    pub fn stream(&self) -> WatchStream<f64> {
        WatchStream::new(self.tx.subscribe())
    }
}

impl Default for WatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for WatchProgress {
    fn report(&self, fraction: f64) {
        // send_replace stores the value even with no live receivers
        self.tx.send_replace(fraction);
    }
}

/// Progress fraction after `processed` of `total` entries
pub(crate) fn fraction(processed: usize, total: usize) -> f64 {
    if total == 0 || processed >= total {
        1.0
    } else {
        processed as f64 / total as f64
    }
}
