//! Progress reporting.
//!
//! A `ProgressSink` forwards percentages for one request to the caller. Values never
//! regress, and 100 is reserved for `complete`, which the coordinator calls only once a
//! request has succeeded.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

const IN_FLIGHT_MAX: u8 = 99;
const DONE: u8 = 100;

type ProgressCallback = dyn Fn(u8) + Send + Sync;

#[derive(Clone)]
pub struct ProgressSink {
    last: Arc<Mutex<Option<u8>>>,
    callback: Arc<ProgressCallback>,
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("last", &self.current())
            .finish()
    }
}

impl ProgressSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        Self {
            last: Arc::new(Mutex::new(None)),
            callback: Arc::new(callback),
        }
    }

    /// Sink that drops every report.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Sink feeding an unbounded channel, for callers consuming progress on another task.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self::new(move |percent| {
            // Receiver gone means nobody is listening any more.
            let _ = tx.send(percent);
        });
        (sink, rx)
    }

    /// Report an in-flight percentage.
    ///
    /// Clamped to 99 and to the last reported value; the callback only fires when the
    /// value actually advances (or on the very first report).
    pub fn report(&self, percent: u8) {
        self.advance(percent.min(IN_FLIGHT_MAX));
    }

    /// Report `fraction` (0.0..=1.0) of the band between `start` and `end`.
    pub fn report_fraction(&self, start: u8, end: u8, fraction: f64) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let span = end.saturating_sub(start) as f64;
        self.report(start.saturating_add((span * fraction).round() as u8));
    }

    /// Mark the request as successfully finished (100).
    pub fn complete(&self) {
        self.advance(DONE);
    }

    /// Last value passed to the callback.
    pub fn current(&self) -> Option<u8> {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn advance(&self, percent: u8) {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let advances = match *last {
            None => true,
            Some(prev) => percent > prev,
        };
        if advances {
            *last = Some(percent);
            // Called under the lock so concurrent reporters cannot reorder deliveries.
            (self.callback)(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressSink, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            ProgressSink::new(move |p| seen.lock().unwrap().push(p))
        };
        (sink, seen)
    }

    #[test]
    fn test_first_report_fires_at_zero() {
        let (sink, seen) = recording();
        sink.report(0);
        sink.report(0);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_never_regresses() {
        let (sink, seen) = recording();
        for p in [0, 10, 40, 30, 40, 70, 20, 90] {
            sink.report(p);
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 10, 40, 70, 90]);
        assert_eq!(sink.current(), Some(90));
    }

    #[test]
    fn test_hundred_is_reserved_for_complete() {
        let (sink, seen) = recording();
        sink.report(10);
        sink.report(100);
        sink.report(250);
        assert_eq!(sink.current(), Some(99));
        sink.complete();
        sink.complete();
        sink.report(50);
        assert_eq!(*seen.lock().unwrap(), vec![10, 99, 100]);
    }

    #[test]
    fn test_report_fraction_maps_into_band() {
        let (sink, seen) = recording();
        sink.report_fraction(50, 90, 0.0);
        sink.report_fraction(50, 90, 0.5);
        sink.report_fraction(50, 90, 2.0);
        sink.report_fraction(50, 90, f64::NAN);
        assert_eq!(*seen.lock().unwrap(), vec![50, 70, 90]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.report(0);
        sink.report(42);
        sink.complete();
        drop(sink);

        let mut received = Vec::new();
        while let Some(p) = rx.recv().await {
            received.push(p);
        }
        assert_eq!(received, vec![0, 42, 100]);
    }

    #[test]
    fn test_clones_share_state() {
        let (sink, seen) = recording();
        let other = sink.clone();
        sink.report(60);
        other.report(30);
        other.report(61);
        assert_eq!(*seen.lock().unwrap(), vec![60, 61]);
    }
}
