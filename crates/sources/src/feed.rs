//! Delivery feed between sensor sources and the engine loop
//!
//! Source threads push events into a bounded channel through a shared
//! callback; the engine loop drains the other end. The overflow policy
//! decides whether a full channel drops the event or blocks the producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{FeedSettings, OverflowPolicy, SourceCallback, SourceEvent};
use tracing::{trace, warn};

/// Delivery feed
///
/// Fans events from every source of a rig into one bounded channel. The
/// callback handed to sources is cheap to clone and never panics on a
/// full or closed channel.
pub struct SampleFeed {
    tx: Sender<SourceEvent>,
    rx: Option<Receiver<SourceEvent>>,
    metrics: Arc<FeedMetrics>,
    overflow: OverflowPolicy,
}

impl SampleFeed {
    /// Create a feed with the given channel capacity and the default
    /// drop-newest overflow policy.
    pub fn new(capacity: usize) -> Self {
        Self::with_settings(&FeedSettings {
            capacity,
            overflow: OverflowPolicy::default(),
        })
    }

    /// Create a feed from blueprint settings.
    pub fn with_settings(settings: &FeedSettings) -> Self {
        let (tx, rx) = bounded(settings.capacity.max(1));

        Self {
            tx,
            rx: Some(rx),
            metrics: Arc::new(FeedMetrics::new()),
            overflow: settings.overflow,
        }
    }

    /// Callback to connect to a source.
    pub fn callback(&self) -> SourceCallback {
        let tx = self.tx.clone();
        let metrics = self.metrics.clone();
        let overflow = self.overflow;

        Arc::new(move |event| send_event(&tx, event, &metrics, overflow))
    }

    /// Get the event receiver
    ///
    /// Note: Can only be called once, subsequent calls return None.
    /// Closing (or dropping) the receiver fails pending sends, which
    /// releases producers parked by the block policy; do that before
    /// joining source threads.
    pub fn take_receiver(&mut self) -> Option<Receiver<SourceEvent>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<FeedMetrics> {
        self.metrics.clone()
    }
}

/// Send an event, handling the overflow policy
#[inline]
fn send_event(
    tx: &Sender<SourceEvent>,
    event: SourceEvent,
    metrics: &FeedMetrics,
    overflow: OverflowPolicy,
) {
    metrics.record_received();
    metrics::counter!("motion_syncer_feed_events_total", "kind" => event.kind().as_str())
        .increment(1);

    match overflow {
        OverflowPolicy::DropNewest => match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                metrics.record_dropped();
                metrics::counter!(
                    "motion_syncer_feed_dropped_total",
                    "kind" => event.kind().as_str()
                )
                .increment(1);
                trace!(kind = %event.kind(), "event dropped (feed full)");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("feed channel closed");
            }
        },
        OverflowPolicy::Block => {
            if tx.send_blocking(event).is_err() {
                warn!("feed channel closed");
            }
        }
    }
}

/// Feed metrics
#[derive(Debug, Default)]
pub struct FeedMetrics {
    /// Total events received from sources
    pub events_received: AtomicU64,

    /// Total events dropped at the channel
    pub events_dropped: AtomicU64,
}

impl FeedMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record event received
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record event dropped
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Feed metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedSnapshot {
    /// Total events received from sources
    pub events_received: u64,

    /// Total events dropped at the channel
    pub events_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Accuracy, Measurement, SensorKind};

    fn sample_event(ts: i64) -> SourceEvent {
        SourceEvent::Sample {
            kind: SensorKind::Accelerometer,
            measurement: Measurement::vector(1.0, 0.0, 0.0, ts, Accuracy::High),
            position: ts as u64,
        }
    }

    #[test]
    fn feed_passes_events_through() {
        let mut feed = SampleFeed::new(8);
        let callback = feed.callback();
        let rx = feed.take_receiver().unwrap();

        callback(sample_event(1));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), SensorKind::Accelerometer);
        assert_eq!(feed.metrics().snapshot().events_received, 1);
        assert_eq!(feed.metrics().snapshot().events_dropped, 0);
    }

    #[test]
    fn take_receiver_once() {
        let mut feed = SampleFeed::new(8);
        assert!(feed.take_receiver().is_some());
        assert!(feed.take_receiver().is_none());
    }

    #[test]
    fn drop_newest_counts_overflow() {
        let mut feed = SampleFeed::new(1);
        let callback = feed.callback();
        let _rx = feed.take_receiver().unwrap();

        callback(sample_event(1));
        callback(sample_event(2));
        callback(sample_event(3));

        let snapshot = feed.metrics().snapshot();
        assert_eq!(snapshot.events_received, 3);
        assert_eq!(snapshot.events_dropped, 2);
    }

    #[test]
    fn blocked_producer_unblocks_when_receiver_closes() {
        let mut feed = SampleFeed::with_settings(&FeedSettings {
            capacity: 1,
            overflow: OverflowPolicy::Block,
        });
        let callback = feed.callback();
        let rx = feed.take_receiver().unwrap();

        // Fill the channel, then park a producer on the next send
        callback(sample_event(1));
        let producer = std::thread::spawn(move || {
            callback(sample_event(2));
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        rx.close();

        // Without the close this join would never return
        producer.join().unwrap();
    }

    #[test]
    fn closed_feed_does_not_panic() {
        let mut feed = SampleFeed::new(1);
        let callback = feed.callback();
        drop(feed.take_receiver());

        callback(sample_event(1));
        assert_eq!(feed.metrics().snapshot().events_dropped, 0);
    }
}
