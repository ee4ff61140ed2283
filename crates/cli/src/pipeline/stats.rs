//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::SensorKind;
use observability::SyncAggregator;
use sync_engine::SyncStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total samples drained from the delivery feed
    pub samples_received: u64,

    /// Total synced measurements emitted by the engine
    pub synced_emitted: u64,

    /// Synced measurements dropped because the dispatcher queue was full
    pub synced_dropped: u64,

    /// Events the feed dropped before the engine loop saw them
    pub feed_dropped: u64,

    /// Engine counters captured at shutdown
    pub engine: SyncStats,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sensor sources that were active
    pub active_sources: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Emission statistics aggregator
    pub sync_metrics: SyncAggregator,
}

impl PipelineStats {
    /// Calculate synced measurements per second throughput
    pub fn rate_hz(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.synced_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate dispatch drop rate as percentage
    #[allow(dead_code)]
    pub fn drop_rate(&self) -> f64 {
        let total = self.synced_emitted + self.synced_dropped;
        if total > 0 {
            (self.synced_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Samples received: {}", self.samples_received);
        println!("   ├─ Synced measurements: {}", self.synced_emitted);
        println!("   ├─ Sync rate: {:.2} Hz", self.rate_hz());
        println!("   ├─ Dropped at dispatch: {}", self.synced_dropped);
        println!("   ├─ Dropped at feed: {}", self.feed_dropped);
        println!("   ├─ Active sources: {}", self.active_sources);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\n📈 Sync Engine Metrics");
        println!("   ├─ Alignment attempts: {}", self.engine.processed);
        println!("   ├─ Incomplete windows: {}", self.engine.incomplete);
        println!("   ├─ Missing slots: {}", self.engine.missing_slots);
        println!("   ├─ Skipped while busy: {}", self.engine.skipped_busy);
        println!("   ├─ Stale evicted: {}", self.engine.stale_evicted);
        println!("   ├─ Buffer overflows: {}", self.engine.overflow_count);
        println!("   └─ Accuracy changes: {}", self.engine.accuracy_changes);

        let summary = self.sync_metrics.summary();

        println!("\n📐 Emission Quality");
        println!(
            "   ├─ With holes: {} ({:.2}%)",
            summary.synced_with_holes, summary.hole_rate
        );
        println!("   ├─ Slots filled: {}", summary.slots_filled);
        println!("   ├─ Emission gap (ms): {}", summary.gap_ms);
        println!(
            "   └─ Observed span: {:.2}s ({:.1} Hz)",
            summary.duration_s, summary.rate_hz
        );

        if !summary.hole_counts.is_empty() {
            println!("\n⚠️  Hole Counts");
            for kind in SensorKind::ALL {
                if let Some(count) = summary.hole_counts.get(&kind) {
                    println!("   ├─ {}: {}", kind, count);
                }
            }
        }

        println!();
    }
}
