//! Main synchronizer implementation.

use std::collections::HashMap;

use contracts::{
    clock, Accuracy, AlignMode, BufferBound, ContractError, InterpolatorChoice, Measurement,
    SensorKind, SensorSource, SyncConfig, SyncListener, SyncedMeasurement,
};
use serde::Serialize;
use tracing::instrument;

use crate::buffer::{InsertOutcome, StreamBuffer};
use crate::error::SyncError;
use crate::interpolate::{interpolator_for, Interpolator};

/// Rolling synchronizer counters for one run, reset on `start`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncStats {
    /// Alignment attempts: reference arrivals in window mode, reference
    /// samples in pull mode
    pub processed: u64,
    /// Synced measurements delivered to the listener
    pub emitted: u64,
    /// Window-mode reference arrivals skipped because a stream had no history
    pub incomplete: u64,
    /// Pull-mode slots left absent for lack of a bracket
    pub missing_slots: u64,
    /// Deliveries dropped while an alignment pass was in progress
    pub skipped_busy: u64,
    /// Entries evicted by stale detection
    pub stale_evicted: u64,
    /// Capacity overflows across all streams
    pub overflow_count: u64,
    /// Accuracy change notifications forwarded
    pub accuracy_changes: u64,
}

/// Per-kind history of samples already consumed by pull alignment.
///
/// Two deep: `last` is the bracket's near side, `earlier` feeds quadratic
/// fits.
#[derive(Debug, Clone, Copy, Default)]
struct SampleHistory {
    last: Option<Measurement>,
    earlier: Option<Measurement>,
}

impl SampleHistory {
    fn push(&mut self, measurement: Measurement) {
        self.earlier = self.last;
        self.last = Some(measurement);
    }
}

/// Multi-stream sample synchronizer.
///
/// Owns one bounded buffer and one source per participating kind and aligns
/// companion streams to the reference stream, in one of two disciplines:
///
/// - [`AlignMode::Window`]: window-bounded companions, every reference
///   arrival triggers at most one emission built from buffered history.
/// - [`AlignMode::Pull`]: capacity-bounded streams, every reference
///   notification pulls sample batches from the sources and emits exactly
///   once per reference sample.
///
/// All calls must arrive on one logical thread; the engine takes no locks.
/// `skip_when_processing` is the only concession to overlapping delivery and
/// drops, never queues.
pub struct Synchronizer {
    config: SyncConfig,
    /// One source per participating kind, started and stopped by the engine
    sources: HashMap<SensorKind, Box<dyn SensorSource>>,
    /// Per-kind bounded history
    buffers: HashMap<SensorKind, StreamBuffer>,
    /// Per-kind resampling strategy
    interpolators: HashMap<SensorKind, Box<dyn Interpolator>>,
    /// Notification boundary; absent means events are dropped
    listener: Option<Box<dyn SyncListener>>,
    /// Working composite, reused across events; listeners get value copies
    composite: SyncedMeasurement,
    /// Pull-mode bracket history, keyed by companion kind
    history: HashMap<SensorKind, SampleHistory>,
    running: bool,
    processing: bool,
    stopping: bool,
    /// Newest timestamp seen on any stream
    most_recent_timestamp: Option<i64>,
    /// First reference timestamp processed by pull alignment
    oldest_timestamp: Option<i64>,
    /// Last emitted composite timestamp, for gap metrics
    last_emit_timestamp: Option<i64>,
    stats: SyncStats,
}

impl Synchronizer {
    /// Create an engine for `config`.
    ///
    /// Rejects non-positive bounds and a reference kind without a bound
    /// entry; everything else is checked at `start`.
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        if !config.bounds.contains_key(&config.reference) {
            return Err(SyncError::invalid_config(
                "reference",
                format!("reference kind '{}' has no buffer bound", config.reference),
            ));
        }
        for (kind, bound) in &config.bounds {
            match *bound {
                BufferBound::Capacity { max_len } if max_len == 0 => {
                    return Err(SyncError::invalid_config(
                        format!("bounds.{kind}"),
                        "capacity must be positive",
                    ));
                }
                BufferBound::Window { window_ns } if window_ns <= 0 => {
                    return Err(SyncError::invalid_config(
                        format!("bounds.{kind}"),
                        "window must be positive",
                    ));
                }
                _ => {}
            }
        }
        if let Some(threshold) = config.stale_threshold_ns {
            if threshold <= 0 {
                return Err(SyncError::invalid_config(
                    "stale_threshold_ns",
                    "stale threshold must be positive",
                ));
            }
        }

        let mut buffers = HashMap::new();
        let mut interpolators = HashMap::new();
        for (kind, bound) in &config.bounds {
            buffers.insert(*kind, StreamBuffer::new(*kind, *bound));
            let choice = if config.interpolation.enabled {
                config.interpolation.choice_for(*kind)
            } else {
                InterpolatorChoice::Direct
            };
            interpolators.insert(*kind, interpolator_for(choice));
        }

        Ok(Self {
            config,
            sources: HashMap::new(),
            buffers,
            interpolators,
            listener: None,
            composite: SyncedMeasurement::default(),
            history: HashMap::new(),
            running: false,
            processing: false,
            stopping: false,
            most_recent_timestamp: None,
            oldest_timestamp: None,
            last_emit_timestamp: None,
            stats: SyncStats::default(),
        })
    }

    /// Attach the source serving its kind; replaces any previous one.
    pub fn attach_source(&mut self, source: Box<dyn SensorSource>) {
        self.sources.insert(source.kind(), source);
    }

    /// Install the notification listener.
    pub fn set_listener(&mut self, listener: Box<dyn SyncListener>) {
        self.listener = Some(listener);
    }

    /// Start every participating source and begin aligning.
    ///
    /// `start_timestamp` defaults to the monotonic clock. The first source
    /// failure aborts and is returned; sources started before it are left
    /// running, and the engine stays stopped.
    #[instrument(
        name = "synchronizer_start",
        skip(self, start_timestamp),
        fields(mode = ?self.config.mode)
    )]
    pub fn start(&mut self, start_timestamp: Option<i64>) -> Result<(), SyncError> {
        if self.running {
            return Err(SyncError::AlreadyRunning);
        }

        let start_timestamp = start_timestamp.unwrap_or_else(clock::now_ns);
        self.reset_state();
        self.stats = SyncStats::default();

        let kinds: Vec<SensorKind> = self.config.kinds().collect();
        for kind in kinds {
            let source = self
                .sources
                .get_mut(&kind)
                .ok_or(SyncError::SourceMissing { kind })?;
            if !source.is_available() {
                return Err(SyncError::source_start(
                    kind,
                    ContractError::SourceUnavailable { kind },
                ));
            }
            source
                .start(start_timestamp)
                .map_err(|e| SyncError::source_start(kind, e))?;
            tracing::debug!(kind = %kind, "source started");
        }

        self.running = true;
        self.stopping = false;
        tracing::info!(start_timestamp, "synchronizer running");
        Ok(())
    }

    /// Stop all sources and reset the engine. Idempotent; a no-op when not
    /// running. Counters from the finished run stay readable until the next
    /// `start`.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.stopping = true;

        for source in self.sources.values_mut() {
            source.stop();
        }

        self.reset_state();
        self.running = false;
        self.stopping = false;
        tracing::info!("synchronizer stopped");
    }

    /// Deliver one sample notification.
    ///
    /// `position` is the source's cursor just past this sample; only pull
    /// alignment reads it.
    #[instrument(
        level = "trace",
        name = "synchronizer_on_sample",
        skip(self, measurement),
        fields(kind = %kind, timestamp = measurement.timestamp)
    )]
    pub fn on_sample(&mut self, kind: SensorKind, measurement: Measurement, position: u64) {
        if !self.running || self.stopping {
            return;
        }
        if !self.config.bounds.contains_key(&kind) {
            tracing::trace!(kind = %kind, "sample for unconfigured kind ignored");
            return;
        }
        if self.processing && self.config.skip_when_processing {
            self.stats.skipped_busy += 1;
            metrics::counter!("motion_syncer_samples_skipped_total", "reason" => "busy")
                .increment(1);
            return;
        }

        metrics::counter!("motion_syncer_samples_total", "kind" => kind.as_str()).increment(1);
        self.observe_timestamp(measurement.timestamp);

        self.processing = true;
        match self.config.mode {
            AlignMode::Window => self.align_window(kind, measurement),
            AlignMode::Pull => self.align_pull(kind, measurement, position),
        }
        self.processing = false;
    }

    /// Deliver an accuracy change notification.
    pub fn on_accuracy_changed(&mut self, kind: SensorKind, accuracy: Accuracy) {
        if !self.running || self.stopping {
            return;
        }
        self.stats.accuracy_changes += 1;
        metrics::counter!("motion_syncer_accuracy_changes_total", "kind" => kind.as_str())
            .increment(1);
        if let Some(listener) = self.listener.as_mut() {
            listener.on_accuracy_changed(kind, accuracy);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Counters for the current run. They survive `stop` so a finished
    /// run stays inspectable; the next `start` resets them.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Newest timestamp seen on any stream this run.
    pub fn most_recent_timestamp(&self) -> Option<i64> {
        self.most_recent_timestamp
    }

    /// First reference timestamp processed by pull alignment this run.
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.oldest_timestamp
    }

    /// Current entry count per participating kind.
    pub fn buffer_depths(&self) -> HashMap<SensorKind, usize> {
        self.buffers
            .iter()
            .map(|(kind, buffer)| (*kind, buffer.len()))
            .collect()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Window discipline: maintenance first, then either emit (reference) or
    /// buffer (companion). Reference samples are never buffered.
    fn align_window(&mut self, kind: SensorKind, measurement: Measurement) {
        self.run_stale_pass();
        self.trim_windows();

        if kind == self.config.reference {
            self.try_emit_window(measurement);
        } else if let Some(buffer) = self.buffers.get_mut(&kind) {
            if buffer.insert(measurement) == InsertOutcome::Overflowed {
                self.notify_buffer_filled(kind);
            }
        }
    }

    /// One alignment attempt at the reference arrival's timestamp.
    ///
    /// Every companion stream must hold at least one entry; otherwise the
    /// arrival is dropped silently and counted.
    fn try_emit_window(&mut self, reference: Measurement) {
        self.stats.processed += 1;

        let companions: Vec<SensorKind> = self.config.companion_kinds().collect();
        let starved = companions
            .iter()
            .any(|kind| self.buffers.get(kind).map_or(true, StreamBuffer::is_empty));
        if starved {
            self.stats.incomplete += 1;
            metrics::counter!("motion_syncer_alignment_incomplete_total").increment(1);
            tracing::trace!(
                timestamp = reference.timestamp,
                "alignment skipped, not every stream has history"
            );
            return;
        }

        let target = reference.timestamp;
        self.composite.clear();
        self.composite.timestamp = target;
        self.composite.set(self.config.reference, reference);

        for kind in companions {
            if let Some(slot) = self.window_slot(kind, target) {
                self.composite.set(kind, slot);
            }
        }

        self.emit_composite();
    }

    /// Companion slot for a window alignment at `target`.
    ///
    /// A bracketing pair is interpolated; with history on only one side the
    /// newest entry is held at the target instead. Interpolation disabled
    /// means the newest entry is used untouched.
    fn window_slot(&self, kind: SensorKind, target: i64) -> Option<Measurement> {
        let buffer = self.buffers.get(&kind)?;

        if !self.config.interpolation.enabled {
            return buffer.peek_newest().copied();
        }

        let bracket = buffer.bracket_around(target);
        if let (Some(older), Some(newer)) = (bracket.older, bracket.newer) {
            let interpolator = self.interpolators.get(&kind)?;
            return Some(interpolator.interpolate(bracket.earlier, older, newer, target));
        }
        buffer.peek_newest().map(|m| m.with_timestamp(target))
    }

    /// Pull discipline: a reference notification drains the source-side
    /// batches and aligns each pulled reference sample exactly once.
    /// Companion notifications only advance the pull horizon; their samples
    /// arrive through the timestamp-bounded pull.
    #[instrument(
        level = "debug",
        name = "synchronizer_pull_pass",
        skip(self, _measurement),
        fields(kind = %kind, position)
    )]
    fn align_pull(&mut self, kind: SensorKind, _measurement: Measurement, position: u64) {
        if kind != self.config.reference {
            return;
        }

        let batch = match self.sources.get_mut(&kind) {
            Some(source) => source.samples_before_position(position),
            None => Vec::new(),
        };
        if batch.is_empty() {
            return;
        }
        for measurement in &batch {
            self.observe_timestamp(measurement.timestamp);
        }
        if !self.store_pulled(kind, batch) {
            return;
        }

        self.run_stale_pass();

        let Some(most_recent) = self.most_recent_timestamp else {
            return;
        };
        let companions: Vec<SensorKind> = self.config.companion_kinds().collect();
        for companion in &companions {
            let batch = match self.sources.get_mut(companion) {
                Some(source) => source.samples_before_timestamp(most_recent),
                None => Vec::new(),
            };
            if !self.store_pulled(*companion, batch) {
                return;
            }
        }

        let reference = self.config.reference;
        let pending = match self.buffers.get_mut(&reference) {
            Some(buffer) => buffer.take_all(),
            None => Vec::new(),
        };
        for reference_sample in pending {
            if !self.running || self.stopping {
                break;
            }
            self.align_reference_sample(reference_sample, &companions);
        }
    }

    /// Insert one pulled batch, reporting overflows. Returns `false` once
    /// the engine stopped mid-insert.
    fn store_pulled(&mut self, kind: SensorKind, batch: Vec<Measurement>) -> bool {
        for measurement in batch {
            let outcome = match self.buffers.get_mut(&kind) {
                Some(buffer) => buffer.insert(measurement),
                None => return true,
            };
            if outcome == InsertOutcome::Overflowed && !self.notify_buffer_filled(kind) {
                return false;
            }
        }
        true
    }

    /// Emit one composite for one pulled reference sample.
    fn align_reference_sample(&mut self, reference: Measurement, companions: &[SensorKind]) {
        self.stats.processed += 1;
        if self.oldest_timestamp.is_none() {
            self.oldest_timestamp = Some(reference.timestamp);
        }

        self.composite.clear();
        self.composite.timestamp = reference.timestamp;
        self.composite.set(self.config.reference, reference);

        for kind in companions {
            match self.pull_slot(*kind, reference.timestamp) {
                Some(slot) => self.composite.set(*kind, slot),
                None => {
                    self.stats.missing_slots += 1;
                    metrics::counter!("motion_syncer_missing_slot_total", "kind" => kind.as_str())
                        .increment(1);
                }
            }
        }

        self.emit_composite();
    }

    /// Companion slot for a pull alignment at `target`.
    ///
    /// Entries before the target are consumed into the bracket history; the
    /// bracket is the last consumed entry plus the first remaining one. With
    /// no history yet the oldest available entry is taken as-is, and with
    /// nothing on the far side the slot stays absent.
    fn pull_slot(&mut self, kind: SensorKind, target: i64) -> Option<Measurement> {
        let buffer = self.buffers.get_mut(&kind)?;
        let drained = buffer.take_all_before(target);
        let found = buffer.peek_oldest().copied();

        let history = self.history.entry(kind).or_default();
        for consumed in drained {
            history.push(consumed);
        }

        match (history.last, found) {
            (Some(previous), Some(found)) => {
                let earlier = history.earlier;
                let interpolator = self.interpolators.get(&kind)?;
                Some(interpolator.interpolate(earlier.as_ref(), &previous, &found, target))
            }
            (None, Some(found)) => Some(found),
            _ => None,
        }
    }

    /// Evict and report entries older than the stale threshold.
    ///
    /// Runs ahead of every alignment attempt so an aged entry is reported
    /// once instead of silently trimmed. Reference entries are exempt; they
    /// drive the timeline.
    fn run_stale_pass(&mut self) {
        let Some(threshold) = self.config.stale_threshold_ns else {
            return;
        };
        let Some(most_recent) = self.most_recent_timestamp else {
            return;
        };
        let cutoff = most_recent - threshold;

        let companions: Vec<SensorKind> = self.config.companion_kinds().collect();
        for kind in companions {
            let evicted = match self.buffers.get_mut(&kind) {
                Some(buffer) => buffer.take_all_before(cutoff),
                None => continue,
            };
            if evicted.is_empty() {
                continue;
            }

            self.stats.stale_evicted += evicted.len() as u64;
            metrics::counter!("motion_syncer_stale_evicted_total", "kind" => kind.as_str())
                .increment(evicted.len() as u64);
            tracing::debug!(kind = %kind, count = evicted.len(), "evicted stale measurements");
            if let Some(listener) = self.listener.as_mut() {
                listener.on_stale_measurements(kind, evicted);
            }
        }
    }

    /// Age every window-bounded buffer against the newest seen timestamp, so
    /// an arrival of any kind can expire a companion's history.
    fn trim_windows(&mut self) {
        let Some(most_recent) = self.most_recent_timestamp else {
            return;
        };
        for (kind, bound) in &self.config.bounds {
            if let BufferBound::Window { window_ns } = *bound {
                if let Some(buffer) = self.buffers.get_mut(kind) {
                    buffer.evict_older_than(most_recent - window_ns);
                }
            }
        }
    }

    /// Report one overflow. Returns `false` when the overflow stopped the
    /// engine.
    fn notify_buffer_filled(&mut self, kind: SensorKind) -> bool {
        self.stats.overflow_count += 1;
        metrics::counter!("motion_syncer_buffer_overflow_total", "kind" => kind.as_str())
            .increment(1);
        if let Some(listener) = self.listener.as_mut() {
            listener.on_buffer_filled(kind);
        }

        if self.config.stop_when_filled_buffer {
            tracing::warn!(kind = %kind, "buffer filled, stopping synchronizer");
            self.stop();
            return false;
        }
        true
    }

    /// Hand the working composite to the listener as a value snapshot and
    /// reset it.
    fn emit_composite(&mut self) {
        if !self.running || self.stopping {
            self.composite.clear();
            return;
        }

        let snapshot = self.composite;
        self.composite.clear();

        self.stats.emitted += 1;
        metrics::counter!("motion_syncer_emissions_total").increment(1);
        let coverage = snapshot.slot_count() as f64 / self.config.bounds.len().max(1) as f64;
        metrics::histogram!("motion_syncer_slot_coverage").record(coverage);
        if let Some(last) = self.last_emit_timestamp {
            metrics::histogram!("motion_syncer_emission_gap_ns")
                .record((snapshot.timestamp - last) as f64);
        }
        self.last_emit_timestamp = Some(snapshot.timestamp);

        tracing::trace!(
            timestamp = snapshot.timestamp,
            slots = snapshot.slot_count(),
            "emitting synced measurement"
        );
        if let Some(listener) = self.listener.as_mut() {
            listener.on_synced_measurement(snapshot);
        }
    }

    fn observe_timestamp(&mut self, timestamp: i64) {
        self.most_recent_timestamp = Some(match self.most_recent_timestamp {
            Some(current) => current.max(timestamp),
            None => timestamp,
        });
    }

    fn reset_state(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.clear();
        }
        self.history.clear();
        self.composite.clear();
        self.most_recent_timestamp = None;
        self.oldest_timestamp = None;
        self.last_emit_timestamp = None;
        self.processing = false;
    }
}
