//! 同步输出指标收集模块
//!
//! 基于 SyncedMeasurement 收集和统计同步管道的运行指标。

use std::collections::HashMap;

use contracts::{SensorKind, SensorVariant, SyncedMeasurement};
use metrics::{counter, gauge, histogram};

/// 从 SyncedMeasurement 记录指标
///
/// 管道每收到一个同步输出时调用此函数来记录指标。`expected` 为配置的流集合，
/// 用于区分空槽与未配置的流。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_emission_metrics;
///
/// while let Some(synced) = output_rx.recv().await {
///     record_emission_metrics(&synced, &expected_kinds);
///     // ...
/// }
/// ```
pub fn record_emission_metrics(synced: &SyncedMeasurement, expected: &[SensorKind]) {
    // 同步输出计数器
    counter!("motion_syncer_synced_total").increment(1);

    // 对齐时间戳 (用于检测输出停滞)
    gauge!("motion_syncer_last_synced_timestamp_ns").set(synced.timestamp as f64);

    // 槽位覆盖
    let filled = synced.slot_count();
    histogram!("motion_syncer_slots_filled").record(filled as f64);

    let mut missing = 0usize;
    for kind in expected.iter().copied() {
        match synced.get(kind) {
            Some(slot) => {
                // 槽位时间偏移 (对齐时间戳与槽位样本时间戳之差)
                let age_ms = (synced.timestamp - slot.timestamp).abs() as f64 / 1e6;
                gauge!("motion_syncer_slot_age_ms", "kind" => kind.as_str()).set(age_ms);
                histogram!("motion_syncer_slot_age_ms_hist", "kind" => kind.as_str())
                    .record(age_ms);
            }
            None => {
                missing += 1;
                counter!("motion_syncer_slot_hole_total", "kind" => kind.as_str()).increment(1);
            }
        }
    }

    gauge!("motion_syncer_slots_missing").set(missing as f64);
    if missing > 0 {
        counter!("motion_syncer_synced_with_holes_total").increment(1);
    }
}

/// 记录传感器样本接收
pub fn record_sample_received(kind: SensorKind, variant: SensorVariant) {
    counter!(
        "motion_syncer_samples_received_total",
        "kind" => kind.as_str(),
        "variant" => variant.as_str()
    )
    .increment(1);
}

/// 记录同步输出分发
pub fn record_measurement_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "motion_syncer_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录管道延迟 (从样本时间戳到分发完成)
pub fn record_sync_latency_ms(latency_ms: f64) {
    histogram!("motion_syncer_sync_latency_ms").record(latency_ms);
}

/// 记录缓冲区深度
pub fn record_buffer_depth(kind: SensorKind, depth: usize) {
    gauge!(
        "motion_syncer_buffer_depth",
        "kind" => kind.as_str()
    )
    .set(depth as f64);
}

/// 同步输出聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone)]
pub struct SyncAggregator {
    /// 期望填充的流集合
    pub expected: Vec<SensorKind>,

    /// 同步输出总数
    pub total_synced: u64,

    /// 空槽总数
    pub total_holes: u64,

    /// 带空槽的输出数
    pub synced_with_holes: u64,

    /// 槽位填充数统计
    pub slot_stats: RunningStats,

    /// 相邻输出时间差统计 (毫秒)
    pub gap_stats: RunningStats,

    /// 各流的槽位时间偏移统计 (毫秒)
    pub age_stats: HashMap<SensorKind, RunningStats>,

    /// 各流的空槽次数
    pub hole_counts: HashMap<SensorKind, u64>,

    first_timestamp: Option<i64>,
    last_timestamp: Option<i64>,
}

impl Default for SyncAggregator {
    fn default() -> Self {
        Self::with_expected(SensorKind::ALL.to_vec())
    }
}

impl SyncAggregator {
    /// 创建聚合器，期望全部流
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建聚合器，期望给定的流集合
    pub fn with_expected(expected: Vec<SensorKind>) -> Self {
        Self {
            expected,
            total_synced: 0,
            total_holes: 0,
            synced_with_holes: 0,
            slot_stats: RunningStats::default(),
            gap_stats: RunningStats::default(),
            age_stats: HashMap::new(),
            hole_counts: HashMap::new(),
            first_timestamp: None,
            last_timestamp: None,
        }
    }

    /// 更新聚合统计
    pub fn update(&mut self, synced: &SyncedMeasurement) {
        self.total_synced += 1;

        let mut holes = 0u64;
        for kind in self.expected.iter().copied() {
            match synced.get(kind) {
                Some(slot) => {
                    let age_ms = (synced.timestamp - slot.timestamp).abs() as f64 / 1e6;
                    self.age_stats.entry(kind).or_default().push(age_ms);
                }
                None => {
                    holes += 1;
                    *self.hole_counts.entry(kind).or_insert(0) += 1;
                }
            }
        }

        if holes > 0 {
            self.synced_with_holes += 1;
            self.total_holes += holes;
        }

        self.slot_stats.push(synced.slot_count() as f64);

        if let Some(last) = self.last_timestamp {
            self.gap_stats.push((synced.timestamp - last) as f64 / 1e6);
        }
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(synced.timestamp);
        }
        self.last_timestamp = Some(synced.timestamp);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let duration_s = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) if last > first => (last - first) as f64 / 1e9,
            _ => 0.0,
        };
        let rate_hz = if duration_s > 0.0 && self.total_synced > 1 {
            (self.total_synced - 1) as f64 / duration_s
        } else {
            0.0
        };

        MetricsSummary {
            total_synced: self.total_synced,
            synced_with_holes: self.synced_with_holes,
            total_holes: self.total_holes,
            hole_rate: if self.total_synced > 0 {
                self.synced_with_holes as f64 / self.total_synced as f64 * 100.0
            } else {
                0.0
            },
            duration_s,
            rate_hz,
            slots_filled: StatsSummary::from(&self.slot_stats),
            gap_ms: StatsSummary::from(&self.gap_stats),
            slot_age_ms: self
                .age_stats
                .iter()
                .map(|(kind, stats)| (*kind, StatsSummary::from(stats)))
                .collect(),
            hole_counts: self.hole_counts.clone(),
        }
    }

    /// 重置统计 (保留期望的流集合)
    pub fn reset(&mut self) {
        *self = Self::with_expected(self.expected.clone());
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_synced: u64,
    pub synced_with_holes: u64,
    pub total_holes: u64,
    pub hole_rate: f64,
    pub duration_s: f64,
    pub rate_hz: f64,
    pub slots_filled: StatsSummary,
    pub gap_ms: StatsSummary,
    pub slot_age_ms: HashMap<SensorKind, StatsSummary>,
    pub hole_counts: HashMap<SensorKind, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Synced measurements: {}", self.total_synced)?;
        writeln!(
            f,
            "With holes: {} ({:.2}%)",
            self.synced_with_holes, self.hole_rate
        )?;
        writeln!(f, "Total holes: {}", self.total_holes)?;
        writeln!(
            f,
            "Observed span: {:.2}s ({:.1} Hz)",
            self.duration_s, self.rate_hz
        )?;
        writeln!(f, "Slots filled: {}", self.slots_filled)?;
        writeln!(f, "Emission gap (ms): {}", self.gap_ms)?;

        if !self.slot_age_ms.is_empty() {
            writeln!(f, "Slot age (ms):")?;
            for kind in SensorKind::ALL {
                if let Some(stats) = self.slot_age_ms.get(&kind) {
                    writeln!(f, "  {}: {}", kind, stats)?;
                }
            }
        }

        if !self.hole_counts.is_empty() {
            writeln!(f, "Hole counts:")?;
            for kind in SensorKind::ALL {
                if let Some(count) = self.hole_counts.get(&kind) {
                    writeln!(f, "  {}: {}", kind, count)?;
                }
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
