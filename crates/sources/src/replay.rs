//! Replay Source - 从录制文件回放测量数据
//!
//! 读取 JSONL 录制文件，按记录的时间间隔回放测量数据，
//! 时间戳重新基准到启动时刻。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    Accuracy, ContractError, Measurement, Quaternion, SampleValues, SensorKind, SensorSource,
    SensorVariant, SourceCallback, SourceEvent, Vector3,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::queue::SampleQueue;

/// Replay 配置
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// 是否按录制的时间间隔回放（false = 尽快回放）
    pub paced: bool,

    /// 拉取队列容量
    pub queue_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            paced: false,
            queue_capacity: 1024,
        }
    }
}

/// JSONL 中的测量记录
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    kind: SensorKind,
    timestamp: i64,

    // 向量类（加速度计 / 陀螺仪 / 重力 / 磁力计）
    #[serde(default)]
    vector: Option<[f64; 3]>,

    // 姿态类，[w, x, y, z]
    #[serde(default)]
    rotation: Option<[f64; 4]>,

    #[serde(default)]
    accuracy: Option<Accuracy>,

    #[serde(default)]
    variant: Option<SensorVariant>,
}

/// Replay Source - 从录制文件回放测量数据
pub struct ReplaySource {
    kind: SensorKind,
    records: Vec<Measurement>,
    config: ReplayConfig,
    callback: Option<SourceCallback>,
    running: Arc<AtomicBool>,
    queue: Arc<Mutex<SampleQueue>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ReplaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySource")
            .field("kind", &self.kind)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl ReplaySource {
    /// 从录制文件加载该 kind 的全部记录
    pub fn load(
        path: &Path,
        kind: SensorKind,
        config: ReplayConfig,
    ) -> Result<Self, ContractError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let record: ReplayRecord =
                serde_json::from_str(&line).map_err(|e| ContractError::ReplayParse {
                    line: index + 1,
                    message: e.to_string(),
                })?;

            // 只保留该 kind 的记录
            if record.kind == kind {
                records.push(build_measurement(&record, index + 1)?);
            }
        }

        // 按时间戳排序
        records.sort_by_key(|measurement| measurement.timestamp);

        info!(
            kind = %kind,
            records = records.len(),
            path = %path.display(),
            "loaded replay source"
        );

        let queue_capacity = config.queue_capacity.max(1);
        Ok(Self {
            kind,
            records,
            config,
            callback: None,
            running: Arc::new(AtomicBool::new(false)),
            queue: Arc::new(Mutex::new(SampleQueue::new(queue_capacity))),
            thread_handle: None,
        })
    }

    /// 加载到的记录条数
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// 记录转 Measurement，缺少对应形状的分量视为解析错误
fn build_measurement(record: &ReplayRecord, line: usize) -> Result<Measurement, ContractError> {
    let values = if record.kind.is_vector() {
        let [x, y, z] = record.vector.ok_or_else(|| ContractError::ReplayParse {
            line,
            message: format!("missing vector components for kind '{}'", record.kind),
        })?;
        SampleValues::Vector(Vector3::new(x, y, z))
    } else {
        let [w, x, y, z] = record.rotation.ok_or_else(|| ContractError::ReplayParse {
            line,
            message: format!("missing rotation components for kind '{}'", record.kind),
        })?;
        SampleValues::Rotation(Quaternion::new(w, x, y, z))
    };

    Ok(Measurement {
        values,
        timestamp: record.timestamp,
        accuracy: record.accuracy.unwrap_or(Accuracy::High),
        variant: record.variant.unwrap_or_default(),
    })
}

impl SensorSource for ReplaySource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        !self.records.is_empty()
    }

    fn connect(&mut self, callback: SourceCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self, start_timestamp: i64) -> Result<(), ContractError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let kind = self.kind;
        let records = self.records.clone();
        let callback = self.callback.clone();
        let running = self.running.clone();
        let queue = self.queue.clone();
        let paced = self.config.paced;

        let handle = thread::spawn(move || {
            debug!(kind = %kind, "replay thread started");

            if records.is_empty() {
                warn!(kind = %kind, "no records to replay");
                running.store(false, Ordering::SeqCst);
                return;
            }

            let start_instant = Instant::now();
            let first_timestamp = records[0].timestamp;
            let mut last_accuracy = None;
            let mut position: u64 = 0;

            for record in &records {
                if !running.load(Ordering::Relaxed) {
                    debug!(kind = %kind, "replay stopped");
                    return;
                }

                let offset = record.timestamp - first_timestamp;

                // 按录制间隔等待
                if paced {
                    let target_elapsed = Duration::from_nanos(offset.max(0) as u64);
                    let actual_elapsed = start_instant.elapsed();
                    if target_elapsed > actual_elapsed {
                        thread::sleep(target_elapsed - actual_elapsed);
                    }
                }

                // 时间戳重新基准到启动时刻
                let measurement = record.with_timestamp(start_timestamp + offset);

                if last_accuracy != Some(measurement.accuracy) {
                    if let Some(callback) = &callback {
                        callback(SourceEvent::AccuracyChanged {
                            kind,
                            accuracy: measurement.accuracy,
                        });
                    }
                    last_accuracy = Some(measurement.accuracy);
                }

                queue.lock().unwrap().push(position, measurement);
                position += 1;

                if let Some(callback) = &callback {
                    callback(SourceEvent::Sample {
                        kind,
                        measurement,
                        position,
                    });
                }
            }

            info!(kind = %kind, "replay completed");
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        self.queue.lock().unwrap().clear();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn samples_before_position(&mut self, position: u64) -> Vec<Measurement> {
        self.queue.lock().unwrap().take_before_position(position)
    }

    fn samples_before_timestamp(&mut self, timestamp: i64) -> Vec<Measurement> {
        self.queue.lock().unwrap().take_before_timestamp(timestamp)
    }
}
