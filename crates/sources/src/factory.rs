//! Source Factory 核心实现
//!
//! 从 RigBlueprint 构建传感器数据源集合。

use contracts::{RigBlueprint, SensorSource, SensorSpec, SourceBackend};
use tracing::{info, instrument};

use crate::error::{Result, SourceError};
use crate::replay::{ReplayConfig, ReplaySource};
use crate::synthetic::{SyntheticConfig, SyntheticSource};

/// 从 blueprint 构建全部数据源
///
/// 每个 `SensorSpec` 对应一个数据源，顺序与 blueprint 声明一致。
/// 任何一个构建失败则整体失败，已构建的数据源随之丢弃（尚未启动，
/// 无需清理）。
#[instrument(
    name = "sources_build_from_blueprint",
    skip(blueprint),
    fields(sensor_count = blueprint.sensors.len())
)]
pub fn build_sources(blueprint: &RigBlueprint) -> Result<Vec<Box<dyn SensorSource>>> {
    let mut sources: Vec<Box<dyn SensorSource>> = Vec::with_capacity(blueprint.sensors.len());

    for spec in &blueprint.sensors {
        sources.push(build_source(spec)?);
    }

    info!(count = sources.len(), "sources built");
    Ok(sources)
}

/// 构建单个数据源
#[instrument(name = "sources_build_source", skip(spec), fields(kind = %spec.kind))]
pub fn build_source(spec: &SensorSpec) -> Result<Box<dyn SensorSource>> {
    match &spec.source {
        SourceBackend::Synthetic { amplitude, noise } => {
            info!(kind = %spec.kind, rate_hz = spec.rate_hz, "building synthetic source");
            let config = SyntheticConfig {
                rate_hz: spec.rate_hz,
                amplitude: *amplitude,
                noise: *noise,
                accuracy: spec.accuracy,
                variant: spec.variant,
                ..Default::default()
            };
            Ok(Box::new(SyntheticSource::new(spec.kind, config)))
        }
        SourceBackend::Replay { path, paced } => {
            info!(kind = %spec.kind, path = %path.display(), "building replay source");
            let config = ReplayConfig {
                paced: *paced,
                ..Default::default()
            };
            let source = ReplaySource::load(path, spec.kind, config)
                .map_err(|e| SourceError::build_failed(spec.kind, e.to_string()))?;
            Ok(Box::new(source))
        }
    }
}
