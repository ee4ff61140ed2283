//! # Sync Engine
//!
//! 多传感器测量数据同步引擎。
//!
//! 负责：
//! - 按流缓冲测量数据（时间窗口 / 固定容量两种上界）
//! - 窗口触发与参考拉取两种对齐模式
//! - 直接 / 线性 / 二次插值
//! - 过期数据剔除与缓冲溢出上报
//! - 输出 `SyncedMeasurement`
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{BufferBound, SyncConfig, Synchronizer};
//!
//! let config = SyncConfig {
//!     reference: SensorKind::Accelerometer,
//!     bounds: HashMap::from([
//!         (SensorKind::Accelerometer, BufferBound::Window { window_ns: 10_000_000 }),
//!         (SensorKind::Gyroscope, BufferBound::Window { window_ns: 10_000_000 }),
//!     ]),
//!     ..
//! };
//!
//! let mut engine = Synchronizer::new(config)?;
//! engine.attach_source(accelerometer);
//! engine.attach_source(gyroscope);
//! engine.set_listener(Box::new(listener));
//! engine.start(None)?;
//!
//! // Feed deliveries as they arrive
//! engine.on_sample(kind, measurement, position);
//! ```

mod buffer;
mod engine;
mod error;
mod interpolate;

// Re-exports
pub use buffer::{InsertOutcome, StreamBuffer};
pub use engine::{SyncStats, Synchronizer};
pub use error::SyncError;
pub use interpolate::{
    interpolator_for, DirectInterpolator, Interpolator, LinearInterpolator, QuadraticInterpolator,
};

// Re-export contracts types
pub use contracts::{AlignMode, BufferBound, InterpolationConfig, InterpolatorChoice, SyncConfig};
pub use contracts::{Measurement, SensorKind, SyncListener, SyncedMeasurement};
