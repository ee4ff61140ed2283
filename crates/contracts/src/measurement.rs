//! Measurement - the per-sample value type shared by every stream.
//!
//! A measurement is a plain `Copy` struct. Every hand-off across a module
//! boundary (buffer to interpolator, buffer to output) is a value copy, so a
//! consumer mutating its copy can never corrupt buffered state.

use serde::{Deserialize, Serialize};

/// Reported reliability of a sensor reading.
///
/// Ordered from worst to best, so `min()` picks the weaker of two readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

/// Hardware subtype a stream is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorVariant {
    #[default]
    Calibrated,
    Uncalibrated,
}

impl SensorVariant {
    /// Stable lowercase name (metric labels, reports).
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorVariant::Calibrated => "calibrated",
            SensorVariant::Uncalibrated => "uncalibrated",
        }
    }
}

/// 3D vector sample (accelerometer, gyroscope, gravity, magnetometer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Quaternion sample (attitude), `w` scalar first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }
}

impl Default for Quaternion {
    /// Identity rotation.
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// Sample payload, tagged by shape.
///
/// One measurement type covers all five kinds; the tag keeps vector and
/// rotation streams from mixing without a type per kind combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleValues {
    Vector(Vector3),
    Rotation(Quaternion),
}

impl SampleValues {
    /// Combine two payloads component-wise. Both sides must share a shape;
    /// streams of one kind always do.
    pub fn zip_with(self, other: SampleValues, f: impl Fn(f64, f64) -> f64) -> SampleValues {
        match (self, other) {
            (SampleValues::Vector(a), SampleValues::Vector(b)) => {
                SampleValues::Vector(Vector3::new(f(a.x, b.x), f(a.y, b.y), f(a.z, b.z)))
            }
            (SampleValues::Rotation(a), SampleValues::Rotation(b)) => SampleValues::Rotation(
                Quaternion::new(f(a.w, b.w), f(a.x, b.x), f(a.y, b.y), f(a.z, b.z)),
            ),
            (a, _) => {
                debug_assert!(false, "mismatched sample shapes");
                a
            }
        }
    }

    /// Combine three payloads component-wise (quadratic fits).
    pub fn zip3_with(
        self,
        second: SampleValues,
        third: SampleValues,
        f: impl Fn(f64, f64, f64) -> f64,
    ) -> SampleValues {
        match (self, second, third) {
            (SampleValues::Vector(a), SampleValues::Vector(b), SampleValues::Vector(c)) => {
                SampleValues::Vector(Vector3::new(
                    f(a.x, b.x, c.x),
                    f(a.y, b.y, c.y),
                    f(a.z, b.z, c.z),
                ))
            }
            (SampleValues::Rotation(a), SampleValues::Rotation(b), SampleValues::Rotation(c)) => {
                SampleValues::Rotation(Quaternion::new(
                    f(a.w, b.w, c.w),
                    f(a.x, b.x, c.x),
                    f(a.y, b.y, c.y),
                    f(a.z, b.z, c.z),
                ))
            }
            (a, _, _) => {
                debug_assert!(false, "mismatched sample shapes");
                a
            }
        }
    }
}

/// One timestamped sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Sample payload.
    pub values: SampleValues,

    /// Monotonic nanoseconds, non-negative.
    pub timestamp: i64,

    /// Reliability reported with the sample.
    pub accuracy: Accuracy,

    /// Hardware subtype the sample came from.
    pub variant: SensorVariant,
}

impl Measurement {
    /// Vector sample with calibrated variant.
    pub fn vector(x: f64, y: f64, z: f64, timestamp: i64, accuracy: Accuracy) -> Self {
        Self {
            values: SampleValues::Vector(Vector3::new(x, y, z)),
            timestamp,
            accuracy,
            variant: SensorVariant::Calibrated,
        }
    }

    /// Rotation sample with calibrated variant.
    pub fn rotation(w: f64, x: f64, y: f64, z: f64, timestamp: i64, accuracy: Accuracy) -> Self {
        Self {
            values: SampleValues::Rotation(Quaternion::new(w, x, y, z)),
            timestamp,
            accuracy,
            variant: SensorVariant::Calibrated,
        }
    }

    /// Copy with the timestamp substituted (zero-order hold).
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
