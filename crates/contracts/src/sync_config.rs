//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::SensorKind;

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Reference kind (the stream whose arrivals trigger alignment)
    pub reference: SensorKind,

    /// Alignment discipline
    #[serde(default)]
    pub mode: AlignMode,

    /// Per-kind buffer bound; the key set defines the participating kinds
    pub bounds: HashMap<SensorKind, BufferBound>,

    /// Interpolation configuration
    #[serde(default)]
    pub interpolation: InterpolationConfig,

    /// Stale eviction threshold in nanoseconds (None = detection disabled)
    #[serde(default)]
    pub stale_threshold_ns: Option<i64>,

    /// Stop the whole engine when any capacity stream overflows
    #[serde(default)]
    pub stop_when_filled_buffer: bool,

    /// Drop deliveries that arrive while an alignment pass is in progress
    #[serde(default)]
    pub skip_when_processing: bool,
}

impl SyncConfig {
    /// Participating kinds in canonical order.
    pub fn kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.bounds.contains_key(kind))
    }

    /// Participating kinds other than the reference, in canonical order.
    pub fn companion_kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        let reference = self.reference;
        self.kinds().filter(move |kind| *kind != reference)
    }
}

/// Alignment discipline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Window-bounded companions, reference arrival triggers one emission
    #[default]
    Window,
    /// Capacity-bounded streams, reference batches pulled from the source
    Pull,
}

/// Per-stream retention bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferBound {
    /// Sliding time window in nanoseconds
    Window { window_ns: i64 },
    /// Fixed capacity, oldest evicted first on overflow
    Capacity { max_len: usize },
}

/// Resampling strategy selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolatorChoice {
    /// Zero-order hold to the target timestamp
    Direct,
    /// Per-component linear interpolation between the bracket pair
    #[default]
    Linear,
    /// Per-component quadratic fit through three points, linear fallback
    Quadratic,
}

/// Interpolation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Disabled means companions are emitted unmodified
    pub enabled: bool,

    /// Per-kind strategy; kinds not listed fall back to linear for vector
    /// streams and direct for attitude
    #[serde(default)]
    pub choices: HashMap<SensorKind, InterpolatorChoice>,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            choices: HashMap::new(),
        }
    }
}

impl InterpolationConfig {
    /// Effective strategy for `kind`.
    pub fn choice_for(&self, kind: SensorKind) -> InterpolatorChoice {
        self.choices
            .get(&kind)
            .copied()
            .unwrap_or(if kind.is_vector() {
                InterpolatorChoice::Linear
            } else {
                InterpolatorChoice::Direct
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_kinds(kinds: &[SensorKind]) -> SyncConfig {
        let bounds = kinds
            .iter()
            .map(|kind| (*kind, BufferBound::Capacity { max_len: 8 }))
            .collect();
        SyncConfig {
            reference: kinds[0],
            mode: AlignMode::Pull,
            bounds,
            interpolation: InterpolationConfig::default(),
            stale_threshold_ns: None,
            stop_when_filled_buffer: false,
            skip_when_processing: false,
        }
    }

    #[test]
    fn kinds_iterate_in_canonical_order() {
        let config = config_with_kinds(&[
            SensorKind::Gravity,
            SensorKind::Accelerometer,
            SensorKind::Attitude,
        ]);
        let kinds: Vec<_> = config.kinds().collect();
        assert_eq!(
            kinds,
            vec![
                SensorKind::Accelerometer,
                SensorKind::Gravity,
                SensorKind::Attitude
            ]
        );
    }

    #[test]
    fn companions_exclude_reference() {
        let config = config_with_kinds(&[SensorKind::Gyroscope, SensorKind::Magnetometer]);
        let companions: Vec<_> = config.companion_kinds().collect();
        assert_eq!(companions, vec![SensorKind::Magnetometer]);
    }

    #[test]
    fn default_choice_depends_on_shape() {
        let interpolation = InterpolationConfig::default();
        assert_eq!(
            interpolation.choice_for(SensorKind::Accelerometer),
            InterpolatorChoice::Linear
        );
        assert_eq!(
            interpolation.choice_for(SensorKind::Attitude),
            InterpolatorChoice::Direct
        );
    }

    #[test]
    fn explicit_choice_wins() {
        let mut interpolation = InterpolationConfig::default();
        interpolation
            .choices
            .insert(SensorKind::Gravity, InterpolatorChoice::Quadratic);
        assert_eq!(
            interpolation.choice_for(SensorKind::Gravity),
            InterpolatorChoice::Quadratic
        );
    }
}
