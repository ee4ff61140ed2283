//! SyncedMeasurement - the engine's composite output.

use serde::{Deserialize, Serialize};

use crate::{Measurement, SensorKind};

/// Composite sample: one optional slot per kind, aligned at `timestamp`.
///
/// The engine reuses one internal instance across alignment events and hands
/// the listener a value copy, so a delivered snapshot never changes under the
/// receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncedMeasurement {
    /// Alignment timestamp (the reference sample's timestamp).
    pub timestamp: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<Measurement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyroscope: Option<Measurement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity: Option<Measurement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnetometer: Option<Measurement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attitude: Option<Measurement>,
}

impl SyncedMeasurement {
    /// Slot for `kind`, by value.
    pub fn get(&self, kind: SensorKind) -> Option<Measurement> {
        match kind {
            SensorKind::Accelerometer => self.accelerometer,
            SensorKind::Gyroscope => self.gyroscope,
            SensorKind::Gravity => self.gravity,
            SensorKind::Magnetometer => self.magnetometer,
            SensorKind::Attitude => self.attitude,
        }
    }

    /// Fill the slot for `kind`.
    pub fn set(&mut self, kind: SensorKind, measurement: Measurement) {
        let slot = match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
            SensorKind::Gravity => &mut self.gravity,
            SensorKind::Magnetometer => &mut self.magnetometer,
            SensorKind::Attitude => &mut self.attitude,
        };
        *slot = Some(measurement);
    }

    /// Reset every slot and the timestamp; the engine calls this after each
    /// delivery.
    pub fn clear(&mut self) {
        *self = SyncedMeasurement::default();
    }

    /// Kinds with a filled slot, in canonical order.
    pub fn present_kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
    }

    /// Number of filled slots.
    pub fn slot_count(&self) -> usize {
        self.present_kinds().count()
    }
}
