//! SensorKind - stream categories the engine aligns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of a sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Gravity,
    Magnetometer,
    Attitude,
}

impl SensorKind {
    /// Every kind, in the canonical iteration order used for deterministic
    /// start/stop and buffer walks.
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Gravity,
        SensorKind::Magnetometer,
        SensorKind::Attitude,
    ];

    /// Kinds carrying 3-component vector samples; attitude carries a
    /// quaternion.
    pub fn is_vector(&self) -> bool {
        !matches!(self, SensorKind::Attitude)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Gravity => "gravity",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Attitude => "attitude",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accelerometer" => Ok(SensorKind::Accelerometer),
            "gyroscope" => Ok(SensorKind::Gyroscope),
            "gravity" => Ok(SensorKind::Gravity),
            "magnetometer" => Ok(SensorKind::Magnetometer),
            "attitude" => Ok(SensorKind::Attitude),
            other => Err(format!("unknown sensor kind '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_from_str() {
        for kind in SensorKind::ALL {
            assert_eq!(kind.as_str().parse::<SensorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SensorKind::Magnetometer).unwrap();
        assert_eq!(json, "\"magnetometer\"");
    }

    #[test]
    fn only_attitude_is_rotational() {
        let vectors: Vec<_> = SensorKind::ALL.iter().filter(|k| k.is_vector()).collect();
        assert_eq!(vectors.len(), 4);
        assert!(!SensorKind::Attitude.is_vector());
    }
}
