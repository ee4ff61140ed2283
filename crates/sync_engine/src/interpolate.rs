//! Resampling strategies.
//!
//! An interpolator maps a bracketing pair of same-kind measurements to one
//! sample at the target timestamp. Strategies are injected per kind at engine
//! construction, never hard-coded.

use contracts::{InterpolatorChoice, Measurement};

/// Resamples a bracketing pair to a target timestamp.
///
/// Defined only for `older.timestamp <= target <= newer.timestamp`; bracket
/// selection is the caller's job and an out-of-range target is a programmer
/// error, not a recoverable failure. `earlier` precedes `older` and is used
/// by the quadratic fit; the other strategies ignore it.
pub trait Interpolator: Send {
    fn interpolate(
        &self,
        earlier: Option<&Measurement>,
        older: &Measurement,
        newer: &Measurement,
        target_timestamp: i64,
    ) -> Measurement;
}

/// Build the strategy for a configured choice.
pub fn interpolator_for(choice: InterpolatorChoice) -> Box<dyn Interpolator> {
    match choice {
        InterpolatorChoice::Direct => Box::new(DirectInterpolator),
        InterpolatorChoice::Linear => Box::new(LinearInterpolator),
        InterpolatorChoice::Quadratic => Box::new(QuadraticInterpolator),
    }
}

/// Zero-order hold: the nearer bracket sample with the timestamp substituted.
#[derive(Debug, Default)]
pub struct DirectInterpolator;

impl Interpolator for DirectInterpolator {
    fn interpolate(
        &self,
        _earlier: Option<&Measurement>,
        older: &Measurement,
        newer: &Measurement,
        target_timestamp: i64,
    ) -> Measurement {
        debug_assert_bracket(older, newer, target_timestamp);

        // Ties hold the older sample.
        let nearer = if target_timestamp - older.timestamp <= newer.timestamp - target_timestamp {
            older
        } else {
            newer
        };
        nearer.with_timestamp(target_timestamp)
    }
}

/// Per-component linear interpolation between the bracket pair.
#[derive(Debug, Default)]
pub struct LinearInterpolator;

impl Interpolator for LinearInterpolator {
    fn interpolate(
        &self,
        _earlier: Option<&Measurement>,
        older: &Measurement,
        newer: &Measurement,
        target_timestamp: i64,
    ) -> Measurement {
        debug_assert_bracket(older, newer, target_timestamp);
        lerp(older, newer, target_timestamp)
    }
}

/// Per-component quadratic fit through `earlier`, `older` and `newer`.
///
/// Falls back to linear when no `earlier` sample exists or the three
/// timestamps do not form distinct points.
#[derive(Debug, Default)]
pub struct QuadraticInterpolator;

impl Interpolator for QuadraticInterpolator {
    fn interpolate(
        &self,
        earlier: Option<&Measurement>,
        older: &Measurement,
        newer: &Measurement,
        target_timestamp: i64,
    ) -> Measurement {
        debug_assert_bracket(older, newer, target_timestamp);

        let Some(earlier) = earlier else {
            return lerp(older, newer, target_timestamp);
        };

        // Offsets relative to `older` keep the products small.
        let x_e = (earlier.timestamp - older.timestamp) as f64;
        let x_n = (newer.timestamp - older.timestamp) as f64;
        let x_t = (target_timestamp - older.timestamp) as f64;

        if x_e == 0.0 || x_n == 0.0 || x_e == x_n {
            return lerp(older, newer, target_timestamp);
        }

        // Lagrange basis at x_t for the points x_e, 0, x_n.
        let l_e = (x_t * (x_t - x_n)) / (x_e * (x_e - x_n));
        let l_o = ((x_t - x_e) * (x_t - x_n)) / (x_e * x_n);
        let l_n = ((x_t - x_e) * x_t) / ((x_n - x_e) * x_n);

        let values = earlier.values.zip3_with(older.values, newer.values, |ve, vo, vn| {
            ve * l_e + vo * l_o + vn * l_n
        });

        Measurement {
            values,
            timestamp: target_timestamp,
            accuracy: older.accuracy.min(newer.accuracy),
            variant: older.variant,
        }
    }
}

fn lerp(older: &Measurement, newer: &Measurement, target_timestamp: i64) -> Measurement {
    let span = (newer.timestamp - older.timestamp) as f64;
    let values = if span == 0.0 {
        older.values
    } else {
        let frac = (target_timestamp - older.timestamp) as f64 / span;
        older
            .values
            .zip_with(newer.values, |v0, v1| v0 + (v1 - v0) * frac)
    };

    Measurement {
        values,
        timestamp: target_timestamp,
        accuracy: older.accuracy.min(newer.accuracy),
        variant: older.variant,
    }
}

fn debug_assert_bracket(older: &Measurement, newer: &Measurement, target_timestamp: i64) {
    debug_assert!(
        older.timestamp <= target_timestamp && target_timestamp <= newer.timestamp,
        "target {} outside bracket [{}, {}]",
        target_timestamp,
        older.timestamp,
        newer.timestamp
    );
}
