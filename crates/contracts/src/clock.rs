//! Process-wide monotonic clock.
//!
//! Sources and the engine share one anchor so their nanosecond timestamps
//! are comparable within a process.

use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds since the first call in this process. Monotonic and
/// non-negative.
pub fn now_ns() -> i64 {
    let anchor = ANCHOR.get_or_init(Instant::now);
    anchor.elapsed().as_nanos() as i64
}
