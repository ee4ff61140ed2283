//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Monotonic nanoseconds (`i64`) shared process-wide via [`clock::now_ns`]
//! - Every `Measurement` hand-off across a boundary is a value copy

pub mod clock;

mod blueprint;
mod error;
mod kind;
mod listener;
mod measurement;
mod sink;
mod source;
mod sync_config;
mod synced;

pub use blueprint::*;
pub use error::*;
pub use kind::SensorKind;
pub use listener::SyncListener;
pub use measurement::*;
pub use sink::*;
pub use source::{SensorSource, SourceCallback, SourceEvent};
pub use sync_config::*;
pub use synced::SyncedMeasurement;
