//! # Sources
//!
//! Sensor stream backends and delivery plumbing.
//!
//! Responsibilities:
//! - Build sources from `RigBlueprint` (synthetic waveforms, JSONL replay)
//! - Push samples through a bounded feed with an overflow policy
//! - Keep pull accessors consistent with push notifications
//! - Provide unified `SensorSource` abstraction
//!
//! ## Usage Example
//!
//! ```ignore
//! use sources::{build_sources, SampleFeed};
//!
//! let mut feed = SampleFeed::with_settings(&blueprint.feed);
//! let mut sources = build_sources(&blueprint)?;
//! for source in &mut sources {
//!     source.connect(feed.callback());
//! }
//!
//! let rx = feed.take_receiver().unwrap();
//! while let Ok(event) = rx.recv().await {
//!     // Drive the synchronizer
//! }
//! ```

mod error;
mod factory;
mod feed;
mod queue;
mod replay;
mod synthetic;

// Re-exports
pub use error::{Result, SourceError};
pub use factory::{build_source, build_sources};
pub use feed::{FeedMetrics, FeedSnapshot, SampleFeed};
pub use replay::{ReplayConfig, ReplaySource};
pub use synthetic::{SyntheticConfig, SyntheticSource};

// Re-export contracts types
pub use contracts::{SensorSource, SourceCallback, SourceEvent};
