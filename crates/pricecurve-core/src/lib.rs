//! Multi-resolution price curve
//!
//! This crate keeps a stream of timestamped scalar samples at six
//! resolutions at once (second, minute, hour, day, month, year), so a range
//! query over any window can be answered at a caller-chosen resolution
//! without rescanning full-resolution history.
//!
//! Coarser levels are fed by promotion: when a level's current window has
//! been open longer than its threshold, the window's minimum and maximum
//! samples are copied up one level, preserving extrema at every resolution.
//!
//! The structure is in-memory only. Ingestion is single-writer; any number
//! of readers may query concurrently.

pub mod config;
pub mod curve;
pub mod error;
pub mod events;
pub mod frame;
pub mod sample;
pub mod scale;
pub mod service;
pub mod snapshot;
pub mod stats;

pub use config::{CurveConfig, OrderingPolicy};
pub use curve::{AppendOutcome, Curve, Promotion};
pub use error::CurveError;
pub use events::{CurveChannel, CurveEvent};
pub use frame::Window;
pub use sample::{Sample, Timestamp};
pub use scale::FrameScale;
pub use service::{CurveReader, CurveService};
pub use snapshot::ScaleSnapshot;
pub use stats::{LifetimeStats, RangeStats};
