//! Error types for curve ingestion, queries and snapshots

use thiserror::Error;

use crate::sample::Timestamp;
use crate::scale::FrameScale;

#[derive(Error, Debug)]
pub enum CurveError {
    #[error("Unknown frame scale: {0}")]
    UnknownScale(String),
    #[error("Out-of-order sample: got {got}, last ingested was {last}")]
    OutOfOrder { last: Timestamp, got: Timestamp },
    #[error("Unknown ordering policy: {0}")]
    UnknownOrderingPolicy(String),
    #[error("Cannot rebuild a curve from a {0} snapshot, only second snapshots replay")]
    NotReplayable(FrameScale),
    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] postcard::Error),
}
