//! Binary export of one scale of a curve.
//!
//! Used for debugging dumps and for warming up a fresh process from another
//! one. Only a [`FrameScale::Second`] snapshot can rebuild a whole curve; see
//! [`crate::Curve::from_snapshot`].

use serde::{Deserialize, Serialize};

use crate::error::CurveError;
use crate::sample::Sample;
use crate::scale::FrameScale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSnapshot {
    pub scale: FrameScale,
    pub samples: Vec<Sample>,
}

impl ScaleSnapshot {
    /// Encode with postcard
    pub fn encode(&self) -> Result<Vec<u8>, CurveError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CurveError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
