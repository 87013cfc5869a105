//! Behaviour settings of a curve.

use core::fmt::Display;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CurveError;

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CurveConfig {
    #[serde(default)]
    pub ordering: OrderingPolicy,
}

/// What a curve does with a sample older than the last one ingested
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderingPolicy {
    /// Accept it. Range queries over the affected frames become unreliable.
    Trust,
    /// Refuse it with [`CurveError::OutOfOrder`]
    #[default]
    Reject,
}

impl Display for OrderingPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Trust => f.write_str("trust"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for OrderingPolicy {
    type Err = CurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(Self::Trust),
            "reject" => Ok(Self::Reject),
            _ => Err(CurveError::UnknownOrderingPolicy(s.into())),
        }
    }
}
