//! Resolution levels of a curve, finest first.

use core::fmt::Display;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CurveError;

/// One of the six fixed resolution levels.
///
/// Each level keeps its own frame. When a level's current window has been
/// open for longer than [`FrameScale::max_size_secs`], the window's extrema
/// are promoted into the next level up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameScale {
    /// Raw ingested samples; windows roll over after 60s
    Second,
    /// Windows roll over after 1 hour
    Minute,
    /// Windows roll over after 1 day
    Hour,
    /// Windows roll over after 30 days
    Day,
    /// Windows roll over after 360 days
    Month,
    /// Coarsest level; windows never roll over
    Year,
}

impl FrameScale {
    pub const COUNT: usize = 6;

    /// Every level, finest to coarsest
    pub const ALL: [FrameScale; Self::COUNT] = [
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Month,
        Self::Year,
    ];

    /// Position of this level in [`FrameScale::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Next coarser level, `None` for [`FrameScale::Year`]
    pub const fn upper(self) -> Option<Self> {
        match self {
            Self::Second => Some(Self::Minute),
            Self::Minute => Some(Self::Hour),
            Self::Hour => Some(Self::Day),
            Self::Day => Some(Self::Month),
            Self::Month => Some(Self::Year),
            Self::Year => None,
        }
    }

    /// Next finer level, `None` for [`FrameScale::Second`]
    pub const fn lower(self) -> Option<Self> {
        match self {
            Self::Second => None,
            Self::Minute => Some(Self::Second),
            Self::Hour => Some(Self::Minute),
            Self::Day => Some(Self::Hour),
            Self::Month => Some(Self::Day),
            Self::Year => Some(Self::Month),
        }
    }

    /// Rollover threshold of a window at this level.
    ///
    /// `None` means unbounded: a year window is never promoted.
    pub const fn max_size_secs(self) -> Option<u32> {
        match self {
            Self::Second => Some(60),
            Self::Minute => Some(3_600),      // 60 * 60
            Self::Hour => Some(86_400),       // 60 * 60 * 24
            Self::Day => Some(2_592_000),     // 60 * 60 * 24 * 30
            Self::Month => Some(31_104_000),  // 60 * 60 * 24 * 30 * 12
            Self::Year => None,
        }
    }

    /// Short label, also accepted by [`FromStr`]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Second => "1s",
            Self::Minute => "1m",
            Self::Hour => "1h",
            Self::Day => "1d",
            Self::Month => "1mo",
            Self::Year => "1y",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Walk from this level up to [`FrameScale::Year`].
    ///
    /// `on_overflow` runs for every level where `predicate` holds, and the
    /// walk continues regardless of the outcome, so one call can overflow
    /// several levels in a row. The predicate for a level is evaluated after
    /// `on_overflow` has run for every finer level.
    ///
    /// `ctx` is threaded through both callbacks so that the predicate can
    /// read the same state that `on_overflow` mutates.
    pub fn walk_upward<C>(
        self,
        ctx: &mut C,
        predicate: impl Fn(&C, FrameScale) -> bool,
        mut on_overflow: impl FnMut(&mut C, FrameScale),
    ) {
        for &level in &Self::ALL[self.index()..] {
            if predicate(ctx, level) {
                on_overflow(ctx, level);
            }
        }
    }
}

impl Display for FrameScale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for FrameScale {
    type Err = CurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|scale| {
                wanted.eq_ignore_ascii_case(scale.name())
                    || wanted.eq_ignore_ascii_case(scale.label())
            })
            .ok_or_else(|| CurveError::UnknownScale(wanted.into()))
    }
}
