//! Multi-resolution curve built from a stream of time-ordered samples.
//!
//! Every sample is appended to the [`FrameScale::Second`] frame. Before that,
//! each level whose window has been open longer than its threshold forwards
//! the window's min and max into the next coarser frame and resets. The check
//! walks every level on every append, so a long gap between two samples can
//! promote through several levels in one call.
//!
//! ## Concurrency
//!
//! All frames live behind one reader-writer lock. An append holds the write
//! lock for the whole walk, so a promotion spanning two frames is never
//! visible half-applied. Queries hold the read lock only while binary
//! searching and copying their slice out.

use heapless::Vec as HeaplessVec;
use log::{debug, trace, warn};
use parking_lot::RwLock;

use crate::config::{CurveConfig, OrderingPolicy};
use crate::error::CurveError;
use crate::frame::{Frame, Window};
use crate::sample::{Sample, Timestamp};
use crate::scale::FrameScale;
use crate::snapshot::ScaleSnapshot;
use crate::stats::{LifetimeStats, RangeStats};

/// One window promoted during an append
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    /// Level whose window overflowed and was reset
    pub from: FrameScale,
    /// Level that received the extrema, `None` when `from` is the top level
    pub to: Option<FrameScale>,
    /// Samples appended to `to`, in append order
    pub forwarded: HeaplessVec<Sample, 2>,
}

/// What a single append did besides storing the sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendOutcome {
    /// Promotions in walk order, finest level first
    pub promotions: HeaplessVec<Promotion, { FrameScale::COUNT }>,
}

impl AppendOutcome {
    pub fn promoted(&self) -> bool {
        !self.promotions.is_empty()
    }
}

struct CurveState {
    frames: [Frame; FrameScale::COUNT],
    first: Option<Sample>,
    last: Option<Sample>,
    lifetime: LifetimeStats,
}

impl CurveState {
    fn new() -> Self {
        Self {
            frames: core::array::from_fn(|_| Frame::new()),
            first: None,
            last: None,
            lifetime: LifetimeStats::default(),
        }
    }

    fn frame(&self, scale: FrameScale) -> &Frame {
        &self.frames[scale.index()]
    }

    fn frame_mut(&mut self, scale: FrameScale) -> &mut Frame {
        &mut self.frames[scale.index()]
    }

    /// Whether `level`'s window has been open longer than its threshold at `now`
    fn window_elapsed(&self, level: FrameScale, now: Timestamp) -> bool {
        match (self.frame(level).window(), level.max_size_secs()) {
            (Some(window), Some(max_secs)) => {
                now.whole_secs_since(window.start) > i64::from(max_secs)
            }
            _ => false,
        }
    }

    /// Forward `level`'s window extrema one level up, then reset the window
    fn promote(&mut self, level: FrameScale) -> Option<Promotion> {
        let window: Window = *self.frame(level).window()?;
        let upper = level.upper();

        let forwarded = match upper {
            Some(upper) => {
                let forwarded = window.extrema_in_time_order();
                let target = self.frame_mut(upper);
                for sample in &forwarded {
                    target.append(*sample);
                }
                forwarded
            }
            None => HeaplessVec::new(),
        };
        self.frame_mut(level).reset();

        debug!(
            "Promoted {} window started at {} into {:?}: {:?}",
            level, window.start, upper, forwarded
        );

        Some(Promotion {
            from: level,
            to: upper,
            forwarded,
        })
    }
}

/// In-memory multi-resolution curve.
///
/// One frame per [`FrameScale`], created up front and never replaced. Every
/// level retains its samples forever.
pub struct Curve {
    config: CurveConfig,
    state: RwLock<CurveState>,
}

impl Default for Curve {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Curve {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.read();
        let mut lens = f.debug_map();
        for scale in FrameScale::ALL {
            lens.entry(&scale, &state.frame(scale).len());
        }
        lens.finish()
    }
}

impl Curve {
    /// Create an empty curve with the default (rejecting) ordering policy
    pub fn new() -> Self {
        Self::with_config(CurveConfig::default())
    }

    pub fn with_config(config: CurveConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CurveState::new()),
        }
    }

    /// Rebuild a curve by replaying a [`FrameScale::Second`] snapshot.
    ///
    /// Coarser snapshots only hold promoted extrema and cannot reproduce the
    /// finer levels, so they are refused.
    pub fn from_snapshot(
        config: CurveConfig,
        snapshot: &ScaleSnapshot,
    ) -> Result<Self, CurveError> {
        if snapshot.scale != FrameScale::Second {
            return Err(CurveError::NotReplayable(snapshot.scale));
        }
        let curve = Self::with_config(config);
        for sample in &snapshot.samples {
            curve.append(*sample)?;
        }
        Ok(curve)
    }

    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    /// Ingest one sample.
    ///
    /// Samples are expected in non-decreasing timestamp order. Under
    /// [`OrderingPolicy::Reject`] an older sample is refused and the curve is
    /// left untouched; under [`OrderingPolicy::Trust`] it is stored as is.
    pub fn append(&self, sample: Sample) -> Result<AppendOutcome, CurveError> {
        let mut state = self.state.write();
        let mut outcome = AppendOutcome::default();

        let last = state.last;
        match last {
            None => {
                state.first = Some(sample);
            }
            Some(last) => {
                if self.config.ordering == OrderingPolicy::Reject
                    && sample.timestamp < last.timestamp
                {
                    warn!(
                        "Rejecting sample at {}, last ingested at {}",
                        sample.timestamp, last.timestamp
                    );
                    return Err(CurveError::OutOfOrder {
                        last: last.timestamp,
                        got: sample.timestamp,
                    });
                }

                FrameScale::Second.walk_upward(
                    &mut *state,
                    |state, level| state.window_elapsed(level, sample.timestamp),
                    |state, level| {
                        if let Some(promotion) = state.promote(level) {
                            // One promotion per level at most, capacity is COUNT
                            let _ = outcome.promotions.push(promotion);
                        }
                    },
                );
            }
        }

        state.frame_mut(FrameScale::Second).append(sample);
        state.last = Some(sample);
        state.lifetime.update(&sample);
        trace!("Appended {}", sample);

        Ok(outcome)
    }

    /// Every retained sample at `scale`, in time order
    pub fn samples(&self, scale: FrameScale) -> Vec<Sample> {
        self.state.read().frame(scale).samples().to_vec()
    }

    /// Retained samples at `scale` with `from <= timestamp < to`.
    ///
    /// Empty when `from >= to`.
    pub fn samples_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        scale: FrameScale,
    ) -> Vec<Sample> {
        self.state.read().frame(scale).range(from, to).to_vec()
    }

    /// Aggregate over exactly the samples [`Curve::samples_between`] returns
    pub fn stats_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        scale: FrameScale,
    ) -> Option<RangeStats> {
        RangeStats::from_samples(self.state.read().frame(scale).range(from, to))
    }

    /// Number of retained samples at `scale`
    pub fn len(&self, scale: FrameScale) -> usize {
        self.state.read().frame(scale).len()
    }

    /// True until the first sample is ingested
    pub fn is_empty(&self) -> bool {
        self.state.read().first.is_none()
    }

    /// The window currently accumulating at `scale`, if any
    pub fn window(&self, scale: FrameScale) -> Option<Window> {
        self.state.read().frame(scale).window().copied()
    }

    pub fn first_sample(&self) -> Option<Sample> {
        self.state.read().first
    }

    pub fn last_sample(&self) -> Option<Sample> {
        self.state.read().last
    }

    pub fn lifetime_stats(&self) -> LifetimeStats {
        self.state.read().lifetime
    }

    /// Copy of every retained sample at `scale`
    pub fn snapshot(&self, scale: FrameScale) -> ScaleSnapshot {
        ScaleSnapshot {
            scale,
            samples: self.samples(scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn linear_curve(secs: core::ops::Range<i64>) -> Curve {
        let curve = Curve::new();
        for t in secs {
            curve.append(Sample::at_secs(t, t as f64)).unwrap();
        }
        curve
    }

    #[test]
    fn test_first_sample_skips_promotion() {
        let curve = Curve::new();
        let outcome = curve.append(Sample::at_secs(0, 1.0)).unwrap();

        assert!(!outcome.promoted());
        assert_eq!(curve.first_sample(), Some(Sample::at_secs(0, 1.0)));
        assert_eq!(curve.last_sample(), Some(Sample::at_secs(0, 1.0)));
        assert_eq!(curve.len(FrameScale::Second), 1);
        assert_eq!(curve.len(FrameScale::Minute), 0);
    }

    #[test]
    fn test_samples_returns_append_order() {
        let curve = linear_curve(0..120);
        let all = curve.samples(FrameScale::Second);

        assert_eq!(all.len(), 120);
        for (i, sample) in all.iter().enumerate() {
            assert_eq!(*sample, Sample::at_secs(i as i64, i as f64));
        }
    }

    #[test]
    fn test_samples_between_first_minute() {
        let curve = linear_curve(0..120);
        let minute = curve.samples_between(ts(0), ts(60), FrameScale::Second);

        assert_eq!(minute.len(), 60);
        assert_eq!(minute.first().unwrap().timestamp, ts(0));
        assert_eq!(minute.last().unwrap().timestamp, ts(59));
    }

    #[test]
    fn test_samples_between_degenerate() {
        let curve = linear_curve(0..10);
        assert!(curve.samples_between(ts(3), ts(3), FrameScale::Second).is_empty());
        assert!(curve.samples_between(ts(8), ts(2), FrameScale::Second).is_empty());
        assert!(curve.samples_between(ts(20), ts(30), FrameScale::Second).is_empty());
        assert!(curve.samples_between(ts(0), ts(10), FrameScale::Hour).is_empty());
    }

    #[test]
    fn test_promotion_after_gap_in_minute() {
        let curve = linear_curve(0..60);
        assert_eq!(curve.len(FrameScale::Minute), 0);

        let outcome = curve.append(Sample::at_secs(61, 61.0)).unwrap();

        assert_eq!(
            curve.samples(FrameScale::Minute),
            [Sample::at_secs(0, 0.0), Sample::at_secs(59, 59.0)]
        );
        assert_eq!(outcome.promotions.len(), 1);
        assert_eq!(outcome.promotions[0].from, FrameScale::Second);
        assert_eq!(outcome.promotions[0].to, Some(FrameScale::Minute));

        // The second frame keeps its history, and a fresh window starts at 61
        assert_eq!(curve.len(FrameScale::Second), 61);
        let window = curve.window(FrameScale::Second).unwrap();
        assert_eq!(window.start, ts(61));
        assert_eq!(window.min, window.max);
    }

    #[test]
    fn test_promotion_in_continuous_stream() {
        // 60 - 0 is not > 60, so the first window closes when t = 61 arrives
        // and still contains t = 60.
        let curve = linear_curve(0..120);
        assert_eq!(
            curve.samples(FrameScale::Minute),
            [Sample::at_secs(0, 0.0), Sample::at_secs(60, 60.0)]
        );
        assert_eq!(curve.window(FrameScale::Second).unwrap().start, ts(61));
    }

    #[test]
    fn test_promotion_orders_falling_window() {
        let curve = Curve::new();
        for t in 0..=60 {
            curve.append(Sample::at_secs(t, 100.0 - t as f64)).unwrap();
        }
        curve.append(Sample::at_secs(61, 0.0)).unwrap();

        assert_eq!(
            curve.samples(FrameScale::Minute),
            [Sample::at_secs(0, 100.0), Sample::at_secs(60, 40.0)]
        );
    }

    #[test]
    fn test_single_sample_window_forwards_once() {
        let curve = Curve::new();
        curve.append(Sample::at_secs(0, 5.0)).unwrap();
        let outcome = curve.append(Sample::at_secs(100, 6.0)).unwrap();

        assert_eq!(curve.samples(FrameScale::Minute), [Sample::at_secs(0, 5.0)]);
        assert_eq!(outcome.promotions[0].forwarded.len(), 1);
    }

    #[test]
    fn test_cascading_promotion() {
        let curve = Curve::new();
        curve.append(Sample::at_secs(0, 1.0)).unwrap();
        curve.append(Sample::at_secs(30, 2.0)).unwrap();

        // Closes the second window; the minute window opens at t = 0
        curve.append(Sample::at_secs(90, 3.0)).unwrap();
        assert_eq!(curve.len(FrameScale::Minute), 2);
        assert_eq!(curve.window(FrameScale::Minute).unwrap().start, ts(0));

        // More than an hour later both the second and minute windows close
        let outcome = curve.append(Sample::at_secs(4_000, 4.0)).unwrap();
        let levels: Vec<_> = outcome.promotions.iter().map(|p| p.from).collect();
        assert_eq!(levels, [FrameScale::Second, FrameScale::Minute]);

        assert_eq!(
            curve.samples(FrameScale::Minute),
            [
                Sample::at_secs(0, 1.0),
                Sample::at_secs(30, 2.0),
                Sample::at_secs(90, 3.0)
            ]
        );
        assert_eq!(
            curve.samples(FrameScale::Hour),
            [Sample::at_secs(0, 1.0), Sample::at_secs(90, 3.0)]
        );
        assert!(curve.window(FrameScale::Minute).is_none());
        assert_eq!(curve.window(FrameScale::Hour).unwrap().start, ts(0));
    }

    #[test]
    fn test_cascade_reaches_year() {
        let curve = Curve::new();
        curve.append(Sample::at_secs(0, 1.0)).unwrap();

        // A jump past the month threshold cascades through every level
        let mut t = 0;
        for _ in 0..5 {
            t += 40_000_000;
            curve.append(Sample::at_secs(t, t as f64)).unwrap();
        }

        for scale in FrameScale::ALL {
            assert!(curve.len(scale) > 0, "{scale} frame is empty");
        }
        assert!(curve.window(FrameScale::Year).is_some());
    }

    #[test]
    fn test_year_window_never_promotes() {
        let curve = Curve::new();
        curve.append(Sample::at_secs(0, 1.0)).unwrap();
        let mut t = 0;
        for _ in 0..8 {
            t += 40_000_000;
            let outcome = curve.append(Sample::at_secs(t, 1.0)).unwrap();
            assert!(outcome.promotions.iter().all(|p| p.from != FrameScale::Year));
        }
    }

    #[test]
    fn test_rejects_out_of_order() {
        let curve = linear_curve(0..10);
        let err = curve.append(Sample::at_secs(5, 0.0)).unwrap_err();

        assert!(matches!(
            err,
            CurveError::OutOfOrder { last, got } if last == ts(9) && got == ts(5)
        ));
        assert_eq!(curve.len(FrameScale::Second), 10);
        assert_eq!(curve.last_sample(), Some(Sample::at_secs(9, 9.0)));
    }

    #[test]
    fn test_equal_timestamps_accepted() {
        let curve = Curve::new();
        curve.append(Sample::at_secs(1, 1.0)).unwrap();
        curve.append(Sample::at_secs(1, 2.0)).unwrap();
        assert_eq!(curve.len(FrameScale::Second), 2);
    }

    #[test]
    fn test_trust_policy_stores_out_of_order() {
        let curve = Curve::with_config(CurveConfig {
            ordering: OrderingPolicy::Trust,
        });
        curve.append(Sample::at_secs(10, 1.0)).unwrap();
        curve.append(Sample::at_secs(5, 2.0)).unwrap();

        assert_eq!(curve.len(FrameScale::Second), 2);
        assert_eq!(curve.last_sample(), Some(Sample::at_secs(5, 2.0)));
    }

    #[test]
    fn test_stats_between() {
        let curve = linear_curve(0..10);
        let stats = curve.stats_between(ts(2), ts(5), FrameScale::Second).unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Sample::at_secs(2, 2.0));
        assert_eq!(stats.max, Sample::at_secs(4, 4.0));
        assert_eq!(stats.mean, 3.0);
        assert!(curve.stats_between(ts(5), ts(5), FrameScale::Second).is_none());
    }

    #[test]
    fn test_lifetime_stats_survive_resets() {
        let curve = linear_curve(0..200);
        let stats = curve.lifetime_stats();

        assert_eq!(stats.total_samples, 200);
        assert_eq!(stats.min, Some(Sample::at_secs(0, 0.0)));
        assert_eq!(stats.max, Some(Sample::at_secs(199, 199.0)));
        assert_eq!(stats.first_ts, Some(ts(0)));
        assert_eq!(stats.last_ts, Some(ts(199)));
    }

    #[test]
    fn test_snapshot_replay_rebuilds_every_level() {
        let source = Curve::new();
        for t in 0..5_000 {
            let value = ((t * 37) % 101) as f64;
            source.append(Sample::at_secs(t * 7, value)).unwrap();
        }

        let snapshot = source.snapshot(FrameScale::Second);
        let rebuilt = Curve::from_snapshot(CurveConfig::default(), &snapshot).unwrap();

        for scale in FrameScale::ALL {
            assert_eq!(rebuilt.samples(scale), source.samples(scale));
            assert_eq!(rebuilt.window(scale), source.window(scale));
        }
    }

    #[test]
    fn test_snapshot_from_coarse_scale_refused() {
        let curve = linear_curve(0..200);
        let snapshot = curve.snapshot(FrameScale::Minute);
        assert!(matches!(
            Curve::from_snapshot(CurveConfig::default(), &snapshot),
            Err(CurveError::NotReplayable(FrameScale::Minute))
        ));
    }

    #[test]
    fn test_debug_lists_frame_lengths() {
        let curve = linear_curve(0..3);
        let debug = format!("{curve:?}");
        assert!(debug.contains("Second: 3"));
        assert!(debug.contains("Year: 0"));
    }
}
