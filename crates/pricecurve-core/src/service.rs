//! Ingestion and query entry points used by the surrounding system.
//!
//! The fetch pipeline owns the single [`CurveService`] and feeds it samples in
//! time order. The serving layer holds any number of [`CurveReader`]s, one per
//! thread or request handler, and addresses resolutions by label.

use std::sync::Arc;

use log::info;

use crate::config::CurveConfig;
use crate::curve::{AppendOutcome, Curve};
use crate::error::CurveError;
use crate::events::{CurveChannel, CurveEvent, CurvePublisher};
use crate::sample::{Sample, Timestamp};
use crate::scale::FrameScale;
use crate::snapshot::ScaleSnapshot;
use crate::stats::RangeStats;

/// Read-only handle onto a shared curve.
///
/// Cheap to clone and safe to send to other threads. Every query takes a
/// resolution label (`"minute"`, `"1h"`, ...); an unrecognised label fails
/// with [`CurveError::UnknownScale`].
#[derive(Debug, Clone)]
pub struct CurveReader {
    curve: Arc<Curve>,
}

impl CurveReader {
    pub fn new(curve: Arc<Curve>) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    /// Samples at `resolution` with `from <= timestamp < to`
    pub fn query_range(
        &self,
        from: Timestamp,
        to: Timestamp,
        resolution: &str,
    ) -> Result<Vec<Sample>, CurveError> {
        let scale: FrameScale = resolution.parse()?;
        Ok(self.curve.samples_between(from, to, scale))
    }

    /// Every retained sample at `resolution`
    pub fn query_all(&self, resolution: &str) -> Result<Vec<Sample>, CurveError> {
        let scale: FrameScale = resolution.parse()?;
        Ok(self.curve.samples(scale))
    }

    /// Aggregate over the samples [`CurveReader::query_range`] would return
    pub fn stats(
        &self,
        from: Timestamp,
        to: Timestamp,
        resolution: &str,
    ) -> Result<Option<RangeStats>, CurveError> {
        let scale: FrameScale = resolution.parse()?;
        Ok(self.curve.stats_between(from, to, scale))
    }

    /// Postcard-encoded [`ScaleSnapshot`] of `resolution`
    pub fn export(&self, resolution: &str) -> Result<Vec<u8>, CurveError> {
        let scale: FrameScale = resolution.parse()?;
        self.curve.snapshot(scale).encode()
    }
}

/// Single-writer front of a curve
///
/// Optionally publishes [`CurveEvent`]s on a channel after every ingest.
pub struct CurveService<'a> {
    reader: CurveReader,
    publisher: Option<CurvePublisher<'a>>,
}

impl<'a> CurveService<'a> {
    /// Create a service around a new, empty curve
    pub fn new(config: CurveConfig) -> Self {
        Self::from_curve(Curve::with_config(config))
    }

    /// Create a service around an existing curve, e.g. one rebuilt from a
    /// snapshot
    pub fn from_curve(curve: Curve) -> Self {
        info!(
            "Creating curve service, ordering policy: {}",
            curve.config().ordering
        );
        Self {
            reader: CurveReader::new(Arc::new(curve)),
            publisher: None,
        }
    }

    /// Rebuild the curve from an encoded [`FrameScale::Second`] snapshot
    pub fn restore(config: CurveConfig, bytes: &[u8]) -> Result<Self, CurveError> {
        let snapshot = ScaleSnapshot::decode(bytes)?;
        let curve = Curve::from_snapshot(config, &snapshot)?;
        info!("Restored curve from {} samples", snapshot.samples.len());
        Ok(Self::from_curve(curve))
    }

    /// Publish events on `channel` from now on
    pub fn with_channel(mut self, channel: &'a CurveChannel) -> Self {
        self.publisher = Some(channel.immediate_publisher());
        self
    }

    /// A new query handle onto this service's curve
    pub fn reader(&self) -> CurveReader {
        self.reader.clone()
    }

    /// Ingest one sample. Timestamps must not decrease across calls.
    pub fn ingest(&self, timestamp: Timestamp, value: f64) -> Result<AppendOutcome, CurveError> {
        let sample = Sample::new(timestamp, value);
        let outcome = self.reader.curve.append(sample)?;

        if let Some(publisher) = &self.publisher {
            for promotion in &outcome.promotions {
                publisher.publish_immediate(CurveEvent::Promoted(promotion.clone()));
            }
            publisher.publish_immediate(CurveEvent::Sample(sample));
        }

        Ok(outcome)
    }
}
