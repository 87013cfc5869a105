//! Aggregates over query ranges and over the lifetime of a curve.

use core::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::sample::{Sample, Timestamp};

/// Summary of the samples a range query returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeStats {
    pub count: usize,
    pub min: Sample,
    pub max: Sample,
    pub mean: f64,
    pub first: Sample,
    pub last: Sample,
}

impl RangeStats {
    /// Fold a slice of samples.
    ///
    /// Returns `None` for an empty slice. Extrema follow the same tie rules
    /// as frame windows: earliest min, latest max.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let (&first, rest) = samples.split_first()?;
        let mut min = first;
        let mut max = first;
        let mut sum = first.value;

        for &sample in rest {
            if sample.value >= max.value {
                max = sample;
            }
            if sample.value < min.value {
                min = sample;
            }
            sum += sample.value;
        }

        Some(Self {
            count: samples.len(),
            min,
            max,
            mean: sum / samples.len() as f64,
            first,
            last: samples[samples.len() - 1],
        })
    }

    /// Distance between the extrema
    pub fn spread(&self) -> f64 {
        self.max.value - self.min.value
    }
}

/// Running statistics over every sample ever ingested
///
/// Unlike frame windows these are never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    /// Total number of samples ingested
    pub total_samples: u64,
    /// Sum of every ingested value
    pub sum: f64,
    /// Lowest sample ever ingested
    pub min: Option<Sample>,
    /// Highest sample ever ingested
    pub max: Option<Sample>,
    /// Timestamp of the first sample
    pub first_ts: Option<Timestamp>,
    /// Timestamp of the most recent sample
    pub last_ts: Option<Timestamp>,
}

impl LifetimeStats {
    /// Update lifetime statistics with a new sample
    pub fn update(&mut self, sample: &Sample) {
        self.total_samples += 1;
        self.sum += sample.value;

        match self.max {
            Some(max) if sample.value < max.value => {}
            _ => self.max = Some(*sample),
        }
        match self.min {
            Some(min) if sample.value >= min.value => {}
            _ => self.min = Some(*sample),
        }

        self.first_ts.get_or_insert(sample.timestamp);
        self.last_ts = Some(sample.timestamp);
    }

    pub fn mean(&self) -> Option<f64> {
        (self.total_samples > 0).then(|| self.sum / self.total_samples as f64)
    }
}

impl Display for LifetimeStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[LifetimeStats] total_samples: {}", self.total_samples)?;
        if let (Some(min), Some(max)) = (self.min, self.max) {
            write!(f, ", min: {:.4}, max: {:.4}", min.value, max.value)?;
        }
        if let Some(mean) = self.mean() {
            write!(f, ", mean: {mean:.4}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_stats_empty() {
        assert!(RangeStats::from_samples(&[]).is_none());
    }

    #[test]
    fn test_range_stats() {
        let samples = [
            Sample::at_secs(0, 10.0),
            Sample::at_secs(1, 30.0),
            Sample::at_secs(2, 10.0),
            Sample::at_secs(3, 30.0),
        ];
        let stats = RangeStats::from_samples(&samples).unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 20.0);
        assert_eq!(stats.min, Sample::at_secs(0, 10.0));
        assert_eq!(stats.max, Sample::at_secs(3, 30.0));
        assert_eq!(stats.first, samples[0]);
        assert_eq!(stats.last, samples[3]);
        assert_eq!(stats.spread(), 20.0);
    }

    #[test]
    fn test_lifetime_stats_update() {
        let mut stats = LifetimeStats::default();
        assert_eq!(stats.mean(), None);

        stats.update(&Sample::at_secs(1, 42.0));
        stats.update(&Sample::at_secs(2, 42.0));
        stats.update(&Sample::at_secs(3, 12.0));

        assert_eq!(stats.total_samples, 3);
        assert_eq!(stats.sum, 96.0);
        assert_eq!(stats.max, Some(Sample::at_secs(2, 42.0)));
        assert_eq!(stats.min, Some(Sample::at_secs(3, 12.0)));
        assert_eq!(stats.first_ts, Some(Timestamp::from_secs(1)));
        assert_eq!(stats.last_ts, Some(Timestamp::from_secs(3)));
        assert_eq!(stats.mean(), Some(32.0));
    }
}
