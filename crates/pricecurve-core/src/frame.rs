//! Per-level state of a curve: the retained samples plus the window
//! currently being accumulated.

use heapless::Vec as HeaplessVec;

use crate::sample::{Sample, Timestamp};

/// Running extrema of a frame since its last reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Lowest sample; on ties the earliest one is kept
    pub min: Sample,
    /// Highest sample; on ties the most recent one is kept
    pub max: Sample,
    /// Timestamp of the first sample appended after the last reset
    pub start: Timestamp,
}

impl Window {
    fn open(sample: Sample) -> Self {
        Self {
            min: sample,
            max: sample,
            start: sample.timestamp,
        }
    }

    fn record(&mut self, sample: Sample) {
        if sample.value >= self.max.value {
            self.max = sample;
        }
        if sample.value < self.min.value {
            self.min = sample;
        }
    }

    /// The samples a promotion forwards to the next coarser frame, in the
    /// order they must be appended there.
    ///
    /// Min and max are emitted in time order. When both share a timestamp
    /// only the max is forwarded.
    pub fn extrema_in_time_order(&self) -> HeaplessVec<Sample, 2> {
        match self.max.timestamp.cmp(&self.min.timestamp) {
            core::cmp::Ordering::Greater => [self.min, self.max].into_iter().collect(),
            core::cmp::Ordering::Less => [self.max, self.min].into_iter().collect(),
            core::cmp::Ordering::Equal => core::iter::once(self.max).collect(),
        }
    }
}

/// Samples retained at one resolution level.
///
/// The sample sequence only ever grows; [`Frame::reset`] clears the window
/// but keeps every retained sample.
#[derive(Debug, Default)]
pub struct Frame {
    samples: Vec<Sample>,
    window: Option<Window>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the current window. Retained samples are untouched.
    pub fn reset(&mut self) {
        self.window = None;
    }

    /// Record `sample` in the current window (opening one if needed) and
    /// retain it.
    pub fn append(&mut self, sample: Sample) {
        match self.window.as_mut() {
            Some(window) => window.record(sample),
            None => self.window = Some(Window::open(sample)),
        }
        self.samples.push(sample);
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the first retained sample whose timestamp is `>= bound`
    pub fn lower_bound(&self, bound: Timestamp) -> usize {
        self.samples.partition_point(|s| s.timestamp < bound)
    }

    /// Retained samples with `from <= timestamp < to`.
    ///
    /// Empty when `from >= to`.
    pub fn range(&self, from: Timestamp, to: Timestamp) -> &[Sample] {
        if from >= to {
            return &[];
        }
        let start = self.lower_bound(from);
        let end = self.lower_bound(to);
        &self.samples[start..end]
    }
}
