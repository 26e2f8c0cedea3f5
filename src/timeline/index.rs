use std::collections::HashMap;
use std::fmt;

use crate::foundation::core::{Fps, Tick, TickRange};

/// A resolved segment's absolute tick interval.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SegmentInterval {
    pub name: String,
    pub range: TickRange,
}

impl fmt::Display for SegmentInterval {
    // Segment list label; the end is printed inclusive, so an empty interval reads `5-4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = i128::from(self.range.end.0) - 1;
        write!(f, "{}-{}: {}", self.range.start.0, last, self.name)
    }
}

/// Segment name to `[start, end)` interval, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct TimelineIndex {
    intervals: Vec<SegmentInterval>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl TimelineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`; returns `false` and leaves the index untouched if it already exists.
    pub fn insert(&mut self, name: &str, range: TickRange) -> bool {
        if self.by_name.contains_key(name) {
            return false;
        }
        self.by_name.insert(name.to_string(), self.intervals.len());
        self.intervals.push(SegmentInterval {
            name: name.to_string(),
            range,
        });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<TickRange> {
        self.position(name).map(|i| self.intervals[i].range)
    }

    /// End tick (exclusive) of `name`.
    pub fn end_of(&self, name: &str) -> Option<Tick> {
        self.get(name).map(|r| r.end)
    }

    /// Declaration-order position of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Intervals containing `tick`, in declaration order. Linear scan.
    pub fn active_at(&self, tick: Tick) -> impl Iterator<Item = &SegmentInterval> {
        self.intervals.iter().filter(move |i| i.range.contains(tick))
    }

    /// Largest end tick over all segments.
    pub fn max_end(&self) -> Tick {
        self.intervals
            .iter()
            .map(|i| i.range.end)
            .max()
            .unwrap_or(Tick(0))
    }

    /// Playback extent for a seek bar: one second past the last segment end.
    pub fn playback_extent_millis(&self, fps: Fps) -> u64 {
        fps.millis_for_ticks(self.max_end().0).saturating_add(1000)
    }

    /// `"<start>-<last>: <name>"` labels in declaration order.
    pub fn labels(&self) -> Vec<String> {
        self.intervals.iter().map(ToString::to_string).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentInterval> {
        self.intervals.iter()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/index.rs"]
mod tests;
