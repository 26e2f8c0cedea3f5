use std::fmt;
use std::path::PathBuf;

use crate::document::segment::CropRect;
use crate::foundation::core::{Tick, TickRange};

/// One segment's frame image instantiated at one tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Placement {
    /// Owning segment name.
    pub segment: String,
    /// Asset file name relative to the frame directory.
    pub file_name: String,
    /// Normalized asset path; the asset cache key.
    pub asset_path: PathBuf,
    /// Source frame index encoded in `file_name`.
    pub source_frame: i64,
    pub x: i32,
    pub y: i32,
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,
    /// Whether the renderer should draw the inverted variant.
    pub invert: bool,
    /// The asset failed to load when the table was built.
    pub broken: bool,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.file_name)
    }
}

/// Tick-indexed placement lists; within a tick, placements are in segment declaration order
/// (back to front).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct FrameTable {
    ticks: Vec<Vec<Placement>>,
}

impl FrameTable {
    /// Largest number of ticks a table may hold (a little over 11 hours at 25 fps).
    pub const MAX_LEN: u64 = 1 << 20;

    /// Table of `len` empty ticks, capped at [`FrameTable::MAX_LEN`].
    pub fn with_len(len: u64) -> Self {
        let len = usize::try_from(len.min(Self::MAX_LEN)).unwrap_or(0);
        Self {
            ticks: vec![Vec::new(); len],
        }
    }

    pub fn len(&self) -> u64 {
        self.ticks.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Append `placement` at `tick`, growing the table if needed. Never truncates.
    ///
    /// Callers keep `tick` below [`FrameTable::MAX_LEN`].
    pub fn push(&mut self, tick: Tick, placement: Placement) {
        let idx = usize::try_from(tick.0).unwrap_or(usize::MAX);
        if idx >= self.ticks.len() {
            self.ticks.resize_with(idx + 1, Vec::new);
        }
        self.ticks[idx].push(placement);
    }

    /// Placements at `tick`, or `None` past the end.
    pub fn at(&self, tick: Tick) -> Option<&[Placement]> {
        let idx = usize::try_from(tick.0).ok()?;
        self.ticks.get(idx).map(Vec::as_slice)
    }

    /// Clamp `tick` to the last tick of the table.
    pub fn clamp_tick(&self, tick: Tick) -> Tick {
        TickRange {
            start: Tick(0),
            end: Tick(self.len()),
        }
        .clamp(tick)
    }

    /// Placements at `tick` clamped to the last tick; empty for an empty table.
    pub fn at_clamped(&self, tick: Tick) -> &[Placement] {
        self.at(self.clamp_tick(tick)).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tick, &[Placement])> {
        self.ticks
            .iter()
            .enumerate()
            .map(|(i, p)| (Tick(i as u64), p.as_slice()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/frame_table.rs"]
mod tests;
