use crate::{
    foundation::core::{Fps, Tick},
    timeline::builder::Timeline,
    timeline::frame_table::{FrameTable, Placement},
    timeline::index::TimelineIndex,
};

/// Read-only mapping between playback time, ticks, and what is on screen.
#[derive(Clone, Copy, Debug)]
pub struct PositionMapper<'a> {
    frames: &'a FrameTable,
    index: &'a TimelineIndex,
    fps: Fps,
}

impl<'a> PositionMapper<'a> {
    pub fn new(timeline: &'a Timeline, fps: Fps) -> Self {
        Self {
            frames: &timeline.frames,
            index: &timeline.index,
            fps,
        }
    }

    /// Tick shown at `playback_millis`, clamped to the table.
    pub fn tick_for_time(&self, playback_millis: u64) -> Tick {
        self.frames
            .clamp_tick(Tick(self.fps.ticks_for_millis(playback_millis)))
    }

    /// Playback position at which `tick` starts.
    pub fn millis_for_tick(&self, tick: Tick) -> u64 {
        self.fps.millis_for_ticks(tick.0)
    }

    /// Playback position of the first tick of `segment`.
    pub fn seek_millis(&self, segment: &str) -> Option<u64> {
        self.index
            .get(segment)
            .map(|r| self.millis_for_tick(r.start))
    }

    /// Names of segments whose interval contains `tick`, in declaration order.
    pub fn segments_active_at(&self, tick: Tick) -> Vec<&'a str> {
        self.index
            .active_at(tick)
            .map(|i| i.name.as_str())
            .collect()
    }

    /// Placements to draw for `tick`, clamped to the last tick.
    pub fn placements_at(&self, tick: Tick) -> &'a [Placement] {
        self.frames.at_clamped(tick)
    }

    /// Status line for `tick`: `Frame <tick> / [<segment>:<file>, ...]`.
    pub fn describe(&self, tick: Tick) -> String {
        let tick = self.frames.clamp_tick(tick);
        let items = self
            .frames
            .at_clamped(tick)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("Frame {} / [{items}]", tick.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/position.rs"]
mod tests;
