use crate::document::segment::SegmentSpec;

/// Source frame index shown at each successive tick of a segment.
///
/// The iterator is infinite; callers zip it with the segment's tick range. Each source frame is
/// held for `framelen` ticks. Past `to` the index wraps to `from` when looping, otherwise it
/// sticks at `to`.
#[derive(Clone, Debug)]
pub struct FrameProgression {
    from: i64,
    to: i64,
    framelen: i64,
    looping: bool,
    frame: i64,
    counter: i64,
}

impl FrameProgression {
    /// Start a progression over `[from, to]`.
    ///
    /// `frameoffset` is the number of ticks already spent on the first frame. A negative offset on
    /// a looping progression pre-winds it as if it had been playing for `-frameoffset` ticks
    /// before the first tick; a negative offset without looping holds `from` longer.
    pub fn new(from: i64, to: i64, framelen: i64, frameoffset: i64, looping: bool) -> Self {
        let framelen = framelen.max(1);
        let to = to.max(from);
        let mut frame = from;
        let mut counter = frameoffset;

        if frameoffset < 0 && looping {
            let period = to
                .saturating_sub(from)
                .saturating_add(1)
                .saturating_mul(framelen);
            // |offset % period| stays below `period`, so no negation of i64::MIN.
            let back = (frameoffset % period).abs();
            frame = to - back / framelen;
            counter = framelen - back % framelen;
        }

        Self {
            from,
            to,
            framelen,
            looping,
            frame,
            counter,
        }
    }

    pub fn for_segment(spec: &SegmentSpec) -> Self {
        Self::new(
            spec.from,
            spec.to,
            spec.framelen,
            spec.frameoffset,
            spec.looping,
        )
    }
}

impl Iterator for FrameProgression {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.counter >= self.framelen {
            self.counter = 0;
            self.frame = if self.frame < self.to {
                self.frame + 1
            } else if self.looping {
                self.from
            } else {
                self.to
            };
        }
        self.counter += 1;
        Some(self.frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/progression.rs"]
mod tests;
