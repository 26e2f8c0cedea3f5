use crate::foundation::error::{FlipreelError, FlipreelResult};

/// Discrete animation time unit (one video frame).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Tick(pub u64);

/// Half-open tick interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TickRange {
    pub start: Tick,
    pub end: Tick, // exclusive
}

impl TickRange {
    pub fn len_ticks(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, t: Tick) -> bool {
        self.start.0 <= t.0 && t.0 < self.end.0
    }

    /// Clamp `t` into the range; an empty (or inverted) range yields `start`.
    pub fn clamp(self, t: Tick) -> Tick {
        if self.end.0 <= self.start.0 {
            return self.start;
        }
        let max_inclusive = self.end.0.saturating_sub(1);
        Tick(t.0.clamp(self.start.0, max_inclusive))
    }
}

/// Timeline rate as a rational number of ticks per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> FlipreelResult<Self> {
        if den == 0 {
            return Err(FlipreelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(FlipreelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Floor of `millis * fps / 1000`.
    pub fn ticks_for_millis(self, millis: u64) -> u64 {
        let n = u128::from(millis) * u128::from(self.num);
        let d = 1000u128 * u128::from(self.den);
        u64::try_from(n / d).unwrap_or(u64::MAX)
    }

    /// Playback position (floor, in milliseconds) at which `ticks` begins.
    pub fn millis_for_ticks(self, ticks: u64) -> u64 {
        let n = u128::from(ticks) * 1000 * u128::from(self.den);
        let d = u128::from(self.num);
        u64::try_from(n / d).unwrap_or(u64::MAX)
    }
}

/// Output surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
