use std::time::Duration;

use super::clock::Clock;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame, in seconds.
    pub dt: f32,

    /// Clock reading taken at the tick.
    pub now: Duration,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Per-frame delta time with clamps, for presentation-side animation.
///
/// Game logic advances on the fixed step of [`FrameTimer`](super::FrameTimer);
/// this clock only measures how long each presented frame took.
///
/// Delta time is clamped to avoid pathological values when the application is
/// paused by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Duration>,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: None,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Forgets the baseline; the next tick reports the minimum dt.
    ///
    /// Useful after surface reconfigure events or when resuming from suspension.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self, clock: &dyn Clock) -> FrameTime {
        self.tick_at(clock.now())
    }

    /// Advances the clock to an explicit reading.
    pub fn tick_at(&mut self, now: Duration) -> FrameTime {
        let dt = match self.last {
            Some(last) => now.saturating_sub(last).clamp(self.dt_min, self.dt_max),
            None => self.dt_min,
        };
        self.last = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    #[test]
    fn dt_is_clamped_both_ways() {
        let mut clock = ManualClock::new();
        let mut fc = FrameClock::new();

        let first = fc.tick(&clock);
        assert_eq!(first.frame_index, 0);
        assert_eq!(first.dt, Duration::from_micros(100).as_secs_f32());

        clock.advance(Duration::from_millis(16));
        assert_eq!(fc.tick(&clock).dt, Duration::from_millis(16).as_secs_f32());

        clock.advance(Duration::from_secs(3));
        let stalled = fc.tick(&clock);
        assert_eq!(stalled.dt, 0.25);
        assert_eq!(stalled.frame_index, 2);
    }
}
