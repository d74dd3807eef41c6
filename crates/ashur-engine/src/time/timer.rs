use std::time::Duration;

use crate::config::TimerConfig;

/// What the loop should do after feeding elapsed time to the timer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FramePlan {
    /// Logic ticks to run now.
    pub ticks: u32,
    /// Render after the last tick.
    pub render: bool,
    /// Backlog discarded because it exceeded the catch-up cap.
    pub dropped: Duration,
}

impl FramePlan {
    pub fn is_idle(&self) -> bool {
        self.ticks == 0
    }
}

/// Fixed-timestep accumulator.
///
/// Elapsed time is banked; every whole period is one logic tick. At most
/// `max_catch_up` ticks run per call. Beyond that the surplus whole periods are
/// thrown away (the sub-period remainder is kept) and, with frame skipping on,
/// that frame is not rendered.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    period: Duration,
    max_catch_up: u32,
    frame_skip: bool,
    acc: Duration,
    ticks: u64,
    rendered: u64,
    skipped: u64,
}

impl FrameTimer {
    /// # Panics
    ///
    /// If `tick_rate` is not a positive finite number, or is so small that
    /// its period does not fit a `Duration`.
    pub fn new(tick_rate: f64, max_catch_up: u32, frame_skip: bool) -> Self {
        assert!(
            tick_rate.is_finite() && tick_rate > 0.0,
            "tick rate must be positive, got {tick_rate}"
        );
        let Ok(period) = Duration::try_from_secs_f64(1.0 / tick_rate) else {
            panic!("tick rate {tick_rate} is too small for a representable period");
        };
        let period = period.max(Duration::from_nanos(1));
        Self {
            period,
            max_catch_up: max_catch_up.max(1),
            frame_skip,
            acc: Duration::ZERO,
            ticks: 0,
            rendered: 0,
            skipped: 0,
        }
    }

    pub fn from_config(config: &TimerConfig) -> Self {
        Self::new(config.tick_rate, config.max_catch_up, config.frame_skip)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn max_catch_up(&self) -> u32 {
        self.max_catch_up
    }

    /// Banked time not yet consumed by ticks.
    pub fn pending(&self) -> Duration {
        self.acc
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn rendered_frames(&self) -> u64 {
        self.rendered
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped
    }

    /// Drops any banked time, e.g. after loading or a pause.
    pub fn reset(&mut self) {
        self.acc = Duration::ZERO;
    }

    pub fn time_until_next_tick(&self) -> Duration {
        self.wait_for(Duration::ZERO)
    }

    /// Time still missing for one tick once `unaccounted` is banked.
    pub fn wait_for(&self, unaccounted: Duration) -> Duration {
        self.period.saturating_sub(self.acc + unaccounted)
    }

    pub fn advance(&mut self, elapsed: Duration) -> FramePlan {
        self.acc += elapsed;

        let period = self.period.as_nanos();
        let k = self.acc.as_nanos() / period;
        if k == 0 {
            return FramePlan::default();
        }

        let remainder = Duration::from_nanos((self.acc.as_nanos() % period) as u64);
        self.acc = remainder;

        let cap = u128::from(self.max_catch_up);
        if k <= cap {
            let ticks = k as u32;
            self.ticks += u64::from(ticks);
            self.rendered += 1;
            return FramePlan {
                ticks,
                render: true,
                dropped: Duration::ZERO,
            };
        }

        let dropped = Duration::from_nanos(((k - cap) * period) as u64);
        let render = !self.frame_skip;
        self.ticks += u64::from(self.max_catch_up);
        if render {
            self.rendered += 1;
        } else {
            self.skipped += 1;
        }
        log::debug!("frame timer behind by {k} ticks; dropped {dropped:?}");

        FramePlan {
            ticks: self.max_catch_up,
            render,
            dropped,
        }
    }
}
