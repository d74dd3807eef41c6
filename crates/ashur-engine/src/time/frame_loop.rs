use super::clock::Clock;
use super::timer::FrameTimer;

/// Callbacks of [`run_frame_loop`].
pub trait FrameLoopHooks {
    /// Keeps the loop running.
    fn condition(&mut self) -> bool;

    /// Start of an iteration, before the timer is consulted.
    fn before_timer(&mut self) {}

    /// After the wait, before the ticks.
    fn after_timer(&mut self) {}

    /// Checked before each tick; `false` abandons the rest of this batch.
    fn sub_condition(&mut self) -> bool {
        true
    }

    fn pre_tick(&mut self) {}

    /// `render` is set on the last tick of a batch that should be drawn.
    fn post_tick(&mut self, render: bool);
}

/// Totals of one [`run_frame_loop`] call.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LoopStats {
    pub iterations: u64,
    pub ticks: u64,
    pub renders: u64,
}

/// Runs fixed-step logic until `hooks.condition()` turns false.
///
/// Each iteration sleeps until at least one tick is due, then runs the ticks
/// the timer grants.
pub fn run_frame_loop(
    timer: &mut FrameTimer,
    clock: &mut dyn Clock,
    hooks: &mut dyn FrameLoopHooks,
) -> LoopStats {
    let mut stats = LoopStats::default();
    let mut last = clock.now();

    while hooks.condition() {
        stats.iterations += 1;
        hooks.before_timer();

        let wait = timer.wait_for(clock.now().saturating_sub(last));
        if !wait.is_zero() {
            clock.sleep(wait);
        }

        let now = clock.now();
        let plan = timer.advance(now.saturating_sub(last));
        last = now;

        hooks.after_timer();

        for i in 0..plan.ticks {
            if !hooks.sub_condition() {
                break;
            }
            hooks.pre_tick();
            let render = plan.render && i + 1 == plan.ticks;
            hooks.post_tick(render);
            stats.ticks += 1;
            if render {
                stats.renders += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::time::ManualClock;

    #[derive(Default)]
    struct Recorder {
        budget: u32,
        calls: Vec<&'static str>,
        renders: Vec<bool>,
        stop_after_ticks: Option<usize>,
    }

    impl FrameLoopHooks for Recorder {
        fn condition(&mut self) -> bool {
            if self.budget == 0 {
                return false;
            }
            self.budget -= 1;
            true
        }

        fn before_timer(&mut self) {
            self.calls.push("before");
        }

        fn after_timer(&mut self) {
            self.calls.push("after");
        }

        fn sub_condition(&mut self) -> bool {
            self.stop_after_ticks.is_none_or(|n| self.renders.len() < n)
        }

        fn pre_tick(&mut self) {
            self.calls.push("pre");
        }

        fn post_tick(&mut self, render: bool) {
            self.calls.push("post");
            self.renders.push(render);
        }
    }

    #[test]
    fn sleeps_until_a_tick_is_due() {
        let mut timer = FrameTimer::new(100.0, 5, true);
        let mut clock = ManualClock::new();
        let mut hooks = Recorder { budget: 3, ..Default::default() };

        let stats = run_frame_loop(&mut timer, &mut clock, &mut hooks);

        assert_eq!(stats, LoopStats { iterations: 3, ticks: 3, renders: 3 });
        assert_eq!(clock.now(), Duration::from_millis(30));
        assert_eq!(hooks.calls[..4], ["before", "after", "pre", "post"]);
    }

    /// Clock that jumps ahead every time it is read after a sleep.
    struct StallingClock {
        inner: ManualClock,
        stall: Duration,
    }

    impl Clock for StallingClock {
        fn now(&self) -> Duration {
            self.inner.now()
        }

        fn sleep(&mut self, duration: Duration) {
            self.inner.sleep(duration + self.stall);
        }
    }

    #[test]
    fn only_the_last_tick_of_a_batch_renders() {
        let mut timer = FrameTimer::new(100.0, 5, true);
        let mut clock = StallingClock {
            inner: ManualClock::new(),
            stall: Duration::from_millis(20),
        };
        let mut hooks = Recorder { budget: 1, ..Default::default() };

        run_frame_loop(&mut timer, &mut clock, &mut hooks);
        assert_eq!(hooks.renders, vec![false, false, true]);
    }

    #[test]
    fn sub_condition_cuts_a_batch_short() {
        let mut timer = FrameTimer::new(100.0, 5, true);
        let mut clock = StallingClock {
            inner: ManualClock::new(),
            stall: Duration::from_millis(40),
        };
        let mut hooks = Recorder {
            budget: 1,
            stop_after_ticks: Some(2),
            ..Default::default()
        };

        let stats = run_frame_loop(&mut timer, &mut clock, &mut hooks);
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.renders, 0);
    }
}
