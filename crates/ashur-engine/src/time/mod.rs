//! Time subsystem.
//!
//! Frame pacing for a fixed-step game loop, independent of the runtime:
//! - a [`Clock`] supplies time (real or manual, for tests and headless runs)
//! - [`FrameTimer`] turns elapsed time into logic ticks and render decisions
//! - [`run_frame_loop`] drives the two through [`FrameLoopHooks`]
//! - [`FrameClock`] measures presentation-side delta time

mod clock;
mod frame_clock;
mod frame_loop;
mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame_clock::{FrameClock, FrameTime};
pub use frame_loop::{FrameLoopHooks, LoopStats, run_frame_loop};
pub use timer::{FramePlan, FrameTimer};
