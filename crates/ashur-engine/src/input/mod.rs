//! Input subsystem.
//!
//! Raw events arrive as platform-agnostic `InputEvent`s and accumulate in
//! `InputState`. Once per tick the `InputFrontEnd` folds keyboard, joystick
//! and on-screen touch keys into per-player `Controls`.

mod controls;
mod frame;
mod front_end;
mod joystick;
mod keyboard;
pub mod platform;
mod state;
mod touch;
mod types;

pub use controls::{ControlCommand, Controls};
pub use frame::InputFrame;
pub use front_end::{InputFrontEnd, PlayerSource};
#[cfg(feature = "gamepad")]
pub use joystick::GilrsSource;
pub use joystick::{
    HatDirection, JoyInput, JoystickBindings, JoystickSnapshot, JoystickSource, NoJoysticks,
    poll_binding,
};
pub use keyboard::KeyboardBindings;
pub use state::InputState;
pub use touch::{
    ExtraKeys, FingerSample, KeyPos, TouchKey, TouchKeyMap, TouchScreenController, TouchSource,
};
pub use types::{InputEvent, Key, KeyState, Modifiers, TouchEvent, TouchPhase};
