//! Runtimes that drive an [`Engine`](crate::core::Engine).
//!
//! [`Runtime`] owns the winit event loop and a wgpu-backed window.
//! [`HeadlessRuntime`] runs the same engine without a window.

mod headless;
mod runtime;

pub use headless::{HeadlessOptions, HeadlessRuntime};
pub use runtime::Runtime;

use crate::config::EngineConfig;
use crate::input::{JoystickSource, NoJoysticks};

/// Joystick source for `config`: gilrs when joysticks are enabled, none
/// otherwise.
#[cfg(feature = "gamepad")]
pub fn joystick_source(config: &EngineConfig) -> Box<dyn JoystickSource> {
    if config.joystick.enabled {
        Box::new(crate::input::GilrsSource::new())
    } else {
        Box::new(NoJoysticks)
    }
}

/// Joystick source for `config`; built without the `gamepad` feature there
/// are no joysticks.
#[cfg(not(feature = "gamepad"))]
pub fn joystick_source(config: &EngineConfig) -> Box<dyn JoystickSource> {
    if config.joystick.enabled {
        log::info!("joysticks enabled but gamepad support is not compiled in");
    }
    Box::new(NoJoysticks)
}
