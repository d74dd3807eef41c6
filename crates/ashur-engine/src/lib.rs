//! Ashur engine crate.
//!
//! Core of a 2D platform engine:
//! - `texture`: picture registry with lazy loading and video-memory eviction
//! - `render`: layered render targets composited onto one or more screens
//! - `time`: fixed-rate frame timer and frame loop
//! - `input`: keyboard, joystick and on-screen touch keys folded into
//!   per-player controls
//!
//! `window` runs it all on winit + wgpu, or headless.

pub mod config;
pub mod core;
pub mod coords;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod texture;
pub mod time;
pub mod window;
