//! Core engine-facing contracts.
//!
//! [`App`] is what a game implements; [`Engine`] owns the renderer, the input
//! front-end and the frame timer, and drives the app from either runtime.

mod app;
mod ctx;
mod engine;

pub use app::{App, AppControl};
pub use ctx::{DrawCtx, TickCtx};
pub use engine::Engine;
