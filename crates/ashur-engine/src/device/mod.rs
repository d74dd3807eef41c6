//! Render device layer.
//!
//! [`RenderBackend`] is the seam between the engine and the GPU:
//! - [`WgpuBackend`] draws through wgpu onto a winit window surface
//! - [`HeadlessBackend`] keeps the same memory accounting but only records
//!   commands (tests, `--headless` runs)
//!
//! [`Gpu`] owns the wgpu instance/device/surface and frame acquisition.

mod backend;
mod error;
mod frame;
mod gpu;
mod headless;
mod image_data;
mod init;
mod ledger;
pub mod projection;
mod surface;
mod wgpu_backend;

pub use backend::{
    BackendLimits, DrawImage, DrawSource, HwViewport, RenderBackend, ScreenPlacement, TargetDesc,
    TargetHandle, TextureFilter, TextureHandle, ViewportOrigin,
};
pub use error::{BackendError, SurfaceErrorAction};
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use headless::{BackendCommand, HeadlessBackend};
pub use image_data::ImageData;
pub use init::GpuInit;
pub use ledger::VramLedger;
pub use wgpu_backend::WgpuBackend;
