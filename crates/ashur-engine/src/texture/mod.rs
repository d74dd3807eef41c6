//! Picture registry and GPU texture lifecycle.
//!
//! - [`TextureManager`]: eager and lazy loading, eviction, deletion
//! - [`ImageSource`]: where pixels come from (disk via `image`, or memory)
//! - [`Picture`] / [`PictureId`]: arena records handed to draw calls

mod chain;
mod manager;
mod picture;
mod source;

pub use manager::{MAX_LISTED_DIMENSION, TextureManager, TextureSettings};
pub use picture::{LoadState, MAX_BACKING_TEXTURES, Picture, PictureId};
pub use source::{FsImageSource, ImageSource, MemoryImageSource, SourceError};
