/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Failure reported by a render backend.
///
/// `OutOfMemory` is the only variant the texture manager recovers from
/// (evict, then retry once); everything else marks the request failed.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("out of video memory: requested {requested} bytes, {free} bytes free")]
    OutOfMemory { requested: u64, free: u64 },

    #[error("texture {width}x{height} exceeds the backend limit of {max} pixels")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("image data is {actual} bytes, expected {expected}")]
    BadImageData { expected: usize, actual: usize },

    #[error("unknown {0} handle")]
    InvalidHandle(&'static str),

    #[error("surface lost or unavailable ({0:?})")]
    Surface(SurfaceErrorAction),
}

impl BackendError {
    #[inline]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, BackendError::OutOfMemory { .. })
    }
}
