use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageReader;

use crate::device::ImageData;

/// Failure while reading a picture or one of its side files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            SourceError::NotFound(path.to_path_buf())
        } else {
            SourceError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}

/// Where picture pixels come from.
pub trait ImageSource {
    /// Decodes the whole image to RGBA8.
    fn decode(&self, path: &Path) -> Result<ImageData, SourceError>;

    /// Reads only the image dimensions.
    fn probe(&self, path: &Path) -> Result<(u32, u32), SourceError>;

    /// Reads a small text file (size sidecars).
    fn read_text(&self, path: &Path) -> Result<String, SourceError>;
}

/// Decodes pictures from disk with the `image` crate.
///
/// The format is sniffed from file contents, so extensionless supplement files
/// (`picture.png1`) decode like their primary.
#[derive(Debug, Default, Copy, Clone)]
pub struct FsImageSource;

impl FsImageSource {
    fn reader(path: &Path) -> Result<ImageReader<io::BufReader<std::fs::File>>, SourceError> {
        ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| SourceError::from_io(path, e))
    }
}

impl ImageSource for FsImageSource {
    fn decode(&self, path: &Path) -> Result<ImageData, SourceError> {
        let image = Self::reader(path)?
            .decode()
            .map_err(|e| SourceError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(ImageData::new(width, height, image.into_raw()))
    }

    fn probe(&self, path: &Path) -> Result<(u32, u32), SourceError> {
        Self::reader(path)?
            .into_dimensions()
            .map_err(|e| SourceError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn read_text(&self, path: &Path) -> Result<String, SourceError> {
        std::fs::read_to_string(path).map_err(|e| SourceError::from_io(path, e))
    }
}

/// In-memory pictures keyed by path; used by tests and headless demos.
#[derive(Debug, Default)]
pub struct MemoryImageSource {
    images: HashMap<PathBuf, ImageData>,
    texts: HashMap<PathBuf, String>,
    decodes: Cell<usize>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, path: impl Into<PathBuf>, image: ImageData) {
        self.images.insert(path.into(), image);
    }

    pub fn insert_text(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.texts.insert(path.into(), text.into());
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, image: ImageData) -> Self {
        self.insert_image(path, image);
        self
    }

    pub fn with_text(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert_text(path, text);
        self
    }

    /// Number of successful `decode` calls.
    pub fn decode_count(&self) -> usize {
        self.decodes.get()
    }
}

impl ImageSource for MemoryImageSource {
    fn decode(&self, path: &Path) -> Result<ImageData, SourceError> {
        let image = self
            .images
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))?;
        self.decodes.set(self.decodes.get() + 1);
        Ok(image)
    }

    fn probe(&self, path: &Path) -> Result<(u32, u32), SourceError> {
        self.images
            .get(path)
            .map(|i| (i.width, i.height))
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))
    }

    fn read_text(&self, path: &Path) -> Result<String, SourceError> {
        self.texts
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_source_reads_extensionless_supplements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.png1");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let src = FsImageSource;
        assert_eq!(src.probe(&path).unwrap(), (3, 2));
        let data = src.decode(&path).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(&data.pixels[..4], &[9, 8, 7, 255]);
    }

    #[test]
    fn fs_source_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsImageSource.decode(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
