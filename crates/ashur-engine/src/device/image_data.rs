/// Decoded RGBA8 pixels ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }

    /// Single-color image; handy for placeholders and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self { width, height, pixels }
    }

    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }

    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() as u64 == self.byte_len()
    }

    /// Copies rows `y..y + rows` into a new image.
    ///
    /// Rows past the bottom edge are dropped.
    pub fn rows(&self, y: u32, rows: u32) -> ImageData {
        let y0 = y.min(self.height);
        let y1 = y.saturating_add(rows).min(self.height);
        let stride = self.width as usize * 4;
        let pixels = self.pixels[y0 as usize * stride..y1 as usize * stride].to_vec();
        ImageData::new(self.width, y1 - y0, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_slices_and_clamps() {
        let img = ImageData::solid(2, 5, [1, 2, 3, 4]);
        let top = img.rows(0, 3);
        let rest = img.rows(3, 3);
        assert_eq!((top.width, top.height), (2, 3));
        assert_eq!(rest.height, 2);
        assert!(top.is_consistent() && rest.is_consistent());
    }
}
