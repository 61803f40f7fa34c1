//! The finished symbol: a packed 1-bit-per-module bitmap plus the
//! renderers that turn it into an image.

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::error::{QrArtError, Result};

/// Quiet zone width in modules on every side of a rendered symbol.
pub const QUIET_ZONE: u32 = 4;

/// A QR code as a packed bitmap. Bit (x, y) is black iff
/// `bitmap[y*stride + x/8] & (0x80 >> (x%8)) != 0`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Code {
    pub bitmap: Vec<u8>,
    pub size: usize,
    pub stride: usize,
    pub scale: u32,
}

impl Code {
    pub fn new(size: usize, scale: u32) -> Code {
        let stride = (size + 7) / 8;
        Code {
            bitmap: vec![0u8; stride * size],
            size,
            stride,
            scale,
        }
    }

    pub fn black(&self, x: usize, y: usize) -> bool {
        self.bitmap[y * self.stride + x / 8] & (0x80 >> (x % 8)) != 0
    }

    pub fn set_black(&mut self, x: usize, y: usize) {
        self.bitmap[y * self.stride + x / 8] |= 0x80 >> (x % 8);
    }

    /// Render to a grayscale image with quiet zone, one module per
    /// `scale`x`scale` square.
    pub fn to_image(&self) -> GrayImage {
        let scale = self.scale.max(1);
        let side = (self.size as u32 + 2 * QUIET_ZONE) * scale;
        GrayImage::from_fn(side, side, |px, py| {
            let mx = px / scale;
            let my = py / scale;
            if mx < QUIET_ZONE
                || my < QUIET_ZONE
                || mx >= QUIET_ZONE + self.size as u32
                || my >= QUIET_ZONE + self.size as u32
            {
                return Luma([255u8]);
            }
            let x = (mx - QUIET_ZONE) as usize;
            let y = (my - QUIET_ZONE) as usize;
            if self.black(x, y) {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }

    /// PNG-encode the rendered image.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let img = self.to_image();
        let mut buf = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| QrArtError::ImageLoad(e.to_string()))?;
        Ok(buf)
    }
}

/// Build a scaled RGBA diagnostic image over the module grid. The
/// closure returns the 0xRRGGBBAA color for each module; the quiet zone
/// is rendered white.
pub fn make_module_image<F>(size: usize, scale: u32, f: F) -> RgbaImage
where
    F: Fn(usize, usize) -> u32,
{
    let scale = scale.max(1);
    let side = (size as u32 + 2 * QUIET_ZONE) * scale;
    RgbaImage::from_fn(side, side, |px, py| {
        let mx = px / scale;
        let my = py / scale;
        if mx < QUIET_ZONE
            || my < QUIET_ZONE
            || mx >= QUIET_ZONE + size as u32
            || my >= QUIET_ZONE + size as u32
        {
            return Rgba([255, 255, 255, 255]);
        }
        let rgba = f((mx - QUIET_ZONE) as usize, (my - QUIET_ZONE) as usize);
        Rgba([
            (rgba >> 24) as u8,
            (rgba >> 16) as u8,
            (rgba >> 8) as u8,
            rgba as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_addressing() {
        let mut c = Code::new(21, 1);
        assert_eq!(c.stride, 3);
        assert!(!c.black(0, 0));
        c.set_black(0, 0);
        c.set_black(20, 0);
        c.set_black(8, 5);
        assert!(c.black(0, 0));
        assert!(c.black(20, 0));
        assert!(c.black(8, 5));
        assert!(!c.black(1, 0));
        assert_eq!(c.bitmap[0], 0x80);
        assert_eq!(c.bitmap[2], 0x80 >> 4);
        assert_eq!(c.bitmap[5 * 3 + 1], 0x80);
    }

    #[test]
    fn image_has_quiet_zone() {
        let mut c = Code::new(21, 2);
        c.set_black(0, 0);
        let img = c.to_image();
        assert_eq!(img.dimensions(), ((21 + 8) * 2, (21 + 8) * 2));
        // corner of the quiet zone is white
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        // first module is black, scaled
        assert_eq!(img.get_pixel(8, 8)[0], 0);
        assert_eq!(img.get_pixel(9, 9)[0], 0);
        assert_eq!(img.get_pixel(10, 8)[0], 255);
    }

    #[test]
    fn module_image_colors() {
        let img = make_module_image(2, 1, |x, y| if x == y { 0x000000ff } else { 0xff0000ff });
        assert_eq!(img.get_pixel(4, 4).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(5, 4).0, [255, 0, 0, 255]);
    }
}
