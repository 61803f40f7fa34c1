//! The target model: per-module brightness goals derived from a user
//! image, plus the local-contrast score used to rank modules by how
//! much they matter visually.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::{QrArtError, Result};

/// Half-width of the local contrast window (an 11x11 neighborhood).
const CONTRAST_DEL: i32 = 5;

/// A grid of brightness goals in target space. Values are 0..=255, or
/// -1 where the image is transparent or absent. (dx, dy) places the
/// symbol's top-left corner within the grid.
pub struct Target {
    rows: Vec<Vec<i32>>,
    pub dx: i32,
    pub dy: i32,
}

impl Target {
    /// Decode an image from raw bytes and resample it to fit a
    /// `side`-module grid, preserving aspect ratio.
    pub fn from_bytes(data: &[u8], side: u32, dx: i32, dy: i32) -> Result<Target> {
        let img = image::load_from_memory(data).map_err(|e| QrArtError::ImageLoad(e.to_string()))?;
        Ok(Target::from_image(&img, side, dx, dy))
    }

    /// Resample a decoded image to fit a `side`-module grid. Luminance
    /// uses the integer Rec. 601 weights; fully transparent pixels are
    /// left unset.
    pub fn from_image(img: &DynamicImage, side: u32, dx: i32, dy: i32) -> Target {
        let (w, h) = img.dimensions();
        let (tw, th) = if w > h {
            (side, (h * side / w).max(1))
        } else {
            ((w * side / h).max(1), side)
        };
        let resized = image::imageops::resize(&img.to_rgba8(), tw, th, FilterType::Triangle);

        let mut rows = Vec::with_capacity(th as usize);
        for y in 0..th {
            let mut row = Vec::with_capacity(tw as usize);
            for x in 0..tw {
                let p = resized.get_pixel(x, y).0;
                let (r, g, b, a) = (p[0] as u32, p[1] as u32, p[2] as u32, p[3]);
                if a == 0 {
                    row.push(-1);
                } else {
                    row.push(((299 * r + 587 * g + 114 * b + 500) / 1000) as i32);
                }
            }
            rows.push(row);
        }
        Target { rows, dx, dy }
    }

    /// A uniform target covering a `side` x `side` grid.
    pub fn uniform(value: i32, side: usize) -> Target {
        Target {
            rows: vec![vec![value; side]; side],
            dx: 0,
            dy: 0,
        }
    }

    pub fn from_rows(rows: Vec<Vec<i32>>, dx: i32, dy: i32) -> Target {
        Target { rows, dx, dy }
    }

    /// Brightness goal and contrast priority for module (x, y). Out of
    /// bounds or unset positions read as white with no priority.
    pub fn sample(&self, x: i32, y: i32) -> (u8, i32) {
        let tx = x + self.dx;
        let ty = y + self.dy;
        if ty < 0 || ty as usize >= self.rows.len() {
            return (255, -1);
        }
        let row = &self.rows[ty as usize];
        if tx < 0 || tx as usize >= row.len() {
            return (255, -1);
        }
        let v0 = row[tx as usize];
        if v0 < 0 {
            return (255, -1);
        }

        // contrast: variance over the clipped 11x11 window
        let mut n = 0i32;
        let mut sum = 0i32;
        let mut sumsq = 0i64;
        for dy in -CONTRAST_DEL..=CONTRAST_DEL {
            let yy = ty + dy;
            if yy < 0 || yy as usize >= self.rows.len() {
                continue;
            }
            let wrow = &self.rows[yy as usize];
            for dx in -CONTRAST_DEL..=CONTRAST_DEL {
                let xx = tx + dx;
                if xx < 0 || xx as usize >= wrow.len() {
                    continue;
                }
                let v = wrow[xx as usize];
                sum += v;
                sumsq += (v as i64) * (v as i64);
                n += 1;
            }
        }
        let avg = sum / n;
        let contrast = (sumsq / n as i64) as i32 - avg * avg;
        (v0 as u8, contrast)
    }
}
