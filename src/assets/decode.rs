use std::sync::Arc;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// A decoded image as premultiplied RGBA8 pixels.
///
/// Pixel data is shared (`Arc`) so a raster can be handed to several frames without copying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed, row-major, premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl Raster {
    /// Wrap premultiplied RGBA8 bytes, validating dimensions against the buffer length.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> SlidecastResult<Self> {
        if width == 0 || height == 0 {
            return Err(SlidecastError::decode("raster width/height must be non-zero"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| SlidecastError::decode("raster size overflow"))?;
        if data.len() != expected {
            return Err(SlidecastError::decode(format!(
                "raster buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        })
    }

    /// A raster where every pixel is `px` (premultiplied).
    pub fn filled(width: u32, height: u32, px: [u8; 4]) -> SlidecastResult<Self> {
        let n = (width as usize).saturating_mul(height as usize);
        Self::from_premul_rgba8(width, height, px.repeat(n))
    }

    /// Read the premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let d = &self.rgba8_premul;
        [d[idx], d[idx + 1], d[idx + 2], d[idx + 3]]
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> SlidecastResult<Raster> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| SlidecastError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Raster::from_premul_rgba8(width, height, rgba8_premul)
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Undo premultiplication, for writers that expect straight alpha (PNG).
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in 0..3 {
            px[c] = ((px[c] as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
