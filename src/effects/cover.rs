//! Cover-fit compositing.
//!
//! A photo is scaled uniformly until it fills the destination box on both axes, then the overflow
//! is cropped symmetrically. The box is always filled completely; the photo is never stretched.

use std::collections::HashMap;

use image::{ImageBuffer, Rgba};
use image::imageops::{self, FilterType};

use crate::assets::decode::Raster;
use crate::assets::photo::{Photo, PhotoId};
use crate::effects::composite::{crossfade_span_in_place, over_span_in_place};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::target::RenderTarget;

/// Destination box in target pixel space. `x`/`y` may be negative or exceed the target; drawing
/// is clipped to the target bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoverBox {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Box width, > 0.
    pub width: u32,
    /// Box height, > 0.
    pub height: u32,
}

impl CoverBox {
    /// The box covering the whole target.
    pub fn full(target: &RenderTarget) -> Self {
        Self {
            x: 0,
            y: 0,
            width: target.width(),
            height: target.height(),
        }
    }

    /// Shift horizontally by `dx` pixels.
    pub fn translated_x(self, dx: i64) -> Self {
        Self {
            x: self.x + dx,
            ..self
        }
    }
}

/// Scaled size and centered crop computed by [`cover_fit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoverFit {
    /// Width of the uniformly scaled image.
    pub scaled_width: u32,
    /// Height of the uniformly scaled image.
    pub scaled_height: u32,
    /// Pixels cropped from the left (and, up to rounding, from the right).
    pub crop_x: u32,
    /// Pixels cropped from the top (and, up to rounding, from the bottom).
    pub crop_y: u32,
}

/// Compute cover scaling of an `image_w x image_h` image into a `box_w x box_h` box.
///
/// A wider-than-box image is scaled to the box height and cropped horizontally; otherwise it is
/// scaled to the box width and cropped vertically. Scaled dimensions never fall below the box.
pub fn cover_fit(image_w: u32, image_h: u32, box_w: u32, box_h: u32) -> CoverFit {
    let (iw, ih) = (f64::from(image_w.max(1)), f64::from(image_h.max(1)));
    let (bw, bh) = (f64::from(box_w.max(1)), f64::from(box_h.max(1)));

    let (scaled_width, scaled_height) = if iw / ih > bw / bh {
        ((iw * bh / ih).round() as u32, box_h)
    } else {
        (box_w, (ih * bw / iw).round() as u32)
    };
    let scaled_width = scaled_width.max(box_w);
    let scaled_height = scaled_height.max(box_h);

    CoverFit {
        scaled_width,
        scaled_height,
        crop_x: (scaled_width - box_w) / 2,
        crop_y: (scaled_height - box_h) / 2,
    }
}

/// Resample `raster` into a `box_w x box_h` raster using cover scaling.
pub fn fit_cover(raster: &Raster, box_w: u32, box_h: u32) -> SlidecastResult<Raster> {
    if box_w == 0 || box_h == 0 {
        return Err(SlidecastError::render(
            "cover box width/height must be non-zero",
        ));
    }
    let fit = cover_fit(raster.width, raster.height, box_w, box_h);

    if fit.scaled_width == raster.width && fit.scaled_height == raster.height {
        let data = crop_rgba8(&raster.rgba8_premul, raster.width, fit, box_w, box_h);
        return Raster::from_premul_rgba8(box_w, box_h, data);
    }

    let src = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
        raster.width,
        raster.height,
        raster.rgba8_premul.to_vec(),
    )
    .ok_or_else(|| SlidecastError::render("raster buffer does not match its dimensions"))?;

    // Only the visible source rectangle is resampled, straight to the box size.
    let (sx, sy, sw, sh) = visible_source_rect(raster.width, raster.height, fit, box_w, box_h);
    let visible = imageops::crop_imm(&src, sx, sy, sw, sh).to_image();
    // Filtering premultiplied pixels avoids dark fringes at transparent edges.
    let resized = imageops::resize(&visible, box_w, box_h, FilterType::Triangle);
    Raster::from_premul_rgba8(box_w, box_h, resized.into_raw())
}

/// Source-pixel rectangle `(x, y, w, h)` that ends up inside the box after cover scaling.
///
/// Edges are widened to whole pixels, so the rectangle is never empty and never leaves the image.
pub fn visible_source_rect(
    image_w: u32,
    image_h: u32,
    fit: CoverFit,
    box_w: u32,
    box_h: u32,
) -> (u32, u32, u32, u32) {
    let span = |image: u32, scaled: u32, crop: u32, boxed: u32| {
        let scale = f64::from(scaled) / f64::from(image.max(1));
        let start = (f64::from(crop) / scale).floor() as u32;
        let end = (f64::from(crop + boxed) / scale).ceil() as u32;
        let start = start.min(image.saturating_sub(1));
        let end = end.clamp(start + 1, image.max(start + 1));
        (start, end - start)
    };
    let (x, w) = span(image_w, fit.scaled_width, fit.crop_x, box_w);
    let (y, h) = span(image_h, fit.scaled_height, fit.crop_y, box_h);
    (x, y, w, h)
}

fn crop_rgba8(src: &[u8], src_w: u32, fit: CoverFit, box_w: u32, box_h: u32) -> Vec<u8> {
    let stride = (src_w as usize) * 4;
    let row_len = (box_w as usize) * 4;
    let mut out = Vec::with_capacity(row_len * box_h as usize);
    for y in 0..box_h as usize {
        let start = (fit.crop_y as usize + y) * stride + (fit.crop_x as usize) * 4;
        out.extend_from_slice(&src[start..start + row_len]);
    }
    out
}

/// Composite a box-sized raster into `target` with its top-left corner at (`x`, `y`).
///
/// `opacity` scales the source alpha. Pixels outside the target are skipped.
pub fn blit_over(
    target: &mut RenderTarget,
    src: &Raster,
    x: i64,
    y: i64,
    opacity: f32,
) -> SlidecastResult<()> {
    blit_with(target, src, x, y, |dst, row| {
        over_span_in_place(dst, row, opacity)
    })
}

/// Blend the covered target region toward a box-sized raster by `t`.
pub fn blit_crossfade(
    target: &mut RenderTarget,
    src: &Raster,
    x: i64,
    y: i64,
    t: f32,
) -> SlidecastResult<()> {
    blit_with(target, src, x, y, |dst, row| {
        crossfade_span_in_place(dst, row, t)
    })
}

fn blit_with<F>(
    target: &mut RenderTarget,
    src: &Raster,
    x: i64,
    y: i64,
    mut op: F,
) -> SlidecastResult<()>
where
    F: FnMut(&mut [u8], &[u8]) -> SlidecastResult<()>,
{
    let tw = i64::from(target.width());
    let th = i64::from(target.height());
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(src.width)).min(tw);
    let y1 = (y + i64::from(src.height)).min(th);
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let span_px = (x1 - x0) as u32;
    let src_x = (x0 - x) as usize;
    let src_stride = (src.width as usize) * 4;
    for ty in y0..y1 {
        let sy = (ty - y) as usize;
        let start = sy * src_stride + src_x * 4;
        let row = &src.rgba8_premul[start..start + (span_px as usize) * 4];
        let dst = target.span_mut(x0 as u32, ty as u32, span_px);
        op(dst, row)?;
    }
    Ok(())
}

/// Draws photos into a render target with cover scaling.
///
/// Cover-fitted rasters are cached per `(photo, box size)`: a render reuses the same box size for
/// every frame, so each photo is resampled once. Photo ids must be unique within a render.
#[derive(Debug, Default)]
pub struct Compositor {
    fitted: HashMap<(PhotoId, u32, u32), Raster>,
}

impl Compositor {
    /// Create a compositor with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cover-fitted raster of `photo` for a `box_w x box_h` box.
    pub fn fitted(&mut self, photo: &Photo, box_w: u32, box_h: u32) -> SlidecastResult<Raster> {
        let key = (photo.id, box_w, box_h);
        if let Some(r) = self.fitted.get(&key) {
            return Ok(r.clone());
        }
        let r = fit_cover(&photo.raster, box_w, box_h)?;
        self.fitted.insert(key, r.clone());
        Ok(r)
    }

    /// Draw `photo` into `bx` using cover scaling at `opacity`.
    pub fn draw_cover(
        &mut self,
        target: &mut RenderTarget,
        photo: &Photo,
        bx: CoverBox,
        opacity: f32,
    ) -> SlidecastResult<()> {
        let fitted = self.fitted(photo, bx.width, bx.height)?;
        blit_over(target, &fitted, bx.x, bx.y, opacity)
    }

    /// Number of cached fitted rasters.
    pub fn cached_len(&self) -> usize {
        self.fitted.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/cover.rs"]
mod tests;
