use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8_weight};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over with an extra global `opacity` applied to `src`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = unit_to_u8_weight(opacity);
    if op == 0 || src[3] == 0 {
        return dst;
    }
    if op == 255 && src[3] == 255 {
        return src;
    }

    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Linear blend `a * (1 - t) + b * t`, all four channels.
pub fn crossfade(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let tt = unit_to_u8_weight(t);
    if tt == 0 {
        return a;
    }
    if tt == 255 {
        return b;
    }
    let it = 255u16 - tt;

    let mut out = [0u8; 4];
    for i in 0..4 {
        let av = mul_div255_u8(u16::from(a[i]), it);
        let bv = mul_div255_u8(u16::from(b[i]), tt);
        out[i] = add_sat_u8(av, bv);
    }
    out
}

/// Composite a span of `src` pixels over `dst` at `opacity`.
pub fn over_span_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> SlidecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::render(
            "over_span_in_place expects equal-length rgba8 buffers",
        ));
    }
    if unit_to_u8_weight(opacity) == 255 && src.chunks_exact(4).all(|s| s[3] == 255) {
        dst.copy_from_slice(src);
        return Ok(());
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend a span of `dst` pixels toward `src` by `t` (`dst = dst*(1-t) + src*t`).
pub fn crossfade_span_in_place(dst: &mut [u8], src: &[u8], t: f32) -> SlidecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::render(
            "crossfade_span_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = crossfade([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], t);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
