pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Map a unit-interval weight to an 8-bit fixed-point weight.
pub(crate) fn unit_to_u8_weight(t: f32) -> u16 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    ((t * 255.0).round() as i32).clamp(0, 255) as u16
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
