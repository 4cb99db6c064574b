use super::*;

#[test]
fn mul_div255_identity_and_zero() {
    assert_eq!(mul_div255_u16(200, 255), 200);
    assert_eq!(mul_div255_u16(200, 0), 0);
    assert_eq!(mul_div255_u8(255, 255), 255);
}

#[test]
fn mul_div255_rounds_to_nearest() {
    // 128 * 128 / 255 = 64.25
    assert_eq!(mul_div255_u8(128, 128), 64);
    // 255 * 128 / 255 = 128
    assert_eq!(mul_div255_u8(255, 128), 128);
}

#[test]
fn unit_weight_clamps_and_rejects_nan() {
    assert_eq!(unit_to_u8_weight(0.0), 0);
    assert_eq!(unit_to_u8_weight(1.0), 255);
    assert_eq!(unit_to_u8_weight(-3.0), 0);
    assert_eq!(unit_to_u8_weight(7.5), 255);
    assert_eq!(unit_to_u8_weight(f32::NAN), 0);
    assert_eq!(unit_to_u8_weight(0.5), 128);
}
