use std::io::Cursor;

use super::*;

fn encode_png(w: u32, h: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let buf = encode_png(1, 1, vec![100u8, 50u8, 200u8, 128u8]);

    let raster = decode_image(&buf).unwrap();
    assert_eq!(raster.width, 1);
    assert_eq!(raster.height, 1);
    assert_eq!(
        raster.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_garbage_is_decode_error() {
    let err = decode_image(b"definitely not an image").unwrap_err();
    assert!(matches!(err, SlidecastError::Decode(_)));
}

#[test]
fn from_premul_rgba8_validates_length() {
    assert!(Raster::from_premul_rgba8(2, 2, vec![0u8; 16]).is_ok());
    assert!(Raster::from_premul_rgba8(2, 2, vec![0u8; 15]).is_err());
    assert!(Raster::from_premul_rgba8(0, 2, Vec::new()).is_err());
}

#[test]
fn filled_raster_reads_back_pixel() {
    let r = Raster::filled(3, 2, [1, 2, 3, 255]).unwrap();
    assert_eq!(r.pixel(2, 1), [1, 2, 3, 255]);
    assert_eq!(r.rgba8_premul.len(), 3 * 2 * 4);
}

#[test]
fn unpremultiply_inverts_premultiply_for_opaque_and_half_alpha() {
    let mut px = vec![255u8, 0, 100, 255, 200, 100, 50, 128];
    let orig = px.clone();
    premultiply_rgba8_in_place(&mut px);
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[0..4], &orig[0..4]);
    for c in 0..3 {
        assert!((i32::from(px[4 + c]) - i32::from(orig[4 + c])).abs() <= 1);
    }
}
