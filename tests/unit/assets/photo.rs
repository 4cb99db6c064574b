use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn png_bytes(px: [u8; 4]) -> Arc<[u8]> {
    let img = image::RgbaImage::from_raw(2, 2, px.repeat(4)).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf.into()
}

#[test]
fn from_path_uses_file_name_as_label() {
    let src = PhotoSource::from_path(PhotoId(1), "/tmp/holiday/beach.jpg");
    assert_eq!(src.label, "beach.jpg");
}

#[test]
fn decode_all_preserves_order() {
    let sources: Vec<PhotoSource> = (0..5u8)
        .map(|i| PhotoSource {
            id: PhotoId(u64::from(i)),
            label: format!("p{i}"),
            data: PhotoData::Bytes(png_bytes([i * 10, 0, 0, 255])),
        })
        .collect();

    let photos = decode_all(&FsImageDecoder, &sources).unwrap();
    assert_eq!(photos.len(), 5);
    for (i, p) in photos.iter().enumerate() {
        assert_eq!(p.id, PhotoId(i as u64));
        assert_eq!(p.raster.pixel(0, 0), [i as u8 * 10, 0, 0, 255]);
    }
}

#[test]
fn decode_all_fails_when_any_source_is_bad() {
    let mut sources: Vec<PhotoSource> = (0..3u64)
        .map(|i| PhotoSource {
            id: PhotoId(i),
            label: format!("p{i}"),
            data: PhotoData::Bytes(png_bytes([0, 0, 0, 255])),
        })
        .collect();
    sources[1].data = PhotoData::Bytes(Arc::from(&b"broken"[..]));

    let err = decode_all(&FsImageDecoder, &sources).unwrap_err();
    match err {
        SlidecastError::Decode(msg) => assert!(msg.contains("p1")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_decode_error() {
    let src = PhotoSource::from_path(PhotoId(0), "/definitely/not/here.png");
    let err = FsImageDecoder.decode(&src).unwrap_err();
    assert!(matches!(err, SlidecastError::Decode(_)));
}

struct CountingDecoder(AtomicUsize);

impl ImageDecoder for CountingDecoder {
    fn decode(&self, _source: &PhotoSource) -> SlidecastResult<Raster> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Raster::filled(1, 1, [0, 0, 0, 255])
    }
}

#[test]
fn decode_all_invokes_decoder_once_per_source() {
    let decoder = CountingDecoder(AtomicUsize::new(0));
    let sources: Vec<PhotoSource> = (0..4u64)
        .map(|i| PhotoSource::from_path(PhotoId(i), format!("{i}.png")))
        .collect();
    decode_all(&decoder, &sources).unwrap();
    assert_eq!(decoder.0.load(Ordering::SeqCst), 4);
}
