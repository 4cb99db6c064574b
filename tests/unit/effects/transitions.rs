use super::*;
use crate::assets::decode::Raster;
use crate::assets::photo::PhotoId;
use crate::foundation::core::Canvas;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn target(w: u32, h: u32) -> RenderTarget {
    RenderTarget::new(Canvas {
        width: w,
        height: h,
    })
    .unwrap()
}

fn solid(id: u64, px: [u8; 4], w: u32, h: u32) -> Photo {
    Photo {
        id: PhotoId(id),
        raster: Raster::filled(w, h, px).unwrap(),
    }
}

/// Columns are a horizontal gradient so position within the photo is observable.
fn gradient(id: u64, w: u32, h: u32) -> Photo {
    let mut data = Vec::new();
    for _y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[(x * 255 / (w - 1)) as u8, 0, 0, 255]);
        }
    }
    Photo {
        id: PhotoId(id),
        raster: Raster::from_premul_rgba8(w, h, data).unwrap(),
    }
}

fn cover_only(p: &Photo, w: u32, h: u32) -> Vec<u8> {
    let mut t = target(w, h);
    let mut c = Compositor::new();
    let bx = CoverBox::full(&t);
    c.draw_cover(&mut t, p, bx, 1.0).unwrap();
    t.data().to_vec()
}

fn transition_frame(kind: TransitionKind, a: &Photo, b: &Photo, t: f32, w: u32, h: u32) -> Vec<u8> {
    let mut tgt = target(w, h);
    let mut c = Compositor::new();
    render_transition(&mut c, &mut tgt, kind, a, b, t).unwrap();
    tgt.data().to_vec()
}

#[test]
fn parse_accepts_aliases_and_rejects_unknown() {
    assert_eq!("dissolve".parse::<TransitionKind>().unwrap(), TransitionKind::Dissolve);
    assert_eq!(" Fade ".parse::<TransitionKind>().unwrap(), TransitionKind::Dissolve);
    assert_eq!("SLIDE".parse::<TransitionKind>().unwrap(), TransitionKind::Slide);
    assert!("".parse::<TransitionKind>().is_err());
    assert!("wipe".parse::<TransitionKind>().is_err());
}

#[test]
fn serde_uses_lowercase_names() {
    let v: TransitionKind = serde_json::from_str("\"slide\"").unwrap();
    assert_eq!(v, TransitionKind::Slide);
    let v: TransitionKind = serde_json::from_str("\"crossfade\"").unwrap();
    assert_eq!(v, TransitionKind::Dissolve);
    assert_eq!(serde_json::to_string(&TransitionKind::Dissolve).unwrap(), "\"dissolve\"");
}

#[test]
fn dissolve_endpoints_match_single_image_draws() {
    let a = gradient(1, 24, 10);
    let b = gradient(2, 7, 13);
    assert_eq!(
        transition_frame(TransitionKind::Dissolve, &a, &b, 0.0, 16, 9),
        cover_only(&a, 16, 9)
    );
    assert_eq!(
        transition_frame(TransitionKind::Dissolve, &a, &b, 1.0, 16, 9),
        cover_only(&b, 16, 9)
    );
}

#[test]
fn slide_endpoints_match_single_image_draws() {
    let a = gradient(1, 24, 10);
    let b = gradient(2, 7, 13);
    assert_eq!(
        transition_frame(TransitionKind::Slide, &a, &b, 0.0, 16, 9),
        cover_only(&a, 16, 9)
    );
    assert_eq!(
        transition_frame(TransitionKind::Slide, &a, &b, 1.0, 16, 9),
        cover_only(&b, 16, 9)
    );
}

#[test]
fn slide_midpoint_splits_frame_between_a_and_b() {
    let (w, h) = (8u32, 2u32);
    let a = solid(1, RED, w, h);
    let b = solid(2, BLUE, w, h);
    let frame = transition_frame(TransitionKind::Slide, &a, &b, 0.5, w, h);
    for y in 0..h {
        for x in 0..w {
            let idx = ((y * w + x) * 4) as usize;
            let px = &frame[idx..idx + 4];
            if x < w / 2 {
                assert_eq!(px, RED, "x={x}");
            } else {
                assert_eq!(px, BLUE, "x={x}");
            }
        }
    }
}

#[test]
fn slide_midpoint_shows_right_half_of_a_and_left_half_of_b() {
    let (w, h) = (8u32, 1u32);
    let a = gradient(1, w, h);
    let b = gradient(2, w, h);
    let frame = transition_frame(TransitionKind::Slide, &a, &b, 0.5, w, h);
    let a_full = cover_only(&a, w, h);
    let half = (w / 2 * 4) as usize;
    // Frame's left half is A's right half; frame's right half is B's left half.
    assert_eq!(&frame[..half], &a_full[half..]);
    assert_eq!(&frame[half..], &a_full[..half]);
}

#[test]
fn transitions_cover_every_pixel_for_all_t() {
    let a = gradient(1, 30, 11);
    let b = solid(2, BLUE, 5, 17);
    for kind in [TransitionKind::Dissolve, TransitionKind::Slide] {
        for i in 0..=40 {
            let t = i as f32 / 40.0;
            let frame = transition_frame(kind, &a, &b, t, 16, 9);
            assert!(
                frame.chunks_exact(4).all(|px| px[3] == 255),
                "{kind} leaves a gap at t={t}"
            );
        }
    }
}

#[test]
fn dissolve_changes_gradually_with_t() {
    let a = solid(1, RED, 4, 4);
    let b = solid(2, BLUE, 4, 4);
    let mut prev = transition_frame(TransitionKind::Dissolve, &a, &b, 0.0, 4, 4);
    for i in 1..=30 {
        let t = i as f32 / 30.0;
        let cur = transition_frame(TransitionKind::Dissolve, &a, &b, t, 4, 4);
        for (p, c) in prev.iter().zip(cur.iter()) {
            assert!((i32::from(*p) - i32::from(*c)).abs() <= 10, "t={t}");
        }
        prev = cur;
    }
}

#[test]
fn slide_offset_is_monotonic_and_bounded() {
    let mut last = 0;
    for i in 0..=100 {
        let off = slide_offset_px(1920, i as f32 / 100.0);
        assert!(off >= last);
        assert!(off - last <= 20);
        last = off;
    }
    assert_eq!(slide_offset_px(1920, 0.0), 0);
    assert_eq!(slide_offset_px(1920, 1.0), 1920);
    assert_eq!(slide_offset_px(1920, 0.5), 960);
}

#[test]
fn non_finite_progress_is_treated_as_start() {
    let a = solid(1, RED, 2, 2);
    let b = solid(2, BLUE, 2, 2);
    let frame = transition_frame(TransitionKind::Dissolve, &a, &b, f32::NAN, 2, 2);
    assert_eq!(&frame[0..4], RED);
}
