use std::sync::atomic::AtomicUsize;

use super::*;
use crate::assets::decode::Raster;
use crate::assets::photo::{PhotoId, PhotoSource};
use crate::encode::sink::{InMemorySink, RAW_RGBA_MIME, SinkConfig};
use crate::foundation::core::Canvas;
use crate::session::request::SlideshowSettings;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, source: &PhotoSource) -> SlidecastResult<crate::assets::decode::Raster> {
        match &source.data {
            crate::assets::photo::PhotoData::Raster(r) => Ok(r.clone()),
            _ => Err(SlidecastError::decode("only rasters are supported")),
        }
    }
}

struct FailOn(PhotoId);

impl ImageDecoder for FailOn {
    fn decode(&self, source: &PhotoSource) -> SlidecastResult<crate::assets::decode::Raster> {
        if source.id == self.0 {
            return Err(SlidecastError::decode("corrupt"));
        }
        RasterDecoder.decode(source)
    }
}

struct FinishFails;

impl FrameSink for FinishFails {
    fn begin(&mut self, _cfg: SinkConfig) -> SlidecastResult<()> {
        Ok(())
    }
    fn push_frame(&mut self, _idx: FrameIndex, _target: &RenderTarget) -> SlidecastResult<()> {
        Ok(())
    }
    fn finish(&mut self) -> SlidecastResult<EncodedVideo> {
        Err(SlidecastError::encode("muxer exploded"))
    }
}

fn settings(photo: f64, transition: f64, fps: u32) -> SlideshowSettings {
    SlideshowSettings {
        photo_duration_secs: photo,
        transition_duration_secs: transition,
        fps: Fps::integer(fps).unwrap(),
        canvas: Canvas {
            width: 16,
            height: 9,
        },
        ..SlideshowSettings::default()
    }
}

fn request(colors: &[[u8; 4]], s: SlideshowSettings) -> RenderRequest {
    let photos = colors
        .iter()
        .zip(1u64..)
        .map(|(px, id)| {
            PhotoSource::from_raster(
                PhotoId(id),
                format!("p{id}"),
                Raster::filled(4, 3, *px).unwrap(),
            )
        })
        .collect();
    RenderRequest::new(photos, s).unwrap()
}

fn counting_factory(counter: Arc<AtomicUsize>) -> Arc<dyn SinkFactory> {
    Arc::new(move |_cfg: &SinkConfig| -> SlidecastResult<Box<dyn FrameSink>> {
        Ok(Box::new(InMemorySink::with_counter(counter.clone())))
    })
}

#[test]
fn reference_scenario_emits_330_frames_and_reports_half_at_165() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(3.0, 1.0, 30)),
        Arc::new(RasterDecoder),
        counting_factory(counter.clone()),
    );
    assert_eq!(job.state(), JobState::Idle);

    let mut reports = Vec::new();
    let video = job.run(&mut ImmediateClock, |p| reports.push(p)).unwrap();

    assert_eq!(video.frames, 330);
    assert_eq!(counter.load(Ordering::SeqCst), 330);
    assert_eq!(video.video.mime_type, RAW_RGBA_MIME);
    assert_eq!(video.video.bytes.len(), 330 * 16 * 9 * 4);
    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.progress(), 100);

    // reports[i] is the progress after frame i.
    assert_eq!(reports[165], 50);
    assert_eq!(reports[0], 0);
    assert_eq!(reports[329], 100);
    assert_eq!(*reports.last().unwrap(), 100);
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn step_walks_the_state_machine() {
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(RasterDecoder),
        counting_factory(Arc::new(AtomicUsize::new(0))),
    );
    // 3 * 8 + 2 * 2 frames.
    let mut frames = 0;
    loop {
        match job.step() {
            Some(RenderEvent::Progress(_)) => {
                frames += 1;
                if frames < 28 {
                    assert_eq!(job.state(), JobState::Rendering);
                } else {
                    assert_eq!(job.state(), JobState::Finalizing);
                }
            }
            Some(RenderEvent::Done(v)) => {
                assert_eq!(v.frames, 28);
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(frames, 28);
    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.step(), None);
}

#[test]
fn frames_show_holds_and_transitions() {
    let captured = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_frames = captured.clone();
    let factory: Arc<dyn SinkFactory> = Arc::new(
        move |_cfg: &SinkConfig| -> SlidecastResult<Box<dyn FrameSink>> {
            Ok(Box::new(Recording {
                inner: InMemorySink::new(),
                out: sink_frames.clone(),
            }))
        },
    );
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(RasterDecoder),
        factory,
    );
    job.run(&mut ImmediateClock, |_| {}).unwrap();

    let frames = captured.lock().unwrap();
    assert_eq!(frames.len(), 28);
    assert_eq!(frames[0], RED);
    assert_eq!(frames[7], RED);
    // Frame 8 opens the red->green dissolve; frame 9 is its midpoint.
    assert_eq!(frames[8], RED);
    assert_ne!(frames[9], RED);
    assert_ne!(frames[9], GREEN);
    assert_eq!(frames[10], GREEN);
    assert_eq!(frames[27], BLUE);
}

struct Recording {
    inner: InMemorySink,
    out: Arc<std::sync::Mutex<Vec<[u8; 4]>>>,
}

impl FrameSink for Recording {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        self.inner.begin(cfg)
    }
    fn push_frame(&mut self, idx: FrameIndex, target: &RenderTarget) -> SlidecastResult<()> {
        if let Ok(mut out) = self.out.lock() {
            out.push(target.pixel(0, 0));
        }
        self.inner.push_frame(idx, target)
    }
    fn finish(&mut self) -> SlidecastResult<EncodedVideo> {
        self.inner.finish()
    }
}

#[test]
fn decode_failure_fails_before_any_frame() {
    let counter = Arc::new(AtomicUsize::new(0));
    let created = Arc::new(AtomicUsize::new(0));
    let created_in = created.clone();
    let counter_in = counter.clone();
    let factory: Arc<dyn SinkFactory> = Arc::new(
        move |_cfg: &SinkConfig| -> SlidecastResult<Box<dyn FrameSink>> {
            created_in.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(InMemorySink::with_counter(counter_in.clone())))
        },
    );
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(FailOn(PhotoId(2))),
        factory,
    );

    match job.step() {
        Some(RenderEvent::Failed(reason)) => assert!(reason.contains("p2"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(job.state(), JobState::Failed);
    assert!(matches!(job.error(), Some(SlidecastError::Decode(_))));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(created.load(Ordering::SeqCst), 0);
    assert_eq!(job.step(), None);
}

#[test]
fn sink_setup_failure_is_reported_as_sink_setup() {
    let factory: Arc<dyn SinkFactory> =
        Arc::new(|_cfg: &SinkConfig| -> SlidecastResult<Box<dyn FrameSink>> {
            Err(SlidecastError::sink_setup("no encoder"))
        });
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(RasterDecoder),
        factory,
    );
    let err = job.run(&mut ImmediateClock, |_| {}).unwrap_err();
    assert!(matches!(err, SlidecastError::SinkSetup(_)));
    assert_eq!(job.state(), JobState::Failed);
}

struct BeginFails;

impl FrameSink for BeginFails {
    fn begin(&mut self, _cfg: SinkConfig) -> SlidecastResult<()> {
        Err(SlidecastError::render("unsupported pixel format"))
    }
    fn push_frame(&mut self, _idx: FrameIndex, _target: &RenderTarget) -> SlidecastResult<()> {
        Ok(())
    }
    fn finish(&mut self) -> SlidecastResult<EncodedVideo> {
        Ok(EncodedVideo {
            bytes: Vec::new(),
            mime_type: RAW_RGBA_MIME.to_string(),
        })
    }
}

#[test]
fn begin_errors_are_normalized_to_sink_setup() {
    let factory: Arc<dyn SinkFactory> =
        Arc::new(|_cfg: &SinkConfig| -> SlidecastResult<Box<dyn FrameSink>> {
            Ok(Box::new(BeginFails))
        });
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(RasterDecoder),
        factory,
    );
    let err = job.run(&mut ImmediateClock, |_| {}).unwrap_err();
    assert!(matches!(err, SlidecastError::SinkSetup(_)), "{err}");
    assert!(err.to_string().contains("unsupported pixel format"));
}

#[test]
fn finish_failure_exposes_no_output() {
    let factory: Arc<dyn SinkFactory> =
        Arc::new(|_cfg: &SinkConfig| -> SlidecastResult<Box<dyn FrameSink>> {
            Ok(Box::new(FinishFails))
        });
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(RasterDecoder),
        factory,
    );
    let mut last = None;
    while let Some(ev) = job.step() {
        last = Some(ev);
    }
    match last {
        Some(RenderEvent::Failed(reason)) => assert!(reason.contains("muxer exploded")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(job.error(), Some(SlidecastError::Encode(_))));
    assert_eq!(job.state(), JobState::Failed);
}

#[test]
fn flight_guard_is_exclusive_and_released_on_drop() {
    let flag = Arc::new(AtomicBool::new(false));
    let guard = FlightGuard::try_acquire(&flag).unwrap();
    assert!(matches!(
        FlightGuard::try_acquire(&flag),
        Err(SlidecastError::Busy(_))
    ));
    drop(guard);
    assert!(FlightGuard::try_acquire(&flag).is_ok());
}

#[test]
fn terminal_job_releases_flight() {
    let flag = Arc::new(AtomicBool::new(false));
    let guard = FlightGuard::try_acquire(&flag).unwrap();
    let mut job = RenderJob::new(
        request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4)),
        Arc::new(RasterDecoder),
        counting_factory(Arc::new(AtomicUsize::new(0))),
    )
    .with_flight(guard, 7);

    assert!(flag.load(Ordering::SeqCst));
    let video = job.run(&mut ImmediateClock, |_| {}).unwrap();
    assert_eq!(video.generation, 7);
    assert!(!flag.load(Ordering::SeqCst));
}

#[test]
fn suggested_filename_uses_timestamp_and_extension() {
    let v = RenderedVideo {
        video: EncodedVideo {
            bytes: vec![1, 2, 3],
            mime_type: "video/webm".to_string(),
        },
        frames: 1,
        generation: 0,
        finished_at_ms: 1_700_000_000_123,
    };
    assert_eq!(v.suggested_filename(), "photo-sequence-1700000000123.webm");
}

#[test]
fn realtime_clock_paces_frames() {
    let fps = Fps::integer(100).unwrap();
    let mut clock = RealtimeClock::new();
    let start = Instant::now();
    for i in 0..5 {
        clock.tick(FrameIndex(i), fps);
    }
    assert!(start.elapsed() >= Duration::from_millis(45));
}

#[test]
fn render_frame_at_matches_timeline() {
    let req = request(&[RED, GREEN, BLUE], settings(2.0, 0.5, 4));
    let first = render_frame_at(&req, &RasterDecoder, FrameIndex(0)).unwrap();
    assert_eq!(&first.data[..4], &RED);
    let last = render_frame_at(&req, &RasterDecoder, FrameIndex(27)).unwrap();
    assert_eq!(&last.data[..4], &BLUE);
    assert!(matches!(
        render_frame_at(&req, &RasterDecoder, FrameIndex(28)),
        Err(SlidecastError::Input(_))
    ));
}
