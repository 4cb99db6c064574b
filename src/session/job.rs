//! Frame-driven encoder loop.
//!
//! A [`RenderJob`] walks `Idle -> Rendering -> Finalizing -> Done`, with `Failed` reachable from
//! setup or from any frame. Each call to [`RenderJob::step`] does one unit of work (setup plus the
//! first frame, one more frame, or finalization) and reports what happened as a [`RenderEvent`].
//! Callers that want a blocking render use [`RenderJob::run`] with a [`FrameClock`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::assets::photo::{ImageDecoder, Photo, decode_all};
use crate::effects::cover::Compositor;
use crate::encode::sink::{EncodedVideo, FrameSink, SinkFactory};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::frame::render_instruction;
use crate::render::target::{FrameRGBA, RenderTarget};
use crate::session::request::RenderRequest;
use crate::timeline::segment::Timeline;

/// Lifecycle of a [`RenderJob`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Created; nothing decoded or opened yet.
    Idle,
    /// Frames are being rendered and pushed to the sink.
    Rendering,
    /// All frames pushed; the sink still has to be finalized.
    Finalizing,
    /// The encoded stream is available.
    Done,
    /// The render was aborted; no output is exposed.
    Failed,
}

impl JobState {
    /// `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Result of one [`RenderJob::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderEvent {
    /// A frame was emitted; integer percent complete.
    Progress(u8),
    /// The render finished.
    Done(RenderedVideo),
    /// The render failed with a human-readable reason.
    Failed(String),
}

/// A finished render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedVideo {
    /// Encoded stream and its MIME type.
    pub video: EncodedVideo,
    /// Frames rendered into the stream.
    pub frames: u64,
    /// Input generation the render was started from.
    pub generation: u64,
    /// Completion time, in milliseconds since the Unix epoch.
    pub finished_at_ms: u64,
}

impl RenderedVideo {
    /// Download name, `photo-sequence-<millis>.<ext>`.
    pub fn suggested_filename(&self) -> String {
        format!(
            "photo-sequence-{}.{}",
            self.finished_at_ms,
            self.video.extension()
        )
    }
}

/// Pacing primitive called between frames.
pub trait FrameClock {
    /// Called after `frame` has been emitted, before the next one is rendered.
    fn tick(&mut self, frame: FrameIndex, fps: Fps);
}

/// Clock that never waits. Renders as fast as possible.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateClock;

impl FrameClock for ImmediateClock {
    fn tick(&mut self, _frame: FrameIndex, _fps: Fps) {}
}

/// Clock that paces frames at the output frame rate, measured from the first tick.
#[derive(Clone, Debug, Default)]
pub struct RealtimeClock {
    origin: Option<(Instant, u64)>,
}

impl RealtimeClock {
    /// Create a clock; it starts on the first tick.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for RealtimeClock {
    fn tick(&mut self, frame: FrameIndex, fps: Fps) {
        let (start, first) = *self.origin.get_or_insert_with(|| (Instant::now(), frame.0));
        let due = start
            + Duration::from_secs_f64(fps.frames_to_secs((frame.0 + 1).saturating_sub(first)));
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

/// Holds the single-flight flag for as long as it lives.
#[derive(Debug)]
pub(crate) struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    pub(crate) fn try_acquire(flag: &Arc<AtomicBool>) -> SlidecastResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SlidecastError::busy("a render is already in flight"))?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One render of a frozen [`RenderRequest`].
pub struct RenderJob {
    request: RenderRequest,
    decoder: Arc<dyn ImageDecoder>,
    sinks: Arc<dyn SinkFactory>,
    generation: u64,
    guard: Option<FlightGuard>,

    state: JobState,
    timeline: Option<Timeline>,
    photos: Vec<Photo>,
    compositor: Compositor,
    target: Option<RenderTarget>,
    sink: Option<Box<dyn FrameSink>>,
    next_frame: u64,
    progress: u8,
    error: Option<SlidecastError>,
}

impl std::fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJob")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("next_frame", &self.next_frame)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl RenderJob {
    /// Create an idle job. Nothing is decoded until the first [`step`](Self::step).
    ///
    /// Jobs built here hold no flight guard; callers get guarded jobs from `Studio::start`.
    pub(crate) fn new(
        request: RenderRequest,
        decoder: Arc<dyn ImageDecoder>,
        sinks: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            request,
            decoder,
            sinks,
            generation: 0,
            guard: None,
            state: JobState::Idle,
            timeline: None,
            photos: Vec::new(),
            compositor: Compositor::new(),
            target: None,
            sink: None,
            next_frame: 0,
            progress: 0,
            error: None,
        }
    }

    pub(crate) fn with_flight(mut self, guard: FlightGuard, generation: u64) -> Self {
        self.guard = Some(guard);
        self.generation = generation;
        self
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Percent complete, 0-100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next_frame
    }

    /// Input generation this job renders.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The snapshot being rendered.
    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// Error that moved the job to `Failed`, if any.
    pub fn error(&self) -> Option<&SlidecastError> {
        self.error.as_ref()
    }

    /// Advance by one unit of work. Returns `None` once the job is terminal.
    pub fn step(&mut self) -> Option<RenderEvent> {
        if self.state == JobState::Idle {
            if let Err(e) = self.setup() {
                return Some(self.fail(e));
            }
            self.state = JobState::Rendering;
            tracing::debug!(state = ?self.state, "job state");
        }

        match self.state {
            JobState::Idle | JobState::Done | JobState::Failed => None,
            JobState::Rendering => match self.render_next() {
                Ok(pct) => Some(RenderEvent::Progress(pct)),
                Err(e) => Some(self.fail(e)),
            },
            JobState::Finalizing => match self.finalize() {
                Ok(video) => Some(RenderEvent::Done(video)),
                Err(e) => Some(self.fail(e)),
            },
        }
    }

    /// Drive the job to completion, pacing frames with `clock`.
    ///
    /// `on_progress` sees every progress report, ending with 100 on success.
    pub fn run(
        &mut self,
        clock: &mut dyn FrameClock,
        mut on_progress: impl FnMut(u8),
    ) -> SlidecastResult<RenderedVideo> {
        let fps = self.request.settings().fps;
        loop {
            match self.step() {
                Some(RenderEvent::Progress(pct)) => {
                    on_progress(pct);
                    if self.state == JobState::Rendering {
                        clock.tick(FrameIndex(self.next_frame - 1), fps);
                    }
                }
                Some(RenderEvent::Done(video)) => {
                    on_progress(100);
                    return Ok(video);
                }
                Some(RenderEvent::Failed(reason)) => {
                    return Err(self
                        .error
                        .take()
                        .unwrap_or_else(|| SlidecastError::render(reason)));
                }
                None => {
                    return Err(SlidecastError::render(format!(
                        "render job already finished ({:?})",
                        self.state
                    )));
                }
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(photos = self.request.photos().len()))]
    fn setup(&mut self) -> SlidecastResult<()> {
        let settings = self.request.settings();
        let timeline = Timeline::from_timing(self.request.photos().len(), &settings.to_timing())?;

        self.photos = decode_all(self.decoder.as_ref(), self.request.photos())?;

        let cfg = settings.sink_config();
        let mut sink = self.sinks.create_sink(&cfg).map_err(as_sink_setup)?;
        sink.begin(cfg).map_err(as_sink_setup)?;

        self.target = Some(RenderTarget::new(settings.canvas)?);
        self.sink = Some(sink);
        self.timeline = Some(timeline);
        tracing::info!(
            total_frames = timeline.total_frames(),
            photo_frames = timeline.photo_frames(),
            transition_frames = timeline.transition_frames(),
            transition = %settings.transition,
            "render started"
        );
        Ok(())
    }

    fn render_next(&mut self) -> SlidecastResult<u8> {
        let (Some(timeline), Some(target), Some(sink)) =
            (self.timeline, self.target.as_mut(), self.sink.as_mut())
        else {
            return Err(SlidecastError::render("render job is not set up"));
        };

        let idx = FrameIndex(self.next_frame);
        let drawn = render_instruction(
            &mut self.compositor,
            target,
            &self.photos,
            self.request.settings().transition,
            timeline.resolve(idx),
        )?;
        if !drawn {
            return Err(SlidecastError::render(format!(
                "frame {} is past the end of the timeline",
                idx.0
            )));
        }
        sink.push_frame(idx, target).map_err(as_encode)?;

        self.next_frame += 1;
        self.progress = timeline.progress_percent(self.next_frame);
        if self.next_frame >= timeline.total_frames() {
            self.state = JobState::Finalizing;
            tracing::debug!(state = ?self.state, "job state");
        }
        Ok(self.progress)
    }

    fn finalize(&mut self) -> SlidecastResult<RenderedVideo> {
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| SlidecastError::encode("sink already finalized"))?;
        let video = match sink.finish() {
            Ok(video) => video,
            Err(e) => {
                sink.abort();
                return Err(as_encode(e));
            }
        };

        let rendered = RenderedVideo {
            video,
            frames: self.next_frame,
            generation: self.generation,
            finished_at_ms: unix_millis(),
        };
        self.state = JobState::Done;
        self.progress = 100;
        self.release();
        tracing::info!(
            frames = rendered.frames,
            bytes = rendered.video.bytes.len(),
            mime = %rendered.video.mime_type,
            "render finished"
        );
        Ok(rendered)
    }

    fn fail(&mut self, err: SlidecastError) -> RenderEvent {
        if let Some(mut sink) = self.sink.take() {
            sink.abort();
        }
        tracing::warn!(frame = self.next_frame, error = %err, "render failed");
        let reason = err.to_string();
        self.error = Some(err);
        self.state = JobState::Failed;
        self.release();
        RenderEvent::Failed(reason)
    }

    fn release(&mut self) {
        self.target = None;
        self.photos.clear();
        self.compositor = Compositor::new();
        self.guard = None;
    }
}

impl Drop for RenderJob {
    fn drop(&mut self) {
        // A job dropped mid-render must not leave a half-written stream behind.
        if let Some(mut sink) = self.sink.take() {
            sink.abort();
        }
    }
}

fn as_sink_setup(e: SlidecastError) -> SlidecastError {
    match e {
        SlidecastError::SinkSetup(_) => e,
        other => SlidecastError::sink_setup(other.to_string()),
    }
}

fn as_encode(e: SlidecastError) -> SlidecastError {
    match e {
        SlidecastError::Encode(_) => e,
        other => SlidecastError::encode(other.to_string()),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Render a single timeline frame of `request` without opening a sink.
#[tracing::instrument(level = "debug", skip(request, decoder))]
pub fn render_frame_at(
    request: &RenderRequest,
    decoder: &dyn ImageDecoder,
    frame: FrameIndex,
) -> SlidecastResult<FrameRGBA> {
    let settings = request.settings();
    let timeline = Timeline::from_timing(request.photos().len(), &settings.to_timing())?;
    if frame.0 >= timeline.total_frames() {
        return Err(SlidecastError::input(format!(
            "frame {} is outside the timeline (0..{})",
            frame.0,
            timeline.total_frames()
        )));
    }
    let photos = decode_all(decoder, request.photos())?;
    let mut target = RenderTarget::new(settings.canvas)?;
    let mut compositor = Compositor::new();
    render_instruction(
        &mut compositor,
        &mut target,
        &photos,
        settings.transition,
        timeline.resolve(frame),
    )?;
    Ok(target.snapshot())
}

#[cfg(test)]
#[path = "../../tests/unit/session/job.rs"]
mod tests;
