//! Slidecast renders a short video from a handful of photos.
//!
//! Photos are cover-fitted to the output canvas, held for a fixed duration and joined by
//! dissolve or slide transitions. The public API is studio-oriented:
//!
//! - Fill a [`Studio`] with 3 to 5 photos and [`SlideshowSettings`]
//! - [`Studio::start`] a [`RenderJob`] and drive it with [`RenderJob::step`] or [`RenderJob::run`]
//! - Hand the finished [`RenderedVideo`] back with [`Studio::accept_output`]
//!
//! Frames go to a [`FrameSink`]; [`FfmpegSink`] encodes WebM/VP9 through the system `ffmpeg`,
//! [`InMemorySink`] keeps raw frames for tests.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Photo sources and decoding.
pub mod assets;
/// Cover fitting, pixel compositing and transitions.
pub mod effects;
/// Encoding sinks.
pub mod encode;
/// Shared primitives and the error type.
pub mod foundation;
/// Render target and per-frame drawing.
pub mod render;
/// Caller-facing session API.
pub mod session;
/// Segment timeline.
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
pub use crate::foundation::error::{SlidecastError, SlidecastResult};

pub use crate::assets::decode::Raster;
pub use crate::assets::photo::{
    FsImageDecoder, ImageDecoder, Photo, PhotoData, PhotoId, PhotoSource, decode_all,
};
pub use crate::effects::transitions::TransitionKind;
pub use crate::encode::ffmpeg::{
    FfmpegSink, FfmpegSinkFactory, FfmpegSinkOpts, OutputFormat, is_ffmpeg_on_path,
};
pub use crate::encode::sink::{EncodedVideo, FrameSink, InMemorySink, SinkConfig, SinkFactory};
pub use crate::render::target::{FrameRGBA, RenderTarget};
pub use crate::session::job::{
    FrameClock, ImmediateClock, JobState, RealtimeClock, RenderEvent, RenderJob, RenderedVideo,
    render_frame_at,
};
pub use crate::session::request::{Manifest, RenderRequest, SlideshowSettings};
pub use crate::session::studio::{MoveDirection, Studio};
pub use crate::timeline::segment::{FrameInstruction, Segment, SegmentKind, Timeline};
pub use crate::timeline::timing::TimingConfig;
