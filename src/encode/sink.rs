use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::target::{FrameRGBA, RenderTarget};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Target video bitrate in bits per second.
    pub bitrate_bps: u64,
}

/// A finalized encoded stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedVideo {
    /// Complete container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`, e.g. `video/webm`.
    pub mime_type: String,
}

impl EncodedVideo {
    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

/// Map a MIME type to a file extension (`bin` when unknown).
pub fn extension_for_mime(mime: &str) -> &'static str {
    let base = mime.split(';').next().unwrap_or("").trim();
    match base.to_ascii_lowercase().as_str() {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, between
/// one `begin` and one `finish`. `abort` may be called instead of `finish` and must discard any
/// partial output.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()>;
    /// Capture the current contents of `target` as frame `idx`.
    fn push_frame(&mut self, idx: FrameIndex, target: &RenderTarget) -> SlidecastResult<()>;
    /// Flush and return the complete encoded stream.
    fn finish(&mut self) -> SlidecastResult<EncodedVideo>;
    /// Drop any partial output. Called on failure paths.
    fn abort(&mut self) {}
}

/// Capability that creates a fresh sink for each render.
pub trait SinkFactory: Send + Sync {
    /// Create a sink for `cfg`. Failures are reported as [`SlidecastError::SinkSetup`].
    fn create_sink(&self, cfg: &SinkConfig) -> SlidecastResult<Box<dyn FrameSink>>;
}

impl<F> SinkFactory for F
where
    F: Fn(&SinkConfig) -> SlidecastResult<Box<dyn FrameSink>> + Send + Sync,
{
    fn create_sink(&self, cfg: &SinkConfig) -> SlidecastResult<Box<dyn FrameSink>> {
        self(cfg)
    }
}

/// MIME type produced by [`InMemorySink`].
pub const RAW_RGBA_MIME: &str = "video/x-raw-rgba";

/// In-memory sink for tests and debugging.
///
/// Keeps every frame; `finish` concatenates them as raw premultiplied RGBA8.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    pushed: Option<Arc<AtomicUsize>>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also count pushed frames into `counter`, observable after the sink is moved away.
    pub fn with_counter(counter: Arc<AtomicUsize>) -> Self {
        Self {
            pushed: Some(counter),
            ..Self::default()
        }
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SlidecastError::sink_setup(
                "sink width/height must be non-zero",
            ));
        }
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, target: &RenderTarget) -> SlidecastResult<()> {
        if self.cfg.is_none() {
            return Err(SlidecastError::encode("in-memory sink not started"));
        }
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(SlidecastError::encode(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.frames.push((idx, target.snapshot()));
        if let Some(counter) = &self.pushed {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn finish(&mut self) -> SlidecastResult<EncodedVideo> {
        if self.cfg.is_none() {
            return Err(SlidecastError::encode("in-memory sink not started"));
        }
        let bytes = self
            .frames
            .iter()
            .flat_map(|(_, f)| f.data.iter().copied())
            .collect();
        Ok(EncodedVideo {
            bytes,
            mime_type: RAW_RGBA_MIME.to_string(),
        })
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.cfg = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
