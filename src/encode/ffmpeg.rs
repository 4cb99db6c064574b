use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::sink::{EncodedVideo, FrameSink, SinkConfig, SinkFactory};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::target::RenderTarget;

const STDOUT_CHUNK_BYTES: usize = 64 * 1024;

/// Container/codec pair produced by [`FfmpegSink`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// VP9 in WebM (`video/webm`).
    #[default]
    WebmVp9,
    /// H.264 in fragmented MP4 (`video/mp4`).
    Mp4H264,
}

impl OutputFormat {
    /// MIME type of the produced stream.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebmVp9 => "video/webm",
            Self::Mp4H264 => "video/mp4",
        }
    }

    fn output_args(self, bitrate_bps: u64) -> Vec<String> {
        let bitrate = bitrate_bps.to_string();
        let mut args: Vec<String> = match self {
            Self::WebmVp9 => [
                "-c:v",
                "libvpx-vp9",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-b:v",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            Self::Mp4H264 => ["-c:v", "libx264", "-preset", "veryfast", "-b:v"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        };
        args.push(bitrate);
        args.extend(["-pix_fmt", "yuv420p", "-an"].iter().map(|s| (*s).to_string()));
        match self {
            Self::WebmVp9 => args.extend(["-f", "webm"].iter().map(|s| (*s).to_string())),
            // Plain MP4 needs a seekable output; fragment it so it can stream to a pipe.
            Self::Mp4H264 => args.extend(
                ["-movflags", "frag_keyframe+empty_moov", "-f", "mp4"]
                    .iter()
                    .map(|s| (*s).to_string()),
            ),
        }
        args.push("pipe:1".to_string());
        args
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// `ffmpeg` executable; resolved through `PATH` when relative.
    pub ffmpeg: PathBuf,
    /// Output container/codec.
    pub format: OutputFormat,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            format: OutputFormat::default(),
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns `ffmpeg`, streams raw frames to its stdin, and collects the encoded
/// container from its stdout in chunks.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink; nothing is spawned until [`FrameSink::begin`].
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn kill_child(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        // Drains end once the pipes close; their output is discarded.
        if let Some(h) = self.stdout_drain.take() {
            let _ = h.join();
        }
        if let Some(h) = self.stderr_drain.take() {
            let _ = h.join();
        }
        self.cfg = None;
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(SlidecastError::sink_setup("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SlidecastError::sink_setup(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(SlidecastError::sink_setup(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if cfg.bitrate_bps == 0 {
            return Err(SlidecastError::sink_setup("bitrate must be non-zero"));
        }
        if self.child.is_some() {
            return Err(SlidecastError::sink_setup("ffmpeg sink already started"));
        }

        let mut cmd = Command::new(&self.opts.ffmpeg);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Input: raw RGBA8 frames, already flattened to opaque in push_frame.
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);
        cmd.args(self.opts.format.output_args(cfg.bitrate_bps));

        tracing::debug!(?cmd, "spawning ffmpeg");
        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::sink_setup(format!(
                "failed to spawn '{}' (is it installed and on PATH?): {e}",
                self.opts.ffmpeg.display()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecastError::sink_setup("failed to open ffmpeg stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| SlidecastError::sink_setup("failed to open ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlidecastError::sink_setup("failed to open ffmpeg stderr"))?;

        let stdout_drain = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; STDOUT_CHUNK_BYTES];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                chunks.push(buf[..n].to_vec());
            }
            Ok(chunks)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, target: &RenderTarget) -> SlidecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SlidecastError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(SlidecastError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if target.width() != cfg.width || target.height() != cfg.height {
            return Err(SlidecastError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                target.width(),
                target.height(),
                cfg.width,
                cfg.height
            )));
        }

        flatten_premul_over_bg_to_opaque_rgba8(
            &mut self.scratch,
            target.data(),
            self.opts.bg_rgba,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SlidecastError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            SlidecastError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn finish(&mut self) -> SlidecastResult<EncodedVideo> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| SlidecastError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            SlidecastError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let chunks = match self.stdout_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SlidecastError::encode("ffmpeg stdout drain thread panicked"))?
                .map_err(|e| SlidecastError::encode(format!("ffmpeg stdout read failed: {e}")))?,
            None => Vec::new(),
        };
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SlidecastError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| SlidecastError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        self.cfg = None;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(SlidecastError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let bytes = chunks.concat();
        if bytes.is_empty() {
            return Err(SlidecastError::encode("ffmpeg produced an empty stream"));
        }
        tracing::debug!(bytes = bytes.len(), chunks = chunks.len(), "ffmpeg finished");
        Ok(EncodedVideo {
            bytes,
            mime_type: self.opts.format.mime_type().to_string(),
        })
    }

    fn abort(&mut self) {
        self.kill_child();
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.kill_child();
        }
    }
}

/// [`SinkFactory`] producing [`FfmpegSink`]s; fails setup early when `ffmpeg` is missing.
#[derive(Clone, Debug, Default)]
pub struct FfmpegSinkFactory {
    /// Options cloned into every sink.
    pub opts: FfmpegSinkOpts,
}

impl SinkFactory for FfmpegSinkFactory {
    fn create_sink(&self, _cfg: &SinkConfig) -> SlidecastResult<Box<dyn FrameSink>> {
        if !is_ffmpeg_available(&self.opts.ffmpeg) {
            return Err(SlidecastError::sink_setup(format!(
                "'{}' is required for encoding, but could not be run",
                self.opts.ffmpeg.display()
            )));
        }
        Ok(Box::new(FfmpegSink::new(self.opts.clone())))
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> SlidecastResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::encode(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        let r = s[0] as u16 + mul_div255_u16(bg_r, inv);
        let g = s[1] as u16 + mul_div255_u16(bg_g, inv);
        let b = s[2] as u16 + mul_div255_u16(bg_b, inv);

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_ffmpeg_available(std::path::Path::new("ffmpeg"))
}

fn is_ffmpeg_available(exe: &std::path::Path) -> bool {
    Command::new(exe)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
