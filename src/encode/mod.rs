//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order and are driven by
//! [`RenderJob`](crate::RenderJob).

/// `ffmpeg`-based sink (WebM/VP9 or MP4/H.264 via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait, sink factories and the in-memory sink.
pub mod sink;
