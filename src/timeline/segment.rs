//! Segment timeline.
//!
//! A slideshow of `n` photos is the concatenation
//! `Hold(0), Transition(0,1), Hold(1), ..., Transition(n-2,n-1), Hold(n-1)`.
//! Every frame index in `[0, total_frames)` maps to exactly one segment; `total_frames` itself is
//! the end of the stream.

use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::timeline::timing::TimingConfig;

/// What to draw for one frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameInstruction {
    /// Draw a single photo.
    Hold {
        /// Index into the ordered photo list.
        photo: usize,
    },
    /// Draw the transition from `from` to `to`.
    Transition {
        /// Outgoing photo index.
        from: usize,
        /// Incoming photo index (`from + 1`).
        to: usize,
        /// Local progress in `[0, 1)`.
        progress: f64,
    },
    /// Past the last frame; nothing is rendered.
    EndOfStream,
}

/// Segment kind without timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentKind {
    /// A single photo on screen.
    Hold {
        /// Index into the ordered photo list.
        photo: usize,
    },
    /// Transition between two adjacent photos.
    Transition {
        /// Outgoing photo index.
        from: usize,
        /// Incoming photo index.
        to: usize,
    },
}

/// One contiguous span of the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Segment {
    /// What the span shows.
    #[serde(flatten)]
    pub kind: SegmentKind,
    /// Frames covered by the span.
    pub range: FrameRange,
}

/// Map a frame index to a render instruction.
///
/// `segment length = photo_frames + transition_frames`; the ordinal of the segment is clamped to
/// the last photo. Transitions with zero frames never occur, and a zero-length timeline (no
/// photos or no hold frames) is all end-of-stream.
pub fn resolve(
    frame: FrameIndex,
    photo_count: usize,
    photo_frames: u64,
    transition_frames: u64,
) -> FrameInstruction {
    let seg_len = photo_frames + transition_frames;
    if photo_count == 0 || photo_frames == 0 {
        return FrameInstruction::EndOfStream;
    }
    if frame.0 >= total_frames(photo_count, photo_frames, transition_frames) {
        return FrameInstruction::EndOfStream;
    }

    let last = photo_count - 1;
    let ordinal = usize::try_from(frame.0 / seg_len).map_or(last, |o| o.min(last));
    let local = frame.0 % seg_len;

    if local < photo_frames || ordinal >= last {
        return FrameInstruction::Hold { photo: ordinal };
    }
    if transition_frames == 0 {
        return FrameInstruction::Hold { photo: ordinal + 1 };
    }
    FrameInstruction::Transition {
        from: ordinal,
        to: ordinal + 1,
        progress: (local - photo_frames) as f64 / transition_frames as f64,
    }
}

/// `n * photo_frames + (n - 1) * transition_frames`, or 0 for an empty list.
pub fn total_frames(photo_count: usize, photo_frames: u64, transition_frames: u64) -> u64 {
    if photo_count == 0 {
        return 0;
    }
    let n = photo_count as u64;
    n.saturating_mul(photo_frames)
        .saturating_add((n - 1).saturating_mul(transition_frames))
}

/// Integer percent of `frames_done` out of `total`, floored and capped at 100.
pub fn progress_percent(frames_done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = u128::from(frames_done.min(total)) * 100 / u128::from(total);
    pct as u8
}

/// Frame-count view of a slideshow, computed once per render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Timeline {
    photo_count: usize,
    photo_frames: u64,
    transition_frames: u64,
}

impl Timeline {
    /// Build a timeline; requires at least one photo and at least one frame per hold.
    pub fn new(
        photo_count: usize,
        photo_frames: u64,
        transition_frames: u64,
    ) -> SlidecastResult<Self> {
        if photo_count == 0 {
            return Err(SlidecastError::input("timeline needs at least one photo"));
        }
        if photo_frames == 0 {
            return Err(SlidecastError::input(
                "photo hold must last at least one frame",
            ));
        }
        Ok(Self {
            photo_count,
            photo_frames,
            transition_frames,
        })
    }

    /// Build a timeline from durations.
    #[tracing::instrument(level = "debug", skip(timing))]
    pub fn from_timing(photo_count: usize, timing: &TimingConfig) -> SlidecastResult<Self> {
        timing.validate()?;
        Self::new(photo_count, timing.photo_frames(), timing.transition_frames())
    }

    /// Number of photos.
    pub fn photo_count(&self) -> usize {
        self.photo_count
    }

    /// Frames per photo hold.
    pub fn photo_frames(&self) -> u64 {
        self.photo_frames
    }

    /// Frames per transition.
    pub fn transition_frames(&self) -> u64 {
        self.transition_frames
    }

    /// Total renderable frames.
    pub fn total_frames(&self) -> u64 {
        total_frames(self.photo_count, self.photo_frames, self.transition_frames)
    }

    /// Whole timeline as a frame range.
    pub fn range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames()),
        }
    }

    /// Instruction for `frame`.
    pub fn resolve(&self, frame: FrameIndex) -> FrameInstruction {
        resolve(
            frame,
            self.photo_count,
            self.photo_frames,
            self.transition_frames,
        )
    }

    /// Percent complete after `frames_done` frames have been emitted.
    pub fn progress_percent(&self, frames_done: u64) -> u8 {
        progress_percent(frames_done, self.total_frames())
    }

    /// All non-empty segments in order.
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::with_capacity(self.photo_count * 2);
        let mut start = 0u64;
        for photo in 0..self.photo_count {
            let end = start + self.photo_frames;
            out.push(Segment {
                kind: SegmentKind::Hold { photo },
                range: FrameRange {
                    start: FrameIndex(start),
                    end: FrameIndex(end),
                },
            });
            start = end;
            if photo + 1 < self.photo_count && self.transition_frames > 0 {
                let end = start + self.transition_frames;
                out.push(Segment {
                    kind: SegmentKind::Transition {
                        from: photo,
                        to: photo + 1,
                    },
                    range: FrameRange {
                        start: FrameIndex(start),
                        end: FrameIndex(end),
                    },
                });
                start = end;
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/segment.rs"]
mod tests;
