use crate::effects::transitions::TransitionKind;
use crate::foundation::core::Fps;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Engine-level timing. Product limits (e.g. 2-6 s holds) are enforced by
/// [`SlideshowSettings`](crate::SlideshowSettings), not here.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimingConfig {
    /// Seconds each photo is held, > 0.
    pub photo_duration_secs: f64,
    /// Seconds each transition lasts, >= 0.
    pub transition_duration_secs: f64,
    /// Output frame rate.
    pub fps: Fps,
    /// Transition used between every pair of photos.
    pub transition: TransitionKind,
}

impl TimingConfig {
    /// Check durations and frame rate.
    pub fn validate(&self) -> SlidecastResult<()> {
        if !self.photo_duration_secs.is_finite() || self.photo_duration_secs <= 0.0 {
            return Err(SlidecastError::input("photo duration must be > 0 seconds"));
        }
        if !self.transition_duration_secs.is_finite() || self.transition_duration_secs < 0.0 {
            return Err(SlidecastError::input(
                "transition duration must be >= 0 seconds",
            ));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        Ok(())
    }

    /// Frames per photo hold (always >= 1 for a valid config).
    pub fn photo_frames(&self) -> u64 {
        frames_for_duration(self.photo_duration_secs, self.fps)
    }

    /// Frames per transition (0 disables transitions).
    pub fn transition_frames(&self) -> u64 {
        frames_for_duration(self.transition_duration_secs, self.fps)
    }
}

/// Convert a duration to a frame count, rounded to nearest.
///
/// Any positive duration yields at least one frame; zero (or negative) yields zero.
pub fn frames_for_duration(secs: f64, fps: Fps) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    fps.secs_to_frames_round(secs).max(1)
}
