use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assets::photo::{PhotoId, PhotoSource};
use crate::effects::transitions::TransitionKind;
use crate::encode::sink::SinkConfig;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::timeline::timing::TimingConfig;

/// Fewest photos a slideshow can be rendered from.
pub const MIN_PHOTOS: usize = 3;
/// Most photos a slideshow may hold.
pub const MAX_PHOTOS: usize = 5;
/// Allowed photo hold durations, in seconds.
pub const PHOTO_DURATION_SECS: RangeInclusive<f64> = 2.0..=6.0;
/// Allowed transition durations, in seconds.
pub const TRANSITION_DURATION_SECS: RangeInclusive<f64> = 0.5..=2.0;

/// User-facing slideshow settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlideshowSettings {
    /// Transition between consecutive photos.
    pub transition: TransitionKind,
    /// Seconds each photo is held.
    pub photo_duration_secs: f64,
    /// Seconds each transition lasts.
    pub transition_duration_secs: f64,
    /// Output frame rate.
    pub fps: Fps,
    /// Output resolution.
    pub canvas: Canvas,
    /// Target video bitrate in bits per second.
    pub bitrate_bps: u64,
}

impl Default for SlideshowSettings {
    fn default() -> Self {
        Self {
            transition: TransitionKind::Dissolve,
            photo_duration_secs: 3.0,
            transition_duration_secs: 1.0,
            fps: Fps { num: 30, den: 1 },
            canvas: Canvas::FULL_HD,
            bitrate_bps: 5_000_000,
        }
    }
}

impl SlideshowSettings {
    /// Check every field against the allowed ranges.
    pub fn validate(&self) -> SlidecastResult<()> {
        check_range(
            "photo duration",
            self.photo_duration_secs,
            &PHOTO_DURATION_SECS,
        )?;
        check_range(
            "transition duration",
            self.transition_duration_secs,
            &TRANSITION_DURATION_SECS,
        )?;
        Fps::new(self.fps.num, self.fps.den)?;
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SlidecastError::input("canvas width/height must be non-zero"));
        }
        if self.bitrate_bps == 0 {
            return Err(SlidecastError::input("bitrate must be non-zero"));
        }
        Ok(())
    }

    /// Engine timing derived from these settings.
    pub fn to_timing(&self) -> TimingConfig {
        TimingConfig {
            photo_duration_secs: self.photo_duration_secs,
            transition_duration_secs: self.transition_duration_secs,
            fps: self.fps,
            transition: self.transition,
        }
    }

    /// Sink configuration derived from these settings.
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            bitrate_bps: self.bitrate_bps,
        }
    }
}

fn check_range(what: &str, v: f64, range: &RangeInclusive<f64>) -> SlidecastResult<()> {
    if !range.contains(&v) {
        return Err(SlidecastError::input(format!(
            "{what} must be within [{}, {}] seconds, got {v}",
            range.start(),
            range.end()
        )));
    }
    Ok(())
}

/// Immutable snapshot of everything a render needs.
///
/// Built once at start; the job never looks at the studio again.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    photos: Vec<PhotoSource>,
    settings: SlideshowSettings,
}

impl RenderRequest {
    /// Validate and freeze a photo list and settings.
    pub fn new(photos: Vec<PhotoSource>, settings: SlideshowSettings) -> SlidecastResult<Self> {
        check_photo_count(photos.len())?;
        let mut seen = HashSet::with_capacity(photos.len());
        for p in &photos {
            if !seen.insert(p.id) {
                return Err(SlidecastError::input(format!(
                    "duplicate photo id {}",
                    p.id.0
                )));
            }
        }
        settings.validate()?;
        Ok(Self { photos, settings })
    }

    /// Ordered photo sources.
    pub fn photos(&self) -> &[PhotoSource] {
        &self.photos
    }

    /// Settings in effect for this render.
    pub fn settings(&self) -> &SlideshowSettings {
        &self.settings
    }
}

pub(crate) fn check_photo_count(n: usize) -> SlidecastResult<()> {
    if n < MIN_PHOTOS {
        return Err(SlidecastError::input(format!(
            "at least {MIN_PHOTOS} photos are required, got {n}"
        )));
    }
    if n > MAX_PHOTOS {
        return Err(SlidecastError::input(format!(
            "at most {MAX_PHOTOS} photos are allowed, got {n}"
        )));
    }
    Ok(())
}

/// On-disk slideshow description.
///
/// ```json
/// { "photos": ["a.jpg", "b.png", "c.jpg"], "settings": { "transition": "slide" } }
/// ```
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Photo files, in order. Relative paths are resolved against the manifest directory.
    pub photos: Vec<PathBuf>,
    /// Settings; omitted fields take their defaults.
    #[serde(default)]
    pub settings: SlideshowSettings,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json_str(s: &str) -> SlidecastResult<Self> {
        serde_json::from_str(s).map_err(|e| SlidecastError::input(format!("invalid manifest: {e}")))
    }

    /// Read a manifest file and resolve its photo paths.
    pub fn from_path(path: &Path) -> SlidecastResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        let mut manifest = Self::from_json_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        manifest.resolve_paths(base);
        Ok(manifest)
    }

    /// Make relative photo paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for p in &mut self.photos {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }

    /// Photo sources with ids `1..=n` in manifest order.
    pub fn photo_sources(&self) -> Vec<PhotoSource> {
        self.photos
            .iter()
            .zip(1u64..)
            .map(|(p, id)| PhotoSource::from_path(PhotoId(id), p.clone()))
            .collect()
    }

    /// Build a validated render request.
    pub fn to_request(&self) -> SlidecastResult<RenderRequest> {
        RenderRequest::new(self.photo_sources(), self.settings.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/request.rs"]
mod tests;
