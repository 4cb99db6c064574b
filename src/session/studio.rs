//! Caller-facing surface: an editable photo list plus settings, from which renders are started.
//!
//! Each edit bumps the studio's input generation and drops any stored output, so a video is only
//! ever shown next to the inputs it was rendered from.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assets::photo::{FsImageDecoder, ImageDecoder, PhotoData, PhotoId, PhotoSource};
use crate::encode::ffmpeg::FfmpegSinkFactory;
use crate::encode::sink::SinkFactory;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::session::job::{FlightGuard, RenderJob, RenderedVideo};
use crate::session::request::{MAX_PHOTOS, RenderRequest, SlideshowSettings, check_photo_count};

/// Direction for [`Studio::move_photo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards the start of the list.
    Up,
    /// Towards the end of the list.
    Down,
}

/// Editable slideshow state and render launcher.
pub struct Studio {
    decoder: Arc<dyn ImageDecoder>,
    sinks: Arc<dyn SinkFactory>,
    photos: Vec<PhotoSource>,
    settings: SlideshowSettings,
    next_id: u64,
    generation: u64,
    in_flight: Arc<AtomicBool>,
    output: Option<RenderedVideo>,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("photos", &self.photos.len())
            .field("settings", &self.settings)
            .field("generation", &self.generation)
            .field("rendering", &self.is_rendering())
            .field("has_output", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(
            Arc::new(FsImageDecoder),
            Arc::new(FfmpegSinkFactory::default()),
        )
    }
}

impl Studio {
    /// Create an empty studio with the given decode and encode capabilities.
    pub fn new(decoder: Arc<dyn ImageDecoder>, sinks: Arc<dyn SinkFactory>) -> Self {
        Self {
            decoder,
            sinks,
            photos: Vec::new(),
            settings: SlideshowSettings::default(),
            next_id: 1,
            generation: 0,
            in_flight: Arc::new(AtomicBool::new(false)),
            output: None,
        }
    }

    /// Ordered photo list.
    pub fn photos(&self) -> &[PhotoSource] {
        &self.photos
    }

    /// Current settings.
    pub fn settings(&self) -> &SlideshowSettings {
        &self.settings
    }

    /// Input generation; changes on every edit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` while a job started from this studio is alive and not terminal.
    pub fn is_rendering(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Append photos. All-or-nothing: if the list would exceed the limit nothing is added.
    pub fn add_photos<L, I>(&mut self, items: I) -> SlidecastResult<Vec<PhotoId>>
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, PhotoData)>,
    {
        let items: Vec<(L, PhotoData)> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(Vec::new());
        }
        if self.photos.len() + items.len() > MAX_PHOTOS {
            return Err(SlidecastError::input(format!(
                "at most {MAX_PHOTOS} photos are allowed ({} present, {} added)",
                self.photos.len(),
                items.len()
            )));
        }

        let mut ids = Vec::with_capacity(items.len());
        for (label, data) in items {
            let id = self.allocate_id();
            self.photos.push(PhotoSource {
                id,
                label: label.into(),
                data,
            });
            ids.push(id);
        }
        self.invalidate("photos added");
        Ok(ids)
    }

    /// Append photo files, labelled by file name.
    pub fn add_photo_paths<P>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> SlidecastResult<Vec<PhotoId>>
    where
        P: Into<PathBuf>,
    {
        let items: Vec<(String, PhotoData)> = paths
            .into_iter()
            .map(|p| {
                let src = PhotoSource::from_path(PhotoId(0), p);
                (src.label, src.data)
            })
            .collect();
        self.add_photos(items)
    }

    /// Remove the photo with `id`. Returns `false` when no such photo exists.
    pub fn remove_photo(&mut self, id: PhotoId) -> bool {
        let Some(pos) = self.photos.iter().position(|p| p.id == id) else {
            return false;
        };
        self.photos.remove(pos);
        self.invalidate("photo removed");
        true
    }

    /// Swap the photo at `index` with its neighbour. Moves past either end are no-ops.
    pub fn move_photo(&mut self, index: usize, direction: MoveDirection) -> bool {
        let other = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1),
        };
        let Some(other) = other.filter(|&o| o < self.photos.len() && index < self.photos.len())
        else {
            return false;
        };
        self.photos.swap(index, other);
        self.invalidate("photo moved");
        true
    }

    /// Replace the settings after validating them.
    pub fn set_settings(&mut self, settings: SlideshowSettings) -> SlidecastResult<()> {
        settings.validate()?;
        if settings != self.settings {
            self.settings = settings;
            self.invalidate("settings changed");
        }
        Ok(())
    }

    /// Replace both the photo list and the settings.
    ///
    /// Accepts up to the photo limit; the minimum is enforced by [`start`](Self::start).
    pub fn configure<L, I>(
        &mut self,
        items: I,
        settings: SlideshowSettings,
    ) -> SlidecastResult<Vec<PhotoId>>
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, PhotoData)>,
    {
        settings.validate()?;
        let items: Vec<(L, PhotoData)> = items.into_iter().collect();
        if items.len() > MAX_PHOTOS {
            return Err(SlidecastError::input(format!(
                "at most {MAX_PHOTOS} photos are allowed, got {}",
                items.len()
            )));
        }
        self.photos.clear();
        self.settings = settings;
        self.invalidate("reconfigured");
        self.add_photos(items)
    }

    /// Snapshot the current inputs and create a job for them.
    ///
    /// Fails with [`SlidecastError::Input`] for a bad photo count and with
    /// [`SlidecastError::Busy`] while another job from this studio is in flight.
    #[tracing::instrument(level = "debug", skip(self), fields(generation = self.generation))]
    pub fn start(&mut self) -> SlidecastResult<RenderJob> {
        check_photo_count(self.photos.len())?;
        let request = RenderRequest::new(self.photos.clone(), self.settings.clone())?;
        let guard = FlightGuard::try_acquire(&self.in_flight)?;
        Ok(
            RenderJob::new(request, Arc::clone(&self.decoder), Arc::clone(&self.sinks))
                .with_flight(guard, self.generation),
        )
    }

    /// Store a finished render if it still matches the current inputs.
    ///
    /// Returns `false` (and drops the video) when the inputs changed after the job started.
    pub fn accept_output(&mut self, video: RenderedVideo) -> bool {
        if video.generation != self.generation {
            tracing::warn!(
                rendered = video.generation,
                current = self.generation,
                "discarding output rendered from stale inputs"
            );
            return false;
        }
        self.output = Some(video);
        true
    }

    /// Latest valid output.
    pub fn output(&self) -> Option<&RenderedVideo> {
        self.output.as_ref()
    }

    /// Take the latest valid output, leaving none stored.
    pub fn take_output(&mut self) -> Option<RenderedVideo> {
        self.output.take()
    }

    fn allocate_id(&mut self) -> PhotoId {
        let id = PhotoId(self.next_id);
        self.next_id += 1;
        id
    }

    fn invalidate(&mut self, why: &str) {
        self.generation += 1;
        if self.output.take().is_some() {
            tracing::debug!(generation = self.generation, why, "previous output released");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/studio.rs"]
mod tests;
