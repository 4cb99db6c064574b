use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use rayon::prelude::*;

use crate::assets::decode::{Raster, decode_image};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Stable identifier of a photo within a [`Studio`](crate::Studio).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PhotoId(pub u64);

/// Where the encoded (or already decoded) pixels of a photo come from.
#[derive(Clone, Debug)]
pub enum PhotoData {
    /// An image file on disk.
    Path(PathBuf),
    /// Encoded image bytes held in memory.
    Bytes(Arc<[u8]>),
    /// A raster that needs no decoding.
    Raster(Raster),
}

/// An entry in the ordered photo list.
#[derive(Clone, Debug)]
pub struct PhotoSource {
    /// Identifier, unique within the owning list.
    pub id: PhotoId,
    /// Human-readable name (usually the file name).
    pub label: String,
    /// Pixel source.
    pub data: PhotoData,
}

impl PhotoSource {
    /// Build a source backed by a file; the label is the file name.
    pub fn from_path(id: PhotoId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id,
            label,
            data: PhotoData::Path(path),
        }
    }

    /// Build a source backed by an already decoded raster.
    pub fn from_raster(id: PhotoId, label: impl Into<String>, raster: Raster) -> Self {
        Self {
            id,
            label: label.into(),
            data: PhotoData::Raster(raster),
        }
    }
}

/// A decoded photo, frozen for the duration of a render.
#[derive(Clone, Debug)]
pub struct Photo {
    /// Identifier of the source entry.
    pub id: PhotoId,
    /// Decoded pixels.
    pub raster: Raster,
}

/// Capability that rasterizes a [`PhotoSource`].
///
/// Implementations must tolerate concurrent calls; [`decode_all`] fans out across a thread pool.
pub trait ImageDecoder: Send + Sync {
    /// Decode one source into premultiplied RGBA8.
    fn decode(&self, source: &PhotoSource) -> SlidecastResult<Raster>;
}

/// Default decoder: reads files from disk and decodes them with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageDecoder;

impl ImageDecoder for FsImageDecoder {
    fn decode(&self, source: &PhotoSource) -> SlidecastResult<Raster> {
        match &source.data {
            PhotoData::Path(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("read photo '{}'", path.display()))
                    .map_err(|e| SlidecastError::decode(format!("{e:#}")))?;
                decode_image(&bytes)
            }
            PhotoData::Bytes(bytes) => decode_image(bytes),
            PhotoData::Raster(raster) => Ok(raster.clone()),
        }
    }
}

/// Decode every source concurrently, preserving order.
///
/// Fails with the first observed [`SlidecastError::Decode`]; other in-flight decodes are
/// abandoned.
pub fn decode_all(
    decoder: &dyn ImageDecoder,
    sources: &[PhotoSource],
) -> SlidecastResult<Vec<Photo>> {
    sources
        .par_iter()
        .map(|src| {
            let raster = decoder.decode(src).map_err(|e| match e {
                SlidecastError::Decode(msg) => {
                    SlidecastError::decode(format!("photo '{}': {msg}", src.label))
                }
                other => SlidecastError::decode(format!("photo '{}': {other}", src.label)),
            })?;
            tracing::debug!(
                id = src.id.0,
                label = %src.label,
                width = raster.width,
                height = raster.height,
                "decoded photo"
            );
            Ok(Photo { id: src.id, raster })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/photo.rs"]
mod tests;
