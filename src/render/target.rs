use crate::assets::decode::unpremultiply_rgba8_in_place;
use crate::foundation::core::Canvas;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag is included to make this explicit
/// at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Convert to straight (non-premultiplied) alpha, as image writers expect.
    pub fn into_straight_alpha(mut self) -> Self {
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut self.data);
            self.premultiplied = false;
        }
        self
    }
}

/// Fixed-size surface every frame is drawn into.
///
/// Allocated once per render and cleared before each frame; never reallocated.
#[derive(Debug)]
pub struct RenderTarget {
    canvas: Canvas,
    data: Vec<u8>,
}

impl RenderTarget {
    /// Allocate a transparent surface of `canvas` size.
    pub fn new(canvas: Canvas) -> SlidecastResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(SlidecastError::input(
                "render target width/height must be non-zero",
            ));
        }
        Ok(Self {
            canvas,
            data: vec![0u8; canvas.rgba8_len()],
        })
    }

    /// Surface dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable byte span for `len_px` pixels of row `y` starting at column `x`.
    pub(crate) fn span_mut(&mut self, x: u32, y: u32, len_px: u32) -> &mut [u8] {
        let start = ((y as usize) * (self.canvas.width as usize) + (x as usize)) * 4;
        let end = start + (len_px as usize) * 4;
        &mut self.data[start..end]
    }

    /// Read the premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.canvas.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Copy the current contents into an owned frame.
    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.data.clone(),
            premultiplied: true,
        }
    }
}
