/// Convenience result type used across slidecast.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    /// Invalid caller-provided input (photo count, durations, manifest data).
    ///
    /// Raised synchronously at the configure/start boundary; never reaches rendering.
    #[error("input error: {0}")]
    Input(String),

    /// A source photo could not be rasterized.
    #[error("decode error: {0}")]
    Decode(String),

    /// The output sink was unavailable or rejected its configuration.
    #[error("sink setup error: {0}")]
    SinkSetup(String),

    /// The output sink failed while accepting frames or finalizing the stream.
    #[error("encode error: {0}")]
    Encode(String),

    /// A render is already in flight.
    #[error("busy: {0}")]
    Busy(String),

    /// Internal compositing invariant violations (buffer sizes, frame bounds).
    #[error("render error: {0}")]
    Render(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    /// Build a [`SlidecastError::Input`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Build a [`SlidecastError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`SlidecastError::SinkSetup`] value.
    pub fn sink_setup(msg: impl Into<String>) -> Self {
        Self::SinkSetup(msg.into())
    }

    /// Build a [`SlidecastError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`SlidecastError::Busy`] value.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Build a [`SlidecastError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
