/// Frame index to render instruction mapping.
pub mod segment;
/// Durations and frame rate, converted to frame counts.
pub mod timing;
