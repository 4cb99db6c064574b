/// Encoded image bytes to premultiplied rasters.
pub mod decode;
/// Source photos and the decode capability.
pub mod photo;
