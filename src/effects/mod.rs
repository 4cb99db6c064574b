/// Premultiplied RGBA8 pixel operators.
pub mod composite;
/// Cover-fit compositing of photos into a box.
pub mod cover;
/// Dissolve and slide transitions.
pub mod transitions;
