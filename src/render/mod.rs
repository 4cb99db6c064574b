/// Instruction to pixels.
pub mod frame;
/// The reusable output surface.
pub mod target;
