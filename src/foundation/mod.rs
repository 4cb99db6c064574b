/// Frame/time primitives shared across the engine.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod math;
