/// Frame-driven render loop and its state machine.
pub mod job;
/// Settings, render snapshots and manifests.
pub mod request;
/// Editable photo list, single-flight start and output bookkeeping.
pub mod studio;
