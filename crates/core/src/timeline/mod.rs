pub mod compiler;
pub mod cutoff;
pub mod event;
