//! Core data models for the meta engine.

mod era;
mod placement;
mod quality;
mod stats;

pub use era::*;
pub use placement::*;
pub use quality::*;
pub use stats::*;
