//! # Core Types
//!
//! Assets, positions and configuration shared by every engine component.

pub mod assets;
pub mod config;
pub mod positions;

pub use assets::*;
pub use config::*;
pub use positions::*;
