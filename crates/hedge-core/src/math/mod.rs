//! # Mathematical Functions
//!
//! Fixed-point helpers shared by the solver, the quoter and the flows.

pub mod big_int;
pub mod safe_math;

// Re-export commonly used functions
pub use big_int::*;
pub use safe_math::*;
