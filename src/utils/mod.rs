//! Utilities for Midnight.
//!
//! Submodules:
//! - `interpolation`: Theme token substitution for stylesheet text, with CSS escaping.

pub mod interpolation;
