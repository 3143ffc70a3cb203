//! Action primitives for the formpilot runner
//!
//! This crate provides the leaf building blocks every layer above consumes:
//! - [`Outcome`]: the uniform success/soft_fail/hard_fail result value
//! - [`RunCtx`]: the per-run context (page, pacer, catalog, timing, screenshots)
//! - [`Pacer`]: injectable human-like delays, zero-delay in tests
//! - selector-retry wait, click, typing, navigation and screenshot primitives

pub mod context;
pub mod errors;
pub mod outcome;
pub mod pacing;
mod primitives;
pub mod screenshots;
pub mod types;

pub use context::*;
pub use errors::*;
pub use outcome::*;
pub use pacing::*;
pub use primitives::*;
pub use screenshots::*;
pub use types::*;
