//! Data-driven selector catalog.
//!
//! Site-specific fallback selector lists and the declared step table live in a
//! YAML document, loaded once per process. Updating the wizard's markup means
//! editing `catalog/default.yaml` (or an override file), never control flow.

pub mod catalog;
pub mod errors;

pub use catalog::*;
pub use errors::*;
