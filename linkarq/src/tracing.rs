//! Re-exports the logging macros used throughout this crate.
//!
//! Modules `use crate::tracing::prelude::*;` instead of depending on the
//! `tracing` crate directly, so the logging backend can be swapped without
//! touching call sites.

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
}
