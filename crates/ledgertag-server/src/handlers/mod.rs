//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod model;
pub mod recommend;

// Re-export all handlers for use in router
pub use model::*;
pub use recommend::*;
