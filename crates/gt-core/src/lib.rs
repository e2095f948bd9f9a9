//! green-tips/crates/gt-core/src/lib.rs
//!
//! The central domain logic and interface definitions for green-tips.

pub mod error;
pub mod models;
pub mod ranking;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ranking::*;
pub use traits::*;
