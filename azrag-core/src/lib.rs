//! azrag core - shared types, provider traits, configuration, errors and logging
//!
//! Everything the other azrag crates agree on lives here; nothing in this crate talks to a
//! remote service.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
