//! Shared types for the shatter workspace: fragment ids, transforms, simulation config.

mod config;
mod types;

pub use config::{ConfigError, SimConfig};
pub use types::{FragmentId, Transform};
