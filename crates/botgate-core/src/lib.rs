//! Shared leaf crate: configuration, error taxonomy, domain types, and
//! logging sink setup for the botgate workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::ManagerConfig;
pub use error::{ManagerError, PlatformError, Result};
pub use types::{Action, InboundRequest, RunContext};
