pub mod config;
pub mod error;
pub mod events;
pub mod persist;
pub mod types;

pub use config::LightboxConfig;
pub use error::{LightboxError, Result};
pub use events::StatsEvent;
pub use types::*;
