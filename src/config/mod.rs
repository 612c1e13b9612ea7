//! Configuration module for the race coordinator.
//!
//! Supports layered JSON configuration with:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`server`]: Timing configuration (heartbeat, countdown)
//! - [`matchmaking`]: Skill-window matchmaking parameters
//! - [`protocol`]: User-name validation rules
//! - [`logging`]: Logging configuration
//! - [`loader`]: Configuration loading functions
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod matchmaking;
pub mod protocol;
pub mod server;
pub mod types;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use matchmaking::MatchmakingConfig;
pub use protocol::{ProtocolConfig, UserNameValidationConfig};
pub use server::ServerConfig;
pub use types::Config;
