//! Default value functions for configuration fields.
//!
//! Organized by category, mirroring the structure of the root [`Config`](super::Config).

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3536
}

// =============================================================================
// Server Defaults
// =============================================================================

/// Seconds between heartbeat sweeps over all connections.
pub const fn default_heartbeat_interval_secs() -> u64 {
    30
}

/// Seconds of silence (no pong) before a connection is forcibly terminated.
pub const fn default_ping_timeout_secs() -> u64 {
    30
}

/// Number of whole seconds counted down before a race starts.
pub const fn default_countdown_seconds() -> u32 {
    3
}

// =============================================================================
// Matchmaking Defaults
// =============================================================================

/// Width of the skill band (in WPM) scanned around the oldest queued entry.
pub const fn default_skill_window_wpm() -> f64 {
    15.0
}

/// Minimum number of queued entries required to form a match.
pub const fn default_min_group_size() -> usize {
    2
}

// =============================================================================
// Player Name Validation Defaults
// =============================================================================

pub const fn default_max_user_name_length() -> usize {
    32
}

pub const fn default_allow_unicode_user_names() -> bool {
    true
}

pub const fn default_allow_spaces_in_user_names() -> bool {
    true
}

pub const fn default_allow_leading_trailing_whitespace() -> bool {
    false
}

pub fn default_allowed_user_name_symbols() -> Vec<char> {
    vec!['-', '_']
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
