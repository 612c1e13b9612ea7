//! Matchmaking queue configuration.

use super::defaults::{default_min_group_size, default_skill_window_wpm};
use serde::{Deserialize, Serialize};

/// Parameters of the skill-window grouping policy.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchmakingConfig {
    /// Width, in WPM, of the band scanned around the oldest queued entry's
    /// `averageWpm` when looking for a group to match.
    #[serde(default = "default_skill_window_wpm")]
    pub skill_window_wpm: f64,
    /// Minimum number of queued entries required before a match is formed.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            skill_window_wpm: default_skill_window_wpm(),
            min_group_size: default_min_group_size(),
        }
    }
}
