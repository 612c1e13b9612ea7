//! Persistence and match-factory port consumed by matchmaking.
//!
//! The coordinator depends on this trait alone; the default in-memory
//! implementation lets the server run standalone with no external database,
//! the same way [`crate::config`] ships usable defaults for every section.

mod in_memory;

pub use in_memory::InMemoryPersistence;

use async_trait::async_trait;

use crate::protocol::{CategoryId, RaceId, UserId};

/// A player carried into [`PersistencePort::create_matched_race`].
#[derive(Debug, Clone)]
pub struct MatchedPlayerInfo {
    pub user_id: UserId,
    pub user_name: String,
}

/// The coordinator's only dependency on the outer application: persisted
/// users, categories, and race rows live behind this port.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Creates a new race row for a matchmaking-formed group and returns its id.
    async fn create_matched_race(
        &self,
        players: &[MatchedPlayerInfo],
        category_id: CategoryId,
    ) -> RaceId;

    /// Chooses a challenge category appropriate for the group's skill band,
    /// or `None` if no suitable category exists yet.
    async fn pick_match_category(&self, group_avg_wpm: f64) -> Option<CategoryId>;

    /// A player's historical average WPM, used to seed their matchmaking entry.
    async fn get_player_average_wpm(&self, user_id: UserId) -> f64;
}
