//! In-memory default implementation of [`PersistencePort`].
//!
//! Keeps the server runnable without an external database: categories are a
//! fixed WPM-banded table, race ids come from an atomic counter, and player
//! averages fall back to a flat baseline since there is no history to draw
//! from. A real deployment swaps this out for an implementation backed by
//! its own store.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use crate::protocol::{CategoryId, RaceId, UserId};

use super::{MatchedPlayerInfo, PersistencePort};

/// `(max_wpm_inclusive, category_id)`, checked in order.
const CATEGORY_BANDS: &[(f64, i64)] = &[(30.0, 1), (60.0, 2), (90.0, 3), (f64::INFINITY, 4)];

pub struct InMemoryPersistence {
    next_race_id: AtomicI64,
    default_average_wpm: f64,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            next_race_id: AtomicI64::new(1),
            default_average_wpm: 40.0,
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn create_matched_race(
        &self,
        players: &[MatchedPlayerInfo],
        category_id: CategoryId,
    ) -> RaceId {
        let id = self.next_race_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            race_id = id,
            player_count = players.len(),
            category = category_id.0,
            "created matched race"
        );
        RaceId(id)
    }

    async fn pick_match_category(&self, group_avg_wpm: f64) -> Option<CategoryId> {
        CATEGORY_BANDS
            .iter()
            .find(|(max_wpm, _)| group_avg_wpm <= *max_wpm)
            .map(|(_, id)| CategoryId(*id))
    }

    async fn get_player_average_wpm(&self, _user_id: UserId) -> f64 {
        self.default_average_wpm
    }
}
