//! Room registry: the sole owner of race creation and destruction.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::protocol::RaceId;

use super::room::RaceRoom;

/// Maps `raceId` to its room, each behind its own lock so mutations of
/// different rooms never contend with each other.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RaceId, Arc<Mutex<RaceRoom>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, race_id: RaceId) -> Option<Arc<Mutex<RaceRoom>>> {
        self.rooms.get(&race_id).map(|entry| Arc::clone(&entry))
    }

    /// Returns the room for `race_id`, creating it in `waiting` if absent.
    /// The `bool` tells the caller whether this call created the room, so it
    /// can be the single place that drives a rooms-created metric.
    pub fn get_or_create(&self, race_id: RaceId) -> (Arc<Mutex<RaceRoom>>, bool) {
        let mut created = false;
        let room = Arc::clone(&self.rooms.entry(race_id).or_insert_with(|| {
            created = true;
            Arc::new(Mutex::new(RaceRoom::new(race_id)))
        }));
        (room, created)
    }

    pub fn remove(&self, race_id: RaceId) {
        self.rooms.remove(&race_id);
    }

    pub fn contains(&self, race_id: RaceId) -> bool {
        self.rooms.contains_key(&race_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
