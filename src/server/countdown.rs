//! Per-room countdown ticker, spawned by `race:start`.
//!
//! One task per countdown episode. After each wake it reacquires the room
//! lock and checks its captured epoch against the room's live one; a
//! mismatch means the room was drained (or never existed any more) and the
//! task exits without broadcasting further, which is how cancellation is
//! realized without a separate cancel handle.

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::LobbyAction;
use crate::protocol::RaceId;

use super::room::CountdownHandle;
use super::room_service::broadcast;
use super::RaceCoordinator;

pub(super) fn spawn(coordinator: Arc<RaceCoordinator>, race_id: RaceId, handle: CountdownHandle, countdown_seconds: u32) {
    tokio::spawn(run(coordinator, race_id, handle, countdown_seconds));
}

async fn run(coordinator: Arc<RaceCoordinator>, race_id: RaceId, handle: CountdownHandle, countdown_seconds: u32) {
    let Some(room_lock) = coordinator.registry.get(race_id) else {
        return;
    };

    #[allow(clippy::cast_possible_wrap)]
    let mut count = countdown_seconds as i32;
    loop {
        {
            let room = room_lock.lock().await;
            if !room.countdown_still_active(handle.epoch) {
                return;
            }
            broadcast(&coordinator.connections, &room, Some(count));
        }

        if count == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        count -= 1;
    }

    let (status, participant_count) = {
        let mut room = room_lock.lock().await;
        if !room.begin_race(handle.epoch) {
            return;
        }
        broadcast(&coordinator.connections, &room, None);
        (room.status(), room.participant_count())
    };

    coordinator
        .lobby
        .publish(&coordinator, LobbyAction::Updated, race_id, Some(participant_count), Some(status))
        .await;
}
