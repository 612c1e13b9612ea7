//! The race room: the core unit of coordinated state.
//!
//! One `RaceRoom` exists per `raceId`. All of its methods assume the caller
//! already holds the room's lock (see [`crate::server::registry`]) — nothing
//! here performs its own locking, matching the room-serialization contract.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::protocol::{ParticipantSnapshot, RaceId, RaceStatus, UserId};

use super::connection_manager::ConnectionId;

/// A single racer's state within a room.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_name: String,
    pub current_challenge_index: u32,
    pub progress: f64,
    pub current_wpm: f64,
    pub wpm: Option<f64>,
    pub accuracy: Option<f64>,
    pub finished_at: Option<DateTime<Utc>>,
    pub rank: Option<u32>,
}

impl Participant {
    fn new(user_name: String) -> Self {
        Self {
            user_name,
            current_challenge_index: 0,
            progress: 0.0,
            current_wpm: 0.0,
            wpm: None,
            accuracy: None,
            finished_at: None,
            rank: None,
        }
    }

    fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    fn to_snapshot(&self, user_id: UserId) -> ParticipantSnapshot {
        ParticipantSnapshot {
            user_id,
            user_name: self.user_name.clone(),
            current_challenge_index: self.current_challenge_index,
            progress: self.progress,
            current_wpm: self.current_wpm,
            wpm: self.wpm,
            accuracy: self.accuracy,
            finished_at: self.finished_at,
            rank: self.rank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    AlreadyStarted,
    NotEnoughPlayers,
}

impl StartError {
    pub fn message(self) -> &'static str {
        match self {
            StartError::AlreadyStarted => "Race has already started",
            StartError::NotEnoughPlayers => "Need at least 2 players to start",
        }
    }
}

/// Outcome of starting a countdown, handed to the caller so it can spawn the
/// ticker task without `RaceRoom` itself owning any scheduling.
pub struct CountdownHandle {
    pub epoch: u64,
    pub deadline: DateTime<Utc>,
}

/// One race room: participants, spectators, and the status state machine.
pub struct RaceRoom {
    race_id: RaceId,
    status: RaceStatus,
    participants: HashMap<UserId, Participant>,
    racer_connections: HashSet<ConnectionId>,
    spectator_connections: HashSet<ConnectionId>,
    countdown_deadline: Option<DateTime<Utc>>,
    countdown_epoch: u64,
}

impl RaceRoom {
    pub fn new(race_id: RaceId) -> Self {
        Self {
            race_id,
            status: RaceStatus::Waiting,
            participants: HashMap::new(),
            racer_connections: HashSet::new(),
            spectator_connections: HashSet::new(),
            countdown_deadline: None,
            countdown_epoch: 0,
        }
    }

    pub fn race_id(&self) -> RaceId {
        self.race_id
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty_of_participants(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn racer_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.racer_connections.iter().copied()
    }

    pub fn spectator_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.spectator_connections.iter().copied()
    }

    pub fn all_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.racer_connections.iter().chain(self.spectator_connections.iter()).copied()
    }

    /// `race:join`. Idempotent for an already-present `userId`. A connection
    /// that was spectating this room is promoted to racer, not left in both
    /// sets — racer and spectator connections are disjoint.
    pub fn join(&mut self, connection_id: ConnectionId, user_id: UserId, user_name: String) {
        self.spectator_connections.remove(&connection_id);
        self.participants
            .entry(user_id)
            .or_insert_with(|| Participant::new(user_name));
        self.racer_connections.insert(connection_id);
    }

    /// `race:leave`, and the "room in `waiting`" branch of disconnect
    /// handling (the source treats them the same way). Returns `true` if
    /// the room is now empty of participants and should be destroyed.
    pub fn leave(&mut self, connection_id: ConnectionId, user_id: UserId) -> bool {
        self.participants.remove(&user_id);
        self.racer_connections.remove(&connection_id);
        if self.participants.is_empty() {
            self.countdown_epoch = self.countdown_epoch.wrapping_add(1);
            self.countdown_deadline = None;
            true
        } else {
            false
        }
    }

    /// Disconnect of a racer connection while the room is mid-countdown or
    /// mid-race: the connection is dropped from the racer set but the
    /// participant entry — and its progress/rank — is left in place, per the
    /// spec's resolution of the disconnect-semantics open question.
    pub fn disconnect_racer_in_flight(&mut self, connection_id: ConnectionId) {
        self.racer_connections.remove(&connection_id);
    }

    pub fn disconnect_spectator(&mut self, connection_id: ConnectionId) {
        self.spectator_connections.remove(&connection_id);
    }

    /// `race:start`. On success, returns the countdown handle; the caller
    /// spawns the ticker task using it.
    pub fn start(&mut self, countdown_seconds: u32, now: DateTime<Utc>) -> Result<CountdownHandle, StartError> {
        if self.status != RaceStatus::Waiting {
            return Err(StartError::AlreadyStarted);
        }
        if self.participants.len() < 2 {
            return Err(StartError::NotEnoughPlayers);
        }

        let deadline = now + chrono::Duration::seconds(i64::from(countdown_seconds) + 1);
        self.status = RaceStatus::Countdown;
        self.countdown_deadline = Some(deadline);
        self.countdown_epoch = self.countdown_epoch.wrapping_add(1);

        Ok(CountdownHandle {
            epoch: self.countdown_epoch,
            deadline,
        })
    }

    pub fn countdown_epoch(&self) -> u64 {
        self.countdown_epoch
    }

    pub fn countdown_deadline(&self) -> Option<DateTime<Utc>> {
        self.countdown_deadline
    }

    /// Called by the countdown ticker after reacquiring the lock; `true`
    /// means the ticker should keep running this episode.
    pub fn countdown_still_active(&self, epoch: u64) -> bool {
        self.status == RaceStatus::Countdown && self.countdown_epoch == epoch
    }

    /// Transition from the final countdown tick into `in_progress`.
    pub fn begin_race(&mut self, epoch: u64) -> bool {
        if !self.countdown_still_active(epoch) {
            return false;
        }
        self.status = RaceStatus::InProgress;
        true
    }

    /// `race:progress`. Returns `false` if the participant is absent (drop silently).
    pub fn progress(&mut self, user_id: UserId, progress: f64, current_wpm: f64) -> bool {
        let Some(participant) = self.participants.get_mut(&user_id) else {
            return false;
        };
        participant.progress = progress;
        participant.current_wpm = current_wpm;
        true
    }

    /// `race:advanceChallenge`. Returns `false` if the participant is absent.
    pub fn advance_challenge(&mut self, user_id: UserId) -> bool {
        let Some(participant) = self.participants.get_mut(&user_id) else {
            return false;
        };
        participant.current_challenge_index += 1;
        participant.progress = 0.0;
        participant.current_wpm = 0.0;
        true
    }

    /// `race:finish`. Returns `None` if the participant is absent or already
    /// finished (drop silently). Otherwise returns whether every participant
    /// has now finished, which the caller uses to transition to `finished`.
    pub fn finish(&mut self, user_id: UserId, wpm: f64, accuracy: f64, now: DateTime<Utc>) -> Option<bool> {
        let already_finished = self.participants.values().filter(|p| p.is_finished()).count();
        let participant = self.participants.get_mut(&user_id)?;
        if participant.is_finished() {
            return None;
        }

        participant.wpm = Some(wpm);
        participant.accuracy = Some(accuracy);
        participant.finished_at = Some(now);
        participant.progress = 100.0;
        #[allow(clippy::cast_possible_truncation)]
        let rank = already_finished as u32 + 1;
        participant.rank = Some(rank);

        let all_finished = self.participants.values().all(Participant::is_finished);
        if all_finished {
            self.status = RaceStatus::Finished;
        }
        Some(all_finished)
    }

    /// `race:spectate`. Caller has already confirmed the room exists. If the
    /// connection was racing in this same room, `racing_user_id` is its
    /// bound `UserId` so its participant row is dropped the way `race:leave`
    /// would — racer and spectator connections are disjoint, so a connection
    /// can't be promoted to spectator while still counted as a racer.
    pub fn spectate(&mut self, connection_id: ConnectionId, racing_user_id: Option<UserId>) {
        if let Some(user_id) = racing_user_id {
            self.leave(connection_id, user_id);
        } else {
            self.racer_connections.remove(&connection_id);
        }
        self.spectator_connections.insert(connection_id);
    }

    /// `race:unspectate`.
    pub fn unspectate(&mut self, connection_id: ConnectionId) {
        self.spectator_connections.remove(&connection_id);
    }

    pub fn spectator_count(&self) -> usize {
        self.spectator_connections.len()
    }

    pub fn snapshot_participants(&self) -> Vec<ParticipantSnapshot> {
        self.participants
            .iter()
            .map(|(user_id, participant)| participant.to_snapshot(*user_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::connection_manager::ConnectionManager;
    use chrono::TimeZone;

    /// ConnectionId has no public constructor outside the connection
    /// manager, so tests mint them through a throwaway manager.
    struct ConnIds {
        manager: ConnectionManager,
    }

    impl ConnIds {
        fn new() -> Self {
            Self {
                manager: ConnectionManager::new(),
            }
        }

        fn next(&self) -> ConnectionId {
            let (tx, _rx) = tokio::sync::mpsc::channel(1);
            self.manager.register(tx)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn join_is_idempotent_for_same_user() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let conn = ids.next();
        room.join(conn, UserId(10), "Alice".to_string());
        room.join(conn, UserId(10), "Alice".to_string());
        assert_eq!(room.participant_count(), 1);
    }

    #[test]
    fn leave_emptying_room_reports_became_empty() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let conn = ids.next();
        room.join(conn, UserId(10), "Alice".to_string());
        assert!(room.leave(conn, UserId(10)));
        assert!(room.is_empty_of_participants());
    }

    #[test]
    fn start_requires_two_participants() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        room.join(ids.next(), UserId(10), "Alice".to_string());
        assert_eq!(room.start(3, now()), Err(StartError::NotEnoughPlayers));
    }

    #[test]
    fn start_twice_fails_second_time() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        room.join(ids.next(), UserId(10), "Alice".to_string());
        room.join(ids.next(), UserId(20), "Bob".to_string());
        assert!(room.start(3, now()).is_ok());
        assert_eq!(room.start(3, now()), Err(StartError::AlreadyStarted));
    }

    #[test]
    fn finish_assigns_sequential_ranks_and_terminal_status() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        room.join(ids.next(), UserId(10), "Alice".to_string());
        room.join(ids.next(), UserId(20), "Bob".to_string());
        let handle = room.start(3, now()).unwrap();
        room.begin_race(handle.epoch);

        let all_finished = room.finish(UserId(10), 85.0, 97.0, now()).unwrap();
        assert!(!all_finished);
        let all_finished = room.finish(UserId(20), 72.0, 94.0, now()).unwrap();
        assert!(all_finished);
        assert_eq!(room.status(), RaceStatus::Finished);

        let snapshots = room.snapshot_participants();
        let alice = snapshots.iter().find(|p| p.user_id == UserId(10)).unwrap();
        let bob = snapshots.iter().find(|p| p.user_id == UserId(20)).unwrap();
        assert_eq!(alice.rank, Some(1));
        assert_eq!(bob.rank, Some(2));
    }

    #[test]
    fn finish_twice_for_same_user_is_dropped() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        room.join(ids.next(), UserId(10), "Alice".to_string());
        room.join(ids.next(), UserId(20), "Bob".to_string());
        room.start(3, now()).unwrap();
        room.finish(UserId(10), 85.0, 97.0, now());
        assert!(room.finish(UserId(10), 99.0, 99.0, now()).is_none());
    }

    #[test]
    fn mid_race_disconnect_keeps_participant_entry() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let conn = ids.next();
        room.join(conn, UserId(10), "Alice".to_string());
        room.join(ids.next(), UserId(20), "Bob".to_string());
        let handle = room.start(3, now()).unwrap();
        room.begin_race(handle.epoch);

        room.disconnect_racer_in_flight(conn);
        assert_eq!(room.participant_count(), 2);
        assert!(!room.racer_connections().any(|c| c == conn));
    }

    #[test]
    fn advance_challenge_resets_progress_without_affecting_finish_state() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        room.join(ids.next(), UserId(10), "Alice".to_string());
        room.progress(UserId(10), 50.0, 60.0);
        room.advance_challenge(UserId(10));
        let snap = room.snapshot_participants();
        let alice = snap.iter().find(|p| p.user_id == UserId(10)).unwrap();
        assert_eq!(alice.current_challenge_index, 1);
        assert_eq!(alice.progress, 0.0);
        assert_eq!(alice.current_wpm, 0.0);
    }

    #[test]
    fn spectate_and_unspectate_toggle_spectator_count() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let spectator = ids.next();
        room.spectate(spectator, None);
        assert_eq!(room.spectator_count(), 1);
        room.unspectate(spectator);
        assert_eq!(room.spectator_count(), 0);
    }

    #[test]
    fn spectating_while_still_a_racer_removes_the_racer_binding() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let conn = ids.next();
        room.join(conn, UserId(10), "Alice".to_string());
        room.join(ids.next(), UserId(20), "Bob".to_string());

        room.spectate(conn, Some(UserId(10)));

        assert!(!room.racer_connections().any(|c| c == conn));
        assert!(room.spectator_connections().any(|c| c == conn));
        assert_eq!(room.participant_count(), 1);
        assert_eq!(room.spectator_count(), 1);
    }

    #[test]
    fn joining_while_still_a_spectator_removes_the_spectator_binding() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let conn = ids.next();
        room.spectate(conn, None);

        room.join(conn, UserId(10), "Alice".to_string());

        assert!(!room.spectator_connections().any(|c| c == conn));
        assert!(room.racer_connections().any(|c| c == conn));
    }

    #[test]
    fn countdown_epoch_changes_invalidate_a_stale_ticker() {
        let ids = ConnIds::new();
        let mut room = RaceRoom::new(RaceId(1));
        let conn_a = ids.next();
        let conn_b = ids.next();
        room.join(conn_a, UserId(10), "Alice".to_string());
        room.join(conn_b, UserId(20), "Bob".to_string());
        let handle = room.start(3, now()).unwrap();
        assert!(room.countdown_still_active(handle.epoch));

        // Draining the room bumps the epoch even though status flips via leave.
        room.leave(conn_a, UserId(10));
        room.leave(conn_b, UserId(20));
        assert!(!room.countdown_still_active(handle.epoch));
    }
}
