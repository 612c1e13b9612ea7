//! Skill-window matchmaking queue.
//!
//! Match formation is peek-then-commit: a candidate group is found and its
//! average WPM computed without removing anything from the queue, the match
//! factory is consulted, and only a `Some` category actually dequeues the
//! group. This is what lets "no suitable category yet" leave everyone
//! queued instead of silently dropping them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::protocol::{validate_user_name_with_config, ConnectionRole, LobbyAction, MatchedPlayer, MatchmakingStatus, ServerMessage, UserId};

use super::connection_manager::{ConnectionId, Outbound};
use super::RaceCoordinator;
use crate::persistence::MatchedPlayerInfo;

#[derive(Debug, Clone)]
struct Entry {
    connection_id: ConnectionId,
    user_id: UserId,
    user_name: String,
    average_wpm: f64,
    joined_order: u64,
}

#[derive(Default)]
pub struct MatchmakingQueue {
    entries: Mutex<Vec<Entry>>,
    next_order: AtomicU64,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_order: AtomicU64::new(0),
        }
    }
}

impl RaceCoordinator {
    pub async fn handle_matchmaking_join(self: &Arc<Self>, conn: ConnectionId, user_id: UserId, user_name: String) {
        if let Err(reason) = validate_user_name_with_config(&user_name, &self.config.protocol) {
            self.send_error(conn, reason).await;
            return;
        }

        {
            let entries = self.matchmaking.entries.lock().await;
            if entries.iter().any(|e| e.user_id == user_id) {
                drop(entries);
                self.send_error(conn, "Already in matchmaking queue").await;
                return;
            }
        }
        let average_wpm = self.persistence.get_player_average_wpm(user_id).await;
        let joined_order = self.matchmaking.next_order.fetch_add(1, Ordering::Relaxed);
        {
            let mut entries = self.matchmaking.entries.lock().await;
            entries.push(Entry {
                connection_id: conn,
                user_id,
                user_name,
                average_wpm,
                joined_order,
            });
        }
        self.connections.set_in_matchmaking(conn, true);
        self.metrics.increment_matchmaking_joins();

        self.send(
            conn,
            ServerMessage::MatchmakingStatusMsg {
                status: MatchmakingStatus::Queued,
                average_wpm: Some(average_wpm),
                queue_size: Some(self.matchmaking.entries.lock().await.len()),
                race_id: None,
                players: None,
            },
        )
        .await;

        self.try_form_match().await;
    }

    pub async fn handle_matchmaking_leave(self: &Arc<Self>, conn: ConnectionId, user_id: UserId) {
        let removed = {
            let mut entries = self.matchmaking.entries.lock().await;
            let before = entries.len();
            entries.retain(|e| e.user_id != user_id);
            entries.len() != before
        };
        self.connections.set_in_matchmaking(conn, false);
        if removed {
            self.send(
                conn,
                ServerMessage::MatchmakingStatusMsg {
                    status: MatchmakingStatus::Cancelled,
                    average_wpm: None,
                    queue_size: None,
                    race_id: None,
                    players: None,
                },
            )
            .await;
        }
    }

    /// Disconnect while enqueued: silent removal, no reply (the connection is gone).
    ///
    /// Filters by `connection_id` rather than `UserId` because a connection
    /// that only ever joined the matchmaking queue never binds a `UserId`
    /// onto its `ConnectionState` (only `bind_race` does that) — the queue
    /// `Entry` is the only place this connection's user id is recorded.
    pub(super) async fn handle_matchmaking_disconnect(self: &Arc<Self>, conn: ConnectionId) {
        let mut entries = self.matchmaking.entries.lock().await;
        entries.retain(|e| e.connection_id != conn);
    }

    /// Keeps forming matches until the queue no longer has a full group
    /// within the skill window — one pass can free up a second match if the
    /// queue was backed up.
    async fn try_form_match(self: &Arc<Self>) {
        while self.try_form_one_match().await {}
    }

    async fn try_form_one_match(self: &Arc<Self>) -> bool {
        let min_group_size = self.config.matchmaking.min_group_size;
        let skill_window = self.config.matchmaking.skill_window_wpm;

        let group_ids: Vec<UserId> = {
            let entries = self.matchmaking.entries.lock().await;
            if entries.len() < min_group_size {
                return false;
            }
            let mut sorted: Vec<&Entry> = entries.iter().collect();
            sorted.sort_by_key(|e| e.joined_order);
            let anchor_wpm = sorted[0].average_wpm;
            sorted
                .into_iter()
                .filter(|e| (e.average_wpm - anchor_wpm).abs() <= skill_window)
                .map(|e| e.user_id)
                .collect()
        };

        if group_ids.len() < min_group_size {
            return false;
        }

        let group_avg_wpm = {
            let entries = self.matchmaking.entries.lock().await;
            let matching: Vec<&Entry> = entries.iter().filter(|e| group_ids.contains(&e.user_id)).collect();
            if matching.len() < min_group_size {
                return false;
            }
            matching.iter().map(|e| e.average_wpm).sum::<f64>() / matching.len() as f64
        };

        let Some(category_id) = self.persistence.pick_match_category(group_avg_wpm).await else {
            tracing::debug!(group_avg_wpm, "match factory returned no category, players remain queued");
            return false;
        };

        let matched: Vec<Entry> = {
            let mut entries = self.matchmaking.entries.lock().await;
            let mut taken = Vec::new();
            let mut indices: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| group_ids.contains(&e.user_id))
                .map(|(i, _)| i)
                .collect();
            if indices.len() < min_group_size {
                return false;
            }
            indices.sort_unstable_by(|a, b| b.cmp(a));
            for index in indices {
                taken.push(entries.remove(index));
            }
            taken.reverse();
            taken
        };

        let player_infos: Vec<MatchedPlayerInfo> = matched
            .iter()
            .map(|e| MatchedPlayerInfo {
                user_id: e.user_id,
                user_name: e.user_name.clone(),
            })
            .collect();
        let race_id = self.persistence.create_matched_race(&player_infos, category_id).await;
        self.metrics.increment_matchmaking_matches_formed();

        let (room_lock, created) = self.registry.get_or_create(race_id);
        if created {
            self.metrics.increment_rooms_created();
        }
        {
            let mut room = room_lock.lock().await;
            for entry in &matched {
                room.join(entry.connection_id, entry.user_id, entry.user_name.clone());
                self.connections.bind_race(
                    entry.connection_id,
                    race_id,
                    entry.user_id,
                    entry.user_name.clone(),
                    ConnectionRole::Racer,
                );
                self.connections.set_in_matchmaking(entry.connection_id, false);
            }
        }

        let players: Vec<MatchedPlayer> = matched
            .iter()
            .map(|e| MatchedPlayer {
                user_id: e.user_id,
                user_name: e.user_name.clone(),
            })
            .collect();
        for entry in &matched {
            self.send(
                entry.connection_id,
                ServerMessage::MatchmakingStatusMsg {
                    status: MatchmakingStatus::Matched,
                    average_wpm: None,
                    queue_size: None,
                    race_id: Some(race_id),
                    players: Some(players.clone()),
                },
            )
            .await;
        }

        self.lobby
            .publish(self, LobbyAction::Created, race_id, Some(matched.len()), Some(crate::protocol::RaceStatus::Waiting))
            .await;

        true
    }
}

impl RaceCoordinator {
    pub(super) async fn send(self: &Arc<Self>, conn: ConnectionId, message: ServerMessage) {
        if let Some(sender) = self.connections.sender(conn) {
            if sender.try_send(Outbound::Message(Arc::new(message))).is_err() {
                self.metrics.increment_dropped_sends();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use crate::config::Config;
    use crate::metrics::ServerMetrics;
    use crate::persistence::PersistencePort;
    use crate::protocol::{CategoryId, RaceId, RaceStatus};

    /// A [`PersistencePort`] whose category decision and per-player WPM are
    /// both test-controlled, so match formation can be exercised without the
    /// in-memory default's always-some category table.
    struct TestPersistence {
        category: Option<CategoryId>,
        wpm_by_user: StdMutex<HashMap<UserId, f64>>,
    }

    impl TestPersistence {
        fn new(category: Option<CategoryId>) -> Self {
            Self { category, wpm_by_user: StdMutex::new(HashMap::new()) }
        }

        fn with_wpm(self, user_id: UserId, wpm: f64) -> Self {
            self.wpm_by_user.lock().unwrap().insert(user_id, wpm);
            self
        }
    }

    #[async_trait]
    impl PersistencePort for TestPersistence {
        async fn create_matched_race(&self, _players: &[MatchedPlayerInfo], _category_id: CategoryId) -> RaceId {
            RaceId(1)
        }

        async fn pick_match_category(&self, _group_avg_wpm: f64) -> Option<CategoryId> {
            self.category
        }

        async fn get_player_average_wpm(&self, user_id: UserId) -> f64 {
            *self.wpm_by_user.lock().unwrap().get(&user_id).unwrap_or(&40.0)
        }
    }

    fn coordinator(persistence: TestPersistence) -> Arc<RaceCoordinator> {
        RaceCoordinator::new(Config::default(), Arc::new(persistence), Arc::new(ServerMetrics::new()))
    }

    #[test]
    fn queue_orders_by_join_sequence() {
        let queue = MatchmakingQueue::new();
        assert_eq!(queue.next_order.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn a_single_joiner_stays_queued_below_min_group_size() {
        let coordinator = coordinator(TestPersistence::new(Some(CategoryId(1))));
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let conn = coordinator.connections.register(tx);

        coordinator.handle_matchmaking_join(conn, UserId(1), "Ada".to_string()).await;

        assert_eq!(coordinator.matchmaking.entries.lock().await.len(), 1);
        assert_eq!(coordinator.connections.state(conn).unwrap().race_id, None);
    }

    #[tokio::test]
    async fn a_player_outside_the_skill_window_is_not_grouped() {
        let coordinator = coordinator(
            TestPersistence::new(Some(CategoryId(1)))
                .with_wpm(UserId(1), 20.0)
                .with_wpm(UserId(2), 80.0),
        );
        let (tx1, _rx1) = tokio::sync::mpsc::channel(4);
        let (tx2, _rx2) = tokio::sync::mpsc::channel(4);
        let conn1 = coordinator.connections.register(tx1);
        let conn2 = coordinator.connections.register(tx2);

        coordinator.handle_matchmaking_join(conn1, UserId(1), "Ada".to_string()).await;
        coordinator.handle_matchmaking_join(conn2, UserId(2), "Grace".to_string()).await;

        assert_eq!(coordinator.matchmaking.entries.lock().await.len(), 2);
        assert_eq!(coordinator.connections.state(conn1).unwrap().race_id, None);
    }

    #[tokio::test]
    async fn a_null_category_leaves_a_full_group_queued() {
        let coordinator = coordinator(
            TestPersistence::new(None).with_wpm(UserId(1), 40.0).with_wpm(UserId(2), 42.0),
        );
        let (tx1, _rx1) = tokio::sync::mpsc::channel(4);
        let (tx2, _rx2) = tokio::sync::mpsc::channel(4);
        let conn1 = coordinator.connections.register(tx1);
        let conn2 = coordinator.connections.register(tx2);

        coordinator.handle_matchmaking_join(conn1, UserId(1), "Ada".to_string()).await;
        coordinator.handle_matchmaking_join(conn2, UserId(2), "Grace".to_string()).await;

        assert_eq!(coordinator.matchmaking.entries.lock().await.len(), 2);
        assert_eq!(coordinator.metrics.matchmaking_matches_formed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn a_full_group_within_window_is_matched_and_auto_joined() {
        let coordinator = coordinator(
            TestPersistence::new(Some(CategoryId(2))).with_wpm(UserId(1), 40.0).with_wpm(UserId(2), 45.0),
        );
        let (tx1, mut rx1) = tokio::sync::mpsc::channel(4);
        let (tx2, mut rx2) = tokio::sync::mpsc::channel(4);
        let conn1 = coordinator.connections.register(tx1);
        let conn2 = coordinator.connections.register(tx2);

        coordinator.handle_matchmaking_join(conn1, UserId(1), "Ada".to_string()).await;
        coordinator.handle_matchmaking_join(conn2, UserId(2), "Grace".to_string()).await;

        assert!(coordinator.matchmaking.entries.lock().await.is_empty());
        let state1 = coordinator.connections.state(conn1).unwrap();
        let state2 = coordinator.connections.state(conn2).unwrap();
        assert_eq!(state1.race_id, Some(RaceId(1)));
        assert_eq!(state2.race_id, Some(RaceId(1)));
        assert_eq!(coordinator.registry.get(RaceId(1)).unwrap().lock().await.status(), RaceStatus::Waiting);

        // Queued status, then matched status, for each player.
        let _ = rx1.recv().await;
        let matched = rx1.recv().await.expect("matched status should follow");
        match matched {
            Outbound::Message(message) => match message.as_ref() {
                ServerMessage::MatchmakingStatusMsg { status, race_id, .. } => {
                    assert_eq!(*status, MatchmakingStatus::Matched);
                    assert_eq!(*race_id, Some(RaceId(1)));
                }
                other => panic!("unexpected message: {other:?}"),
            },
            other => panic!("unexpected outbound: {other:?}"),
        }
        let _ = rx2.recv().await;
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn joining_with_an_invalid_user_name_is_rejected_without_enqueueing() {
        let coordinator = coordinator(TestPersistence::new(Some(CategoryId(1))));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let conn = coordinator.connections.register(tx);

        coordinator.handle_matchmaking_join(conn, UserId(1), "bad name".to_string()).await;

        let reply = rx.recv().await.expect("an error reply should be sent");
        match reply {
            Outbound::Message(message) => match message.as_ref() {
                ServerMessage::Error { message } => assert_eq!(message, "User name cannot contain spaces"),
                other => panic!("unexpected message: {other:?}"),
            },
            other => panic!("unexpected outbound: {other:?}"),
        }
        assert!(coordinator.matchmaking.entries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn rejoining_while_already_queued_yields_an_error() {
        let coordinator = coordinator(TestPersistence::new(Some(CategoryId(1))));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let conn = coordinator.connections.register(tx);

        coordinator.handle_matchmaking_join(conn, UserId(1), "Ada".to_string()).await;
        let _ = rx.recv().await;
        coordinator.handle_matchmaking_join(conn, UserId(1), "Ada".to_string()).await;

        let reply = rx.recv().await.expect("an error reply should follow the duplicate join");
        match reply {
            Outbound::Message(message) => match message.as_ref() {
                ServerMessage::Error { message } => {
                    assert_eq!(message, "Already in matchmaking queue");
                }
                other => panic!("unexpected message: {other:?}"),
            },
            other => panic!("unexpected outbound: {other:?}"),
        }
        assert_eq!(coordinator.matchmaking.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn disconnecting_while_queued_removes_the_entry() {
        let coordinator = coordinator(TestPersistence::new(Some(CategoryId(1))));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let conn = coordinator.connections.register(tx);

        coordinator.handle_matchmaking_join(conn, UserId(1), "Ada".to_string()).await;
        let _ = rx.recv().await;
        assert_eq!(coordinator.matchmaking.entries.lock().await.len(), 1);

        coordinator.handle_disconnect(conn).await;

        assert!(coordinator.matchmaking.entries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn leaving_the_queue_sends_a_cancelled_status() {
        let coordinator = coordinator(TestPersistence::new(Some(CategoryId(1))));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let conn = coordinator.connections.register(tx);

        coordinator.handle_matchmaking_join(conn, UserId(1), "Ada".to_string()).await;
        let _ = rx.recv().await;
        coordinator.handle_matchmaking_leave(conn, UserId(1)).await;

        let cancelled = rx.recv().await.expect("cancelled status should be sent");
        match cancelled {
            Outbound::Message(message) => match message.as_ref() {
                ServerMessage::MatchmakingStatusMsg { status, .. } => {
                    assert_eq!(*status, MatchmakingStatus::Cancelled);
                }
                other => panic!("unexpected message: {other:?}"),
            },
            other => panic!("unexpected outbound: {other:?}"),
        }
        assert!(coordinator.matchmaking.entries.lock().await.is_empty());
    }
}
