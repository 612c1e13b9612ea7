#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Race Coordinator
//!
//! A lightweight, in-memory WebSocket coordinator for realtime multiplayer
//! typing races: room lifecycle, countdown synchronization, per-keystroke
//! progress broadcast, finish ranking, spectators, lobby notifications, and
//! skill-based matchmaking.
//!
//! No external database is required for the default deployment — the
//! persistence port has an in-memory implementation out of the box.

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// Persistence and match-factory port
pub mod persistence;

/// WebSocket message protocol definitions
pub mod protocol;

/// Main server orchestration: rooms, lobby, matchmaking, connections
pub mod server;

/// WebSocket connection handling
pub mod websocket;
