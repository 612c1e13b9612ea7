// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-connection split sender/receiver tasks
// - sending: message serialization and sending functions
// - routes: HTTP route setup (health, websocket upgrade)

mod connection;
mod handler;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use routes::{create_router, run_server};
