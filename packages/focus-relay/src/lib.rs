//! WebSocket to TCP relay for headset telemetry servers.
//!
//! Each accepted WebSocket is paired with its own TCP connection to the
//! telemetry server and bytes are forwarded unmodified in both directions.

pub mod bridge;
pub mod config;
pub mod error;
pub mod server;

pub use bridge::{run_pairing, ClosedBy, PairingSummary};
pub use config::{ConfigError, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use server::{handle_websocket, router, serve, RelayState};
