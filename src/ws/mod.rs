//! Reconnecting WebSocket client
//!
//! Generic building block for push-based venue streams

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage};
