//! # Adapters Layer

pub mod websocket;

pub use websocket::{handle_socket, upgrade, WebSocketSink};
