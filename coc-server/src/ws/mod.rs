//! Hand-rolled RFC 6455 WebSocket support: handshake, frame codec, and the
//! client hub. No `axum::extract::ws` — the codec is small enough to write
//! directly, per the brief this module satisfies.

pub mod frame;
pub mod handshake;
pub mod hub;
pub mod messages;

pub use hub::WsHub;
pub use messages::ServerMessage;
