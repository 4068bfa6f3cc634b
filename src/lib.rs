//! # Silver9 WebSocket Supervisor
//!
//! A WebSocket client that keeps its connection alive: it dials with the auth token and
//! device type as query parameters, sends a `"ping"` heartbeat while connected and, when
//! configured to, re-dials the same endpoint at a fixed interval after an unexpected close.
//! Callers register handlers once and see state changes instead of connection churn.

mod websocket;
mod error;
pub mod protocol;

pub use websocket::*;
pub use error::{SupervisorResult, SupervisorError};
