//! Protocol layer: message dispatch, argument validation, and handshake state.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::{HandlerOptions, ProtocolHandler, DEFAULT_REQUEST_TIMEOUT};
pub use negotiation::{ConnectionId, ConnectionPhase, ConnectionState};
