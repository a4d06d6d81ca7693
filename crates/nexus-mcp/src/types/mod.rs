//! All MCP data types used by the engine.

pub mod capabilities;
pub mod definitions;
pub mod error;
pub mod message;
pub mod method;
pub mod request;
pub mod response;

// Re-export commonly used types for convenience.
pub use capabilities::*;
pub use definitions::*;
pub use error::*;
pub use message::*;
pub use method::*;
pub use request::*;
pub use response::*;
