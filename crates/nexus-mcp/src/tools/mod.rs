//! Tool execution: binding registered tool names to executable handlers.

pub mod executor;

pub use executor::{RequestContext, ToolExecutor, ToolHandler};
