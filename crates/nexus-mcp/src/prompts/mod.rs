//! Prompt templates: rendering and external prompt sources.

pub mod render;
pub mod source;

pub use render::render;
pub use source::PromptSource;
