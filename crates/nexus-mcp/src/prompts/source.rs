//! Prompt supply from outside the engine.

use crate::types::{McpResult, Prompt};

/// Something that can hand the host a set of prompt templates, such as a
/// directory of template files or a configuration file.
pub trait PromptSource {
    /// Load every prompt this source provides.
    fn load_prompts(&self) -> McpResult<Vec<Prompt>>;
}

impl PromptSource for Vec<Prompt> {
    fn load_prompts(&self) -> McpResult<Vec<Prompt>> {
        Ok(self.clone())
    }
}
