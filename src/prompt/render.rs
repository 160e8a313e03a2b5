//! Prompt Renderer - Handlebars registry holding one template per role

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, TriloopError};

/// Named Handlebars templates rendered without HTML escaping
pub struct PromptRenderer {
    registry: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        // Unknown variables render empty so overrides may omit fields
        registry.set_strict_mode(false);
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Compile `template` under `name`, replacing any earlier one
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.registry
            .register_template_string(name, template)
            .map_err(|e| TriloopError::Prompt(format!("template '{}' does not compile: {}", name, e)))
    }

    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.registry
            .render(name, context)
            .map_err(|e| TriloopError::Prompt(format!("template '{}' failed to render: {}", name, e)))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}
