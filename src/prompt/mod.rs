//! Prompt System - Role templates, overrides and rendering
//!
//! Each role has a built-in Handlebars template. A `prompts_dir` containing
//! `builder.md`, `verifier.md` or `refactorer.md` replaces the matching one.

mod loader;
mod render;
pub mod templates;

use std::path::Path;

use serde::Serialize;

pub use loader::PromptLoader;
pub use render::PromptRenderer;

use crate::error::Result;
use crate::loops::Role;
use crate::state::CoordinationState;

#[derive(Serialize)]
struct PromptContext<'a> {
    role: &'a str,
    tag: &'a str,
    goal: &'a str,
    state: String,
}

/// The three role templates plus the goal they all work toward
pub struct RolePrompts {
    renderer: PromptRenderer,
    goal: String,
}

impl RolePrompts {
    /// Built-in templates only
    pub fn new(goal: impl Into<String>) -> Result<Self> {
        let mut renderer = PromptRenderer::new();
        for role in Role::ALL {
            renderer.register_template(role.name(), builtin_template(role))?;
        }
        Ok(Self {
            renderer,
            goal: goal.into(),
        })
    }

    /// Built-in templates, replaced by any `<role>.md` found in `overrides`
    pub fn with_overrides(goal: impl Into<String>, overrides: Option<&Path>) -> Result<Self> {
        let mut prompts = Self::new(goal)?;
        let Some(dir) = overrides else {
            return Ok(prompts);
        };

        let loader = PromptLoader::new(dir);
        for role in Role::ALL {
            if let Some(template) = loader.load(role)? {
                prompts.renderer.register_template(role.name(), &template)?;
                log::info!("Using {} prompt from {}", role, loader.path_for(role).display());
            }
        }
        Ok(prompts)
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Render `role`'s prompt with the current snapshot embedded
    pub fn render(&self, role: Role, state: &CoordinationState) -> Result<String> {
        let context = PromptContext {
            role: role.title(),
            tag: role.tag(),
            goal: &self.goal,
            state: serde_json::to_string_pretty(state)?,
        };
        self.renderer.render_named(role.name(), &context)
    }
}

fn builtin_template(role: Role) -> &'static str {
    match role {
        Role::Builder => templates::BUILDER_TEMPLATE,
        Role::Verifier => templates::VERIFIER_TEMPLATE,
        Role::Refactorer => templates::REFACTORER_TEMPLATE,
    }
}
