//! Prompt Templates
//!
//! Every LLM call the simulator makes is rendered from a named `minijinja`
//! template. Built-in templates ship with the crate; any of them can be
//! replaced at startup (see [`PromptLibrary::with_overrides`]).
//!
//! Variables are written `{{ name }}`. Rendering is strict: a template that
//! refers to a variable the caller did not supply fails instead of printing
//! an empty string.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

pub const GREETING: &str = "greeting";
pub const GENERATE_TASKS: &str = "generate_tasks";
pub const PROACTIVE_ACTION: &str = "proactive_action";
pub const RECOMMENDATION: &str = "recommendation";
pub const SIMULATE_USER_RESPONSE: &str = "simulate_user_response";

const BUILTIN_TEMPLATES: [(&str, &str); 5] = [
    (GREETING, include_str!("../prompts/greeting.md")),
    (GENERATE_TASKS, include_str!("../prompts/generate_tasks.md")),
    (PROACTIVE_ACTION, include_str!("../prompts/proactive_action.md")),
    (RECOMMENDATION, include_str!("../prompts/recommendation.md")),
    (
        SIMULATE_USER_RESPONSE,
        include_str!("../prompts/simulate_user_response.md"),
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Missing prompt template: '{0}'")]
    MissingTemplate(String),

    #[error("Invalid prompt template '{name}'")]
    Invalid {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to render prompt '{name}'")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// A keyed set of prompt templates.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        for (name, source) in BUILTIN_TEMPLATES {
            if let Err(e) = env.add_template(name, source) {
                error!(template = name, error = %e, "Built-in prompt failed to parse");
            }
        }
        Self { env }
    }
}

impl PromptLibrary {
    /// Replaces built-in templates with the given ones, keyed by template name.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Result<Self, PromptError> {
        for (name, source) in overrides {
            self.env
                .add_template_owned(name.clone(), source)
                .map_err(|source| PromptError::Invalid { name, source })?;
        }
        Ok(self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.env.get_template(key).is_ok()
    }

    /// Renders template `key` against `ctx`, usually built with
    /// [`minijinja::context!`]. Trailing whitespace is dropped.
    pub fn render<S: Serialize>(&self, key: &str, ctx: S) -> Result<String, PromptError> {
        let template = self
            .env
            .get_template(key)
            .map_err(|_| PromptError::MissingTemplate(key.to_string()))?;
        let rendered = template.render(ctx).map_err(|source| PromptError::Render {
            name: key.to_string(),
            source,
        })?;
        Ok(rendered.trim_end().to_string())
    }
}
