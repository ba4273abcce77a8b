//! Prompt rendering for model requests.

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

const REQUEST_TEMPLATE: &str = include_str!("prompts/request.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("request", REQUEST_TEMPLATE)
            .expect("request template should be valid");
        Self { env }
    }

    /// Render the full prompt: directive protocol, user request, project digest.
    pub fn render_request(&self, request: &str, context: &str) -> Result<String> {
        let template = self.env.get_template("request")?;
        let rendered = template.render(context! {
            request => request.trim(),
            context => context.trim_end(),
        })?;
        debug!(bytes = rendered.len(), "rendered request prompt");
        Ok(rendered)
    }
}
