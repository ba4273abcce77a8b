//! Model backends that stream a reply for a rendered prompt.
//!
//! The [`ModelClient`] trait decouples the interactive loop from the actual
//! provider. The shipped backend pipes the prompt into an external command
//! (any LLM CLI that reads stdin and streams to stdout); tests use scripted
//! clients that replay predetermined chunks.

use anyhow::{Result, anyhow};
use tracing::{info, instrument};

use crate::io::config::ModelConfig;
use crate::io::process::run_command_streaming;

/// Abstraction over model backends.
pub trait ModelClient {
    /// Send `prompt` and hand every text fragment of the reply to `on_chunk`, in order.
    fn stream(&self, prompt: &str, on_chunk: &mut dyn FnMut(&str) -> Result<()>) -> Result<()>;
}

/// Client that runs a configured command per request.
#[derive(Debug, Clone)]
pub struct CommandModel {
    config: ModelConfig,
    stderr_limit_bytes: usize,
}

impl CommandModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            stderr_limit_bytes: 64 * 1024,
        }
    }
}

impl ModelClient for CommandModel {
    #[instrument(skip_all, fields(model = %self.config.name, prompt_bytes = prompt.len()))]
    fn stream(&self, prompt: &str, on_chunk: &mut dyn FnMut(&str) -> Result<()>) -> Result<()> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("model.command is empty"))?;
        info!(program = %program, "querying model");

        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .env("CODER_MODEL", &self.config.name)
            .env("CODER_TEMPERATURE", self.config.temperature.to_string());
        if let Some(key) = &self.config.api_key {
            cmd.env("GEMINI_API_KEY", key);
        }

        let output = run_command_streaming(
            cmd,
            prompt.as_bytes().to_vec(),
            self.stderr_limit_bytes,
            on_chunk,
        )?;
        if !output.status.success() {
            return Err(anyhow!(
                "model command exited with {}: {}",
                output.exit_code(),
                output.stderr_text().trim()
            ));
        }
        Ok(())
    }
}
