//! Assistant configuration stored under `~/.coder/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Assistant configuration (TOML).
///
/// Edited by humans; missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoderConfig {
    /// Directory holding one subdirectory per project. `~` expands to the home directory.
    pub workspace_path: PathBuf,

    /// Kill `CMD:` directives and `!exec` commands after this many seconds (0 = never).
    pub command_timeout_secs: u64,

    /// Keep at most this many bytes of each command's stdout/stderr.
    pub command_output_limit_bytes: usize,

    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Program and arguments that read a prompt on stdin and stream the reply on stdout.
    pub command: Vec<String>,
    /// Model identifier, exported to the command as `CODER_MODEL`.
    pub name: String,
    /// Sampling temperature, exported as `CODER_TEMPERATURE`.
    pub temperature: f64,
    /// Exported as `GEMINI_API_KEY` when set.
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string()],
            name: "gemini-2.5-pro-preview-03-25".to_string(),
            temperature: 0.7,
            api_key: None,
        }
    }
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            workspace_path: PathBuf::from("~/coder_workspace"),
            command_timeout_secs: 0,
            command_output_limit_bytes: 1_000_000,
            model: ModelConfig::default(),
        }
    }
}

impl CoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_output_limit_bytes == 0 {
            return Err(anyhow!("command_output_limit_bytes must be > 0"));
        }
        if self.model.command.is_empty() || self.model.command[0].trim().is_empty() {
            return Err(anyhow!("model.command must be a non-empty array"));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(anyhow!("model.temperature must be within 0.0..=2.0"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }

    /// Workspace path with a leading `~` replaced by the home directory.
    pub fn workspace_dir(&self) -> PathBuf {
        expand_home(&self.workspace_path)
    }
}

/// Default config location: `~/.coder/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".coder").join("config.toml"))
}

/// Load config from a TOML file.
///
/// If the file is missing, writes `CoderConfig::default()` there and returns it.
pub fn load_or_init_config(path: &Path) -> Result<CoderConfig> {
    if !path.exists() {
        let cfg = CoderConfig::default();
        write_config(path, &cfg)?;
        info!(path = %path.display(), "created default config");
        return Ok(cfg);
    }
    load_config(path)
}

/// Load and validate an existing config file.
pub fn load_config(path: &Path) -> Result<CoderConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CoderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CoderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
