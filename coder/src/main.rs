//! Terminal coding assistant.
//!
//! Sends coding requests plus a digest of the selected project to a model
//! and applies the `FILE:`, `DIR:` and `CMD:` directives in its reply.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use coder::context::session_digest;
use coder::exit_codes;
use coder::interpret::{RecordingReporter, TerminalReporter, interpret_in_session};
use coder::io::config::{CoderConfig, default_config_path, load_or_init_config};
use coder::io::model::CommandModel;
use coder::logging;
use coder::project::Session;
use coder::repl::Repl;

#[derive(Parser)]
#[command(
    name = "coder",
    version,
    about = "Terminal coding assistant that applies FILE/DIR/CMD directives from model replies"
)]
struct Cli {
    /// Config file (default `~/.coder/config.toml`, created with defaults if missing).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key handed to the model command; overrides the config file.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Project to select on startup (created under the workspace if missing).
    #[arg(short, long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive loop (the default).
    Repl,
    /// Interpret a saved model reply into the selected project.
    Apply {
        /// Reply text file, or `-` for stdin.
        file: PathBuf,
        /// Print the outcome report as JSON instead of terminal lines.
        #[arg(long)]
        json: bool,
    },
    /// Print the context digest that would accompany a request.
    Context,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut cfg = load_or_init_config(&config_path)?;
    if let Some(key) = cli.api_key {
        cfg.model.api_key = Some(key);
    }

    let mut session = Session::new(cfg.workspace_dir())
        .with_command_limits(cfg.command_timeout(), cfg.command_output_limit_bytes);
    if let Some(name) = &cli.project {
        session
            .open_project(name)
            .with_context(|| format!("open project {name}"))?;
    }

    match cli.command.unwrap_or(Command::Repl) {
        Command::Repl => cmd_repl(session, cfg),
        Command::Apply { file, json } => cmd_apply(session, &file, json),
        Command::Context => cmd_context(session),
    }
}

fn cmd_repl(session: Session, cfg: CoderConfig) -> Result<i32> {
    let mut repl = Repl::new(session, CommandModel::new(cfg.model));
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl.run(stdin.lock(), &mut stdout)?;
    Ok(exit_codes::OK)
}

fn cmd_apply(mut session: Session, file: &Path, json: bool) -> Result<i32> {
    let text = read_reply(file)?;
    let report = if json {
        let mut reporter = RecordingReporter::default();
        let report = interpret_in_session(&mut session, &text, &mut reporter)?;
        let mut payload = serde_json::to_string_pretty(&report).context("serialize report")?;
        payload.push('\n');
        io::stdout()
            .write_all(payload.as_bytes())
            .context("write report")?;
        report
    } else {
        let mut reporter = TerminalReporter::new(io::stdout().lock());
        interpret_in_session(&mut session, &text, &mut reporter)?
    };

    if report.failures() > 0 {
        return Ok(exit_codes::DIRECTIVE_FAILURES);
    }
    Ok(exit_codes::OK)
}

fn cmd_context(mut session: Session) -> Result<i32> {
    let digest = session_digest(&mut session)?;
    println!("{digest}");
    Ok(exit_codes::OK)
}

fn read_reply(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("read reply from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).with_context(|| format!("read {}", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_command_is_repl() {
        let cli = Cli::parse_from(["coder"]);
        assert!(cli.command.is_none());
        assert!(cli.project.is_none());
    }

    #[test]
    fn parse_apply_with_global_flags() {
        let cli = Cli::parse_from(["coder", "apply", "reply.txt", "--json", "-p", "demo"]);
        assert_eq!(cli.project.as_deref(), Some("demo"));
        match cli.command {
            Some(Command::Apply { file, json }) => {
                assert_eq!(file, PathBuf::from("reply.txt"));
                assert!(json);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn parse_api_key_and_config() {
        let cli = Cli::parse_from(["coder", "--api-key", "k", "--config", "/tmp/c.toml", "context"]);
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Some(Command::Context)));
    }
}
