//! Interactive command loop.
//!
//! Lines starting with `!` are local commands; everything else is sent to
//! the model together with the project digest, and the streamed reply is
//! interpreted as it arrives.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::context::assemble;
use crate::core::command::{HELP, ReplCommand, parse_command};
use crate::interpret::{InterpretReport, ResponseStream, TerminalReporter};
use crate::io::model::ModelClient;
use crate::io::prompt::PromptEngine;
use crate::io::store::ProjectStore;
use crate::project::Session;

/// Whether the loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Repl<M> {
    session: Session,
    model: M,
    prompts: PromptEngine,
}

impl<M: ModelClient> Repl<M> {
    pub fn new(session: Session, model: M) -> Self {
        Self {
            session,
            model,
            prompts: PromptEngine::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read commands until `exit` or end of input. Errors are printed, not returned.
    pub fn run(&mut self, input: impl BufRead, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "🤖 Coding assistant ready")?;
        writeln!(out, "Type !help for available commands")?;

        let mut lines = input.lines();
        loop {
            write!(out, "\n> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            let line = line.context("read input")?;
            match self.handle(&line, out) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => writeln!(out, "Error: {err:#}")?,
            }
        }
        Ok(())
    }

    /// Execute one line of input.
    pub fn handle(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let command = parse_command(line);
        debug!(command = ?command, "handling input");
        match command {
            ReplCommand::Exit => {
                writeln!(out, "Goodbye!")?;
                return Ok(Flow::Exit);
            }
            ReplCommand::Blank => {}
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Usage(usage) => writeln!(out, "Usage: {usage}")?,
            ReplCommand::Unknown(name) => writeln!(
                out,
                "Unknown command: {name}. Type !help for available commands."
            )?,
            ReplCommand::Project(name) => {
                let project = self.session.open_project(&name)?;
                writeln!(out, "Project set: {}", project.name())?;
                writeln!(out, "Path: {}", project.root().display())?;
            }
            ReplCommand::List => {
                let files = self.session.active()?.list_files()?;
                if files.is_empty() {
                    writeln!(out, "No files in project.")?;
                } else {
                    writeln!(out, "Project files:")?;
                    for file in &files {
                        writeln!(out, "- {file}")?;
                    }
                }
            }
            ReplCommand::Cat(path) => {
                let content = self.session.active()?.read_file(&path)?;
                writeln!(out, "Content of {path}:")?;
                writeln!(out, "{content}")?;
            }
            ReplCommand::Exec(command) => {
                let result = self.session.active()?.store().run_command(&command)?;
                if result.success() {
                    writeln!(out, "Command executed successfully: {command}")?;
                    if !result.stdout.is_empty() {
                        write!(out, "{}", result.stdout)?;
                    }
                } else {
                    writeln!(
                        out,
                        "Command failed with code {}: {command}",
                        result.exit_code
                    )?;
                    if !result.stderr.is_empty() {
                        write!(out, "{}", result.stderr)?;
                    }
                }
            }
            ReplCommand::Prompt(request) => {
                let report = self.query(&request, out)?;
                if !report.outcomes.is_empty() {
                    writeln!(
                        out,
                        "\n{} action(s) applied, {} failed",
                        report.outcomes.len() - report.failures(),
                        report.failures()
                    )?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Send `request` with the project digest and interpret the streamed reply.
    #[instrument(skip_all)]
    fn query(&mut self, request: &str, out: &mut dyn Write) -> Result<InterpretReport> {
        let project = self.session.active()?;
        let digest = assemble(project).context("assemble project context")?;
        let prompt = self.prompts.render_request(request, &digest.render())?;

        writeln!(out, "Thinking...\n")?;
        let mut reporter = TerminalReporter::new(&mut *out);
        let mut stream = ResponseStream::new(project, &mut reporter);
        self.model
            .stream(&prompt, &mut |chunk: &str| {
                stream.push(chunk);
                Ok(())
            })
            .context("query model")?;
        Ok(stream.finish())
    }
}
