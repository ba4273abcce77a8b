//! Applying parsed directives to a project.
//!
//! [`crate::core::parser`] decides *what* a response asks for; this module
//! carries it out against a [`ProjectStore`] and reports each result. A
//! failing directive is reported and skipped, it never stops the pass.

use std::fmt;
use std::io::Write;
use std::mem;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::directive::{Directive, Event};
use crate::core::error::ProjectError;
use crate::core::parser::{self, LineBuffer, ParseState, parse_response};
use crate::core::path::ProjectPath;
use crate::core::preview::preview;
use crate::io::store::ProjectStore;
use crate::project::{Project, Session};

/// Result of applying one directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    FileWritten {
        path: String,
        bytes: usize,
    },
    DirCreated {
        path: String,
    },
    CommandSucceeded {
        command: String,
        stdout: String,
    },
    /// Non-zero exit or timeout.
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
    /// Path escaped the project root; nothing was touched.
    Rejected {
        directive: &'static str,
        target: String,
        reason: String,
    },
    /// The store reported an I/O or spawn error.
    Failed {
        directive: &'static str,
        target: String,
        error: String,
    },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::CommandFailed { .. } | Outcome::Rejected { .. } | Outcome::Failed { .. }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::FileWritten { path, .. } => write!(f, "✅ Created/Updated file: {path}"),
            Outcome::DirCreated { path } => write!(f, "✅ Created directory: {path}"),
            Outcome::CommandSucceeded { command, stdout } => {
                write!(f, "✅ Executed command: {command}")?;
                if !stdout.is_empty() {
                    write!(f, "\nOutput: {}", preview(stdout))?;
                }
                Ok(())
            }
            Outcome::CommandFailed {
                command,
                exit_code,
                stderr,
            } => {
                write!(f, "❌ Command failed ({exit_code}): {command}")?;
                if !stderr.is_empty() {
                    write!(f, "\nError: {}", preview(stderr))?;
                }
                Ok(())
            }
            Outcome::Rejected {
                directive,
                target,
                reason,
            } => write!(f, "⚠️ Skipped {directive} {target}: {reason}"),
            Outcome::Failed {
                directive,
                target,
                error,
            } => write!(f, "❌ Failed {directive} {target}: {error}"),
        }
    }
}

/// Everything one interpretation pass did, in response order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterpretReport {
    pub outcomes: Vec<Outcome>,
    pub narration_lines: usize,
}

impl InterpretReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Receives narration and outcomes as soon as they are known.
pub trait Reporter {
    fn narration(&mut self, line: &str);
    fn outcome(&mut self, outcome: &Outcome);
}

/// Prints narration verbatim and one summary line per outcome.
pub struct TerminalReporter<W: Write> {
    out: W,
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TerminalReporter<W> {
    fn narration(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!(err = %err, "failed to print narration");
        }
    }

    fn outcome(&mut self, outcome: &Outcome) {
        if let Err(err) = writeln!(self.out, "{outcome}") {
            warn!(err = %err, "failed to print outcome");
        }
    }
}

/// Keeps narration and outcomes in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub narration: Vec<String>,
    pub outcomes: Vec<Outcome>,
}

impl Reporter for RecordingReporter {
    fn narration(&mut self, line: &str) {
        self.narration.push(line.to_string());
    }

    fn outcome(&mut self, outcome: &Outcome) {
        self.outcomes.push(outcome.clone());
    }
}

/// Apply one directive. Path checks happen before any store call.
pub fn apply_directive<S: ProjectStore>(project: &mut Project<S>, directive: Directive) -> Outcome {
    let kind = directive.kind();
    let outcome = match directive {
        Directive::WriteFile { path, content } => match ProjectPath::parse(&path) {
            Err(err) => rejected(kind, path, err),
            Ok(rel) => match project.store().write_file(&rel, &content) {
                Ok(()) => {
                    let bytes = content.len();
                    let cache = project.cache_mut();
                    cache.invalidate(rel.as_str());
                    cache.insert(rel.as_str(), content);
                    Outcome::FileWritten {
                        path: rel.to_string(),
                        bytes,
                    }
                }
                Err(err) => failed(kind, path, err),
            },
        },
        Directive::MakeDir { path } => match ProjectPath::parse(&path) {
            Err(err) => rejected(kind, path, err),
            Ok(rel) => match project.store().make_dir(&rel) {
                Ok(()) => Outcome::DirCreated {
                    path: rel.to_string(),
                },
                Err(err) => failed(kind, path, err),
            },
        },
        Directive::RunCommand { command } => match project.store().run_command(&command) {
            Ok(result) if result.success() => Outcome::CommandSucceeded {
                command,
                stdout: result.stdout,
            },
            Ok(result) => Outcome::CommandFailed {
                command,
                exit_code: result.exit_code,
                stderr: result.stderr,
            },
            Err(err) => failed(kind, command, err),
        },
    };

    if outcome.is_failure() {
        warn!(directive = kind, outcome = ?outcome, "directive did not succeed");
    } else {
        info!(directive = kind, "directive applied");
    }
    outcome
}

fn rejected(directive: &'static str, target: String, err: ProjectError) -> Outcome {
    Outcome::Rejected {
        directive,
        target,
        reason: err.to_string(),
    }
}

fn failed(directive: &'static str, target: String, err: ProjectError) -> Outcome {
    Outcome::Failed {
        directive,
        target,
        error: err.to_string(),
    }
}

/// Routes parser events to the store and the reporter.
struct Applier<'a, S> {
    project: &'a mut Project<S>,
    reporter: &'a mut dyn Reporter,
    report: InterpretReport,
}

impl<S: ProjectStore> Applier<'_, S> {
    fn handle(&mut self, event: Event) {
        match event {
            Event::Narration(line) => {
                self.report.narration_lines += 1;
                self.reporter.narration(&line);
            }
            Event::Directive(directive) => {
                let outcome = apply_directive(self.project, directive);
                self.reporter.outcome(&outcome);
                self.report.outcomes.push(outcome);
            }
        }
    }
}

/// Parse a complete response, then apply its directives in order.
#[instrument(skip_all, fields(project = project.name(), bytes = text.len()))]
pub fn interpret_response<S: ProjectStore>(
    project: &mut Project<S>,
    text: &str,
    reporter: &mut dyn Reporter,
) -> InterpretReport {
    let events = parse_response(text);
    debug!(events = events.len(), "parsed response");
    let mut applier = Applier {
        project,
        reporter,
        report: InterpretReport::default(),
    };
    for event in events {
        applier.handle(event);
    }
    applier.report
}

/// [`interpret_response`] against the session's active project.
///
/// Fails with [`ProjectError::NoActiveProject`] before any side effect.
pub fn interpret_in_session(
    session: &mut Session,
    text: &str,
    reporter: &mut dyn Reporter,
) -> Result<InterpretReport, ProjectError> {
    let project = session.active()?;
    Ok(interpret_response(project, text, reporter))
}

/// Incremental interpreter for a response arriving in chunks.
///
/// Lines are classified only once their terminator arrives, and a file is
/// written only after its body is closed by the next marker or by
/// [`ResponseStream::finish`]. Dropping the stream without finishing
/// discards a pending file.
pub struct ResponseStream<'a, S> {
    applier: Applier<'a, S>,
    lines: LineBuffer,
    state: ParseState,
}

impl<'a, S: ProjectStore> ResponseStream<'a, S> {
    pub fn new(project: &'a mut Project<S>, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            applier: Applier {
                project,
                reporter,
                report: InterpretReport::default(),
            },
            lines: LineBuffer::default(),
            state: ParseState::Idle,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        for line in self.lines.push(chunk) {
            self.feed(&line);
        }
    }

    pub fn finish(mut self) -> InterpretReport {
        if let Some(line) = self.lines.finish() {
            self.feed(&line);
        }
        if let Some(event) = parser::finish(mem::take(&mut self.state)) {
            self.applier.handle(event);
        }
        self.applier.report
    }

    fn feed(&mut self, line: &str) {
        let transition = parser::step(mem::take(&mut self.state), line);
        self.state = transition.state;
        for event in transition.events {
            self.applier.handle(event);
        }
    }
}
