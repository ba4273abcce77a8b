//! Filesystem and process capability scoped to one project root.
//!
//! The [`ProjectStore`] trait is the only way the interpreter and the context
//! assembler touch the outside world. Tests substitute an in-memory store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::core::error::ProjectError;
use crate::core::path::ProjectPath;
use crate::io::process::{run_command, shell_command};

/// Text result of a shell command run in the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Side-effecting operations on one project tree.
pub trait ProjectStore {
    fn root(&self) -> &Path;

    /// Every file under the root, `/`-separated and sorted.
    fn list_files(&self) -> Result<Vec<String>, ProjectError>;

    fn file_size(&self, path: &ProjectPath) -> Result<u64, ProjectError>;

    /// Read a file as text, replacing invalid UTF-8.
    fn read_file(&self, path: &ProjectPath) -> Result<String, ProjectError>;

    /// Create missing parent directories, then overwrite the file.
    fn write_file(&self, path: &ProjectPath, content: &str) -> Result<(), ProjectError>;

    /// Create the directory and its parents; existing directories are fine.
    fn make_dir(&self, path: &ProjectPath) -> Result<(), ProjectError>;

    /// Run a shell command line with the root as working directory.
    fn run_command(&self, command: &str) -> Result<CommandResult, ProjectError>;
}

/// [`ProjectStore`] backed by the real filesystem.
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    root: PathBuf,
    command_timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl FsProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            command_timeout: None,
            output_limit_bytes: 1_000_000,
        }
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit_bytes = bytes;
        self
    }
}

impl ProjectStore for FsProjectStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_files(&self) -> Result<Vec<String>, ProjectError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|err| {
                ProjectError::io("list", self.root.display().to_string(), io::Error::from(err))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(segments.join("/"));
        }
        files.sort();
        debug!(root = %self.root.display(), count = files.len(), "listed project files");
        Ok(files)
    }

    fn file_size(&self, path: &ProjectPath) -> Result<u64, ProjectError> {
        let full = path.to_path(&self.root);
        let meta = fs::metadata(&full).map_err(|err| map_io("stat", path, err))?;
        Ok(meta.len())
    }

    fn read_file(&self, path: &ProjectPath) -> Result<String, ProjectError> {
        let full = path.to_path(&self.root);
        let bytes = fs::read(&full).map_err(|err| map_io("read", path, err))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write_file(&self, path: &ProjectPath, content: &str) -> Result<(), ProjectError> {
        let full = path.to_path(&self.root);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|err| map_io("create parent of", path, err))?;
        }
        fs::write(&full, content).map_err(|err| map_io("write", path, err))?;
        debug!(path = %path, bytes = content.len(), "wrote file");
        Ok(())
    }

    fn make_dir(&self, path: &ProjectPath) -> Result<(), ProjectError> {
        let full = path.to_path(&self.root);
        fs::create_dir_all(&full).map_err(|err| map_io("create directory", path, err))
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn run_command(&self, command: &str) -> Result<CommandResult, ProjectError> {
        let mut cmd = shell_command(command);
        cmd.current_dir(&self.root);
        let output =
            run_command(cmd, self.command_timeout, self.output_limit_bytes).map_err(|err| {
                ProjectError::Command {
                    command: command.to_string(),
                    message: format!("{err:#}"),
                }
            })?;

        let mut stderr = output.stderr_text();
        stderr.push_str(&output.stderr_truncated_notice());
        if output.timed_out {
            let secs = self.command_timeout.map_or(0, |t| t.as_secs());
            stderr.push_str(&format!("\n[command timed out after {secs}s]\n"));
        }
        Ok(CommandResult {
            stdout: output.stdout_text(),
            stderr,
            exit_code: output.exit_code(),
            timed_out: output.timed_out,
        })
    }
}

fn map_io(op: &'static str, path: &ProjectPath, err: io::Error) -> ProjectError {
    if err.kind() == io::ErrorKind::NotFound && matches!(op, "read" | "stat") {
        return ProjectError::NotFound(path.to_string());
    }
    ProjectError::io(op, path.as_str(), err)
}
