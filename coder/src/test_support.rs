//! Test-only fakes for the store and model seams.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::error::ProjectError;
use crate::core::path::ProjectPath;
use crate::io::model::ModelClient;
use crate::io::store::{CommandResult, ProjectStore};

/// In-memory [`ProjectStore`] that records every mutating call.
#[derive(Debug)]
pub struct MemoryStore {
    root: PathBuf,
    files: RefCell<BTreeMap<String, String>>,
    dirs: RefCell<BTreeSet<String>>,
    commands: RefCell<VecDeque<CommandResult>>,
    failing_paths: BTreeSet<String>,
    calls: RefCell<Vec<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/memory/project"),
            files: RefCell::new(BTreeMap::new()),
            dirs: RefCell::new(BTreeSet::new()),
            commands: RefCell::new(VecDeque::new()),
            failing_paths: BTreeSet::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        self
    }

    /// Queue the result of the next `run_command` call.
    pub fn with_command_result(self, stdout: &str, stderr: &str, exit_code: i32) -> Self {
        self.commands.borrow_mut().push_back(CommandResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
            timed_out: false,
        });
        self
    }

    /// Make writes and mkdirs of `path` fail with a permission error.
    pub fn failing_on(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.borrow().contains(path)
    }

    /// Mutating calls in order, e.g. `write a.txt`, `mkdir src`, `run ls`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn check_failure(&self, op: &'static str, path: &ProjectPath) -> Result<(), ProjectError> {
        if self.failing_paths.contains(path.as_str()) {
            return Err(ProjectError::io(
                op,
                path.as_str(),
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        Ok(())
    }
}

impl ProjectStore for MemoryStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_files(&self) -> Result<Vec<String>, ProjectError> {
        Ok(self.files.borrow().keys().cloned().collect())
    }

    fn file_size(&self, path: &ProjectPath) -> Result<u64, ProjectError> {
        self.files
            .borrow()
            .get(path.as_str())
            .map(|c| c.len() as u64)
            .ok_or_else(|| ProjectError::NotFound(path.to_string()))
    }

    fn read_file(&self, path: &ProjectPath) -> Result<String, ProjectError> {
        self.files
            .borrow()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| ProjectError::NotFound(path.to_string()))
    }

    fn write_file(&self, path: &ProjectPath, content: &str) -> Result<(), ProjectError> {
        self.calls.borrow_mut().push(format!("write {path}"));
        self.check_failure("write", path)?;
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn make_dir(&self, path: &ProjectPath) -> Result<(), ProjectError> {
        self.calls.borrow_mut().push(format!("mkdir {path}"));
        self.check_failure("create directory", path)?;
        self.dirs.borrow_mut().insert(path.to_string());
        Ok(())
    }

    fn run_command(&self, command: &str) -> Result<CommandResult, ProjectError> {
        self.calls.borrow_mut().push(format!("run {command}"));
        Ok(self.commands.borrow_mut().pop_front().unwrap_or(CommandResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        }))
    }
}

/// Model client that replays fixed chunks and records prompts.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: RefCell<VecDeque<Vec<String>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    /// Each reply is a list of chunks streamed in order.
    pub fn new(replies: Vec<Vec<&str>>) -> Self {
        Self {
            replies: RefCell::new(
                replies
                    .into_iter()
                    .map(|chunks| chunks.into_iter().map(str::to_string).collect())
                    .collect(),
            ),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl ModelClient for ScriptedModel {
    fn stream(&self, prompt: &str, on_chunk: &mut dyn FnMut(&str) -> Result<()>) -> Result<()> {
        self.prompts.borrow_mut().push(prompt.to_string());
        let chunks = self
            .replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted model has no reply left"))?;
        for chunk in &chunks {
            on_chunk(chunk.as_str())?;
        }
        Ok(())
    }
}
