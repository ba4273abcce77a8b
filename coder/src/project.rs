//! Session state: the selected project and its file cache.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::core::error::ProjectError;
use crate::core::path::{ProjectPath, validate_project_name};
use crate::io::store::{FsProjectStore, ProjectStore};

/// Contents of files read during this session, keyed by project-relative path.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: BTreeMap<String, String>,
}

impl FileCache {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: &str, content: String) {
        self.entries.insert(path.to_string(), content);
    }

    /// Drop a cached entry. Returns whether one existed.
    pub fn invalidate(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One named project: its store plus the session cache.
#[derive(Debug)]
pub struct Project<S> {
    name: String,
    store: S,
    cache: FileCache,
}

impl<S: ProjectStore> Project<S> {
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self {
            name: name.into(),
            store,
            cache: FileCache::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut FileCache {
        &mut self.cache
    }

    pub fn list_files(&self) -> Result<Vec<String>, ProjectError> {
        self.store.list_files()
    }

    /// Read through the cache, populating it on a miss.
    pub fn read_file(&mut self, raw_path: &str) -> Result<String, ProjectError> {
        let path = ProjectPath::parse(raw_path)?;
        if let Some(content) = self.cache.get(path.as_str()) {
            debug!(path = %path, "cache hit");
            return Ok(content.to_string());
        }
        let content = self.store.read_file(&path)?;
        self.cache.insert(path.as_str(), content.clone());
        Ok(content)
    }
}

/// The running session: workspace location and the optional active project.
#[derive(Debug)]
pub struct Session {
    workspace: PathBuf,
    command_timeout: Option<Duration>,
    output_limit_bytes: usize,
    project: Option<Project<FsProjectStore>>,
}

impl Session {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            command_timeout: None,
            output_limit_bytes: 1_000_000,
            project: None,
        }
    }

    pub fn with_command_limits(mut self, timeout: Option<Duration>, output_limit_bytes: usize) -> Self {
        self.command_timeout = timeout;
        self.output_limit_bytes = output_limit_bytes;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Select (creating if needed) `workspace/<name>`. The file cache starts empty.
    pub fn open_project(&mut self, name: &str) -> Result<&mut Project<FsProjectStore>, ProjectError> {
        let name = validate_project_name(name)?;
        let root = self.workspace.join(name);
        fs::create_dir_all(&root)
            .map_err(|err| ProjectError::io("create project", root.display().to_string(), err))?;
        info!(project = name, root = %root.display(), "project selected");

        let store = FsProjectStore::new(root)
            .with_command_timeout(self.command_timeout)
            .with_output_limit(self.output_limit_bytes);
        Ok(self.project.insert(Project::new(name, store)))
    }

    pub fn project(&self) -> Option<&Project<FsProjectStore>> {
        self.project.as_ref()
    }

    /// The active project, or [`ProjectError::NoActiveProject`].
    pub fn active(&mut self) -> Result<&mut Project<FsProjectStore>, ProjectError> {
        self.project.as_mut().ok_or(ProjectError::NoActiveProject)
    }
}
