//! Project digest sent along with each model request.
//!
//! The digest lists every file in the project, then the content of a bounded
//! selection of files (see [`crate::core::selection`]). Output depends only
//! on the file tree and the session cache, never on walk order.

use tracing::{debug, instrument, warn};

use crate::core::error::ProjectError;
use crate::core::path::ProjectPath;
use crate::core::selection::select_files;
use crate::io::store::ProjectStore;
use crate::project::{Project, Session};

/// Digest used when no project is selected.
pub const NO_ACTIVE_PROJECT: &str = "No active project.";

/// One selected file; `content` is `None` when it was empty or unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub path: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDigest {
    pub project: String,
    /// Every file in the tree, sorted, unfiltered.
    pub listing: Vec<String>,
    pub entries: Vec<DigestEntry>,
}

impl ContextDigest {
    pub fn render(&self) -> String {
        let mut out = format!("Current project: {}\n\n", self.project);
        if self.listing.is_empty() {
            out.push_str("Project is empty.\n");
        } else {
            out.push_str("Project files:\n");
            for path in &self.listing {
                out.push_str(&format!("- {path}\n"));
            }
        }
        for entry in &self.entries {
            if let Some(content) = &entry.content {
                out.push_str(&format!("\nContent of {}:\n```\n{}\n```\n", entry.path, content));
            }
        }
        out
    }
}

/// Build the digest for `project`, reading selected files through its cache.
#[instrument(skip_all, fields(project = project.name()))]
pub fn assemble<S: ProjectStore>(project: &mut Project<S>) -> Result<ContextDigest, ProjectError> {
    let listing = project.list_files()?;
    let selected = select_files(&listing, |raw| {
        let path = ProjectPath::parse(raw).ok()?;
        project.store().file_size(&path).ok()
    });
    debug!(files = listing.len(), selected = selected.len(), "selected context files");

    let mut entries = Vec::with_capacity(selected.len());
    for path in selected {
        let content = match project.read_file(&path) {
            Ok(content) if !content.is_empty() => Some(content),
            Ok(_) => None,
            Err(err) => {
                warn!(path = %path, err = %err, "skipping unreadable context file");
                None
            }
        };
        entries.push(DigestEntry { path, content });
    }

    Ok(ContextDigest {
        project: project.name().to_string(),
        listing,
        entries,
    })
}

/// Rendered digest for the session, or [`NO_ACTIVE_PROJECT`].
pub fn session_digest(session: &mut Session) -> Result<String, ProjectError> {
    match session.active() {
        Ok(project) => Ok(assemble(project)?.render()),
        Err(ProjectError::NoActiveProject) => Ok(NO_ACTIVE_PROJECT.to_string()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    #[test]
    fn renders_listing_and_fenced_contents() {
        let store = MemoryStore::new()
            .with_file("README.md", "# Demo")
            .with_file("src/app.py", "print('hi')")
            .with_file("logo.png", "\u{89}PNG");
        let mut project = Project::new("demo", store);

        let digest = assemble(&mut project).expect("assemble");
        assert_eq!(
            digest.render(),
            "Current project: demo\n\n\
             Project files:\n- README.md\n- logo.png\n- src/app.py\n\
             \nContent of README.md:\n```\n# Demo\n```\n\
             \nContent of src/app.py:\n```\nprint('hi')\n```\n"
        );
    }

    #[test]
    fn empty_project_says_so() {
        let mut project = Project::new("blank", MemoryStore::new());
        let rendered = assemble(&mut project).expect("assemble").render();
        assert_eq!(rendered, "Current project: blank\n\nProject is empty.\n");
    }

    #[test]
    fn empty_files_are_listed_but_not_shown() {
        let store = MemoryStore::new().with_file("empty.txt", "");
        let mut project = Project::new("demo", store);
        let digest = assemble(&mut project).expect("assemble");
        assert_eq!(digest.entries[0].content, None);
        assert!(!digest.render().contains("Content of empty.txt"));
    }

    #[test]
    fn contents_come_from_cache_when_present() {
        let store = MemoryStore::new().with_file("notes.txt", "disk");
        let mut project = Project::new("demo", store);
        project.cache_mut().insert("notes.txt", "cached".to_string());

        let digest = assemble(&mut project).expect("assemble");
        assert_eq!(digest.entries[0].content.as_deref(), Some("cached"));
    }

    #[test]
    fn no_project_yields_sentinel() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = Session::new(temp.path());
        assert_eq!(session_digest(&mut session).expect("digest"), NO_ACTIVE_PROJECT);
    }
}
