//! Deterministic choice of which project files are shown to the model.

/// Filenames always considered first, in priority order. They bypass the size filter.
pub const WELL_KNOWN_FILES: [&str; 9] = [
    "package.json",
    "requirements.txt",
    "setup.py",
    "README.md",
    ".gitignore",
    "app.py",
    "main.py",
    "index.js",
    "index.html",
];

/// Extensions (lowercase, without dot) eligible in the second pass.
pub const TEXT_EXTENSIONS: [&str; 9] = ["json", "py", "js", "html", "css", "md", "txt", "yaml", "yml"];

/// Files at or above this size are skipped in the second pass.
pub const MAX_FILE_BYTES: u64 = 10_000;

/// Upper bound on files whose content is included.
pub const MAX_FILES: usize = 10;

/// Pick files to include from a sorted listing.
///
/// `size_of` returns the on-disk size of a path, or `None` when unknown;
/// unknown sizes are excluded from the extension pass.
pub fn select_files<F>(sorted_paths: &[String], mut size_of: F) -> Vec<String>
where
    F: FnMut(&str) -> Option<u64>,
{
    let mut included: Vec<String> = Vec::new();

    for name in WELL_KNOWN_FILES {
        let found = sorted_paths
            .iter()
            .find(|path| basename(path) == name && !included.contains(path));
        if let Some(path) = found {
            included.push(path.clone());
        }
    }

    for path in sorted_paths {
        if included.len() >= MAX_FILES {
            break;
        }
        if included.contains(path) || !has_text_extension(path) {
            continue;
        }
        if size_of(path).is_some_and(|size| size < MAX_FILE_BYTES) {
            included.push(path.clone());
        }
    }

    included.truncate(MAX_FILES);
    included
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn has_text_extension(path: &str) -> bool {
    let name = basename(path);
    match name.rfind('.') {
        // A leading dot alone (".env") is a hidden file, not an extension.
        Some(idx) if idx > 0 => {
            let ext = name[idx + 1..].to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
