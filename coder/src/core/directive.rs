//! Directives embedded in model responses.
//!
//! The wire format is line oriented: a line starting with one of the marker
//! prefixes carries a single-line argument. `FILE: ` additionally owns every
//! following line up to the next marker or end of input.

/// Marker that opens a file body.
pub const FILE_MARKER: &str = "FILE: ";
/// Marker that requests a directory.
pub const DIR_MARKER: &str = "DIR: ";
/// Marker that requests a shell command.
pub const CMD_MARKER: &str = "CMD: ";

/// A side-effecting instruction recognized in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    WriteFile { path: String, content: String },
    MakeDir { path: String },
    RunCommand { command: String },
}

impl Directive {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::WriteFile { .. } => "file",
            Directive::MakeDir { .. } => "dir",
            Directive::RunCommand { .. } => "cmd",
        }
    }
}

/// Output of the parse phase, in response order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Directive(Directive),
    /// A line outside any file body that matched no marker.
    Narration(String),
}

/// Marker recognized at the start of a line, with its raw remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker<'a> {
    File(&'a str),
    Dir(&'a str),
    Cmd(&'a str),
}

/// Classify a line by marker prefix, checked in `FILE`, `DIR`, `CMD` order.
pub fn match_marker(line: &str) -> Option<Marker<'_>> {
    if let Some(rest) = line.strip_prefix(FILE_MARKER) {
        return Some(Marker::File(rest));
    }
    if let Some(rest) = line.strip_prefix(DIR_MARKER) {
        return Some(Marker::Dir(rest));
    }
    line.strip_prefix(CMD_MARKER).map(Marker::Cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_require_exact_prefix() {
        assert_eq!(match_marker("FILE: a.txt"), Some(Marker::File("a.txt")));
        assert_eq!(match_marker("DIR: src"), Some(Marker::Dir("src")));
        assert_eq!(match_marker("CMD: ls -la"), Some(Marker::Cmd("ls -la")));
        assert_eq!(match_marker("FILE:a.txt"), None);
        assert_eq!(match_marker(" FILE: a.txt"), None);
        assert_eq!(match_marker("file: a.txt"), None);
        assert_eq!(match_marker("CMD:"), None);
    }
}
