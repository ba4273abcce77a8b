//! Line-oriented state machine that turns a response into [`Event`]s.
//!
//! Parsing is pure: [`step`] maps `(state, line)` to a new state plus the
//! events that line produced. Applying directives is the caller's job (see
//! [`crate::interpret`]), so the machine can be driven by a whole string or
//! by a stream of chunks through [`LineBuffer`].
//!
//! Marker prefixes always win over the collecting mode: a line that starts
//! with `FILE: `, `DIR: ` or `CMD: ` ends the current file body even when the
//! author meant it as file content.

use std::mem;

use crate::core::directive::{Directive, Event, Marker, match_marker};

/// Parser mode between lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParseState {
    #[default]
    Idle,
    CollectingFile {
        path: String,
        lines: Vec<String>,
    },
}

/// Result of feeding one line to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ParseState,
    /// At most two events: a finalized file followed by the marker's own directive.
    pub events: Vec<Event>,
}

/// Feed one complete line (without its terminator).
pub fn step(state: ParseState, line: &str) -> Transition {
    let Some(marker) = match_marker(line) else {
        return match state {
            ParseState::CollectingFile { path, mut lines } => {
                lines.push(line.to_string());
                Transition {
                    state: ParseState::CollectingFile { path, lines },
                    events: Vec::new(),
                }
            }
            ParseState::Idle => Transition {
                state: ParseState::Idle,
                events: vec![Event::Narration(line.to_string())],
            },
        };
    };

    let mut events: Vec<Event> = finalize(state).into_iter().collect();
    let state = match marker {
        Marker::File(rest) => ParseState::CollectingFile {
            path: rest.trim().to_string(),
            lines: Vec::new(),
        },
        Marker::Dir(rest) => {
            events.push(Event::Directive(Directive::MakeDir {
                path: rest.trim().to_string(),
            }));
            ParseState::Idle
        }
        Marker::Cmd(rest) => {
            events.push(Event::Directive(Directive::RunCommand {
                command: rest.trim().to_string(),
            }));
            ParseState::Idle
        }
    };
    Transition { state, events }
}

/// Flush a pending file at end of input.
pub fn finish(state: ParseState) -> Option<Event> {
    finalize(state)
}

/// A pending file is written only with a non-empty path and at least one line.
fn finalize(state: ParseState) -> Option<Event> {
    match state {
        ParseState::CollectingFile { path, lines } if !path.is_empty() && !lines.is_empty() => {
            Some(Event::Directive(Directive::WriteFile {
                path,
                content: lines.join("\n"),
            }))
        }
        _ => None,
    }
}

/// Parse a complete response into events, in order.
pub fn parse_response(text: &str) -> Vec<Event> {
    let mut buffer = LineBuffer::default();
    let mut lines = buffer.push(text);
    lines.extend(buffer.finish());

    let mut state = ParseState::Idle;
    let mut events = Vec::new();
    for line in &lines {
        let transition = step(state, line);
        state = transition.state;
        events.extend(transition.events);
    }
    events.extend(finish(state));
    events
}

/// Reassembles complete lines from arbitrarily split text chunks.
///
/// Only `\n` terminates a line; a trailing `\r` stays part of the line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.partial.push_str(chunk);
        let Some(last_newline) = self.partial.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = mem::replace(&mut self.partial, rest);
        complete[..complete.len() - 1]
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    /// End of input: an unterminated remainder becomes the final line.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        Some(mem::take(&mut self.partial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &str, content: &str) -> Event {
        Event::Directive(Directive::WriteFile {
            path: path.to_string(),
            content: content.to_string(),
        })
    }

    fn narration(line: &str) -> Event {
        Event::Narration(line.to_string())
    }

    #[test]
    fn plain_text_is_all_narration_in_order() {
        let events = parse_response("Here is the plan.\n\nFirst, set up.\nfile: lower case");
        assert_eq!(
            events,
            vec![
                narration("Here is the plan."),
                narration(""),
                narration("First, set up."),
                narration("file: lower case"),
            ]
        );
    }

    #[test]
    fn consecutive_files_split_on_markers() {
        let events = parse_response("FILE: a.txt\nline1\nline2\nFILE: b.txt\ncontent");
        assert_eq!(
            events,
            vec![write("a.txt", "line1\nline2"), write("b.txt", "content")]
        );
    }

    #[test]
    fn dir_marker_closes_file_without_including_marker_line() {
        let events = parse_response("FILE: src/app.py\nprint('hi')\n\nDIR: static\nafter");
        assert_eq!(
            events,
            vec![
                write("src/app.py", "print('hi')\n"),
                Event::Directive(Directive::MakeDir {
                    path: "static".to_string()
                }),
                narration("after"),
            ]
        );
    }

    #[test]
    fn cmd_marker_closes_file_and_trims_only_ends() {
        let events = parse_response("FILE: a.txt\nx\nCMD:   pip  install   flask  ");
        assert_eq!(
            events,
            vec![
                write("a.txt", "x"),
                Event::Directive(Directive::RunCommand {
                    command: "pip  install   flask".to_string()
                }),
            ]
        );
    }

    #[test]
    fn empty_file_body_produces_no_write() {
        assert_eq!(
            parse_response("FILE: empty.txt\nFILE: b.txt\nbody"),
            vec![write("b.txt", "body")]
        );
        assert!(parse_response("FILE: empty.txt").is_empty());
        assert!(parse_response("FILE: empty.txt\n").is_empty());
    }

    #[test]
    fn file_marker_with_blank_path_swallows_body() {
        assert!(parse_response("FILE:    \nsecret\nmore").is_empty());
    }

    #[test]
    fn marker_like_content_line_terminates_file() {
        let events = parse_response("FILE: notes.md\nintro\nCMD: not really a command");
        assert_eq!(events[0], write("notes.md", "intro"));
        assert_eq!(
            events[1],
            Event::Directive(Directive::RunCommand {
                command: "not really a command".to_string()
            })
        );
    }

    #[test]
    fn step_is_pure_and_reports_two_events_on_close() {
        let state = ParseState::CollectingFile {
            path: "a".to_string(),
            lines: vec!["1".to_string()],
        };
        let transition = step(state, "DIR: d");
        assert_eq!(transition.state, ParseState::Idle);
        assert_eq!(transition.events.len(), 2);
    }

    #[test]
    fn line_buffer_waits_for_terminator() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push("FILE: a").is_empty());
        assert_eq!(buffer.push(".txt\nhel"), vec!["FILE: a.txt".to_string()]);
        assert_eq!(
            buffer.push("lo\n\nwor"),
            vec!["hello".to_string(), String::new()]
        );
        assert_eq!(buffer.finish(), Some("wor".to_string()));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_carriage_returns() {
        let mut buffer = LineBuffer::default();
        assert_eq!(buffer.push("a\r\nb\r\n"), vec!["a\r", "b\r"]);
        assert_eq!(buffer.finish(), None);
    }
}
