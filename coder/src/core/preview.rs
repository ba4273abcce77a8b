//! Short previews of command output for terminal reporting.

/// Characters kept in a preview.
pub const PREVIEW_CHARS: usize = 200;

/// First [`PREVIEW_CHARS`] characters, with `...` appended when cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
