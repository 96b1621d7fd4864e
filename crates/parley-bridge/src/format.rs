//! Text shaping for outbound messages.

const ERROR_BANNER: &str = "**Error!** Could not Request Completion:\n\n";

/// Strip whitespace from the start of every line.
///
/// Whitespace-only lines disappear entirely, so runs of blank lines
/// collapse. Content is otherwise untouched.
pub fn normalize_reply(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_line_start = true;
    for c in text.chars() {
        if at_line_start && c.is_whitespace() {
            continue;
        }
        out.push(c);
        at_line_start = c == '\n';
    }
    out
}

/// Notification body for a failed completion. `message` is shown verbatim.
pub fn error_notification(message: &str) -> String {
    format!("{ERROR_BANNER}{message}")
}
