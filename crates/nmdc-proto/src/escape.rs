//! NMDC escape tables.
//!
//! `|` terminates frames and `$` introduces verbs, so neither may appear
//! raw inside a payload. Clients escape what they send and unescape what
//! they receive; the hub only needs these tables for payloads it
//! originates (notices, log relays) and for user-supplied bodies it acts
//! on (rather than passes through).

/// Escape a hub-originated payload: LF becomes CRLF, `|` and `$` become
/// their HTML-entity forms.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\n' => out.push_str("\r\n"),
            '|' => out.push_str("&#124;"),
            '$' => out.push_str("&#36;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inverse of [`escape`], applied to user-supplied bodies before the hub
/// acts on them.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("&#124;") {
            out.push('|');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("&#36;") {
            out.push('$');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("\r\n") {
            out.push('\n');
            rest = tail;
        } else {
            let ch = rest.chars().next().unwrap();
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_frame_delimiters() {
        assert_eq!(escape("a|b$c"), "a&#124;b&#36;c");
        assert_eq!(escape("line1\nline2"), "line1\r\nline2");
    }

    #[test]
    fn unescape_inverts_escape() {
        for input in ["plain", "pipe | dollar $", "multi\nline\ntext", "", "$$||"] {
            assert_eq!(unescape(&escape(input)), input);
        }
    }

    #[test]
    fn unescape_leaves_unknown_entities() {
        assert_eq!(unescape("&#65;"), "&#65;");
    }
}
