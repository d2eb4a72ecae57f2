//! Quoting rules shared by keys and values.
//!
//! A string is written bare unless [`needs_quoting`] says otherwise. Quoted
//! strings use double quotes with backslash escapes; [`unquote`] reverses
//! them exactly.

use std::fmt::Write as _;

use crate::buffer::Buffer;

/// True if `s` is empty or contains whitespace, `"`, `=`, or any
/// non-printable character.
pub fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '=' || !is_printable(c))
}

/// Appends `s` to `buf`, quoted if `quote` is set and the string needs it.
pub(crate) fn append_string(buf: &mut Buffer, s: &str, quote: bool) {
    if quote && needs_quoting(s) {
        append_quoted(buf, s);
    } else {
        buf.write_str(s);
    }
}

/// Appends `s` in double quotes, escaping `"`, `\` and every character that
/// is not printable. The ASCII space is kept as is.
pub(crate) fn append_quoted(buf: &mut Buffer, s: &str) {
    buf.write_byte(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.write_str("\\\""),
            '\\' => buf.write_str("\\\\"),
            '\n' => buf.write_str("\\n"),
            '\r' => buf.write_str("\\r"),
            '\t' => buf.write_str("\\t"),
            ' ' => buf.write_byte(b' '),
            c if c.is_whitespace() || !is_printable(c) => {
                let _ = write!(buf, "\\u{{{:x}}}", c as u32);
            }
            c => {
                let mut tmp = [0u8; 4];
                buf.write_str(c.encode_utf8(&mut tmp));
            }
        }
    }
    buf.write_byte(b'"');
}

/// Quotes `s` into a new string, the same way the handler does.
pub fn quote(s: &str) -> String {
    let mut buf = crate::buffer::acquire();
    append_quoted(&mut buf, s);
    String::from_utf8_lossy(buf.as_bytes()).into_owned()
}

/// Error returned by [`unquote`] for malformed input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnquoteError {
    #[error("missing surrounding double quotes")]
    NotQuoted,
    #[error("unterminated escape sequence")]
    Unterminated,
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
    #[error("unescaped double quote at byte {0}")]
    StrayQuote(usize),
}

/// Reverses [`quote`].
pub fn unquote(s: &str) -> Result<String, UnquoteError> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|_| s.len() >= 2)
        .ok_or(UnquoteError::NotQuoted)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Err(UnquoteError::StrayQuote(i + 1)),
            '\\' => {
                let (_, esc) = chars.next().ok_or(UnquoteError::Unterminated)?;
                match esc {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        if !matches!(chars.next(), Some((_, '{'))) {
                            return Err(UnquoteError::InvalidEscape(i + 1));
                        }
                        let mut hex = String::new();
                        loop {
                            match chars.next() {
                                Some((_, '}')) => break,
                                Some((_, h)) if h.is_ascii_hexdigit() && hex.len() < 6 => {
                                    hex.push(h)
                                }
                                Some(_) => return Err(UnquoteError::InvalidEscape(i + 1)),
                                None => return Err(UnquoteError::Unterminated),
                            }
                        }
                        let c = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or(UnquoteError::InvalidEscape(i + 1))?;
                        out.push(c);
                    }
                    _ => return Err(UnquoteError::InvalidEscape(i + 1)),
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Printable in the sense of letters, marks, numbers, punctuation, symbols
/// and the ASCII space. Control, format, private-use and noncharacter code
/// points are not.
///
/// There are no general-category tables here, so code points unassigned in
/// the Unicode version std ships with (U+0378, say) count as printable and
/// are written bare.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{FFFE}'..='\u{FFFF}'
            | '\u{F0000}'..='\u{10FFFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_strings_are_not_quoted() {
        for s in ["GET", ":8080", "a.b.c", "héllo", "日本", "x-y_z/1"] {
            assert!(!needs_quoting(s), "{s:?}");
        }
    }

    #[test]
    fn special_strings_are_quoted() {
        for s in ["", "a b", "a=b", "say \"hi\"", "tab\there", "nl\n", "\u{7f}", "nb\u{a0}sp", "zw\u{200b}"] {
            assert!(needs_quoting(s), "{s:?}");
        }
    }

    #[test]
    fn format_and_private_use_are_quoted() {
        assert!(needs_quoting("a\u{200B}b"));
        assert!(needs_quoting("\u{E000}"));
        assert!(needs_quoting("\u{FFFE}"));
        assert_eq!(quote("\u{FEFF}"), "\"\\u{feff}\"");
        assert!(!needs_quoting("\u{0378}"));
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("a b"), r#""a b""#);
        assert_eq!(quote("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(quote("a\\b\n"), r#""a\\b\n""#);
        assert_eq!(quote("\u{1b}[0m"), r#""\u{1b}[0m""#);
        assert_eq!(quote(""), r#""""#);
    }

    #[test]
    fn quoted_strings_round_trip() {
        for s in [
            "",
            "a b",
            "k=v",
            "\"quoted\"",
            "back\\slash",
            "line\nbreak\r\n",
            "\t\u{0}\u{7}\u{1b}",
            "nb\u{a0}sp\u{2028}",
            "emoji 🦀 ok",
            "\u{feff}bom",
        ] {
            assert_eq!(unquote(&quote(s)).as_deref(), Ok(s), "{s:?}");
        }
    }

    #[test]
    fn unquote_rejects_malformed() {
        assert_eq!(unquote("abc"), Err(UnquoteError::NotQuoted));
        assert_eq!(unquote("\""), Err(UnquoteError::NotQuoted));
        assert_eq!(unquote(r#""a\""#), Err(UnquoteError::Unterminated));
        assert_eq!(unquote(r#""\q""#), Err(UnquoteError::InvalidEscape(1)));
        assert_eq!(unquote(r#""a"b""#), Err(UnquoteError::StrayQuote(2)));
        assert_eq!(unquote(r#""\u{zz}""#), Err(UnquoteError::InvalidEscape(1)));
    }
}
