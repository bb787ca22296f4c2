//! Escaped-string encodings of the rendered text.
//!
//! Both encodings are pure transforms over the raw artifact. Replacement
//! order is load-bearing: the escape byte is rewritten before newlines and
//! quotes so the inserted backslashes are not re-escaped.

/// Wrap the raw text as a C character-array declaration.
pub(crate) fn c_literal(raw: &str) -> String {
    let escaped = raw
        .replace('\x1b', "\\033")
        .replace('\n', "\\n")
        .replace('"', "\\\"");
    format!("char kAnsiArt[] = \"{escaped}\"")
}

/// Wrap the raw text as an `echo -ne` shell invocation.
pub(crate) fn shell_command(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('\x1b', "\\e")
        .replace('\n', "\\n")
        .replace('\'', "\\x27");
    format!("echo -ne '{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "\x1b[48;2;1;2;3mA'B\"C\x1b[49m\nsecond line\n";

    /// Undo the C-literal escaping by parsing escape sequences left to
    /// right, the way a C compiler would.
    fn decode_c(encoded: &str) -> String {
        let body = encoded
            .strip_prefix("char kAnsiArt[] = \"")
            .and_then(|s| s.strip_suffix('"'))
            .unwrap();
        let mut out = String::new();
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('0') => {
                    assert_eq!(chars.next(), Some('3'));
                    assert_eq!(chars.next(), Some('3'));
                    out.push('\x1b');
                },
                Some('n') => out.push('\n'),
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                },
                None => out.push('\\'),
            }
        }
        out
    }

    /// Undo the shell escaping by parsing escape sequences left to right.
    fn decode_shell(encoded: &str) -> String {
        let body = encoded
            .strip_prefix("echo -ne '")
            .and_then(|s| s.strip_suffix('\''))
            .unwrap();
        let mut out = String::new();
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('e') => out.push('\x1b'),
                Some('n') => out.push('\n'),
                Some('x') => {
                    assert_eq!(chars.next(), Some('2'));
                    assert_eq!(chars.next(), Some('7'));
                    out.push('\'');
                },
                other => panic!("unexpected escape {other:?}"),
            }
        }
        out
    }

    #[test]
    fn c_literal_round_trips() {
        assert_eq!(decode_c(&c_literal(RAW)), RAW);
    }

    #[test]
    fn shell_command_round_trips() {
        let raw_with_backslash = format!("{RAW}tail\\end");
        assert_eq!(decode_shell(&shell_command(&raw_with_backslash)), raw_with_backslash);
    }

    #[test]
    fn c_literal_escapes_quotes_and_newlines() {
        let encoded = c_literal("a\"b\n");
        assert_eq!(encoded, "char kAnsiArt[] = \"a\\\"b\\n\"");
    }

    #[test]
    fn shell_command_escapes_single_quotes() {
        let encoded = shell_command("it's\n");
        assert_eq!(encoded, "echo -ne 'it\\x27s\\n'");
    }

    #[test]
    fn encodings_contain_no_raw_control_bytes() {
        assert!(!c_literal(RAW).contains('\x1b'));
        assert!(!c_literal(RAW).contains('\n'));
        assert!(!shell_command(RAW).contains('\x1b'));
        assert!(!shell_command(RAW).contains('\n'));
    }
}
