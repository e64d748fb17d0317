//! Comment stripping for the JSON-with-comments config format.

/// Strip `//` line comments and `/* */` block comments from JSON text.
///
/// Comment markers inside string literals are left untouched. Stripped
/// spans are replaced with spaces (newlines preserved) so serde_json
/// error positions still point into the original file.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                chars.next();
                out.push_str("  ");
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                    out.push(' ');
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                let mut prev_star = false;
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        prev_star = false;
                    } else {
                        out.push(' ');
                        if prev_star && next == '/' {
                            break;
                        }
                        prev_star = next == '*';
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}
