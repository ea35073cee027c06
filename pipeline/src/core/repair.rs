//! Repair for JSON pasted from editors or chat windows.
//!
//! Only one defect is handled: raw newline, carriage return or tab characters
//! inside string literals. Each is replaced by a single space. Everything
//! outside string literals, and escaped characters inside them, is untouched.

/// Replace literal control whitespace inside JSON string literals with spaces.
pub fn repair_newlines_in_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in input.chars() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_string = false;
                out.push(ch);
            }
            '\n' | '\r' | '\t' => out.push(' '),
            _ => out.push(ch),
        }
    }

    out
}
