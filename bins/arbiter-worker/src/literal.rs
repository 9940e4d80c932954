/// Value decoding shared by the normalizer and the evaluator
///
/// Test data and program output arrive in two dialects: JSON, and host-language
/// literal syntax (`['a', 'b']`, `None`, `True`, `(1, 2)`). Everything here
/// turns text in either dialect into a `serde_json::Value`.

use serde_json::Value;

/// Parse text as strict JSON
pub fn parse_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Parse text as JSON, falling back to host-literal conversion
pub fn parse_lenient(text: &str) -> Option<Value> {
    parse_json(text).or_else(|| parse_json(&host_literal_to_json(text)))
}

/// Rewrite host-language literal syntax as JSON text
///
/// Single-quoted strings become double-quoted, `None`/`True`/`False` outside
/// strings become `null`/`true`/`false`, and tuple parentheses become
/// brackets. Text that is already JSON passes through unchanged.
pub fn host_literal_to_json(text: &str) -> String {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i = copy_string(&chars, i, &mut out);
                continue;
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

// Copies one quoted string starting at `start`, re-quoted with `"`.
// Returns the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    out.push('"');

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            // \' is legal in host strings, not in JSON
            if next == '\'' {
                out.push('\'');
            } else {
                out.push('\\');
                out.push(next);
            }
            i += 2;
            continue;
        }
        if c == quote {
            out.push('"');
            return i + 1;
        }
        if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
        i += 1;
    }

    // Unterminated string: close it so the caller's parse decides
    out.push('"');
    i
}

/// Split text on top-level commas, ignoring commas inside brackets or quotes
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '[' | '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            ']' | ')' | '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Canonical single-line text form of a value
///
/// Strings render bare (no quotes) so that `"abc"` and `abc` share a form.
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True when the value is a non-empty array whose elements are all arrays
pub fn is_matrix(value: &Value) -> bool {
    match value {
        Value::Array(rows) => !rows.is_empty() && rows.iter().all(Value::is_array),
        _ => false,
    }
}

/// Dimensions of a rectangular matrix
pub fn matrix_dimensions(value: &Value) -> Option<(usize, usize)> {
    let rows = value.as_array()?;
    let first = rows.first()?.as_array()?;
    let cols = first.len();
    if rows.iter().all(|r| r.as_array().map(Vec::len) == Some(cols)) {
        Some((rows.len(), cols))
    } else {
        None
    }
}
