// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! LaTeX escaping for literal values.
//!
//! Only literal field values injected into the fallback template go through
//! here. Generated documents are never sanitized as a whole.

use serde_json::Value;

/// Replacements that expand into more than an escaped character. They are
/// matched as already-escaped tokens so sanitizing stays idempotent.
const WORD_ESCAPES: [&str; 3] = [
    "\\textasciitilde{}",
    "\\textasciicircum{}",
    "\\textbackslash{}",
];

const BACKSLASH: &str = "\\textbackslash{}";

fn replacement(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("\\&"),
        '%' => Some("\\%"),
        '$' => Some("\\$"),
        '#' => Some("\\#"),
        '_' => Some("\\_"),
        '{' => Some("\\{"),
        '}' => Some("\\}"),
        '~' => Some("\\textasciitilde{}"),
        '^' => Some("\\textasciicircum{}"),
        _ => None,
    }
}

/// Escape LaTeX special characters in `text`.
///
/// A backslash directly before a special character, or starting one of the
/// word escapes this function emits, is taken as an existing escape and left
/// alone. Every other backslash becomes `\textbackslash{}`, so no control
/// sequence survives. `sanitize(&sanitize(s)) == sanitize(s)` for every input.
///
/// ```
/// use reportforge_core::sanitize::sanitize;
///
/// assert_eq!(sanitize("100 & 50%"), "100 \\& 50\\%");
/// assert_eq!(sanitize("100 \\& 50\\%"), "100 \\& 50\\%");
/// assert_eq!(sanitize("\\input x"), "\\textbackslash{}input x");
/// ```
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            if let Some(token) = WORD_ESCAPES.iter().find(|t| rest.starts_with(**t)) {
                out.push_str(token);
                rest = &rest[token.len()..];
                continue;
            }

            let mut chars = rest.chars();
            chars.next();
            match chars.next() {
                Some(next) if replacement(next).is_some() => {
                    out.push('\\');
                    out.push(next);
                    rest = &rest[1 + next.len_utf8()..];
                }
                _ => {
                    out.push_str(BACKSLASH);
                    rest = &rest[1..];
                }
            }
            continue;
        }

        match replacement(c) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Coerce a JSON value to text, then escape it.
///
/// Strings are used verbatim, null becomes empty, and arrays/objects are
/// rendered as compact JSON.
pub fn sanitize_value(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize(s),
        Value::Null => String::new(),
        other => sanitize(&other.to_string()),
    }
}
