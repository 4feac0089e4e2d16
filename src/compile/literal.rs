//! Literal tokenizer for `${expression}` placeholders.
//!
//! Splits a text or attribute string into alternating literal and
//! expression segments. `\$` and `\\` escape a literal dollar and
//! backslash; brace nesting inside a placeholder is tracked with a depth
//! counter, so `${a ? {x:1} : {}}` is one expression segment.

use crate::error::TemplateError;

/// One tokenized segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, emitted as-is.
    Text(String),
    /// Raw expression source from inside `${...}`.
    Expr(String),
}

/// Tokenize a string. Segments alternate text/expression starting with
/// text; the leading text segment may be empty when the string opens with
/// a placeholder. An unclosed placeholder is a compile error naming the
/// offending string.
pub fn tokenize(input: &str) -> Result<Vec<Segment>, TemplateError> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_expr = false;
    let mut depth = 0usize;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\\' && (next == Some('$') || next == Some('\\')) {
            current.push(next.unwrap_or_default());
            i += 2;
            continue;
        }

        if !in_expr {
            if c == '$' && next == Some('{') {
                in_expr = true;
                depth = 1;
                segments.push(Segment::Text(std::mem::take(&mut current)));
                i += 2;
                continue;
            }
        } else {
            if c == '{' {
                depth += 1;
            } else if c == '}' {
                depth -= 1;
                if depth == 0 {
                    in_expr = false;
                    segments.push(Segment::Expr(std::mem::take(&mut current)));
                    i += 1;
                    continue;
                }
            }
        }

        current.push(c);
        i += 1;
    }

    if in_expr {
        return Err(TemplateError::UnclosedPlaceholder(input.to_string()));
    }
    if !current.is_empty() {
        segments.push(Segment::Text(current));
    }
    Ok(segments)
}
