//! Template compilation errors.
//!
//! Compile-time failures (malformed markup, unclosed `${` placeholders,
//! unparseable expressions) are fatal to the compile call that produced
//! them and carry enough context to point a template author at the
//! offending source. Render-time expression failures are *not* errors:
//! they degrade to `Undefined` by policy (see [`crate::expr`]).

use thiserror::Error;

/// Structured error for template compilation and loading.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    /// The markup failed to parse as a strict XML-flavored document.
    #[error("{message}{}", position_suffix(.file, .line, .column))]
    Markup {
        /// Human-readable message.
        message: String,
        /// Source name, when the compile call supplied one.
        file: Option<String>,
        /// 1-based line of the failure, when known.
        line: Option<u32>,
        /// 1-based column of the failure, when known.
        column: Option<u32>,
    },

    /// A `${` placeholder was still open at the end of its string.
    #[error("unclosed expression placeholder in {0:?}")]
    UnclosedPlaceholder(String),

    /// An expression inside a placeholder or attribute failed to parse.
    #[error("invalid expression {expression:?}: {message}")]
    Expression {
        /// The expression source text.
        expression: String,
        /// Parser diagnostic.
        message: String,
    },

    /// An asynchronous template load was rejected or misused.
    #[error("template fetch for {url:?} failed: {message}")]
    Fetch {
        /// The URL the template was registered under.
        url: String,
        /// What went wrong.
        message: String,
    },
}

fn position_suffix(file: &Option<String>, line: &Option<u32>, column: &Option<u32>) -> String {
    match (file, line, column) {
        (Some(f), Some(l), Some(c)) => format!(" at {f}:{l}:{c}"),
        (Some(f), Some(l), None) => format!(" at {f}:{l}"),
        (Some(f), None, _) => format!(" in {f}"),
        (None, Some(l), Some(c)) => format!(" at line {l}, column {c}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_error_display() {
        let err = TemplateError::Markup {
            message: "mismatched closing tag".to_string(),
            file: Some("widget.tpl".to_string()),
            line: Some(3),
            column: Some(14),
        };
        assert_eq!(err.to_string(), "mismatched closing tag at widget.tpl:3:14");
    }

    #[test]
    fn test_markup_error_without_position() {
        let err = TemplateError::Markup {
            message: "unexpected end of input".to_string(),
            file: None,
            line: None,
            column: None,
        };
        assert_eq!(err.to_string(), "unexpected end of input");
    }

    #[test]
    fn test_unclosed_placeholder_names_the_string() {
        let err = TemplateError::UnclosedPlaceholder("hello ${name".to_string());
        assert!(err.to_string().contains("hello ${name"));
    }
}
