//! Diagnostics for YAML parsing and stringification.
//!
//! Errors are partitioned into three data-error kinds plus warnings:
//! - **Syntax** errors concern unexpected characters in otherwise-structured
//!   input (stray commas, missing terminators).
//! - **Semantic** errors concern well-tokenised input that violates YAML
//!   rules (inconsistent indentation, tabs in an indent span, directives
//!   without a document).
//! - **Reference** errors concern anchor/alias mismatches.
//!
//! None of these are thrown during parsing: they are collected on the
//! document and callers inspect the arrays. Only the high-level [`parse`]
//! helper surfaces the first error as `Err`.
//!
//! [`parse`]: crate::parse

use crate::source::{LinePos, Range, SourceMap};
use thiserror::Error;

/// The kind of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Reference,
    Warning,
}

impl ErrorKind {
    /// The diagnostic's public name.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "YAMLSyntaxError",
            ErrorKind::Semantic => "YAMLSemanticError",
            ErrorKind::Reference => "YAMLReferenceError",
            ErrorKind::Warning => "YAMLWarning",
        }
    }
}

/// Line/column span of a diagnostic, resolved when pretty errors are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosSpan {
    pub start: LinePos,
    pub end: LinePos,
}

/// A collected diagnostic: an error or a warning.
///
/// Carries the byte range of the offending construct and, once
/// [`prettify`](YamlError::prettify) has run, the resolved line/column span.
/// Prettifying also rewrites the message to include a caret-underlined
/// excerpt of the offending line.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {}", .kind.name(), .message)]
pub struct YamlError {
    pub kind: ErrorKind,
    pub message: String,
    /// The CST node kind the diagnostic was raised on, e.g. `FLOW_MAP`.
    pub node_type: &'static str,
    pub range: Range,
    pub line_pos: Option<LinePosSpan>,
}

impl YamlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, range: Range) -> Self {
        Self {
            kind,
            message: message.into(),
            node_type: "",
            range,
            line_pos: None,
        }
    }

    pub fn syntax(message: impl Into<String>, range: Range) -> Self {
        Self::new(ErrorKind::Syntax, message, range)
    }

    pub fn semantic(message: impl Into<String>, range: Range) -> Self {
        Self::new(ErrorKind::Semantic, message, range)
    }

    pub fn reference(message: impl Into<String>, range: Range) -> Self {
        Self::new(ErrorKind::Reference, message, range)
    }

    pub fn warning(message: impl Into<String>, range: Range) -> Self {
        Self::new(ErrorKind::Warning, message, range)
    }

    pub fn on(mut self, node_type: &'static str) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn is_warning(&self) -> bool {
        self.kind == ErrorKind::Warning
    }

    /// Resolve the line/column span and append a caret-underlined excerpt of
    /// the offending line to the message. Idempotent.
    pub fn prettify(&mut self, src: &str, map: &SourceMap) {
        if self.line_pos.is_some() {
            return;
        }
        let start = map.line_pos(self.range.start);
        let end = map.line_pos(self.range.end);
        self.line_pos = Some(LinePosSpan { start, end });

        let line = map.line_text(src, start.line);
        let caret_start = start.col - 1;
        let caret_len = if end.line == start.line {
            (end.col - start.col).max(1)
        } else {
            line.len().saturating_sub(caret_start).max(1)
        };
        let carets = format!("{}{}", " ".repeat(caret_start), "^".repeat(caret_len));
        self.message = format!(
            "{} at line {}, column {}:\n\n{}\n{}\n",
            self.message, start.line, start.col, line, carets
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_name() {
        let err = YamlError::syntax("Unexpected ,", Range::new(2, 3));
        assert_eq!(err.to_string(), "YAMLSyntaxError: Unexpected ,");
    }

    #[test]
    fn test_prettify_appends_excerpt() {
        let src = "{ , }";
        let map = SourceMap::new(src);
        let mut err = YamlError::syntax("Unexpected , in flow map", Range::new(2, 3));
        err.prettify(src, &map);
        let lp = err.line_pos.unwrap();
        assert_eq!(lp.start, LinePos { line: 1, col: 3 });
        assert_eq!(lp.end, LinePos { line: 1, col: 4 });
        assert!(err.message.contains("at line 1, column 3"));
        assert!(err.message.contains("{ , }"));
        assert!(err.message.contains("  ^"));
    }

    #[test]
    fn test_prettify_is_idempotent() {
        let src = "a: b";
        let map = SourceMap::new(src);
        let mut err = YamlError::semantic("boom", Range::new(0, 1));
        err.prettify(src, &map);
        let once = err.message.clone();
        err.prettify(src, &map);
        assert_eq!(err.message, once);
    }
}
