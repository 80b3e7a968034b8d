//! Concrete syntax tree types.
//!
//! The CST is the authoritative record of original syntax: one variant per
//! textual construct, each node carrying its byte range and any decorations
//! (anchor, tag, comments) that preceded it. Scalar nodes store the decoded
//! text — escape processing, folding and chomping happen in the scanner —
//! while the range still points at the raw source.
//!
//! The CST is mutable while the scanner builds it and frozen once
//! [`parse_cst`](crate::parse_cst) returns.

use crate::error::YamlError;
use crate::source::Range;

/// Scalar presentation styles, shared by the CST and the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarStyle {
    #[default]
    Plain,
    QuoteSingle,
    QuoteDouble,
    BlockLiteral,
    BlockFolded,
}

/// An explicit tag as written in the source, before prefix expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagToken {
    /// `!<tag:yaml.org,2002:str>`
    Verbatim(String),
    /// `!!str`, `!local`, `!h!suffix` — a handle plus suffix.
    Shorthand { handle: String, suffix: String },
    /// A lone `!`, the non-specific tag.
    NonSpecific,
}

/// Decorations preceding a value node.
#[derive(Debug, Clone, Default)]
pub struct Props {
    pub anchor: Option<String>,
    pub anchor_range: Option<Range>,
    pub tag: Option<TagToken>,
    pub tag_range: Option<Range>,
    /// Full-line comments above the node, without the leading `#`.
    pub comments_before: Vec<String>,
    /// Trailing comment on the node's last line.
    pub comment: Option<String>,
}

impl Props {
    pub fn is_empty(&self) -> bool {
        self.anchor.is_none()
            && self.tag.is_none()
            && self.comments_before.is_empty()
            && self.comment.is_none()
    }
}

/// One `key: value` entry of a mapping. Either side may be absent
/// (`? key` with no value, or `: value` with no key).
#[derive(Debug, Clone)]
pub struct MapItem {
    pub key: Option<CstNode>,
    pub value: Option<CstNode>,
}

/// The shape of a CST node.
#[derive(Debug, Clone)]
pub enum CstKind {
    /// Any scalar carrier: plain, quoted, or block. `value` is the decoded
    /// text after escapes, folding and chomping.
    Scalar { style: ScalarStyle, value: String },
    /// `*name`
    Alias(String),
    BlockMap(Vec<MapItem>),
    /// Items may be absent: `-` with nothing after it.
    BlockSeq(Vec<Option<CstNode>>),
    FlowMap(Vec<MapItem>),
    FlowSeq(Vec<CstNode>),
}

/// A value node with its range and decorations.
#[derive(Debug, Clone)]
pub struct CstNode {
    pub kind: CstKind,
    pub range: Range,
    pub props: Props,
}

impl CstNode {
    pub fn new(kind: CstKind, range: Range) -> Self {
        Self {
            kind,
            range,
            props: Props::default(),
        }
    }

    /// The CST node-type name used on diagnostics.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            CstKind::Scalar { style, .. } => match style {
                ScalarStyle::Plain => "PLAIN",
                ScalarStyle::QuoteSingle => "QUOTE_SINGLE",
                ScalarStyle::QuoteDouble => "QUOTE_DOUBLE",
                ScalarStyle::BlockLiteral => "BLOCK_LITERAL",
                ScalarStyle::BlockFolded => "BLOCK_FOLDED",
            },
            CstKind::Alias(_) => "ALIAS",
            CstKind::BlockMap(_) => "MAP",
            CstKind::BlockSeq(_) => "SEQ",
            CstKind::FlowMap(_) => "FLOW_MAP",
            CstKind::FlowSeq(_) => "FLOW_SEQ",
        }
    }
}

/// A `%NAME arg arg` directive line, kept raw for unknown names.
#[derive(Debug, Clone)]
pub struct CstDirective {
    pub name: String,
    pub args: Vec<String>,
    pub range: Range,
}

/// One document of a YAML stream.
#[derive(Debug, Clone)]
pub struct CstDocument {
    pub directives: Vec<CstDirective>,
    /// Whether the `---` directives-end marker was present.
    pub directives_end: bool,
    pub contents: Option<CstNode>,
    /// Whether the `...` document-end marker was present.
    pub document_end: bool,
    /// Comments after the contents, up to the end of the document.
    pub end_comments: Vec<String>,
    /// Diagnostics raised while scanning this document.
    pub errors: Vec<YamlError>,
    pub range: Range,
}

impl CstDocument {
    pub fn new(start: usize) -> Self {
        Self {
            directives: Vec::new(),
            directives_end: false,
            contents: None,
            document_end: false,
            end_comments: Vec::new(),
            errors: Vec::new(),
            range: Range::new(start, start),
        }
    }
}
