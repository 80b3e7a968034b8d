//! YAML 1.0/1.1/1.2 parser and stringifier.
//!
//! `yamel` converts between textual YAML streams, an in-memory document
//! model, and native Rust values, preserving comments and scalar styles
//! where possible.
//!
//! # Parsing Pipeline
//!
//! Parsing runs in three phases:
//!
//! 1. **Scanner** ([`parse_cst`]): turns the source into concrete-syntax
//!    documents that keep ranges, comments, anchors and tags, with scalar
//!    text already decoded.
//!
//! 2. **Composer**: resolves a CST document into a typed AST of scalars,
//!    mappings, sequences and aliases under a schema, collecting errors and
//!    warnings instead of throwing.
//!
//! 3. **Host conversion** ([`Document::to_value`]): expands aliases and
//!    merge keys into a plain [`Value`] graph.
//!
//! Stringification walks the AST back to text under the configured style
//! options; [`stringify`] goes straight from a [`Value`].
//!
//! # Example
//!
//! ```
//! use yamel::{parse, stringify, Options, Value};
//!
//! let opts = Options::default();
//! let value = parse("counts: [1, 2, 3]\n", &opts).unwrap();
//! assert_eq!(
//!     value.get("counts").and_then(Value::as_seq).map(<[Value]>::len),
//!     Some(3)
//! );
//! let text = stringify(&value, &opts).unwrap();
//! assert_eq!(parse(&text, &opts).unwrap(), value);
//! ```

mod compose;
mod cst;
mod error;
mod node;
mod options;
mod scan;
mod schema;
mod source;
mod stringify;
mod value;
mod visit;

pub use compose::compose_document;
pub use cst::{CstDirective, CstDocument, CstKind, CstNode, MapItem, Props, ScalarStyle, TagToken};
pub use error::{ErrorKind, LinePosSpan, YamlError};
pub use node::{Alias, Document, Map, Node, Pair, Scalar, ScalarValue, Seq, TagPrefix};
pub use options::{
    BinaryOpts, BoolOpts, FoldOpts, IntOpts, LogLevel, NullOpts, Options, ScalarOpts, SchemaId,
    StrOpts, Version,
};
pub use scan::parse_cst;
pub use schema::{default_tag, NodeClass, ResolveCtx, Schema, Tag, DEFAULT_TAG_PREFIX};
pub use source::{LinePos, Range, SourceMap};
pub use stringify::{stringify_document, stringify_node};
pub use value::{create_node, Value};
pub use visit::{visit, Visit, VisitKey};

/// Parse every document in the stream, in source order.
pub fn parse_all_documents(src: &str, options: &Options) -> Vec<Document> {
    let map = SourceMap::new(src);
    parse_cst(src)
        .iter()
        .map(|cst| compose_document(cst, src, &map, options))
        .collect()
}

/// Parse the first document. Any further documents in the stream append a
/// trailing-content error to it.
pub fn parse_document(src: &str, options: &Options) -> Document {
    let map = SourceMap::new(src);
    let csts = parse_cst(src);
    let mut doc = compose_document(&csts[0], src, &map, options);
    if let Some(extra) = csts.get(1) {
        let mut err = YamlError::syntax(
            "Source contains multiple documents; please use parse_all_documents()",
            extra.range,
        );
        if options.pretty_errors {
            err.prettify(src, &map);
        }
        doc.errors.push(err);
    }
    doc
}

/// Parse a single document to a host value.
///
/// Diagnostics collected on the document never throw during parsing; this
/// helper surfaces the first error as `Err` and forwards warnings to the
/// [`log`] crate when `log_level` allows.
pub fn parse(src: &str, options: &Options) -> Result<Value, YamlError> {
    let doc = parse_document(src, options);
    if matches!(options.log_level, LogLevel::Warn | LogLevel::Debug) {
        for warning in &doc.warnings {
            log::warn!("{warning}");
        }
    }
    if let Some(err) = doc.errors.first() {
        return Err(err.clone());
    }
    doc.to_value()
}

/// Stringify a host value as a single YAML document.
///
/// Fails only when the options make the value unrepresentable (for
/// example `simple_keys` with a collection key).
pub fn stringify(value: &Value, options: &Options) -> Result<String, YamlError> {
    let node = create_node(value, true, None);
    stringify_node(&node, options)
}
