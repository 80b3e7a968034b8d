//! Abstract syntax tree: resolved, schema-typed nodes.
//!
//! The AST is the authoritative record of meaning. Nodes own their children;
//! aliases hold an anchor *name* and resolve lazily through the document's
//! anchor table, never a back-pointer, so the tree stays acyclic and owned.

use crate::cst::ScalarStyle;
use crate::error::YamlError;
use crate::options::{Options, SchemaId, Version};
use crate::source::Range;
use num_bigint::BigInt;

/// A resolved scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A scalar node.
#[derive(Debug, Clone)]
pub struct Scalar {
    pub value: ScalarValue,
    /// Resolved tag URI, set for explicit tags and non-default resolutions.
    pub tag: Option<String>,
    pub style: ScalarStyle,
    pub anchor: Option<String>,
    pub comment_before: Option<String>,
    pub comment: Option<String>,
    pub range: Option<Range>,
}

impl Scalar {
    pub fn new(value: ScalarValue) -> Self {
        Self {
            value,
            tag: None,
            style: ScalarStyle::Plain,
            anchor: None,
            comment_before: None,
            comment: None,
            range: None,
        }
    }

    pub fn null() -> Self {
        Self::new(ScalarValue::Null)
    }
}

/// One key/value entry of a mapping. Either side may be absent.
#[derive(Debug, Clone, Default)]
pub struct Pair {
    pub key: Option<Node>,
    pub value: Option<Node>,
}

impl Pair {
    pub fn new(key: Option<Node>, value: Option<Node>) -> Self {
        Self { key, value }
    }
}

/// A mapping. Insertion order is significant and duplicate keys are
/// preserved (with a warning at resolve time).
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub items: Vec<Pair>,
    pub flow: bool,
    pub tag: Option<String>,
    pub anchor: Option<String>,
    pub comment_before: Option<String>,
    pub comment: Option<String>,
    pub range: Option<Range>,
}

/// A sequence.
#[derive(Debug, Clone, Default)]
pub struct Seq {
    pub items: Vec<Node>,
    pub flow: bool,
    pub tag: Option<String>,
    pub anchor: Option<String>,
    pub comment_before: Option<String>,
    pub comment: Option<String>,
    pub range: Option<Range>,
}

/// A reference to a previously anchored node, by name.
#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    pub range: Option<Range>,
}

/// Any AST node.
#[derive(Debug, Clone)]
pub enum Node {
    Scalar(Scalar),
    Map(Map),
    Seq(Seq),
    Alias(Alias),
}

impl Node {
    pub fn null() -> Self {
        Node::Scalar(Scalar::null())
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Seq> {
        match self {
            Node::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, Node::Alias(_))
    }

    pub fn anchor(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) => s.anchor.as_deref(),
            Node::Map(m) => m.anchor.as_deref(),
            Node::Seq(s) => s.anchor.as_deref(),
            Node::Alias(_) => None,
        }
    }

    pub fn set_anchor(&mut self, name: Option<String>) {
        match self {
            Node::Scalar(s) => s.anchor = name,
            Node::Map(m) => m.anchor = name,
            Node::Seq(s) => s.anchor = name,
            Node::Alias(_) => {}
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) => s.tag.as_deref(),
            Node::Map(m) => m.tag.as_deref(),
            Node::Seq(s) => s.tag.as_deref(),
            Node::Alias(_) => None,
        }
    }

    pub fn range(&self) -> Option<Range> {
        match self {
            Node::Scalar(s) => s.range,
            Node::Map(m) => m.range,
            Node::Seq(s) => s.range,
            Node::Alias(a) => a.range,
        }
    }

    /// Number of nodes in this subtree, aliases counted at the cost of
    /// their `counts` entry. Scalars weigh 1; collections weigh the sum of
    /// their children, so an empty collection weighs nothing.
    pub fn node_count(&self, counts: &[(String, u64)]) -> u64 {
        match self {
            Node::Scalar(_) => 1,
            Node::Seq(s) => s.items.iter().map(|n| n.node_count(counts)).sum(),
            Node::Map(m) => m
                .items
                .iter()
                .map(|p| {
                    p.key.as_ref().map_or(0, |k| k.node_count(counts))
                        + p.value.as_ref().map_or(0, |v| v.node_count(counts))
                })
                .sum(),
            Node::Alias(a) => counts
                .iter()
                .rev()
                .find(|(name, _)| *name == a.name)
                .map_or(0, |(_, c)| *c),
        }
    }
}

/// A `%TAG` handle/prefix association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPrefix {
    pub handle: String,
    pub prefix: String,
}

/// A parsed document: contents plus everything resolution discovered.
#[derive(Debug, Clone)]
pub struct Document {
    pub contents: Option<Node>,
    pub errors: Vec<YamlError>,
    pub warnings: Vec<YamlError>,
    /// Anchor names defined in this document, in declaration order.
    pub anchors: Vec<String>,
    pub tag_prefixes: Vec<TagPrefix>,
    /// Version from a `%YAML` directive, if any.
    pub version: Option<Version>,
    /// Whether the source had a `---` directives-end marker.
    pub directives_end: bool,
    /// Comment lines after the contents.
    pub comment: Option<String>,
    pub schema: SchemaId,
    pub options: Options,
}

impl Document {
    pub fn new(options: Options) -> Self {
        Self {
            contents: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            anchors: Vec::new(),
            tag_prefixes: Vec::new(),
            version: None,
            directives_end: false,
            comment: None,
            schema: options.schema,
            options,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The document's effective version: directive first, options second.
    pub fn effective_version(&self) -> Version {
        self.version.unwrap_or(self.options.version)
    }

    /// The configured `anchor_prefix` plus the smallest unused integer
    /// suffix.
    pub fn new_anchor_name(&self) -> String {
        let prefix = &self.options.anchor_prefix;
        let mut n = 1u32;
        loop {
            let name = format!("{prefix}{n}");
            if !self.anchors.iter().any(|a| *a == name) {
                return name;
            }
            n += 1;
        }
    }

    /// Anchor a node so aliases can refer to it, generating a name from
    /// `anchor_prefix` when none is given. Returns the anchor name.
    pub fn set_anchor(&mut self, node: &mut Node, name: Option<String>) -> String {
        let name = name.unwrap_or_else(|| self.new_anchor_name());
        node.set_anchor(Some(name.clone()));
        self.anchors.push(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_count_weighs_children() {
        let seq = Node::Seq(Seq {
            items: vec![
                Node::Scalar(Scalar::new(ScalarValue::Int(1))),
                Node::Scalar(Scalar::new(ScalarValue::Int(2))),
            ],
            ..Seq::default()
        });
        assert_eq!(seq.node_count(&[]), 2);
        assert_eq!(Node::null().node_count(&[]), 1);
    }

    #[test]
    fn test_node_count_follows_alias_weights() {
        let counts = vec![("x".to_string(), 4u64)];
        let alias = Node::Alias(Alias {
            name: "x".to_string(),
            range: None,
        });
        assert_eq!(alias.node_count(&counts), 4);
    }

    #[test]
    fn test_new_anchor_name_skips_taken() {
        let mut doc = Document::new(Options::default());
        doc.anchors.push("a1".to_string());
        assert_eq!(doc.new_anchor_name(), "a2");
        let mut node = Node::null();
        let name = doc.set_anchor(&mut node, None);
        assert_eq!(name, "a2");
        assert_eq!(node.anchor(), Some("a2"));
        assert_eq!(doc.new_anchor_name(), "a3");
    }
}
