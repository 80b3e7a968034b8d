//! The composer: CST documents into typed AST documents.
//!
//! Applies directives, expands tag shorthands through the document's prefix
//! table, resolves scalars under the active schema, tracks anchors and
//! aliases (with the alias-expansion guard), validates merge keys, and
//! warns on duplicate mapping keys. Diagnostics accumulate on the document;
//! nothing here aborts.

use crate::cst::{CstDocument, CstKind, CstNode, Props, ScalarStyle, TagToken};
use crate::error::YamlError;
use crate::node::{Alias, Document, Map, Node, Pair, Scalar, ScalarValue, Seq, TagPrefix};
use crate::options::{Options, SchemaId, Version};
use crate::schema::{default_tag, NodeClass, ResolveCtx, Schema, DEFAULT_TAG_PREFIX};
use crate::source::{Range, SourceMap};
use log::debug;

/// Resolve one CST document into an AST document.
pub fn compose_document(
    cst: &CstDocument,
    src: &str,
    map: &SourceMap,
    options: &Options,
) -> Document {
    let mut doc = Document::new(options.clone());
    doc.directives_end = cst.directives_end;
    if !cst.end_comments.is_empty() {
        doc.comment = Some(cst.end_comments.join("\n"));
    }
    for err in &cst.errors {
        if err.is_warning() {
            doc.warnings.push(err.clone());
        } else {
            doc.errors.push(err.clone());
        }
    }

    apply_directives(cst, &mut doc);

    let schema = Schema::new(doc.schema, &options.custom_tags);
    let version = doc.effective_version();
    let mut ctx = Composer {
        schema,
        rctx: ResolveCtx {
            version,
            as_big_int: options.scalar.int.as_big_int,
        },
        merge: false,
        max_alias: options.max_alias_count,
        anchors: Vec::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
        tag_prefixes: doc.tag_prefixes.clone(),
    };
    ctx.merge = ctx.schema.merge_enabled(version);

    if let Some(contents) = &cst.contents {
        debug!(
            "resolving document contents under the {} schema",
            ctx.schema.id.name()
        );
        doc.contents = Some(ctx.resolve(contents));
    }

    doc.anchors = ctx.anchors.iter().map(|a| a.name.clone()).collect();
    doc.errors.extend(ctx.errors);
    doc.warnings.extend(ctx.warnings);

    if options.pretty_errors {
        for err in doc.errors.iter_mut().chain(doc.warnings.iter_mut()) {
            err.prettify(src, map);
        }
    }
    doc
}

fn apply_directives(cst: &CstDocument, doc: &mut Document) {
    for directive in &cst.directives {
        match directive.name.as_str() {
            "YAML" => {
                let Some(arg) = directive.args.first() else {
                    doc.errors.push(YamlError::semantic(
                        "Insufficient parameters given for %YAML directive",
                        directive.range,
                    ));
                    continue;
                };
                doc.version = Some(match arg.as_str() {
                    "1.0" => Version::V1_0,
                    "1.1" => Version::V1_1,
                    "1.2" => Version::V1_2,
                    other => {
                        doc.warnings.push(YamlError::warning(
                            format!("Unsupported YAML version: {other}"),
                            directive.range,
                        ));
                        Version::V1_2
                    }
                });
                if doc.version == Some(Version::V1_0) || doc.version == Some(Version::V1_1) {
                    doc.schema = match doc.options.schema {
                        SchemaId::Core => SchemaId::Yaml11,
                        other => other,
                    };
                }
            }
            "TAG" => {
                if directive.args.len() < 2 {
                    doc.errors.push(YamlError::semantic(
                        "Insufficient parameters given for %TAG directive",
                        directive.range,
                    ));
                    continue;
                }
                doc.tag_prefixes.push(TagPrefix {
                    handle: directive.args[0].clone(),
                    prefix: directive.args[1].clone(),
                });
            }
            _ => {} // unknown directives already warned about by the scanner
        }
    }
    if !cst.directives.is_empty() && !cst.directives_end {
        let range = cst.directives.last().map(|d| d.range).unwrap_or(cst.range);
        doc.errors.push(YamlError::semantic(
            "Missing directives-end indicator line",
            range,
        ));
    }
}

/// What kind of node an anchor points at, for merge validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorShape {
    Scalar,
    Map,
    Seq,
}

#[derive(Debug, Clone)]
struct AnchorEntry {
    name: String,
    /// Node count of the anchored subtree; the cost an alias pays.
    count: u64,
    shape: AnchorShape,
}

struct Composer {
    schema: Schema,
    rctx: ResolveCtx,
    merge: bool,
    max_alias: i64,
    anchors: Vec<AnchorEntry>,
    errors: Vec<YamlError>,
    warnings: Vec<YamlError>,
    tag_prefixes: Vec<TagPrefix>,
}

/// An explicit tag after prefix expansion.
enum ResolvedTag {
    /// `!` alone: force the by-shape default.
    NonSpecific,
    Uri(String),
}

impl Composer {
    fn resolve(&mut self, node: &CstNode) -> Node {
        match &node.kind {
            CstKind::Alias(name) => self.resolve_alias(name, node),
            CstKind::Scalar { style, value } => self.resolve_scalar(*style, value, node),
            CstKind::BlockMap(items) => self.resolve_map(items, node, false),
            CstKind::FlowMap(items) => self.resolve_map(items, node, true),
            CstKind::BlockSeq(items) => {
                let resolved: Vec<Node> = items
                    .iter()
                    .map(|item| match item {
                        Some(n) => self.resolve(n),
                        None => Node::null(),
                    })
                    .collect();
                self.finish_seq(resolved, node, false)
            }
            CstKind::FlowSeq(items) => {
                let resolved: Vec<Node> = items.iter().map(|n| self.resolve(n)).collect();
                self.finish_seq(resolved, node, true)
            }
        }
    }

    fn resolve_alias(&mut self, name: &str, cst: &CstNode) -> Node {
        let count = self
            .anchors
            .iter()
            .rev()
            .find(|a| a.name == name)
            .map(|a| a.count);
        let Some(count) = count else {
            self.errors.push(
                YamlError::reference(
                    format!("Aliased anchor not found: {name}"),
                    cst.range,
                )
                .on("ALIAS"),
            );
            return self.with_comments(Node::null(), &cst.props, cst.range);
        };
        if self.max_alias >= 0 && count > self.max_alias as u64 {
            self.errors.push(
                YamlError::reference("Excessive alias count", cst.range).on("ALIAS"),
            );
            return self.with_comments(Node::null(), &cst.props, cst.range);
        }
        let node = Node::Alias(Alias {
            name: name.to_string(),
            range: Some(cst.range),
        });
        self.with_comments(node, &cst.props, cst.range)
    }

    fn resolve_scalar(&mut self, style: ScalarStyle, value: &str, cst: &CstNode) -> Node {
        // A zero-width plain scalar stands in for an absent value.
        let (resolved, tag) = if style == ScalarStyle::Plain && cst.range.is_empty() {
            (ScalarValue::Null, None)
        } else {
            match self.explicit_tag(&cst.props) {
                Some(ResolvedTag::NonSpecific) => (ScalarValue::Str(value.to_string()), None),
                Some(ResolvedTag::Uri(uri)) => {
                    let v = self.resolve_tagged_scalar(&uri, value, cst);
                    (v, Some(uri))
                }
                None => {
                    if style == ScalarStyle::Plain {
                        let (v, _uri) = self.schema.resolve_plain(value, &self.rctx);
                        (v, None)
                    } else {
                        (ScalarValue::Str(value.to_string()), None)
                    }
                }
            }
        };
        let mut scalar = Scalar::new(resolved);
        scalar.style = style;
        scalar.tag = tag;
        scalar.range = Some(cst.range);
        let node = Node::Scalar(scalar);
        self.finish(node, cst)
    }

    fn resolve_tagged_scalar(&mut self, uri: &str, value: &str, cst: &CstNode) -> ScalarValue {
        let resolve = match self.schema.find(uri, NodeClass::Scalar) {
            Some(tag) => tag.resolve,
            None => {
                self.unavailable_tag_warning(uri, "str", cst);
                return ScalarValue::Str(value.to_string());
            }
        };
        let Some(resolve) = resolve else {
            return ScalarValue::Str(value.to_string());
        };
        match resolve(value, &self.rctx) {
            Ok(v) => v,
            Err(msg) => {
                self.warnings.push(YamlError::warning(msg, cst.range));
                ScalarValue::Str(value.to_string())
            }
        }
    }

    fn resolve_map(&mut self, items: &[crate::cst::MapItem], cst: &CstNode, flow: bool) -> Node {
        let mut pairs = Vec::with_capacity(items.len());
        for item in items {
            let key = item.key.as_ref().map(|k| self.resolve(k));
            let value = item.value.as_ref().map(|v| self.resolve(v));
            pairs.push(Pair::new(key, value));
        }
        self.check_duplicate_keys(&pairs);
        if self.merge {
            self.check_merge_pairs(&pairs);
        }
        let tag = match self.explicit_tag(&cst.props) {
            Some(ResolvedTag::NonSpecific) | None => None,
            Some(ResolvedTag::Uri(uri)) => {
                if self.schema.find(&uri, NodeClass::Map).is_none() {
                    self.unavailable_tag_warning(&uri, "map", cst);
                    None
                } else {
                    if uri == default_tag("set") {
                        self.check_set_shape(&pairs, cst);
                    }
                    (uri != default_tag("map")).then_some(uri)
                }
            }
        };
        let map = Map {
            items: pairs,
            flow,
            tag,
            range: Some(cst.range),
            ..Map::default()
        };
        self.finish(Node::Map(map), cst)
    }

    fn finish_seq(&mut self, items: Vec<Node>, cst: &CstNode, flow: bool) -> Node {
        let tag = match self.explicit_tag(&cst.props) {
            Some(ResolvedTag::NonSpecific) | None => None,
            Some(ResolvedTag::Uri(uri)) => {
                if self.schema.find(&uri, NodeClass::Seq).is_none() {
                    self.unavailable_tag_warning(&uri, "seq", cst);
                    None
                } else {
                    if uri == default_tag("omap") || uri == default_tag("pairs") {
                        self.check_pairs_shape(&items, &uri, cst);
                    }
                    (uri != default_tag("seq")).then_some(uri)
                }
            }
        };
        let seq = Seq {
            items,
            flow,
            tag,
            range: Some(cst.range),
            ..Seq::default()
        };
        self.finish(Node::Seq(seq), cst)
    }

    /// Attach props and register the node's anchor once its subtree is
    /// resolved. Registration order makes an alias inside its own anchor's
    /// subtree unresolvable, which is what rejects reference cycles.
    fn finish(&mut self, node: Node, cst: &CstNode) -> Node {
        let mut node = self.with_comments(node, &cst.props, cst.range);
        if let Some(name) = &cst.props.anchor {
            node.set_anchor(Some(name.clone()));
            let shape = match &node {
                Node::Map(_) => AnchorShape::Map,
                Node::Seq(_) => AnchorShape::Seq,
                _ => AnchorShape::Scalar,
            };
            let count = {
                let counts: Vec<(String, u64)> = self
                    .anchors
                    .iter()
                    .map(|a| (a.name.clone(), a.count))
                    .collect();
                node.node_count(&counts)
            };
            self.anchors.push(AnchorEntry {
                name: name.clone(),
                count,
                shape,
            });
        }
        node
    }

    fn with_comments(&mut self, mut node: Node, props: &Props, _range: Range) -> Node {
        let before = if props.comments_before.is_empty() {
            None
        } else {
            Some(props.comments_before.join("\n"))
        };
        let comment = props.comment.clone();
        match &mut node {
            Node::Scalar(s) => {
                s.comment_before = before;
                s.comment = comment;
            }
            Node::Map(m) => {
                m.comment_before = before;
                m.comment = comment;
            }
            Node::Seq(s) => {
                s.comment_before = before;
                s.comment = comment;
            }
            Node::Alias(_) => {}
        }
        node
    }

    /// Expand an explicit tag token through the prefix table.
    fn explicit_tag(&mut self, props: &Props) -> Option<ResolvedTag> {
        let token = props.tag.as_ref()?;
        let range = props.tag_range.unwrap_or_default();
        match token {
            TagToken::NonSpecific => Some(ResolvedTag::NonSpecific),
            TagToken::Verbatim(uri) => Some(ResolvedTag::Uri(uri.clone())),
            TagToken::Shorthand { handle, suffix } => {
                let prefix = self
                    .tag_prefixes
                    .iter()
                    .rev()
                    .find(|p| p.handle == *handle)
                    .map(|p| p.prefix.clone())
                    .or_else(|| match handle.as_str() {
                        "!!" => Some(DEFAULT_TAG_PREFIX.to_string()),
                        "!" => Some("!".to_string()),
                        _ => None,
                    });
                match prefix {
                    Some(prefix) => Some(ResolvedTag::Uri(format!("{prefix}{suffix}"))),
                    None => {
                        self.warnings.push(YamlError::warning(
                            format!(
                                "The {handle} tag handle is non-default and was not declared in a %TAG directive"
                            ),
                            range,
                        ));
                        Some(ResolvedTag::NonSpecific)
                    }
                }
            }
        }
    }

    fn unavailable_tag_warning(&mut self, uri: &str, fallback: &str, cst: &CstNode) {
        self.warnings.push(YamlError::warning(
            format!(
                "tag {} is unavailable, falling back to {}",
                display_tag(uri),
                default_tag(fallback)
            ),
            cst.range,
        ));
    }

    fn check_duplicate_keys(&mut self, pairs: &[Pair]) {
        for (i, pair) in pairs.iter().enumerate() {
            let Some(key) = &pair.key else { continue };
            for earlier in &pairs[..i] {
                let Some(other) = &earlier.key else { continue };
                if nodes_equal(key, other) {
                    self.warnings.push(
                        YamlError::warning(
                            format!(
                                "Map keys must be unique; \"{}\" is repeated",
                                key_display(key)
                            ),
                            key.range().unwrap_or_default(),
                        )
                        .on("MAP"),
                    );
                    break;
                }
            }
        }
    }

    /// Merge values must be aliases (or sequences of aliases) pointing at
    /// mappings.
    fn check_merge_pairs(&mut self, pairs: &[Pair]) {
        for pair in pairs {
            if !is_merge_key(pair.key.as_ref()) {
                continue;
            }
            let aliases: Vec<&Alias> = match &pair.value {
                Some(Node::Alias(a)) => vec![a],
                Some(Node::Seq(seq)) => seq
                    .items
                    .iter()
                    .filter_map(|n| match n {
                        Node::Alias(a) => Some(a),
                        _ => None,
                    })
                    .collect(),
                _ => {
                    self.errors.push(YamlError::reference(
                        "Merge nodes can only have alias values",
                        pair.value
                            .as_ref()
                            .and_then(|v| v.range())
                            .unwrap_or_default(),
                    ));
                    continue;
                }
            };
            if let Some(Node::Seq(seq)) = &pair.value {
                if aliases.len() != seq.items.len() {
                    self.errors.push(YamlError::reference(
                        "Merge nodes can only have alias values",
                        seq.range.unwrap_or_default(),
                    ));
                }
            }
            for alias in aliases {
                let shape = self
                    .anchors
                    .iter()
                    .rev()
                    .find(|a| a.name == alias.name)
                    .map(|a| a.shape);
                if shape != Some(AnchorShape::Map) {
                    self.errors.push(YamlError::reference(
                        "Merge nodes aliases can only point to maps",
                        alias.range.unwrap_or_default(),
                    ));
                }
            }
        }
    }

    fn check_set_shape(&mut self, pairs: &[Pair], cst: &CstNode) {
        let ok = pairs.iter().all(|p| match &p.value {
            None => true,
            Some(Node::Scalar(s)) => s.value.is_null(),
            _ => false,
        });
        if !ok {
            self.errors.push(YamlError::semantic(
                "Set items must all have null values",
                cst.range,
            ));
        }
    }

    fn check_pairs_shape(&mut self, items: &[Node], uri: &str, cst: &CstNode) {
        let ok = items.iter().all(|n| match n {
            Node::Map(m) => m.items.len() == 1,
            _ => false,
        });
        if !ok {
            self.errors.push(YamlError::semantic(
                format!(
                    "Each {} item must be a map with a single key",
                    display_tag(uri)
                ),
                cst.range,
            ));
        }
    }
}

/// Whether a resolved key is the YAML 1.1 `<<` merge marker.
pub fn is_merge_key(key: Option<&Node>) -> bool {
    match key {
        Some(Node::Scalar(s)) => {
            s.style == ScalarStyle::Plain
                && matches!(&s.value, ScalarValue::Str(t) if t == "<<")
        }
        _ => false,
    }
}

/// Structural equality on resolved nodes, for duplicate-key detection.
pub fn nodes_equal(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::Scalar(x), Node::Scalar(y)) => x.value == y.value,
        (Node::Alias(x), Node::Alias(y)) => x.name == y.name,
        (Node::Seq(x), Node::Seq(y)) => {
            x.items.len() == y.items.len()
                && x.items.iter().zip(&y.items).all(|(m, n)| nodes_equal(m, n))
        }
        (Node::Map(x), Node::Map(y)) => {
            x.items.len() == y.items.len()
                && x.items.iter().zip(&y.items).all(|(p, q)| {
                    opt_equal(p.key.as_ref(), q.key.as_ref())
                        && opt_equal(p.value.as_ref(), q.value.as_ref())
                })
        }
        _ => false,
    }
}

fn opt_equal(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => nodes_equal(x, y),
        _ => false,
    }
}

fn key_display(key: &Node) -> String {
    match key {
        Node::Scalar(s) => match &s.value {
            ScalarValue::Str(t) => t.clone(),
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::BigInt(n) => n.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::Bytes(_) => "<binary>".to_string(),
        },
        Node::Alias(a) => format!("*{}", a.name),
        Node::Map(_) => "{...}".to_string(),
        Node::Seq(_) => "[...]".to_string(),
    }
}

fn display_tag(uri: &str) -> String {
    match uri.strip_prefix(DEFAULT_TAG_PREFIX) {
        Some(short) => format!("!!{short}"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::parse_cst;

    fn compose(src: &str) -> Document {
        compose_with(src, &Options::default())
    }

    fn compose_with(src: &str, options: &Options) -> Document {
        let docs = parse_cst(src);
        let map = SourceMap::new(src);
        compose_document(&docs[0], src, &map, options)
    }

    fn scalar(node: &Node) -> &Scalar {
        node.as_scalar().expect("expected scalar")
    }

    #[test]
    fn test_implicit_typing_under_core() {
        let doc = compose("a: 42\nb: true\nc: ~\nd: text\n");
        let map = doc.contents.as_ref().unwrap().as_map().unwrap();
        assert_eq!(scalar(map.items[0].value.as_ref().unwrap()).value, ScalarValue::Int(42));
        assert_eq!(
            scalar(map.items[1].value.as_ref().unwrap()).value,
            ScalarValue::Bool(true)
        );
        assert_eq!(scalar(map.items[2].value.as_ref().unwrap()).value, ScalarValue::Null);
        assert_eq!(
            scalar(map.items[3].value.as_ref().unwrap()).value,
            ScalarValue::Str("text".to_string())
        );
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_quoted_scalars_stay_strings() {
        let doc = compose("a: \"42\"\nb: 'true'\n");
        let map = doc.contents.as_ref().unwrap().as_map().unwrap();
        assert_eq!(
            scalar(map.items[0].value.as_ref().unwrap()).value,
            ScalarValue::Str("42".to_string())
        );
        assert_eq!(
            scalar(map.items[1].value.as_ref().unwrap()).value,
            ScalarValue::Str("true".to_string())
        );
    }

    #[test]
    fn test_explicit_tag_resolution() {
        let doc = compose("!!str 42");
        let s = scalar(doc.contents.as_ref().unwrap());
        assert_eq!(s.value, ScalarValue::Str("42".to_string()));
        assert_eq!(s.tag.as_deref(), Some("tag:yaml.org,2002:str"));
    }

    #[test]
    fn test_unknown_tag_falls_back_with_warning() {
        let doc = compose("!foo bar");
        let s = scalar(doc.contents.as_ref().unwrap());
        assert_eq!(s.value, ScalarValue::Str("bar".to_string()));
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0]
            .message
            .contains("tag !foo is unavailable, falling back to tag:yaml.org,2002:str"));
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_tag_prefix_expansion() {
        let doc = compose("%TAG !e! tag:example.com,2000:app/\n---\n!e!thing data\n");
        let s = scalar(doc.contents.as_ref().unwrap());
        assert_eq!(doc.tag_prefixes.len(), 1);
        // The expanded tag is unknown to the schema, so it warns and the
        // value falls back to a string.
        assert_eq!(s.value, ScalarValue::Str("data".to_string()));
        assert!(doc
            .warnings
            .iter()
            .any(|w| w.message.contains("tag:example.com,2000:app/thing")));
    }

    #[test]
    fn test_undeclared_handle_warns() {
        let doc = compose("!x!thing data");
        assert!(doc
            .warnings
            .iter()
            .any(|w| w.message.contains("!x!") && w.message.contains("%TAG")));
    }

    #[test]
    fn test_anchor_and_alias_resolution() {
        let doc = compose("a: &x [1, 2]\nb: *x\n");
        assert!(doc.errors.is_empty(), "errors: {:#?}", doc.errors);
        assert_eq!(doc.anchors, vec!["x".to_string()]);
        let map = doc.contents.as_ref().unwrap().as_map().unwrap();
        assert!(map.items[1].value.as_ref().unwrap().is_alias());
    }

    #[test]
    fn test_unresolved_alias_is_reference_error() {
        let doc = compose("a: *nope\n");
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(doc.errors[0].kind, crate::error::ErrorKind::Reference);
        // Best-effort AST substitutes a null scalar.
        let map = doc.contents.as_ref().unwrap().as_map().unwrap();
        assert_eq!(
            scalar(map.items[0].value.as_ref().unwrap()).value,
            ScalarValue::Null
        );
    }

    #[test]
    fn test_alias_before_anchor_in_own_subtree() {
        // The anchor only registers after its subtree resolves, so a
        // self-referential alias cannot resolve.
        let doc = compose("&a [*a]\n");
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(doc.errors[0].kind, crate::error::ErrorKind::Reference);
    }

    #[test]
    fn test_alias_cost_guard() {
        let mut options = Options::default();
        options.max_alias_count = 2;
        options.pretty_errors = false;
        // Each alias costs the target's node count: [1, 2] counts 2, which
        // does not exceed 2, so both aliases are fine.
        let doc = compose_with("a: &x [1,2]\nb: *x\nc: *x\n", &options);
        assert!(doc.errors.is_empty(), "errors: {:#?}", doc.errors);
        // A doubling chain blows past the limit.
        let doc = compose_with(
            "a: &a [1, 1]\nb: &b [*a, *a]\nc: &c [*b, *b]\nd: *c\n",
            &options,
        );
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("Excessive alias count")));
    }

    #[test]
    fn test_max_alias_count_zero_rejects_aliases() {
        let mut options = Options::default();
        options.max_alias_count = 0;
        let doc = compose_with("a: &x 1\nb: *x\n", &options);
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("Excessive alias count")));
    }

    #[test]
    fn test_max_alias_count_disabled() {
        let mut options = Options::default();
        options.max_alias_count = -1;
        let doc = compose_with("a: &x [1,2,3,4,5]\nb: *x\nc: *x\n", &options);
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_duplicate_keys_warn_but_are_preserved() {
        let doc = compose("a: 1\nb: 2\na: 3\n");
        let map = doc.contents.as_ref().unwrap().as_map().unwrap();
        assert_eq!(map.items.len(), 3);
        assert!(doc
            .warnings
            .iter()
            .any(|w| w.message.contains("must be unique")));
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_merge_validation_under_yaml11() {
        let mut options = Options::default();
        options.schema = SchemaId::Yaml11;
        let ok = compose_with("base: &b {x: 1}\nderived:\n  <<: *b\n  y: 2\n", &options);
        assert!(ok.errors.is_empty(), "errors: {:#?}", ok.errors);
        let bad = compose_with("base: &b [1]\nderived:\n  <<: *b\n", &options);
        assert!(bad
            .errors
            .iter()
            .any(|e| e.message.contains("point to maps")));
    }

    #[test]
    fn test_merge_ignored_under_core_1_2() {
        let doc = compose("derived:\n  <<: plain\n");
        // `<<` is just an ordinary key under core/1.2.
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_version_directive() {
        let doc = compose("%YAML 1.1\n---\nyes\n");
        assert_eq!(doc.version, Some(Version::V1_1));
        let s = scalar(doc.contents.as_ref().unwrap());
        assert_eq!(s.value, ScalarValue::Bool(true));
    }

    #[test]
    fn test_unknown_version_warns_and_acts_as_1_2() {
        let doc = compose("%YAML 1.9\n---\nyes\n");
        assert!(doc.warnings.iter().any(|w| w.message.contains("1.9")));
        let s = scalar(doc.contents.as_ref().unwrap());
        assert_eq!(s.value, ScalarValue::Str("yes".to_string()));
    }

    #[test]
    fn test_directives_without_document_marker() {
        let doc = compose("%YAML 1.2\n");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("directives-end")));
    }

    #[test]
    fn test_binary_tag() {
        let mut options = Options::default();
        options.schema = SchemaId::Yaml11;
        let doc = compose_with("!!binary \"aGVsbG8=\"\n", &options);
        let s = scalar(doc.contents.as_ref().unwrap());
        assert_eq!(s.value, ScalarValue::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn test_pretty_errors_resolve_positions() {
        let doc = compose("{ , }");
        assert_eq!(doc.errors.len(), 1);
        let lp = doc.errors[0].line_pos.expect("line_pos resolved");
        assert_eq!(lp.start.line, 1);
        assert_eq!(lp.start.col, 3);
        assert_eq!(lp.end.col, 4);
    }

    #[test]
    fn test_pretty_errors_off_keeps_raw_message() {
        let mut options = Options::default();
        options.pretty_errors = false;
        let doc = compose_with("{ , }", &options);
        assert!(doc.errors[0].line_pos.is_none());
        assert!(!doc.errors[0].message.contains("at line"));
    }
}
