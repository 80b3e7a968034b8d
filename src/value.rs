//! Host value representation and conversions to and from the AST.
//!
//! [`Value`] is the crate's native value graph: what [`parse`] returns and
//! what [`stringify`] accepts. The `From` impls below are the capability
//! interface host data uses to enter the document model; [`create_node`]
//! turns a value into an AST node ready for stringification.
//!
//! [`parse`]: crate::parse
//! [`stringify`]: crate::stringify

use crate::compose::is_merge_key;
use crate::cst::ScalarStyle;
use crate::error::YamlError;
use crate::node::{Document, Map, Node, Pair, Scalar, ScalarValue, Seq};
use crate::options::Version;
use crate::schema::{ResolveCtx, Schema};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A host value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Arbitrary-precision integer, produced under `int.as_big_int` or on
    /// `i64` overflow.
    BigInt(BigInt),
    Float(f64),
    String(String),
    /// Decoded `!!binary` payload.
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    /// Ordered map; duplicate keys are representable.
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::BigInt(n) => n.to_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a map entry by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| matches!(k, Value::String(s) if s == key))
            .map(|(_, v)| v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(items: Vec<(Value, Value)>) -> Self {
        Value::Map(items)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl Document {
    /// Convert the document's contents to a host value, resolving aliases
    /// and splicing merge keys.
    pub fn to_value(&self) -> Result<Value, YamlError> {
        let Some(contents) = &self.contents else {
            return Ok(Value::Null);
        };
        let merge = Schema::new(self.schema, &self.options.custom_tags)
            .merge_enabled(self.effective_version());
        let mut env = Env {
            anchors: Vec::new(),
            merge,
        };
        node_to_value(contents, &mut env)
    }
}

struct Env {
    anchors: Vec<(String, Value)>,
    merge: bool,
}

fn node_to_value(node: &Node, env: &mut Env) -> Result<Value, YamlError> {
    match node {
        Node::Scalar(s) => {
            let value = scalar_to_value(&s.value);
            remember_anchor(&s.anchor, &value, env);
            Ok(value)
        }
        Node::Alias(alias) => env
            .anchors
            .iter()
            .rev()
            .find(|(name, _)| *name == alias.name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                YamlError::reference(
                    format!("Aliased anchor not found: {}", alias.name),
                    alias.range.unwrap_or_default(),
                )
            }),
        Node::Seq(seq) => {
            let mut items = Vec::with_capacity(seq.items.len());
            for item in &seq.items {
                items.push(node_to_value(item, env)?);
            }
            let value = Value::Seq(items);
            remember_anchor(&seq.anchor, &value, env);
            Ok(value)
        }
        Node::Map(map) => {
            let value = map_to_value(map, env)?;
            remember_anchor(&map.anchor, &value, env);
            Ok(value)
        }
    }
}

fn remember_anchor(anchor: &Option<String>, value: &Value, env: &mut Env) {
    if let Some(name) = anchor {
        env.anchors.push((name.clone(), value.clone()));
    }
}

fn scalar_to_value(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Bool(b) => Value::Bool(*b),
        ScalarValue::Int(n) => Value::Int(*n),
        ScalarValue::BigInt(n) => Value::BigInt(n.clone()),
        ScalarValue::Float(f) => Value::Float(*f),
        ScalarValue::Str(s) => Value::String(s.clone()),
        ScalarValue::Bytes(b) => Value::Bytes(b.clone()),
    }
}

fn map_to_value(map: &Map, env: &mut Env) -> Result<Value, YamlError> {
    let mut entries: Vec<(Value, Value)> = Vec::with_capacity(map.items.len());
    let mut merges: Vec<Value> = Vec::new();
    for pair in &map.items {
        if env.merge && is_merge_key(pair.key.as_ref()) {
            if let Some(value) = &pair.value {
                match value {
                    Node::Seq(seq) => {
                        for item in &seq.items {
                            merges.push(node_to_value(item, env)?);
                        }
                    }
                    other => merges.push(node_to_value(other, env)?),
                }
            }
            continue;
        }
        let key = match &pair.key {
            Some(k) => node_to_value(k, env)?,
            None => Value::Null,
        };
        let value = match &pair.value {
            Some(v) => node_to_value(v, env)?,
            None => Value::Null,
        };
        entries.push((key, value));
    }
    // Merged maps splice in source order; explicit keys always win and an
    // earlier merge wins over a later one.
    for merged in merges {
        if let Value::Map(pairs) = merged {
            for (k, v) in pairs {
                if !entries.iter().any(|(existing, _)| *existing == k) {
                    entries.push((k, v));
                }
            }
        }
    }
    Ok(Value::Map(entries))
}

/// Build an AST node from a host value.
///
/// With `wrap_scalars`, strings that would implicitly resolve to another
/// type under the core schema are marked for quoting so they round-trip as
/// strings; without it the caller vouches for their plainness. The optional
/// `tag` applies to the produced node.
pub fn create_node(value: &Value, wrap_scalars: bool, tag: Option<&str>) -> Node {
    let mut node = match value {
        Value::Null => Node::Scalar(Scalar::new(ScalarValue::Null)),
        Value::Bool(b) => Node::Scalar(Scalar::new(ScalarValue::Bool(*b))),
        Value::Int(n) => Node::Scalar(Scalar::new(ScalarValue::Int(*n))),
        Value::BigInt(n) => Node::Scalar(Scalar::new(ScalarValue::BigInt(n.clone()))),
        Value::Float(f) => Node::Scalar(Scalar::new(ScalarValue::Float(*f))),
        Value::String(s) => {
            let mut scalar = Scalar::new(ScalarValue::Str(s.clone()));
            if wrap_scalars && !plain_safe(s) {
                scalar.style = ScalarStyle::QuoteDouble;
            }
            Node::Scalar(scalar)
        }
        Value::Bytes(b) => {
            let mut scalar = Scalar::new(ScalarValue::Bytes(b.clone()));
            scalar.tag = Some(crate::schema::default_tag("binary"));
            scalar.style = ScalarStyle::BlockLiteral;
            Node::Scalar(scalar)
        }
        Value::Seq(items) => Node::Seq(Seq {
            items: items
                .iter()
                .map(|v| create_node(v, wrap_scalars, None))
                .collect(),
            ..Seq::default()
        }),
        Value::Map(items) => Node::Map(Map {
            items: items
                .iter()
                .map(|(k, v)| {
                    Pair::new(
                        Some(create_node(k, wrap_scalars, None)),
                        Some(create_node(v, wrap_scalars, None)),
                    )
                })
                .collect(),
            ..Map::default()
        }),
    };
    if let Some(uri) = tag {
        match &mut node {
            Node::Scalar(s) => s.tag = Some(uri.to_string()),
            Node::Map(m) => m.tag = Some(uri.to_string()),
            Node::Seq(s) => s.tag = Some(uri.to_string()),
            Node::Alias(_) => {}
        }
    }
    node
}

/// Whether a string stays a string when emitted plain under core rules.
fn plain_safe(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let schema = Schema::new(crate::options::SchemaId::Core, &[]);
    let ctx = ResolveCtx {
        version: Version::V1_2,
        as_big_int: false,
    };
    matches!(schema.resolve_plain(s, &ctx).0, ScalarValue::Str(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::parse_document;

    fn to_value(src: &str) -> Value {
        let doc = parse_document(src, &Options::default());
        assert!(doc.errors.is_empty(), "errors: {:#?}", doc.errors);
        doc.to_value().unwrap()
    }

    #[test]
    fn test_scalar_values() {
        assert_eq!(to_value("42"), Value::Int(42));
        assert_eq!(to_value("text"), Value::String("text".to_string()));
        assert_eq!(to_value("~"), Value::Null);
        assert_eq!(to_value(""), Value::Null);
    }

    #[test]
    fn test_collection_values() {
        let v = to_value("a: 1\nb: [x, y]\n");
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        let seq = v.get("b").unwrap().as_seq().unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0], Value::String("x".to_string()));
    }

    #[test]
    fn test_alias_expansion() {
        let v = to_value("a: &x [1, 2]\nb: *x\nc: *x\n");
        assert_eq!(v.get("b"), v.get("c"));
        assert_eq!(
            v.get("b").unwrap(),
            &Value::Seq(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_merge_splices_maps() {
        let mut options = Options::default();
        options.schema = crate::options::SchemaId::Yaml11;
        let doc = parse_document("base: &b {x: 1, y: 2}\nderived:\n  <<: *b\n  y: 9\n", &options);
        assert!(doc.errors.is_empty(), "errors: {:#?}", doc.errors);
        let v = doc.to_value().unwrap();
        let derived = v.get("derived").unwrap();
        // The explicit key wins; the merged key fills the gap.
        assert_eq!(derived.get("y"), Some(&Value::Int(9)));
        assert_eq!(derived.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_create_node_round_trip_shapes() {
        let value = Value::Map(vec![
            (Value::from("name"), Value::from("demo")),
            (
                Value::from("sizes"),
                Value::Seq(vec![Value::Int(1), Value::Int(2)]),
            ),
        ]);
        let node = create_node(&value, true, None);
        let map = node.as_map().unwrap();
        assert_eq!(map.items.len(), 2);
    }

    #[test]
    fn test_create_node_quotes_ambiguous_strings() {
        let node = create_node(&Value::from("true"), true, None);
        let scalar = node.as_scalar().unwrap();
        assert_eq!(scalar.style, ScalarStyle::QuoteDouble);
        let node = create_node(&Value::from("plain words"), true, None);
        assert_eq!(node.as_scalar().unwrap().style, ScalarStyle::Plain);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::BigInt(BigInt::from(7)).as_i64(), Some(7));
        assert!(Value::Null.is_null());
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::from("s").as_str(), Some("s"));
    }
}
