//! Schema registry: tag resolvers for implicit and explicit typing.
//!
//! A schema is an ordered list of [`Tag`] resolvers. Each declares the tag
//! URI, the node kinds it accepts, a `test` predicate for implicit
//! resolution of plain scalars, and a `resolve` function producing the typed
//! value. Resolvers are tried in registration order; the first whose test
//! matches wins, and anything unmatched falls back to `str`.
//!
//! Built-ins: `failsafe` (str/map/seq), `json` (strict scalar syntax),
//! `core` (permissive forms), `yaml-1.1` (binary, timestamp, omap, pairs,
//! set, merge). Custom tags extend any of them.

use crate::cst::ScalarStyle;
use crate::node::ScalarValue;
use crate::options::{SchemaId, Version};
use base64::prelude::*;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// The default tag prefix all `!!` shorthands expand under.
pub const DEFAULT_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Expand a `!!short` name to its full URI.
pub fn default_tag(short: &str) -> String {
    format!("{DEFAULT_TAG_PREFIX}{short}")
}

/// Node kinds a tag can apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Scalar,
    Map,
    Seq,
}

/// Context threaded into tag tests and resolvers.
#[derive(Debug, Clone, Copy)]
pub struct ResolveCtx {
    pub version: Version,
    pub as_big_int: bool,
}

impl ResolveCtx {
    fn legacy(&self) -> bool {
        matches!(self.version, Version::V1_0 | Version::V1_1)
    }
}

/// A tag resolver.
#[derive(Debug, Clone)]
pub struct Tag {
    /// Full URI (`tag:yaml.org,2002:int`) or local form (`!foo`).
    pub uri: String,
    pub kind: NodeClass,
    /// Implicit-resolution predicate on raw plain-scalar text. `None` means
    /// the tag only applies explicitly.
    pub test: Option<fn(&str, &ResolveCtx) -> bool>,
    /// Scalar resolution; `None` for collection tags.
    pub resolve: Option<fn(&str, &ResolveCtx) -> Result<ScalarValue, String>>,
    pub default_style: ScalarStyle,
}

impl Tag {
    fn scalar(
        uri: String,
        test: Option<fn(&str, &ResolveCtx) -> bool>,
        resolve: fn(&str, &ResolveCtx) -> Result<ScalarValue, String>,
    ) -> Self {
        Self {
            uri,
            kind: NodeClass::Scalar,
            test,
            resolve: Some(resolve),
            default_style: ScalarStyle::Plain,
        }
    }

    fn collection(uri: String, kind: NodeClass) -> Self {
        Self {
            uri,
            kind,
            test: None,
            resolve: None,
            default_style: ScalarStyle::Plain,
        }
    }
}

/// An ordered resolver table.
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: SchemaId,
    pub tags: Vec<Tag>,
}

impl Schema {
    /// Build a schema, appending any custom tags after the built-ins.
    pub fn new(id: SchemaId, custom: &[Tag]) -> Self {
        let mut tags = match id {
            SchemaId::Failsafe => failsafe_tags(),
            SchemaId::Json => json_tags(),
            SchemaId::Core => core_tags(),
            SchemaId::Yaml11 => yaml11_tags(),
        };
        tags.extend_from_slice(custom);
        Self { id, tags }
    }

    /// Implicitly resolve a plain scalar: first matching test wins, `str`
    /// is the fallback. Returns the value and the winning tag URI.
    pub fn resolve_plain(&self, text: &str, ctx: &ResolveCtx) -> (ScalarValue, String) {
        for tag in &self.tags {
            if tag.kind != NodeClass::Scalar {
                continue;
            }
            let (Some(test), Some(resolve)) = (tag.test, tag.resolve) else {
                continue;
            };
            if test(text, ctx) {
                if let Ok(value) = resolve(text, ctx) {
                    return (value, tag.uri.clone());
                }
            }
        }
        (ScalarValue::Str(text.to_string()), default_tag("str"))
    }

    /// Find a tag by URI and node kind.
    pub fn find(&self, uri: &str, kind: NodeClass) -> Option<&Tag> {
        self.tags.iter().find(|t| t.uri == uri && t.kind == kind)
    }

    /// Whether `<<` merge keys are honoured: YAML-1.1 semantics, enabled by
    /// the yaml-1.1 schema or a pre-1.2 document version.
    pub fn merge_enabled(&self, version: Version) -> bool {
        self.id == SchemaId::Yaml11 || matches!(version, Version::V1_0 | Version::V1_1)
    }
}

// =============================================================================
// Built-in tag tables
// =============================================================================

fn str_tag() -> Tag {
    Tag::scalar(default_tag("str"), None, |s, _| {
        Ok(ScalarValue::Str(s.to_string()))
    })
}

fn failsafe_tags() -> Vec<Tag> {
    vec![
        Tag::collection(default_tag("map"), NodeClass::Map),
        Tag::collection(default_tag("seq"), NodeClass::Seq),
        str_tag(),
    ]
}

fn json_tags() -> Vec<Tag> {
    let mut tags = vec![
        Tag::collection(default_tag("map"), NodeClass::Map),
        Tag::collection(default_tag("seq"), NodeClass::Seq),
        Tag::scalar(default_tag("null"), Some(|s, _| s == "null"), |_, _| {
            Ok(ScalarValue::Null)
        }),
        Tag::scalar(
            default_tag("bool"),
            Some(|s, _| s == "true" || s == "false"),
            |s, _| Ok(ScalarValue::Bool(s == "true")),
        ),
        Tag::scalar(
            default_tag("int"),
            Some(|s, _| is_json_int(s)),
            resolve_decimal_int,
        ),
        Tag::scalar(
            default_tag("float"),
            Some(|s, _| is_json_float(s)),
            resolve_float,
        ),
    ];
    tags.push(str_tag());
    tags
}

fn core_tags() -> Vec<Tag> {
    let mut tags = vec![
        Tag::collection(default_tag("map"), NodeClass::Map),
        Tag::collection(default_tag("seq"), NodeClass::Seq),
        Tag::scalar(default_tag("null"), Some(|s, _| is_core_null(s)), |_, _| {
            Ok(ScalarValue::Null)
        }),
        Tag::scalar(
            default_tag("bool"),
            Some(is_core_bool),
            resolve_permissive_bool,
        ),
        Tag::scalar(default_tag("int"), Some(|s, _| is_core_int(s)), resolve_int),
        Tag::scalar(
            default_tag("float"),
            Some(|s, _| is_core_float(s)),
            resolve_float,
        ),
    ];
    tags.push(str_tag());
    tags
}

fn yaml11_tags() -> Vec<Tag> {
    let mut tags = vec![
        Tag::collection(default_tag("map"), NodeClass::Map),
        Tag::collection(default_tag("seq"), NodeClass::Seq),
        Tag::collection(default_tag("omap"), NodeClass::Seq),
        Tag::collection(default_tag("pairs"), NodeClass::Seq),
        Tag::collection(default_tag("set"), NodeClass::Map),
        Tag::scalar(default_tag("null"), Some(|s, _| is_core_null(s)), |_, _| {
            Ok(ScalarValue::Null)
        }),
        Tag::scalar(
            default_tag("bool"),
            Some(|s, _| is_yaml11_bool(s)),
            resolve_permissive_bool,
        ),
        Tag::scalar(
            default_tag("int"),
            Some(|s, _| is_yaml11_int(s)),
            resolve_int,
        ),
        Tag::scalar(
            default_tag("float"),
            Some(|s, _| is_yaml11_float(s)),
            resolve_float,
        ),
        Tag::scalar(
            default_tag("timestamp"),
            Some(|s, _| is_timestamp(s)),
            |s, _| Ok(ScalarValue::Str(s.to_string())),
        ),
        Tag::scalar(default_tag("merge"), Some(|s, _| s == "<<"), |s, _| {
            Ok(ScalarValue::Str(s.to_string()))
        }),
    ];
    let mut binary = Tag::scalar(default_tag("binary"), None, resolve_binary);
    binary.default_style = ScalarStyle::BlockLiteral;
    tags.push(binary);
    tags.push(str_tag());
    tags
}

// =============================================================================
// Resolvers
// =============================================================================

fn int_value(n: BigInt, ctx: &ResolveCtx) -> ScalarValue {
    if ctx.as_big_int {
        return ScalarValue::BigInt(n);
    }
    match n.to_i64() {
        Some(i) => ScalarValue::Int(i),
        None => ScalarValue::BigInt(n),
    }
}

fn resolve_decimal_int(s: &str, ctx: &ResolveCtx) -> Result<ScalarValue, String> {
    let n = s
        .parse::<BigInt>()
        .map_err(|_| format!("Invalid integer: {s}"))?;
    Ok(int_value(n, ctx))
}

/// Integer resolution for the permissive schemas: decimal, `0o`/`0x`/`0b`
/// radix prefixes, `_` digit grouping, and YAML 1.1 sexagesimal.
fn resolve_int(s: &str, ctx: &ResolveCtx) -> Result<ScalarValue, String> {
    let t: String = s.chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(&t)),
    };

    let n = if let Some(hex) = digits.strip_prefix("0x") {
        BigInt::parse_bytes(hex.as_bytes(), 16)
    } else if let Some(oct) = digits.strip_prefix("0o") {
        BigInt::parse_bytes(oct.as_bytes(), 8)
    } else if let Some(bin) = digits.strip_prefix("0b") {
        BigInt::parse_bytes(bin.as_bytes(), 2)
    } else if digits.contains(':') {
        let mut acc = BigInt::from(0);
        for part in digits.split(':') {
            let v = part
                .parse::<BigInt>()
                .map_err(|_| format!("Invalid sexagesimal integer: {s}"))?;
            acc = acc * 60 + v;
        }
        Some(acc)
    } else {
        BigInt::parse_bytes(digits.as_bytes(), 10)
    };

    let mut n = n.ok_or_else(|| format!("Invalid integer: {s}"))?;
    if negative {
        n = -n;
    }
    Ok(int_value(n, ctx))
}

fn resolve_float(s: &str, _ctx: &ResolveCtx) -> Result<ScalarValue, String> {
    let t: String = s.chars().filter(|c| *c != '_').collect();
    let (negative, rest) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t.strip_prefix('+').unwrap_or(t.as_str())),
    };
    let lower = rest.to_ascii_lowercase();
    if lower == ".inf" {
        return Ok(ScalarValue::Float(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }));
    }
    if lower == ".nan" {
        return Ok(ScalarValue::Float(f64::NAN));
    }
    t.parse::<f64>()
        .map(ScalarValue::Float)
        .map_err(|_| format!("Invalid float: {s}"))
}

fn resolve_permissive_bool(s: &str, _ctx: &ResolveCtx) -> Result<ScalarValue, String> {
    Ok(ScalarValue::Bool(matches!(
        s.to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "y"
    )))
}

/// Decode a `!!binary` scalar, ignoring embedded whitespace.
fn resolve_binary(s: &str, _ctx: &ResolveCtx) -> Result<ScalarValue, String> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(compact.as_bytes())
        .map(ScalarValue::Bytes)
        .map_err(|e| format!("Invalid base64: {e}"))
}

// =============================================================================
// Implicit-resolution tests
// =============================================================================

fn is_core_null(s: &str) -> bool {
    matches!(s, "" | "~" | "null" | "Null" | "NULL")
}

fn is_core_bool(s: &str, ctx: &ResolveCtx) -> bool {
    if matches!(s, "true" | "True" | "TRUE" | "false" | "False" | "FALSE") {
        return true;
    }
    // `yes`/`no`/`on`/`off` only resolve for pre-1.2 documents.
    ctx.legacy() && is_yaml11_bool(s)
}

fn is_yaml11_bool(s: &str) -> bool {
    matches!(
        s,
        "y" | "Y"
            | "yes"
            | "Yes"
            | "YES"
            | "n"
            | "N"
            | "no"
            | "No"
            | "NO"
            | "true"
            | "True"
            | "TRUE"
            | "false"
            | "False"
            | "FALSE"
            | "on"
            | "On"
            | "ON"
            | "off"
            | "Off"
            | "OFF"
    )
}

/// `-?(0|[1-9][0-9]*)`
fn is_json_int(s: &str) -> bool {
    let t = s.strip_prefix('-').unwrap_or(s);
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    t == "0" || !t.starts_with('0')
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][-+]?[0-9]+)?` with a dot or exponent.
fn is_json_float(s: &str) -> bool {
    let t = s.strip_prefix('-').unwrap_or(s);
    let (mantissa, exponent) = split_exponent(t);
    if let Some(exp) = exponent {
        if !is_signed_digits(exp) {
            return false;
        }
    }
    let Some((int_part, frac)) = mantissa.split_once('.') else {
        // Exponent alone makes it a float; otherwise it is an int.
        return exponent.is_some() && is_json_int(mantissa);
    };
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    is_json_int(int_part)
}

/// `[-+]?[0-9]+`, `0o[0-7]+`, or `0x[0-9a-fA-F]+`
fn is_core_int(s: &str) -> bool {
    let t = strip_sign(s);
    if let Some(oct) = t.strip_prefix("0o") {
        return !oct.is_empty() && oct.bytes().all(|b| (b'0'..=b'7').contains(&b));
    }
    if let Some(hex) = t.strip_prefix("0x") {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit())
}

/// Core float: optional sign, digits with optional dot, optional exponent,
/// plus the `.inf`/`.nan` family.
fn is_core_float(s: &str) -> bool {
    let t = strip_sign(s);
    if matches!(t, ".inf" | ".Inf" | ".INF") {
        return true;
    }
    if matches!(s, ".nan" | ".NaN" | ".NAN") {
        return true;
    }
    let (mantissa, exponent) = split_exponent(t);
    if let Some(exp) = exponent {
        if !is_signed_digits(exp) {
            return false;
        }
    }
    let has_dot = mantissa.contains('.');
    if !has_dot && exponent.is_none() {
        return false;
    }
    if has_dot {
        let parts: Vec<&str> = mantissa.splitn(2, '.').collect();
        let (before, after) = (parts[0], parts[1]);
        if before.is_empty() && after.is_empty() {
            return false;
        }
        before.bytes().all(|b| b.is_ascii_digit()) && after.bytes().all(|b| b.is_ascii_digit())
    } else {
        !mantissa.is_empty() && mantissa.bytes().all(|b| b.is_ascii_digit())
    }
}

/// YAML 1.1 integers: decimal/binary/octal/hex with `_` grouping, and
/// sexagesimal `[-+]?[1-9][0-9_]*(:[0-5]?[0-9])+`.
fn is_yaml11_int(s: &str) -> bool {
    let t = strip_sign(s);
    if t.contains(':') {
        let mut parts = t.split(':');
        let first = parts.next().unwrap_or("");
        if first.is_empty()
            || first.starts_with('0')
            || !first.bytes().all(|b| b.is_ascii_digit() || b == b'_')
        {
            return false;
        }
        return parts.all(|p| {
            !p.is_empty() && p.len() <= 2 && p.bytes().all(|b| b.is_ascii_digit()) && {
                let v: u32 = p.parse().unwrap_or(60);
                v < 60
            }
        });
    }
    if let Some(bin) = t.strip_prefix("0b") {
        return !bin.is_empty() && bin.bytes().all(|b| b == b'0' || b == b'1' || b == b'_');
    }
    let stripped: String = t.chars().filter(|c| *c != '_').collect();
    is_core_int(&stripped)
}

fn is_yaml11_float(s: &str) -> bool {
    let stripped: String = s.chars().filter(|c| *c != '_').collect();
    is_core_float(&stripped)
}

/// YAML 1.1 timestamp: `YYYY-MM-DD` optionally followed by a time part.
fn is_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 8 {
        return false;
    }
    let mut i = 0;
    // year
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i != 4 || i >= bytes.len() || bytes[i] != b'-' {
        return false;
    }
    let digits_then = |bytes: &[u8], mut i: usize, max: usize| -> Option<usize> {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let n = i - start;
        (n >= 1 && n <= max).then_some(i)
    };
    i = match digits_then(bytes, i + 1, 2) {
        Some(j) => j,
        None => return false,
    };
    if i >= bytes.len() || bytes[i] != b'-' {
        return false;
    }
    i = match digits_then(bytes, i + 1, 2) {
        Some(j) => j,
        None => return false,
    };
    if i == bytes.len() {
        return true;
    }
    // time part: [Tt ] hh:mm:ss(.frac)? (Z|[+-]hh(:mm)?)?
    if !matches!(bytes[i], b'T' | b't' | b' ') {
        return false;
    }
    let rest = &s[i + 1..];
    let rest = rest.trim_end_matches('Z');
    let rest = match rest.rfind(&['+', '-'][..]) {
        Some(p) if p > 0 => &rest[..p],
        _ => rest,
    };
    let rest = rest.trim();
    let rest = match rest.split_once('.') {
        Some((clock, frac)) => {
            if !frac.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            clock
        }
        None => rest,
    };
    let mut parts = 0;
    for p in rest.split(':') {
        if p.is_empty() || p.len() > 2 || !p.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 3
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix('-')
        .or_else(|| s.strip_prefix('+'))
        .unwrap_or(s)
}

fn split_exponent(s: &str) -> (&str, Option<&str>) {
    match s.find(&['e', 'E'][..]) {
        Some(p) => (&s[..p], Some(&s[p + 1..])),
        None => (s, None),
    }
}

fn is_signed_digits(s: &str) -> bool {
    let t = strip_sign(s);
    !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolveCtx {
        ResolveCtx {
            version: Version::V1_2,
            as_big_int: false,
        }
    }

    fn resolve(schema: &Schema, text: &str) -> ScalarValue {
        schema.resolve_plain(text, &ctx()).0
    }

    #[test]
    fn test_failsafe_resolves_everything_as_str() {
        let schema = Schema::new(SchemaId::Failsafe, &[]);
        assert_eq!(
            resolve(&schema, "true"),
            ScalarValue::Str("true".to_string())
        );
        assert_eq!(resolve(&schema, "42"), ScalarValue::Str("42".to_string()));
    }

    #[test]
    fn test_json_schema_is_strict() {
        let schema = Schema::new(SchemaId::Json, &[]);
        assert_eq!(resolve(&schema, "null"), ScalarValue::Null);
        assert_eq!(resolve(&schema, "true"), ScalarValue::Bool(true));
        assert_eq!(resolve(&schema, "42"), ScalarValue::Int(42));
        assert_eq!(resolve(&schema, "4.2"), ScalarValue::Float(4.2));
        // Permissive forms stay strings under json.
        assert_eq!(
            resolve(&schema, "Null"),
            ScalarValue::Str("Null".to_string())
        );
        assert_eq!(resolve(&schema, "042"), ScalarValue::Str("042".to_string()));
    }

    #[test]
    fn test_core_schema_permissive_forms() {
        let schema = Schema::new(SchemaId::Core, &[]);
        assert_eq!(resolve(&schema, "~"), ScalarValue::Null);
        assert_eq!(resolve(&schema, "NULL"), ScalarValue::Null);
        assert_eq!(resolve(&schema, "True"), ScalarValue::Bool(true));
        assert_eq!(resolve(&schema, "0x2A"), ScalarValue::Int(42));
        assert_eq!(resolve(&schema, "0o17"), ScalarValue::Int(15));
        assert_eq!(resolve(&schema, "+12"), ScalarValue::Int(12));
        assert_eq!(resolve(&schema, ".5"), ScalarValue::Float(0.5));
        assert_eq!(resolve(&schema, "1e3"), ScalarValue::Float(1000.0));
        assert_eq!(resolve(&schema, "-.inf"), ScalarValue::Float(f64::NEG_INFINITY));
        match resolve(&schema, ".nan") {
            ScalarValue::Float(f) => assert!(f.is_nan()),
            v => panic!("expected float, got {v:?}"),
        }
    }

    #[test]
    fn test_core_yes_is_bool_only_pre_1_2() {
        let schema = Schema::new(SchemaId::Core, &[]);
        assert_eq!(resolve(&schema, "yes"), ScalarValue::Str("yes".to_string()));
        let legacy = ResolveCtx {
            version: Version::V1_1,
            as_big_int: false,
        };
        assert_eq!(
            schema.resolve_plain("yes", &legacy).0,
            ScalarValue::Bool(true)
        );
    }

    #[test]
    fn test_yaml11_int_forms() {
        let schema = Schema::new(SchemaId::Yaml11, &[]);
        assert_eq!(resolve(&schema, "0b1010"), ScalarValue::Int(10));
        assert_eq!(resolve(&schema, "1_000"), ScalarValue::Int(1000));
        assert_eq!(
            resolve(&schema, "190:20:30"),
            ScalarValue::Int(190 * 3600 + 20 * 60 + 30)
        );
        assert_eq!(resolve(&schema, "no"), ScalarValue::Bool(false));
    }

    #[test]
    fn test_big_int_option() {
        let schema = Schema::new(SchemaId::Core, &[]);
        let big = ResolveCtx {
            version: Version::V1_2,
            as_big_int: true,
        };
        match schema.resolve_plain("42", &big).0 {
            ScalarValue::BigInt(n) => assert_eq!(n, BigInt::from(42)),
            v => panic!("expected BigInt, got {v:?}"),
        }
        // Overflow promotes even without the option.
        match resolve(&schema, "99999999999999999999999999") {
            ScalarValue::BigInt(_) => {}
            v => panic!("expected BigInt, got {v:?}"),
        }
    }

    #[test]
    fn test_binary_tag_decodes_base64() {
        let schema = Schema::new(SchemaId::Yaml11, &[]);
        let tag = schema
            .find(&default_tag("binary"), NodeClass::Scalar)
            .unwrap();
        let resolve = tag.resolve.unwrap();
        assert_eq!(
            resolve("aGVsbG8=", &ctx()).unwrap(),
            ScalarValue::Bytes(b"hello".to_vec())
        );
        assert!(resolve("not base64!!!", &ctx()).is_err());
    }

    #[test]
    fn test_timestamp_test() {
        assert!(is_timestamp("2001-12-14"));
        assert!(is_timestamp("2001-12-14 21:59:43.10 -5"));
        assert!(is_timestamp("2001-12-14t21:59:43.10-05:00"));
        assert!(!is_timestamp("12:30:00"));
        assert!(!is_timestamp("2001-12"));
    }

    #[test]
    fn test_custom_tags_extend_schema() {
        let custom = Tag::scalar(default_tag("binary"), None, resolve_binary);
        let schema = Schema::new(SchemaId::Core, &[custom]);
        assert!(schema
            .find(&default_tag("binary"), NodeClass::Scalar)
            .is_some());
    }

    #[test]
    fn test_merge_enabled_policy() {
        let core = Schema::new(SchemaId::Core, &[]);
        assert!(!core.merge_enabled(Version::V1_2));
        assert!(core.merge_enabled(Version::V1_1));
        let y11 = Schema::new(SchemaId::Yaml11, &[]);
        assert!(y11.merge_enabled(Version::V1_2));
    }
}
