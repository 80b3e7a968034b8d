//! Parse and stringify options.
//!
//! The process-wide defaults of the original design become `Default` impls
//! here: entry points take an explicit [`Options`] and thread it down the
//! call stack, so no global state is read mid-parse.

use crate::cst::ScalarStyle;
use crate::schema::Tag;

/// Diagnostics verbosity of the high-level entry points.
///
/// Warnings and errors are always collected on the document; the level only
/// controls what [`parse`](crate::parse) forwards to the `log` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Silent,
    Error,
    #[default]
    Warn,
    Debug,
}

/// Built-in schema selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaId {
    Failsafe,
    Json,
    #[default]
    Core,
    Yaml11,
}

impl SchemaId {
    /// Look up a schema by its public name.
    ///
    /// # Panics
    ///
    /// Panics on an unknown name; passing one is a caller bug, not a data
    /// error.
    pub fn from_name(name: &str) -> Self {
        match name {
            "failsafe" => SchemaId::Failsafe,
            "json" => SchemaId::Json,
            "core" => SchemaId::Core,
            "yaml-1.1" => SchemaId::Yaml11,
            _ => panic!("Unknown schema: {name}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchemaId::Failsafe => "failsafe",
            SchemaId::Json => "json",
            SchemaId::Core => "core",
            SchemaId::Yaml11 => "yaml-1.1",
        }
    }
}

/// YAML specification version of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    V1_0,
    V1_1,
    #[default]
    V1_2,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1_0 => "1.0",
            Version::V1_1 => "1.1",
            Version::V1_2 => "1.2",
        }
    }
}

/// `!!binary` stringification options.
#[derive(Debug, Clone)]
pub struct BinaryOpts {
    /// Style used for base64 output: block literal or double-quoted.
    pub default_type: ScalarStyle,
    /// Column at which base64 text wraps.
    pub line_width: usize,
}

impl Default for BinaryOpts {
    fn default() -> Self {
        Self {
            default_type: ScalarStyle::BlockLiteral,
            line_width: 76,
        }
    }
}

/// Boolean stringification options.
#[derive(Debug, Clone)]
pub struct BoolOpts {
    pub true_str: String,
    pub false_str: String,
}

impl Default for BoolOpts {
    fn default() -> Self {
        Self {
            true_str: "true".to_string(),
            false_str: "false".to_string(),
        }
    }
}

/// Integer resolution options.
#[derive(Debug, Clone, Default)]
pub struct IntOpts {
    /// Resolve integers as arbitrary-precision `BigInt` instead of `i64`.
    pub as_big_int: bool,
}

/// Null stringification options.
#[derive(Debug, Clone)]
pub struct NullOpts {
    pub null_str: String,
}

impl Default for NullOpts {
    fn default() -> Self {
        Self {
            null_str: "null".to_string(),
        }
    }
}

/// Long-line folding options.
#[derive(Debug, Clone)]
pub struct FoldOpts {
    /// Column at which scalars fold. `0` disables folding.
    pub line_width: usize,
    /// Never fold below this much content per line, however deep the indent.
    pub min_content_width: usize,
}

impl Default for FoldOpts {
    fn default() -> Self {
        Self {
            line_width: 80,
            min_content_width: 20,
        }
    }
}

/// String stringification options.
#[derive(Debug, Clone)]
pub struct StrOpts {
    pub default_type: ScalarStyle,
    pub default_key_type: ScalarStyle,
    /// Prefer single quotes over double quotes where both round-trip.
    pub quote_single: bool,
    /// Restrict double-quoted escapes to JSON-compatible forms.
    pub json_encoding: bool,
    /// Double-quoted strings at least this long may break across lines.
    pub min_multi_line_length: usize,
    pub fold: FoldOpts,
}

impl Default for StrOpts {
    fn default() -> Self {
        Self {
            default_type: ScalarStyle::Plain,
            default_key_type: ScalarStyle::Plain,
            quote_single: false,
            json_encoding: false,
            min_multi_line_length: 40,
            fold: FoldOpts::default(),
        }
    }
}

/// Per-scalar-type options, grouped the way the tags consume them.
#[derive(Debug, Clone, Default)]
pub struct ScalarOpts {
    pub binary: BinaryOpts,
    pub boolean: BoolOpts,
    pub int: IntOpts,
    pub null: NullOpts,
    pub string: StrOpts,
}

/// Options shared by parsing and stringification.
#[derive(Debug, Clone)]
pub struct Options {
    /// Prefix for generated anchor names; the smallest unused integer is
    /// appended.
    pub anchor_prefix: String,
    /// Spaces per nesting level (min 1).
    pub indent: usize,
    /// Whether block sequences indent their `-` marker under a map key.
    pub indent_seq: bool,
    /// Bound on alias expansion: the node count an alias may resolve to.
    /// `-1` disables the guard; `0` disallows any alias with a non-empty
    /// target.
    pub max_alias_count: i64,
    /// Resolve line/column positions and caret excerpts on diagnostics.
    pub pretty_errors: bool,
    /// Forbid non-scalar mapping keys and explicit `?` keys on output.
    pub simple_keys: bool,
    pub version: Version,
    pub schema: SchemaId,
    /// Extra tags appended to the schema's resolver list.
    pub custom_tags: Vec<Tag>,
    pub log_level: LogLevel,
    pub scalar: ScalarOpts,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            anchor_prefix: "a".to_string(),
            indent: 2,
            indent_seq: true,
            max_alias_count: 100,
            pretty_errors: true,
            simple_keys: false,
            version: Version::default(),
            schema: SchemaId::default(),
            custom_tags: Vec::new(),
            log_level: LogLevel::default(),
            scalar: ScalarOpts::default(),
        }
    }
}
