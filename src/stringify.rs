//! Stringifier: AST documents back to YAML text.
//!
//! Collections are block by default and flow when flagged (or empty);
//! scalars keep their declared style when it round-trips and otherwise get
//! the cheapest safe style: plain, then single-quoted when only ambiguity
//! forces quoting, then double-quoted for control characters. Output always
//! ends with a newline. A document carrying errors is refused.

use crate::cst::ScalarStyle;
use crate::error::YamlError;
use crate::node::{Document, Map, Node, Pair, Scalar, ScalarValue, Seq};
use crate::options::Options;
use crate::schema::{ResolveCtx, Schema, DEFAULT_TAG_PREFIX};
use base64::prelude::*;

/// Render a document. Fails if the document has errors or if `simple_keys`
/// forbids one of its keys.
pub fn stringify_document(doc: &Document) -> Result<String, YamlError> {
    if doc.has_errors() {
        return Err(YamlError::semantic(
            "Document with errors cannot be stringified",
            doc.errors[0].range,
        ));
    }
    let ctx = Ctx::new(&doc.options, doc);
    let mut out = String::new();
    let mut has_directives = false;
    if let Some(version) = doc.version {
        out.push_str("%YAML ");
        out.push_str(version.as_str());
        out.push('\n');
        has_directives = true;
    }
    for prefix in &doc.tag_prefixes {
        out.push_str(&format!("%TAG {} {}\n", prefix.handle, prefix.prefix));
        has_directives = true;
    }

    let Some(contents) = &doc.contents else {
        if has_directives {
            out.push_str("---\n");
        }
        out.push_str(&doc.options.scalar.null.null_str);
        out.push('\n');
        if let Some(comment) = &doc.comment {
            for line in comment.lines() {
                out.push_str(&format!("#{line}\n"));
            }
        }
        return Ok(out);
    };

    if let Some(before) = comment_before_of(contents) {
        for line in before.lines() {
            out.push_str(&format!("#{line}\n"));
        }
    }
    let body = ctx.node_str(contents, "", false)?;
    let needs_marker = has_directives || doc.directives_end || looks_like_directive(contents);
    if needs_marker {
        if body.contains('\n') || is_block_collection(contents) {
            out.push_str("---\n");
        } else {
            out.push_str("--- ");
        }
    }
    out.push_str(&body);
    if let Some(comment) = comment_of(contents) {
        if !body.contains('\n') {
            out.push_str(&format!(" #{comment}"));
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    if let Some(comment) = &doc.comment {
        for line in comment.lines() {
            out.push_str(&format!("#{line}\n"));
        }
    }
    Ok(out)
}

impl Document {
    /// Render this document as YAML text. Refused while `errors` is
    /// non-empty.
    pub fn to_yaml(&self) -> Result<String, YamlError> {
        stringify_document(self)
    }
}

/// Render a bare node with the given options, outside any document.
pub fn stringify_node(node: &Node, options: &Options) -> Result<String, YamlError> {
    let doc = Document::new(options.clone());
    let ctx = Ctx::new(options, &doc);
    let mut body = ctx.node_str(node, "", false)?;
    if !body.ends_with('\n') {
        body.push('\n');
    }
    Ok(body)
}

fn looks_like_directive(node: &Node) -> bool {
    matches!(node, Node::Scalar(s)
        if s.style == ScalarStyle::Plain
            && matches!(&s.value, ScalarValue::Str(t) if t.starts_with('%')))
}

fn is_block_collection(node: &Node) -> bool {
    match node {
        Node::Map(m) => !m.flow && !m.items.is_empty(),
        Node::Seq(s) => !s.flow && !s.items.is_empty(),
        _ => false,
    }
}

fn comment_before_of(node: &Node) -> Option<&str> {
    match node {
        Node::Scalar(s) => s.comment_before.as_deref(),
        Node::Map(m) => m.comment_before.as_deref(),
        Node::Seq(s) => s.comment_before.as_deref(),
        Node::Alias(_) => None,
    }
}

fn comment_of(node: &Node) -> Option<&str> {
    match node {
        Node::Scalar(s) => s.comment.as_deref(),
        Node::Map(m) => m.comment.as_deref(),
        Node::Seq(s) => s.comment.as_deref(),
        Node::Alias(_) => None,
    }
}

/// Indentation beyond this many columns switches to flow style rather than
/// producing pathological block nesting.
const MAX_BLOCK_INDENT: usize = 128;

struct Ctx<'a> {
    opts: &'a Options,
    schema: Schema,
    rctx: ResolveCtx,
}

impl<'a> Ctx<'a> {
    fn new(opts: &'a Options, doc: &Document) -> Self {
        let schema = Schema::new(doc.schema, &opts.custom_tags);
        let rctx = ResolveCtx {
            version: doc.effective_version(),
            as_big_int: opts.scalar.int.as_big_int,
        };
        Self { opts, schema, rctx }
    }

    fn step(&self) -> String {
        " ".repeat(self.opts.indent.max(1))
    }

    /// Render a node. Block collections return fully indented multi-line
    /// bodies; everything else returns a single logical line (which may
    /// fold across physical lines at the continuation indent).
    fn node_str(&self, node: &Node, indent: &str, in_flow: bool) -> Result<String, YamlError> {
        match node {
            Node::Alias(a) => Ok(format!("*{}", a.name)),
            Node::Scalar(s) => {
                let body = self.scalar_str(s, indent, in_flow, false)?;
                Ok(format!("{}{}", self.props_prefix(node), body))
            }
            Node::Map(m) => {
                if m.flow || m.items.is_empty() || in_flow || indent.len() >= MAX_BLOCK_INDENT {
                    let body = self.flow_map_str(m, indent)?;
                    Ok(format!("{}{}", self.props_prefix(node), body))
                } else {
                    self.block_map_str(m, indent)
                }
            }
            Node::Seq(s) => {
                if s.flow || s.items.is_empty() || in_flow || indent.len() >= MAX_BLOCK_INDENT {
                    let body = self.flow_seq_str(s, indent)?;
                    Ok(format!("{}{}", self.props_prefix(node), body))
                } else {
                    self.block_seq_str(s, indent)
                }
            }
        }
    }

    /// `&anchor` and `!tag` markers that precede a node's body.
    fn props_prefix(&self, node: &Node) -> String {
        let mut out = String::new();
        if let Some(tag) = node.tag() {
            out.push_str(&tag_str(tag));
            out.push(' ');
        }
        if let Some(anchor) = node.anchor() {
            out = format!("&{anchor} {out}");
        }
        out
    }

    // ---------------------------------------------------------------
    // Block collections
    // ---------------------------------------------------------------

    fn block_map_str(&self, map: &Map, indent: &str) -> Result<String, YamlError> {
        let step = self.step();
        let child_indent = format!("{indent}{step}");
        let mut lines: Vec<String> = Vec::new();
        for pair in &map.items {
            if let Some(key) = &pair.key {
                if let Some(before) = comment_before_of(key) {
                    for line in before.lines() {
                        lines.push(format!("{indent}#{line}"));
                    }
                }
            }
            let rendered = self.map_item_str(pair, indent, &child_indent)?;
            lines.push(rendered);
        }
        Ok(lines.join("\n"))
    }

    fn map_item_str(
        &self,
        pair: &Pair,
        indent: &str,
        child_indent: &str,
    ) -> Result<String, YamlError> {
        let (key_str, explicit) = self.key_str(pair.key.as_ref(), indent)?;
        let mut line = if explicit {
            // `? key` already rendered over its own lines.
            format!("{indent}? {key_str}\n{indent}:")
        } else {
            format!("{indent}{key_str}:")
        };
        match &pair.value {
            None => {
                line.push(' ');
                line.push_str(&self.opts.scalar.null.null_str);
            }
            Some(value) => {
                if is_block_collection(value) {
                    let props = self.props_prefix(value);
                    if !props.is_empty() {
                        line.push(' ');
                        line.push_str(props.trim_end());
                    }
                    if let Some(comment) = comment_of(value) {
                        line.push_str(&format!(" #{comment}"));
                    }
                    let value_indent = match value {
                        Node::Seq(_) if !self.opts.indent_seq => indent.to_string(),
                        _ => child_indent.to_string(),
                    };
                    let body = self.node_str(value, &value_indent, false)?;
                    line.push('\n');
                    line.push_str(&body);
                } else {
                    let body = self.node_str(value, child_indent, false)?;
                    line.push(' ');
                    line.push_str(&body);
                    if let Some(comment) = comment_of(value) {
                        if !line.contains('\n') {
                            line.push_str(&format!(" #{comment}"));
                        }
                    }
                }
            }
        }
        Ok(line)
    }

    /// Render a mapping key. Returns the rendered text and whether the
    /// explicit `? key` form is required.
    fn key_str(&self, key: Option<&Node>, indent: &str) -> Result<(String, bool), YamlError> {
        let Some(key) = key else {
            return Ok((self.opts.scalar.null.null_str.clone(), false));
        };
        match key {
            Node::Scalar(s) => {
                let multiline = matches!(&s.value, ScalarValue::Str(t) if t.contains('\n'));
                if multiline {
                    if self.opts.simple_keys {
                        return Err(YamlError::semantic(
                            "With simple keys, all keys must be single-line scalars",
                            key.range().unwrap_or_default(),
                        ));
                    }
                    // A multi-line key keeps its block style behind `? `.
                    return Ok((self.explicit_key_body(key, indent)?, true));
                }
                let body = self.scalar_str(s, indent, false, true)?;
                Ok((format!("{}{}", self.props_prefix(key), body), false))
            }
            Node::Alias(a) => Ok((format!("*{}", a.name), false)),
            Node::Map(_) | Node::Seq(_) => {
                if self.opts.simple_keys {
                    return Err(YamlError::semantic(
                        "With simple keys, collection cannot be used as a map key",
                        key.range().unwrap_or_default(),
                    ));
                }
                // Collection keys render in flow style so they stay on the
                // key's line.
                Ok((self.node_str(key, indent, true)?, false))
            }
        }
    }

    /// Body of an explicit `? key`, spliced so continuation lines align
    /// after the marker.
    fn explicit_key_body(&self, key: &Node, indent: &str) -> Result<String, YamlError> {
        let child_indent = format!("{indent}  ");
        let body = self.node_str(key, &child_indent, false)?;
        Ok(splice_after_marker(&body, &child_indent))
    }

    fn block_seq_str(&self, seq: &Seq, indent: &str) -> Result<String, YamlError> {
        let child_indent = format!("{indent}  ");
        let mut lines: Vec<String> = Vec::new();
        for item in &seq.items {
            if let Some(before) = comment_before_of(item) {
                for line in before.lines() {
                    lines.push(format!("{indent}#{line}"));
                }
            }
            if is_block_collection(item) {
                let props = self.props_prefix(item);
                let body = self.node_str(item, &child_indent, false)?;
                if props.is_empty() {
                    lines.push(format!("{indent}- {}", splice_after_marker(&body, &child_indent)));
                } else {
                    lines.push(format!("{indent}- {}\n{body}", props.trim_end()));
                }
            } else {
                let body = self.node_str(item, &child_indent, false)?;
                let mut line = format!("{indent}- {body}");
                if let Some(comment) = comment_of(item) {
                    if !line.contains('\n') {
                        line.push_str(&format!(" #{comment}"));
                    }
                }
                lines.push(line);
            }
        }
        Ok(lines.join("\n"))
    }

    // ---------------------------------------------------------------
    // Flow collections
    // ---------------------------------------------------------------

    fn flow_map_str(&self, map: &Map, indent: &str) -> Result<String, YamlError> {
        if map.items.is_empty() {
            return Ok("{}".to_string());
        }
        let mut parts = Vec::with_capacity(map.items.len());
        for pair in &map.items {
            let key = match &pair.key {
                Some(k) => self.node_str(k, indent, true)?,
                None => self.opts.scalar.null.null_str.clone(),
            };
            let value = match &pair.value {
                Some(v) => self.node_str(v, indent, true)?,
                None => self.opts.scalar.null.null_str.clone(),
            };
            parts.push(format!("{key}: {value}"));
        }
        Ok(format!("{{ {} }}", parts.join(", ")))
    }

    fn flow_seq_str(&self, seq: &Seq, indent: &str) -> Result<String, YamlError> {
        if seq.items.is_empty() {
            return Ok("[]".to_string());
        }
        let mut parts = Vec::with_capacity(seq.items.len());
        for item in &seq.items {
            parts.push(self.node_str(item, indent, true)?);
        }
        Ok(format!("[ {} ]", parts.join(", ")))
    }

    // ---------------------------------------------------------------
    // Scalars
    // ---------------------------------------------------------------

    fn scalar_str(
        &self,
        scalar: &Scalar,
        indent: &str,
        in_flow: bool,
        is_key: bool,
    ) -> Result<String, YamlError> {
        let opts = &self.opts.scalar;
        Ok(match &scalar.value {
            ScalarValue::Null => opts.null.null_str.clone(),
            ScalarValue::Bool(true) => opts.boolean.true_str.clone(),
            ScalarValue::Bool(false) => opts.boolean.false_str.clone(),
            ScalarValue::Int(n) => n.to_string(),
            ScalarValue::BigInt(n) => n.to_string(),
            ScalarValue::Float(f) => float_str(*f),
            ScalarValue::Bytes(b) => self.binary_str(b, indent, in_flow || is_key),
            ScalarValue::Str(s) => self.string_str(s, scalar.style, indent, in_flow, is_key),
        })
    }

    fn binary_str(&self, bytes: &[u8], indent: &str, inline: bool) -> String {
        let opts = &self.opts.scalar.binary;
        let encoded = BASE64_STANDARD.encode(bytes);
        if inline || opts.default_type != ScalarStyle::BlockLiteral {
            return format!("\"{encoded}\"");
        }
        let width = opts.line_width.max(1);
        let step = self.step();
        let child_indent = format!("{indent}{step}");
        let mut out = String::from("|");
        let mut rest = encoded.as_str();
        if rest.is_empty() {
            return "\"\"".to_string();
        }
        while !rest.is_empty() {
            let take = width.min(rest.len());
            out.push('\n');
            out.push_str(&child_indent);
            out.push_str(&rest[..take]);
            rest = &rest[take..];
        }
        out
    }

    fn string_str(
        &self,
        s: &str,
        style: ScalarStyle,
        indent: &str,
        in_flow: bool,
        is_key: bool,
    ) -> String {
        let string_opts = &self.opts.scalar.string;
        let multiline = s.contains('\n');
        if multiline && !in_flow && !is_key {
            // The configured default decides between block and double-quoted
            // presentation of multi-line content.
            if string_opts.default_type != ScalarStyle::QuoteDouble {
                if let Some(block) = self.block_scalar_str(s, style, indent) {
                    return block;
                }
            }
            return self.double_quoted_str(s, indent, in_flow, is_key);
        }
        let plain_ok = !multiline && self.plain_safe(s, in_flow, is_key);
        let preferred = if is_key {
            string_opts.default_key_type
        } else {
            string_opts.default_type
        };
        match style {
            ScalarStyle::Plain if plain_ok => self.fold_scalar(s, indent, in_flow, is_key),
            ScalarStyle::QuoteSingle if single_safe(s) && !multiline => single_quoted_str(s),
            ScalarStyle::QuoteDouble => self.double_quoted_str(s, indent, in_flow, is_key),
            _ => {
                if plain_ok {
                    self.fold_scalar(s, indent, in_flow, is_key)
                } else if preferred == ScalarStyle::QuoteSingle && single_safe(s) && !multiline {
                    single_quoted_str(s)
                } else if (string_opts.quote_single || quoting_is_for_ambiguity(s))
                    && single_safe(s)
                    && !multiline
                {
                    single_quoted_str(s)
                } else {
                    self.double_quoted_str(s, indent, in_flow, is_key)
                }
            }
        }
    }

    /// Emit a multi-line string as a block scalar, or `None` when the
    /// content cannot round-trip through one.
    fn block_scalar_str(&self, s: &str, style: ScalarStyle, indent: &str) -> Option<String> {
        let body = s.strip_suffix('\n').unwrap_or(s);
        if body.is_empty() {
            return None;
        }
        let first_line = body.lines().next().unwrap_or("");
        if first_line.starts_with(' ') || first_line.starts_with('\t') {
            // Would need an indentation indicator fighting auto-detection.
            return None;
        }
        if body.lines().any(|l| l.ends_with(' ') || l.ends_with('\t')) {
            return None;
        }
        if body.contains('\r') {
            return None;
        }
        let trailing = s.len() - s.trim_end_matches('\n').len();
        if trailing > 1 {
            // Keep-chomping blank lines do not survive re-indentation.
            return None;
        }
        let header = if trailing == 0 { "-" } else { "" };
        let step = self.step();
        let child_indent = format!("{indent}{step}");
        let folded = style == ScalarStyle::BlockFolded
            && !body.lines().any(|l| l.starts_with(' ') || l.starts_with('\t'));
        let marker = if folded { '>' } else { '|' };
        let mut out = format!("{marker}{header}");
        for (i, line) in body.split('\n').enumerate() {
            out.push('\n');
            if folded && i > 0 && !line.is_empty() {
                // Blank-line separators keep folded content literal.
                out.push('\n');
            }
            if !line.is_empty() {
                out.push_str(&child_indent);
                out.push_str(line);
            }
        }
        Some(out)
    }

    /// Whether text emitted plain re-parses as the same string.
    fn plain_safe(&self, s: &str, in_flow: bool, is_key: bool) -> bool {
        if s.is_empty() {
            return false;
        }
        let first = s.as_bytes()[0];
        if matches!(
            first,
            b'-' | b'?' | b':' | b',' | b'[' | b']' | b'{' | b'}' | b'#' | b'&' | b'*' | b'!'
                | b'|' | b'>' | b'\'' | b'"' | b'%' | b'@' | b'`' | b' '
        ) {
            // Indicators are only safe when not followed by a space, and
            // some never are; quote them all.
            if !matches!(first, b'-' | b'?' | b':') {
                return false;
            }
            if s.len() == 1 || s.as_bytes()[1] == b' ' {
                return false;
            }
        }
        if s.ends_with(' ') || s.starts_with(' ') || s.contains('\t') {
            return false;
        }
        if s.contains(": ") || s.ends_with(':') || s.contains(" #") {
            return false;
        }
        if in_flow && s.contains(|c| matches!(c, ',' | '[' | ']' | '{' | '}')) {
            return false;
        }
        if is_key && s.contains(':') {
            return false;
        }
        if s.bytes().any(|b| b < 0x20) {
            return false;
        }
        matches!(
            self.schema.resolve_plain(s, &self.rctx).0,
            ScalarValue::Str(_)
        )
    }

    /// Fold a plain scalar at the configured line width, never inside a
    /// word, keeping at least `min_content_width` per line.
    fn fold_scalar(&self, s: &str, indent: &str, in_flow: bool, is_key: bool) -> String {
        let fold = &self.opts.scalar.string.fold;
        if fold.line_width == 0 || in_flow || is_key {
            return s.to_string();
        }
        let width = fold
            .line_width
            .saturating_sub(indent.len())
            .max(fold.min_content_width);
        if s.len() <= width {
            return s.to_string();
        }
        let mut out = String::new();
        let mut line_len = 0;
        for word in s.split(' ') {
            if line_len == 0 {
                out.push_str(word);
                line_len = word.len();
            } else if line_len + 1 + word.len() > width {
                out.push('\n');
                out.push_str(indent);
                out.push_str(word);
                line_len = word.len();
            } else {
                out.push(' ');
                out.push_str(word);
                line_len += 1 + word.len();
            }
        }
        out
    }

    fn double_quoted_str(&self, s: &str, indent: &str, in_flow: bool, is_key: bool) -> String {
        let json = self.opts.scalar.string.json_encoding;
        let mut out = String::from("\"");
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                '\x08' => out.push_str("\\b"),
                '\x0C' => out.push_str("\\f"),
                '\0' if !json => out.push_str("\\0"),
                '\u{85}' if !json => out.push_str("\\N"),
                '\u{A0}' if !json => out.push_str("\\_"),
                '\u{2028}' if !json => out.push_str("\\L"),
                '\u{2029}' if !json => out.push_str("\\P"),
                c if (c as u32) < 0x20 => {
                    if json {
                        out.push_str(&format!("\\u{:04x}", c as u32));
                    } else {
                        out.push_str(&format!("\\x{:02x}", c as u32));
                    }
                }
                c => out.push(c),
            }
        }
        out.push('"');
        let string_opts = &self.opts.scalar.string;
        if !in_flow
            && !is_key
            && string_opts.fold.line_width > 0
            && s.len() >= string_opts.min_multi_line_length
        {
            return self.fold_double_quoted(&out, indent);
        }
        out
    }

    /// Break a long double-quoted scalar across lines with escaped line
    /// breaks, which re-parse to nothing.
    fn fold_double_quoted(&self, quoted: &str, indent: &str) -> String {
        let fold = &self.opts.scalar.string.fold;
        let width = fold
            .line_width
            .saturating_sub(indent.len())
            .max(fold.min_content_width);
        if quoted.len() <= width {
            return quoted.to_string();
        }
        let mut out = String::new();
        let mut line_len = 0;
        let mut chars = quoted.chars().peekable();
        let mut prev_backslash = false;
        while let Some(c) = chars.next() {
            out.push(c);
            line_len += 1;
            // Break only after an unescaped space, never mid-escape.
            if c == ' ' && !prev_backslash && line_len >= width && chars.peek().is_some() {
                out.push('\\');
                out.push('\n');
                out.push_str(indent);
                line_len = 0;
            }
            prev_backslash = c == '\\' && !prev_backslash;
        }
        out
    }
}

/// Replace a rendered block body's first-line indent with the content that
/// follows a `- ` or `? ` marker.
fn splice_after_marker(body: &str, child_indent: &str) -> String {
    body.strip_prefix(child_indent).unwrap_or(body).to_string()
}

fn single_quoted_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn single_safe(s: &str) -> bool {
    !s.contains('\n') && !s.bytes().any(|b| b < 0x20) && !s.starts_with(' ') && !s.ends_with(' ')
}

/// Quoting forced only by ambiguity (would resolve as a non-string, or
/// starts with an indicator) rather than by characters needing escapes.
fn quoting_is_for_ambiguity(s: &str) -> bool {
    !s.is_empty() && !s.bytes().any(|b| b < 0x20)
}

fn float_str(f: f64) -> String {
    if f.is_nan() {
        return ".nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let s = format!("{f}");
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

fn tag_str(uri: &str) -> String {
    if let Some(short) = uri.strip_prefix(DEFAULT_TAG_PREFIX) {
        if short
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return format!("!!{short}");
        }
    }
    if uri.starts_with('!') && !uri.contains(|c: char| c.is_whitespace()) {
        return uri.to_string();
    }
    format!("!<{uri}>")
}
