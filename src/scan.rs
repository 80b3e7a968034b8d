//! The CST scanner: source text into CST documents.
//!
//! A hand-written recursive-descent scanner driven by a byte cursor. There
//! is no unbounded backtracking: the only ambiguity, plain scalar versus
//! implicit mapping key, is settled by peeking for an unquoted `:` on the
//! same logical line.
//!
//! Each document runs the state machine START, DIRECTIVES, CONTENT, END.
//! Errors never abort the scan; they attach to the document and the scanner
//! resumes at the nearest resynchronisation point (next line at the same or
//! lesser indent, next flow separator, next document marker).

use crate::cst::{
    CstDirective, CstDocument, CstKind, CstNode, MapItem, Props, ScalarStyle, TagToken,
};
use crate::error::YamlError;
use crate::source::Range;

/// Parse a complete source string into its CST documents.
///
/// Always yields at least one document; empty input yields one empty
/// document with no errors.
pub fn parse_cst(src: &str) -> Vec<CstDocument> {
    let mut scanner = Scanner::new(src);
    scanner.skip_bom();
    let mut docs = Vec::new();
    loop {
        docs.push(scanner.document());
        if scanner.at_end() {
            break;
        }
    }
    docs
}

/// Where the next content sits, from a non-consuming scan forward.
#[derive(Debug, Clone, Copy)]
struct Probe {
    /// Byte offset of the content character.
    pos: usize,
    /// Column of the content character on its line.
    col: usize,
    /// Content is the first thing on its line and its indent holds a tab.
    has_tab: bool,
    /// Offset of the first tab in the indent span.
    tab_pos: usize,
    /// Content is a `---` or `...` document marker at column 0.
    marker: bool,
    eof: bool,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    errors: Vec<YamlError>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Cursor primitives
    // -------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_bom(&mut self) {
        if self.src.starts_with('\u{FEFF}') {
            self.pos += '\u{FEFF}'.len_utf8();
        }
    }

    /// Column of a byte offset on its line.
    fn column(&self, pos: usize) -> usize {
        pos - self.line_start(pos)
    }

    fn line_start(&self, pos: usize) -> usize {
        self.src[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
    }

    /// Skip spaces, tabs and carriage returns, staying on the line.
    fn skip_inline_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn consume_rest_of_line(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    /// Consume a `#` comment up to (not including) the line break.
    fn consume_comment(&mut self) -> String {
        debug_assert_eq!(self.peek(), Some(b'#'));
        let start = self.pos + 1;
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        self.src[start..self.pos]
            .strip_suffix('\r')
            .unwrap_or(&self.src[start..self.pos])
            .to_string()
    }

    fn error(&mut self, err: YamlError) {
        self.errors.push(err);
    }

    /// Whether a `---`/`...` marker starts at `pos` (column 0 assumed).
    fn marker_at(&self, pos: usize) -> bool {
        let rest = &self.bytes[pos.min(self.bytes.len())..];
        if rest.len() < 3 {
            return false;
        }
        if &rest[..3] != b"---" && &rest[..3] != b"..." {
            return false;
        }
        matches!(rest.get(3), None | Some(b' ' | b'\t' | b'\n' | b'\r'))
    }

    /// Non-consuming scan to the next content character, skipping blank
    /// lines and comment lines.
    fn peek_content(&self) -> Probe {
        let b = self.bytes;
        let mut i = self.pos;
        loop {
            while i < b.len() && matches!(b[i], b' ' | b'\t' | b'\r') {
                i += 1;
            }
            if i >= b.len() {
                return Probe {
                    pos: i,
                    col: 0,
                    has_tab: false,
                    tab_pos: i,
                    marker: false,
                    eof: true,
                };
            }
            match b[i] {
                b'\n' => i += 1,
                b'#' => {
                    while i < b.len() && b[i] != b'\n' {
                        i += 1;
                    }
                }
                _ => break,
            }
        }
        let ls = self.line_start(i);
        let indent = &b[ls..i];
        let indent_only = indent.iter().all(|c| matches!(c, b' ' | b'\t' | b'\r'));
        let tab_off = indent.iter().position(|c| *c == b'\t');
        let col = i - ls;
        Probe {
            pos: i,
            col,
            has_tab: indent_only && tab_off.is_some(),
            tab_pos: ls + tab_off.unwrap_or(0),
            marker: col == 0 && self.marker_at(i),
            eof: false,
        }
    }

    /// Consume up to the next content character, collecting any comments
    /// crossed on the way. The cursor lands on the content.
    fn advance_to_content(&mut self, comments: &mut Vec<String>) -> Probe {
        loop {
            self.skip_inline_ws();
            match self.peek() {
                None => break,
                Some(b'\n') => self.pos += 1,
                Some(b'#') => {
                    let text = self.consume_comment();
                    comments.push(text);
                }
                Some(_) => break,
            }
        }
        self.peek_content()
    }

    fn tab_error(&mut self, probe: &Probe) {
        self.error(YamlError::semantic(
            "Tabs are not allowed as indentation",
            Range::at(probe.tab_pos),
        ));
    }

    /// A tab-indented line cannot take part in block structure: report it
    /// once and consume through the end of the line.
    fn skip_tab_line(&mut self, probe: &Probe) {
        self.tab_error(probe);
        self.pos = probe.pos;
        self.consume_rest_of_line();
    }

    /// Trailing `# comment` on the current line, if any.
    fn take_line_comment(&mut self) -> Option<String> {
        let save = self.pos;
        self.skip_inline_ws();
        if self.peek() == Some(b'#') {
            Some(self.consume_comment())
        } else {
            self.pos = save;
            None
        }
    }

    // -------------------------------------------------------------------
    // Documents
    // -------------------------------------------------------------------

    fn document(&mut self) -> CstDocument {
        let mut doc = CstDocument::new(self.pos);
        let mut pending_comments: Vec<String> = Vec::new();

        // START and DIRECTIVES: blanks, comments, % lines, up to --- or
        // the first content line.
        loop {
            self.skip_inline_ws();
            match self.peek() {
                None => break,
                Some(b'\n') => self.pos += 1,
                Some(b'#') => {
                    let text = self.consume_comment();
                    pending_comments.push(text);
                }
                Some(b'%') if self.column(self.pos) == 0 => {
                    let directive = self.directive();
                    doc.directives.push(directive);
                }
                Some(_) => {
                    if self.column(self.pos) == 0 && self.marker_at(self.pos) {
                        if self.bytes[self.pos] == b'-' {
                            self.pos += 3;
                            doc.directives_end = true;
                        } else {
                            self.pos += 3;
                            doc.document_end = true;
                            self.consume_rest_of_line();
                            doc.range.end = self.pos;
                            doc.errors = std::mem::take(&mut self.errors);
                            return doc;
                        }
                    }
                    break;
                }
            }
        }

        // CONTENT
        loop {
            let probe = self.advance_to_content(&mut pending_comments);
            if probe.eof || probe.marker {
                break;
            }
            if probe.has_tab {
                self.skip_tab_line(&probe);
                continue;
            }
            self.pos = probe.pos;
            doc.contents = self.block_node(-1, std::mem::take(&mut pending_comments));
            if let Some(comment) = self.take_line_comment() {
                if let Some(contents) = doc.contents.as_mut() {
                    if contents.props.comment.is_none() {
                        contents.props.comment = Some(comment);
                    }
                }
            }
            break;
        }

        // END: expect ... or --- or EOF; anything else is trailing content.
        // Comments that never found a node to sit on become document-end
        // comments.
        let mut end_comments = std::mem::take(&mut pending_comments);
        loop {
            let p = self.advance_to_content(&mut end_comments);
            if p.eof {
                self.pos = p.pos;
                break;
            }
            if p.marker {
                self.pos = p.pos;
                if self.bytes[p.pos] == b'.' {
                    self.pos += 3;
                    doc.document_end = true;
                    self.consume_rest_of_line();
                }
                break;
            }
            self.pos = p.pos;
            let line_end = self.src[p.pos..]
                .find('\n')
                .map(|i| p.pos + i)
                .unwrap_or(self.bytes.len());
            self.error(YamlError::semantic(
                "Document contains trailing content",
                Range::new(p.pos, line_end),
            ));
            // Resynchronise at the next document marker.
            loop {
                self.consume_rest_of_line();
                if self.at_end() {
                    break;
                }
                let next = self.peek_content();
                if next.eof || next.marker {
                    break;
                }
                self.pos = next.pos;
            }
        }

        doc.end_comments = end_comments;
        doc.range.end = self.pos;
        doc.errors = std::mem::take(&mut self.errors);
        doc
    }

    fn directive(&mut self) -> CstDirective {
        let start = self.pos;
        self.pos += 1; // %
        let name_start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'#') {
                break;
            }
            self.pos += 1;
        }
        let name = self.src[name_start..self.pos].to_string();
        let mut args = Vec::new();
        loop {
            self.skip_inline_ws();
            match self.peek() {
                None | Some(b'\n') | Some(b'#') => break,
                Some(_) => {
                    let arg_start = self.pos;
                    while let Some(b) = self.peek() {
                        if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'#') {
                            break;
                        }
                        self.pos += 1;
                    }
                    args.push(self.src[arg_start..self.pos].to_string());
                }
            }
        }
        let range = Range::new(start, self.pos);
        if name != "YAML" && name != "TAG" {
            self.error(YamlError::warning(
                format!("YAML only supports %TAG and %YAML directives, and not %{name}"),
                range,
            ));
        }
        CstDirective { name, args, range }
    }

    // -------------------------------------------------------------------
    // Block context
    // -------------------------------------------------------------------

    /// Parse one node in block context. The cursor is on the node's first
    /// content character; `min_col` is the exclusive column floor inherited
    /// from the parent (`-1` at document level).
    fn block_node(&mut self, min_col: i32, comments: Vec<String>) -> Option<CstNode> {
        let outcome = self.parse_props(min_col, comments);
        let mut props = outcome.props;
        if !outcome.has_node {
            let mut node = CstNode::new(
                CstKind::Scalar {
                    style: ScalarStyle::Plain,
                    value: String::new(),
                },
                Range::new(self.pos, self.pos),
            );
            node.props = props;
            return Some(node);
        }

        let col = self.column(self.pos) as i32;
        match self.peek()? {
            b'|' => {
                let mut node = self.block_scalar_parse(false, min_col);
                node.props = props;
                Some(node)
            }
            b'>' => {
                let mut node = self.block_scalar_parse(true, min_col);
                node.props = props;
                Some(node)
            }
            b'-' if self.boundary_after(1) => Some(self.block_seq(col, props)),
            b'?' if self.boundary_after(1) => Some(self.block_map_explicit(col, props)),
            b':' if self.boundary_after(1) => {
                // `: value` with a null key starts a mapping.
                self.pos += 1;
                Some(self.block_map(col, None, props))
            }
            _ => {
                let candidate = self.inline_candidate(false);
                if self.key_peek() {
                    let key_col = self.column(candidate.node.range.start) as i32;
                    let mut key = candidate.node;
                    if outcome.crossed_line {
                        // Own-line props decorate the mapping, not its key.
                        return Some(self.block_map(key_col, Some(key), props));
                    }
                    key.props = props;
                    let map_props = Props {
                        comments_before: std::mem::take(&mut key.props.comments_before),
                        ..Props::default()
                    };
                    Some(self.block_map(key_col, Some(key), map_props))
                } else {
                    let mut node = candidate.node;
                    if candidate.plain {
                        self.extend_plain(&mut node, min_col);
                    }
                    node.props = props;
                    Some(node)
                }
            }
        }
    }

    fn boundary_after(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            None | Some(b' ' | b'\t' | b'\n' | b'\r')
        )
    }

    /// After parsing a potential implicit key, look for `: ` on the same
    /// line. Consumes the colon when found.
    fn key_peek(&mut self) -> bool {
        let save = self.pos;
        self.skip_inline_ws();
        if self.peek() == Some(b':') && self.boundary_after(1) {
            self.pos += 1;
            return true;
        }
        self.pos = save;
        false
    }

    /// Decorations before a value: anchors, tags, comments. May cross line
    /// breaks; reports whether any content follows at an acceptable column.
    fn parse_props(&mut self, min_col: i32, comments: Vec<String>) -> PropsOutcome {
        let mut props = Props {
            comments_before: comments,
            ..Props::default()
        };
        let mut crossed_line = false;
        loop {
            match self.peek() {
                Some(b'&') => {
                    let start = self.pos;
                    let name = self.read_anchor_name();
                    if props.anchor.is_some() {
                        self.error(YamlError::semantic(
                            "A node can have at most one anchor",
                            Range::new(start, self.pos),
                        ));
                    }
                    props.anchor = Some(name);
                    props.anchor_range = Some(Range::new(start, self.pos));
                    self.skip_inline_ws();
                }
                Some(b'!') => {
                    let start = self.pos;
                    let tag = self.read_tag_token();
                    if props.tag.is_some() {
                        self.error(YamlError::semantic(
                            "A node can have at most one tag",
                            Range::new(start, self.pos),
                        ));
                    }
                    props.tag = Some(tag);
                    props.tag_range = Some(Range::new(start, self.pos));
                    self.skip_inline_ws();
                }
                Some(b'\n') | Some(b'#') | None => {
                    if props.anchor.is_none() && props.tag.is_none() {
                        break;
                    }
                    let before = self.pos;
                    let probe = self.advance_to_content(&mut props.comments_before);
                    if probe.eof
                        || probe.marker
                        || probe.has_tab
                        || (probe.col as i32) <= min_col
                    {
                        if probe.has_tab {
                            self.tab_error(&probe);
                        }
                        return PropsOutcome {
                            props,
                            crossed_line: true,
                            has_node: false,
                        };
                    }
                    if self.src[before..self.pos].contains('\n') {
                        crossed_line = true;
                    }
                    if !matches!(self.peek(), Some(b'&') | Some(b'!')) {
                        break;
                    }
                }
                Some(_) => break,
            }
        }
        PropsOutcome {
            props,
            crossed_line,
            has_node: !self.at_end(),
        }
    }

    fn read_anchor_name(&mut self) -> String {
        self.pos += 1; // & or *
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(
                b,
                b' ' | b'\t' | b'\n' | b'\r' | b',' | b'[' | b']' | b'{' | b'}'
            ) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            self.error(YamlError::syntax(
                "Anchor or alias name is missing",
                Range::at(start.saturating_sub(1)),
            ));
        }
        self.src[start..self.pos].to_string()
    }

    fn read_tag_token(&mut self) -> TagToken {
        let start = self.pos;
        self.pos += 1; // !
        if self.peek() == Some(b'<') {
            self.pos += 1;
            let uri_start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'>' || b == b'\n' {
                    break;
                }
                self.pos += 1;
            }
            let uri = self.src[uri_start..self.pos].to_string();
            if self.peek() == Some(b'>') {
                self.pos += 1;
            } else {
                self.error(YamlError::semantic(
                    "Verbatim tags must end with a >",
                    Range::new(start, self.pos),
                ));
            }
            return TagToken::Verbatim(uri);
        }
        let body_start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(
                b,
                b' ' | b'\t' | b'\n' | b'\r' | b',' | b'[' | b']' | b'{' | b'}'
            ) {
                break;
            }
            self.pos += 1;
        }
        let body = &self.src[body_start..self.pos];
        if body.is_empty() {
            return TagToken::NonSpecific;
        }
        if let Some(suffix) = body.strip_prefix('!') {
            return TagToken::Shorthand {
                handle: "!!".to_string(),
                suffix: suffix.to_string(),
            };
        }
        if let Some(bang) = body.find('!') {
            return TagToken::Shorthand {
                handle: format!("!{}!", &body[..bang]),
                suffix: body[bang + 1..].to_string(),
            };
        }
        TagToken::Shorthand {
            handle: "!".to_string(),
            suffix: body.to_string(),
        }
    }

    /// A single-line node usable as an implicit key: alias, quoted scalar,
    /// flow collection, or the first line of a plain scalar.
    fn inline_candidate(&mut self, in_flow: bool) -> Candidate {
        match self.peek() {
            Some(b'*') => {
                let start = self.pos;
                let name = self.read_anchor_name();
                Candidate {
                    node: CstNode::new(CstKind::Alias(name), Range::new(start, self.pos)),
                    plain: false,
                }
            }
            Some(b'"') => {
                let node = self.double_quoted();
                Candidate { node, plain: false }
            }
            Some(b'\'') => {
                let node = self.single_quoted();
                Candidate { node, plain: false }
            }
            Some(b'[') | Some(b'{') => {
                let node = self.flow_collection();
                Candidate { node, plain: false }
            }
            _ => {
                let (text, range) = self.plain_line(in_flow);
                Candidate {
                    node: CstNode::new(
                        CstKind::Scalar {
                            style: ScalarStyle::Plain,
                            value: text,
                        },
                        range,
                    ),
                    plain: true,
                }
            }
        }
    }

    /// First line of a plain scalar. The cursor lands just after the last
    /// content character, before any trailing whitespace.
    fn plain_line(&mut self, in_flow: bool) -> (String, Range) {
        let start = self.pos;
        let mut i = self.pos;
        let b = self.bytes;
        let mut last_content = self.pos;
        while i < b.len() {
            let c = b[i];
            if c == b'\n' {
                break;
            }
            if c == b'#' && i > start && matches!(b[i - 1], b' ' | b'\t') {
                break;
            }
            if c == b':' {
                let next = b.get(i + 1).copied();
                let ends = match next {
                    None | Some(b' ' | b'\t' | b'\n' | b'\r') => true,
                    Some(b',' | b'[' | b']' | b'{' | b'}') if in_flow => true,
                    _ => false,
                };
                if ends {
                    break;
                }
            }
            if in_flow && matches!(c, b',' | b'[' | b']' | b'{' | b'}') {
                break;
            }
            if !matches!(c, b' ' | b'\t' | b'\r') {
                last_content = i + 1;
            }
            i += 1;
        }
        let end = last_content.max(start);
        self.pos = end;
        (self.src[start..end].to_string(), Range::new(start, end))
    }

    /// Fold continuation lines into a plain scalar that was not a key.
    fn extend_plain(&mut self, node: &mut CstNode, min_col: i32) {
        let (style, first) = match &node.kind {
            CstKind::Scalar { style, value } if *style == ScalarStyle::Plain => {
                (*style, value.clone())
            }
            _ => return,
        };
        let mut parts: Vec<(usize, String)> = Vec::new();
        let mut end = node.range.end;
        loop {
            let probe = self.peek_content();
            if probe.eof || probe.marker || probe.has_tab || (probe.col as i32) <= min_col {
                break;
            }
            // A comment line terminates the scalar: raw scan, because
            // peek_content skips comments.
            if self.comment_line_before(probe.pos) {
                break;
            }
            // A line shaped like a mapping entry is never a continuation:
            // `: ` cannot occur in a multi-line plain scalar.
            if self.line_looks_like_key(probe.pos) {
                break;
            }
            let breaks = self.src[self.pos..probe.pos]
                .bytes()
                .filter(|b| *b == b'\n')
                .count();
            self.pos = probe.pos;
            let (text, range) = self.plain_line(false);
            if text.is_empty() {
                break;
            }
            parts.push((breaks, text));
            end = range.end;
            // A trailing comment ends the whole scalar after this line.
            if self.take_line_comment().is_some() {
                break;
            }
        }
        if parts.is_empty() {
            return;
        }
        let mut value = first;
        for (breaks, text) in parts {
            if breaks <= 1 {
                value.push(' ');
            } else {
                for _ in 1..breaks {
                    value.push('\n');
                }
            }
            value.push_str(&text);
        }
        node.kind = CstKind::Scalar { style, value };
        node.range.end = end;
    }

    /// Whether a comment line sits between the cursor and `target`.
    fn comment_line_before(&self, target: usize) -> bool {
        self.src[self.pos..target].contains('#')
    }

    /// Whether the line starting at `pos` contains a `: ` mapping marker.
    fn line_looks_like_key(&self, pos: usize) -> bool {
        let line_end = self.src[pos..]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(self.src.len());
        let line = &self.src[pos..line_end];
        let bytes = line.as_bytes();
        for (i, c) in bytes.iter().enumerate() {
            if *c == b':' {
                let next = bytes.get(i + 1);
                if matches!(next, None | Some(b' ' | b'\t' | b'\r')) {
                    return true;
                }
            }
        }
        false
    }

    // -------------------------------------------------------------------
    // Block collections
    // -------------------------------------------------------------------

    fn block_seq(&mut self, col: i32, props: Props) -> CstNode {
        let start = self.pos;
        let mut items: Vec<Option<CstNode>> = Vec::new();
        let mut end = self.pos + 1;
        loop {
            // Cursor on a `-` at `col`.
            self.pos += 1;
            let item = self.seq_item_value(col);
            if let Some(node) = &item {
                end = node.range.end.max(end);
            }
            items.push(item);
            if let Some(last) = items.last_mut().and_then(|i| i.as_mut()) {
                if let Some(comment) = self.take_line_comment() {
                    if last.props.comment.is_none() {
                        last.props.comment = Some(comment);
                    }
                }
            }
            let mut comments = Vec::new();
            loop {
                let probe = self.peek_content();
                if probe.eof || probe.marker || (probe.col as i32) < col {
                    let mut node = CstNode::new(CstKind::BlockSeq(items), Range::new(start, end));
                    node.props = props;
                    return node;
                }
                if probe.has_tab {
                    self.skip_tab_line(&probe);
                    continue;
                }
                if (probe.col as i32) > col {
                    self.error(YamlError::semantic(
                        "All collection items must start at the same column",
                        Range::new(probe.pos, probe.pos + 1),
                    ));
                    self.pos = probe.pos;
                    self.consume_rest_of_line();
                    continue;
                }
                // Same column: continue only for another `- ` item.
                self.advance_to_content(&mut comments);
                if self.peek() == Some(b'-') && self.boundary_after(1) {
                    break;
                }
                let mut node = CstNode::new(CstKind::BlockSeq(items), Range::new(start, end));
                node.props = props;
                return node;
            }
        }
    }

    /// The value of a `- ` item: same-line content, or an indented node on
    /// the following lines.
    fn seq_item_value(&mut self, col: i32) -> Option<CstNode> {
        self.skip_inline_ws();
        match self.peek() {
            Some(b'\n') | Some(b'#') | None => {
                let probe = self.peek_content();
                if probe.eof || probe.marker || (probe.col as i32) <= col {
                    return None;
                }
                if probe.has_tab {
                    self.tab_error(&probe);
                    return None;
                }
                let mut comments = Vec::new();
                self.advance_to_content(&mut comments);
                self.block_node(col, comments)
            }
            Some(_) => self.block_node(col, Vec::new()),
        }
    }

    fn block_map_explicit(&mut self, col: i32, props: Props) -> CstNode {
        // Cursor on the `?`. Parse the explicit key, then hand the rest of
        // the mapping to the shared item loop.
        self.pos += 1;
        self.skip_inline_ws();
        let key = match self.peek() {
            Some(b'\n') | Some(b'#') | None => {
                let probe = self.peek_content();
                if probe.eof || probe.marker || (probe.col as i32) <= col || probe.has_tab {
                    None
                } else {
                    let mut comments = Vec::new();
                    self.advance_to_content(&mut comments);
                    self.block_node(col, comments)
                }
            }
            Some(_) => self.block_node(col, Vec::new()),
        };
        if self.explicit_value_follows(col) {
            self.pos += 1; // :
            self.block_map_items(col, key, props)
        } else {
            self.block_map_continue(col, MapItem { key, value: None }, props)
        }
    }

    /// After an explicit key, find its `: value`: either on the same line
    /// or as the next content at the mapping's column. Leaves the cursor on
    /// the `:` when found.
    fn explicit_value_follows(&mut self, col: i32) -> bool {
        let save = self.pos;
        self.skip_inline_ws();
        if self.peek() == Some(b':') && self.boundary_after(1) {
            return true;
        }
        self.pos = save;
        let probe = self.peek_content();
        if !probe.eof
            && !probe.marker
            && !probe.has_tab
            && (probe.col as i32) == col
            && self.bytes.get(probe.pos) == Some(&b':')
            && matches!(
                self.bytes.get(probe.pos + 1),
                None | Some(b' ' | b'\t' | b'\n' | b'\r')
            )
        {
            let mut comments = Vec::new();
            self.advance_to_content(&mut comments);
            return true;
        }
        false
    }

    fn block_map(&mut self, col: i32, key: Option<CstNode>, props: Props) -> CstNode {
        // Cursor just after the first item's `:`.
        self.block_map_items(col, key, props)
    }

    fn block_map_items(&mut self, col: i32, key: Option<CstNode>, props: Props) -> CstNode {
        let value = self.map_value(col);
        let item = MapItem { key, value };
        self.block_map_continue(col, item, props)
    }

    /// Shared mapping loop, entered with the first item already parsed.
    fn block_map_continue(&mut self, col: i32, first: MapItem, props: Props) -> CstNode {
        let start = first
            .key
            .as_ref()
            .map(|k| k.range.start)
            .or_else(|| first.value.as_ref().map(|v| v.range.start))
            .unwrap_or(self.pos);
        let mut items = vec![first];
        let mut end = self.pos;
        if let Some(item) = items.last() {
            if let Some(v) = &item.value {
                end = v.range.end;
            } else if let Some(k) = &item.key {
                end = k.range.end;
            }
        }
        loop {
            // Attach a trailing comment to the item just finished.
            if let Some(comment) = self.take_line_comment() {
                if let Some(item) = items.last_mut() {
                    let slot = item.value.as_mut().or(item.key.as_mut());
                    if let Some(node) = slot {
                        if node.props.comment.is_none() {
                            node.props.comment = Some(comment);
                        }
                    }
                }
            }
            let mut comments = Vec::new();
            let probe = self.peek_content();
            if probe.eof || probe.marker || (probe.col as i32) < col {
                break;
            }
            if probe.has_tab {
                self.skip_tab_line(&probe);
                continue;
            }
            if (probe.col as i32) > col {
                self.error(YamlError::semantic(
                    "All collection items must start at the same column",
                    Range::new(probe.pos, probe.pos + 1),
                ));
                self.pos = probe.pos;
                self.consume_rest_of_line();
                continue;
            }
            self.advance_to_content(&mut comments);
            match self.peek() {
                Some(b'?') if self.boundary_after(1) => {
                    self.pos += 1;
                    self.skip_inline_ws();
                    let key = match self.peek() {
                        Some(b'\n') | Some(b'#') | None => {
                            let p = self.peek_content();
                            if p.eof || p.marker || (p.col as i32) <= col || p.has_tab {
                                None
                            } else {
                                let mut c = Vec::new();
                                self.advance_to_content(&mut c);
                                self.block_node(col, c)
                            }
                        }
                        Some(_) => self.block_node(col, comments),
                    };
                    if self.explicit_value_follows(col) {
                        self.pos += 1;
                        let value = self.map_value(col);
                        items.push(MapItem { key, value });
                    } else {
                        items.push(MapItem { key, value: None });
                    }
                }
                Some(b':') if self.boundary_after(1) => {
                    self.pos += 1;
                    let value = self.map_value(col);
                    items.push(MapItem { key: None, value });
                }
                _ => {
                    let outcome = self.parse_props(col, comments);
                    let key_props = outcome.props;
                    if !outcome.has_node {
                        items.push(MapItem {
                            key: Some(prop_only_node(key_props, self.pos)),
                            value: None,
                        });
                        continue;
                    }
                    let candidate = self.inline_candidate(false);
                    let mut key = candidate.node;
                    key.props = key_props;
                    if self.key_peek() {
                        let value = self.map_value(col);
                        items.push(MapItem {
                            key: Some(key),
                            value,
                        });
                    } else {
                        self.error(
                            YamlError::semantic(
                                "Implicit map keys need to be followed by map values",
                                key.range,
                            )
                            .on("MAP"),
                        );
                        items.push(MapItem {
                            key: Some(key),
                            value: None,
                        });
                    }
                }
            }
            if let Some(item) = items.last() {
                if let Some(v) = &item.value {
                    end = v.range.end.max(end);
                } else if let Some(k) = &item.key {
                    end = k.range.end.max(end);
                }
            }
        }
        let mut node = CstNode::new(CstKind::BlockMap(items), Range::new(start, end));
        node.props = props;
        node
    }

    /// The value side of a `key:`. Same-line content, or an indented node,
    /// or a sequence at the mapping's own column.
    fn map_value(&mut self, col: i32) -> Option<CstNode> {
        self.skip_inline_ws();
        match self.peek() {
            Some(b'\n') | Some(b'#') | None => {
                let probe = self.peek_content();
                if probe.eof || probe.marker {
                    return None;
                }
                if probe.has_tab {
                    self.tab_error(&probe);
                    return None;
                }
                let pcol = probe.col as i32;
                let seq_at_col = pcol == col
                    && self.bytes.get(probe.pos) == Some(&b'-')
                    && matches!(
                        self.bytes.get(probe.pos + 1),
                        None | Some(b' ' | b'\t' | b'\n' | b'\r')
                    );
                if pcol > col || seq_at_col {
                    let mut comments = Vec::new();
                    self.advance_to_content(&mut comments);
                    if seq_at_col {
                        let props = Props {
                            comments_before: comments,
                            ..Props::default()
                        };
                        Some(self.block_seq(col, props))
                    } else {
                        self.block_node(col, comments)
                    }
                } else {
                    None
                }
            }
            Some(_) => self.block_node(col, Vec::new()),
        }
    }

    // -------------------------------------------------------------------
    // Flow context
    // -------------------------------------------------------------------

    fn skip_flow_ws(&mut self) {
        loop {
            self.skip_inline_ws();
            match self.peek() {
                Some(b'\n') => self.pos += 1,
                Some(b'#') => {
                    self.consume_comment();
                }
                _ => break,
            }
        }
    }

    fn flow_collection(&mut self) -> CstNode {
        let start = self.pos;
        let is_map = self.peek() == Some(b'{');
        let close = if is_map { b'}' } else { b']' };
        let type_name = if is_map { "FLOW_MAP" } else { "FLOW_SEQ" };
        self.pos += 1;
        let mut map_items: Vec<MapItem> = Vec::new();
        let mut seq_items: Vec<CstNode> = Vec::new();
        loop {
            self.skip_flow_ws();
            match self.peek() {
                None => {
                    self.error(
                        YamlError::semantic(
                            format!(
                                "Expected flow {} to end with {}",
                                if is_map { "map" } else { "sequence" },
                                close as char
                            ),
                            Range::at(self.pos),
                        )
                        .on(type_name),
                    );
                    break;
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(b'}') | Some(b']') => {
                    // Mismatched terminator: report and stop the collection.
                    self.error(
                        YamlError::semantic(
                            format!(
                                "Expected flow {} to end with {}",
                                if is_map { "map" } else { "sequence" },
                                close as char
                            ),
                            Range::at(self.pos),
                        )
                        .on(type_name),
                    );
                    self.pos += 1;
                    break;
                }
                Some(b',') => {
                    self.error(
                        YamlError::syntax(
                            format!(
                                "Unexpected , in flow {}",
                                if is_map { "map" } else { "sequence" }
                            ),
                            Range::at(self.pos),
                        )
                        .on(type_name),
                    );
                    self.pos += 1;
                }
                Some(_) => {
                    if is_map {
                        let item = self.flow_map_item();
                        map_items.push(item);
                    } else {
                        let item = self.flow_seq_item();
                        seq_items.push(item);
                    }
                    self.skip_flow_ws();
                    match self.peek() {
                        Some(b',') => {
                            self.pos += 1;
                        }
                        Some(c) if c == close => {}
                        None => {}
                        Some(b'}') | Some(b']') => {}
                        Some(_) => {
                            self.error(
                                YamlError::syntax(
                                    format!(
                                        "Expected , between flow {} items",
                                        if is_map { "map" } else { "sequence" }
                                    ),
                                    Range::at(self.pos),
                                )
                                .on(type_name),
                            );
                        }
                    }
                }
            }
        }
        let kind = if is_map {
            CstKind::FlowMap(map_items)
        } else {
            CstKind::FlowSeq(seq_items)
        };
        CstNode::new(kind, Range::new(start, self.pos))
    }

    fn flow_value(&mut self) -> CstNode {
        let props = self.flow_props();
        let mut candidate = self.inline_candidate(true);
        candidate.node.props = props;
        candidate.node
    }

    fn flow_props(&mut self) -> Props {
        let mut props = Props::default();
        loop {
            self.skip_flow_ws();
            match self.peek() {
                Some(b'&') => {
                    let start = self.pos;
                    let name = self.read_anchor_name();
                    if props.anchor.is_some() {
                        self.error(YamlError::semantic(
                            "A node can have at most one anchor",
                            Range::new(start, self.pos),
                        ));
                    }
                    props.anchor = Some(name);
                    props.anchor_range = Some(Range::new(start, self.pos));
                }
                Some(b'!') => {
                    let start = self.pos;
                    let tag = self.read_tag_token();
                    if props.tag.is_some() {
                        self.error(YamlError::semantic(
                            "A node can have at most one tag",
                            Range::new(start, self.pos),
                        ));
                    }
                    props.tag = Some(tag);
                    props.tag_range = Some(Range::new(start, self.pos));
                }
                _ => break,
            }
        }
        props
    }

    fn flow_map_item(&mut self) -> MapItem {
        if self.peek() == Some(b'?') && self.flow_boundary_after(1) {
            self.pos += 1;
            self.skip_flow_ws();
            let key = if self.at_flow_item_end() {
                None
            } else {
                Some(self.flow_value())
            };
            self.skip_flow_ws();
            let value = self.flow_item_value();
            return MapItem { key, value };
        }
        if self.peek() == Some(b':') && self.flow_boundary_after(1) {
            self.pos += 1;
            self.skip_flow_ws();
            let value = if self.at_flow_item_end() {
                None
            } else {
                Some(self.flow_value())
            };
            return MapItem { key: None, value };
        }
        let key = self.flow_value();
        self.skip_flow_ws();
        let value = self.flow_item_value();
        MapItem {
            key: Some(key),
            value,
        }
    }

    /// Parse `: value` after a flow key if present.
    fn flow_item_value(&mut self) -> Option<CstNode> {
        if self.peek() == Some(b':') && self.flow_boundary_after(1) {
            self.pos += 1;
            self.skip_flow_ws();
            if self.at_flow_item_end() {
                return None;
            }
            return Some(self.flow_value());
        }
        None
    }

    fn flow_seq_item(&mut self) -> CstNode {
        let node = self.flow_value();
        self.skip_flow_ws();
        // A `key: value` pair inside a flow sequence is a single-pair map.
        if self.peek() == Some(b':') && self.flow_boundary_after(1) {
            self.pos += 1;
            self.skip_flow_ws();
            let value = if self.at_flow_item_end() {
                None
            } else {
                Some(self.flow_value())
            };
            let start = node.range.start;
            let end = value.as_ref().map(|v| v.range.end).unwrap_or(self.pos);
            return CstNode::new(
                CstKind::FlowMap(vec![MapItem {
                    key: Some(node),
                    value,
                }]),
                Range::new(start, end),
            );
        }
        node
    }

    fn flow_boundary_after(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            None | Some(b' ' | b'\t' | b'\n' | b'\r' | b',' | b'[' | b']' | b'{' | b'}')
        )
    }

    fn at_flow_item_end(&self) -> bool {
        matches!(self.peek(), None | Some(b',' | b']' | b'}'))
    }

    // -------------------------------------------------------------------
    // Quoted scalars
    // -------------------------------------------------------------------

    fn double_quoted(&mut self) -> CstNode {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error(
                        YamlError::semantic("Missing closing \" quote", Range::at(self.pos))
                            .on("QUOTE_DOUBLE"),
                    );
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => self.double_quoted_escape(&mut out),
                Some(b'\n') => self.fold_quoted_break(&mut out),
                Some(b'\r') => {
                    self.pos += 1;
                }
                Some(_) => {
                    let c = self.src[self.pos..].chars().next().unwrap();
                    out.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        CstNode::new(
            CstKind::Scalar {
                style: ScalarStyle::QuoteDouble,
                value: out,
            },
            Range::new(start, self.pos),
        )
    }

    fn double_quoted_escape(&mut self, out: &mut String) {
        let esc_start = self.pos;
        self.pos += 1; // backslash
        let Some(c) = self.peek() else {
            self.error(YamlError::syntax(
                "Unexpected end of escape sequence",
                Range::at(esc_start),
            ));
            return;
        };
        match c {
            b'\r' | b'\n' => {
                // Escaped line break: the break and any leading whitespace
                // of the continuation line disappear.
                while matches!(self.peek(), Some(b'\r') | Some(b'\n')) {
                    self.pos += 1;
                }
                self.skip_inline_ws();
            }
            b'0' => self.push_escape(out, '\0'),
            b'a' => self.push_escape(out, '\x07'),
            b'b' => self.push_escape(out, '\x08'),
            b't' => self.push_escape(out, '\t'),
            b'n' => self.push_escape(out, '\n'),
            b'v' => self.push_escape(out, '\x0B'),
            b'f' => self.push_escape(out, '\x0C'),
            b'r' => self.push_escape(out, '\r'),
            b'e' => self.push_escape(out, '\x1B'),
            b' ' => self.push_escape(out, ' '),
            b'"' => self.push_escape(out, '"'),
            b'/' => self.push_escape(out, '/'),
            b'\\' => self.push_escape(out, '\\'),
            b'N' => self.push_escape(out, '\u{85}'),
            b'_' => self.push_escape(out, '\u{A0}'),
            b'L' => self.push_escape(out, '\u{2028}'),
            b'P' => self.push_escape(out, '\u{2029}'),
            b'x' => self.hex_escape(out, 2, esc_start),
            b'u' => self.hex_escape(out, 4, esc_start),
            b'U' => self.hex_escape(out, 8, esc_start),
            _ => {
                self.pos += 1;
                self.error(YamlError::syntax(
                    format!("Invalid escape sequence \\{}", c as char),
                    Range::new(esc_start, self.pos),
                ));
                out.push('\\');
                out.push(c as char);
            }
        }
    }

    fn push_escape(&mut self, out: &mut String, c: char) {
        self.pos += 1;
        out.push(c);
    }

    fn hex_escape(&mut self, out: &mut String, len: usize, esc_start: usize) {
        self.pos += 1; // x / u / U
        let hex_start = self.pos;
        let mut digits = 0;
        while digits < len {
            match self.peek() {
                Some(b) if b.is_ascii_hexdigit() => {
                    self.pos += 1;
                    digits += 1;
                }
                _ => break,
            }
        }
        let hex = &self.src[hex_start..self.pos];
        let code = (digits == len)
            .then(|| u32::from_str_radix(hex, 16).ok())
            .flatten()
            .and_then(char::from_u32);
        match code {
            Some(c) => out.push(c),
            None => {
                self.error(YamlError::syntax(
                    "Invalid escape sequence",
                    Range::new(esc_start, self.pos),
                ));
            }
        }
    }

    /// Fold an unescaped line break inside a quoted scalar: trailing
    /// whitespace drops, one break becomes a space, extra breaks stay.
    fn fold_quoted_break(&mut self, out: &mut String) {
        while out.ends_with(' ') || out.ends_with('\t') {
            out.pop();
        }
        let mut breaks = 0;
        loop {
            match self.peek() {
                Some(b'\n') => {
                    breaks += 1;
                    self.pos += 1;
                }
                Some(b' ') | Some(b'\t') | Some(b'\r') => self.pos += 1,
                _ => break,
            }
        }
        if breaks <= 1 {
            out.push(' ');
        } else {
            for _ in 1..breaks {
                out.push('\n');
            }
        }
    }

    fn single_quoted(&mut self) -> CstNode {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    self.error(
                        YamlError::semantic("Missing closing ' quote", Range::at(self.pos))
                            .on("QUOTE_SINGLE"),
                    );
                    break;
                }
                Some(b'\'') => {
                    if self.peek_at(1) == Some(b'\'') {
                        out.push('\'');
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        break;
                    }
                }
                Some(b'\n') => self.fold_quoted_break(&mut out),
                Some(b'\r') => self.pos += 1,
                Some(_) => {
                    let c = self.src[self.pos..].chars().next().unwrap();
                    out.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        CstNode::new(
            CstKind::Scalar {
                style: ScalarStyle::QuoteSingle,
                value: out,
            },
            Range::new(start, self.pos),
        )
    }

    // -------------------------------------------------------------------
    // Block scalars
    // -------------------------------------------------------------------

    fn block_scalar_parse(&mut self, folded: bool, min_col: i32) -> CstNode {
        let start = self.pos;
        self.pos += 1; // | or >
        let mut explicit_indent: Option<usize> = None;
        let mut chomp = Chomp::Clip;
        loop {
            match self.peek() {
                Some(b'+') => {
                    chomp = Chomp::Keep;
                    self.pos += 1;
                }
                Some(b'-') => {
                    chomp = Chomp::Strip;
                    self.pos += 1;
                }
                Some(b) if b.is_ascii_digit() => {
                    explicit_indent = Some((b - b'0') as usize);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        self.skip_inline_ws();
        if self.peek() == Some(b'#') {
            self.consume_comment();
        } else if !matches!(self.peek(), None | Some(b'\n')) {
            let bad_start = self.pos;
            self.consume_rest_of_line();
            self.error(YamlError::syntax(
                "Block scalar header includes extra characters",
                Range::new(bad_start, self.pos.saturating_sub(1)),
            ));
            let value = String::new();
            return CstNode::new(
                CstKind::Scalar {
                    style: if folded {
                        ScalarStyle::BlockFolded
                    } else {
                        ScalarStyle::BlockLiteral
                    },
                    value,
                },
                Range::new(start, self.pos),
            );
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }

        // An explicit indicator digit is relative to the parent collection's
        // column; otherwise the first non-empty line sets the indent.
        let mut content_indent = explicit_indent.map(|d| min_col.max(0) as usize + d.max(1));
        let mut lines: Vec<String> = Vec::new();
        let mut end = self.pos;
        loop {
            if self.at_end() {
                break;
            }
            let line_start = self.pos;
            let mut i = self.pos;
            let b = self.bytes;
            while i < b.len() && b[i] == b' ' {
                i += 1;
            }
            let indent = i - line_start;
            let line_end = self.src[i..]
                .find('\n')
                .map(|n| i + n)
                .unwrap_or(b.len());
            let content = self.src[i..line_end].trim_end_matches('\r');
            if content.trim().is_empty() {
                // Blank lines belong to the scalar regardless of indent.
                lines.push(String::new());
                self.pos = (line_end + 1).min(b.len());
                if line_end >= b.len() {
                    self.pos = b.len();
                    break;
                }
                continue;
            }
            if self.column(i) == 0 && self.marker_at(i) {
                break;
            }
            let ci = match content_indent {
                Some(ci) => ci,
                None => {
                    if (indent as i32) <= min_col {
                        break;
                    }
                    content_indent = Some(indent);
                    indent
                }
            };
            if indent < ci {
                break;
            }
            let keep_from = line_start + ci.min(indent);
            lines.push(
                self.src[keep_from..line_end]
                    .trim_end_matches('\r')
                    .to_string(),
            );
            end = line_end;
            self.pos = (line_end + 1).min(b.len());
            if line_end >= b.len() {
                self.pos = b.len();
                break;
            }
        }
        // Trailing blank lines only count for `keep` chomping.
        let trailing_blanks = lines.iter().rev().take_while(|l| l.is_empty()).count();
        let body_lines = &lines[..lines.len() - trailing_blanks];
        let body = if folded {
            fold_lines(body_lines)
        } else {
            body_lines.join("\n")
        };
        let value = match chomp {
            Chomp::Strip => body,
            Chomp::Clip => {
                if body.is_empty() {
                    body
                } else {
                    format!("{body}\n")
                }
            }
            Chomp::Keep => {
                let mut v = body;
                if !lines.is_empty() {
                    for _ in 0..=trailing_blanks {
                        v.push('\n');
                    }
                }
                v
            }
        };
        CstNode::new(
            CstKind::Scalar {
                style: if folded {
                    ScalarStyle::BlockFolded
                } else {
                    ScalarStyle::BlockLiteral
                },
                value,
            },
            Range::new(start, end.max(start + 1)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Strip,
    Clip,
    Keep,
}

struct PropsOutcome {
    props: Props,
    crossed_line: bool,
    has_node: bool,
}

struct Candidate {
    node: CstNode,
    plain: bool,
}

/// A node that exists only to carry props (anchor or tag with no value).
fn prop_only_node(props: Props, pos: usize) -> CstNode {
    let mut node = CstNode::new(
        CstKind::Scalar {
            style: ScalarStyle::Plain,
            value: String::new(),
        },
        Range::new(pos, pos),
    );
    node.props = props;
    node
}

/// Fold block-folded lines: single breaks between same-indent text lines
/// become spaces, blank lines become breaks, more-indented lines keep
/// their breaks.
fn fold_lines(lines: &[String]) -> String {
    let mut out = String::new();
    let mut blanks = 0;
    let mut first = true;
    let mut prev_more = false;
    for line in lines {
        if line.is_empty() {
            blanks += 1;
            continue;
        }
        let more = line.starts_with(' ') || line.starts_with('\t');
        if first {
            first = false;
        } else if blanks > 0 {
            for _ in 0..blanks {
                out.push('\n');
            }
        } else if prev_more || more {
            out.push('\n');
        } else {
            out.push(' ');
        }
        out.push_str(line);
        prev_more = more;
        blanks = 0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(src: &str) -> CstDocument {
        let mut docs = parse_cst(src);
        assert_eq!(docs.len(), 1, "expected one document for {src:?}");
        docs.remove(0)
    }

    fn scalar_value(node: &CstNode) -> &str {
        match &node.kind {
            CstKind::Scalar { value, .. } => value,
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let doc = single("");
        assert!(doc.contents.is_none());
        assert!(doc.errors.is_empty());
        assert!(!doc.directives_end);
    }

    #[test]
    fn test_bare_document_marker() {
        let doc = single("---");
        assert!(doc.contents.is_none());
        assert!(doc.directives_end);
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn test_plain_scalar_document() {
        let doc = single("hello world");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "hello world");
        assert_eq!(node.range, Range::new(0, 11));
    }

    #[test]
    fn test_multiline_plain_folds() {
        let doc = single("hello\n  world");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "hello world");
    }

    #[test]
    fn test_block_map_items() {
        let doc = single("a: 1\nb: 2\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(scalar_value(items[0].key.as_ref().unwrap()), "a");
        assert_eq!(scalar_value(items[0].value.as_ref().unwrap()), "1");
        assert_eq!(scalar_value(items[1].key.as_ref().unwrap()), "b");
    }

    #[test]
    fn test_block_seq_items() {
        let doc = single("- one\n- two\n- three\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockSeq(items) = &node.kind else {
            panic!("expected seq");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(scalar_value(items[1].as_ref().unwrap()), "two");
    }

    #[test]
    fn test_nested_block_structures() {
        let doc = single("top:\n  - a: 1\n    b: 2\n  - plain\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        let seq = items[0].value.as_ref().unwrap();
        let CstKind::BlockSeq(seq_items) = &seq.kind else {
            panic!("expected seq value, got {seq:?}");
        };
        assert_eq!(seq_items.len(), 2);
        let CstKind::BlockMap(inner) = &seq_items[0].as_ref().unwrap().kind else {
            panic!("expected nested map");
        };
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn test_seq_as_map_value_at_same_column() {
        let doc = single("key:\n- 1\n- 2\nnext: x\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        assert_eq!(items.len(), 2);
        let CstKind::BlockSeq(seq) = &items[0].value.as_ref().unwrap().kind else {
            panic!("expected seq value");
        };
        assert_eq!(seq.len(), 2);
        assert_eq!(scalar_value(items[1].key.as_ref().unwrap()), "next");
    }

    #[test]
    fn test_tab_indented_map_collects_four_errors() {
        let doc = single("a:\n\t1\nb:\n\t2\n");
        let errors: Vec<_> = doc
            .errors
            .iter()
            .filter(|e| e.kind == crate::error::ErrorKind::Semantic)
            .collect();
        assert_eq!(errors.len(), 4, "errors: {:#?}", doc.errors);
    }

    #[test]
    fn test_trailing_bare_key_error() {
        let doc = single("abc: 123\ndef");
        assert_eq!(doc.errors.len(), 1, "errors: {:#?}", doc.errors);
        let err = &doc.errors[0];
        assert_eq!(err.kind, crate::error::ErrorKind::Semantic);
        assert!(err.message.contains("Implicit map keys"));
        assert_eq!(err.range, Range::new(9, 12));
    }

    #[test]
    fn test_flow_map_empty_item_error() {
        let doc = single("{ , }");
        assert_eq!(doc.errors.len(), 1, "errors: {:#?}", doc.errors);
        let err = &doc.errors[0];
        assert_eq!(err.kind, crate::error::ErrorKind::Syntax);
        assert_eq!(err.range, Range::new(2, 3));
        assert_eq!(err.node_type, "FLOW_MAP");
        // The collection itself is kept.
        assert!(matches!(
            doc.contents.unwrap().kind,
            CstKind::FlowMap(_)
        ));
    }

    #[test]
    fn test_unterminated_flow_seq_error() {
        let doc = single("[ foo, bar,");
        assert_eq!(doc.errors.len(), 1, "errors: {:#?}", doc.errors);
        let err = &doc.errors[0];
        assert_eq!(err.kind, crate::error::ErrorKind::Semantic);
        assert_eq!(err.range, Range::new(11, 12));
    }

    #[test]
    fn test_flow_collections_nest() {
        let doc = single("{a: [1, 2], b: {c: 3}}");
        let node = doc.contents.unwrap();
        let CstKind::FlowMap(items) = &node.kind else {
            panic!("expected flow map");
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[0].value.as_ref().unwrap().kind,
            CstKind::FlowSeq(_)
        ));
        assert!(matches!(
            items[1].value.as_ref().unwrap().kind,
            CstKind::FlowMap(_)
        ));
    }

    #[test]
    fn test_flow_pair_in_seq() {
        let doc = single("[a: 1, b]");
        let node = doc.contents.unwrap();
        let CstKind::FlowSeq(items) = &node.kind else {
            panic!("expected flow seq");
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0].kind, CstKind::FlowMap(_)));
    }

    #[test]
    fn test_double_quoted_escapes() {
        let doc = single(r#""a\tb\u0041\x21\n""#);
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "a\tbA!\n");
    }

    #[test]
    fn test_double_quoted_folding() {
        let doc = single("\"fold\n  me\n\n  please\"");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "fold me\nplease");
    }

    #[test]
    fn test_double_quoted_escaped_line_break() {
        let doc = single("\"fold \\\n  here\"");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "fold here");
    }

    #[test]
    fn test_single_quoted_escape() {
        let doc = single("'it''s'");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "it's");
        assert!(matches!(
            node.kind,
            CstKind::Scalar {
                style: ScalarStyle::QuoteSingle,
                ..
            }
        ));
    }

    #[test]
    fn test_block_literal_clip() {
        let doc = single("|\n  line one\n  line two\n");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "line one\nline two\n");
    }

    #[test]
    fn test_block_literal_strip_and_keep() {
        let strip = single("|-\n  text\n\n");
        assert_eq!(scalar_value(&strip.contents.unwrap()), "text");
        let keep = single("|+\n  text\n\n");
        assert_eq!(scalar_value(&keep.contents.unwrap()), "text\n\n");
    }

    #[test]
    fn test_block_folded() {
        let doc = single(">\n  one\n  two\n\n  three\n");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), "one two\nthree\n");
    }

    #[test]
    fn test_block_literal_explicit_indent() {
        let doc = single("|2\n   indented\n");
        let node = doc.contents.unwrap();
        assert_eq!(scalar_value(&node), " indented\n");
    }

    #[test]
    fn test_block_scalar_in_map() {
        let doc = single("a: |\n  text\nb: 2\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(scalar_value(items[0].value.as_ref().unwrap()), "text\n");
    }

    #[test]
    fn test_anchor_and_alias() {
        let doc = single("a: &x [1, 2]\nb: *x\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        let anchored = items[0].value.as_ref().unwrap();
        assert_eq!(anchored.props.anchor.as_deref(), Some("x"));
        assert!(matches!(&items[1].value.as_ref().unwrap().kind,
            CstKind::Alias(name) if name == "x"));
    }

    #[test]
    fn test_tags() {
        let doc = single("a: !!int 3\nb: !local x\nc: !<tag:example.com,2000:app/foo> y\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        assert_eq!(
            items[0].value.as_ref().unwrap().props.tag,
            Some(TagToken::Shorthand {
                handle: "!!".to_string(),
                suffix: "int".to_string()
            })
        );
        assert_eq!(
            items[1].value.as_ref().unwrap().props.tag,
            Some(TagToken::Shorthand {
                handle: "!".to_string(),
                suffix: "local".to_string()
            })
        );
        assert_eq!(
            items[2].value.as_ref().unwrap().props.tag,
            Some(TagToken::Verbatim("tag:example.com,2000:app/foo".to_string()))
        );
    }

    #[test]
    fn test_directives_and_multiple_documents() {
        let docs = parse_cst("%YAML 1.2\n---\nfirst\n...\nsecond\n");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].directives.len(), 1);
        assert_eq!(docs[0].directives[0].name, "YAML");
        assert_eq!(docs[0].directives[0].args, vec!["1.2"]);
        assert!(docs[0].directives_end);
        assert!(docs[0].document_end);
        assert_eq!(scalar_value(docs[1].contents.as_ref().unwrap()), "second");
    }

    #[test]
    fn test_unknown_directive_warns() {
        let doc = single("%FOO bar\n---\nx\n");
        assert_eq!(doc.errors.len(), 1);
        assert!(doc.errors[0].is_warning());
        assert_eq!(doc.directives[0].name, "FOO");
    }

    #[test]
    fn test_trailing_content_error() {
        let doc = single("\"done\"\nextra");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("trailing content")));
    }

    #[test]
    fn test_comments_attach_to_nodes() {
        let doc = single("# before\na: 1 # after\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        assert_eq!(node.props.comments_before, vec![" before".to_string()]);
        assert_eq!(
            items[0].value.as_ref().unwrap().props.comment.as_deref(),
            Some(" after")
        );
    }

    #[test]
    fn test_explicit_key() {
        let doc = single("? complex key\n: its value\n");
        let node = doc.contents.unwrap();
        let CstKind::BlockMap(items) = &node.kind else {
            panic!("expected map");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(scalar_value(items[0].key.as_ref().unwrap()), "complex key");
        assert_eq!(scalar_value(items[0].value.as_ref().unwrap()), "its value");
    }

    #[test]
    fn test_misaligned_collection_item() {
        let doc = single("- 'a'\n   'b'\n");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("same column")));
    }

    #[test]
    fn test_map_item_misaligned_after_value() {
        let doc = single("a: 1\n   b: 2\n");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("same column")));
    }

    #[test]
    fn test_document_end_only() {
        let docs = parse_cst("...\nsecond\n");
        assert_eq!(docs.len(), 2);
        assert!(docs[0].document_end);
        assert!(docs[0].contents.is_none());
    }
}
