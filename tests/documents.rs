//! Document-level behaviour: error taxonomy, boundaries, directives,
//! anchors and aliases.

use yamel::{
    parse, parse_all_documents, parse_document, ErrorKind, LogLevel, Options, SchemaId, Value,
};

fn opts() -> Options {
    Options::default()
}

// ---------------------------------------------------------------------
// Boundary behaviours
// ---------------------------------------------------------------------

#[test]
fn empty_input_is_a_null_document() {
    let doc = parse_document("", &opts());
    assert!(doc.contents.is_none());
    assert!(doc.errors.is_empty());
    assert!(doc.warnings.is_empty());
    assert_eq!(doc.to_value().unwrap(), Value::Null);
}

#[test]
fn lone_marker_is_an_empty_document() {
    let doc = parse_document("---", &opts());
    assert!(doc.contents.is_none());
    assert!(doc.directives_end);
    assert!(doc.errors.is_empty());
}

#[test]
fn directives_without_document_fail() {
    let doc = parse_document("%YAML 1.2\n", &opts());
    assert!(doc
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::Semantic && e.message.contains("directives-end")));
}

#[test]
fn max_alias_count_zero_rejects_aliases() {
    let mut options = opts();
    options.max_alias_count = 0;
    let doc = parse_document("a: &x 1\nb: *x\n", &options);
    assert!(doc
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::Reference && e.message.contains("Excessive alias count")));
}

// ---------------------------------------------------------------------
// Concrete error scenarios
// ---------------------------------------------------------------------

#[test]
fn tab_indented_map_yields_four_semantic_errors_and_refuses_stringify() {
    let doc = parse_document("a:\n\t1\nb:\n\t2\n", &opts());
    let semantic: Vec<_> = doc
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::Semantic)
        .collect();
    assert_eq!(semantic.len(), 4, "errors: {:#?}", doc.errors);
    assert!(doc.to_yaml().is_err());
}

#[test]
fn trailing_bare_key_reports_position() {
    let doc = parse_document("abc: 123\ndef", &opts());
    assert_eq!(doc.errors.len(), 1, "errors: {:#?}", doc.errors);
    let err = &doc.errors[0];
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("Implicit map keys need to be followed by map values"));
    let lp = err.line_pos.expect("pretty errors resolve positions");
    assert_eq!((lp.start.line, lp.start.col), (2, 1));
    assert_eq!((lp.end.line, lp.end.col), (2, 4));
}

#[test]
fn flow_map_empty_item_reports_the_comma() {
    let doc = parse_document("{ , }", &opts());
    assert_eq!(doc.errors.len(), 1, "errors: {:#?}", doc.errors);
    let err = &doc.errors[0];
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.node_type, "FLOW_MAP");
    let lp = err.line_pos.unwrap();
    assert_eq!((lp.start.line, lp.start.col), (1, 3));
    assert_eq!((lp.end.line, lp.end.col), (1, 4));
}

#[test]
fn unterminated_flow_seq_points_past_the_end() {
    let doc = parse_document("[ foo, bar,", &opts());
    assert_eq!(doc.errors.len(), 1, "errors: {:#?}", doc.errors);
    let err = &doc.errors[0];
    assert_eq!(err.kind, ErrorKind::Semantic);
    let lp = err.line_pos.unwrap();
    assert_eq!((lp.start.line, lp.start.col), (1, 12));
    assert_eq!((lp.end.line, lp.end.col), (1, 13));
}

#[test]
fn unknown_tag_falls_back_to_str_with_warning() {
    let doc = parse_document("!foo bar", &opts());
    assert!(doc.errors.is_empty());
    assert_eq!(doc.warnings.len(), 1);
    assert!(doc.warnings[0]
        .message
        .contains("tag !foo is unavailable, falling back to tag:yaml.org,2002:str"));
    assert_eq!(doc.to_value().unwrap(), Value::String("bar".to_string()));
    // The warning never blocks the value under any log level.
    let mut silent = opts();
    silent.log_level = LogLevel::Silent;
    assert_eq!(
        parse("!foo bar", &silent).unwrap(),
        Value::String("bar".to_string())
    );
}

#[test]
fn anchor_expansion_guard() {
    let mut options = opts();
    options.max_alias_count = 2;
    // Two aliases of a two-element sequence are each within the limit.
    let doc = parse_document("a: &x [1,2]\nb: *x\nc: *x\n", &options);
    assert!(doc.errors.is_empty(), "errors: {:#?}", doc.errors);
    // A chain of doublings trips the guard before values are built.
    let doc = parse_document(
        "a: &a [1, 1]\nb: &b [*a, *a]\nc: &c [*b, *b]\nd: &d [*c, *c]\ne: *d\n",
        &options,
    );
    assert!(doc
        .errors
        .iter()
        .any(|e| e.message.contains("Excessive alias count")));
}

// ---------------------------------------------------------------------
// Documents, directives, versions
// ---------------------------------------------------------------------

#[test]
fn multiple_documents_parse_in_order() {
    let docs = parse_all_documents("---\nfirst\n...\n---\nsecond\n", &opts());
    assert_eq!(docs.len(), 2);
    assert_eq!(
        docs[0].to_value().unwrap(),
        Value::String("first".to_string())
    );
    assert_eq!(
        docs[1].to_value().unwrap(),
        Value::String("second".to_string())
    );
}

#[test]
fn parse_document_rejects_surplus_documents() {
    let doc = parse_document("a: 1\n---\nb: 2\n", &opts());
    assert!(doc
        .errors
        .iter()
        .any(|e| e.message.contains("multiple documents")));
}

#[test]
fn version_directive_switches_resolution() {
    let doc = parse_document("%YAML 1.1\n---\nswitch: on\n", &opts());
    assert!(doc.errors.is_empty(), "errors: {:#?}", doc.errors);
    let v = doc.to_value().unwrap();
    assert_eq!(v.get("switch"), Some(&Value::Bool(true)));
    // Under the default 1.2 version `on` stays a string.
    let v = parse("switch: on\n", &opts()).unwrap();
    assert_eq!(v.get("switch"), Some(&Value::String("on".to_string())));
}

#[test]
fn yaml11_schema_enables_merge_keys() {
    let mut options = opts();
    options.schema = SchemaId::Yaml11;
    let v = parse(
        "defaults: &d\n  retries: 3\n  timeout: 30\njob:\n  <<: *d\n  timeout: 60\n",
        &options,
    )
    .unwrap();
    let job = v.get("job").unwrap();
    assert_eq!(job.get("retries"), Some(&Value::Int(3)));
    assert_eq!(job.get("timeout"), Some(&Value::Int(60)));
}

#[test]
fn duplicate_keys_are_preserved_with_warning() {
    let doc = parse_document("k: 1\nk: 2\n", &opts());
    assert!(doc.errors.is_empty());
    assert!(doc
        .warnings
        .iter()
        .any(|w| w.message.contains("must be unique")));
    let map = doc.contents.as_ref().unwrap().as_map().unwrap();
    assert_eq!(map.items.len(), 2);
}

#[test]
fn alias_before_anchor_is_a_reference_error() {
    let doc = parse_document("a: *later\nb: &later 1\n", &opts());
    assert!(doc
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::Reference && e.message.contains("later")));
    // Best effort: the alias slot resolves to null.
    let v = doc.to_value().unwrap();
    assert_eq!(v.get("a"), Some(&Value::Null));
    assert_eq!(v.get("b"), Some(&Value::Int(1)));
}

#[test]
fn anchor_redefinition_applies_to_later_aliases() {
    let v = parse("a: &x 1\nb: *x\nc: &x 2\nd: *x\n", &opts()).unwrap();
    assert_eq!(v.get("b"), Some(&Value::Int(1)));
    assert_eq!(v.get("d"), Some(&Value::Int(2)));
}

#[test]
fn pretty_errors_include_caret_excerpt() {
    let doc = parse_document("{ , }", &opts());
    let msg = &doc.errors[0].message;
    assert!(msg.contains("at line 1, column 3"), "message: {msg}");
    assert!(msg.contains("{ , }"), "message: {msg}");
    assert!(msg.contains("^"), "message: {msg}");
}

#[test]
fn pretty_errors_disabled_keep_plain_messages() {
    let mut options = opts();
    options.pretty_errors = false;
    let doc = parse_document("{ , }", &options);
    assert!(doc.errors[0].line_pos.is_none());
    assert!(!doc.errors[0].message.contains("at line"));
}

#[test]
fn errors_accumulate_in_source_order() {
    let doc = parse_document("{ , }\n", &opts());
    assert!(!doc.errors.is_empty());
    let mut last = 0;
    for err in &doc.errors {
        assert!(err.range.start >= last);
        last = err.range.start;
    }
}
