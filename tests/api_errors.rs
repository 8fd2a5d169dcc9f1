// Error paths of the document API: malformed text, missing files, unbound paths
// and invalid node names.

use syml_core::{Document, NodeError, SymlError};
use tempfile::tempdir;

#[test]
fn test_api_parse_str_lex_error() {
    let result = Document::parse_str("key value\n");
    if let Err(SymlError::Lex(err)) = result {
        assert_eq!(err.message(), "A key must always be followed by a colon.");
    } else {
        panic!("Expected lex error");
    }
}

#[test]
fn test_api_parse_str_parse_error() {
    let result = Document::parse_str("a: 1\n    b: 2\n");
    if let Err(SymlError::Parse(err)) = result {
        assert_eq!(err.line(), 2);
    } else {
        panic!("Expected parse error");
    }
}

#[test]
fn test_api_load_without_bound_path() {
    let mut doc = Document::new();
    assert!(matches!(doc.load(), Err(SymlError::NoPath)));
}

#[test]
fn test_api_save_without_bound_path() {
    let doc = Document::parse_str("a: 1\n").unwrap();
    assert!(!doc.save());
}

#[test]
fn test_api_save_into_missing_directory() {
    let dir = tempdir().unwrap();
    let doc = Document::parse_str("a: 1\n").unwrap();
    assert!(!doc.save_to(dir.path().join("no").join("such").join("dir.syml")));
}

#[test]
fn test_api_load_directory_is_not_a_file() {
    let dir = tempdir().unwrap();
    let mut doc = Document::parse_str("kept: yes\n").unwrap();
    assert!(!doc.load_from(dir.path()).unwrap());
    assert_eq!(doc.get_string("kept", ""), "yes");
}

#[test]
fn test_api_load_parse_error_keeps_tree() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.syml");
    std::fs::write(&path, "a:\n    b: 1\n  c: 2\n").unwrap();

    let mut doc = Document::parse_str("kept: yes\n").unwrap();
    doc.set_path(&path);
    let err = doc.load().unwrap_err();
    assert!(matches!(err, SymlError::Parse(_)));
    assert_eq!(doc.keys(), vec!["kept"]);
}

#[test]
fn test_api_invalid_names() {
    let mut doc = Document::new();
    for path in ["", ".", "a.", ".a", "a..b"] {
        assert!(
            matches!(doc.set(path, 1), Err(NodeError::InvalidName(_))),
            "{path:?} should be rejected"
        );
    }
    assert!(doc.keys().is_empty());
}

#[test]
fn test_api_missing_paths() {
    let mut doc = Document::parse_str("a:\n    b: 1\n").unwrap();
    assert_eq!(doc.get("a.c"), None);
    assert_eq!(doc.get("a"), None);
    assert_eq!(doc.get_keys("x.y"), None);
    assert_eq!(doc.comment("x"), None);
    assert!(!doc.remove("x"));
    assert!(!doc.set_comment("x", Some("nope")));
}

#[test]
fn test_api_error_display() {
    let err = Document::parse_str("a:b\n").unwrap_err();
    let error_string = format!("{}", err);
    assert!(error_string.contains("line 1, column 3"));

    let err = SymlError::from(NodeError::InvalidName("a..b".into()));
    assert!(err.to_string().contains("a..b"));
}

#[test]
fn test_api_rejects_names_that_cannot_be_written_back() {
    let mut doc = Document::new();
    for path in ["#x", "- a", "a:b", " lead", "a\nb", "a\r", "ok.#nested"] {
        assert!(
            matches!(doc.set(path, 1), Err(NodeError::InvalidName(_))),
            "{path:?} should be rejected"
        );
    }
    assert!(doc.keys().is_empty());
    assert_eq!(doc.encode(), "");
}

#[test]
fn test_api_accepted_names_survive_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("names.syml");

    let mut doc = Document::new();
    doc.set("with space.trail ", 1).unwrap();
    doc.set("dash-in-middle", "x").unwrap();
    assert!(doc.save_to(&path));

    let mut loaded = Document::new();
    assert!(loaded.load_from(&path).unwrap());
    assert_eq!(loaded, doc);
    assert_eq!(loaded.get_int("with space.trail ", 0), 1);
}
