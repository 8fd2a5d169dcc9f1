use crate::encoder::{EncodeOptions, Encoder};
use crate::encoding::TextEncoding;
use crate::error::{NodeError, SymlError};
use crate::parser::Parser;
use crate::serialization::{to_value, ExportValue};
use crate::tree::{NodeId, Tree};
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A SYML document: a tree, optionally bound to a file.
///
/// All lookups take dotted paths relative to the root, such as
/// `settings.hunger-multiplier`.
#[derive(Debug, Clone, Default)]
pub struct Document {
    tree: Tree,
    path: Option<PathBuf>,
    encoding: TextEncoding,
    options: EncodeOptions,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty document bound to `path`. Nothing is read until [`Document::load`].
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parses `text` into a new, unbound document.
    ///
    /// # Errors
    /// Returns a lex or parse error for malformed text.
    pub fn parse_str(text: &str) -> Result<Self, SymlError> {
        Self::parse_named(text, "source.syml")
    }

    fn parse_named(text: &str, name: &str) -> Result<Self, SymlError> {
        let tree = Parser::new_with_name(text, name)?.parse_tree()?;
        Ok(Self {
            tree,
            ..Self::default()
        })
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Selects the encoding for later loads and saves. Returns false, and keeps the
    /// current encoding, if `label` is not supported.
    pub fn set_encoding(&mut self, label: &str) -> bool {
        match TextEncoding::for_label(label) {
            Some(encoding) => {
                self.encoding = encoding;
                true
            }
            None => {
                log::debug!("unsupported encoding label {label:?}, keeping {}", self.encoding);
                false
            }
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn set_encode_options(&mut self, options: EncodeOptions) {
        self.options = options;
    }

    pub fn encode_options(&self) -> EncodeOptions {
        self.options
    }

    /// Loads the bound file. See [`Document::load_from`].
    ///
    /// # Errors
    /// [`SymlError::NoPath`] if no file is bound, otherwise as for `load_from`.
    pub fn load(&mut self) -> Result<bool, SymlError> {
        let path = self.path.clone().ok_or(SymlError::NoPath)?;
        self.load_from(path)
    }

    /// Replaces the tree with the contents of `path`.
    ///
    /// Returns `Ok(false)` when the file is missing, unreadable, or not valid in the
    /// selected encoding. The bound path is left alone.
    ///
    /// # Errors
    /// Returns a lex or parse error for malformed text. The current tree is kept.
    pub fn load_from(&mut self, path: impl AsRef<Path>) -> Result<bool, SymlError> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist, nothing loaded", path.display());
                return Ok(false);
            }
            Err(err) => {
                log::warn!("could not read {}: {err}", path.display());
                return Ok(false);
            }
        };
        let Some(text) = self.encoding.decode(&bytes) else {
            log::warn!("{} is not valid {}", path.display(), self.encoding);
            return Ok(false);
        };

        let name = path.display().to_string();
        let tree = Parser::new_with_name(&text, &name)?.parse_tree()?;
        log::debug!("loaded {} nodes from {}", tree.len() - 1, path.display());
        self.tree = tree;
        Ok(true)
    }

    /// Saves to the bound file. False if no file is bound.
    pub fn save(&self) -> bool {
        match &self.path {
            Some(path) => self.save_to(path),
            None => {
                log::warn!("save requested, but no file is bound");
                false
            }
        }
    }

    /// Writes the encoded document to `path`, creating the file if needed.
    ///
    /// The text goes to a temporary file next to `path` that then replaces it, so a
    /// failed save never leaves a truncated file behind. Returns false on any I/O or
    /// encoding failure.
    pub fn save_to(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let text = self.encode();
        let Some(bytes) = self.encoding.encode(&text) else {
            log::warn!("document cannot be represented in {}", self.encoding);
            return false;
        };
        match write_atomically(path, &bytes) {
            Ok(()) => {
                log::debug!("saved {} bytes to {}", bytes.len(), path.display());
                true
            }
            Err(err) => {
                log::warn!("could not save {}: {err}", path.display());
                false
            }
        }
    }

    /// The canonical text of the whole document.
    pub fn encode(&self) -> String {
        Encoder::with_options(&self.tree, self.options).encode()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    fn node(&self, path: &str) -> Option<NodeId> {
        self.tree.resolve(self.tree.root(), path)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.tree.value_at(self.tree.root(), path)
    }

    /// True if a node exists at `path`, with or without a value.
    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Integers that do not fit an `i32` yield the default.
    pub fn get_int(&self, path: &str, default: i32) -> i32 {
        self.get(path).and_then(Value::as_i32).unwrap_or(default)
    }

    pub fn get_long(&self, path: &str, default: i64) -> i64 {
        self.get(path).and_then(Value::as_i64).unwrap_or(default)
    }

    /// Integers are widened.
    pub fn get_double(&self, path: &str, default: f64) -> f64 {
        self.get(path).and_then(Value::as_f64).unwrap_or(default)
    }

    /// The text form of any value. Branches and missing paths yield the default.
    pub fn get_string(&self, path: &str, default: &str) -> String {
        self.get(path)
            .map_or_else(|| default.to_string(), ToString::to_string)
    }

    pub fn get_string_list(&self, path: &str, default: Vec<String>) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_list)
            .map_or(default, <[String]>::to_vec)
    }

    /// Stores `value` at `path`, creating intermediate branches.
    ///
    /// # Errors
    /// [`NodeError::InvalidName`] if `path` has an empty segment.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), NodeError> {
        let root = self.tree.root();
        self.tree.set(root, path, value).map(|_| ())
    }

    /// Removes the node at `path` with everything below it. Ancestors stay.
    pub fn remove(&mut self, path: &str) -> bool {
        let root = self.tree.root();
        self.tree.remove(root, path)
    }

    /// Child names of the node at `path`; `None` if there is no such node.
    pub fn get_keys(&self, path: &str) -> Option<Vec<String>> {
        self.node(path).map(|id| self.tree.keys(id))
    }

    /// Names of the top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.tree.keys(self.tree.root())
    }

    pub fn comment(&self, path: &str) -> Option<&str> {
        self.node(path).and_then(|id| self.tree[id].comment())
    }

    /// Attaches a comment to the node at `path`. Returns false if there is no such node.
    pub fn set_comment(&mut self, path: &str, comment: Option<&str>) -> bool {
        match self.node(path) {
            Some(id) => {
                self.tree.set_comment(id, comment.map(str::to_string));
                true
            }
            None => false,
        }
    }

    /// A serializable snapshot of the document.
    #[must_use]
    pub fn to_value(&self) -> ExportValue {
        to_value(&self.tree, self.tree.root())
    }

    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl FromStr for Document {
    type Err = SymlError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse_str(text)
    }
}

/// Structural equality of the trees; paths and settings are not compared.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SETTINGS: &str = "\
# Main settings
settings:
    affect-hunger: true
    hunger-multiplier: 1.5
    max-players: 12
    motd: Hello there
fruits:
    - apple
    - banana
";

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_document_is_send_and_sync() {
        assert_send_sync::<Document>();
    }

    #[test]
    fn test_typed_getters() {
        let doc = Document::parse_str(SETTINGS).unwrap();
        assert!(doc.get_bool("settings.affect-hunger", false));
        assert_eq!(doc.get_double("settings.hunger-multiplier", 0.0), 1.5);
        assert_eq!(doc.get_int("settings.max-players", 0), 12);
        assert_eq!(doc.get_long("settings.max-players", 0), 12);
        assert_eq!(doc.get_double("settings.max-players", 0.0), 12.0);
        assert_eq!(doc.get_string("settings.motd", ""), "Hello there");
        assert_eq!(
            doc.get_string_list("fruits", Vec::new()),
            vec!["apple".to_string(), "banana".to_string()]
        );
    }

    #[test]
    fn test_getters_fall_back_to_default() {
        let doc = Document::parse_str(SETTINGS).unwrap();
        assert!(doc.get_bool("settings.motd", true));
        assert_eq!(doc.get_int("settings.hunger-multiplier", 7), 7);
        assert_eq!(doc.get_int("missing", -1), -1);
        assert_eq!(doc.get_string("settings", "branch"), "branch");
        assert_eq!(doc.get_string_list("settings.motd", vec!["x".into()]), vec!["x"]);
        assert_eq!(doc.get_string("settings.max-players", ""), "12");
    }

    #[test]
    fn test_get_int_range_check() {
        let mut doc = Document::new();
        doc.set("big", 5_000_000_000i64).unwrap();
        assert_eq!(doc.get_int("big", 0), 0);
        assert_eq!(doc.get_long("big", 0), 5_000_000_000);
    }

    #[test]
    fn test_set_remove_and_keys() {
        let mut doc = Document::new();
        doc.set("a.b.c", 1).unwrap();
        doc.set("a.d", "text").unwrap();
        assert_eq!(doc.keys(), vec!["a"]);
        assert_eq!(doc.get_keys("a"), Some(vec!["b".to_string(), "d".to_string()]));
        assert_eq!(doc.get_keys("a.d"), Some(Vec::new()));
        assert_eq!(doc.get_keys("nope"), None);

        assert!(doc.remove("a.b.c"));
        assert!(doc.contains("a.b"));
        assert_eq!(doc.get_keys("a.b"), Some(Vec::new()));
        assert!(!doc.remove("a.b.c"));
        assert!(matches!(doc.set("a..b", 1), Err(NodeError::InvalidName(_))));
    }

    #[test]
    fn test_comments() {
        let mut doc = Document::parse_str(SETTINGS).unwrap();
        assert_eq!(doc.comment("settings"), Some(" Main settings"));
        assert!(doc.set_comment("fruits", Some(" Fresh")));
        assert!(!doc.set_comment("missing", Some("x")));
        assert!(doc.encode().contains("# Fresh\nfruits:\n"));
        assert!(doc.set_comment("settings", None));
        assert!(doc.encode().starts_with("settings:\n"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.syml");

        let doc = Document::parse_str(SETTINGS).unwrap();
        assert!(doc.save_to(&path));
        assert_eq!(fs::read_to_string(&path).unwrap(), SETTINGS);

        let mut loaded = Document::with_path(&path);
        assert!(loaded.load().unwrap());
        assert_eq!(loaded, doc);
        assert_eq!(loaded.encode(), SETTINGS);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let mut doc = Document::parse_str("keep: me\n").unwrap();
        assert!(!doc.load_from(dir.path().join("absent.syml")).unwrap());
        assert_eq!(doc.get_string("keep", ""), "me");
    }

    #[test]
    fn test_load_without_path() {
        let mut doc = Document::new();
        assert!(matches!(doc.load(), Err(SymlError::NoPath)));
        assert!(!doc.save());
    }

    #[test]
    fn test_failed_load_keeps_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.syml");
        fs::write(&path, "good: 1\nbad line\n").unwrap();

        let mut doc = Document::parse_str("old: value\n").unwrap();
        let err = doc.load_from(&path).unwrap_err();
        assert!(matches!(err, SymlError::Lex(_)));
        assert_eq!(doc.keys(), vec!["old"]);
    }

    #[test]
    fn test_latin1_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.syml");

        let mut doc = Document::with_path(&path);
        assert!(doc.set_encoding("ISO-8859-1"));
        assert!(!doc.set_encoding("klingon"));
        assert_eq!(doc.encoding(), TextEncoding::Latin1);
        doc.set("name", "café").unwrap();
        assert!(doc.save());
        assert_eq!(fs::read(&path).unwrap(), b"name: caf\xe9\n");

        let mut utf8 = Document::with_path(&path);
        assert!(!utf8.load().unwrap());

        let mut latin = Document::with_path(&path);
        latin.set_encoding("latin1");
        assert!(latin.load().unwrap());
        assert_eq!(latin.get_string("name", ""), "café");
    }

    #[test]
    fn test_unencodable_save_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("euro.syml");
        let mut doc = Document::new();
        doc.set_encoding("latin1");
        doc.set("price", "5 €").unwrap();
        assert!(!doc.save_to(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_encode_options() {
        let mut doc = Document::parse_str(SETTINGS).unwrap();
        doc.set_encode_options(EncodeOptions::new().indent_width(2));
        assert!(doc.encode().contains("\n  motd: Hello there\n"));
    }

    #[test]
    fn test_json_export() {
        let doc: Document = SETTINGS.parse().unwrap();
        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        let expected = serde_json::json!({
            "settings": {
                "affect-hunger": true,
                "hunger-multiplier": 1.5,
                "max-players": 12,
                "motd": "Hello there",
            },
            "fruits": ["apple", "banana"],
        });
        assert_eq!(json, expected);
    }

    #[test]
    fn test_yaml_export_keeps_order() {
        let doc = Document::parse_str("zeta: 1\nalpha: two\n").unwrap();
        assert_eq!(doc.to_yaml().unwrap(), "zeta: 1\nalpha: two\n");
    }
}
