use crate::tree::{NodeId, NodeKind, Tree};
use crate::value::Value;

/// Layout options for encoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Spaces per nesting level (default: 4)
    pub indent_width: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of spaces per nesting level.
    pub fn indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }
}

/// Renders a [`Tree`] back into SYML text.
///
/// The output is canonical: encoding, parsing and encoding again yields the same bytes.
pub struct Encoder<'t> {
    tree: &'t Tree,
    options: EncodeOptions,
}

impl<'t> Encoder<'t> {
    pub fn new(tree: &'t Tree) -> Self {
        Self::with_options(tree, EncodeOptions::default())
    }

    pub fn with_options(tree: &'t Tree, options: EncodeOptions) -> Self {
        Self { tree, options }
    }

    /// The whole document. The root's own comment is not part of the text.
    pub fn encode(&self) -> String {
        self.encode_children(self.tree.root())
    }

    /// The children of `id`, starting at indent 0.
    pub fn encode_children(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.tree[id].children() {
            self.write_node(&mut out, child, 0);
        }
        out
    }

    /// `id` itself, key line included, starting at indent 0.
    pub fn encode_node(&self, id: NodeId) -> String {
        if id == self.tree.root() {
            return self.encode();
        }
        let mut out = String::new();
        self.write_node(&mut out, id, 0);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let node = &self.tree[id];
        let indent = " ".repeat(depth * self.options.indent_width);

        if let Some(comment) = node.comment() {
            for line in comment.split('\n') {
                out.push_str(&indent);
                out.push('#');
                if line != " " {
                    out.push_str(line);
                }
                out.push('\n');
            }
        }

        out.push_str(&indent);
        out.push_str(node.name());
        out.push(':');

        match node.kind() {
            NodeKind::Leaf(Value::List(items)) => {
                out.push('\n');
                let item_indent = " ".repeat((depth + 1) * self.options.indent_width);
                for item in items {
                    out.push_str(&item_indent);
                    out.push_str("- ");
                    out.push_str(item);
                    out.push('\n');
                }
            }
            NodeKind::Leaf(value) => {
                let text = value.to_string();
                if !text.is_empty() {
                    out.push(' ');
                    out.push_str(&text);
                }
                out.push('\n');
            }
            NodeKind::Branch(children) => {
                out.push('\n');
                for &child in children {
                    self.write_node(out, child, depth + 1);
                }
            }
        }
    }
}

/// Encodes the whole tree with default options.
pub fn encode(tree: &Tree) -> String {
    Encoder::new(tree).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn sample() -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        let settings = tree.resolve_or_create(root, "settings").unwrap();
        tree.set_comment(settings, Some(" General settings\n \n Edit with care".into()));
        tree.set(root, "settings.affect-hunger", true).unwrap();
        tree.set(root, "settings.hunger-multiplier", 2.0).unwrap();
        tree.set(root, "fruits", vec!["apple", "banana"]).unwrap();
        tree.set(root, "name", "My App").unwrap();
        tree.resolve_or_create(root, "empty").unwrap();
        tree
    }

    const SAMPLE_TEXT: &str = "\
# General settings
#
# Edit with care
settings:
    affect-hunger: true
    hunger-multiplier: 2.0
fruits:
    - apple
    - banana
name: My App
empty:
";

    #[test]
    fn test_encode_sample() {
        assert_eq!(encode(&sample()), SAMPLE_TEXT);
    }

    #[test]
    fn test_canonical_text_is_stable() {
        let tree = parse(SAMPLE_TEXT).unwrap();
        assert_eq!(encode(&tree), SAMPLE_TEXT);
        assert_eq!(tree, sample());
    }

    #[test]
    fn test_custom_indent_width() {
        let tree = sample();
        let text = Encoder::with_options(&tree, EncodeOptions::new().indent_width(2)).encode();
        assert!(text.contains("\n  affect-hunger: true\n"));
        assert!(text.contains("\n  - apple\n"));
        assert_eq!(parse(&text).unwrap(), tree);
    }

    #[test]
    fn test_empty_string_renders_bare_key() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.set(root, "blank", "").unwrap();
        tree.set(root, "none", Vec::<String>::new()).unwrap();
        assert_eq!(encode(&tree), "blank:\nnone:\n");
    }

    #[test]
    fn test_encode_node_and_children() {
        let tree = sample();
        let settings = tree.resolve(tree.root(), "settings").unwrap();
        let encoder = Encoder::new(&tree);
        assert_eq!(
            encoder.encode_children(settings),
            "affect-hunger: true\nhunger-multiplier: 2.0\n"
        );
        let fruits = tree.resolve(tree.root(), "fruits").unwrap();
        assert_eq!(encoder.encode_node(fruits), "fruits:\n    - apple\n    - banana\n");
    }

    #[test]
    fn test_root_comment_is_ignored() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.set_comment(root, Some(" header".into()));
        tree.set(root, "a", 1).unwrap();
        assert_eq!(encode(&tree), "a: 1\n");
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(encode(&Tree::new()), "");
    }
}
