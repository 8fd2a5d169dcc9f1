use crate::error::NodeError;
use crate::value::Value;
use std::ops::{Index, IndexMut};

/// Separates the levels of a dotted path such as `settings.hunger-multiplier`.
pub const PATH_DELIMITER: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(Value),
    /// Children in insertion order. A key without a value is an empty branch.
    Branch(Vec<NodeId>),
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    comment: Option<String>,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            comment: None,
            parent,
            kind: NodeKind::Branch(Vec::new()),
        }
    }

    /// The key under which the parent addresses this node. Empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The comment attached to this node. Lines are separated by `\n`.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Branch(_) => None,
        }
    }

    /// Children in document order; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Branch(children) => children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch(_))
    }
}

/// Arena-backed document tree with a nameless root.
///
/// Nodes refer to each other through [`NodeId`] handles. A node is either a leaf holding
/// one [`Value`] or a branch holding an ordered list of children, never both.
/// Handles stay valid until their node is removed. Slots of removed nodes are reused,
/// so a handle kept past removal may point at an unrelated node.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(String::new(), None))],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self[self.root].children().is_empty()
    }

    /// Drops every node but the root, which becomes an empty branch again.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Walks parent links up to the node without a parent.
    pub fn root_of(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self[id].parent {
            id = parent;
        }
        id
    }

    /// True if `ancestor` is `id` itself or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self[current].parent;
        }
        false
    }

    /// The dotted path from the root to `id`. Empty for the root.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self[cursor].parent {
            names.push(self[cursor].name.as_str());
            cursor = parent;
        }
        names.reverse();
        names.join(".")
    }

    /// The direct child of `parent` called `name`.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self[parent]
            .children()
            .iter()
            .copied()
            .find(|&child| self[child].name == name)
    }

    /// Follows a dotted path down from `from`. Empty segments never match.
    pub fn resolve(&self, from: NodeId, path: &str) -> Option<NodeId> {
        path.split(PATH_DELIMITER)
            .try_fold(from, |node, segment| self.child(node, segment))
    }

    /// Mutable access to a leaf's value, e.g. to extend a list in place.
    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut Value> {
        match &mut self[id].kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Branch(_) => None,
        }
    }

    pub fn value_at(&self, from: NodeId, path: &str) -> Option<&Value> {
        self.resolve(from, path).and_then(|id| self[id].value())
    }

    /// Follows a dotted path down from `from`, creating missing nodes on the way.
    ///
    /// Leaves met on the way become branches and lose their value.
    pub fn resolve_or_create(&mut self, from: NodeId, path: &str) -> Result<NodeId, NodeError> {
        validate_path(path)?;
        let mut node = from;
        for segment in path.split(PATH_DELIMITER) {
            node = match self.child(node, segment) {
                Some(child) => child,
                None => self.add_child(node, segment.to_string()),
            };
        }
        Ok(node)
    }

    /// Stores `value` on `id`, dropping any children it had.
    pub fn set_value(&mut self, id: NodeId, value: Value) -> Result<(), NodeError> {
        if id == self.root {
            return Err(NodeError::RootValue);
        }
        self.convert_to_leaf(id, value);
        Ok(())
    }

    /// Stores `value` at the dotted `path` below `from`, creating branches as needed.
    pub fn set(
        &mut self,
        from: NodeId,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<NodeId, NodeError> {
        let id = self.resolve_or_create(from, path)?;
        self.set_value(id, value.into())?;
        Ok(id)
    }

    /// Removes the node at `path` below `from` together with its subtree.
    ///
    /// The parent keeps being a branch, possibly an empty one. Returns false if nothing
    /// was there.
    pub fn remove(&mut self, from: NodeId, path: &str) -> bool {
        match self.resolve(from, path) {
            Some(id) => {
                self.detach(id);
                self.free_subtree(id);
                true
            }
            None => false,
        }
    }

    pub fn set_comment(&mut self, id: NodeId, comment: Option<String>) {
        self[id].comment = comment;
    }

    /// Names of the direct children of `id`, in document order.
    pub fn keys(&self, id: NodeId) -> Vec<String> {
        self[id]
            .children()
            .iter()
            .map(|&child| self[child].name.clone())
            .collect()
    }

    /// Moves `node` (and its subtree) under `parent`, replacing a sibling of the same name.
    ///
    /// Fails without touching the tree if `node` is `parent` or one of its ancestors.
    /// A leaf `parent` becomes a branch and loses its value.
    pub fn attach(&mut self, parent: NodeId, node: NodeId) -> Result<(), NodeError> {
        if self.is_ancestor_or_self(node, parent) {
            return Err(NodeError::Cycle {
                node: self.path_of(node),
                target: self.path_of(parent),
            });
        }
        // Unlink first: the sibling being replaced may be an ancestor of `node`.
        self.detach(node);
        let name = self[node].name.clone();
        if let Some(existing) = self.child(parent, &name) {
            self.detach(existing);
            self.free_subtree(existing);
        }
        self.convert_to_branch(parent);
        self[node].parent = Some(parent);
        if let NodeKind::Branch(children) = &mut self[parent].kind {
            children.push(node);
        }
        Ok(())
    }

    /// Copies `other_id` from `other` into this tree below `parent`.
    ///
    /// Copying another tree's root merges its children instead, skipping names that
    /// `parent` already has. Otherwise the copy replaces a same-named child.
    pub fn graft(
        &mut self,
        parent: NodeId,
        other: &Tree,
        other_id: NodeId,
    ) -> NodeId {
        if other_id == other.root {
            for &child in other[other_id].children() {
                if self.child(parent, &other[child].name).is_none() {
                    self.copy_from(parent, other, child);
                }
            }
            return parent;
        }
        if self.child(parent, &other[other_id].name).is_some() {
            self.remove(parent, &other[other_id].name);
        }
        self.copy_from(parent, other, other_id)
    }

    /// Structural equality: leaves compare values, branches compare their children by
    /// name (recursively, ignoring order). Comments never take part, and a leaf never
    /// equals a branch.
    pub fn nodes_equal(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        match (&self[a].kind, &other[b].kind) {
            (NodeKind::Leaf(x), NodeKind::Leaf(y)) => x == y,
            (NodeKind::Branch(xs), NodeKind::Branch(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|&x| {
                        other
                            .child(b, &self[x].name)
                            .is_some_and(|y| self.nodes_equal(x, other, y))
                    })
            }
            _ => false,
        }
    }

    /// Depth-first, document-order walk over the subtree below `id` (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self[id].children().to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn add_child(&mut self, parent: NodeId, name: String) -> NodeId {
        self.convert_to_branch(parent);
        let id = self.alloc(Node::new(name, Some(parent)));
        if let NodeKind::Branch(children) = &mut self[parent].kind {
            children.push(id);
        }
        id
    }

    fn copy_from(&mut self, parent: NodeId, other: &Tree, other_id: NodeId) -> NodeId {
        let source = &other[other_id];
        let id = self.add_child(parent, source.name.clone());
        self[id].comment = source.comment.clone();
        match &source.kind {
            NodeKind::Leaf(value) => self[id].kind = NodeKind::Leaf(value.clone()),
            NodeKind::Branch(children) => {
                for &child in children {
                    self.copy_from(id, other, child);
                }
            }
        }
        id
    }

    /// Unlinks `id` from its parent's child list. The node itself stays allocated.
    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self[id].parent.take() {
            if let NodeKind::Branch(children) = &mut self[parent].kind {
                children.retain(|&child| child != id);
            }
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes[id.0].take() {
            if let NodeKind::Branch(children) = node.kind {
                for child in children {
                    self.free_subtree(child);
                }
            }
            self.free.push(id.0);
        }
    }

    fn convert_to_branch(&mut self, id: NodeId) {
        if self[id].is_leaf() {
            self[id].kind = NodeKind::Branch(Vec::new());
        }
    }

    fn convert_to_leaf(&mut self, id: NodeId, value: Value) {
        let old = std::mem::replace(&mut self[id].kind, NodeKind::Leaf(value));
        if let NodeKind::Branch(children) = old {
            for child in children {
                self[child].parent = None;
                self.free_subtree(child);
            }
        }
    }
}

/// A single name that encodes back to the same key line.
///
/// Names must be non-empty and may not contain `.`, `:`, `#` or line breaks, nor start
/// with whitespace or `-`.
pub fn validate_name(name: &str) -> Result<(), NodeError> {
    let starts_badly = name
        .chars()
        .next()
        .map_or(true, |first| first.is_whitespace() || first == '-');
    let has_reserved = name
        .chars()
        .any(|c| matches!(c, PATH_DELIMITER | ':' | '#' | '\n' | '\r'));
    if starts_badly || has_reserved {
        Err(NodeError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// A dotted path: every segment must be a valid name.
pub fn validate_path(path: &str) -> Result<(), NodeError> {
    path.split(PATH_DELIMITER)
        .try_for_each(validate_name)
        .map_err(|_| NodeError::InvalidName(path.to_string()))
}

impl Index<NodeId> for Tree {
    type Output = Node;

    /// Panics on a handle whose node has been removed.
    fn index(&self, id: NodeId) -> &Node {
        self.get(id).expect("stale node handle")
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .expect("stale node handle")
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.nodes_equal(self.root, other, other.root)
    }
}

pub struct Descendants<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree[id].children().iter().rev().copied());
        Some(id)
    }
}
