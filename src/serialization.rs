use crate::tree::{NodeId, NodeKind, Tree};
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A serde-friendly snapshot of a subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
    Map(Entries),
}

/// Map entries in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entries(pub Vec<(String, ExportValue)>);

impl Entries {
    pub fn get(&self, key: &str) -> Option<&ExportValue> {
        self.0.iter().find(|(name, _)| name == key).map(|(_, value)| value)
    }
}

impl Serialize for Entries {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl From<&Value> for ExportValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => ExportValue::Bool(*b),
            Value::Int(i) => ExportValue::Int(*i),
            Value::Float(f) => ExportValue::Float(*f),
            Value::String(s) => ExportValue::String(s.clone()),
            Value::List(items) => ExportValue::List(items.clone()),
        }
    }
}

pub(crate) fn to_value(tree: &Tree, id: NodeId) -> ExportValue {
    match tree[id].kind() {
        NodeKind::Leaf(value) => value.into(),
        NodeKind::Branch(children) => ExportValue::Map(Entries(
            children
                .iter()
                .map(|&child| (tree[child].name().to_string(), to_value(tree, child)))
                .collect(),
        )),
    }
}
