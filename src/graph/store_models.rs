use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Free-form node/edge attributes, merged last-write-wins per key
pub type Attrs = HashMap<String, serde_json::Value>;

/// Node labels in the code graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    Class,
    Function,
    Method,
    Field,
    GlobalVariable,
    /// Created from a reference before the definition was seen
    Placeholder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "MODULE",
            NodeKind::Class => "CLASS",
            NodeKind::Function => "FUNCTION",
            NodeKind::Method => "METHOD",
            NodeKind::Field => "FIELD",
            NodeKind::GlobalVariable => "GLOBAL_VARIABLE",
            NodeKind::Placeholder => "none",
        }
    }

    /// Whether an existing node of this kind may be relabelled as `new`.
    ///
    /// Placeholders take any real kind; a FUNCTION becomes a METHOD once its
    /// parent turns out to be a class. Nothing else changes kind.
    pub fn can_become(self, new: NodeKind) -> bool {
        match (self, new) {
            (a, b) if a == b => false,
            (NodeKind::Placeholder, _) => true,
            (NodeKind::Function, NodeKind::Method) => true,
            _ => false,
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the code graph, unique per (task, full_name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeNode {
    pub task: String,
    pub kind: NodeKind,
    pub full_name: String,
    pub properties: Attrs,
}

impl CodeNode {
    pub fn new(task: &str, kind: NodeKind, full_name: &str) -> Self {
        Self {
            task: task.to_string(),
            kind,
            full_name: full_name.to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Merge attributes, later values win
    pub fn merge(&mut self, attrs: Attrs) {
        self.properties.extend(attrs);
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(|v| v.as_i64())
    }

    /// Short name: the `name` attribute, or the last dotted segment
    pub fn name(&self) -> &str {
        self.get_str("name").unwrap_or_else(|| {
            self.full_name
                .rsplit('.')
                .next()
                .unwrap_or(&self.full_name)
        })
    }

    pub fn file_path(&self) -> Option<&str> {
        self.get_str("file_path")
    }

    pub fn code(&self) -> Option<&str> {
        self.get_str("code")
    }

    pub fn lines(&self) -> Option<(u32, u32)> {
        let start = self.get_i64("start_line")?;
        let end = self.get_i64("end_line")?;
        Some((start as u32, end as u32))
    }
}

/// Relationship types in the code graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Contains,
    Inherits,
    HasMethod,
    HasField,
    Calls,
    Uses,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Inherits => "INHERITS",
            EdgeKind::HasMethod => "HAS_METHOD",
            EdgeKind::HasField => "HAS_FIELD",
            EdgeKind::Calls => "CALL",
            EdgeKind::Uses => "USES",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An edge in the code graph, unique per (kind, start, end)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEdge {
    pub kind: EdgeKind,
    pub properties: Attrs,
}

impl CodeEdge {
    pub fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            properties: HashMap::new(),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// Build an [`Attrs`] map from key/value pairs
#[macro_export]
macro_rules! attrs {
    () => { $crate::graph::Attrs::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::graph::Attrs::new();
        $( map.insert($key.to_string(), serde_json::Value::from($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_promotion_rules() {
        assert!(NodeKind::Placeholder.can_become(NodeKind::Class));
        assert!(NodeKind::Function.can_become(NodeKind::Method));
        assert!(!NodeKind::Method.can_become(NodeKind::Function));
        assert!(!NodeKind::Class.can_become(NodeKind::Placeholder));
        assert!(!NodeKind::Class.can_become(NodeKind::Class));
    }

    #[test]
    fn test_node_name_falls_back_to_last_segment() {
        let node = CodeNode::new("t", NodeKind::Class, "pkg.mod.Foo");
        assert_eq!(node.name(), "Foo");
        let named = node.with_property("name", "Bar");
        assert_eq!(named.name(), "Bar");
    }
}
