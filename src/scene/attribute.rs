use bitflags::bitflags;

use crate::scene::NodeHandle;

bitflags! {
    /// Category tags used to filter [`NodeStore::list_attrs`](crate::scene::NodeStore::list_attrs).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct AttrCategory: u32 {
        /// Attributes every node of a type has (`visibility`, `inheritsTransform`, ...).
        const BUILTIN = 1 << 0;
        /// Declared fields of a field-backed node.
        const FIELD = 1 << 1;
        /// Attributes added by tools (`module` back-references, controller data).
        const USER = 1 << 2;
        /// Backups of another node's attribute, named `{node}__{attr}`.
        const PERSISTENT_BACKUP = 1 << 3;
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Reference to a single node.
    Node(Option<NodeHandle>),
    /// Ordered references to nodes.
    NodeList(Vec<NodeHandle>),
    /// Connection-only plug without a value of its own.
    Message,
}

impl AttrValue {
    /// Human readable name of the value kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::String(_) => "string",
            AttrValue::Node(_) => "node",
            AttrValue::NodeList(_) => "node list",
            AttrValue::Message => "message",
        }
    }

    /// Whether `other` may be written into an attribute holding `self`.
    #[must_use]
    pub fn same_kind(&self, other: &AttrValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Empty strings, `false`, zero, unset references and empty lists are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Bool(b) => *b,
            AttrValue::Int(i) => *i != 0,
            AttrValue::Float(f) => *f != 0.0,
            AttrValue::String(s) => !s.is_empty(),
            AttrValue::Node(n) => n.is_some(),
            AttrValue::NodeList(l) => !l.is_empty(),
            AttrValue::Message => false,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<Option<NodeHandle>> {
        match self {
            AttrValue::Node(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node_list(&self) -> Option<&[NodeHandle]> {
        match self {
            AttrValue::NodeList(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<NodeHandle> for AttrValue {
    fn from(value: NodeHandle) -> Self {
        AttrValue::Node(Some(value))
    }
}

impl From<Vec<NodeHandle>> for AttrValue {
    fn from(value: Vec<NodeHandle>) -> Self {
        AttrValue::NodeList(value)
    }
}

/// A named attribute stored on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
    pub category: AttrCategory,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, value: AttrValue, category: AttrCategory) -> Self {
        Self {
            name: name.into(),
            value,
            category,
        }
    }
}
