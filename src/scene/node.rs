use crate::scene::attribute::{AttrCategory, AttrValue, Attribute};
use crate::scene::transform::Transform;
use crate::scene::NodeHandle;

/// Node types that live in the transform hierarchy and carry the
/// builtin `visibility` / `inheritsTransform` attributes.
const DAG_TYPES: &[&str] = &["transform", "joint", "locator"];

pub const VISIBILITY: &str = "visibility";
pub const INHERITS_TRANSFORM: &str = "inheritsTransform";

/// A node record held by [`MemoryScene`](crate::scene::MemoryScene).
///
/// # Hierarchy
///
/// - `parent`: Optional handle to the parent node (None for root nodes)
/// - `children`: Child handles, in parenting order
///
/// # Attributes
///
/// Attributes are kept in creation order, which is the order
/// [`NodeStore::list_attrs`](crate::scene::NodeStore::list_attrs) reports.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) node_type: String,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,
    pub(crate) attributes: Vec<Attribute>,
}

impl SceneNode {
    /// Creates a node, with builtin attributes for DAG node types.
    #[must_use]
    pub fn new(node_type: &str, name: &str) -> Self {
        let mut attributes = Vec::new();
        if Self::is_dag_type(node_type) {
            attributes.push(Attribute::new(VISIBILITY, AttrValue::Bool(true), AttrCategory::BUILTIN));
            attributes.push(Attribute::new(
                INHERITS_TRANSFORM,
                AttrValue::Bool(true),
                AttrCategory::BUILTIN,
            ));
        }
        Self {
            name: name.to_string(),
            node_type: node_type.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            attributes,
        }
    }

    #[must_use]
    pub fn is_dag_type(node_type: &str) -> bool {
        DAG_TYPES.contains(&node_type)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub(crate) fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// False when the node ignores its parent's transform.
    #[must_use]
    pub fn inherits_transform(&self) -> bool {
        self.attribute(INHERITS_TRANSFORM)
            .and_then(|a| a.value.as_bool())
            .unwrap_or(true)
    }
}
