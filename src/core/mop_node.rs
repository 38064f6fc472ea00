//! Field-backed persistent object.

use crate::core::fields::{FieldDescriptor, FieldKind};
use crate::errors::{Result, RigError};
use crate::scene::{AttrCategory, AttrValue, NodeHandle, NodeStore};

/// Fields every [`MopNode`] carries.
pub const MOP_NODE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("is_initialized", FieldKind::Bool),
    FieldDescriptor::new("is_built", FieldKind::Bool),
];

/// A scene node whose attributes store a set of declared fields.
///
/// The handle is all there is: every read goes to the scene, so two
/// `MopNode`s on the same node always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MopNode {
    node: NodeHandle,
}

impl MopNode {
    /// Attaches to the node called `name`, creating it if needed.
    ///
    /// Every field of `fields` missing on the node is added with its default
    /// value; existing values are left untouched.
    pub fn open_or_create<'f>(
        scene: &mut dyn NodeStore,
        name: &str,
        node_type: &str,
        fields: impl IntoIterator<Item = &'f FieldDescriptor>,
    ) -> Result<Self> {
        let node = match scene.find(name) {
            Some(node) => node,
            None => scene.create(node_type, name, None)?,
        };
        for field in MOP_NODE_FIELDS.iter().chain(fields) {
            if !scene.has_attr(node, field.name)? {
                scene.add_attr(node, field.name, field.default_value(), AttrCategory::FIELD)?;
            }
        }
        Ok(Self { node })
    }

    #[must_use]
    pub fn from_handle(node: NodeHandle) -> Self {
        Self { node }
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    pub fn node_name(&self, scene: &dyn NodeStore) -> Result<String> {
        scene.name(self.node)
    }

    pub fn get(&self, scene: &dyn NodeStore, field: &str) -> Result<AttrValue> {
        scene.get_attr(self.node, field)
    }

    /// Validates `value` against `field` and stores it.
    pub fn set(&self, scene: &mut dyn NodeStore, field: &FieldDescriptor, value: AttrValue) -> Result<()> {
        field.validate(&value)?;
        scene.set_attr(self.node, field.name, value)
    }

    fn mismatch(&self, scene: &dyn NodeStore, field: &str, expected: &'static str) -> RigError {
        RigError::TypeMismatch {
            node: scene.name(self.node).unwrap_or_default(),
            attr: field.to_string(),
            expected,
        }
    }

    pub fn get_string(&self, scene: &dyn NodeStore, field: &str) -> Result<String> {
        match self.get(scene, field)? {
            AttrValue::String(s) => Ok(s),
            _ => Err(self.mismatch(scene, field, "string")),
        }
    }

    pub fn get_bool(&self, scene: &dyn NodeStore, field: &str) -> Result<bool> {
        self.get(scene, field)?
            .as_bool()
            .ok_or_else(|| self.mismatch(scene, field, "bool"))
    }

    pub fn get_int(&self, scene: &dyn NodeStore, field: &str) -> Result<i64> {
        self.get(scene, field)?
            .as_int()
            .ok_or_else(|| self.mismatch(scene, field, "int"))
    }

    /// Referenced node, `None` when unset or when the node was deleted.
    pub fn get_node(&self, scene: &dyn NodeStore, field: &str) -> Result<Option<NodeHandle>> {
        let node = self
            .get(scene, field)?
            .as_node()
            .ok_or_else(|| self.mismatch(scene, field, "node"))?;
        Ok(node.filter(|&n| scene.contains(n)))
    }

    /// Referenced nodes that still exist, in stored order.
    pub fn get_nodes(&self, scene: &dyn NodeStore, field: &str) -> Result<Vec<NodeHandle>> {
        match self.get(scene, field)? {
            AttrValue::NodeList(nodes) => Ok(nodes.into_iter().filter(|&n| scene.contains(n)).collect()),
            _ => Err(self.mismatch(scene, field, "node list")),
        }
    }

    /// Appends `node` to a node-list field, dropping entries whose node is gone.
    pub fn push_node(&self, scene: &mut dyn NodeStore, field: &str, node: NodeHandle) -> Result<()> {
        let mut nodes = self.get_nodes(scene, field)?;
        nodes.push(node);
        scene.set_attr(self.node, field, AttrValue::NodeList(nodes))
    }

    pub fn is_initialized(&self, scene: &dyn NodeStore) -> Result<bool> {
        self.get_bool(scene, "is_initialized")
    }

    pub fn is_built(&self, scene: &dyn NodeStore) -> Result<bool> {
        self.get_bool(scene, "is_built")
    }

    pub(crate) fn set_flag(&self, scene: &mut dyn NodeStore, field: &str, value: bool) -> Result<()> {
        scene.set_attr(self.node, field, AttrValue::Bool(value))
    }
}
