use glam::Affine3A;

use crate::errors::Result;
use crate::scene::attribute::{AttrCategory, AttrValue};
use crate::scene::transform::Transform;
use crate::scene::{NodeHandle, Space};

/// The host scene graph, as seen by the rigging framework.
///
/// Nodes are addressed by stable [`NodeHandle`]s; their names are a
/// separate, renameable property that must stay unique across the store.
/// The store is single-writer and nothing is transactional: a failing call
/// leaves every earlier mutation in place.
///
/// Plugs (`node.attr`) used only as connection endpoints, such as
/// `message`, `worldMatrix` or `translate`, do not need to exist as stored
/// attributes.
pub trait NodeStore {
    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Whether a node with this exact name exists.
    fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Looks a node up by name.
    fn find(&self, name: &str) -> Option<NodeHandle>;

    /// Whether the handle still points at a live node.
    fn contains(&self, node: NodeHandle) -> bool;

    /// Creates a node of `node_type` named `name`, optionally under `parent`.
    ///
    /// Fails with [`RigError::DuplicateName`](crate::RigError::DuplicateName)
    /// when the name is taken.
    fn create(&mut self, node_type: &str, name: &str, parent: Option<NodeHandle>)
    -> Result<NodeHandle>;

    fn name(&self, node: NodeHandle) -> Result<String>;

    fn node_type(&self, node: NodeHandle) -> Result<String>;

    /// Renames a node. Renaming to the current name is a no-op.
    fn rename(&mut self, node: NodeHandle, new_name: &str) -> Result<()>;

    /// Deletes nodes with their whole subtrees and every connection touching them.
    ///
    /// Handles that are already gone are skipped.
    fn delete(&mut self, nodes: &[NodeHandle]) -> Result<()>;

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>>;

    fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>>;

    /// Reparents `node`, keeping its world transform. `None` moves it to the root.
    fn set_parent(&mut self, node: NodeHandle, parent: Option<NodeHandle>) -> Result<()>;

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Local TRS channels.
    fn transform(&self, node: NodeHandle) -> Result<Transform>;

    fn set_transform(&mut self, node: NodeHandle, transform: Transform) -> Result<()>;

    fn matrix(&self, node: NodeHandle, space: Space) -> Result<Affine3A>;

    /// Assigns a matrix, decomposing it into the local channels.
    fn set_matrix(&mut self, node: NodeHandle, matrix: &Affine3A, space: Space) -> Result<()>;

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn has_attr(&self, node: NodeHandle, attr: &str) -> Result<bool>;

    /// Adds a new attribute holding `value`.
    fn add_attr(
        &mut self,
        node: NodeHandle,
        attr: &str,
        value: AttrValue,
        category: AttrCategory,
    ) -> Result<()>;

    fn get_attr(&self, node: NodeHandle, attr: &str) -> Result<AttrValue>;

    /// Writes an attribute. The value must be of the attribute's kind.
    fn set_attr(&mut self, node: NodeHandle, attr: &str, value: AttrValue) -> Result<()>;

    /// Renames an attribute in place, keeping its value and connections.
    fn rename_attr(&mut self, node: NodeHandle, attr: &str, new_name: &str) -> Result<()>;

    /// Names of the attributes whose category intersects `filter`, in creation order.
    fn list_attrs(&self, node: NodeHandle, filter: AttrCategory) -> Result<Vec<String>>;

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Connects `src.src_attr` into `dst.dst_attr`.
    ///
    /// A destination plug accepts a single incoming connection.
    fn connect_attr(
        &mut self,
        src: NodeHandle,
        src_attr: &str,
        dst: NodeHandle,
        dst_attr: &str,
    ) -> Result<()>;

    /// Nodes whose plugs feed into `node.attr`.
    fn sources(&self, node: NodeHandle, attr: &str) -> Result<Vec<NodeHandle>>;
}
