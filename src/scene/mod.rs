//! Scene graph access.
//!
//! The rigging framework never owns the scene: every module reads and writes
//! the host application's node graph through the [`NodeStore`] trait.
//!
//! - [`NodeStore`]: the host interface (nodes, hierarchy, transforms, attributes, connections)
//! - [`MemoryScene`]: an in-memory implementation for tests and headless tools
//! - [`Transform`]: local TRS component with matrix helpers
//! - [`AttrValue`] / [`AttrCategory`]: typed attribute values and their categories

pub mod attribute;
pub mod memory;
pub mod node;
pub mod store;
pub mod transform;

pub use attribute::{AttrCategory, AttrValue, Attribute};
pub use memory::{MemoryScene, NodeBuilder, SceneDump};
pub use node::SceneNode;
pub use store::NodeStore;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    /// Stable identifier of a scene node.
    ///
    /// Survives renames and reparenting; only deleting the node invalidates it.
    pub struct NodeHandle;
}

/// Coordinate space of a matrix query or assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Local,
    World,
}
