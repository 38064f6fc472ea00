//! Rig module core: field schema, field-backed nodes, the module lifecycle,
//! mirroring and the rig aggregate.

pub mod fields;
pub mod mirror;
pub mod module;
pub mod mop_node;
pub mod registry;
pub mod rig;

pub use fields::{FieldDescriptor, FieldKind};
pub use module::{ModuleKind, RIG_MODULE_FIELDS, RigModule};
pub use mop_node::{MOP_NODE_FIELDS, MopNode};
pub use registry::ModuleRegistry;
pub use rig::{Rig, RigContext, RigGroups};
