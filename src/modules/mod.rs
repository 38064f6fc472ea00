//! Builtin module types.

mod chain;
mod leaf;

pub use chain::{Chain, JOINT_COUNT};
pub use leaf::Leaf;
