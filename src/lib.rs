#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Modular rigging framework.
//!
//! A rig is assembled from [`RigModule`]s: named, sided building blocks that
//! each own a segment of the skeleton. Modules live entirely in a host scene
//! graph reached through the [`NodeStore`] trait; [`MemoryScene`] is an
//! in-memory implementation for tests and headless tools.

pub mod attributes;
pub mod config;
pub mod core;
pub mod dag;
pub mod errors;
pub mod metadata;
pub mod modules;
pub mod scene;
pub mod shapes;

pub use config::RigConfig;
pub use crate::core::{FieldDescriptor, FieldKind, ModuleKind, ModuleRegistry, MopNode, Rig, RigContext, RigModule};
pub use errors::{Result, RigError};
pub use metadata::{Metadata, MirrorType, Side, metadata_from_name, name_from_metadata};
pub use modules::{Chain, Leaf};
pub use scene::{AttrCategory, AttrValue, MemoryScene, NodeHandle, NodeStore, Space, Transform};
pub use shapes::{BuiltinShapes, CurveData, ShapeLibrary};
