//! Module type registry.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::module::{MODULE_TYPE, ModuleKind, RigModule};
use crate::core::rig::RigContext;
use crate::errors::{Result, RigError};
use crate::metadata::Side;
use crate::modules::{Chain, Leaf};
use crate::scene::{NodeHandle, NodeStore};

/// Maps the `module_type` tag persisted on a backing node to its [`ModuleKind`].
///
/// Every typed module rebuilt from the scene (parent module, mirror module,
/// the rig's module list) goes through here.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    kinds: FxHashMap<String, Arc<dyn ModuleKind>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the builtin module types registered.
    #[must_use]
    pub fn with_builtin_modules() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Leaf));
        registry.register(Arc::new(Chain));
        registry
    }

    /// Registers a module type, replacing any kind with the same type name.
    pub fn register(&mut self, kind: Arc<dyn ModuleKind>) {
        let type_name = kind.type_name().to_string();
        if self.kinds.insert(type_name.clone(), kind).is_some() {
            log::warn!("Module type `{type_name}` registered twice, keeping the last one");
        }
    }

    pub fn kind(&self, module_type: &str) -> Result<Arc<dyn ModuleKind>> {
        self.kinds
            .get(module_type)
            .cloned()
            .ok_or_else(|| RigError::UnknownModuleType(module_type.to_string()))
    }

    #[must_use]
    pub fn contains(&self, module_type: &str) -> bool {
        self.kinds.contains_key(module_type)
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Creates (or re-attaches to) a module of the given type.
    pub fn construct(
        &self,
        cx: &mut RigContext<'_>,
        module_type: &str,
        name: &str,
        side: Side,
        parent_joint: Option<NodeHandle>,
    ) -> Result<RigModule> {
        let kind = self.kind(module_type)?;
        RigModule::new(cx, kind, name, side, parent_joint)
    }

    /// Rebuilds the typed module backed by `node` from its `module_type` field.
    pub fn resolve(&self, scene: &dyn NodeStore, node: NodeHandle) -> Result<RigModule> {
        let module_type = match scene.get_attr(node, MODULE_TYPE.name)?.as_str() {
            Some(tag) => tag.to_string(),
            None => {
                return Err(RigError::TypeMismatch {
                    node: scene.name(node)?,
                    attr: MODULE_TYPE.name.to_string(),
                    expected: "string",
                });
            }
        };
        Ok(RigModule::attach(node, self.kind(&module_type)?))
    }
}
