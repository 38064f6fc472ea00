//! The rig aggregate.
//!
//! A [`Rig`] owns the top-level groups every module hangs off, and the
//! collaborators modules need while they run: configuration, the module type
//! registry and the shape library. Modules reach them, together with the
//! scene, through a [`RigContext`].

use std::fmt;

use crate::config::RigConfig;
use crate::core::module::RigModule;
use crate::core::registry::ModuleRegistry;
use crate::errors::{Result, RigError};
use crate::metadata::{self, Metadata, Side};
use crate::scene::{NodeHandle, NodeStore};
use crate::shapes::{BuiltinShapes, ShapeLibrary};

/// Container nodes of a rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigGroups {
    pub root: NodeHandle,
    /// Parent of every module's backing node.
    pub modules_group: NodeHandle,
    /// Default parent of deform joints without a parent joint.
    pub skeleton_group: NodeHandle,
}

/// The scene plus the rig being worked on.
pub struct RigContext<'a> {
    pub scene: &'a mut dyn NodeStore,
    pub rig: &'a Rig,
}

impl<'a> RigContext<'a> {
    pub fn new(scene: &'a mut dyn NodeStore, rig: &'a Rig) -> Self {
        Self { scene, rig }
    }
}

pub struct Rig {
    name: String,
    groups: RigGroups,
    config: RigConfig,
    registry: ModuleRegistry,
    shapes: Box<dyn ShapeLibrary>,
}

impl fmt::Debug for Rig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rig")
            .field("name", &self.name)
            .field("groups", &self.groups)
            .field("module_types", &self.registry.type_names())
            .finish_non_exhaustive()
    }
}

impl Rig {
    /// Opens the rig called `name`, creating its groups where missing, with
    /// the default configuration, builtin module types and builtin shapes.
    pub fn new(scene: &mut dyn NodeStore, name: &str) -> Result<Self> {
        Self::with_parts(
            scene,
            name,
            RigConfig::default(),
            ModuleRegistry::with_builtin_modules(),
            Box::new(BuiltinShapes),
        )
    }

    /// Re-attaches to an existing rig. Fails if its root group is missing.
    pub fn open(scene: &mut dyn NodeStore, name: &str) -> Result<Self> {
        let root_name = Self::group_name(name, None, "rig")?;
        if !scene.exists(&root_name) {
            return Err(RigError::NodeNotFound(root_name));
        }
        Self::new(scene, name)
    }

    pub fn with_parts(
        scene: &mut dyn NodeStore,
        name: &str,
        config: RigConfig,
        registry: ModuleRegistry,
        shapes: Box<dyn ShapeLibrary>,
    ) -> Result<Self> {
        let root = Self::open_or_create_group(scene, &Self::group_name(name, None, "rig")?, None)?;
        let modules_group = Self::open_or_create_group(
            scene,
            &Self::group_name(name, Some("modules"), "grp")?,
            Some(root),
        )?;
        let skeleton_group = Self::open_or_create_group(
            scene,
            &Self::group_name(name, Some("skeleton"), "grp")?,
            Some(root),
        )?;

        Ok(Self {
            name: name.to_string(),
            groups: RigGroups {
                root,
                modules_group,
                skeleton_group,
            },
            config,
            registry,
            shapes,
        })
    }

    fn group_name(name: &str, description: Option<&str>, role: &str) -> Result<String> {
        let mut metadata = Metadata::new(name, Side::M, role);
        if let Some(description) = description {
            metadata = metadata.with_description(description);
        }
        metadata::name_from_metadata(&metadata)
    }

    fn open_or_create_group(
        scene: &mut dyn NodeStore,
        name: &str,
        parent: Option<NodeHandle>,
    ) -> Result<NodeHandle> {
        match scene.find(name) {
            Some(node) => Ok(node),
            None => {
                log::debug!("Creating rig group `{name}`");
                scene.create("transform", name, parent)
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn groups(&self) -> &RigGroups {
        &self.groups
    }

    #[must_use]
    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    #[must_use]
    pub fn shapes(&self) -> &dyn ShapeLibrary {
        self.shapes.as_ref()
    }

    pub fn context<'a>(&'a self, scene: &'a mut dyn NodeStore) -> RigContext<'a> {
        RigContext::new(scene, self)
    }

    // ========================================================================
    // Modules
    // ========================================================================

    /// Creates a module of a registered type, or re-attaches to it if a node
    /// called `name` exists.
    pub fn add_module(
        &self,
        scene: &mut dyn NodeStore,
        module_type: &str,
        name: &str,
        side: Side,
        parent_joint: Option<NodeHandle>,
    ) -> Result<RigModule> {
        let mut cx = self.context(scene);
        self.registry.construct(&mut cx, module_type, name, side, parent_joint)
    }

    /// Every module under the modules group, in creation order.
    pub fn modules(&self, scene: &dyn NodeStore) -> Result<Vec<RigModule>> {
        let mut modules = Vec::new();
        for node in scene.children(self.groups.modules_group)? {
            if scene.has_attr(node, crate::core::module::MODULE_TYPE.name)? {
                modules.push(self.registry.resolve(scene, node)?);
            }
        }
        Ok(modules)
    }

    /// The module whose `name` and `side` fields match.
    pub fn find_module(&self, scene: &dyn NodeStore, name: &str, side: Side) -> Result<Option<RigModule>> {
        for module in self.modules(scene)? {
            if module.name(scene)? == name && module.side(scene)? == side {
                return Ok(Some(module));
            }
        }
        Ok(None)
    }

    /// Builds every module that is not built yet, in creation order.
    pub fn build(&self, scene: &mut dyn NodeStore) -> Result<()> {
        log::info!("Building rig `{}`", self.name);
        let modules = self.modules(scene)?;
        let mut cx = self.context(scene);
        for module in modules {
            if !module.is_built(cx.scene)? {
                module.build(&mut cx)?;
            }
        }
        Ok(())
    }

    /// Publishes every built module.
    pub fn publish(&self, scene: &mut dyn NodeStore) -> Result<()> {
        log::info!("Publishing rig `{}`", self.name);
        let modules = self.modules(scene)?;
        let mut cx = self.context(scene);
        for module in modules {
            if module.is_built(cx.scene)? {
                module.publish(&mut cx)?;
            }
        }
        Ok(())
    }
}
