//! Rig modules.
//!
//! A [`RigModule`] is a handle on a backing node that stores the module's
//! fields, plus the [`ModuleKind`] that supplies its type-specific behaviour.
//!
//! # Lifecycle
//!
//! ```text
//! created ──► initialized ──► (update)* ──► built ──► published
//!             placement nodes                 controls wired   cosmetic
//! ```
//!
//! While the module is unbuilt it is in placement mode: its deform joints
//! and placement locators may be moved, and changing its name or side
//! renames everything it owns on the next [`RigModule::update`]. Building is
//! one-way; once built, `update` no longer touches the scene.

use std::fmt;
use std::sync::Arc;

use glam::Affine3A;

use crate::attributes;
use crate::core::fields::{FieldDescriptor, FieldKind};
use crate::core::mirror::mirror_matrix;
use crate::core::mop_node::{MOP_NODE_FIELDS, MopNode};
use crate::core::rig::RigContext;
use crate::dag;
use crate::errors::{Result, RigError};
use crate::metadata::{self, Metadata, MirrorType, Side};
use crate::scene::{AttrCategory, AttrValue, NodeHandle, NodeStore, Space};
use crate::shapes::CurveData;

/// Role of a module's backing node.
pub const MODULE_ROLE: &str = "mod";

/// Back-reference attribute tagging every node a module owns.
pub const MODULE_ATTR: &str = "module";

pub const NAME: FieldDescriptor = FieldDescriptor::new("name", FieldKind::String)
    .editable()
    .displayable()
    .gui_order(-2)
    .unique()
    .tooltip("Base name of the module");

pub const SIDE: FieldDescriptor = FieldDescriptor::new("side", FieldKind::Enum(Side::CHOICES))
    .editable()
    .displayable()
    .gui_order(-2)
    .tooltip("Side of the module:\nM: Middle\nL: Left\nR: Right");

pub const MIRROR_TYPE: FieldDescriptor =
    FieldDescriptor::new("mirror_type", FieldKind::Enum(MirrorType::CHOICES))
        .editable()
        .displayable()
        .gui_order(-1)
        .tooltip("How to mirror the module.");

pub const MODULE_MIRROR: FieldDescriptor = FieldDescriptor::new("_module_mirror", FieldKind::Object);

pub const OWNED_NODES: FieldDescriptor = FieldDescriptor::new("owned_nodes", FieldKind::ObjectList);

pub const PARENT_JOINT: FieldDescriptor = FieldDescriptor::new("parent_joint", FieldKind::Object)
    .editable()
    .displayable()
    .tooltip("Joint of the rig skeleton under which the deform joints are parented.");

pub const MODULE_TYPE: FieldDescriptor = FieldDescriptor::new("module_type", FieldKind::String);

pub const PLACEMENT_GROUP: FieldDescriptor =
    FieldDescriptor::new("placement_group", FieldKind::Object);

pub const CONTROLS_GROUP: FieldDescriptor = FieldDescriptor::new("controls_group", FieldKind::Object);

pub const EXTRAS_GROUP: FieldDescriptor = FieldDescriptor::new("extras_group", FieldKind::Object);

pub const DEFORM_JOINTS: FieldDescriptor =
    FieldDescriptor::new("deform_joints", FieldKind::ObjectList);

pub const PLACEMENT_LOCATORS: FieldDescriptor =
    FieldDescriptor::new("placement_locators", FieldKind::ObjectList);

pub const CONTROLLERS: FieldDescriptor = FieldDescriptor::new("controllers", FieldKind::ObjectList);

/// Fields shared by every rig module, in declaration order.
pub const RIG_MODULE_FIELDS: &[FieldDescriptor] = &[
    NAME,
    SIDE,
    MIRROR_TYPE,
    MODULE_MIRROR,
    OWNED_NODES,
    PARENT_JOINT,
    MODULE_TYPE,
    PLACEMENT_GROUP,
    CONTROLS_GROUP,
    EXTRAS_GROUP,
    DEFORM_JOINTS,
    PLACEMENT_LOCATORS,
    CONTROLLERS,
];

/// Type-specific behaviour of a rig module.
///
/// Implementations are stateless; all state lives on the module's backing
/// node and is reached through the [`RigModule`] passed in.
pub trait ModuleKind: Send + Sync {
    /// Type tag persisted in the `module_type` field.
    fn type_name(&self) -> &'static str;

    /// Fields declared on top of [`RIG_MODULE_FIELDS`].
    fn fields(&self) -> &'static [FieldDescriptor] {
        &[]
    }

    /// Creates the placement nodes: at least every deform joint, optionally
    /// placement locators. Runs once, when the module is first created.
    fn initialize(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        module.create_groups(cx)
    }

    /// Moves placement nodes to their default positions.
    fn place_placement_nodes(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        module.place_from_config(cx)
    }

    /// Placement-mode sync of type-specific fields, after renaming.
    fn update(&self, _module: &RigModule, _cx: &mut RigContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Rigs the module. Must leave every deform joint driven.
    fn build(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()>;

    /// Cleans the built module up for animators without changing how it works.
    fn publish(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        module.hide_helpers(cx)
    }
}

/// Handle on a rig module living in the scene.
#[derive(Clone)]
pub struct RigModule {
    backing: MopNode,
    kind: Arc<dyn ModuleKind>,
}

impl fmt::Debug for RigModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigModule")
            .field("node", &self.backing.node())
            .field("kind", &self.kind.type_name())
            .finish()
    }
}

impl PartialEq for RigModule {
    fn eq(&self, other: &Self) -> bool {
        self.backing == other.backing
    }
}

impl RigModule {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Creates a module, or re-attaches to an existing one.
    ///
    /// If a node called `name` exists, it is taken as the backing node of an
    /// existing module and nothing is reset. Re-attaching with a kind other
    /// than the persisted `module_type` fails with
    /// [`RigError::ModuleTypeMismatch`] before the node is touched. Otherwise a backing node named
    /// from `name`/`side` is created under the rig's modules group and
    /// initialized: fields set, parent constraint wired, placement nodes
    /// created by the kind, moved to their default positions, then a first
    /// [`update`](Self::update).
    pub fn new(
        cx: &mut RigContext<'_>,
        kind: Arc<dyn ModuleKind>,
        name: &str,
        side: Side,
        parent_joint: Option<NodeHandle>,
    ) -> Result<Self> {
        let node_name = if cx.scene.exists(name) {
            name.to_string()
        } else {
            metadata::name_from_metadata(&Metadata::new(name, side, MODULE_ROLE))?
        };

        if let Some(existing) = cx.scene.find(&node_name)
            && cx.scene.has_attr(existing, MODULE_TYPE.name)?
            && let Some(found) = cx.scene.get_attr(existing, MODULE_TYPE.name)?.as_str()
            && !found.is_empty()
            && found != kind.type_name()
        {
            return Err(RigError::ModuleTypeMismatch {
                expected: kind.type_name().to_string(),
                found: found.to_string(),
            });
        }

        let schema = RIG_MODULE_FIELDS.iter().chain(kind.fields());
        let backing = MopNode::open_or_create(cx.scene, &node_name, "transform", schema)?;
        let module = Self { backing, kind };

        if !backing.is_initialized(cx.scene)? {
            log::info!("Initializing {} module `{node_name}`", module.kind.type_name());
            module.set_field(cx.scene, &NAME, name.into())?;
            module.set_field(cx.scene, &SIDE, side.as_str().into())?;
            module.set_field(cx.scene, &MODULE_TYPE, module.kind.type_name().into())?;

            let modules_group = cx.rig.groups().modules_group;
            if cx.scene.parent(backing.node())? != Some(modules_group) {
                cx.scene.set_parent(backing.node(), Some(modules_group))?;
            }

            if let Some(joint) = parent_joint {
                module.set_field(cx.scene, &PARENT_JOINT, joint.into())?;
                dag::matrix_constraint(cx.scene, joint, backing.node())?;
            }

            let kind = Arc::clone(&module.kind);
            kind.initialize(&module, cx)?;
            kind.place_placement_nodes(&module, cx)?;
            module.update(cx)?;
            backing.set_flag(cx.scene, "is_initialized", true)?;
        }

        Ok(module)
    }

    /// Wraps an existing backing node without touching the scene.
    #[must_use]
    pub fn attach(node: NodeHandle, kind: Arc<dyn ModuleKind>) -> Self {
        Self {
            backing: MopNode::from_handle(node),
            kind,
        }
    }

    // ========================================================================
    // Identity & fields
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        self.backing.node()
    }

    #[must_use]
    pub fn backing(&self) -> &MopNode {
        &self.backing
    }

    #[must_use]
    pub fn kind(&self) -> &Arc<dyn ModuleKind> {
        &self.kind
    }

    pub fn node_name(&self, scene: &dyn NodeStore) -> Result<String> {
        self.backing.node_name(scene)
    }

    /// Every field of this module, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        MOP_NODE_FIELDS
            .iter()
            .chain(RIG_MODULE_FIELDS)
            .chain(self.kind.fields())
    }

    /// Displayable fields sorted for editors.
    #[must_use]
    pub fn displayable_fields(&self) -> Vec<&'static FieldDescriptor> {
        crate::core::fields::displayable_fields(self.fields())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields().find(|f| f.name == name)
    }

    pub fn get_field(&self, scene: &dyn NodeStore, name: &str) -> Result<AttrValue> {
        self.backing.get(scene, name)
    }

    pub fn set_field(&self, scene: &mut dyn NodeStore, field: &FieldDescriptor, value: AttrValue) -> Result<()> {
        self.backing.set(scene, field, value)
    }

    /// Sets a field by name, validated against this module's schema.
    pub fn set_field_by_name(&self, scene: &mut dyn NodeStore, name: &str, value: AttrValue) -> Result<()> {
        let field = self.field(name).ok_or_else(|| RigError::AttributeNotFound {
            node: scene.name(self.node()).unwrap_or_default(),
            attr: name.to_string(),
        })?;
        self.set_field(scene, field, value)
    }

    pub fn name(&self, scene: &dyn NodeStore) -> Result<String> {
        self.backing.get_string(scene, NAME.name)
    }

    pub fn set_name(&self, scene: &mut dyn NodeStore, name: &str) -> Result<()> {
        self.set_field(scene, &NAME, name.into())
    }

    pub fn side(&self, scene: &dyn NodeStore) -> Result<Side> {
        self.backing.get_string(scene, SIDE.name)?.parse()
    }

    pub fn set_side(&self, scene: &mut dyn NodeStore, side: Side) -> Result<()> {
        self.set_field(scene, &SIDE, side.as_str().into())
    }

    pub fn mirror_type(&self, scene: &dyn NodeStore) -> Result<MirrorType> {
        self.backing.get_string(scene, MIRROR_TYPE.name)?.parse()
    }

    pub fn set_mirror_type(&self, scene: &mut dyn NodeStore, mirror_type: MirrorType) -> Result<()> {
        self.set_field(scene, &MIRROR_TYPE, mirror_type.as_str().into())
    }

    pub fn module_type(&self, scene: &dyn NodeStore) -> Result<String> {
        self.backing.get_string(scene, MODULE_TYPE.name)
    }

    pub fn parent_joint(&self, scene: &dyn NodeStore) -> Result<Option<NodeHandle>> {
        self.backing.get_node(scene, PARENT_JOINT.name)
    }

    /// Stores the attachment joint. Takes effect on the next [`update`](Self::update).
    pub fn set_parent_joint(&self, scene: &mut dyn NodeStore, joint: Option<NodeHandle>) -> Result<()> {
        self.set_field(scene, &PARENT_JOINT, AttrValue::Node(joint))
    }

    pub fn owned_nodes(&self, scene: &dyn NodeStore) -> Result<Vec<NodeHandle>> {
        self.backing.get_nodes(scene, OWNED_NODES.name)
    }

    pub fn deform_joints(&self, scene: &dyn NodeStore) -> Result<Vec<NodeHandle>> {
        self.backing.get_nodes(scene, DEFORM_JOINTS.name)
    }

    pub fn placement_locators(&self, scene: &dyn NodeStore) -> Result<Vec<NodeHandle>> {
        self.backing.get_nodes(scene, PLACEMENT_LOCATORS.name)
    }

    pub fn controllers(&self, scene: &dyn NodeStore) -> Result<Vec<NodeHandle>> {
        self.backing.get_nodes(scene, CONTROLLERS.name)
    }

    pub fn placement_group(&self, scene: &dyn NodeStore) -> Result<Option<NodeHandle>> {
        self.backing.get_node(scene, PLACEMENT_GROUP.name)
    }

    pub fn controls_group(&self, scene: &dyn NodeStore) -> Result<Option<NodeHandle>> {
        self.backing.get_node(scene, CONTROLS_GROUP.name)
    }

    pub fn extras_group(&self, scene: &dyn NodeStore) -> Result<Option<NodeHandle>> {
        self.backing.get_node(scene, EXTRAS_GROUP.name)
    }

    pub fn is_initialized(&self, scene: &dyn NodeStore) -> Result<bool> {
        self.backing.is_initialized(scene)
    }

    pub fn is_built(&self, scene: &dyn NodeStore) -> Result<bool> {
        self.backing.is_built(scene)
    }

    // ========================================================================
    // Derived references
    // ========================================================================

    /// Module owning the parent joint, rebuilt through the type registry.
    ///
    /// `None` when no parent joint is set, or when the joint belongs to no module.
    pub fn parent_module(&self, cx: &RigContext<'_>) -> Result<Option<RigModule>> {
        let Some(joint) = self.parent_joint(cx.scene)? else {
            return Ok(None);
        };
        if !cx.scene.has_attr(joint, MODULE_ATTR)? {
            return Ok(None);
        }
        match cx.scene.sources(joint, MODULE_ATTR)?.first() {
            Some(&owner) => cx.rig.registry().resolve(cx.scene, owner).map(Some),
            None => Ok(None),
        }
    }

    /// Module this one mirrors, rebuilt fresh on every call.
    pub fn module_mirror(&self, cx: &RigContext<'_>) -> Result<Option<RigModule>> {
        match self.backing.get_node(cx.scene, MODULE_MIRROR.name)? {
            Some(node) => {
                let kind = cx.rig.registry().kind(&self.module_type(cx.scene)?)?;
                Ok(Some(RigModule::attach(node, kind)))
            }
            None => Ok(None),
        }
    }

    /// Sets (or clears) the module this one mirrors.
    ///
    /// Only this side of the relation is written; the partner is untouched.
    pub fn set_module_mirror(&self, scene: &mut dyn NodeStore, mirror: Option<&RigModule>) -> Result<()> {
        if let Some(other) = mirror {
            let expected = self.module_type(scene)?;
            let found = other.module_type(scene)?;
            if expected != found {
                return Err(RigError::ModuleTypeMismatch { expected, found });
            }
        }
        self.set_field(scene, &MODULE_MIRROR, AttrValue::Node(mirror.map(RigModule::node)))
    }

    pub fn is_mirrored(&self, cx: &RigContext<'_>) -> Result<bool> {
        Ok(self.module_mirror(cx)?.is_some())
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Creates the placement, controls and extras groups under the backing node.
    pub fn create_groups(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let parent = Some(self.node());

        let placement = self.add_node(cx, "transform", Some("grp"), None, Some("placement"), parent)?;
        cx.scene.set_attr(placement, "inheritsTransform", AttrValue::Bool(false))?;
        self.set_field(cx.scene, &PLACEMENT_GROUP, placement.into())?;

        let controls = self.add_node(cx, "transform", Some("grp"), None, Some("controls"), parent)?;
        self.set_field(cx.scene, &CONTROLS_GROUP, controls.into())?;

        let extras = self.add_node(cx, "transform", Some("grp"), None, Some("extras"), parent)?;
        cx.scene.set_attr(extras, "visibility", AttrValue::Bool(false))?;
        self.set_field(cx.scene, &EXTRAS_GROUP, extras.into())?;
        Ok(())
    }

    /// Applies the configured default world matrices to deform joints and
    /// placement locators, by index. Missing entries are skipped.
    pub fn place_from_config(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let placement = cx.rig.config().placement(self.kind.type_name());

        for (i, joint) in self.deform_joints(cx.scene)?.into_iter().enumerate() {
            match placement.and_then(|p| p.deform_joint(i)) {
                Some(matrix) => cx.scene.set_matrix(joint, &matrix, Space::World)?,
                None => log::warn!("No default matrix found for {}", cx.scene.name(joint)?),
            }
        }
        for (i, locator) in self.placement_locators(cx.scene)?.into_iter().enumerate() {
            match placement.and_then(|p| p.placement_locator(i)) {
                Some(matrix) => cx.scene.set_matrix(locator, &matrix, Space::World)?,
                None => log::warn!("No default matrix found for {}", cx.scene.name(locator)?),
            }
        }
        Ok(())
    }

    /// Brings the scene in line with the module's fields. Placement mode only.
    ///
    /// Rebuilds the parent constraint, then, if `name` or `side` differ from
    /// what the backing node's name encodes, renames the backing node, every
    /// owned node and every persistent attribute backup to the new identity.
    /// Does nothing once the module is built.
    pub fn update(&self, cx: &mut RigContext<'_>) -> Result<()> {
        if self.is_built(cx.scene)? {
            return Ok(());
        }

        self.update_parent_joint(cx)?;

        let node_name = self.node_name(cx.scene)?;
        let scene_metadata = metadata::metadata_from_name(&node_name)?;
        let name = self.name(cx.scene)?;
        let side = self.side(cx.scene)?;

        if name != scene_metadata.base_name || side != scene_metadata.side {
            let new_name = self.rename_to_identity(cx.scene, self.node(), &name, side)?;
            log::info!("Renamed module `{node_name}` to `{new_name}`");

            for node in self.owned_nodes(cx.scene)? {
                self.rename_to_identity(cx.scene, node, &name, side)?;
            }

            let backups = cx.scene.list_attrs(self.node(), AttrCategory::PERSISTENT_BACKUP)?;
            for attr in backups {
                let Some((old_node, attr_name)) = attributes::split_backup_attr_name(&attr) else {
                    continue;
                };
                let metadata = metadata::metadata_from_name(old_node)?.rebased(&name, side);
                let new_attr =
                    attributes::backup_attr_name(&metadata::name_from_metadata(&metadata)?, attr_name);
                if new_attr != attr {
                    log::debug!("Renaming persistent attribute from {new_name}.{attr} to {new_name}.{new_attr}");
                    cx.scene.rename_attr(self.node(), &attr, &new_attr)?;
                }
            }
        }

        let kind = Arc::clone(&self.kind);
        kind.update(self, cx)
    }

    /// Deletes the constraint utilities driving the backing node and, if a
    /// parent joint is set, constrains the backing node to it again.
    pub fn update_parent_joint(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let old_constraint_nodes = dag::constraint_nodes(cx.scene, self.node())?;
        if !old_constraint_nodes.is_empty() {
            cx.scene.delete(&old_constraint_nodes)?;
        }
        if let Some(parent) = self.parent_joint(cx.scene)? {
            dag::matrix_constraint(cx.scene, parent, self.node())?;
        }
        Ok(())
    }

    fn rename_to_identity(&self, scene: &mut dyn NodeStore, node: NodeHandle, name: &str, side: Side) -> Result<String> {
        let metadata = metadata::metadata_from_name(&scene.name(node)?)?.rebased(name, side);
        let new_name = metadata::name_from_metadata(&metadata)?;
        scene.rename(node, &new_name)?;
        Ok(new_name)
    }

    // ========================================================================
    // Build & publish
    // ========================================================================

    /// Builds the module through its kind, then flags it as built.
    pub fn build(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let node_name = self.node_name(cx.scene)?;
        if self.is_built(cx.scene)? {
            return Err(RigError::AlreadyBuilt(node_name));
        }
        log::info!("Building `{node_name}`");
        let kind = Arc::clone(&self.kind);
        kind.build(self, cx)?;
        self.backing.set_flag(cx.scene, "is_built", true)
    }

    /// Cosmetic clean-up for animation. Safe to call repeatedly.
    pub fn publish(&self, cx: &mut RigContext<'_>) -> Result<()> {
        log::info!("Publishing `{}`", self.node_name(cx.scene)?);
        let kind = Arc::clone(&self.kind);
        kind.publish(self, cx)
    }

    /// Hides the extras and placement groups.
    pub fn hide_helpers(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let groups = [self.extras_group(cx.scene)?, self.placement_group(cx.scene)?];
        for group in groups.into_iter().flatten() {
            cx.scene.set_attr(group, "visibility", AttrValue::Bool(false))?;
        }
        Ok(())
    }

    // ========================================================================
    // Node creation
    // ========================================================================

    /// Creates a node owned by this module.
    ///
    /// The name encodes the module's name and side with `role` (defaults to
    /// `node_type`), `object_id` and `description`. The node is tagged with a
    /// `module` back-reference and appended to `owned_nodes`.
    pub fn add_node(
        &self,
        cx: &mut RigContext<'_>,
        node_type: &str,
        role: Option<&str>,
        object_id: Option<u32>,
        description: Option<&str>,
        parent: Option<NodeHandle>,
    ) -> Result<NodeHandle> {
        let metadata = Metadata {
            base_name: self.name(cx.scene)?,
            side: self.side(cx.scene)?,
            role: role.unwrap_or(node_type).to_string(),
            description: description.map(str::to_string),
            id: object_id,
        };
        let name = metadata::name_from_metadata(&metadata)?;
        if cx.scene.exists(&name) {
            return Err(RigError::DuplicateName(name));
        }

        let node = cx.scene.create(node_type, &name, parent)?;
        self.own(cx.scene, node)?;
        Ok(node)
    }

    /// Tags `node` with the module back-reference and records it as owned.
    fn own(&self, scene: &mut dyn NodeStore, node: NodeHandle) -> Result<()> {
        scene.add_attr(node, MODULE_ATTR, AttrValue::Message, AttrCategory::USER)?;
        scene.connect_attr(self.node(), "message", node, MODULE_ATTR)?;
        self.backing.push_node(scene, OWNED_NODES.name, node)
    }

    /// Creates a deform joint with zeroed local channels.
    ///
    /// `object_id` defaults to the number of existing deform joints. The
    /// joint goes under `parent`, else the parent joint, else the rig's
    /// skeleton group.
    pub fn add_deform_joint(
        &self,
        cx: &mut RigContext<'_>,
        parent: Option<NodeHandle>,
        object_id: Option<u32>,
        description: Option<&str>,
    ) -> Result<NodeHandle> {
        let object_id = match object_id {
            Some(id) => id,
            None => self.deform_joints(cx.scene)?.len() as u32,
        };
        let joint = self.add_node(cx, "joint", Some("deform"), Some(object_id), description, None)?;

        let parent = match parent {
            Some(p) => p,
            None => self
                .parent_joint(cx.scene)?
                .unwrap_or(cx.rig.groups().skeleton_group),
        };
        cx.scene.set_parent(joint, Some(parent))?;
        dag::zero_transform(cx.scene, joint)?;

        self.backing.push_node(cx.scene, DEFORM_JOINTS.name, joint)?;
        Ok(joint)
    }

    /// Creates a placement locator, a placement aid kept out of the skeleton.
    ///
    /// `object_id` defaults to the number of existing locators; the locator
    /// goes under `parent`, else the placement group.
    pub fn add_placement_locator(
        &self,
        cx: &mut RigContext<'_>,
        description: Option<&str>,
        object_id: Option<u32>,
        parent: Option<NodeHandle>,
    ) -> Result<NodeHandle> {
        let object_id = match object_id {
            Some(id) => id,
            None => self.placement_locators(cx.scene)?.len() as u32,
        };
        let locator = self.add_node(cx, "locator", Some("placement"), Some(object_id), description, None)?;

        let parent = match parent {
            Some(p) => Some(p),
            None => self.placement_group(cx.scene)?,
        };
        if parent.is_some() {
            cx.scene.set_parent(locator, parent)?;
        }
        dag::zero_transform(cx.scene, locator)?;

        self.backing.push_node(cx.scene, PLACEMENT_LOCATORS.name, locator)?;
        Ok(locator)
    }

    /// Creates a controller matching `dag_node` and its buffer group.
    ///
    /// The controller is named after `dag_node` with the `ctl` role
    /// (`object_id`/`description` override the node's own), coloured by
    /// side, given its saved shape back if one was persisted, snapped onto
    /// `dag_node` and wrapped in a buffer group. It carries three persistent
    /// string attributes: `shape_data`, `attributes_state` and
    /// `parent_space_data` (initialised to `{}`).
    pub fn add_control(
        &self,
        cx: &mut RigContext<'_>,
        dag_node: NodeHandle,
        object_id: Option<u32>,
        description: Option<&str>,
        shape_type: &str,
    ) -> Result<(NodeHandle, NodeHandle)> {
        let rig = cx.rig;
        let shapes = rig.shapes();

        let mut metadata = metadata::metadata_from_name(&cx.scene.name(dag_node)?)?;
        if object_id.is_some() {
            metadata.id = object_id;
        }
        if let Some(description) = description {
            metadata.description = Some(description.to_string());
        }
        metadata.role = "ctl".to_string();
        let ctl_name = metadata::name_from_metadata(&metadata)?;
        if cx.scene.exists(&ctl_name) {
            return Err(RigError::DuplicateName(ctl_name));
        }

        let ctl = shapes.create_controller(cx.scene, shape_type, &ctl_name)?;
        self.own(cx.scene, ctl)?;

        let side_color = rig.config().side_color.color(self.side(cx.scene)?);
        let colored: Vec<CurveData> = shapes
            .shape_data(cx.scene, ctl)?
            .iter()
            .map(|curve| curve.with_color(side_color))
            .collect();
        shapes.set_shape_data(cx.scene, ctl, &colored)?;

        let holder = self.node();
        attributes::create_persistent_attribute(cx.scene, ctl, holder, "shape_data", "".into())?;
        if let AttrValue::String(saved) = cx.scene.get_attr(ctl, "shape_data")?
            && !saved.is_empty()
        {
            let saved: Vec<CurveData> = serde_json::from_str(&saved)?;
            shapes.set_shape_data(cx.scene, ctl, &saved)?;
        }

        attributes::create_persistent_attribute(cx.scene, ctl, holder, "attributes_state", "".into())?;
        attributes::create_persistent_attribute(cx.scene, ctl, holder, "parent_space_data", "".into())?;
        if !cx.scene.get_attr(ctl, "parent_space_data")?.is_truthy() {
            cx.scene.set_attr(ctl, "parent_space_data", "{}".into())?;
        }

        dag::snap_first_to_last(cx.scene, ctl, dag_node)?;
        let buffer = dag::add_parent_group(cx.scene, ctl, "buffer")?;
        self.own(cx.scene, buffer)?;

        self.backing.push_node(cx.scene, CONTROLLERS.name, ctl)?;
        Ok((ctl, buffer))
    }

    /// Saves every controller's current shape into its `shape_data`
    /// attribute, so the next rebuild restores it.
    pub fn save_control_shapes(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let shapes = cx.rig.shapes();
        for ctl in self.controllers(cx.scene)? {
            let data = serde_json::to_string(&shapes.shape_data(cx.scene, ctl)?)?;
            cx.scene.set_attr(ctl, "shape_data", AttrValue::String(data))?;
        }
        Ok(())
    }

    /// Deletes an owned node and drops it from every node list of the module.
    pub fn remove_owned_node(&self, cx: &mut RigContext<'_>, node: NodeHandle) -> Result<()> {
        cx.scene.delete(&[node])?;
        for field in [&OWNED_NODES, &DEFORM_JOINTS, &PLACEMENT_LOCATORS, &CONTROLLERS] {
            let remaining = self.backing.get_nodes(cx.scene, field.name)?;
            self.set_field(cx.scene, field, AttrValue::NodeList(remaining))?;
        }
        Ok(())
    }

    // ========================================================================
    // Mirroring
    // ========================================================================

    /// Walks up parent modules, collecting those that are neither middle nor
    /// mirrored, and stops at the first one that is.
    ///
    /// Fails with [`RigError::MissingReference`] when a module on the way
    /// has no parent module.
    pub fn find_non_mirrored_parents(&self, cx: &RigContext<'_>) -> Result<Vec<RigModule>> {
        let mut non_mirrored_parents = Vec::new();
        let mut current = self.clone();

        loop {
            let parent = current
                .parent_module(cx)?
                .ok_or_else(|| RigError::MissingReference {
                    module: current.node_name(cx.scene).unwrap_or_default(),
                    reference: "parent module",
                })?;

            if parent.is_mirrored(cx)? || parent.side(cx.scene)? == Side::M {
                break;
            }
            non_mirrored_parents.push(parent.clone());
            current = parent;
        }

        Ok(non_mirrored_parents)
    }

    /// Makes this module the mirror image of its `module_mirror`.
    ///
    /// First every editable field except `name` and `side` is copied from the
    /// source, with node references swapped for their mirror nodes, and
    /// [`update`](Self::update) is run. Then deform joints and placement
    /// locators are paired by position and each target gets the reflected
    /// world matrix of its source, with scale reset to 1. In
    /// [`MirrorType::Orientation`] mode the source's world rotation is
    /// copied back on afterwards.
    pub fn update_mirror(&self, cx: &mut RigContext<'_>) -> Result<()> {
        let source = self.module_mirror(cx)?.ok_or_else(|| RigError::MissingReference {
            module: self.node_name(cx.scene).unwrap_or_default(),
            reference: "module mirror",
        })?;

        let fields: Vec<&'static FieldDescriptor> = source.fields().collect();
        for field in fields {
            if field.name == NAME.name || field.name == SIDE.name || !field.editable {
                continue;
            }
            let mut value = source.get_field(cx.scene, field.name)?;
            if field.is_reference() {
                value = match value {
                    AttrValue::Node(Some(node)) => AttrValue::Node(dag::find_mirror_node(cx.scene, node)?),
                    AttrValue::NodeList(nodes) => {
                        let mut mirrored = Vec::with_capacity(nodes.len());
                        for node in nodes {
                            if let Some(m) = dag::find_mirror_node(cx.scene, node)? {
                                mirrored.push(m);
                            }
                        }
                        AttrValue::NodeList(mirrored)
                    }
                    other => other,
                };
            }
            if value.is_truthy() {
                self.set_field(cx.scene, field, value)?;
            }
        }

        self.update(cx)?;

        let mut orig_nodes = source.deform_joints(cx.scene)?;
        orig_nodes.extend(source.placement_locators(cx.scene)?);
        let mut new_nodes = self.deform_joints(cx.scene)?;
        new_nodes.extend(self.placement_locators(cx.scene)?);
        if orig_nodes.len() != new_nodes.len() {
            log::warn!(
                "Mirroring {} placement nodes onto {}",
                orig_nodes.len(),
                new_nodes.len()
            );
        }

        let mirror_type = self.mirror_type(cx.scene)?;
        for (orig_node, new_node) in orig_nodes.into_iter().zip(new_nodes) {
            let orig_world: Affine3A = cx.scene.matrix(orig_node, Space::World)?;
            let new_world = mirror_matrix(&orig_world, mirror_type);
            cx.scene.set_matrix(new_node, &new_world, Space::World)?;
            dag::reset_scale(cx.scene, new_node)?;
            if mirror_type == MirrorType::Orientation {
                dag::set_world_rotation(cx.scene, new_node, dag::world_rotation(&orig_world))?;
            }
        }
        Ok(())
    }
}
