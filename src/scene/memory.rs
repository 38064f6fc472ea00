use glam::{Affine3A, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::errors::{Result, RigError};
use crate::scene::attribute::{AttrCategory, AttrValue, Attribute};
use crate::scene::node::SceneNode;
use crate::scene::store::NodeStore;
use crate::scene::transform::{Transform, euler_degrees_to_quat};
use crate::scene::{NodeHandle, Space};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Connection {
    src: NodeHandle,
    src_attr: String,
    dst: NodeHandle,
    dst_attr: String,
}

/// In-memory scene graph implementing [`NodeStore`].
///
/// Holds the same data the host application would: a node hierarchy with
/// unique names, local transforms, typed attributes and plug connections.
/// Connections between two stored attributes propagate values on connect and
/// on every later write to the source; other connections (matrix plugs,
/// constraint utilities) are recorded but never evaluated.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    nodes: SlotMap<NodeHandle, SceneNode>,
    root_nodes: Vec<NodeHandle>,
    names: FxHashMap<String, NodeHandle>,
    connections: Vec<Connection>,
}

impl MemoryScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a node.
    pub fn build_node<'a>(&'a mut self, node_type: &str, name: &str) -> NodeBuilder<'a> {
        NodeBuilder::new(self, node_type, name)
    }

    #[must_use]
    pub fn get_node(&self, node: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    #[must_use]
    pub fn root_nodes(&self) -> &[NodeHandle] {
        &self.root_nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deterministic snapshot of the whole scene, sorted by node name.
    #[must_use]
    pub fn dump(&self) -> SceneDump {
        let name_of = |h: NodeHandle| self.nodes.get(h).map(|n| n.name.clone()).unwrap_or_default();

        let mut nodes: Vec<NodeDump> = self
            .nodes
            .values()
            .map(|node| NodeDump {
                name: node.name.clone(),
                node_type: node.node_type.clone(),
                parent: node.parent.map(name_of),
                children: node.children.iter().map(|&c| name_of(c)).collect(),
                transform: node.transform,
                attributes: node.attributes.clone(),
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut connections: Vec<String> = self
            .connections
            .iter()
            .map(|c| {
                format!(
                    "{}.{} -> {}.{}",
                    name_of(c.src),
                    c.src_attr,
                    name_of(c.dst),
                    c.dst_attr
                )
            })
            .collect();
        connections.sort();

        SceneDump { nodes, connections }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn node(&self, node: NodeHandle) -> Result<&SceneNode> {
        self.nodes
            .get(node)
            .ok_or_else(|| RigError::NodeNotFound(format!("{node:?}")))
    }

    fn node_mut(&mut self, node: NodeHandle) -> Result<&mut SceneNode> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| RigError::NodeNotFound(format!("{node:?}")))
    }

    fn world_matrix(&self, node: NodeHandle) -> Result<Affine3A> {
        let mut world = Affine3A::IDENTITY;
        let mut current = Some(node);
        while let Some(handle) = current {
            let n = self.node(handle)?;
            world = n.transform.local_matrix() * world;
            current = if n.inherits_transform() { n.parent } else { None };
        }
        Ok(world)
    }

    /// World matrix the node's local channels are expressed in.
    fn parent_world_matrix(&self, node: NodeHandle) -> Result<Affine3A> {
        let n = self.node(node)?;
        match n.parent {
            Some(parent) if n.inherits_transform() => self.world_matrix(parent),
            _ => Ok(Affine3A::IDENTITY),
        }
    }

    fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, node: NodeHandle) {
        let old_parent = self.nodes.get(node).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(parent) = self.nodes.get_mut(p)
                && let Some(i) = parent.children.iter().position(|&x| x == node)
            {
                parent.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == node) {
            self.root_nodes.remove(i);
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = None;
        }
    }

    fn attach(&mut self, node: NodeHandle, parent: Option<NodeHandle>) {
        match parent.and_then(|p| self.nodes.get_mut(p).map(|n| (p, n))) {
            Some((p, parent_node)) => {
                parent_node.children.push(node);
                if let Some(n) = self.nodes.get_mut(node) {
                    n.parent = Some(p);
                }
            }
            None => self.root_nodes.push(node),
        }
    }

    fn remove_recursive(&mut self, node: NodeHandle) {
        let children = match self.nodes.get(node) {
            Some(n) => n.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_recursive(child);
        }
        self.detach(node);
        if let Some(removed) = self.nodes.remove(node) {
            self.names.remove(&removed.name);
        }
    }

    fn attr_not_found(&self, node: NodeHandle, attr: &str) -> RigError {
        RigError::AttributeNotFound {
            node: self.nodes.get(node).map(|n| n.name.clone()).unwrap_or_default(),
            attr: attr.to_string(),
        }
    }

    /// Pushes the value of `node.attr` down every outgoing connection.
    fn propagate(&mut self, node: NodeHandle, attr: &str) {
        let mut visited: FxHashSet<(NodeHandle, String)> = FxHashSet::default();
        let mut pending = vec![(node, attr.to_string())];

        while let Some((src, src_attr)) = pending.pop() {
            if !visited.insert((src, src_attr.clone())) {
                continue;
            }
            let Some(value) = self
                .nodes
                .get(src)
                .and_then(|n| n.attribute(&src_attr))
                .map(|a| a.value.clone())
            else {
                continue;
            };

            let targets: Vec<(NodeHandle, String)> = self
                .connections
                .iter()
                .filter(|c| c.src == src && c.src_attr == src_attr)
                .map(|c| (c.dst, c.dst_attr.clone()))
                .collect();

            for (dst, dst_attr) in targets {
                if let Some(target) = self.nodes.get_mut(dst).and_then(|n| n.attribute_mut(&dst_attr))
                    && target.value.same_kind(&value)
                {
                    target.value = value.clone();
                    pending.push((dst, dst_attr));
                }
            }
        }
    }
}

impl NodeStore for MemoryScene {
    fn find(&self, name: &str) -> Option<NodeHandle> {
        self.names.get(name).copied()
    }

    fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(node)
    }

    fn create(
        &mut self,
        node_type: &str,
        name: &str,
        parent: Option<NodeHandle>,
    ) -> Result<NodeHandle> {
        if name.is_empty() {
            return Err(RigError::InvalidName(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(RigError::DuplicateName(name.to_string()));
        }
        if let Some(p) = parent {
            self.node(p)?;
        }

        let handle = self.nodes.insert(SceneNode::new(node_type, name));
        self.names.insert(name.to_string(), handle);
        self.attach(handle, parent);
        log::debug!("Created {node_type} `{name}`");
        Ok(handle)
    }

    fn name(&self, node: NodeHandle) -> Result<String> {
        Ok(self.node(node)?.name.clone())
    }

    fn node_type(&self, node: NodeHandle) -> Result<String> {
        Ok(self.node(node)?.node_type.clone())
    }

    fn rename(&mut self, node: NodeHandle, new_name: &str) -> Result<()> {
        if new_name.is_empty() {
            return Err(RigError::InvalidName(new_name.to_string()));
        }
        match self.names.get(new_name) {
            Some(&existing) if existing == node => return Ok(()),
            Some(_) => return Err(RigError::DuplicateName(new_name.to_string())),
            None => {}
        }

        let n = self.node_mut(node)?;
        let old_name = std::mem::replace(&mut n.name, new_name.to_string());
        self.names.remove(&old_name);
        self.names.insert(new_name.to_string(), node);
        log::debug!("Renamed `{old_name}` to `{new_name}`");
        Ok(())
    }

    fn delete(&mut self, nodes: &[NodeHandle]) -> Result<()> {
        for &node in nodes {
            self.remove_recursive(node);
        }
        let alive = &self.nodes;
        self.connections
            .retain(|c| alive.contains_key(c.src) && alive.contains_key(c.dst));
        Ok(())
    }

    fn parent(&self, node: NodeHandle) -> Result<Option<NodeHandle>> {
        Ok(self.node(node)?.parent)
    }

    fn children(&self, node: NodeHandle) -> Result<Vec<NodeHandle>> {
        Ok(self.node(node)?.children.clone())
    }

    fn set_parent(&mut self, node: NodeHandle, parent: Option<NodeHandle>) -> Result<()> {
        let current = self.node(node)?.parent;
        if current == parent {
            return Ok(());
        }
        if let Some(p) = parent {
            self.node(p)?;
            if self.is_ancestor(node, p) {
                return Err(RigError::InvalidParent {
                    node: self.node(node)?.name.clone(),
                    parent: self.node(p)?.name.clone(),
                });
            }
        }

        let world = self.world_matrix(node)?;
        self.detach(node);
        self.attach(node, parent);

        let local = self.parent_world_matrix(node)?.inverse() * world;
        self.node_mut(node)?.transform = Transform::from_matrix(&local);
        Ok(())
    }

    fn transform(&self, node: NodeHandle) -> Result<Transform> {
        Ok(self.node(node)?.transform)
    }

    fn set_transform(&mut self, node: NodeHandle, transform: Transform) -> Result<()> {
        self.node_mut(node)?.transform = transform;
        Ok(())
    }

    fn matrix(&self, node: NodeHandle, space: Space) -> Result<Affine3A> {
        match space {
            Space::Local => Ok(self.node(node)?.transform.local_matrix()),
            Space::World => self.world_matrix(node),
        }
    }

    fn set_matrix(&mut self, node: NodeHandle, matrix: &Affine3A, space: Space) -> Result<()> {
        let local = match space {
            Space::Local => *matrix,
            Space::World => self.parent_world_matrix(node)?.inverse() * *matrix,
        };
        self.node_mut(node)?.transform = Transform::from_matrix(&local);
        Ok(())
    }

    fn has_attr(&self, node: NodeHandle, attr: &str) -> Result<bool> {
        Ok(self.node(node)?.attribute(attr).is_some())
    }

    fn add_attr(
        &mut self,
        node: NodeHandle,
        attr: &str,
        value: AttrValue,
        category: AttrCategory,
    ) -> Result<()> {
        let n = self.node_mut(node)?;
        if n.attribute(attr).is_some() {
            return Err(RigError::AttributeExists {
                node: n.name.clone(),
                attr: attr.to_string(),
            });
        }
        n.attributes.push(Attribute::new(attr, value, category));
        Ok(())
    }

    fn get_attr(&self, node: NodeHandle, attr: &str) -> Result<AttrValue> {
        self.node(node)?
            .attribute(attr)
            .map(|a| a.value.clone())
            .ok_or_else(|| self.attr_not_found(node, attr))
    }

    fn set_attr(&mut self, node: NodeHandle, attr: &str, value: AttrValue) -> Result<()> {
        let not_found = self.attr_not_found(node, attr);
        let n = self.node_mut(node)?;
        let node_name = n.name.clone();
        let target = n.attribute_mut(attr).ok_or(not_found)?;
        if !target.value.same_kind(&value) {
            return Err(RigError::TypeMismatch {
                node: node_name,
                attr: attr.to_string(),
                expected: target.value.kind_name(),
            });
        }
        target.value = value;
        self.propagate(node, attr);
        Ok(())
    }

    fn rename_attr(&mut self, node: NodeHandle, attr: &str, new_name: &str) -> Result<()> {
        let not_found = self.attr_not_found(node, attr);
        let n = self.node_mut(node)?;
        if n.attribute(new_name).is_some() {
            return Err(RigError::AttributeExists {
                node: n.name.clone(),
                attr: new_name.to_string(),
            });
        }
        n.attribute_mut(attr).ok_or(not_found)?.name = new_name.to_string();

        for c in &mut self.connections {
            if c.src == node && c.src_attr == attr {
                c.src_attr = new_name.to_string();
            }
            if c.dst == node && c.dst_attr == attr {
                c.dst_attr = new_name.to_string();
            }
        }
        Ok(())
    }

    fn list_attrs(&self, node: NodeHandle, filter: AttrCategory) -> Result<Vec<String>> {
        Ok(self
            .node(node)?
            .attributes
            .iter()
            .filter(|a| a.category.intersects(filter))
            .map(|a| a.name.clone())
            .collect())
    }

    fn connect_attr(
        &mut self,
        src: NodeHandle,
        src_attr: &str,
        dst: NodeHandle,
        dst_attr: &str,
    ) -> Result<()> {
        let src_name = self.node(src)?.name.clone();
        let dst_name = self.node(dst)?.name.clone();
        if self
            .connections
            .iter()
            .any(|c| c.dst == dst && c.dst_attr == dst_attr)
        {
            return Err(RigError::PlugConnected {
                node: dst_name,
                attr: dst_attr.to_string(),
            });
        }

        self.connections.push(Connection {
            src,
            src_attr: src_attr.to_string(),
            dst,
            dst_attr: dst_attr.to_string(),
        });
        log::debug!("Connected {src_name}.{src_attr} -> {dst_name}.{dst_attr}");
        self.propagate(src, src_attr);
        Ok(())
    }

    fn sources(&self, node: NodeHandle, attr: &str) -> Result<Vec<NodeHandle>> {
        self.node(node)?;
        Ok(self
            .connections
            .iter()
            .filter(|c| c.dst == node && c.dst_attr == attr)
            .map(|c| c.src)
            .collect())
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Comparable snapshot produced by [`MemoryScene::dump`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDump {
    pub nodes: Vec<NodeDump>,
    pub connections: Vec<String>,
}

impl SceneDump {
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeDump> {
        self.nodes.iter().find(|n| n.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDump {
    pub name: String,
    pub node_type: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub transform: Transform,
    pub attributes: Vec<Attribute>,
}

// ============================================================================
// Builder
// ============================================================================

pub struct NodeBuilder<'a> {
    scene: &'a mut MemoryScene,
    node_type: String,
    name: String,
    transform: Transform,
    parent: Option<NodeHandle>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(scene: &'a mut MemoryScene, node_type: &str, name: &str) -> Self {
        Self {
            scene,
            node_type: node_type.to_string(),
            name: name.to_string(),
            transform: Transform::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = Vec3::new(x, y, z);
        self
    }

    /// Rotation in degrees, X then Y then Z.
    #[must_use]
    pub fn with_rotation_degrees(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.rotation = euler_degrees_to_quat(Vec3::new(x, y, z));
        self
    }

    #[must_use]
    pub fn with_scale(mut self, s: f32) -> Self {
        self.transform.scale = Vec3::splat(s);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Inserts the node. The transform is taken as local to the parent.
    pub fn build(self) -> Result<NodeHandle> {
        let handle = self.scene.create(&self.node_type, &self.name, self.parent)?;
        self.scene.set_transform(handle, self.transform)?;
        Ok(handle)
    }
}
