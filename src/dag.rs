//! Helpers operating on the transform hierarchy of a [`NodeStore`].

use glam::{Affine3A, Quat, Vec3};

use crate::errors::Result;
use crate::metadata::{self, Side};
use crate::scene::{NodeHandle, NodeStore, Space, Transform};

/// Smallest free name derived from `base` (`base`, `base1`, `base2`, ...).
pub fn unique_name(scene: &dyn NodeStore, base: &str) -> String {
    if !scene.exists(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{base}{i}"))
        .find(|candidate| !scene.exists(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Drives `driven`'s transform channels with `driver`'s world matrix.
///
/// Creates a `multMatrix` and a `decomposeMatrix` utility node and returns
/// them in that order:
///
/// ```text
/// driver.worldMatrix          -> mmx.matrixIn[0]
/// driven.parentInverseMatrix  -> mmx.matrixIn[1]
/// mmx.matrixSum               -> dmx.inputMatrix
/// dmx.outputTranslate/Rotate/Scale -> driven.translate/rotate/scale
/// ```
///
/// The two utility nodes are what a later call to
/// [`constraint_nodes`] finds again from the driven node.
pub fn matrix_constraint(
    scene: &mut dyn NodeStore,
    driver: NodeHandle,
    driven: NodeHandle,
) -> Result<(NodeHandle, NodeHandle)> {
    let driven_name = scene.name(driven)?;
    let mmx_name = unique_name(scene, &format!("{driven_name}_cns_mmx"));
    let mmx = scene.create("multMatrix", &mmx_name, None)?;
    let dmx_name = unique_name(scene, &format!("{driven_name}_cns_dmx"));
    let dmx = scene.create("decomposeMatrix", &dmx_name, None)?;

    scene.connect_attr(driver, "worldMatrix", mmx, "matrixIn[0]")?;
    scene.connect_attr(driven, "parentInverseMatrix", mmx, "matrixIn[1]")?;
    scene.connect_attr(mmx, "matrixSum", dmx, "inputMatrix")?;
    scene.connect_attr(dmx, "outputTranslate", driven, "translate")?;
    scene.connect_attr(dmx, "outputRotate", driven, "rotate")?;
    scene.connect_attr(dmx, "outputScale", driven, "scale")?;

    log::debug!(
        "Constrained `{}` to `{}`",
        driven_name,
        scene.name(driver)?
    );
    Ok((mmx, dmx))
}

/// Utility nodes driving `node.translate`, two connection levels deep.
pub fn constraint_nodes(scene: &dyn NodeStore, node: NodeHandle) -> Result<Vec<NodeHandle>> {
    let first_level = scene.sources(node, "translate")?;
    let mut nodes = first_level.clone();
    for &utility in &first_level {
        nodes.extend(scene.sources(utility, "inputMatrix")?);
    }
    Ok(nodes)
}

/// Moves `first` onto the world transform of `last`.
pub fn snap_first_to_last(scene: &mut dyn NodeStore, first: NodeHandle, last: NodeHandle) -> Result<()> {
    let target = scene.matrix(last, Space::World)?;
    scene.set_matrix(first, &target, Space::World)
}

/// Inserts a group above `node`, at the same world transform.
///
/// The group takes `node`'s name with `suffix` as its role, so a controller
/// `L_arm_0_ctl` gets the buffer `L_arm_0_buffer`. Names that do not decode
/// get `_{suffix}` appended instead.
pub fn add_parent_group(scene: &mut dyn NodeStore, node: NodeHandle, suffix: &str) -> Result<NodeHandle> {
    let node_name = scene.name(node)?;
    let group_name = match metadata::metadata_from_name(&node_name) {
        Ok(mut metadata) => {
            metadata.role = suffix.to_string();
            metadata::name_from_metadata(&metadata)?
        }
        Err(_) => format!("{node_name}_{suffix}"),
    };

    let parent = scene.parent(node)?;
    let group = scene.create("transform", &group_name, parent)?;
    snap_first_to_last(scene, group, node)?;
    scene.set_parent(node, Some(group))?;
    Ok(group)
}

/// Finds the counterpart of `node` across the symmetry plane by name.
///
/// Middle nodes are their own mirror. Returns `None` when the name does not
/// decode or the counterpart does not exist.
pub fn find_mirror_node(scene: &dyn NodeStore, node: NodeHandle) -> Result<Option<NodeHandle>> {
    let name = scene.name(node)?;
    let Ok(mut metadata) = metadata::metadata_from_name(&name) else {
        log::debug!("`{name}` has no decodable side, no mirror node");
        return Ok(None);
    };
    if metadata.side == Side::M {
        return Ok(Some(node));
    }
    metadata.side = metadata.side.mirrored();
    let mirror_name = metadata::name_from_metadata(&metadata)?;
    Ok(scene.find(&mirror_name))
}

/// Resets the local transform channels (translate/rotate 0, scale 1).
pub fn zero_transform(scene: &mut dyn NodeStore, node: NodeHandle) -> Result<()> {
    scene.set_transform(node, Transform::IDENTITY)
}

/// Sets the local scale to (1, 1, 1), leaving translation and rotation.
pub fn reset_scale(scene: &mut dyn NodeStore, node: NodeHandle) -> Result<()> {
    let mut transform = scene.transform(node)?;
    transform.scale = Vec3::ONE;
    scene.set_transform(node, transform)
}

#[must_use]
pub fn world_rotation(matrix: &Affine3A) -> Quat {
    let (_, rotation, _) = matrix.to_scale_rotation_translation();
    rotation
}

/// Assigns a world-space rotation, keeping world position and scale.
pub fn set_world_rotation(scene: &mut dyn NodeStore, node: NodeHandle, rotation: Quat) -> Result<()> {
    let world = scene.matrix(node, Space::World)?;
    let (scale, _, translation) = world.to_scale_rotation_translation();
    let target = Affine3A::from_scale_rotation_translation(scale, rotation, translation);
    scene.set_matrix(node, &target, Space::World)
}
