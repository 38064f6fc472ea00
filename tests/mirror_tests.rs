//! Mirroring Integration Tests
//!
//! Tests for:
//! - Orientation / Behavior reflection of placement nodes
//! - Field sync from the mirror source, with node references swapped sides
//! - find_non_mirrored_parents walk and its failure on missing parents

use glam::{Affine3A, Quat, Vec3};
use mop::core::mirror::{local_reflection, world_reflection};
use mop::metadata::{MirrorType, Side};
use mop::scene::{AttrValue, MemoryScene, NodeHandle, NodeStore, Space};
use mop::scene::transform::euler_degrees_to_quat;
use mop::{Rig, RigError, RigModule};

fn setup() -> (MemoryScene, Rig) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = MemoryScene::new();
    let rig = Rig::new(&mut scene, "test").unwrap();
    (scene, rig)
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - 1e-5
}

/// Source joint at (5, 0, 0) rotated 30 degrees about Y.
fn source_matrix() -> Affine3A {
    Affine3A::from_rotation_translation(
        euler_degrees_to_quat(Vec3::new(0.0, 30.0, 0.0)),
        Vec3::new(5.0, 0.0, 0.0),
    )
}

/// Left/right Leaf pair, the right one mirroring the left one.
fn mirrored_pair(scene: &mut MemoryScene, rig: &Rig, mirror_type: MirrorType) -> (RigModule, RigModule) {
    let left = rig.add_module(scene, "Leaf", "arm", Side::L, None).unwrap();
    let right = rig.add_module(scene, "Leaf", "arm", Side::R, None).unwrap();
    left.set_mirror_type(scene, mirror_type).unwrap();
    right.set_module_mirror(scene, Some(&left)).unwrap();

    let joint = left.deform_joints(scene).unwrap()[0];
    scene.set_matrix(joint, &source_matrix(), Space::World).unwrap();
    (left, right)
}

fn world(scene: &MemoryScene, node: NodeHandle) -> Affine3A {
    scene.matrix(node, Space::World).unwrap()
}

// ============================================================================
// Transform Reflection
// ============================================================================

#[test]
fn mirror_orientation_reflects_position_only() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let (_, right) = mirrored_pair(&mut scene, &rig, MirrorType::Orientation);

    right.update_mirror(&mut rig.context(&mut scene))?;

    let joint = right.deform_joints(&scene)?[0];
    let (scale, rotation, translation) = world(&scene, joint).to_scale_rotation_translation();
    assert!(vec3_approx(translation, Vec3::new(-5.0, 0.0, 0.0)));
    assert!(quat_approx(rotation, euler_degrees_to_quat(Vec3::new(0.0, 30.0, 0.0))));
    assert!(vec3_approx(scale, Vec3::ONE));
    assert!(vec3_approx(scene.transform(joint)?.scale, Vec3::ONE));
    assert_eq!(right.mirror_type(&scene)?, MirrorType::Orientation);
    Ok(())
}

#[test]
fn mirror_behavior_reflects_frame() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let (_, right) = mirrored_pair(&mut scene, &rig, MirrorType::Behavior);

    right.update_mirror(&mut rig.context(&mut scene))?;

    let joint = right.deform_joints(&scene)?[0];
    let result = world(&scene, joint);
    let expected = world_reflection() * source_matrix() * local_reflection();
    assert!(result.abs_diff_eq(expected, 1e-4));

    let (scale, _, translation) = result.to_scale_rotation_translation();
    assert!(vec3_approx(translation, Vec3::new(-5.0, 0.0, 0.0)));
    assert!(vec3_approx(scale, Vec3::ONE));
    // A proper rotation, not a reflection.
    assert!((result.matrix3.determinant() - 1.0).abs() < 1e-4);
    Ok(())
}

#[test]
fn mirror_chain_pairs_joints_and_locators() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let left = rig.add_module(&mut scene, "Chain", "arm", Side::L, None)?;
    let right = rig.add_module(&mut scene, "Chain", "arm", Side::R, None)?;
    left.set_field_by_name(&mut scene, "joint_count", AttrValue::Int(4))?;
    left.update(&mut rig.context(&mut scene))?;

    let left_nodes: Vec<NodeHandle> = left
        .deform_joints(&scene)?
        .into_iter()
        .chain(left.placement_locators(&scene)?)
        .collect();
    for (i, &node) in left_nodes.iter().enumerate() {
        let position = Vec3::new(2.0 + i as f32, 10.0, 1.0);
        scene.set_matrix(node, &Affine3A::from_translation(position), Space::World)?;
    }

    right.set_module_mirror(&mut scene, Some(&left))?;
    right.update_mirror(&mut rig.context(&mut scene))?;

    // joint_count is editable, so the right chain grew to match.
    let right_joints = right.deform_joints(&scene)?;
    assert_eq!(right_joints.len(), 4);
    let right_nodes: Vec<NodeHandle> = right_joints
        .into_iter()
        .chain(right.placement_locators(&scene)?)
        .collect();
    for (i, &node) in right_nodes.iter().enumerate() {
        let translation: Vec3 = world(&scene, node).translation.into();
        assert!(vec3_approx(translation, Vec3::new(-2.0 - i as f32, 10.0, 1.0)));
    }
    Ok(())
}

#[test]
fn mirror_sync_swaps_parent_joint_side() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let spine = rig.add_module(&mut scene, "Chain", "spine", Side::M, None)?;
    let spine_top = spine.deform_joints(&scene)?[2];

    let left_clav = rig.add_module(&mut scene, "Leaf", "clav", Side::L, Some(spine_top))?;
    let left_clav_joint = left_clav.deform_joints(&scene)?[0];
    let left_hand = rig.add_module(&mut scene, "Leaf", "hand", Side::L, Some(left_clav_joint))?;

    let right_clav = rig.add_module(&mut scene, "Leaf", "clav", Side::R, None)?;
    let right_hand = rig.add_module(&mut scene, "Leaf", "hand", Side::R, None)?;
    right_clav.set_module_mirror(&mut scene, Some(&left_clav))?;
    right_hand.set_module_mirror(&mut scene, Some(&left_hand))?;

    let mut cx = rig.context(&mut scene);
    right_clav.update_mirror(&mut cx)?;
    right_hand.update_mirror(&mut cx)?;
    drop(cx);

    // Middle joints are their own mirror.
    assert_eq!(right_clav.parent_joint(&scene)?, Some(spine_top));
    let right_clav_joint = right_clav.deform_joints(&scene)?[0];
    assert_eq!(right_hand.parent_joint(&scene)?, Some(right_clav_joint));
    assert_eq!(scene.name(right_clav_joint)?, "R_clav_0_deform");
    // Name and side are never synced.
    assert_eq!(right_hand.node_name(&scene)?, "R_hand_mod");
    assert_eq!(mop::dag::constraint_nodes(&scene, right_hand.node())?.len(), 2);
    Ok(())
}

#[test]
fn mirror_is_one_directional() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let (left, right) = mirrored_pair(&mut scene, &rig, MirrorType::Behavior);

    let cx = rig.context(&mut scene);
    assert!(right.is_mirrored(&cx)?);
    assert_eq!(right.module_mirror(&cx)?, Some(left.clone()));
    assert!(!left.is_mirrored(&cx)?);
    Ok(())
}

#[test]
fn mirror_rejects_other_module_type() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let leaf = rig.add_module(&mut scene, "Leaf", "arm", Side::L, None)?;
    let chain = rig.add_module(&mut scene, "Chain", "arm", Side::R, None)?;

    assert!(matches!(
        chain.set_module_mirror(&mut scene, Some(&leaf)),
        Err(RigError::ModuleTypeMismatch { .. })
    ));
    chain.set_module_mirror(&mut scene, None)?;
    Ok(())
}

#[test]
fn update_mirror_without_source_fails() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let module = rig.add_module(&mut scene, "Leaf", "arm", Side::R, None)?;

    assert!(matches!(
        module.update_mirror(&mut rig.context(&mut scene)),
        Err(RigError::MissingReference { reference: "module mirror", .. })
    ));
    Ok(())
}

// ============================================================================
// Non-mirrored Parents
// ============================================================================

#[test]
fn non_mirrored_parents_stop_at_middle() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let spine = rig.add_module(&mut scene, "Chain", "spine", Side::M, None)?;
    let spine_top = spine.deform_joints(&scene)?[2];
    let clav = rig.add_module(&mut scene, "Leaf", "clav", Side::L, Some(spine_top))?;
    let clav_joint = clav.deform_joints(&scene)?[0];
    let arm = rig.add_module(&mut scene, "Leaf", "arm", Side::L, Some(clav_joint))?;
    let arm_joint = arm.deform_joints(&scene)?[0];
    let hand = rig.add_module(&mut scene, "Leaf", "hand", Side::L, Some(arm_joint))?;

    let cx = rig.context(&mut scene);
    assert_eq!(hand.find_non_mirrored_parents(&cx)?, vec![arm.clone(), clav.clone()]);
    assert!(clav.find_non_mirrored_parents(&cx)?.is_empty());
    Ok(())
}

#[test]
fn non_mirrored_parents_stop_at_mirrored() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let spine = rig.add_module(&mut scene, "Chain", "spine", Side::M, None)?;
    let spine_top = spine.deform_joints(&scene)?[2];
    let left_clav = rig.add_module(&mut scene, "Leaf", "clav", Side::L, Some(spine_top))?;
    let right_clav = rig.add_module(&mut scene, "Leaf", "clav", Side::R, Some(spine_top))?;
    let right_joint = right_clav.deform_joints(&scene)?[0];
    let right_arm = rig.add_module(&mut scene, "Leaf", "arm", Side::R, Some(right_joint))?;
    right_clav.set_module_mirror(&mut scene, Some(&left_clav))?;

    let cx = rig.context(&mut scene);
    assert!(right_arm.find_non_mirrored_parents(&cx)?.is_empty());
    Ok(())
}

#[test]
fn non_mirrored_parents_missing_parent_fails() -> anyhow::Result<()> {
    let (mut scene, rig) = setup();
    let clav = rig.add_module(&mut scene, "Leaf", "clav", Side::L, None)?;
    let clav_joint = clav.deform_joints(&scene)?[0];
    let arm = rig.add_module(&mut scene, "Leaf", "arm", Side::L, Some(clav_joint))?;

    let cx = rig.context(&mut scene);
    assert!(matches!(
        arm.find_non_mirrored_parents(&cx),
        Err(RigError::MissingReference { reference: "parent module", module })
            if module == "L_clav_mod"
    ));
    Ok(())
}
