//! Memory Scene Integration Tests
//!
//! Tests for:
//! - Node lifecycle: create, find, rename, delete (recursive)
//! - Hierarchy: reparenting keeps world transforms, cycle rejection
//! - Attributes: typed values, categories, renaming
//! - Connections: single input per plug, value propagation
//! - Snapshots: deterministic dumps

use glam::{Affine3A, Quat, Vec3};
use mop::scene::{AttrCategory, AttrValue, MemoryScene, NodeStore, Space, Transform};
use mop::RigError;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

// ============================================================================
// Node Lifecycle
// ============================================================================

#[test]
fn scene_create_and_find() {
    let mut scene = MemoryScene::new();
    let node = scene.create("transform", "M_root_grp", None).unwrap();

    assert!(scene.exists("M_root_grp"));
    assert_eq!(scene.find("M_root_grp"), Some(node));
    assert_eq!(scene.node_type(node).unwrap(), "transform");
    assert_eq!(scene.root_nodes(), &[node]);
}

#[test]
fn scene_duplicate_name_leaves_single_node() {
    let mut scene = MemoryScene::new();
    scene.create("joint", "L_arm_0_deform", None).unwrap();
    let err = scene.create("joint", "L_arm_0_deform", None).unwrap_err();

    assert!(matches!(err, RigError::DuplicateName(name) if name == "L_arm_0_deform"));
    assert_eq!(scene.len(), 1);
}

#[test]
fn scene_empty_name_rejected() {
    let mut scene = MemoryScene::new();
    assert!(matches!(
        scene.create("transform", "", None),
        Err(RigError::InvalidName(_))
    ));
}

#[test]
fn scene_rename_keeps_handle() {
    let mut scene = MemoryScene::new();
    let node = scene.create("transform", "a", None).unwrap();
    let other = scene.create("transform", "b", None).unwrap();

    scene.rename(node, "c").unwrap();
    assert_eq!(scene.find("c"), Some(node));
    assert!(!scene.exists("a"));

    // Renaming to the current name is a no-op, onto another node's name is not.
    scene.rename(node, "c").unwrap();
    assert!(matches!(scene.rename(other, "c"), Err(RigError::DuplicateName(_))));
}

#[test]
fn scene_delete_removes_subtree_and_connections() {
    let mut scene = MemoryScene::new();
    let parent = scene.create("transform", "parent", None).unwrap();
    let child = scene.create("transform", "child", Some(parent)).unwrap();
    let grandchild = scene.create("transform", "grandchild", Some(child)).unwrap();
    let outside = scene.create("transform", "outside", None).unwrap();
    scene.connect_attr(grandchild, "worldMatrix", outside, "offset").unwrap();

    scene.delete(&[parent]).unwrap();

    assert!(!scene.contains(parent));
    assert!(!scene.contains(child));
    assert!(!scene.contains(grandchild));
    assert!(!scene.exists("child"));
    assert!(scene.sources(outside, "offset").unwrap().is_empty());
    assert!(scene.dump().connections.is_empty());

    // Stale handles are skipped.
    scene.delete(&[child]).unwrap();
}

// ============================================================================
// Hierarchy & Transforms
// ============================================================================

#[test]
fn scene_set_parent_keeps_world_transform() {
    let mut scene = MemoryScene::new();
    let group = scene
        .build_node("transform", "group")
        .with_position(1.0, 2.0, 3.0)
        .with_rotation_degrees(0.0, 90.0, 0.0)
        .build()
        .unwrap();
    let node = scene
        .build_node("transform", "node")
        .with_position(5.0, 0.0, 0.0)
        .build()
        .unwrap();

    scene.set_parent(node, Some(group)).unwrap();

    let world = scene.matrix(node, Space::World).unwrap();
    assert!(vec3_approx(world.translation.into(), Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(scene.parent(node).unwrap(), Some(group));
    assert_eq!(scene.children(group).unwrap(), vec![node]);
    assert!(!scene.root_nodes().contains(&node));
}

#[test]
fn scene_set_parent_rejects_cycles() {
    let mut scene = MemoryScene::new();
    let a = scene.create("transform", "a", None).unwrap();
    let b = scene.create("transform", "b", Some(a)).unwrap();
    let c = scene.create("transform", "c", Some(b)).unwrap();

    assert!(matches!(
        scene.set_parent(a, Some(c)),
        Err(RigError::InvalidParent { .. })
    ));
    assert!(matches!(
        scene.set_parent(a, Some(a)),
        Err(RigError::InvalidParent { .. })
    ));
}

#[test]
fn scene_world_matrix_composes_parents() {
    let mut scene = MemoryScene::new();
    let root = scene
        .build_node("transform", "root")
        .with_position(0.0, 10.0, 0.0)
        .with_scale(2.0)
        .build()
        .unwrap();
    let child = scene
        .build_node("joint", "child")
        .with_position(1.0, 0.0, 0.0)
        .with_parent(root)
        .build()
        .unwrap();

    let world = scene.matrix(child, Space::World).unwrap();
    assert!(vec3_approx(world.translation.into(), Vec3::new(2.0, 10.0, 0.0)));
    let local = scene.matrix(child, Space::Local).unwrap();
    assert!(vec3_approx(local.translation.into(), Vec3::new(1.0, 0.0, 0.0)));
}

#[test]
fn scene_inherits_transform_off_ignores_parent() {
    let mut scene = MemoryScene::new();
    let root = scene
        .build_node("transform", "root")
        .with_position(0.0, 10.0, 0.0)
        .build()
        .unwrap();
    let child = scene
        .build_node("transform", "child")
        .with_position(1.0, 0.0, 0.0)
        .with_parent(root)
        .build()
        .unwrap();

    scene.set_attr(child, "inheritsTransform", AttrValue::Bool(false)).unwrap();
    let world = scene.matrix(child, Space::World).unwrap();
    assert!(vec3_approx(world.translation.into(), Vec3::new(1.0, 0.0, 0.0)));

    // World assignments are expressed in the same space.
    scene
        .set_matrix(child, &Affine3A::from_translation(Vec3::new(4.0, 4.0, 4.0)), Space::World)
        .unwrap();
    assert!(vec3_approx(scene.transform(child).unwrap().position, Vec3::splat(4.0)));
}

#[test]
fn scene_set_world_matrix_under_rotated_parent() {
    let mut scene = MemoryScene::new();
    let root = scene
        .build_node("transform", "root")
        .with_rotation_degrees(0.0, 0.0, 90.0)
        .build()
        .unwrap();
    let child = scene.create("joint", "child", Some(root)).unwrap();

    let target = Affine3A::from_rotation_translation(Quat::from_rotation_y(0.5), Vec3::new(3.0, 1.0, -2.0));
    scene.set_matrix(child, &target, Space::World).unwrap();

    assert!(scene.matrix(child, Space::World).unwrap().abs_diff_eq(target, 1e-4));
    assert_ne!(scene.transform(child).unwrap(), Transform::IDENTITY);
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn scene_builtin_attributes_on_dag_nodes() {
    let mut scene = MemoryScene::new();
    let joint = scene.create("joint", "j", None).unwrap();
    let utility = scene.create("multMatrix", "m", None).unwrap();

    assert_eq!(scene.get_attr(joint, "visibility").unwrap(), AttrValue::Bool(true));
    assert_eq!(scene.get_attr(joint, "inheritsTransform").unwrap(), AttrValue::Bool(true));
    assert!(!scene.has_attr(utility, "visibility").unwrap());
    assert_eq!(
        scene.list_attrs(joint, AttrCategory::BUILTIN).unwrap(),
        vec!["visibility".to_string(), "inheritsTransform".to_string()]
    );
}

#[test]
fn scene_attribute_type_checks() {
    let mut scene = MemoryScene::new();
    let node = scene.create("transform", "n", None).unwrap();
    scene.add_attr(node, "count", AttrValue::Int(1), AttrCategory::USER).unwrap();

    assert!(matches!(
        scene.add_attr(node, "count", AttrValue::Int(2), AttrCategory::USER),
        Err(RigError::AttributeExists { .. })
    ));
    assert!(matches!(
        scene.set_attr(node, "count", AttrValue::String("x".into())),
        Err(RigError::TypeMismatch { expected: "int", .. })
    ));
    assert!(matches!(
        scene.get_attr(node, "missing"),
        Err(RigError::AttributeNotFound { .. })
    ));

    scene.set_attr(node, "count", AttrValue::Int(5)).unwrap();
    assert_eq!(scene.get_attr(node, "count").unwrap(), AttrValue::Int(5));
}

#[test]
fn scene_list_attrs_filters_by_category() {
    let mut scene = MemoryScene::new();
    let node = scene.create("transform", "n", None).unwrap();
    scene.add_attr(node, "a", AttrValue::Bool(false), AttrCategory::FIELD).unwrap();
    scene.add_attr(node, "b", AttrValue::Bool(false), AttrCategory::USER).unwrap();
    scene
        .add_attr(node, "c", AttrValue::Bool(false), AttrCategory::PERSISTENT_BACKUP)
        .unwrap();

    assert_eq!(scene.list_attrs(node, AttrCategory::FIELD).unwrap(), vec!["a"]);
    assert_eq!(
        scene
            .list_attrs(node, AttrCategory::USER | AttrCategory::PERSISTENT_BACKUP)
            .unwrap(),
        vec!["b", "c"]
    );
}

// ============================================================================
// Connections
// ============================================================================

#[test]
fn scene_connection_propagates_values() {
    let mut scene = MemoryScene::new();
    let src = scene.create("transform", "src", None).unwrap();
    let dst = scene.create("transform", "dst", None).unwrap();
    scene.add_attr(src, "data", AttrValue::from("hello"), AttrCategory::USER).unwrap();
    scene.add_attr(dst, "backup", "".into(), AttrCategory::PERSISTENT_BACKUP).unwrap();

    scene.connect_attr(src, "data", dst, "backup").unwrap();
    assert_eq!(scene.get_attr(dst, "backup").unwrap(), AttrValue::from("hello"));

    scene.set_attr(src, "data", AttrValue::from("world")).unwrap();
    assert_eq!(scene.get_attr(dst, "backup").unwrap(), AttrValue::from("world"));
    assert_eq!(scene.sources(dst, "backup").unwrap(), vec![src]);
}

#[test]
fn scene_plug_accepts_single_input() {
    let mut scene = MemoryScene::new();
    let a = scene.create("transform", "a", None).unwrap();
    let b = scene.create("transform", "b", None).unwrap();
    let c = scene.create("transform", "c", None).unwrap();

    scene.connect_attr(a, "message", c, "module").unwrap();
    assert!(matches!(
        scene.connect_attr(b, "message", c, "module"),
        Err(RigError::PlugConnected { .. })
    ));
    // One output can feed many inputs.
    scene.connect_attr(a, "message", b, "module").unwrap();
}

#[test]
fn scene_rename_attr_keeps_connections() {
    let mut scene = MemoryScene::new();
    let src = scene.create("transform", "src", None).unwrap();
    let holder = scene.create("transform", "holder", None).unwrap();
    scene.add_attr(src, "data", AttrValue::Float(1.0), AttrCategory::USER).unwrap();
    scene
        .add_attr(holder, "src__data", AttrValue::Float(0.0), AttrCategory::PERSISTENT_BACKUP)
        .unwrap();
    scene.connect_attr(src, "data", holder, "src__data").unwrap();

    scene.rename_attr(holder, "src__data", "other__data").unwrap();
    assert!(!scene.has_attr(holder, "src__data").unwrap());

    scene.set_attr(src, "data", AttrValue::Float(2.0)).unwrap();
    assert_eq!(scene.get_attr(holder, "other__data").unwrap(), AttrValue::Float(2.0));
    assert_eq!(scene.dump().connections, vec!["src.data -> holder.other__data"]);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn scene_dump_is_sorted_and_comparable() {
    let mut scene = MemoryScene::new();
    let b = scene.create("transform", "b", None).unwrap();
    scene.create("transform", "a", Some(b)).unwrap();

    let dump = scene.dump();
    assert_eq!(dump.names(), vec!["a", "b"]);
    assert_eq!(dump.node("a").unwrap().parent.as_deref(), Some("b"));
    assert_eq!(dump, scene.clone().dump());

    scene.set_attr(b, "visibility", AttrValue::Bool(false)).unwrap();
    assert_ne!(dump, scene.dump());
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn transform_euler_degrees_round_trip() {
    let mut transform = Transform::new();
    transform.set_rotation_euler_degrees(10.0, -35.0, 60.0);
    let back = transform.rotation_euler_degrees();
    assert!((back - Vec3::new(10.0, -35.0, 60.0)).abs().max_element() < 1e-2);
}

#[test]
fn transform_single_axis_euler_matches_axis_rotation() {
    let mut transform = Transform::new();
    transform.set_rotation_euler_degrees(0.0, 30.0, 0.0);
    let expected = Quat::from_rotation_y(30f32.to_radians());
    assert!(transform.rotation.dot(expected).abs() > 1.0 - 1e-6);
}

#[test]
fn transform_from_matrix_folds_reflection_into_scale() {
    let reflected = Affine3A::from_scale(Vec3::new(-1.0, 1.0, 1.0))
        * Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0));
    let transform = Transform::from_matrix(&reflected);

    assert!(vec3_approx(transform.position, Vec3::new(-5.0, 0.0, 0.0)));
    assert!(transform.local_matrix().abs_diff_eq(reflected, 1e-5));
}
