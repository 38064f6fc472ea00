//! FK chain.

use crate::core::fields::{FieldDescriptor, FieldKind};
use crate::core::module::{ModuleKind, RigModule};
use crate::core::rig::RigContext;
use crate::dag;
use crate::errors::{Result, RigError};

pub const JOINT_COUNT: FieldDescriptor = FieldDescriptor::new("joint_count", FieldKind::Int)
    .editable()
    .displayable()
    .default_int(3)
    .tooltip("Number of deform joints in the chain.");

/// A chain of deform joints, each parented to the previous one, with an
/// `end` placement locator marking where the chain stops.
///
/// Built as a hierarchy of FK controllers, one per joint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chain;

impl Chain {
    fn joint_count(module: &RigModule, cx: &RigContext<'_>) -> Result<usize> {
        let count = module.backing().get_int(cx.scene, JOINT_COUNT.name)?;
        usize::try_from(count)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| RigError::InvalidFieldValue {
                field: JOINT_COUNT.name,
                value: count.to_string(),
            })
    }
}

impl ModuleKind for Chain {
    fn type_name(&self) -> &'static str {
        "Chain"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &[JOINT_COUNT]
    }

    fn initialize(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        module.create_groups(cx)?;

        let mut parent = None;
        for _ in 0..Self::joint_count(module, cx)? {
            parent = Some(module.add_deform_joint(cx, parent, None, None)?);
        }
        module.add_placement_locator(cx, Some("end"), None, None)?;
        Ok(())
    }

    /// Grows or shrinks the chain from its tip to match `joint_count`.
    fn update(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        let count = Self::joint_count(module, cx)?;
        let mut joints = module.deform_joints(cx.scene)?;

        while joints.len() < count {
            let joint = module.add_deform_joint(cx, joints.last().copied(), None, None)?;
            log::debug!("Added {} to the chain", cx.scene.name(joint)?);
            joints.push(joint);
        }
        while joints.len() > count {
            if let Some(tip) = joints.pop() {
                log::debug!("Removing {} from the chain", cx.scene.name(tip)?);
                module.remove_owned_node(cx, tip)?;
            }
        }
        Ok(())
    }

    fn build(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        let mut parent = module.controls_group(cx.scene)?;
        for joint in module.deform_joints(cx.scene)? {
            let (ctl, buffer) = module.add_control(cx, joint, None, None, "circle")?;
            cx.scene.set_parent(buffer, parent)?;
            dag::matrix_constraint(cx.scene, ctl, joint)?;
            parent = Some(ctl);
        }
        Ok(())
    }
}
