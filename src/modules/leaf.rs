use crate::core::module::{ModuleKind, RigModule};
use crate::core::rig::RigContext;
use crate::dag;
use crate::errors::Result;

/// A single deform joint driven by one controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Leaf;

impl ModuleKind for Leaf {
    fn type_name(&self) -> &'static str {
        "Leaf"
    }

    fn initialize(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        module.create_groups(cx)?;
        module.add_deform_joint(cx, None, None, None)?;
        Ok(())
    }

    fn build(&self, module: &RigModule, cx: &mut RigContext<'_>) -> Result<()> {
        let controls_group = module.controls_group(cx.scene)?;
        for joint in module.deform_joints(cx.scene)? {
            let (ctl, buffer) = module.add_control(cx, joint, None, None, "circle")?;
            cx.scene.set_parent(buffer, controls_group)?;
            dag::matrix_constraint(cx.scene, ctl, joint)?;
        }
        Ok(())
    }
}
