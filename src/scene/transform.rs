use glam::{Affine3A, EulerRot, Quat, Vec3};

/// Local transform of a scene node.
///
/// Position, rotation and scale relative to the parent. Matrices are
/// column-major and act on column vectors (glam convention); a host using
/// row vectors stores the same 16 floats in the same order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new() -> Self {
        Self::IDENTITY
    }

    /// Builds a transform by decomposing `mat`.
    ///
    /// Shear is lost. A negative determinant is folded into a negative X scale.
    #[must_use]
    pub fn from_matrix(mat: &Affine3A) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Sets the rotation from Euler angles in degrees.
    ///
    /// Rotation order is X, then Y, then Z about the parent axes.
    pub fn set_rotation_euler_degrees(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = euler_degrees_to_quat(Vec3::new(x, y, z));
    }

    /// Current rotation as Euler angles in degrees (same order as the setter).
    #[must_use]
    pub fn rotation_euler_degrees(&self) -> Vec3 {
        quat_to_euler_degrees(self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// X-then-Y-then-Z rotation from degrees.
#[must_use]
pub fn euler_degrees_to_quat(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

/// Inverse of [`euler_degrees_to_quat`].
#[must_use]
pub fn quat_to_euler_degrees(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}
