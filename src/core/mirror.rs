//! Reflection across the YZ plane.
//!
//! Written in glam's column-vector convention. A row-vector host writes the
//! same operations in reverse order: `local * orig * world` there is
//! `world * orig * local` here.

use glam::{Affine3A, Vec3};

use crate::metadata::MirrorType;

/// Flips world X.
#[must_use]
pub fn world_reflection() -> Affine3A {
    Affine3A::from_scale(Vec3::new(-1.0, 1.0, 1.0))
}

/// Flips all three local axes.
#[must_use]
pub fn local_reflection() -> Affine3A {
    Affine3A::from_scale(Vec3::new(-1.0, -1.0, -1.0))
}

/// World matrix of the mirrored counterpart of a node at `orig`.
///
/// - [`MirrorType::Behavior`] reflects the position and turns the reflected
///   frame back into a proper rotation by flipping every local axis.
/// - [`MirrorType::Orientation`] only reflects; the caller restores the
///   original orientation afterwards.
#[must_use]
pub fn mirror_matrix(orig: &Affine3A, mirror_type: MirrorType) -> Affine3A {
    match mirror_type {
        MirrorType::Behavior => world_reflection() * *orig * local_reflection(),
        MirrorType::Orientation => world_reflection() * *orig,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_behavior_keeps_a_proper_rotation() {
        let orig = Affine3A::from_rotation_translation(
            Quat::from_rotation_y(30f32.to_radians()),
            Vec3::new(5.0, 1.0, 2.0),
        );
        let mirrored = mirror_matrix(&orig, MirrorType::Behavior);
        assert!((mirrored.matrix3.determinant() - 1.0).abs() < 1e-5);
        assert!((Vec3::from(mirrored.translation) - Vec3::new(-5.0, 1.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_orientation_reflects_handedness() {
        let orig = Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let mirrored = mirror_matrix(&orig, MirrorType::Orientation);
        assert!((mirrored.matrix3.determinant() + 1.0).abs() < 1e-5);
        assert_eq!(Vec3::from(mirrored.translation), Vec3::new(-5.0, 0.0, 0.0));
    }
}
