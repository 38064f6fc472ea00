//! Rig configuration.
//!
//! Default placement of each module type's deform joints and placement
//! locators, and the controller colour of each side. Loaded from JSON;
//! anything missing falls back to [`RigConfig::default`].
//!
//! ```json
//! {
//!   "default_module_placement": {
//!     "Leaf": { "deform_joints": [[1,0,0,0, 0,1,0,0, 0,0,1,0, 0,5,0,1]] }
//!   },
//!   "side_color": { "M": [1, 1, 0], "L": [0, 0, 1], "R": [1, 0, 0] }
//! }
//! ```
//!
//! Matrices are 16 floats, column-major, translation last.

use std::path::Path;

use glam::{Affine3A, Mat4};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::metadata::Side;

/// Flat 4x4 matrix as stored in configuration files.
pub type MatrixData = [f32; 16];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulePlacement {
    #[serde(default)]
    pub deform_joints: Vec<MatrixData>,
    #[serde(default)]
    pub placement_locators: Vec<MatrixData>,
}

impl ModulePlacement {
    #[must_use]
    pub fn deform_joint(&self, index: usize) -> Option<Affine3A> {
        self.deform_joints.get(index).map(matrix_from_data)
    }

    #[must_use]
    pub fn placement_locator(&self, index: usize) -> Option<Affine3A> {
        self.placement_locators.get(index).map(matrix_from_data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideColors {
    #[serde(rename = "M")]
    pub middle: [f32; 3],
    #[serde(rename = "L")]
    pub left: [f32; 3],
    #[serde(rename = "R")]
    pub right: [f32; 3],
}

impl SideColors {
    #[must_use]
    pub fn color(&self, side: Side) -> [f32; 3] {
        match side {
            Side::M => self.middle,
            Side::L => self.left,
            Side::R => self.right,
        }
    }
}

impl Default for SideColors {
    fn default() -> Self {
        Self {
            middle: [1.0, 1.0, 0.0],
            left: [0.0, 0.0, 1.0],
            right: [1.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Keyed by module type.
    pub default_module_placement: FxHashMap<String, ModulePlacement>,
    pub side_color: SideColors,
}

impl RigConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn placement(&self, module_type: &str) -> Option<&ModulePlacement> {
        self.default_module_placement.get(module_type)
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        let mut default_module_placement = FxHashMap::default();
        default_module_placement.insert(
            "Leaf".to_string(),
            ModulePlacement {
                deform_joints: vec![translation_data(0.0, 10.0, 0.0)],
                placement_locators: Vec::new(),
            },
        );
        default_module_placement.insert(
            "Chain".to_string(),
            ModulePlacement {
                deform_joints: vec![
                    translation_data(0.0, 10.0, 0.0),
                    translation_data(0.0, 13.0, 0.0),
                    translation_data(0.0, 16.0, 0.0),
                ],
                placement_locators: vec![translation_data(0.0, 19.0, 0.0)],
            },
        );
        Self {
            default_module_placement,
            side_color: SideColors::default(),
        }
    }
}

#[must_use]
pub fn matrix_from_data(data: &MatrixData) -> Affine3A {
    Affine3A::from_mat4(Mat4::from_cols_array(data))
}

#[must_use]
pub fn matrix_to_data(matrix: &Affine3A) -> MatrixData {
    Mat4::from(*matrix).to_cols_array()
}

fn translation_data(x: f32, y: f32, z: f32) -> MatrixData {
    matrix_to_data(&Affine3A::from_translation(glam::Vec3::new(x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_default_colors() {
        let config = RigConfig::from_json_str(
            r#"{ "default_module_placement": { "Leaf": { "deform_joints": [] } } }"#,
        )
        .unwrap();
        assert_eq!(config.side_color, SideColors::default());
        assert!(config.placement("Leaf").unwrap().deform_joint(0).is_none());
        assert!(config.placement("Chain").is_none());
    }

    #[test]
    fn test_matrix_data_translation_is_last() {
        let data = [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 3.0, 4.0, 5.0, 1.0,
        ];
        let matrix = matrix_from_data(&data);
        assert_eq!(matrix.translation, glam::Vec3A::new(3.0, 4.0, 5.0));
        assert_eq!(matrix_to_data(&matrix), data);
    }

    #[test]
    fn test_side_colors_parse_by_side_letter() {
        let config =
            RigConfig::from_json_str(r#"{ "side_color": { "M": [0, 1, 0], "L": [1, 1, 1], "R": [0, 0, 0] } }"#)
                .unwrap();
        assert_eq!(config.side_color.color(Side::M), [0.0, 1.0, 0.0]);
        assert_eq!(config.side_color.color(Side::L), [1.0, 1.0, 1.0]);
        // Placements fall back to the builtin ones.
        assert!(config.placement("Leaf").is_some());
    }
}
