//! Controller shape library.
//!
//! Controllers are transforms whose visible shape is a list of curves.
//! [`ShapeLibrary`] is the seam to the host's shape tooling; [`BuiltinShapes`]
//! stores the curves as JSON on the controller node itself.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RigError};
use crate::scene::{AttrCategory, AttrValue, NodeHandle, NodeStore};

/// One curve of a controller shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveData {
    pub degree: u32,
    #[serde(default)]
    pub periodic: bool,
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub enable_overrides: bool,
    #[serde(default)]
    pub use_rgb: bool,
    #[serde(default)]
    pub color_rgb: [f32; 3],
}

impl CurveData {
    #[must_use]
    pub fn new(degree: u32, periodic: bool, points: Vec<[f32; 3]>) -> Self {
        Self {
            degree,
            periodic,
            points,
            enable_overrides: false,
            use_rgb: false,
            color_rgb: [0.0; 3],
        }
    }

    /// Same curve drawn in a flat RGB override colour.
    #[must_use]
    pub fn with_color(&self, rgb: [f32; 3]) -> Self {
        Self {
            enable_overrides: true,
            use_rgb: true,
            color_rgb: rgb,
            ..self.clone()
        }
    }
}

/// Creates controllers and reads/writes their curve data.
pub trait ShapeLibrary {
    /// Creates a controller transform named `name` drawn as `shape_type`.
    fn create_controller(
        &self,
        scene: &mut dyn NodeStore,
        shape_type: &str,
        name: &str,
    ) -> Result<NodeHandle>;

    fn shape_data(&self, scene: &dyn NodeStore, controller: NodeHandle) -> Result<Vec<CurveData>>;

    /// Replaces every curve of the controller.
    fn set_shape_data(
        &self,
        scene: &mut dyn NodeStore,
        controller: NodeHandle,
        data: &[CurveData],
    ) -> Result<()>;
}

/// Builtin shapes: `circle`, `square`, `sphere`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinShapes;

impl BuiltinShapes {
    /// Attribute holding the JSON-encoded curves.
    pub const CURVES_ATTR: &'static str = "shapeCurves";

    pub const NAMES: &'static [&'static str] = &["circle", "square", "sphere"];

    /// Curves of a named shape, uncoloured.
    pub fn curves(shape_type: &str) -> Result<Vec<CurveData>> {
        match shape_type {
            "circle" => Ok(vec![circle(|a, b| [0.0, a, b])]),
            "square" => Ok(vec![CurveData::new(
                1,
                false,
                vec![
                    [0.0, 1.0, 1.0],
                    [0.0, 1.0, -1.0],
                    [0.0, -1.0, -1.0],
                    [0.0, -1.0, 1.0],
                    [0.0, 1.0, 1.0],
                ],
            )]),
            "sphere" => Ok(vec![
                circle(|a, b| [0.0, a, b]),
                circle(|a, b| [a, 0.0, b]),
                circle(|a, b| [a, b, 0.0]),
            ]),
            other => Err(RigError::UnknownShape(other.to_string())),
        }
    }
}

/// Unit circle sampled in 8 points, in the plane picked by `plane`.
fn circle(plane: impl Fn(f32, f32) -> [f32; 3]) -> CurveData {
    let points = (0..8)
        .map(|i| {
            let angle = TAU * i as f32 / 8.0;
            plane(angle.cos(), angle.sin())
        })
        .collect();
    CurveData::new(3, true, points)
}

impl ShapeLibrary for BuiltinShapes {
    fn create_controller(
        &self,
        scene: &mut dyn NodeStore,
        shape_type: &str,
        name: &str,
    ) -> Result<NodeHandle> {
        let curves = Self::curves(shape_type)?;
        let controller = scene.create("transform", name, None)?;
        scene.add_attr(
            controller,
            Self::CURVES_ATTR,
            AttrValue::String(serde_json::to_string(&curves)?),
            AttrCategory::BUILTIN,
        )?;
        Ok(controller)
    }

    fn shape_data(&self, scene: &dyn NodeStore, controller: NodeHandle) -> Result<Vec<CurveData>> {
        match scene.get_attr(controller, Self::CURVES_ATTR)? {
            AttrValue::String(json) => Ok(serde_json::from_str(&json)?),
            _ => Err(RigError::TypeMismatch {
                node: scene.name(controller)?,
                attr: Self::CURVES_ATTR.to_string(),
                expected: "string",
            }),
        }
    }

    fn set_shape_data(
        &self,
        scene: &mut dyn NodeStore,
        controller: NodeHandle,
        data: &[CurveData],
    ) -> Result<()> {
        scene.set_attr(
            controller,
            Self::CURVES_ATTR,
            AttrValue::String(serde_json::to_string(data)?),
        )
    }
}
