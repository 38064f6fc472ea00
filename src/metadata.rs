//! Naming codec.
//!
//! Every node a rig module creates carries its identity in its name:
//!
//! ```text
//! {side}_{base_name}[_{description}][_{id}]_{role}
//!
//! M_spine_mod
//! L_arm_placement_grp
//! L_arm_2_deform
//! R_leg_knee_0_ctl
//! ```
//!
//! [`name_from_metadata`] and [`metadata_from_name`] are pure and inverse of
//! each other for every metadata record that [`name_from_metadata`] accepts.
//! Components may only contain ASCII letters and digits, and a description
//! must not be purely numeric (it would read back as an id).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RigError};

const SEPARATOR: char = '_';

/// Symmetry side of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// Middle
    #[default]
    M,
    /// Left
    L,
    /// Right
    R,
}

impl Side {
    pub const CHOICES: &'static [&'static str] = &["M", "L", "R"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::M => "M",
            Side::L => "L",
            Side::R => "R",
        }
    }

    /// The side across the symmetry plane. Middle maps to itself.
    #[must_use]
    pub fn mirrored(self) -> Self {
        match self {
            Side::M => Side::M,
            Side::L => Side::R,
            Side::R => Side::L,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "M" => Ok(Side::M),
            "L" => Ok(Side::L),
            "R" => Ok(Side::R),
            other => Err(RigError::InvalidFieldValue {
                field: "side",
                value: other.to_string(),
            }),
        }
    }
}

/// Reflection algorithm used when a module mirrors its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MirrorType {
    /// Positions and orientations are reflected, so mirrored controls
    /// behave symmetrically when animated.
    #[default]
    Behavior,
    /// Positions are reflected, orientations are copied as-is.
    Orientation,
}

impl MirrorType {
    pub const CHOICES: &'static [&'static str] = &["Behavior", "Orientation"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MirrorType::Behavior => "Behavior",
            MirrorType::Orientation => "Orientation",
        }
    }
}

impl fmt::Display for MirrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MirrorType {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "behavior" => Ok(MirrorType::Behavior),
            "orientation" => Ok(MirrorType::Orientation),
            _ => Err(RigError::InvalidFieldValue {
                field: "mirror_type",
                value: s.to_string(),
            }),
        }
    }
}

/// Structured identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Metadata {
    pub base_name: String,
    pub side: Side,
    pub role: String,
    pub description: Option<String>,
    pub id: Option<u32>,
}

impl Metadata {
    #[must_use]
    pub fn new(base_name: impl Into<String>, side: Side, role: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            side,
            role: role.into(),
            description: None,
            id: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Same identity with another base name and side.
    ///
    /// Role, description and id are kept, which is what renaming a module
    /// does to every node it owns.
    #[must_use]
    pub fn rebased(&self, base_name: &str, side: Side) -> Self {
        Self {
            base_name: base_name.to_string(),
            side,
            ..self.clone()
        }
    }
}

fn is_component(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Encodes `metadata` into a node name.
pub fn name_from_metadata(metadata: &Metadata) -> Result<String> {
    if !is_component(&metadata.base_name) {
        return Err(RigError::InvalidMetadata(format!(
            "base name `{}` must be non-empty ASCII alphanumeric",
            metadata.base_name
        )));
    }
    if !is_component(&metadata.role) {
        return Err(RigError::InvalidMetadata(format!(
            "role `{}` must be non-empty ASCII alphanumeric",
            metadata.role
        )));
    }

    let mut name = format!("{}{SEPARATOR}{}", metadata.side, metadata.base_name);
    if let Some(description) = &metadata.description {
        if !is_component(description) || is_numeric(description) {
            return Err(RigError::InvalidMetadata(format!(
                "description `{description}` must be ASCII alphanumeric and not purely numeric"
            )));
        }
        name.push(SEPARATOR);
        name.push_str(description);
    }
    if let Some(id) = metadata.id {
        name.push(SEPARATOR);
        name.push_str(&id.to_string());
    }
    name.push(SEPARATOR);
    name.push_str(&metadata.role);
    Ok(name)
}

/// Decodes a node name produced by [`name_from_metadata`].
pub fn metadata_from_name(name: &str) -> Result<Metadata> {
    let fail = |reason| RigError::Decode {
        name: name.to_string(),
        reason,
    };

    let parts: Vec<&str> = name.split(SEPARATOR).collect();
    if parts.len() < 3 {
        return Err(fail("expected at least side, base name and role"));
    }
    if parts.iter().any(|p| !is_component(p)) {
        return Err(fail("empty or non-alphanumeric component"));
    }

    let side = parts[0]
        .parse::<Side>()
        .map_err(|_| fail("unknown side"))?;
    let base_name = parts[1].to_string();
    let role = parts[parts.len() - 1].to_string();

    let parse_id = |s: &str| s.parse::<u32>().map_err(|_| fail("id out of range"));
    let (description, id) = match &parts[2..parts.len() - 1] {
        [] => (None, None),
        [single] if is_numeric(single) => (None, Some(parse_id(single)?)),
        [single] => (Some((*single).to_string()), None),
        [description, id] if !is_numeric(description) && is_numeric(id) => {
            (Some((*description).to_string()), Some(parse_id(id)?))
        }
        _ => return Err(fail("too many components")),
    };

    Ok(Metadata {
        base_name,
        side,
        role,
        description,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_minimal() {
        let name = name_from_metadata(&Metadata::new("arm", Side::L, "mod")).unwrap();
        assert_eq!(name, "L_arm_mod");
    }

    #[test]
    fn test_encode_full() {
        let metadata = Metadata::new("arm", Side::R, "deform")
            .with_description("elbow")
            .with_id(2);
        assert_eq!(name_from_metadata(&metadata).unwrap(), "R_arm_elbow_2_deform");
    }

    #[test]
    fn test_decode_id_without_description() {
        let metadata = metadata_from_name("M_spine_0_deform").unwrap();
        assert_eq!(metadata.id, Some(0));
        assert_eq!(metadata.description, None);
        assert_eq!(metadata.role, "deform");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(metadata_from_name("arm").is_err());
        assert!(metadata_from_name("X_arm_mod").is_err());
        assert!(metadata_from_name("L__mod").is_err());
        assert!(metadata_from_name("L_arm_a_b_c_mod").is_err());
    }

    #[test]
    fn test_encode_rejects_ambiguous_description() {
        let metadata = Metadata::new("arm", Side::L, "grp").with_description("12");
        assert!(matches!(
            name_from_metadata(&metadata),
            Err(RigError::InvalidMetadata(_))
        ));
        let metadata = Metadata::new("left_arm", Side::L, "grp");
        assert!(name_from_metadata(&metadata).is_err());
    }

    #[test]
    fn test_mirror_type_parse_is_case_insensitive() {
        assert_eq!("behavior".parse::<MirrorType>().unwrap(), MirrorType::Behavior);
        assert_eq!("Orientation".parse::<MirrorType>().unwrap(), MirrorType::Orientation);
        assert!("flip".parse::<MirrorType>().is_err());
    }
}
