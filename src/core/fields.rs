//! Field schema.
//!
//! Each node type declares its persisted fields as an ordered list of
//! [`FieldDescriptor`]s. The list is what generic code walks (mirror field
//! sync, UI listings); a field's value lives in the attribute of the same
//! name on the backing node.

use crate::errors::{Result, RigError};
use crate::scene::AttrValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// String restricted to the listed choices; the first is the default.
    Enum(&'static [&'static str]),
    Bool,
    Int,
    /// Reference to a single node.
    Object,
    /// Ordered references to nodes.
    ObjectList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Editable fields are copied by mirror sync and exposed to editors.
    pub editable: bool,
    pub displayable: bool,
    /// Lower values are listed first.
    pub gui_order: i32,
    pub unique: bool,
    pub tooltip: &'static str,
    /// Initial value of `Int` fields.
    pub int_default: i64,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            editable: false,
            displayable: false,
            gui_order: 0,
            unique: false,
            tooltip: "",
            int_default: 0,
        }
    }

    #[must_use]
    pub const fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    #[must_use]
    pub const fn displayable(mut self) -> Self {
        self.displayable = true;
        self
    }

    #[must_use]
    pub const fn gui_order(mut self, order: i32) -> Self {
        self.gui_order = order;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn tooltip(mut self, tooltip: &'static str) -> Self {
        self.tooltip = tooltip;
        self
    }

    #[must_use]
    pub const fn default_int(mut self, value: i64) -> Self {
        self.int_default = value;
        self
    }

    /// Value a freshly created field holds.
    #[must_use]
    pub fn default_value(&self) -> AttrValue {
        match self.kind {
            FieldKind::String => AttrValue::String(String::new()),
            FieldKind::Enum(choices) => {
                AttrValue::String(choices.first().copied().unwrap_or_default().to_string())
            }
            FieldKind::Bool => AttrValue::Bool(false),
            FieldKind::Int => AttrValue::Int(self.int_default),
            FieldKind::Object => AttrValue::Node(None),
            FieldKind::ObjectList => AttrValue::NodeList(Vec::new()),
        }
    }

    /// Rejects values of the wrong kind and enum values outside the choices.
    pub fn validate(&self, value: &AttrValue) -> Result<()> {
        if !self.default_value().same_kind(value) {
            return Err(RigError::InvalidFieldValue {
                field: self.name,
                value: format!("{value:?}"),
            });
        }
        if let (FieldKind::Enum(choices), AttrValue::String(s)) = (self.kind, value)
            && !choices.contains(&s.as_str())
        {
            return Err(RigError::InvalidFieldValue {
                field: self.name,
                value: s.clone(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Object | FieldKind::ObjectList)
    }
}

/// Displayable fields of a schema, sorted by `gui_order` (stable).
#[must_use]
pub fn displayable_fields<'a>(
    fields: impl IntoIterator<Item = &'a FieldDescriptor>,
) -> Vec<&'a FieldDescriptor> {
    let mut shown: Vec<_> = fields.into_iter().filter(|f| f.displayable).collect();
    shown.sort_by_key(|f| f.gui_order);
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_object_kinds_are_references() {
        assert!(FieldDescriptor::new("parent_joint", FieldKind::Object).is_reference());
        assert!(FieldDescriptor::new("deform_joints", FieldKind::ObjectList).is_reference());
        assert!(!FieldDescriptor::new("name", FieldKind::String).is_reference());
        assert!(!FieldDescriptor::new("count", FieldKind::Int).is_reference());
        assert!(!FieldDescriptor::new("mode", FieldKind::Enum(&["A", "B"])).is_reference());
    }
}
