//! Persistent attributes.
//!
//! A persistent attribute is a regular attribute on a node, mirrored by a
//! backup attribute on the module's backing node named
//! `{node_name}__{attr_name}` and tagged
//! [`AttrCategory::PERSISTENT_BACKUP`]. The attribute feeds its backup
//! through a connection, so the value outlives the node: when the node is
//! deleted and recreated under the same name (a rebuild), the backup is found
//! again and its value restored.
//!
//! Only the backup name ties it to its node. Renaming the node without
//! renaming the backup orphans the value.

use crate::errors::{Result, RigError};
use crate::scene::{AttrCategory, AttrValue, NodeHandle, NodeStore};

const BACKUP_SEPARATOR: &str = "__";

/// Name of the backup attribute for `node_name.attr_name`.
#[must_use]
pub fn backup_attr_name(node_name: &str, attr_name: &str) -> String {
    format!("{node_name}{BACKUP_SEPARATOR}{attr_name}")
}

/// Splits a backup attribute name into `(node_name, attr_name)`.
#[must_use]
pub fn split_backup_attr_name(backup: &str) -> Option<(&str, &str)> {
    backup.split_once(BACKUP_SEPARATOR)
}

/// Adds `attr_name` to `node`, backed up on `holder`.
///
/// If a backup already exists on `holder`, its value is restored onto the
/// new attribute; otherwise the backup is created with `default`.
pub fn create_persistent_attribute(
    scene: &mut dyn NodeStore,
    node: NodeHandle,
    holder: NodeHandle,
    attr_name: &str,
    default: AttrValue,
) -> Result<()> {
    let node_name = scene.name(node)?;
    let backup = backup_attr_name(&node_name, attr_name);

    let value = if scene.has_attr(holder, &backup)? {
        let saved = scene.get_attr(holder, &backup)?;
        if !saved.same_kind(&default) {
            return Err(RigError::TypeMismatch {
                node: scene.name(holder)?,
                attr: backup,
                expected: default.kind_name(),
            });
        }
        log::debug!("Restoring {node_name}.{attr_name} from backup");
        saved
    } else {
        scene.add_attr(holder, &backup, default.clone(), AttrCategory::PERSISTENT_BACKUP)?;
        default
    };

    scene.add_attr(node, attr_name, value, AttrCategory::USER)?;
    scene.connect_attr(node, attr_name, holder, &backup)?;
    Ok(())
}
