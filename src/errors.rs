//! Error Types
//!
//! This module defines the error types used throughout the rigging framework.
//!
//! # Overview
//!
//! The main error type [`RigError`] covers all failure modes including:
//! - Name collisions and malformed names
//! - Stale node handles and missing attributes
//! - Module resolution through the type registry
//! - Configuration and shape data parsing
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, RigError>`.
//! Nothing is rolled back on failure: the scene is left in whatever state the
//! failing operation reached, as the host application's undo queue is the
//! rollback path.

use thiserror::Error;

/// The main error type for the rigging framework.
#[derive(Error, Debug)]
pub enum RigError {
    // ========================================================================
    // Naming Errors
    // ========================================================================
    /// A node with the encoded name already exists in the scene.
    #[error("A node with the name `{0}` already exists")]
    DuplicateName(String),

    /// A node name could not be decoded into metadata.
    #[error("Cannot decode metadata from `{name}`: {reason}")]
    Decode {
        /// The offending name
        name: String,
        /// Why decoding failed
        reason: &'static str,
    },

    /// Metadata that would not survive an encode/decode round trip.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Empty or otherwise unusable node name.
    #[error("Invalid node name: `{0}`")]
    InvalidName(String),

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The node does not exist (stale handle or unknown name).
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The attribute does not exist on the node.
    #[error("Attribute `{attr}` not found on `{node}`")]
    AttributeNotFound {
        /// Node name
        node: String,
        /// Attribute name
        attr: String,
    },

    /// The attribute already exists on the node.
    #[error("Attribute `{attr}` already exists on `{node}`")]
    AttributeExists {
        /// Node name
        node: String,
        /// Attribute name
        attr: String,
    },

    /// A value of the wrong kind was written to an attribute.
    #[error("Attribute `{node}.{attr}` expects a {expected} value")]
    TypeMismatch {
        /// Node name
        node: String,
        /// Attribute name
        attr: String,
        /// Kind of value the attribute holds
        expected: &'static str,
    },

    /// The destination plug already has an incoming connection.
    #[error("Plug `{node}.{attr}` already has an incoming connection")]
    PlugConnected {
        /// Node name
        node: String,
        /// Attribute name
        attr: String,
    },

    /// Reparenting would make a node its own ancestor.
    #[error("Cannot parent `{node}` under `{parent}`")]
    InvalidParent {
        /// Node being reparented
        node: String,
        /// Requested parent
        parent: String,
    },

    // ========================================================================
    // Module Errors
    // ========================================================================
    /// A field was given a value outside its declared choices.
    #[error("Invalid value `{value}` for field `{field}`")]
    InvalidFieldValue {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: String,
    },

    /// No module kind is registered under this type tag.
    #[error("Unknown module type: {0}")]
    UnknownModuleType(String),

    /// Two modules that must share a type do not.
    #[error("Module type mismatch: expected `{expected}`, found `{found}`")]
    ModuleTypeMismatch {
        /// Type of the module being edited
        expected: String,
        /// Type of the other module
        found: String,
    },

    /// An optional module reference was dereferenced while unset.
    #[error("Module `{module}` has no {reference}")]
    MissingReference {
        /// Node name of the module
        module: String,
        /// Which reference was missing
        reference: &'static str,
    },

    /// The module has already been built.
    #[error("Module `{0}` is already built")]
    AlreadyBuilt(String),

    // ========================================================================
    // Shape & Config Errors
    // ========================================================================
    /// The shape library has no shape with this name.
    #[error("Unknown controller shape: {0}")]
    UnknownShape(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, RigError>`.
pub type Result<T> = std::result::Result<T, RigError>;
