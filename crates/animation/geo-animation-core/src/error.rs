//! Error types for the animation core.

/// Errors surfaced by the checked APIs of this crate.
///
/// Most per-frame paths never return these: lookup misses degrade to
/// `None`/`false` and keep the last known animation state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnimationError {
    /// A data ticket value was read or written as the wrong type.
    #[error("data ticket '{ticket}' holds {actual}, requested {expected}")]
    TicketTypeMismatch {
        ticket: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// No controller declares a triggerable animation with this name.
    #[error("animation not found: {name}")]
    AnimationNotFound { name: String },

    /// No controller with this name is registered on the manager.
    #[error("controller not found: {name}")]
    ControllerNotFound { name: String },

    #[error("invalid animation data: {reason}")]
    InvalidData { reason: String },

    #[error("invalid config: {reason}")]
    Config { reason: String },
}

/// Errors raised while assembling a bone hierarchy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SkeletonError {
    #[error("duplicate bone name: {name}")]
    DuplicateBone { name: String },

    /// The parent must be added before any of its children.
    #[error("bone '{bone}' references unknown parent '{parent}'")]
    MissingParent { bone: String, parent: String },
}
