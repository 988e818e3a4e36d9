//! Error types for the wrapper layer.

use nmrid_store::{StoreClass, StoreError};
use nmrid_types::{ClassKind, Handle, Pid, PidError};

/// Errors that can occur while maintaining or querying wrappers.
#[derive(Debug, thiserror::Error)]
pub enum WrapError {
    /// Pid text could not be parsed or built.
    #[error("malformed pid: {0}")]
    MalformedPid(#[from] PidError),

    /// Eviction was requested for a handle the store still reports live.
    #[error("cannot evict wrapper for live handle {handle}")]
    PrematureEviction { handle: Handle },

    /// A second wrapper was about to be created for the same handle.
    #[error("handle {handle} is already wrapped")]
    DuplicateWrapper { handle: Handle },

    /// Another live wrapper already holds this pid.
    #[error("pid {pid} is already in use")]
    PidCollision { pid: Pid },

    /// The parent of a handle is not wrapped, so its pid cannot be derived.
    #[error("parent of {handle} is not wrapped")]
    UnwrappedParent { handle: Handle },

    /// A notification named a different class than the store reports.
    #[error("{handle} was notified as {notified} but the store says {actual}")]
    ClassMismatch {
        handle: Handle,
        notified: StoreClass,
        actual: StoreClass,
    },

    /// The store returned a key with the wrong number of parts for the class.
    #[error("{kind} key needs {expected} part(s), store returned {actual}")]
    KeyArity {
        kind: ClassKind,
        expected: usize,
        actual: usize,
    },

    /// The wrapper has been evicted; its handle was deleted.
    #[error("wrapper for {handle} has been evicted")]
    Evicted { handle: Handle },

    /// The project this wrapper belonged to has been detached.
    #[error("project is detached")]
    Detached,

    /// No plural child link with this name exists below the class.
    #[error("{kind} has no child link named {name:?}")]
    UnknownPluralLink { kind: ClassKind, name: String },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for wrapper-layer results.
pub type WrapResult<T> = Result<T, WrapError>;
