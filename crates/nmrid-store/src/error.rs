use nmrid_types::Handle;

use crate::class::{NotifyError, StoreClass, StoreEvent};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The handle was never issued by this store.
    #[error("object not found: {0}")]
    NotFound(Handle),

    /// The object has been deleted and cannot be modified.
    #[error("object is deleted: {0}")]
    Deleted(Handle),

    /// The root object cannot be deleted.
    #[error("cannot delete the store root {0}")]
    RootImmutable(Handle),

    /// The parent cannot contain objects of this class.
    #[error("{parent_class:?} cannot contain {class:?}")]
    InvalidParent {
        class: StoreClass,
        parent_class: StoreClass,
    },

    /// A live sibling of the same class already uses this key.
    #[error("duplicate {class:?} key {key:?} under {parent}")]
    DuplicateKey {
        class: StoreClass,
        parent: Handle,
        key: Vec<String>,
    },

    /// A key part contains the character reserved for rendering `.` in Pids.
    #[error("key part {part:?} contains the reserved character '{reserved}'")]
    ReservedCharacter { part: String, reserved: char },

    /// A registered notifier failed while the store was delivering an event.
    #[error("notifier for {class:?}.{event} failed on {handle}: {source}")]
    Notifier {
        class: StoreClass,
        event: StoreEvent,
        handle: Handle,
        #[source]
        source: NotifyError,
    },
}

impl StoreError {
    /// The error returned by a failing notifier, if this is one.
    pub fn notifier_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Notifier { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
