use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to an object inside the external data store.
///
/// Handles are issued by the store and compared by value. A handle stays
/// valid (and keeps answering `is_deleted`) after the object it names has
/// been deleted, so it can be used as a key while tearing down wrappers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u64);

impl Handle {
    /// Create a handle from the store's raw identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The store's raw identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        let h = Handle::from_raw(42);
        assert_eq!(h.raw(), 42);
        assert_eq!(h, Handle::from_raw(42));
    }

    #[test]
    fn display_and_debug() {
        let h = Handle::from_raw(7);
        assert_eq!(h.to_string(), "h#7");
        assert_eq!(format!("{h:?}"), "Handle(7)");
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(Handle::from_raw(1) < Handle::from_raw(2));
    }
}
