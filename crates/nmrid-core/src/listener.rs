//! Wrapper-level change listeners.

use std::fmt;
use std::rc::Rc;

use nmrid_types::{ClassKind, Pid};
use serde::{Deserialize, Serialize};

use crate::error::WrapResult;
use crate::wrapper::Wrapper;

/// What happened to a wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Delete,
    Rename,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Rename => "rename",
        };
        f.write_str(s)
    }
}

/// Delivered to listeners once the cache reflects the change.
///
/// For `Delete` the wrapper is already evicted; `pid` is the last pid it had.
#[derive(Clone, Debug)]
pub struct WrapperEvent {
    pub action: Action,
    pub kind: ClassKind,
    pub pid: Pid,
    /// Previous pid, set for `Rename`.
    pub old_pid: Option<Pid>,
    pub wrapper: Wrapper,
}

/// Listener callback.
pub type ListenerFn = Rc<dyn Fn(&WrapperEvent) -> WrapResult<()>>;

/// Identifies a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    kind: Option<ClassKind>,
    action: Action,
    callback: ListenerFn,
}

/// Listeners keyed by (class or any class, action), in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `action` on wrappers of `kind` (`None` = any class).
    pub fn register(&mut self, kind: Option<ClassKind>, action: Action, callback: ListenerFn) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            kind,
            action,
            callback,
        });
        id
    }

    /// Returns `true` if the listener existed.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Callbacks interested in `action` on `kind`, cloned so the registry can
    /// be released before they run.
    pub fn matching(&self, kind: ClassKind, action: Action) -> Vec<ListenerFn> {
        self.entries
            .iter()
            .filter(|e| e.action == action && e.kind.map_or(true, |k| k == kind))
            .map(|e| Rc::clone(&e.callback))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ListenerFn {
        Rc::new(|_e: &WrapperEvent| -> WrapResult<()> { Ok(()) })
    }

    #[test]
    fn matching_filters_by_kind_and_action() {
        let mut registry = ListenerRegistry::new();
        registry.register(Some(ClassKind::Chain), Action::Create, noop());
        registry.register(None, Action::Create, noop());
        registry.register(Some(ClassKind::Residue), Action::Create, noop());
        registry.register(Some(ClassKind::Chain), Action::Delete, noop());

        assert_eq!(registry.matching(ClassKind::Chain, Action::Create).len(), 2);
        assert_eq!(registry.matching(ClassKind::Atom, Action::Create).len(), 1);
        assert_eq!(registry.matching(ClassKind::Chain, Action::Rename).len(), 0);
    }

    #[test]
    fn unregister_reports_presence() {
        let mut registry = ListenerRegistry::new();
        let id = registry.register(None, Action::Delete, noop());
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Rename).unwrap(), "\"rename\"");
        assert_eq!(Action::Create.to_string(), "create");
    }
}
