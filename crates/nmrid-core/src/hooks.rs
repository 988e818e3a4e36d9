//! Lifecycle hooks: how the identity cache follows store mutations.
//!
//! Each hook is a plain function over the store and the cache. It returns a
//! description of what changed so the caller can release the cache and only
//! then tell listeners.

use nmrid_store::{DataStore, StoreClass};
use nmrid_types::{ClassKind, Handle, Pid};
use tracing::{debug, warn};

use crate::cache::{IdentityCache, WrapperId, WrapperRecord};
use crate::descriptor;
use crate::error::{WrapError, WrapResult};

/// One wrapper whose pid changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Renamed {
    pub id: WrapperId,
    pub old_pid: Pid,
    pub new_pid: Pid,
}

/// A store object of class `class` was created.
///
/// Creates exactly one wrapper for `handle` unless it is already wrapped or
/// its class is not wrapped at all. If the parent is not wrapped yet (a
/// store notifier created the child before our create hook for the parent
/// ran), the parent chain is wrapped first. Returns the new wrapper ids,
/// ancestors first. `class` must be the class the store reports for `handle`.
pub fn on_object_appeared(
    store: &dyn DataStore,
    cache: &mut IdentityCache,
    class: StoreClass,
    handle: Handle,
) -> WrapResult<Vec<WrapperId>> {
    if descriptor::by_store_class(class).is_none() {
        return Ok(Vec::new());
    }
    let actual = store.class_of(handle)?;
    if actual != class {
        return Err(WrapError::ClassMismatch {
            handle,
            notified: class,
            actual,
        });
    }
    let mut created = Vec::new();
    wrap_with_ancestors(store, cache, handle, &mut created)?;
    Ok(created)
}

fn wrap_with_ancestors(
    store: &dyn DataStore,
    cache: &mut IdentityCache,
    handle: Handle,
    created: &mut Vec<WrapperId>,
) -> WrapResult<WrapperId> {
    if let Some(id) = cache.lookup_by_handle(handle) {
        return Ok(id);
    }
    let class = store.class_of(handle)?;
    let desc = descriptor::by_store_class(class).ok_or(WrapError::UnwrappedParent { handle })?;

    let parent = match store.parent(handle)? {
        Some(parent) if !store.is_deleted(parent)? => parent,
        _ if desc.kind == ClassKind::Project => {
            let pid = desc.derive_pid(store, None, handle)?;
            let id = cache.insert(handle, desc.kind, pid, None)?;
            created.push(id);
            return Ok(id);
        }
        _ => return Err(WrapError::UnwrappedParent { handle }),
    };

    let parent_id = wrap_with_ancestors(store, cache, parent, created)?;
    let parent_pid = cache
        .get(parent_id)
        .map(|record| record.pid.clone())
        .ok_or(WrapError::UnwrappedParent { handle: parent })?;
    let pid = desc.derive_pid(store, Some(&parent_pid), handle)?;
    let id = cache.insert(handle, desc.kind, pid, Some(parent_id))?;
    created.push(id);
    Ok(id)
}

/// A store object was deleted.
///
/// The handle must already report itself deleted. Evicts its wrapper and
/// any cached descendants; a handle without a wrapper is a tolerated no-op.
pub fn on_object_about_to_vanish(
    store: &dyn DataStore,
    cache: &mut IdentityCache,
    handle: Handle,
) -> WrapResult<Vec<(WrapperId, WrapperRecord)>> {
    if !store.is_deleted(handle)? {
        return Err(WrapError::PrematureEviction { handle });
    }
    if cache.lookup_by_handle(handle).is_none() {
        warn!(%handle, "vanish notification for unwrapped handle");
        return Ok(Vec::new());
    }
    cache.evict(store, handle)
}

/// A store object's key changed.
///
/// Recomputes the pid of its wrapper and of every cached descendant, whose
/// pids embed the renamed key, and reindexes them in one step.
pub fn on_object_renamed(
    store: &dyn DataStore,
    cache: &mut IdentityCache,
    handle: Handle,
) -> WrapResult<Vec<Renamed>> {
    let Some(id) = cache.lookup_by_handle(handle) else {
        warn!(%handle, "rename notification for unwrapped handle");
        return Ok(Vec::new());
    };

    let mut fresh: Vec<(WrapperId, Pid)> = Vec::new();
    let members = match cache.get(id).map(|r| r.kind) {
        // Child pids do not embed the project name.
        Some(ClassKind::Project) => vec![id],
        _ => cache.subtree(id),
    };
    for member in members {
        let Some(record) = cache.get(member) else {
            continue;
        };
        let parent_pid = match record.parent {
            Some(parent) => {
                let from_batch = fresh.iter().find(|(i, _)| *i == parent).map(|(_, p)| p.clone());
                match from_batch.or_else(|| cache.get(parent).map(|r| r.pid.clone())) {
                    Some(pid) => Some(pid),
                    None => return Err(WrapError::UnwrappedParent { handle: record.handle }),
                }
            }
            None => None,
        };
        let pid = descriptor::descriptor(record.kind).derive_pid(store, parent_pid.as_ref(), record.handle)?;
        fresh.push((member, pid));
    }

    let changes: Vec<Renamed> = fresh
        .iter()
        .filter_map(|(member, new_pid)| {
            let old_pid = cache.get(*member)?.pid.clone();
            (old_pid != *new_pid).then(|| Renamed {
                id: *member,
                old_pid,
                new_pid: new_pid.clone(),
            })
        })
        .collect();
    if changes.is_empty() {
        return Ok(changes);
    }

    let updates: Vec<(WrapperId, Pid)> = changes.iter().map(|c| (c.id, c.new_pid.clone())).collect();
    cache.reindex(&updates)?;
    debug!(%handle, count = changes.len(), "pids recomputed after rename");
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::initialize_tree;
    use nmrid_store::InMemoryStore;

    fn pid(text: &str) -> Pid {
        Pid::parse(text).unwrap()
    }

    fn attached(store: &InMemoryStore) -> IdentityCache {
        let mut cache = IdentityCache::new();
        initialize_tree(store, &mut cache).unwrap();
        cache
    }

    #[test]
    fn appearance_creates_one_wrapper() {
        let store = InMemoryStore::new("demo");
        let mut cache = attached(&store);
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();

        let created = on_object_appeared(&store, &mut cache, StoreClass::MolChain, chain).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(cache.get(created[0]).unwrap().pid, pid("MC:A"));
    }

    #[test]
    fn repeated_appearance_is_noop() {
        let store = InMemoryStore::new("demo");
        let mut cache = attached(&store);
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();

        on_object_appeared(&store, &mut cache, StoreClass::MolChain, chain).unwrap();
        let again = on_object_appeared(&store, &mut cache, StoreClass::MolChain, chain).unwrap();
        assert!(again.is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn appearance_wraps_missing_ancestors_first() {
        let store = InMemoryStore::new("demo");
        let mut cache = attached(&store);
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();
        let res = store.create(chain, StoreClass::MolResidue, ["1", "ALA"]).unwrap();

        let created = on_object_appeared(&store, &mut cache, StoreClass::MolResidue, res).unwrap();
        let pids: Vec<String> = created
            .iter()
            .map(|id| cache.get(*id).unwrap().pid.render())
            .collect();
        assert_eq!(pids, vec!["MC:A", "MR:A.1.ALA"]);
    }

    #[test]
    fn appearance_rejects_mismatched_class() {
        let store = InMemoryStore::new("demo");
        let mut cache = attached(&store);
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();

        let err = on_object_appeared(&store, &mut cache, StoreClass::Note, chain).unwrap_err();
        assert!(matches!(
            err,
            WrapError::ClassMismatch {
                notified: StoreClass::Note,
                actual: StoreClass::MolChain,
                ..
            }
        ));
        assert!(cache.lookup_by_handle(chain).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn vanish_requires_deleted_handle() {
        let store = InMemoryStore::new("demo");
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();
        let mut cache = attached(&store);

        let err = on_object_about_to_vanish(&store, &mut cache, chain).unwrap_err();
        assert!(matches!(err, WrapError::PrematureEviction { .. }));
        assert!(cache.lookup_by_handle(chain).is_some());
    }

    #[test]
    fn vanish_evicts_and_tolerates_unknown() {
        let store = InMemoryStore::new("demo");
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();
        let mut cache = attached(&store);
        store.delete(chain).unwrap();

        let evicted = on_object_about_to_vanish(&store, &mut cache, chain).unwrap();
        assert_eq!(evicted.len(), 1);
        let again = on_object_about_to_vanish(&store, &mut cache, chain).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn rename_rekeys_subtree() {
        let store = InMemoryStore::new("demo");
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();
        let res = store.create(chain, StoreClass::MolResidue, ["1", "ALA"]).unwrap();
        store.create(res, StoreClass::MolAtom, ["CA"]).unwrap();
        let mut cache = attached(&store);

        store.rename(chain, ["B"]).unwrap();
        let changes = on_object_renamed(&store, &mut cache, chain).unwrap();
        assert_eq!(changes.len(), 3);
        assert!(cache.lookup_by_pid(&pid("MA:B.1.ALA.CA")).is_some());
        assert!(cache.lookup_by_pid(&pid("MR:A.1.ALA")).is_none());
    }

    #[test]
    fn rename_without_key_change_reports_nothing() {
        let store = InMemoryStore::new("demo");
        let chain = store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();
        let mut cache = attached(&store);
        assert!(on_object_renamed(&store, &mut cache, chain).unwrap().is_empty());
    }

    #[test]
    fn project_rename_only_rekeys_project() {
        let store = InMemoryStore::new("demo");
        store.create(store.root(), StoreClass::MolChain, ["A"]).unwrap();
        let mut cache = attached(&store);

        store.rename(store.root(), ["renamed"]).unwrap();
        let changes = on_object_renamed(&store, &mut cache, store.root()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_pid, pid("PR:renamed"));
        assert!(cache.lookup_by_pid(&pid("MC:A")).is_some());
    }
}
