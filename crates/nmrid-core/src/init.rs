//! One-shot population of the identity cache for a freshly attached store.

use std::collections::VecDeque;

use nmrid_store::DataStore;
use nmrid_types::{ClassKind, Handle, Pid};
use tracing::debug;

use crate::cache::{IdentityCache, WrapperId};
use crate::descriptor::{self, ClassDescriptor};
use crate::error::WrapResult;

/// Counts from one tree walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitStats {
    /// Wrappers created by this walk.
    pub created: usize,
    /// Handles that were already wrapped.
    pub existing: usize,
}

/// Wrap the store root, if needed, and return its wrapper id.
pub fn ensure_root(store: &dyn DataStore, cache: &mut IdentityCache) -> WrapResult<(WrapperId, bool)> {
    let root = store.root();
    if let Some(id) = cache.lookup_by_handle(root) {
        return Ok((id, false));
    }
    let desc = descriptor::descriptor(ClassKind::Project);
    let pid = desc.derive_pid(store, None, root)?;
    Ok((cache.insert(root, ClassKind::Project, pid, None)?, true))
}

/// Walk the store breadth-first from the root and wrap every handle of a
/// wrapped class that is not cached yet.
///
/// Already wrapped handles are descended into, not re-created, so running
/// the walk twice is harmless. A class is only enumerated beneath a parent
/// handle that is already wrapped.
pub fn initialize_tree(store: &dyn DataStore, cache: &mut IdentityCache) -> WrapResult<InitStats> {
    let mut stats = InitStats::default();
    let (root_id, created) = ensure_root(store, cache)?;
    if created {
        stats.created += 1;
    } else {
        stats.existing += 1;
    }

    let mut queue: VecDeque<WrapperId> = VecDeque::from([root_id]);
    while let Some(parent_id) = queue.pop_front() {
        let Some(parent) = cache.get(parent_id).cloned() else {
            continue;
        };
        let parent_desc = descriptor::descriptor(parent.kind);
        for child_desc in parent_desc.child_descriptors() {
            for handle in child_desc.enumerate_children(store, parent.handle)? {
                let id = match cache.lookup_by_handle(handle) {
                    Some(id) => {
                        stats.existing += 1;
                        id
                    }
                    None => {
                        stats.created += 1;
                        wrap_child(store, cache, child_desc, handle, parent_id, &parent.pid)?
                    }
                };
                queue.push_back(id);
            }
        }
    }

    debug!(created = stats.created, existing = stats.existing, "tree walk finished");
    Ok(stats)
}

fn wrap_child(
    store: &dyn DataStore,
    cache: &mut IdentityCache,
    desc: &ClassDescriptor,
    handle: Handle,
    parent_id: WrapperId,
    parent_pid: &Pid,
) -> WrapResult<WrapperId> {
    let pid = desc.derive_pid(store, Some(parent_pid), handle)?;
    cache.insert(handle, desc.kind, pid, Some(parent_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmrid_store::{InMemoryStore, StoreClass};

    fn populated_store() -> InMemoryStore {
        let store = InMemoryStore::new("demo");
        let root = store.root();
        let chain = store.create(root, StoreClass::MolChain, ["A"]).unwrap();
        let res = store.create(chain, StoreClass::MolResidue, ["1", "ALA"]).unwrap();
        store.create(res, StoreClass::MolAtom, ["CA"]).unwrap();
        let sp = store.create(root, StoreClass::DataSource, ["hsqc"]).unwrap();
        let pl = store.create(sp, StoreClass::PeakList, ["1"]).unwrap();
        store.create(pl, StoreClass::Peak, ["7"]).unwrap();
        store.create(root, StoreClass::Note, ["todo"]).unwrap();
        store
    }

    #[test]
    fn wraps_every_existing_handle() {
        let store = populated_store();
        let mut cache = IdentityCache::new();
        let stats = initialize_tree(&store, &mut cache).unwrap();

        assert_eq!(stats.created, store.len());
        assert_eq!(cache.len(), store.len());
        for text in ["PR:demo", "MC:A", "MR:A.1.ALA", "MA:A.1.ALA.CA", "SP:hsqc", "PL:hsqc.1", "PK:hsqc.1.7", "NO:todo"] {
            assert!(cache.lookup_by_pid(&Pid::parse(text).unwrap()).is_some(), "{text}");
        }
    }

    #[test]
    fn parents_are_wrapped_before_children() {
        let store = populated_store();
        let mut cache = IdentityCache::new();
        initialize_tree(&store, &mut cache).unwrap();
        for (id, record) in cache.iter() {
            if let Some(parent) = record.parent {
                assert!(parent < id);
            }
        }
    }

    #[test]
    fn second_walk_only_looks_up() {
        let store = populated_store();
        let mut cache = IdentityCache::new();
        initialize_tree(&store, &mut cache).unwrap();
        let stats = initialize_tree(&store, &mut cache).unwrap();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.existing, store.len());
    }

    #[test]
    fn picks_up_handles_added_under_wrapped_parents() {
        let store = populated_store();
        let mut cache = IdentityCache::new();
        initialize_tree(&store, &mut cache).unwrap();

        let chain = store.children(store.root(), StoreClass::MolChain).unwrap()[0];
        store.create(chain, StoreClass::MolResidue, ["2", "GLY"]).unwrap();
        let stats = initialize_tree(&store, &mut cache).unwrap();
        assert_eq!(stats.created, 1);
        assert!(cache.lookup_by_pid(&Pid::parse("MR:A.2.GLY").unwrap()).is_some());
    }

    #[test]
    fn empty_store_wraps_only_root() {
        let store = InMemoryStore::new("empty");
        let mut cache = IdentityCache::new();
        let stats = initialize_tree(&store, &mut cache).unwrap();
        assert_eq!(stats, InitStats { created: 1, existing: 0 });
        let (root_id, created) = ensure_root(&store, &mut cache).unwrap();
        assert!(!created);
        assert_eq!(cache.get(root_id).unwrap().pid.render(), "PR:empty");
    }
}
