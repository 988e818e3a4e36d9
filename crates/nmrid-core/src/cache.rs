//! The identity cache: the one-to-one map between store handles and wrappers.
//!
//! The cache holds one [`WrapperRecord`] per live wrapper and three indexes
//! over it (handle, pid, parent). All of them change together inside a single
//! `&mut self` call, so outside observers never see them disagree.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use nmrid_store::DataStore;
use nmrid_types::{ClassKind, Handle, Pid};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WrapError, WrapResult};

/// Arena index of a wrapper within one project. Never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WrapperId(u64);

impl WrapperId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for WrapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrapperId({})", self.0)
    }
}

/// Everything the cache knows about one wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrapperRecord {
    pub handle: Handle,
    pub kind: ClassKind,
    pub pid: Pid,
    pub parent: Option<WrapperId>,
}

/// Handle and pid indexes over the live wrappers of one project.
#[derive(Default)]
pub struct IdentityCache {
    records: BTreeMap<WrapperId, WrapperRecord>,
    by_handle: HashMap<Handle, WrapperId>,
    by_pid: HashMap<Pid, WrapperId>,
    children: HashMap<WrapperId, Vec<WrapperId>>,
    next_id: u64,
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field("wrappers", &self.records.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live wrappers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: WrapperId) -> Option<&WrapperRecord> {
        self.records.get(&id)
    }

    pub fn lookup_by_handle(&self, handle: Handle) -> Option<WrapperId> {
        self.by_handle.get(&handle).copied()
    }

    pub fn lookup_by_pid(&self, pid: &Pid) -> Option<WrapperId> {
        self.by_pid.get(pid).copied()
    }

    /// Cached children of `id`, in insertion order.
    pub fn children_of(&self, id: WrapperId) -> &[WrapperId] {
        self.children.get(&id).map_or(&[][..], Vec::as_slice)
    }

    /// All records, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (WrapperId, &WrapperRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Raw handle index entries, for consistency checks.
    pub fn handle_entries(&self) -> impl Iterator<Item = (Handle, WrapperId)> + '_ {
        self.by_handle.iter().map(|(h, id)| (*h, *id))
    }

    /// Raw pid index entries, for consistency checks.
    pub fn pid_entries(&self) -> impl Iterator<Item = (&Pid, WrapperId)> {
        self.by_pid.iter().map(|(pid, id)| (pid, *id))
    }

    /// `id` followed by all its cached descendants, depth first.
    pub fn subtree(&self, id: WrapperId) -> Vec<WrapperId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children_of(current).iter().rev());
        }
        out
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Add a wrapper. The handle must not be wrapped yet and the pid must
    /// be free; on error the cache is unchanged.
    pub fn insert(
        &mut self,
        handle: Handle,
        kind: ClassKind,
        pid: Pid,
        parent: Option<WrapperId>,
    ) -> WrapResult<WrapperId> {
        if self.by_handle.contains_key(&handle) {
            return Err(WrapError::DuplicateWrapper { handle });
        }
        if self.by_pid.contains_key(&pid) {
            return Err(WrapError::PidCollision { pid });
        }

        let id = WrapperId(self.next_id);
        self.next_id += 1;

        debug!(%handle, %pid, "wrapper cached");
        self.by_handle.insert(handle, id);
        self.by_pid.insert(pid.clone(), id);
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(id);
        }
        self.records.insert(
            id,
            WrapperRecord {
                handle,
                kind,
                pid,
                parent,
            },
        );
        Ok(id)
    }

    /// Remove the wrapper for `handle` and any cached descendants.
    ///
    /// Every removed handle must already report itself deleted in the store;
    /// otherwise nothing is removed and `PrematureEviction` is returned.
    /// Returns the removed records, descendants before ancestors. A handle
    /// that is not cached yields an empty list.
    pub fn evict(
        &mut self,
        store: &dyn DataStore,
        handle: Handle,
    ) -> WrapResult<Vec<(WrapperId, WrapperRecord)>> {
        let Some(id) = self.lookup_by_handle(handle) else {
            return Ok(Vec::new());
        };

        let doomed = self.subtree(id);
        for member in &doomed {
            if let Some(record) = self.records.get(member) {
                if !store.is_deleted(record.handle)? {
                    return Err(WrapError::PrematureEviction {
                        handle: record.handle,
                    });
                }
            }
        }

        if let Some(parent) = self.records.get(&id).and_then(|r| r.parent) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|child| *child != id);
            }
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for member in doomed.into_iter().rev() {
            self.children.remove(&member);
            if let Some(record) = self.records.remove(&member) {
                self.by_handle.remove(&record.handle);
                self.by_pid.remove(&record.pid);
                debug!(handle = %record.handle, pid = %record.pid, "wrapper evicted");
                removed.push((member, record));
            }
        }
        Ok(removed)
    }

    /// Replace the pids of several wrappers at once.
    ///
    /// New pids may reuse pids released by the same batch. If any new pid is
    /// held by a wrapper outside the batch, nothing changes.
    pub fn reindex(&mut self, updates: &[(WrapperId, Pid)]) -> WrapResult<()> {
        for (id, pid) in updates {
            if let Some(holder) = self.by_pid.get(pid) {
                if holder != id && !updates.iter().any(|(other, _)| other == holder) {
                    return Err(WrapError::PidCollision { pid: pid.clone() });
                }
            }
        }

        for (id, _) in updates {
            if let Some(record) = self.records.get(id) {
                self.by_pid.remove(&record.pid);
            }
        }
        for (id, pid) in updates {
            if let Some(record) = self.records.get_mut(id) {
                debug!(old = %record.pid, new = %pid, "wrapper reindexed");
                record.pid = pid.clone();
                self.by_pid.insert(pid.clone(), *id);
            }
        }
        Ok(())
    }

    /// Drop every wrapper. Used on detach.
    pub fn clear(&mut self) {
        self.records.clear();
        self.by_handle.clear();
        self.by_pid.clear();
        self.children.clear();
    }

    /// Remove a record but leave the indexes pointing at it.
    #[cfg(test)]
    pub(crate) fn remove_record_only(&mut self, id: WrapperId) {
        self.records.remove(&id);
    }
}
