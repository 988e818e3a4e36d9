use std::collections::VecDeque;

use nmrid_store::DataStore;
use nmrid_types::{ClassKind, Handle};
use serde::Serialize;

use crate::cache::IdentityCache;
use crate::descriptor;
use crate::error::WrapResult;

/// Result of a consistency check between the cache and the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub wrapper_count: usize,
    pub store_count: usize,
    pub violations: Vec<Violation>,
}

impl VerifyReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific inconsistency detected during verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Store object involved, `None` when the entry has no record to name one.
    pub handle: Option<Handle>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    /// The handle and pid indexes disagree with the records.
    IndexMismatch,
    /// A cached handle has been deleted in the store.
    DeadHandle,
    /// A cached pid differs from the pid derived from current store keys.
    StalePid,
    /// A live store object of a wrapped class has no wrapper.
    MissingWrapper,
}

/// Check the cache against the store. Never mutates either.
pub fn verify(store: &dyn DataStore, cache: &IdentityCache) -> WrapResult<VerifyReport> {
    let mut violations = Vec::new();

    for (handle, id) in cache.handle_entries() {
        if cache.get(id).map(|r| r.handle) != Some(handle) {
            violations.push(Violation {
                handle: Some(handle),
                kind: ViolationKind::IndexMismatch,
                description: format!("handle index points {handle} at a foreign record"),
            });
        }
    }
    for (pid, id) in cache.pid_entries() {
        match cache.get(id) {
            Some(record) if record.pid == *pid => {}
            Some(record) => violations.push(Violation {
                handle: Some(record.handle),
                kind: ViolationKind::IndexMismatch,
                description: format!("pid index holds {pid}, record holds {}", record.pid),
            }),
            None => violations.push(Violation {
                handle: None,
                kind: ViolationKind::IndexMismatch,
                description: format!("pid index entry {pid} has no record"),
            }),
        }
    }

    for (id, record) in cache.iter() {
        if cache.lookup_by_handle(record.handle) != Some(id) || cache.lookup_by_pid(&record.pid) != Some(id) {
            violations.push(Violation {
                handle: Some(record.handle),
                kind: ViolationKind::IndexMismatch,
                description: format!("{} is missing from an index", record.pid),
            });
        }
        if store.is_deleted(record.handle)? {
            violations.push(Violation {
                handle: Some(record.handle),
                kind: ViolationKind::DeadHandle,
                description: format!("{} wraps a deleted object", record.pid),
            });
            continue;
        }
        let parent_pid = record.parent.and_then(|p| cache.get(p)).map(|r| r.pid.clone());
        let fresh = descriptor::descriptor(record.kind).derive_pid(store, parent_pid.as_ref(), record.handle)?;
        if fresh != record.pid {
            violations.push(Violation {
                handle: Some(record.handle),
                kind: ViolationKind::StalePid,
                description: format!("cached {} but store keys give {fresh}", record.pid),
            });
        }
    }

    let mut store_count = 0;
    let mut queue = VecDeque::from([(store.root(), ClassKind::Project)]);
    while let Some((handle, kind)) = queue.pop_front() {
        store_count += 1;
        if cache.lookup_by_handle(handle).is_none() {
            violations.push(Violation {
                handle: Some(handle),
                kind: ViolationKind::MissingWrapper,
                description: format!("live {kind} object {handle} is not wrapped"),
            });
        }
        for child in descriptor::descriptor(kind).child_descriptors() {
            for child_handle in child.enumerate_children(store, handle)? {
                queue.push_back((child_handle, child.kind));
            }
        }
    }

    Ok(VerifyReport {
        wrapper_count: cache.len(),
        store_count,
        violations,
    })
}
