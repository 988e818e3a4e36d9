use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use nmrid_types::{Handle, ALT_SEPARATOR};
use tracing::debug;

use crate::class::{Notification, NotifyFn, NotifyKey, StoreClass, StoreEvent};
use crate::error::{StoreError, StoreResult};
use crate::traits::DataStore;

#[derive(Clone, Debug)]
struct Record {
    class: StoreClass,
    parent: Option<Handle>,
    key: Vec<String>,
    deleted: bool,
    children: Vec<Handle>,
}

#[derive(Debug)]
struct Objects {
    records: HashMap<Handle, Record>,
    root: Handle,
    next: u64,
}

impl Objects {
    fn get(&self, handle: Handle) -> StoreResult<&Record> {
        self.records.get(&handle).ok_or(StoreError::NotFound(handle))
    }

    fn live(&self, handle: Handle) -> StoreResult<&Record> {
        let record = self.get(handle)?;
        if record.deleted {
            return Err(StoreError::Deleted(handle));
        }
        Ok(record)
    }

    /// `handle` and every live descendant, children before parents.
    fn subtree_post_order(&self, handle: Handle, out: &mut Vec<Handle>) {
        if let Some(record) = self.records.get(&handle) {
            for child in &record.children {
                if self.records.get(child).is_some_and(|r| !r.deleted) {
                    self.subtree_post_order(*child, out);
                }
            }
        }
        out.push(handle);
    }

    fn check_unique_key(
        &self,
        parent: Handle,
        class: StoreClass,
        key: &[String],
        except: Option<Handle>,
    ) -> StoreResult<()> {
        let parent_record = self.get(parent)?;
        let clash = parent_record.children.iter().any(|child| {
            Some(*child) != except
                && self
                    .records
                    .get(child)
                    .is_some_and(|r| !r.deleted && r.class == class && r.key == key)
        });
        if clash {
            return Err(StoreError::DuplicateKey {
                class,
                parent,
                key: key.to_vec(),
            });
        }
        Ok(())
    }
}

/// Reject key parts that could not be rendered into a Pid.
fn check_key_parts(key: &[String]) -> StoreResult<()> {
    match key.iter().find(|part| part.contains(ALT_SEPARATOR)) {
        Some(part) => Err(StoreError::ReservedCharacter {
            part: part.clone(),
            reserved: ALT_SEPARATOR,
        }),
        None => Ok(()),
    }
}

/// In-memory object graph with a native notifier registry.
///
/// Intended for tests and the console. State lives behind `RefCell`s; every
/// mutation releases its borrow before delivering notifications, so notifiers
/// may freely query or mutate the store again.
pub struct InMemoryStore {
    objects: RefCell<Objects>,
    notifiers: RefCell<BTreeMap<NotifyKey, Vec<NotifyFn>>>,
}

impl InMemoryStore {
    /// Create a store whose root project record is named `name`.
    pub fn new(name: &str) -> Self {
        let root = Handle::from_raw(1);
        let mut records = HashMap::new();
        records.insert(
            root,
            Record {
                class: StoreClass::NmrProject,
                parent: None,
                key: vec![name.to_string()],
                deleted: false,
                children: Vec::new(),
            },
        );
        Self {
            objects: RefCell::new(Objects {
                records,
                root,
                next: 2,
            }),
            notifiers: RefCell::new(BTreeMap::new()),
        }
    }

    /// Number of live objects, including the root.
    pub fn len(&self) -> usize {
        self.objects
            .borrow()
            .records
            .values()
            .filter(|r| !r.deleted)
            .count()
    }

    /// Returns `true` if only the root is live.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Create an object of `class` under `parent` and fire its create event.
    pub fn create<I, S>(&self, parent: Handle, class: StoreClass, key: I) -> StoreResult<Handle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key: Vec<String> = key.into_iter().map(Into::into).collect();
        check_key_parts(&key)?;
        let handle = {
            let mut objects = self.objects.borrow_mut();
            let parent_class = objects.live(parent)?.class;
            if class.parent_class() != Some(parent_class) {
                return Err(StoreError::InvalidParent {
                    class,
                    parent_class,
                });
            }
            objects.check_unique_key(parent, class, &key, None)?;

            let handle = Handle::from_raw(objects.next);
            objects.next += 1;
            objects.records.insert(
                handle,
                Record {
                    class,
                    parent: Some(parent),
                    key,
                    deleted: false,
                    children: Vec::new(),
                },
            );
            if let Some(parent_record) = objects.records.get_mut(&parent) {
                parent_record.children.push(handle);
            }
            handle
        };

        debug!(%handle, %class, "created store object");
        self.fire(class, StoreEvent::Create, handle)?;
        Ok(handle)
    }

    /// Delete an object and everything it contains.
    ///
    /// The whole subtree is marked deleted first; delete events then fire
    /// children before parents.
    pub fn delete(&self, handle: Handle) -> StoreResult<()> {
        let doomed: Vec<(Handle, StoreClass)> = {
            let mut objects = self.objects.borrow_mut();
            objects.live(handle)?;
            if handle == objects.root {
                return Err(StoreError::RootImmutable(handle));
            }
            let mut order = Vec::new();
            objects.subtree_post_order(handle, &mut order);
            order
                .into_iter()
                .filter_map(|h| {
                    let record = objects.records.get_mut(&h)?;
                    record.deleted = true;
                    Some((h, record.class))
                })
                .collect()
        };

        debug!(%handle, count = doomed.len(), "deleted store subtree");
        for (h, class) in doomed {
            self.fire(class, StoreEvent::Delete, h)?;
        }
        Ok(())
    }

    /// Replace the key attributes of an object and fire its rename event.
    pub fn rename<I, S>(&self, handle: Handle, key: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key: Vec<String> = key.into_iter().map(Into::into).collect();
        check_key_parts(&key)?;
        let class = {
            let mut objects = self.objects.borrow_mut();
            let record = objects.live(handle)?;
            let class = record.class;
            if let Some(parent) = record.parent {
                objects.check_unique_key(parent, class, &key, Some(handle))?;
            }
            if let Some(record) = objects.records.get_mut(&handle) {
                record.key = key;
            }
            class
        };

        debug!(%handle, %class, "renamed store object");
        self.fire(class, StoreEvent::Rename, handle)
    }

    // ---------------------------------------------------------------
    // Notifier introspection
    // ---------------------------------------------------------------

    /// Number of callbacks registered for `key`.
    pub fn notifier_count(&self, key: NotifyKey) -> usize {
        self.notifiers.borrow().get(&key).map_or(0, Vec::len)
    }

    /// Total number of registered callbacks across all keys.
    pub fn total_notifiers(&self) -> usize {
        self.notifiers.borrow().values().map(Vec::len).sum()
    }

    /// Whether exactly this callback is registered for `key`.
    pub fn is_registered(&self, callback: &NotifyFn, key: NotifyKey) -> bool {
        self.notifiers
            .borrow()
            .get(&key)
            .is_some_and(|cbs| cbs.iter().any(|cb| Rc::ptr_eq(cb, callback)))
    }

    /// Deliver an event to every callback registered for it.
    ///
    /// The callback list is cloned first so callbacks may (un)register
    /// notifiers or mutate the store while delivery is in progress.
    fn fire(&self, class: StoreClass, event: StoreEvent, handle: Handle) -> StoreResult<()> {
        let callbacks = self
            .notifiers
            .borrow()
            .get(&NotifyKey::new(class, event))
            .cloned()
            .unwrap_or_default();
        let notification = Notification {
            class,
            event,
            handle,
        };
        for callback in callbacks {
            callback(&notification).map_err(|source| StoreError::Notifier {
                class,
                event,
                handle,
                source,
            })?;
        }
        Ok(())
    }
}

impl DataStore for InMemoryStore {
    fn root(&self) -> Handle {
        self.objects.borrow().root
    }

    fn class_of(&self, handle: Handle) -> StoreResult<StoreClass> {
        Ok(self.objects.borrow().get(handle)?.class)
    }

    fn is_deleted(&self, handle: Handle) -> StoreResult<bool> {
        Ok(self.objects.borrow().get(handle)?.deleted)
    }

    fn parent(&self, handle: Handle) -> StoreResult<Option<Handle>> {
        Ok(self.objects.borrow().get(handle)?.parent)
    }

    fn key(&self, handle: Handle) -> StoreResult<Vec<String>> {
        Ok(self.objects.borrow().get(handle)?.key.clone())
    }

    fn children(&self, parent: Handle, class: StoreClass) -> StoreResult<Vec<Handle>> {
        let objects = self.objects.borrow();
        let record = objects.get(parent)?;
        Ok(record
            .children
            .iter()
            .copied()
            .filter(|child| {
                objects
                    .records
                    .get(child)
                    .is_some_and(|r| !r.deleted && r.class == class)
            })
            .collect())
    }

    fn register_notify(&self, callback: NotifyFn, class: StoreClass, event: StoreEvent) {
        let mut notifiers = self.notifiers.borrow_mut();
        let entry = notifiers.entry(NotifyKey::new(class, event)).or_default();
        if !entry.iter().any(|cb| Rc::ptr_eq(cb, &callback)) {
            entry.push(callback);
        }
    }

    fn unregister_notify(&self, callback: &NotifyFn, class: StoreClass, event: StoreEvent) {
        let key = NotifyKey::new(class, event);
        let mut notifiers = self.notifiers.borrow_mut();
        if let Some(entry) = notifiers.get_mut(&key) {
            entry.retain(|cb| !Rc::ptr_eq(cb, callback));
            if entry.is_empty() {
                notifiers.remove(&key);
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("default")
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("live_objects", &self.len())
            .field("notifiers", &self.total_notifiers())
            .finish()
    }
}
