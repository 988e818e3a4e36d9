use nmrid_types::Handle;

use crate::class::{NotifyFn, StoreClass, StoreEvent};
use crate::error::StoreResult;

/// The store surface consumed by the wrapper layer.
///
/// All implementations must satisfy these invariants:
/// - Handles are never reused; a deleted handle keeps answering queries
///   (`is_deleted` returns `true`).
/// - `children` lists only live objects, in a reproducible order (creation
///   order for the in-memory store).
/// - Notifiers are invoked synchronously inside the mutating call, and the
///   store holds no internal borrow while invoking them, so a notifier may
///   query the store or mutate it again.
/// - Key parts never contain `^`, which Pids reserve to stand in for `.`.
/// - `register_notify` is idempotent per (callback, class, event) triple;
///   `unregister_notify` on an unknown triple is a no-op.
pub trait DataStore {
    /// The root object (the store's project record).
    fn root(&self) -> Handle;

    /// Class of the object behind `handle`.
    fn class_of(&self, handle: Handle) -> StoreResult<StoreClass>;

    /// Whether the object behind `handle` has been deleted.
    fn is_deleted(&self, handle: Handle) -> StoreResult<bool>;

    /// Containing object, `None` for the root.
    fn parent(&self, handle: Handle) -> StoreResult<Option<Handle>>;

    /// Current key attributes of the object (name, serial, ...).
    fn key(&self, handle: Handle) -> StoreResult<Vec<String>>;

    /// Live children of `parent` that belong to `class`.
    fn children(&self, parent: Handle, class: StoreClass) -> StoreResult<Vec<Handle>>;

    /// Subscribe `callback` to `event` on objects of `class`.
    fn register_notify(&self, callback: NotifyFn, class: StoreClass, event: StoreEvent);

    /// Remove a subscription made with [`register_notify`](Self::register_notify).
    fn unregister_notify(&self, callback: &NotifyFn, class: StoreClass, event: StoreEvent);

    /// Name of the store, taken from the root's first key part.
    fn name(&self) -> StoreResult<String> {
        Ok(self.key(self.root())?.into_iter().next().unwrap_or_default())
    }
}
