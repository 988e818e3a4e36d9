//! The data store underneath nmrid.
//!
//! The store is a mutable object graph that owns the real data. nmrid never
//! owns store objects; it only holds [`Handle`]s to them and listens to the
//! store's native notifications to keep its wrappers in sync.
//!
//! # Interface
//!
//! All backends implement the [`DataStore`] trait, which is exactly the
//! surface nmrid consumes: handle queries (`is_deleted`, `parent`, `key`,
//! `children`) and the native notification primitive
//! (`register_notify` / `unregister_notify`).
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- `HashMap`-based store for tests and the console
//!
//! # Notification Rules
//!
//! 1. Notifications are delivered synchronously, inside the mutating call.
//! 2. A create notification fires after the object is live.
//! 3. A delete notification fires after the object (and, for a cascading
//!    delete, its whole subtree) already reports `is_deleted`.
//! 4. Registering the same (callback, class, event) triple twice delivers once.
//! 5. Unregistering an unknown triple is a no-op.
//! 6. A failing callback aborts delivery and fails the mutating call.

pub mod class;
pub mod error;
pub mod memory;
pub mod traits;

pub use class::{Notification, NotifyError, NotifyFn, NotifyKey, NotifyResult, StoreClass, StoreEvent};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use traits::DataStore;

pub use nmrid_types::Handle;
