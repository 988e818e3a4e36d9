//! Identity layer over an nmrid data store.
//!
//! A [`Project`] attaches to a [`DataStore`](nmrid_store::DataStore) and
//! keeps one [`Wrapper`] per store object of a wrapped class, addressable by
//! handle and by [`Pid`](nmrid_types::Pid). The mapping follows store
//! mutations through the store's native notifiers:
//!
//! 1. Attach subscribes once per (store class, event) pair watched anywhere
//!    in the class hierarchy ([`descriptor`]), then walks the existing tree
//!    breadth-first ([`init`]).
//! 2. Every create, delete or rename in the store calls one lifecycle hook
//!    ([`hooks`]) that updates the [`IdentityCache`] before the store call
//!    returns.
//! 3. Listeners registered on the project run after the cache is updated and
//!    may mutate the store again.
//! 4. Detach, or dropping the last project handle, removes every
//!    subscription.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod init;
pub mod listener;
pub mod notifier;
pub mod project;
pub mod verify;
pub mod wrapper;

pub use cache::{IdentityCache, WrapperId, WrapperRecord};
pub use config::ProjectConfig;
pub use descriptor::ClassDescriptor;
pub use error::{WrapError, WrapResult};
pub use init::InitStats;
pub use listener::{Action, ListenerId, WrapperEvent};
pub use notifier::NotifierRegistry;
pub use project::Project;
pub use verify::{VerifyReport, Violation, ViolationKind};
pub use wrapper::Wrapper;

pub use nmrid_types::{ClassKind, Handle, Pid, PidError};
