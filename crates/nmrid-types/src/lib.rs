//! Foundation types for nmrid.
//!
//! This crate provides the identity and structural types shared by every
//! other nmrid crate: opaque store handles, the closed set of wrapper classes,
//! and the persistent identifiers (Pids) used to address wrapped objects from
//! scripts and the GUI.
//!
//! # Key Types
//!
//! - [`Handle`] — Opaque reference to an object inside the external data store
//! - [`ClassKind`] — The closed set of wrapper classes and their type tags
//! - [`Pid`] — Type tag plus ordered key parts, rendered as `TAG:part1.part2`
//! - [`PidError`] — Malformed Pid text or invalid key parts

pub mod class;
pub mod error;
pub mod handle;
pub mod pid;

pub use class::ClassKind;
pub use error::PidError;
pub use handle::Handle;
pub use pid::{Pid, ALT_SEPARATOR, ID_SEPARATOR, PREFIX_SEPARATOR};
