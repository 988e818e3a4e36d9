//! Store object classes, events, and the native notifier types.

use std::fmt;
use std::rc::Rc;

use nmrid_types::Handle;
use serde::{Deserialize, Serialize};

/// Classes of objects held by the store.
///
/// These are the store's own classes, not wrapper classes; the mapping
/// between the two lives in the wrapper layer's class descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreClass {
    NmrProject,
    MolChain,
    MolResidue,
    MolAtom,
    RefSubstance,
    Sample,
    SampleComponent,
    DataSource,
    PeakList,
    Peak,
    IntegralList,
    Integral,
    Note,
}

impl StoreClass {
    /// The class an object of this class must be created under.
    pub const fn parent_class(self) -> Option<StoreClass> {
        match self {
            Self::NmrProject => None,
            Self::MolChain | Self::RefSubstance | Self::Sample | Self::DataSource | Self::Note => {
                Some(Self::NmrProject)
            }
            Self::MolResidue => Some(Self::MolChain),
            Self::MolAtom => Some(Self::MolResidue),
            Self::SampleComponent => Some(Self::Sample),
            Self::PeakList | Self::IntegralList => Some(Self::DataSource),
            Self::Peak => Some(Self::PeakList),
            Self::Integral => Some(Self::IntegralList),
        }
    }

    /// Qualified class name as the store reports it.
    pub const fn qualified_name(self) -> &'static str {
        match self {
            Self::NmrProject => "Nmr.NmrProject",
            Self::MolChain => "MolSystem.Chain",
            Self::MolResidue => "MolSystem.Residue",
            Self::MolAtom => "MolSystem.Atom",
            Self::RefSubstance => "RefSample.Substance",
            Self::Sample => "Sample.Sample",
            Self::SampleComponent => "Sample.SampleComponent",
            Self::DataSource => "Nmr.DataSource",
            Self::PeakList => "Nmr.PeakList",
            Self::Peak => "Nmr.Peak",
            Self::IntegralList => "Nmr.IntegralList",
            Self::Integral => "Nmr.Integral",
            Self::Note => "Nmr.Note",
        }
    }
}

impl fmt::Display for StoreClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}

/// Store events a notifier can be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreEvent {
    /// Fired after an object is created and live.
    Create,
    /// Fired after an object has been marked deleted.
    Delete,
    /// Fired after an object's key attributes changed.
    Rename,
}

impl fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Rename => "rename",
        };
        f.write_str(s)
    }
}

/// Key of a native subscription: one store class and one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotifyKey {
    pub class: StoreClass,
    pub event: StoreEvent,
}

impl NotifyKey {
    pub const fn new(class: StoreClass, event: StoreEvent) -> Self {
        Self { class, event }
    }
}

impl fmt::Display for NotifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.event)
    }
}

/// What a notifier receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notification {
    pub class: StoreClass,
    pub event: StoreEvent,
    pub handle: Handle,
}

/// Error type a notifier may return.
pub type NotifyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by a notifier.
pub type NotifyResult = Result<(), NotifyError>;

/// A native notifier callback. Identity (for unregistering) is pointer
/// identity of the `Rc`.
pub type NotifyFn = Rc<dyn Fn(&Notification) -> NotifyResult>;
