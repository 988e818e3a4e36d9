//! Static per-class metadata driving the generic wrapper machinery.
//!
//! One [`ClassDescriptor`] exists for every [`ClassKind`]. It ties the
//! wrapper class to the store class it wraps, lists the child classes, and
//! answers the two questions the generic code asks: which store handles are
//! children of this parent, and which store events must be watched.

use std::collections::VecDeque;

use nmrid_store::{DataStore, NotifyKey, StoreClass, StoreEvent};
use nmrid_types::{ClassKind, Handle, Pid};

use crate::error::{WrapError, WrapResult};

/// Metadata for one wrapper class.
#[derive(Debug, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub kind: ClassKind,
    pub store_class: StoreClass,
    pub children: &'static [ClassKind],
    /// Name of the link from the parent to objects of this class.
    pub plural_name: Option<&'static str>,
}

static DESCRIPTORS: [ClassDescriptor; 13] = [
    ClassDescriptor {
        kind: ClassKind::Project,
        store_class: StoreClass::NmrProject,
        children: &[
            ClassKind::Chain,
            ClassKind::Substance,
            ClassKind::Sample,
            ClassKind::Spectrum,
            ClassKind::Note,
        ],
        plural_name: None,
    },
    ClassDescriptor {
        kind: ClassKind::Chain,
        store_class: StoreClass::MolChain,
        children: &[ClassKind::Residue],
        plural_name: Some("chains"),
    },
    ClassDescriptor {
        kind: ClassKind::Residue,
        store_class: StoreClass::MolResidue,
        children: &[ClassKind::Atom],
        plural_name: Some("residues"),
    },
    ClassDescriptor {
        kind: ClassKind::Atom,
        store_class: StoreClass::MolAtom,
        children: &[],
        plural_name: Some("atoms"),
    },
    ClassDescriptor {
        kind: ClassKind::Substance,
        store_class: StoreClass::RefSubstance,
        children: &[],
        plural_name: Some("substances"),
    },
    ClassDescriptor {
        kind: ClassKind::Sample,
        store_class: StoreClass::Sample,
        children: &[ClassKind::SampleComponent],
        plural_name: Some("samples"),
    },
    ClassDescriptor {
        kind: ClassKind::SampleComponent,
        store_class: StoreClass::SampleComponent,
        children: &[],
        plural_name: Some("sampleComponents"),
    },
    ClassDescriptor {
        kind: ClassKind::Spectrum,
        store_class: StoreClass::DataSource,
        children: &[ClassKind::PeakList, ClassKind::IntegralList],
        plural_name: Some("spectra"),
    },
    ClassDescriptor {
        kind: ClassKind::PeakList,
        store_class: StoreClass::PeakList,
        children: &[ClassKind::Peak],
        plural_name: Some("peakLists"),
    },
    ClassDescriptor {
        kind: ClassKind::Peak,
        store_class: StoreClass::Peak,
        children: &[],
        plural_name: Some("peaks"),
    },
    ClassDescriptor {
        kind: ClassKind::IntegralList,
        store_class: StoreClass::IntegralList,
        children: &[ClassKind::Integral],
        plural_name: Some("integralLists"),
    },
    ClassDescriptor {
        kind: ClassKind::Integral,
        store_class: StoreClass::Integral,
        children: &[],
        plural_name: Some("integrals"),
    },
    ClassDescriptor {
        kind: ClassKind::Note,
        store_class: StoreClass::Note,
        children: &[],
        plural_name: Some("notes"),
    },
];

/// Every descriptor, in [`ClassKind::ALL`] order.
pub fn all() -> &'static [ClassDescriptor] {
    &DESCRIPTORS
}

/// The descriptor for `kind`.
pub fn descriptor(kind: ClassKind) -> &'static ClassDescriptor {
    // DESCRIPTORS is laid out in ClassKind declaration order.
    &DESCRIPTORS[kind as usize]
}

/// The descriptor wrapping `class`, if that store class is wrapped at all.
pub fn by_store_class(class: StoreClass) -> Option<&'static ClassDescriptor> {
    DESCRIPTORS.iter().find(|d| d.store_class == class)
}

/// The descriptor whose plural link is `name`.
pub fn by_plural_name(name: &str) -> Option<&'static ClassDescriptor> {
    DESCRIPTORS.iter().find(|d| d.plural_name == Some(name))
}

/// Descriptors breadth-first from the Project: a class always comes after
/// the class that contains it.
pub fn breadth_first() -> Vec<&'static ClassDescriptor> {
    let mut order = Vec::with_capacity(DESCRIPTORS.len());
    let mut queue = VecDeque::from([descriptor(ClassKind::Project)]);
    while let Some(desc) = queue.pop_front() {
        order.push(desc);
        queue.extend(desc.child_descriptors());
    }
    order
}

impl ClassDescriptor {
    /// Descriptors of the declared child classes.
    pub fn child_descriptors(&self) -> impl Iterator<Item = &'static ClassDescriptor> + '_ {
        self.children.iter().map(|kind| descriptor(*kind))
    }

    /// Live store handles of this class contained in `parent`.
    pub fn enumerate_children(
        &self,
        store: &dyn DataStore,
        parent: Handle,
    ) -> WrapResult<Vec<Handle>> {
        Ok(store.children(parent, self.store_class)?)
    }

    /// The (store class, event) pairs this class needs to hear about.
    ///
    /// A child class also watches renames of its parent's store class, since
    /// its pid embeds the parent's key. The Project's key is not embedded in
    /// child pids, so children of the Project do not.
    pub fn watched_events(&self, track_renames: bool) -> Vec<NotifyKey> {
        let mut keys = Vec::with_capacity(4);
        if self.kind != ClassKind::Project {
            keys.push(NotifyKey::new(self.store_class, StoreEvent::Create));
            keys.push(NotifyKey::new(self.store_class, StoreEvent::Delete));
        }
        if track_renames {
            keys.push(NotifyKey::new(self.store_class, StoreEvent::Rename));
            if let Some(parent) = self.kind.parent().filter(|p| *p != ClassKind::Project) {
                keys.push(NotifyKey::new(
                    descriptor(parent).store_class,
                    StoreEvent::Rename,
                ));
            }
        }
        keys
    }

    /// Whether objects of `kind` can appear anywhere below this class.
    pub fn contains_class(&self, kind: ClassKind) -> bool {
        kind != self.kind && kind.ancestors().contains(&self.kind)
    }

    /// Derive the pid of `handle` from the store key and the parent's pid.
    ///
    /// `parent_pid` is `None` only for the Project.
    pub fn derive_pid(
        &self,
        store: &dyn DataStore,
        parent_pid: Option<&Pid>,
        handle: Handle,
    ) -> WrapResult<Pid> {
        let key = store.key(handle)?;
        if key.len() != self.kind.key_arity() {
            return Err(WrapError::KeyArity {
                kind: self.kind,
                expected: self.kind.key_arity(),
                actual: key.len(),
            });
        }
        let pid = match parent_pid {
            Some(parent) => parent.extend(self.kind, key)?,
            None => Pid::new(self.kind, key)?,
        };
        Ok(pid)
    }
}
