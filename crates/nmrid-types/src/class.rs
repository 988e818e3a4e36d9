use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of wrapper classes.
///
/// Each class has a short type tag used in Pids (`MC`, `MR`, ...), a full
/// class name accepted as a long-form tag, a fixed parent class, and a fixed
/// number of local key parts. Together these make Pid parsing unambiguous:
/// the total number of key parts for a class is the sum of the local key
/// parts along its ancestor chain (the Project contributes none to its
/// children).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassKind {
    Project,
    Chain,
    Residue,
    Atom,
    Substance,
    Sample,
    SampleComponent,
    Spectrum,
    PeakList,
    Peak,
    IntegralList,
    Integral,
    Note,
}

impl ClassKind {
    /// Every class, parents before children.
    pub const ALL: [ClassKind; 13] = [
        Self::Project,
        Self::Chain,
        Self::Residue,
        Self::Atom,
        Self::Substance,
        Self::Sample,
        Self::SampleComponent,
        Self::Spectrum,
        Self::PeakList,
        Self::Peak,
        Self::IntegralList,
        Self::Integral,
        Self::Note,
    ];

    /// Short type tag used in Pids.
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Project => "PR",
            Self::Chain => "MC",
            Self::Residue => "MR",
            Self::Atom => "MA",
            Self::Substance => "SU",
            Self::Sample => "SA",
            Self::SampleComponent => "SC",
            Self::Spectrum => "SP",
            Self::PeakList => "PL",
            Self::Peak => "PK",
            Self::IntegralList => "IL",
            Self::Integral => "IT",
            Self::Note => "NO",
        }
    }

    /// Full class name, accepted as a long-form Pid tag.
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Chain => "Chain",
            Self::Residue => "Residue",
            Self::Atom => "Atom",
            Self::Substance => "Substance",
            Self::Sample => "Sample",
            Self::SampleComponent => "SampleComponent",
            Self::Spectrum => "Spectrum",
            Self::PeakList => "PeakList",
            Self::Peak => "Peak",
            Self::IntegralList => "IntegralList",
            Self::Integral => "Integral",
            Self::Note => "Note",
        }
    }

    /// The containing class, `None` for the Project.
    pub const fn parent(self) -> Option<ClassKind> {
        match self {
            Self::Project => None,
            Self::Chain | Self::Substance | Self::Sample | Self::Spectrum | Self::Note => {
                Some(Self::Project)
            }
            Self::Residue => Some(Self::Chain),
            Self::Atom => Some(Self::Residue),
            Self::SampleComponent => Some(Self::Sample),
            Self::PeakList | Self::IntegralList => Some(Self::Spectrum),
            Self::Peak => Some(Self::PeakList),
            Self::Integral => Some(Self::IntegralList),
        }
    }

    /// Number of key parts this class adds to its parent's key.
    ///
    /// Residues are keyed by sequence code and residue type; substances and
    /// sample components by name and labelling. Everything else has a single
    /// name or serial.
    pub const fn key_arity(self) -> usize {
        match self {
            Self::Residue | Self::Substance | Self::SampleComponent => 2,
            _ => 1,
        }
    }

    /// Total number of key parts in a Pid of this class.
    pub fn id_arity(self) -> usize {
        match self.parent() {
            None | Some(Self::Project) => self.key_arity(),
            Some(parent) => parent.id_arity() + self.key_arity(),
        }
    }

    /// Resolve a short tag (`MC`) or, when `accept_long` is set, a full
    /// class name (`Chain`).
    pub fn from_tag(tag: &str, accept_long: bool) -> Option<ClassKind> {
        Self::ALL.into_iter().find(|kind| {
            kind.short_name() == tag || (accept_long && kind.class_name() == tag)
        })
    }

    /// Ancestor classes from the Project down to (not including) `self`.
    pub fn ancestors(self) -> Vec<ClassKind> {
        let mut result = Vec::new();
        let mut current = self.parent();
        while let Some(kind) = current {
            result.push(kind);
            current = kind.parent();
        }
        result.reverse();
        result
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tags_are_unique() {
        let short: HashSet<_> = ClassKind::ALL.iter().map(|k| k.short_name()).collect();
        let long: HashSet<_> = ClassKind::ALL.iter().map(|k| k.class_name()).collect();
        assert_eq!(short.len(), ClassKind::ALL.len());
        assert_eq!(long.len(), ClassKind::ALL.len());
    }

    #[test]
    fn parents_precede_children_in_all() {
        for (i, kind) in ClassKind::ALL.iter().enumerate() {
            if let Some(parent) = kind.parent() {
                let pos = ClassKind::ALL.iter().position(|k| *k == parent).unwrap();
                assert!(pos < i, "{kind} listed before its parent {parent}");
            }
        }
    }

    #[test]
    fn id_arity_accumulates_along_ancestors() {
        assert_eq!(ClassKind::Project.id_arity(), 1);
        assert_eq!(ClassKind::Chain.id_arity(), 1);
        assert_eq!(ClassKind::Residue.id_arity(), 3);
        assert_eq!(ClassKind::Atom.id_arity(), 4);
        assert_eq!(ClassKind::Peak.id_arity(), 3);
        assert_eq!(ClassKind::SampleComponent.id_arity(), 3);
    }

    #[test]
    fn from_tag_short_and_long() {
        assert_eq!(ClassKind::from_tag("MR", false), Some(ClassKind::Residue));
        assert_eq!(ClassKind::from_tag("Residue", true), Some(ClassKind::Residue));
        assert_eq!(ClassKind::from_tag("Residue", false), None);
        assert_eq!(ClassKind::from_tag("XX", true), None);
    }

    #[test]
    fn ancestors_start_at_project() {
        assert_eq!(
            ClassKind::Atom.ancestors(),
            vec![ClassKind::Project, ClassKind::Chain, ClassKind::Residue]
        );
        assert!(ClassKind::Project.ancestors().is_empty());
    }
}
