//! Persistent identifiers for wrapped objects.
//!
//! A [`Pid`] is a type tag plus an ordered list of key parts. It renders as
//! `TAG:part1.part2...partN`, e.g. `MR:A.1.ALA` for residue `1 ALA` of chain
//! `A`. The tag set is closed ([`ClassKind`]) and each tag takes a fixed
//! number of parts, so parsing needs no escaping of the tag and can reject
//! text with the wrong shape.
//!
//! Key parts may themselves contain `.`: it is rendered as `^` and mapped
//! back on parse. A part containing a literal `^` cannot be represented and
//! is rejected on construction, which keeps [`Pid::parse`] the exact inverse
//! of [`Pid::render`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::class::ClassKind;
use crate::error::PidError;

/// Separates the type tag from the key.
pub const PREFIX_SEPARATOR: char = ':';
/// Separates key parts.
pub const ID_SEPARATOR: char = '.';
/// Stands in for [`ID_SEPARATOR`] inside a rendered key part.
pub const ALT_SEPARATOR: char = '^';

/// Persistent identifier of a wrapped object, unique within its project.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid {
    kind: ClassKind,
    parts: Vec<String>,
}

impl Pid {
    /// Build a Pid from a class and its full list of key parts.
    pub fn new<I, S>(kind: ClassKind, parts: I) -> Result<Self, PidError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.len() != kind.id_arity() {
            return Err(PidError::WrongArity {
                tag: kind.short_name(),
                expected: kind.id_arity(),
                actual: parts.len(),
            });
        }
        if let Some(bad) = parts.iter().find(|p| p.contains(ALT_SEPARATOR)) {
            return Err(PidError::ReservedCharacter(bad.clone()));
        }
        Ok(Self { kind, parts })
    }

    /// Build the Pid of a child of `self` from the child's local key parts.
    ///
    /// Children of the Project do not inherit the project name.
    pub fn extend<I, S>(&self, kind: ClassKind, local: I) -> Result<Self, PidError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = if self.kind == ClassKind::Project {
            Vec::new()
        } else {
            self.parts.clone()
        };
        parts.extend(local.into_iter().map(Into::into));
        Self::new(kind, parts)
    }

    /// Parse a rendered Pid, accepting short tags and full class names.
    pub fn parse(text: &str) -> Result<Self, PidError> {
        Self::parse_with(text, true)
    }

    /// Parse a rendered Pid; full class names are accepted only when
    /// `accept_long` is set.
    pub fn parse_with(text: &str, accept_long: bool) -> Result<Self, PidError> {
        let (tag, id) = text
            .split_once(PREFIX_SEPARATOR)
            .ok_or_else(|| PidError::MissingSeparator(text.to_string()))?;
        let kind = ClassKind::from_tag(tag, accept_long).ok_or_else(|| PidError::UnknownTag {
            tag: tag.to_string(),
            text: text.to_string(),
        })?;
        let parts: Vec<String> = id.split(ID_SEPARATOR).map(unescape_part).collect();
        Self::new(kind, parts)
    }

    /// The class this Pid addresses.
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Short type tag, e.g. `MR`.
    pub fn type_tag(&self) -> &'static str {
        self.kind.short_name()
    }

    /// All key parts, unescaped.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The key parts contributed by this object itself (not its ancestors).
    pub fn local_parts(&self) -> &[String] {
        let n = self.kind.key_arity().min(self.parts.len());
        &self.parts[self.parts.len() - n..]
    }

    /// The key rendered without the tag, e.g. `A.1.ALA`.
    pub fn id(&self) -> String {
        join_parts(&self.parts)
    }

    /// Render as `TAG:id`.
    pub fn render(&self) -> String {
        format!("{}{}{}", self.kind.short_name(), PREFIX_SEPARATOR, self.id())
    }

    /// Render with the full class name, e.g. `Residue:A.1.ALA`.
    pub fn render_long(&self) -> String {
        format!("{}{}{}", self.kind.class_name(), PREFIX_SEPARATOR, self.id())
    }
}

/// Join key parts into an id string, escaping separators inside parts.
pub(crate) fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.replace(ID_SEPARATOR, &ALT_SEPARATOR.to_string()))
        .collect::<Vec<_>>()
        .join(&ID_SEPARATOR.to_string())
}

fn unescape_part(part: &str) -> String {
    part.replace(ALT_SEPARATOR, &ID_SEPARATOR.to_string())
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.render())
    }
}

impl FromStr for Pid {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Pid::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn residue() -> Pid {
        Pid::new(ClassKind::Residue, ["A", "1", "ALA"]).unwrap()
    }

    #[test]
    fn render_residue() {
        assert_eq!(residue().render(), "MR:A.1.ALA");
        assert_eq!(residue().render_long(), "Residue:A.1.ALA");
        assert_eq!(residue().id(), "A.1.ALA");
        assert_eq!(residue().to_string(), "MR:A.1.ALA");
    }

    #[test]
    fn parse_short_and_long_forms() {
        assert_eq!(Pid::parse("MR:A.1.ALA").unwrap(), residue());
        assert_eq!(Pid::parse("Residue:A.1.ALA").unwrap(), residue());
        assert!(matches!(
            Pid::parse_with("Residue:A.1.ALA", false),
            Err(PidError::UnknownTag { .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        let err = Pid::parse("ZZ:A").unwrap_err();
        assert!(matches!(err, PidError::UnknownTag { ref tag, .. } if tag == "ZZ"));
    }

    #[test]
    fn parse_rejects_wrong_arity() {
        let err = Pid::parse("MR:A.1").unwrap_err();
        assert_eq!(
            err,
            PidError::WrongArity {
                tag: "MR",
                expected: 3,
                actual: 2
            }
        );
        assert!(Pid::parse("MC:A.B").is_err());
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(matches!(
            Pid::parse("MCA"),
            Err(PidError::MissingSeparator(_))
        ));
    }

    #[test]
    fn dots_inside_parts_are_escaped() {
        let pid = Pid::new(ClassKind::Spectrum, ["hsqc.2"]).unwrap();
        assert_eq!(pid.render(), "SP:hsqc^2");
        assert_eq!(Pid::parse("SP:hsqc^2").unwrap(), pid);
        assert_eq!(pid.parts(), ["hsqc.2".to_string()]);
    }

    #[test]
    fn reserved_character_rejected() {
        let err = Pid::new(ClassKind::Note, ["a^b"]).unwrap_err();
        assert_eq!(err, PidError::ReservedCharacter("a^b".into()));
    }

    #[test]
    fn extend_from_project_drops_project_name() {
        let project = Pid::new(ClassKind::Project, ["demo"]).unwrap();
        let chain = project.extend(ClassKind::Chain, ["A"]).unwrap();
        assert_eq!(chain.render(), "MC:A");
        let res = chain.extend(ClassKind::Residue, ["1", "ALA"]).unwrap();
        assert_eq!(res, residue());
        assert_eq!(res.local_parts(), ["1".to_string(), "ALA".to_string()]);
    }

    #[test]
    fn equality_covers_kind_and_parts() {
        let a = Pid::new(ClassKind::Spectrum, ["x"]).unwrap();
        let b = Pid::new(ClassKind::Note, ["x"]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_uses_rendered_form() {
        let json = serde_json::to_string(&residue()).unwrap();
        assert_eq!(json, "\"MR:A.1.ALA\"");
        let back: Pid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, residue());
        assert!(serde_json::from_str::<Pid>("\"MR:A\"").is_err());
    }

    fn any_pid() -> impl Strategy<Value = Pid> {
        prop::sample::select(ClassKind::ALL.to_vec()).prop_flat_map(|kind| {
            prop::collection::vec("[A-Za-z0-9:._ -]{0,6}", kind.id_arity())
                .prop_map(move |parts| Pid::new(kind, parts).unwrap())
        })
    }

    proptest! {
        #[test]
        fn parse_inverts_render(pid in any_pid()) {
            prop_assert_eq!(Pid::parse(&pid.render()).unwrap(), pid.clone());
            prop_assert_eq!(Pid::parse(&pid.render_long()).unwrap(), pid);
        }
    }
}
