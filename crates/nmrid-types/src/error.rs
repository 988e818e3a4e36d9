use thiserror::Error;

/// Errors produced while building or parsing a [`Pid`](crate::Pid).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PidError {
    #[error("pid {0:?} has no ':' separating the type tag from the key")]
    MissingSeparator(String),

    #[error("unknown type tag {tag:?} in pid {text:?}")]
    UnknownTag { tag: String, text: String },

    #[error("{tag} pids take {expected} key parts, got {actual}")]
    WrongArity {
        tag: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("key part {0:?} contains the reserved character '^'")]
    ReservedCharacter(String),
}
