//! Errors produced while parsing text frames.

/// Errors from the reference frame parser.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProtocolError {
    #[error("frame has no type marker")]
    MissingMarker,

    #[error("unknown type marker: {0}")]
    UnknownMarker(String),

    #[error("positional fields are not terminated by ':'")]
    Unterminated,

    #[error("tuple {index} has {found} components, expected 3")]
    TupleArity { index: usize, found: usize },

    #[error("invalid number {value:?} in tuple {index}")]
    InvalidNumber { index: usize, value: String },

    #[error("unknown state: {0}")]
    UnknownState(String),
}
