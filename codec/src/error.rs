use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} more bytes")]
    UnexpectedEnd { needed: usize },

    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    #[error("invalid encoding: {0}")]
    Invalid(String),
}
