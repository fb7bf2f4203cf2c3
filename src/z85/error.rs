use std::io;

use thiserror::Error;

/// Failure modes of the Z85 codec. Every error is a deterministic function
/// of the input, so none of them are worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Z85Error {
    /// `encode` or `decode` was handed a zero-length buffer.
    #[error("empty input")]
    EmptyInput,

    #[error("invalid character 0x{byte:02x} at offset {position}")]
    InvalidCharacter { byte: u8, position: usize },

    /// A trailing group of exactly one character cannot come from any tail.
    #[error("invalid length {len} (a trailing group of 1 character is not valid Z85)")]
    InvalidLength { len: usize },

    /// The group starting at `position` decodes to a value that no input
    /// bytes could have produced.
    #[error("group at offset {position} is out of range")]
    Overflow { position: usize },
}

impl Z85Error {
    /// The same error with its offset passed through `f`. Length and
    /// empty-input errors carry no offset and are returned unchanged.
    pub fn map_position(self, f: impl FnOnce(usize) -> usize) -> Self {
        match self {
            Z85Error::InvalidCharacter { byte, position } => Z85Error::InvalidCharacter {
                byte,
                position: f(position),
            },
            Z85Error::Overflow { position } => Z85Error::Overflow {
                position: f(position),
            },
            other => other,
        }
    }
}

impl From<Z85Error> for io::Error {
    fn from(e: Z85Error) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, format!("invalid input: {}", e))
    }
}
