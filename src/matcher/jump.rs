//! Jumps resolve the starting position of a load within record bytes:
//! either a literal offset, or an address read out of the record itself.

use serde::{Deserialize, Serialize};

use super::value::ValueKind;
use super::MatchError;

/// A relocation of the byte pointer before a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Jump {
    /// Seek to a literal offset.
    Offset(u64),
    /// Read an unsigned integer of `kind` at `offset`, then seek the
    /// original bytes to the decoded position.
    Deref { offset: u64, kind: ValueKind },
}

impl Jump {
    /// Returns the suffix of `bytes` this jump lands on.
    pub fn apply<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8], MatchError> {
        match *self {
            Jump::Offset(offset) => seek(bytes, offset),
            Jump::Deref { offset, kind } => {
                let at_address = seek(bytes, offset)?;
                let target = kind.decode(at_address)?.as_u64();
                seek(bytes, target)
            }
        }
    }
}

fn seek(bytes: &[u8], offset: u64) -> Result<&[u8], MatchError> {
    if (bytes.len() as u64) < offset {
        return Err(MatchError::JumpOffsetOutOfRange);
    }
    Ok(&bytes[offset as usize..])
}
