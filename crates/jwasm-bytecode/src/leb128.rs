//! LEB128 variable-length integers
//!
//! Seven bits of the value per byte, least significant group first, with the
//! continuation bit (0x80) set on every byte except the last.

use crate::encoder::DecodeError;
use thiserror::Error;

/// Errors that can occur while encoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// An unsigned encoding was requested for a negative value
    #[error("Invalid negative value {0} for unsigned LEB128")]
    NegativeValue(i64),
}

/// Append the unsigned LEB128 encoding of `value`, returning the byte count
///
/// The value is taken as a signed integer so that lengths computed with
/// signed arithmetic can be passed directly; negative input is rejected.
pub fn write_unsigned(out: &mut Vec<u8>, value: i64) -> Result<usize, EncodeError> {
    if value < 0 {
        return Err(EncodeError::NegativeValue(value));
    }
    Ok(write_u64(out, value as u64))
}

/// Append the unsigned LEB128 encoding of `value`, returning the byte count
pub fn write_u64(out: &mut Vec<u8>, mut value: u64) -> usize {
    let start = out.len();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
    out.len() - start
}

/// Append the signed LEB128 encoding of `value`, returning the byte count
pub fn write_signed(out: &mut Vec<u8>, mut value: i64) -> usize {
    let start = out.len();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out.len() - start
}

/// Number of bytes the unsigned encoding of `value` occupies
pub fn unsigned_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Decode an unsigned LEB128 value starting at `offset`
///
/// Returns the value and the number of bytes consumed.
pub fn read_unsigned(bytes: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    let mut position = offset;
    loop {
        let byte = *bytes
            .get(position)
            .ok_or(DecodeError::UnexpectedEnd(position))?;
        position += 1;
        if shift >= 64 {
            return Err(DecodeError::Overflow(offset));
        }
        result |= u64::from(byte & 0x7F) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((result, position - offset));
        }
    }
}

/// Decode a signed LEB128 value starting at `offset`
///
/// Returns the value and the number of bytes consumed.
pub fn read_signed(bytes: &[u8], offset: usize) -> Result<(i64, usize), DecodeError> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    let mut position = offset;
    loop {
        let byte = *bytes
            .get(position)
            .ok_or(DecodeError::UnexpectedEnd(position))?;
        position += 1;
        if shift >= 64 {
            return Err(DecodeError::Overflow(offset));
        }
        result |= i64::from(byte & 0x7F) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Ok((result, position - offset));
        }
    }
}
