//! Data section byte sink
//!
//! The data section is a flat byte stream that producers append to. Offsets
//! into it are stable once written, so a producer records `size()` before
//! appending and uses that as the base address of its block.

use crate::encoder::BytecodeWriter;
use crate::leb128::EncodeError;

/// Append-only byte stream with a queryable size
pub trait DataSink {
    /// Number of bytes written so far
    fn size(&self) -> usize;

    /// Append bytes to the end of the stream
    fn append(&mut self, bytes: &[u8]);
}

impl DataSink for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn append(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// In-memory data section
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataSection {
    bytes: Vec<u8>,
}

impl DataSection {
    /// Create an empty data section
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the section and return its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Check if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encode the section as a single active segment for memory 0 at offset 0
    ///
    /// Layout: segment count, mode flag `0`, the offset expression
    /// `i32.const 0; end`, then the byte vector.
    pub fn encode_active_segment(&self, writer: &mut BytecodeWriter) -> Result<(), EncodeError> {
        writer.emit_varuint(1);
        writer.emit_varuint(0);
        writer.emit_i32_const(0);
        writer.emit_opcode(crate::opcode::Opcode::End);
        writer.emit_varuint_checked(self.bytes.len() as i64)?;
        writer.emit_bytes(&self.bytes);
        Ok(())
    }
}

impl DataSink for DataSection {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }
}
