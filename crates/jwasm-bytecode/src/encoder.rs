//! Binary encoding and decoding utilities
//!
//! `BytecodeWriter` appends opcodes and operands to a growable buffer;
//! `BytecodeReader` walks an encoded function body back, mostly for tests
//! and disassembly.

use crate::leb128::{self, EncodeError};
use crate::opcode::{Opcode, PREFIX_GC, PREFIX_MISC};
use thiserror::Error;

/// Errors that can occur during decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Unexpected end of the byte stream
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// Invalid opcode
    #[error("Invalid opcode {0:#04x} at offset {1}")]
    InvalidOpcode(u8, usize),

    /// LEB128 value does not fit the requested width
    #[error("LEB128 value overflows at offset {0}")]
    Overflow(usize),
}

/// Writer for encoding instructions
///
/// Provides methods for emitting opcodes and their operands into a binary buffer.
#[derive(Debug, Default, Clone)]
pub struct BytecodeWriter {
    pub(crate) buffer: Vec<u8>,
}

impl BytecodeWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current offset (length of the buffer)
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    // ===== Basic Emission =====

    /// Emit a raw byte
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Emit a 32-bit unsigned integer (little-endian)
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 32-bit float (little-endian)
    pub fn emit_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a 64-bit float (little-endian)
    pub fn emit_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit raw bytes
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    // ===== LEB128 Emission =====

    /// Emit an unsigned LEB128 integer
    pub fn emit_varuint(&mut self, value: u32) {
        leb128::write_u64(&mut self.buffer, u64::from(value));
    }

    /// Emit an unsigned LEB128 integer from a signed value, rejecting negatives
    pub fn emit_varuint_checked(&mut self, value: i64) -> Result<usize, EncodeError> {
        leb128::write_unsigned(&mut self.buffer, value)
    }

    /// Emit a signed LEB128 32-bit integer
    pub fn emit_varint_i32(&mut self, value: i32) {
        leb128::write_signed(&mut self.buffer, i64::from(value));
    }

    /// Emit a signed LEB128 64-bit integer
    pub fn emit_varint_i64(&mut self, value: i64) {
        leb128::write_signed(&mut self.buffer, value);
    }

    /// Emit a length-prefixed UTF-8 name
    pub fn emit_name(&mut self, name: &str) {
        // usize to u32: names are bounded by the module size limits
        self.emit_varuint(name.len() as u32);
        self.emit_bytes(name.as_bytes());
    }

    // ===== Opcode Emission =====

    /// Emit an opcode without operands
    pub fn emit_opcode(&mut self, opcode: Opcode) {
        if let Some(prefix) = opcode.prefix() {
            self.emit_u8(prefix);
            self.emit_varuint(u32::from(opcode.code()));
        } else {
            self.emit_u8(opcode.code());
        }
    }

    /// Emit an opcode followed by one index immediate
    pub fn emit_with_index(&mut self, opcode: Opcode, index: u32) {
        self.emit_opcode(opcode);
        self.emit_varuint(index);
    }

    /// Emit `i32.const`
    pub fn emit_i32_const(&mut self, value: i32) {
        self.emit_opcode(Opcode::I32Const);
        self.emit_varint_i32(value);
    }

    /// Emit `i64.const`
    pub fn emit_i64_const(&mut self, value: i64) {
        self.emit_opcode(Opcode::I64Const);
        self.emit_varint_i64(value);
    }

    /// Emit `f32.const`
    pub fn emit_f32_const(&mut self, value: f32) {
        self.emit_opcode(Opcode::F32Const);
        self.emit_f32(value);
    }

    /// Emit `f64.const`
    pub fn emit_f64_const(&mut self, value: f64) {
        self.emit_opcode(Opcode::F64Const);
        self.emit_f64(value);
    }

    /// Emit `struct.get` with type and field immediates
    pub fn emit_struct_get(&mut self, type_index: u32, field: u32) {
        self.emit_with_index(Opcode::StructGet, type_index);
        self.emit_varuint(field);
    }
}

/// Reader for decoding encoded instructions
pub struct BytecodeReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Create a new reader
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    // ===== Basic Reading =====

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let value = *self
            .buffer
            .get(self.position)
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        self.position += 1;
        Ok(value)
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a 32-bit float (little-endian)
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let bytes = self.take::<4>()?;
        Ok(f32::from_le_bytes(bytes))
    }

    /// Read a 64-bit float (little-endian)
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.take::<8>()?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        let end = self.position + count;
        if end > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = self.buffer[self.position..end].to_vec();
        self.position = end;
        Ok(bytes)
    }

    /// Read an unsigned LEB128 integer that must fit 32 bits
    pub fn read_varuint(&mut self) -> Result<u32, DecodeError> {
        let start = self.position;
        let (value, len) = leb128::read_unsigned(self.buffer, start)?;
        let value = u32::try_from(value).map_err(|_| DecodeError::Overflow(start))?;
        self.position += len;
        Ok(value)
    }

    /// Read a signed LEB128 integer
    pub fn read_varint(&mut self) -> Result<i64, DecodeError> {
        let (value, len) = leb128::read_signed(self.buffer, self.position)?;
        self.position += len;
        Ok(value)
    }

    /// Read a length-prefixed UTF-8 name
    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        let start = self.position;
        let len = self.read_varuint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8(start))
    }

    /// Read an opcode, including its prefix byte if present
    pub fn read_opcode(&mut self) -> Result<Opcode, DecodeError> {
        let start = self.position;
        let first = self.read_u8()?;
        if first == PREFIX_GC || first == PREFIX_MISC {
            let sub = self.read_varuint()?;
            let code = u8::try_from(sub).map_err(|_| DecodeError::InvalidOpcode(first, start))?;
            return Opcode::decode(Some(first), code)
                .ok_or(DecodeError::InvalidOpcode(code, start));
        }
        Opcode::decode(None, first).ok_or(DecodeError::InvalidOpcode(first, start))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.position + N;
        let slice = self
            .buffer
            .get(self.position..end)
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(slice);
        self.position = end;
        Ok(bytes)
    }
}
