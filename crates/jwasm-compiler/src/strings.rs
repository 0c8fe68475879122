//! String constant pool
//!
//! String literals are interned to dense ids in first-use order. At the end
//! of the module the pool is written once into the data section:
//!
//! ```text
//! base:            offset[0] offset[1] ... offset[N-1]   (u32 little-endian)
//! base + 4N:       len(s0) utf8(s0) len(s1) utf8(s1) ... (len is LEB128)
//! ```
//!
//! `offset[i]` is the absolute data offset of the length prefix of string
//! `i`. The base offset is published through a zero-argument function so
//! the runtime accessor can find the table.

use crate::error::{CompileError, CompileResult};
use crate::functions::{FunctionBody, FunctionName};
use crate::ir::{AnyType, CodeOp, TypeRegistry};
use crate::options::CompilerOptions;
use indexmap::IndexMap;
use jwasm_bytecode::{leb128, DataSink, Opcode};

/// Accessor method that loads a string by id
pub const STRING_CONSTANT_METHOD: &str = "stringConstant";

/// Function that pushes the base offset of the string table
pub const STRINGS_OFFSET_METHOD: &str = "stringsMemoryOffset";

/// Interned string literals of one module
#[derive(Debug, Default)]
pub struct StringPool {
    strings: IndexMap<String, u32>,
    base_offset: Option<u32>,
    finalized: bool,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of a string, assigned on first use
    pub fn intern(&mut self, value: &str) -> CompileResult<u32> {
        if let Some(&id) = self.strings.get(value) {
            return Ok(id);
        }
        if self.finalized {
            return Err(CompileError::PoolFinalized {
                value: value.to_string(),
            });
        }
        let id = self.strings.len() as u32;
        self.strings.insert(value.to_string(), id);
        Ok(id)
    }

    /// String of an id
    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings
            .get_index(id as usize)
            .map(|(value, _)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Data offset of the index table; `None` if nothing was written
    pub fn base_offset(&self) -> Option<u32> {
        self.base_offset
    }

    /// Write the table and bodies to the data section
    ///
    /// An empty pool leaves the sink untouched. The pool can be finalized
    /// only once and accepts no new strings afterwards.
    pub fn finalize(&mut self, data: &mut dyn DataSink) -> CompileResult<()> {
        if self.finalized {
            return Err(CompileError::internal("String pool finalized twice"));
        }
        self.finalized = true;
        if self.strings.is_empty() {
            return Ok(());
        }

        let base = data.size();
        let table_size = self.strings.len() * 4;
        let mut table = Vec::with_capacity(table_size);
        let mut bodies = Vec::new();
        for value in self.strings.keys() {
            let position = to_offset(base + table_size + bodies.len())?;
            table.extend_from_slice(&position.to_le_bytes());
            leb128::write_unsigned(&mut bodies, value.len() as i64)?;
            bodies.extend_from_slice(value.as_bytes());
        }

        data.append(&table);
        data.append(&bodies);
        let base = to_offset(base)?;
        self.base_offset = Some(base);
        log::debug!(
            "string pool: {} strings at offset {} ({} bytes)",
            self.strings.len(),
            base,
            table.len() + bodies.len()
        );
        Ok(())
    }
}

fn to_offset(offset: usize) -> CompileResult<u32> {
    u32::try_from(offset)
        .map_err(|_| CompileError::internal(format!("Data offset {} exceeds 32 bits", offset)))
}

/// The runtime accessor that returns the string of an id
pub fn string_constant_function(options: &CompilerOptions, types: &TypeRegistry) -> FunctionName {
    FunctionName::new(
        options.string_table_class.as_str(),
        STRING_CONSTANT_METHOD,
        "(I)Ljava/lang/String;",
        vec![AnyType::I32],
        Some(types.string_type()),
    )
}

/// The synthetic function that pushes the table's base offset
pub fn strings_offset_function(options: &CompilerOptions) -> FunctionName {
    FunctionName::new(
        options.string_table_class.as_str(),
        STRINGS_OFFSET_METHOD,
        "()I",
        Vec::new(),
        Some(AnyType::I32),
    )
}

/// Body of the offset function: `i32.const offset; return`
pub fn strings_offset_body(offset: u32) -> CompileResult<FunctionBody> {
    let offset = i32::try_from(offset)
        .map_err(|_| CompileError::internal(format!("String table offset {} exceeds i32", offset)))?;
    Ok(FunctionBody::Code(vec![
        CodeOp::I32Const(offset),
        CodeOp::Op(Opcode::Return),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jwasm_bytecode::DataSection;

    #[test]
    fn test_intern_assigns_dense_ids() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("b").unwrap(), 0);
        assert_eq!(pool.intern("a").unwrap(), 1);
        assert_eq!(pool.intern("b").unwrap(), 0);
        assert_eq!(pool.intern("c").unwrap(), 2);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(1), Some("a"));
        assert_eq!(pool.get(3), None);
    }

    #[test]
    fn test_two_string_layout() {
        let mut pool = StringPool::new();
        pool.intern("ab").unwrap();
        pool.intern("c").unwrap();
        let mut data = DataSection::new();
        pool.finalize(&mut data).unwrap();

        assert_eq!(
            data.as_bytes(),
            &[
                0x08, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x02, b'a', b'b', 0x01, b'c'
            ]
        );
        assert_eq!(pool.base_offset(), Some(0));
    }

    #[test]
    fn test_offsets_are_absolute() {
        let mut pool = StringPool::new();
        pool.intern("xyz").unwrap();
        let mut data = DataSection::new();
        data.append(&[0u8; 16]);
        pool.finalize(&mut data).unwrap();

        assert_eq!(pool.base_offset(), Some(16));
        assert_eq!(&data.as_bytes()[16..20], &20u32.to_le_bytes());
        assert_eq!(&data.as_bytes()[20..], &[0x03, b'x', b'y', b'z']);
    }

    #[test]
    fn test_two_byte_length_prefix_shifts_later_offsets() {
        let mut pool = StringPool::new();
        pool.intern(&"x".repeat(200)).unwrap();
        pool.intern("y").unwrap();
        let mut data = DataSection::new();
        pool.finalize(&mut data).unwrap();

        let bytes = data.as_bytes();
        assert_eq!(&bytes[0..4], &8u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(8u32 + 2 + 200).to_le_bytes());
        assert_eq!(&bytes[8..10], &[0xC8, 0x01]);
        assert_eq!(&bytes[210..], &[0x01, b'y']);
        assert_eq!(data.size(), 8 + 2 + 200 + 2);
    }

    #[test]
    fn test_empty_pool_writes_nothing() {
        let mut pool = StringPool::new();
        let mut data = DataSection::new();
        pool.finalize(&mut data).unwrap();
        assert!(data.is_empty());
        assert_eq!(pool.base_offset(), None);
    }

    #[test]
    fn test_no_strings_after_finalize() {
        let mut pool = StringPool::new();
        pool.intern("kept").unwrap();
        pool.finalize(&mut DataSection::new()).unwrap();

        assert_eq!(pool.intern("kept").unwrap(), 0);
        assert!(matches!(
            pool.intern("late"),
            Err(CompileError::PoolFinalized { .. })
        ));
        assert!(pool.finalize(&mut DataSection::new()).is_err());
    }

    #[test]
    fn test_utf8_byte_length() {
        let mut pool = StringPool::new();
        pool.intern("\u{e9}\u{1F600}").unwrap();
        let mut data = DataSection::new();
        pool.finalize(&mut data).unwrap();
        // 2 bytes for U+00E9 and 4 for U+1F600
        assert_eq!(data.as_bytes()[4], 6);
        assert_eq!(data.size(), 4 + 1 + 6);
    }

    #[test]
    fn test_offset_body() {
        assert_eq!(
            strings_offset_body(24).unwrap(),
            FunctionBody::Code(vec![CodeOp::I32Const(24), CodeOp::Op(Opcode::Return)])
        );
        assert!(strings_offset_body(u32::MAX).is_err());
    }
}
