//! Value types of the target module format
//!
//! `ValueType` covers both the numeric kinds the operand stack understands
//! and the packed/source-level kinds (`i8`, `i16`, `u16`, `bool`) that only
//! exist as array storage or as source bytecode types. Sub-word kinds are
//! widened to `i32` as soon as they reach the operand stack.

use crate::encoder::BytecodeWriter;

/// Binary code of a nullable concrete reference (`ref null $t`)
pub const REF_NULL: u8 = 0x63;

/// Primitive and built-in reference value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit IEEE float
    F32,
    /// 64-bit IEEE float
    F64,
    /// Signed 8-bit integer (packed storage only)
    I8,
    /// Signed 16-bit integer (packed storage only)
    I16,
    /// Unsigned 16-bit integer, the source `char` (packed storage only)
    U16,
    /// Boolean, stored as an unsigned byte
    Bool,
    /// Function reference
    FuncRef,
    /// Host-provided reference
    ExternRef,
    /// Any GC reference
    AnyRef,
    /// Reference that supports equality
    EqRef,
}

impl ValueType {
    /// All value types, in declaration order
    pub const ALL: [ValueType; 12] = [
        ValueType::I32,
        ValueType::I64,
        ValueType::F32,
        ValueType::F64,
        ValueType::I8,
        ValueType::I16,
        ValueType::U16,
        ValueType::Bool,
        ValueType::FuncRef,
        ValueType::ExternRef,
        ValueType::AnyRef,
        ValueType::EqRef,
    ];

    /// Check if this is a reference type
    pub fn is_ref_type(self) -> bool {
        matches!(
            self,
            ValueType::FuncRef | ValueType::ExternRef | ValueType::AnyRef | ValueType::EqRef
        )
    }

    /// Check if this type is narrower than 32 bits
    pub fn is_sub_word(self) -> bool {
        matches!(
            self,
            ValueType::I8 | ValueType::I16 | ValueType::U16 | ValueType::Bool
        )
    }

    /// Check if this is one of the four numeric stack types
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64
        )
    }

    /// Natural encoding width in bytes, `None` for reference types
    pub fn natural_width(self) -> Option<u32> {
        match self {
            ValueType::I8 | ValueType::Bool => Some(1),
            ValueType::I16 | ValueType::U16 => Some(2),
            ValueType::I32 | ValueType::F32 => Some(4),
            ValueType::I64 | ValueType::F64 => Some(8),
            ValueType::FuncRef | ValueType::ExternRef | ValueType::AnyRef | ValueType::EqRef => {
                None
            }
        }
    }

    /// The type this value has once it is on the operand stack
    pub fn stack_type(self) -> ValueType {
        if self.is_sub_word() {
            ValueType::I32
        } else {
            self
        }
    }

    /// Binary type code
    ///
    /// Sub-word kinds map to their packed storage codes; `u16` and `bool`
    /// share the storage of `i16` and `i8`.
    pub fn code(self) -> u8 {
        match self {
            ValueType::I32 => 0x7F,
            ValueType::I64 => 0x7E,
            ValueType::F32 => 0x7D,
            ValueType::F64 => 0x7C,
            ValueType::I8 | ValueType::Bool => 0x78,
            ValueType::I16 | ValueType::U16 => 0x77,
            ValueType::FuncRef => 0x70,
            ValueType::ExternRef => 0x6F,
            ValueType::AnyRef => 0x6E,
            ValueType::EqRef => 0x6D,
        }
    }

    /// Text format name
    pub fn name(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::U16 => "u16",
            ValueType::Bool => "bool",
            ValueType::FuncRef => "funcref",
            ValueType::ExternRef => "externref",
            ValueType::AnyRef => "anyref",
            ValueType::EqRef => "eqref",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fully lowered type as it appears in the binary module
///
/// Either a built-in value type or a nullable reference to an entry of the
/// module's type section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmType {
    /// Built-in value type
    Value(ValueType),
    /// `ref null $type_index`
    Ref(u32),
}

impl WasmType {
    /// Encode this type into a writer
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        match self {
            WasmType::Value(ty) => writer.emit_u8(ty.code()),
            WasmType::Ref(index) => {
                writer.emit_u8(REF_NULL);
                writer.emit_varint_i64(i64::from(*index));
            }
        }
    }
}

impl From<ValueType> for WasmType {
    fn from(ty: ValueType) -> Self {
        WasmType::Value(ty)
    }
}

impl std::fmt::Display for WasmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WasmType::Value(ty) => write!(f, "{}", ty),
            WasmType::Ref(index) => write!(f, "(ref null {})", index),
        }
    }
}
