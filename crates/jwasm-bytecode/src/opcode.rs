//! Target module opcodes
//!
//! This module defines the subset of the target instruction set that the
//! code generator emits. Most opcodes are a single byte; the saturating
//! truncations live behind the `0xFC` prefix and the structural/array
//! operations behind the `0xFB` prefix, each followed by a sub-opcode.
//!
//! Opcode layout:
//! - 0x00-0x1F: Control flow, calls and `drop`
//! - 0x20-0x2F: Local variables
//! - 0x41-0x44: Constants
//! - 0x45-0x66: Comparisons
//! - 0x67-0xA6: Arithmetic and bitwise operations
//! - 0xA7-0xC4: Conversions and sign extension
//! - 0xFB xx: Structs and arrays
//! - 0xFC xx: Saturating truncation

/// Prefix byte of the structural/array instructions
pub const PREFIX_GC: u8 = 0xFB;

/// Prefix byte of the miscellaneous (saturating) instructions
pub const PREFIX_MISC: u8 = 0xFC;

/// Block type byte for a block without parameters or results
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

/// Target opcode enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    // ===== Control Flow (0x00-0x1F) =====
    Unreachable,
    Nop,
    Block,
    Loop,
    End,
    Br,
    BrIf,
    Return,
    Call,
    Drop,

    // ===== Local Variables (0x20-0x2F) =====
    LocalGet,
    LocalSet,
    LocalTee,

    // ===== Constants (0x41-0x44) =====
    I32Const,
    I64Const,
    F32Const,
    F64Const,

    // ===== Comparison (0x45-0x66) =====
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32GtS,
    I32LeS,
    I32GeS,
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64GtS,
    I64LeS,
    I64GeS,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // ===== Arithmetic (0x67-0xA6) =====
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32RemS,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64RemS,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    F32Neg,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F64Neg,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,

    // ===== Conversion (0xA7-0xC4) =====
    I32WrapI64,
    I64ExtendI32S,
    F32ConvertI32S,
    F32ConvertI64S,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI64S,
    F64PromoteF32,
    I32Extend8S,
    I32Extend16S,

    // ===== Saturating Truncation (0xFC xx) =====
    I32TruncSatF32S,
    I32TruncSatF64S,
    I64TruncSatF32S,
    I64TruncSatF64S,

    // ===== Structs & Arrays (0xFB xx) =====
    StructNew,
    StructGet,
    ArrayNewDefault,
    ArrayGet,
    ArrayGetS,
    ArrayGetU,
    ArraySet,
    ArrayLen,
}

impl Opcode {
    /// Every opcode known to the encoder
    pub const ALL: [Opcode; 97] = [
        Opcode::Unreachable,
        Opcode::Nop,
        Opcode::Block,
        Opcode::Loop,
        Opcode::End,
        Opcode::Br,
        Opcode::BrIf,
        Opcode::Return,
        Opcode::Call,
        Opcode::Drop,
        Opcode::LocalGet,
        Opcode::LocalSet,
        Opcode::LocalTee,
        Opcode::I32Const,
        Opcode::I64Const,
        Opcode::F32Const,
        Opcode::F64Const,
        Opcode::I32Eqz,
        Opcode::I32Eq,
        Opcode::I32Ne,
        Opcode::I32LtS,
        Opcode::I32GtS,
        Opcode::I32LeS,
        Opcode::I32GeS,
        Opcode::I64Eqz,
        Opcode::I64Eq,
        Opcode::I64Ne,
        Opcode::I64LtS,
        Opcode::I64GtS,
        Opcode::I64LeS,
        Opcode::I64GeS,
        Opcode::F32Eq,
        Opcode::F32Ne,
        Opcode::F32Lt,
        Opcode::F32Gt,
        Opcode::F32Le,
        Opcode::F32Ge,
        Opcode::F64Eq,
        Opcode::F64Ne,
        Opcode::F64Lt,
        Opcode::F64Gt,
        Opcode::F64Le,
        Opcode::F64Ge,
        Opcode::I32Add,
        Opcode::I32Sub,
        Opcode::I32Mul,
        Opcode::I32DivS,
        Opcode::I32RemS,
        Opcode::I32And,
        Opcode::I32Or,
        Opcode::I32Xor,
        Opcode::I32Shl,
        Opcode::I32ShrS,
        Opcode::I32ShrU,
        Opcode::I64Add,
        Opcode::I64Sub,
        Opcode::I64Mul,
        Opcode::I64DivS,
        Opcode::I64RemS,
        Opcode::I64And,
        Opcode::I64Or,
        Opcode::I64Xor,
        Opcode::I64Shl,
        Opcode::I64ShrS,
        Opcode::I64ShrU,
        Opcode::F32Neg,
        Opcode::F32Add,
        Opcode::F32Sub,
        Opcode::F32Mul,
        Opcode::F32Div,
        Opcode::F64Neg,
        Opcode::F64Add,
        Opcode::F64Sub,
        Opcode::F64Mul,
        Opcode::F64Div,
        Opcode::I32WrapI64,
        Opcode::I64ExtendI32S,
        Opcode::F32ConvertI32S,
        Opcode::F32ConvertI64S,
        Opcode::F32DemoteF64,
        Opcode::F64ConvertI32S,
        Opcode::F64ConvertI64S,
        Opcode::F64PromoteF32,
        Opcode::I32Extend8S,
        Opcode::I32Extend16S,
        Opcode::I32TruncSatF32S,
        Opcode::I32TruncSatF64S,
        Opcode::I64TruncSatF32S,
        Opcode::I64TruncSatF64S,
        Opcode::StructNew,
        Opcode::StructGet,
        Opcode::ArrayNewDefault,
        Opcode::ArrayGet,
        Opcode::ArrayGetS,
        Opcode::ArrayGetU,
        Opcode::ArraySet,
        Opcode::ArrayLen,
    ];

    /// Prefix byte, `None` for single-byte opcodes
    pub fn prefix(self) -> Option<u8> {
        match self {
            Self::I32TruncSatF32S
            | Self::I32TruncSatF64S
            | Self::I64TruncSatF32S
            | Self::I64TruncSatF64S => Some(PREFIX_MISC),
            Self::StructNew
            | Self::StructGet
            | Self::ArrayNewDefault
            | Self::ArrayGet
            | Self::ArrayGetS
            | Self::ArrayGetU
            | Self::ArraySet
            | Self::ArrayLen => Some(PREFIX_GC),
            _ => None,
        }
    }

    /// Opcode byte, or the sub-opcode for prefixed instructions
    pub fn code(self) -> u8 {
        match self {
            Self::Unreachable => 0x00,
            Self::Nop => 0x01,
            Self::Block => 0x02,
            Self::Loop => 0x03,
            Self::End => 0x0B,
            Self::Br => 0x0C,
            Self::BrIf => 0x0D,
            Self::Return => 0x0F,
            Self::Call => 0x10,
            Self::Drop => 0x1A,
            Self::LocalGet => 0x20,
            Self::LocalSet => 0x21,
            Self::LocalTee => 0x22,
            Self::I32Const => 0x41,
            Self::I64Const => 0x42,
            Self::F32Const => 0x43,
            Self::F64Const => 0x44,
            Self::I32Eqz => 0x45,
            Self::I32Eq => 0x46,
            Self::I32Ne => 0x47,
            Self::I32LtS => 0x48,
            Self::I32GtS => 0x4A,
            Self::I32LeS => 0x4C,
            Self::I32GeS => 0x4E,
            Self::I64Eqz => 0x50,
            Self::I64Eq => 0x51,
            Self::I64Ne => 0x52,
            Self::I64LtS => 0x53,
            Self::I64GtS => 0x55,
            Self::I64LeS => 0x57,
            Self::I64GeS => 0x59,
            Self::F32Eq => 0x5B,
            Self::F32Ne => 0x5C,
            Self::F32Lt => 0x5D,
            Self::F32Gt => 0x5E,
            Self::F32Le => 0x5F,
            Self::F32Ge => 0x60,
            Self::F64Eq => 0x61,
            Self::F64Ne => 0x62,
            Self::F64Lt => 0x63,
            Self::F64Gt => 0x64,
            Self::F64Le => 0x65,
            Self::F64Ge => 0x66,
            Self::I32Add => 0x6A,
            Self::I32Sub => 0x6B,
            Self::I32Mul => 0x6C,
            Self::I32DivS => 0x6D,
            Self::I32RemS => 0x6F,
            Self::I32And => 0x71,
            Self::I32Or => 0x72,
            Self::I32Xor => 0x73,
            Self::I32Shl => 0x74,
            Self::I32ShrS => 0x75,
            Self::I32ShrU => 0x76,
            Self::I64Add => 0x7C,
            Self::I64Sub => 0x7D,
            Self::I64Mul => 0x7E,
            Self::I64DivS => 0x7F,
            Self::I64RemS => 0x81,
            Self::I64And => 0x83,
            Self::I64Or => 0x84,
            Self::I64Xor => 0x85,
            Self::I64Shl => 0x86,
            Self::I64ShrS => 0x87,
            Self::I64ShrU => 0x88,
            Self::F32Neg => 0x8C,
            Self::F32Add => 0x92,
            Self::F32Sub => 0x93,
            Self::F32Mul => 0x94,
            Self::F32Div => 0x95,
            Self::F64Neg => 0x9A,
            Self::F64Add => 0xA0,
            Self::F64Sub => 0xA1,
            Self::F64Mul => 0xA2,
            Self::F64Div => 0xA3,
            Self::I32WrapI64 => 0xA7,
            Self::I64ExtendI32S => 0xAC,
            Self::F32ConvertI32S => 0xB2,
            Self::F32ConvertI64S => 0xB4,
            Self::F32DemoteF64 => 0xB6,
            Self::F64ConvertI32S => 0xB7,
            Self::F64ConvertI64S => 0xB9,
            Self::F64PromoteF32 => 0xBB,
            Self::I32Extend8S => 0xC0,
            Self::I32Extend16S => 0xC1,
            Self::I32TruncSatF32S => 0x00,
            Self::I32TruncSatF64S => 0x02,
            Self::I64TruncSatF32S => 0x04,
            Self::I64TruncSatF64S => 0x06,
            Self::StructNew => 0x00,
            Self::StructGet => 0x02,
            Self::ArrayNewDefault => 0x07,
            Self::ArrayGet => 0x0B,
            Self::ArrayGetS => 0x0C,
            Self::ArrayGetU => 0x0D,
            Self::ArraySet => 0x0E,
            Self::ArrayLen => 0x0F,
        }
    }

    /// Look up an opcode by prefix and code
    ///
    /// For single-byte opcodes `prefix` is `None`.
    pub fn decode(prefix: Option<u8>, code: u8) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.prefix() == prefix && op.code() == code)
    }

    /// Text format mnemonic
    pub fn name(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Nop => "nop",
            Self::Block => "block",
            Self::Loop => "loop",
            Self::End => "end",
            Self::Br => "br",
            Self::BrIf => "br_if",
            Self::Return => "return",
            Self::Call => "call",
            Self::Drop => "drop",
            Self::LocalGet => "local.get",
            Self::LocalSet => "local.set",
            Self::LocalTee => "local.tee",
            Self::I32Const => "i32.const",
            Self::I64Const => "i64.const",
            Self::F32Const => "f32.const",
            Self::F64Const => "f64.const",
            Self::I32Eqz => "i32.eqz",
            Self::I32Eq => "i32.eq",
            Self::I32Ne => "i32.ne",
            Self::I32LtS => "i32.lt_s",
            Self::I32GtS => "i32.gt_s",
            Self::I32LeS => "i32.le_s",
            Self::I32GeS => "i32.ge_s",
            Self::I64Eqz => "i64.eqz",
            Self::I64Eq => "i64.eq",
            Self::I64Ne => "i64.ne",
            Self::I64LtS => "i64.lt_s",
            Self::I64GtS => "i64.gt_s",
            Self::I64LeS => "i64.le_s",
            Self::I64GeS => "i64.ge_s",
            Self::F32Eq => "f32.eq",
            Self::F32Ne => "f32.ne",
            Self::F32Lt => "f32.lt",
            Self::F32Gt => "f32.gt",
            Self::F32Le => "f32.le",
            Self::F32Ge => "f32.ge",
            Self::F64Eq => "f64.eq",
            Self::F64Ne => "f64.ne",
            Self::F64Lt => "f64.lt",
            Self::F64Gt => "f64.gt",
            Self::F64Le => "f64.le",
            Self::F64Ge => "f64.ge",
            Self::I32Add => "i32.add",
            Self::I32Sub => "i32.sub",
            Self::I32Mul => "i32.mul",
            Self::I32DivS => "i32.div_s",
            Self::I32RemS => "i32.rem_s",
            Self::I32And => "i32.and",
            Self::I32Or => "i32.or",
            Self::I32Xor => "i32.xor",
            Self::I32Shl => "i32.shl",
            Self::I32ShrS => "i32.shr_s",
            Self::I32ShrU => "i32.shr_u",
            Self::I64Add => "i64.add",
            Self::I64Sub => "i64.sub",
            Self::I64Mul => "i64.mul",
            Self::I64DivS => "i64.div_s",
            Self::I64RemS => "i64.rem_s",
            Self::I64And => "i64.and",
            Self::I64Or => "i64.or",
            Self::I64Xor => "i64.xor",
            Self::I64Shl => "i64.shl",
            Self::I64ShrS => "i64.shr_s",
            Self::I64ShrU => "i64.shr_u",
            Self::F32Neg => "f32.neg",
            Self::F32Add => "f32.add",
            Self::F32Sub => "f32.sub",
            Self::F32Mul => "f32.mul",
            Self::F32Div => "f32.div",
            Self::F64Neg => "f64.neg",
            Self::F64Add => "f64.add",
            Self::F64Sub => "f64.sub",
            Self::F64Mul => "f64.mul",
            Self::F64Div => "f64.div",
            Self::I32WrapI64 => "i32.wrap_i64",
            Self::I64ExtendI32S => "i64.extend_i32_s",
            Self::F32ConvertI32S => "f32.convert_i32_s",
            Self::F32ConvertI64S => "f32.convert_i64_s",
            Self::F32DemoteF64 => "f32.demote_f64",
            Self::F64ConvertI32S => "f64.convert_i32_s",
            Self::F64ConvertI64S => "f64.convert_i64_s",
            Self::F64PromoteF32 => "f64.promote_f32",
            Self::I32Extend8S => "i32.extend8_s",
            Self::I32Extend16S => "i32.extend16_s",
            Self::I32TruncSatF32S => "i32.trunc_sat_f32_s",
            Self::I32TruncSatF64S => "i32.trunc_sat_f64_s",
            Self::I64TruncSatF32S => "i64.trunc_sat_f32_s",
            Self::I64TruncSatF64S => "i64.trunc_sat_f64_s",
            Self::StructNew => "struct.new",
            Self::StructGet => "struct.get",
            Self::ArrayNewDefault => "array.new_default",
            Self::ArrayGet => "array.get",
            Self::ArrayGetS => "array.get_s",
            Self::ArrayGetU => "array.get_u",
            Self::ArraySet => "array.set",
            Self::ArrayLen => "array.len",
        }
    }

    /// Check if this opcode transfers control unconditionally
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Unreachable | Self::Br | Self::Return)
    }

    /// Check if this opcode opens a structured block closed by `end`
    pub fn opens_block(self) -> bool {
        matches!(self, Self::Block | Self::Loop)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
