//! Lowering of IR operators to target code
//!
//! Every writer renders the same `CodeOp` sequences, so the binary and text
//! outputs can never disagree about what an operator means.

use crate::error::{CompileError, CompileResult};
use crate::ir::types::{ArrayType, ARRAY_FIELD_BUFFER};
use crate::ir::{AnyType, ArrayOperator, NumericOperator, ValueTypeConversion};
use jwasm_bytecode::{Opcode, ValueType, WasmType};

/// One target instruction with its immediates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodeOp {
    /// Opcode without immediates
    Op(Opcode),
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    /// Opcode with one index immediate (locals, calls, branches, type indices)
    Indexed(Opcode, u32),
    /// `struct.get type field`
    StructGet { type_index: u32, field: u32 },
    /// `block` or `loop` without parameters or results
    Block(Opcode),
    /// Store into the n-th scratch local of a type
    ScratchSet(u8, WasmType),
    /// Load from the n-th scratch local of a type
    ScratchGet(u8, WasmType),
}

const I32: WasmType = WasmType::Value(ValueType::I32);

/// Instruction sequence of a numeric conversion
pub fn cast_ops(conversion: ValueTypeConversion) -> &'static [CodeOp] {
    use ValueTypeConversion::*;
    match conversion {
        L2I => &[CodeOp::Op(Opcode::I32WrapI64)],
        F2I => &[CodeOp::Op(Opcode::I32TruncSatF32S)],
        D2I => &[CodeOp::Op(Opcode::I32TruncSatF64S)],
        I2B => &[CodeOp::Op(Opcode::I32Extend8S)],
        I2C => &[CodeOp::I32Const(0xFFFF), CodeOp::Op(Opcode::I32And)],
        I2S => &[CodeOp::Op(Opcode::I32Extend16S)],
        I2L => &[CodeOp::Op(Opcode::I64ExtendI32S)],
        F2L => &[CodeOp::Op(Opcode::I64TruncSatF32S)],
        D2L => &[CodeOp::Op(Opcode::I64TruncSatF64S)],
        I2F => &[CodeOp::Op(Opcode::F32ConvertI32S)],
        L2F => &[CodeOp::Op(Opcode::F32ConvertI64S)],
        D2F => &[CodeOp::Op(Opcode::F32DemoteF64)],
        I2D => &[CodeOp::Op(Opcode::F64ConvertI32S)],
        L2D => &[CodeOp::Op(Opcode::F64ConvertI64S)],
        F2D => &[CodeOp::Op(Opcode::F64PromoteF32)],
    }
}

/// Instruction sequence of a numeric operator, `None` if the pair is illegal
///
/// Integer negation has no opcode and multiplies by `-1`.
pub fn numeric_ops(op: NumericOperator, ty: ValueType) -> Option<&'static [CodeOp]> {
    use NumericOperator as N;
    use Opcode as O;
    let ops: &'static [CodeOp] = match (ty, op) {
        (ValueType::I32, N::Add) => &[CodeOp::Op(O::I32Add)],
        (ValueType::I32, N::Sub) => &[CodeOp::Op(O::I32Sub)],
        (ValueType::I32, N::Mul) => &[CodeOp::Op(O::I32Mul)],
        (ValueType::I32, N::Div) => &[CodeOp::Op(O::I32DivS)],
        (ValueType::I32, N::Rem) => &[CodeOp::Op(O::I32RemS)],
        (ValueType::I32, N::And) => &[CodeOp::Op(O::I32And)],
        (ValueType::I32, N::Or) => &[CodeOp::Op(O::I32Or)],
        (ValueType::I32, N::Xor) => &[CodeOp::Op(O::I32Xor)],
        (ValueType::I32, N::Shl) => &[CodeOp::Op(O::I32Shl)],
        (ValueType::I32, N::ShrS) => &[CodeOp::Op(O::I32ShrS)],
        (ValueType::I32, N::ShrU) => &[CodeOp::Op(O::I32ShrU)],
        (ValueType::I32, N::Eq) => &[CodeOp::Op(O::I32Eq)],
        (ValueType::I32, N::Ne) => &[CodeOp::Op(O::I32Ne)],
        (ValueType::I32, N::Lt) => &[CodeOp::Op(O::I32LtS)],
        (ValueType::I32, N::Le) => &[CodeOp::Op(O::I32LeS)],
        (ValueType::I32, N::Gt) => &[CodeOp::Op(O::I32GtS)],
        (ValueType::I32, N::Ge) => &[CodeOp::Op(O::I32GeS)],
        (ValueType::I32, N::Eqz) => &[CodeOp::Op(O::I32Eqz)],
        (ValueType::I32, N::Neg) => &[CodeOp::I32Const(-1), CodeOp::Op(O::I32Mul)],

        (ValueType::I64, N::Add) => &[CodeOp::Op(O::I64Add)],
        (ValueType::I64, N::Sub) => &[CodeOp::Op(O::I64Sub)],
        (ValueType::I64, N::Mul) => &[CodeOp::Op(O::I64Mul)],
        (ValueType::I64, N::Div) => &[CodeOp::Op(O::I64DivS)],
        (ValueType::I64, N::Rem) => &[CodeOp::Op(O::I64RemS)],
        (ValueType::I64, N::And) => &[CodeOp::Op(O::I64And)],
        (ValueType::I64, N::Or) => &[CodeOp::Op(O::I64Or)],
        (ValueType::I64, N::Xor) => &[CodeOp::Op(O::I64Xor)],
        (ValueType::I64, N::Shl) => &[CodeOp::Op(O::I64Shl)],
        (ValueType::I64, N::ShrS) => &[CodeOp::Op(O::I64ShrS)],
        (ValueType::I64, N::ShrU) => &[CodeOp::Op(O::I64ShrU)],
        (ValueType::I64, N::Eq) => &[CodeOp::Op(O::I64Eq)],
        (ValueType::I64, N::Ne) => &[CodeOp::Op(O::I64Ne)],
        (ValueType::I64, N::Lt) => &[CodeOp::Op(O::I64LtS)],
        (ValueType::I64, N::Le) => &[CodeOp::Op(O::I64LeS)],
        (ValueType::I64, N::Gt) => &[CodeOp::Op(O::I64GtS)],
        (ValueType::I64, N::Ge) => &[CodeOp::Op(O::I64GeS)],
        (ValueType::I64, N::Eqz) => &[CodeOp::Op(O::I64Eqz)],
        (ValueType::I64, N::Neg) => &[CodeOp::I64Const(-1), CodeOp::Op(O::I64Mul)],

        (ValueType::F32, N::Add) => &[CodeOp::Op(O::F32Add)],
        (ValueType::F32, N::Sub) => &[CodeOp::Op(O::F32Sub)],
        (ValueType::F32, N::Mul) => &[CodeOp::Op(O::F32Mul)],
        (ValueType::F32, N::Div) => &[CodeOp::Op(O::F32Div)],
        (ValueType::F32, N::Neg) => &[CodeOp::Op(O::F32Neg)],
        (ValueType::F32, N::Eq) => &[CodeOp::Op(O::F32Eq)],
        (ValueType::F32, N::Ne) => &[CodeOp::Op(O::F32Ne)],
        (ValueType::F32, N::Lt) => &[CodeOp::Op(O::F32Lt)],
        (ValueType::F32, N::Le) => &[CodeOp::Op(O::F32Le)],
        (ValueType::F32, N::Gt) => &[CodeOp::Op(O::F32Gt)],
        (ValueType::F32, N::Ge) => &[CodeOp::Op(O::F32Ge)],

        (ValueType::F64, N::Add) => &[CodeOp::Op(O::F64Add)],
        (ValueType::F64, N::Sub) => &[CodeOp::Op(O::F64Sub)],
        (ValueType::F64, N::Mul) => &[CodeOp::Op(O::F64Mul)],
        (ValueType::F64, N::Div) => &[CodeOp::Op(O::F64Div)],
        (ValueType::F64, N::Neg) => &[CodeOp::Op(O::F64Neg)],
        (ValueType::F64, N::Eq) => &[CodeOp::Op(O::F64Eq)],
        (ValueType::F64, N::Ne) => &[CodeOp::Op(O::F64Ne)],
        (ValueType::F64, N::Lt) => &[CodeOp::Op(O::F64Lt)],
        (ValueType::F64, N::Le) => &[CodeOp::Op(O::F64Le)],
        (ValueType::F64, N::Gt) => &[CodeOp::Op(O::F64Gt)],
        (ValueType::F64, N::Ge) => &[CodeOp::Op(O::F64Ge)],

        _ => return None,
    };
    Some(ops)
}

/// Inline instruction sequence of an array access on native arrays
///
/// The array reference points at the wrapper struct, so every access first
/// loads the backing buffer from field 2. Operands above the reference are
/// parked in scratch locals meanwhile. Allocation always calls an
/// `array_new_*` helper and has no inline form.
pub fn array_ops(op: ArrayOperator, array: &ArrayType) -> CompileResult<Vec<CodeOp>> {
    let native = array.native()?;
    let buffer = CodeOp::StructGet {
        type_index: array.type_index,
        field: ARRAY_FIELD_BUFFER,
    };
    let ops = match op {
        ArrayOperator::New | ArrayOperator::NewArrayWithRtt => {
            return Err(no_lowering("inline native arrays", op))
        }
        ArrayOperator::Get | ArrayOperator::GetS | ArrayOperator::GetU => vec![
            CodeOp::ScratchSet(0, I32),
            buffer,
            CodeOp::ScratchGet(0, I32),
            CodeOp::Indexed(get_opcode(op, native.storage), native.type_index),
        ],
        ArrayOperator::Set => vec![
            CodeOp::ScratchSet(1, array.element_local),
            CodeOp::ScratchSet(0, I32),
            buffer,
            CodeOp::ScratchGet(0, I32),
            CodeOp::ScratchGet(1, array.element_local),
            CodeOp::Indexed(Opcode::ArraySet, native.type_index),
        ],
        ArrayOperator::Len => vec![buffer, CodeOp::Op(Opcode::ArrayLen)],
    };
    Ok(ops)
}

/// Read opcode for a storage type
///
/// Packed storage cannot use plain `array.get`; a plain GET picks the
/// extension matching the element's signedness.
fn get_opcode(op: ArrayOperator, storage: WasmType) -> Opcode {
    match storage {
        WasmType::Value(ValueType::I8) | WasmType::Value(ValueType::I16) => match op {
            ArrayOperator::GetU => Opcode::ArrayGetU,
            _ => Opcode::ArrayGetS,
        },
        WasmType::Value(ValueType::U16) | WasmType::Value(ValueType::Bool) => match op {
            ArrayOperator::GetS => Opcode::ArrayGetS,
            _ => Opcode::ArrayGetU,
        },
        _ => Opcode::ArrayGet,
    }
}

/// Extension applied after a host helper read
///
/// Host buffers are signed for `i8`/`i16` and unsigned for `u16`/`bool`,
/// the same as a plain native read. Only the opposite extension needs code.
pub fn host_extension_ops(op: ArrayOperator, element: AnyType) -> &'static [CodeOp] {
    match (op, element) {
        (ArrayOperator::GetU, AnyType::Value(ValueType::I8)) => {
            &[CodeOp::I32Const(0xFF), CodeOp::Op(Opcode::I32And)]
        }
        (ArrayOperator::GetU, AnyType::Value(ValueType::I16)) => {
            &[CodeOp::I32Const(0xFFFF), CodeOp::Op(Opcode::I32And)]
        }
        (ArrayOperator::GetS, AnyType::Value(ValueType::Bool)) => {
            &[CodeOp::Op(Opcode::I32Extend8S)]
        }
        (ArrayOperator::GetS, AnyType::Value(ValueType::U16)) => {
            &[CodeOp::Op(Opcode::I32Extend16S)]
        }
        _ => &[],
    }
}

/// Error for an operator/type pair with no lowering
pub fn no_lowering(what: &str, operator: impl std::fmt::Display) -> CompileError {
    CompileError::internal(format!("No lowering of {} for {}", operator, what))
}
