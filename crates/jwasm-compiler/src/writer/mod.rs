//! Module writers
//!
//! A `ModuleWriter` receives one function at a time. Implementations only
//! render `CodeOp`s and calls; the mapping from IR operators to `CodeOp`
//! sequences is shared and lives in the provided methods.
//!
//! Call targets are `FunctionId`s until `finish_module`. Imports are only
//! discovered while code is written, so module function indices (imports
//! first, then bodies) exist once the whole module has been seen.

mod binary;
mod text;

pub use binary::{BinaryModuleWriter, EncodedFunction};
pub use text::TextModuleWriter;

use crate::error::{CompileError, CompileResult};
use crate::functions::{FunctionId, FunctionName, FunctionRegistry};
use crate::ir::lowering::{array_ops, cast_ops, no_lowering, numeric_ops};
use crate::ir::types::ArrayType;
use crate::ir::{ArrayOperator, BlockOperator, CodeOp, NumericOperator, NumericValue};
use crate::ir::{ValueTypeConversion, VariableOperator};
use jwasm_bytecode::{DataSink, Opcode, ValueType, WasmType};

/// Sink for compiled functions and module data
pub trait ModuleWriter {
    /// Start a function body
    ///
    /// `locals` are the declared non-parameter locals; scratch locals used
    /// by the body are appended after them by the writer.
    fn begin_function(
        &mut self,
        id: FunctionId,
        name: &str,
        params: &[WasmType],
        result: Option<WasmType>,
        locals: &[WasmType],
    ) -> CompileResult<()>;

    /// Finish the current function body
    fn end_function(&mut self) -> CompileResult<()>;

    /// Write one target instruction
    fn write_code_op(&mut self, op: &CodeOp) -> CompileResult<()>;

    /// Write a direct call
    ///
    /// `explicit_return` overrides the callee's declared result for the
    /// caller's view of the stack.
    fn write_function_call(
        &mut self,
        name: &FunctionName,
        id: FunctionId,
        explicit_return: Option<WasmType>,
    ) -> CompileResult<()>;

    /// The module's data section
    fn data(&mut self) -> &mut dyn DataSink;

    /// Resolve call targets to module function indices and put the bodies
    /// in index order
    fn finish_module(&mut self, functions: &FunctionRegistry) -> CompileResult<()>;

    /// Write a numeric constant of type `ty`
    fn write_const(&mut self, value: NumericValue, ty: ValueType) -> CompileResult<()> {
        let op = match (value, ty) {
            (NumericValue::I32(v), ValueType::I32) => CodeOp::I32Const(v),
            (NumericValue::I64(v), ValueType::I64) => CodeOp::I64Const(v),
            (NumericValue::F32(v), ValueType::F32) => CodeOp::F32Const(v),
            (NumericValue::F64(v), ValueType::F64) => CodeOp::F64Const(v),
            (value, ty) => {
                return Err(CompileError::internal(format!(
                    "Constant {} is not a {}",
                    value, ty
                )))
            }
        };
        self.write_code_op(&op)
    }

    fn write_cast(&mut self, conversion: ValueTypeConversion) -> CompileResult<()> {
        for op in cast_ops(conversion) {
            self.write_code_op(op)?;
        }
        Ok(())
    }

    fn write_local(&mut self, op: VariableOperator, index: u32) -> CompileResult<()> {
        self.write_code_op(&CodeOp::Indexed(op.opcode(), index))
    }

    fn write_numeric_operator(&mut self, op: NumericOperator, ty: ValueType) -> CompileResult<()> {
        let ops = numeric_ops(op, ty).ok_or_else(|| no_lowering(ty.name(), op))?;
        for op in ops {
            self.write_code_op(op)?;
        }
        Ok(())
    }

    /// Write an inline array operation on a native array type
    fn write_array_operator(&mut self, op: ArrayOperator, array: &ArrayType) -> CompileResult<()> {
        for op in array_ops(op, array)? {
            self.write_code_op(&op)?;
        }
        Ok(())
    }

    fn write_block_operator(&mut self, op: BlockOperator, depth: u32) -> CompileResult<()> {
        let code = match op {
            BlockOperator::Block | BlockOperator::Loop => CodeOp::Block(op.opcode()),
            BlockOperator::Br | BlockOperator::BrIf => CodeOp::Indexed(op.opcode(), depth),
            BlockOperator::Return
            | BlockOperator::Drop
            | BlockOperator::Unreachable
            | BlockOperator::End => CodeOp::Op(op.opcode()),
        };
        self.write_code_op(&code)
    }
}

/// Scratch locals of the function being written
///
/// The n-th scratch local of a type gets the next free index after the
/// declared locals on first use.
#[derive(Debug, Default)]
pub(crate) struct ScratchLocals {
    base: u32,
    slots: Vec<(u8, WasmType)>,
}

impl ScratchLocals {
    pub(crate) fn reset(&mut self, base: u32) {
        self.base = base;
        self.slots.clear();
    }

    pub(crate) fn index(&mut self, n: u8, ty: WasmType) -> u32 {
        let position = match self.slots.iter().position(|slot| *slot == (n, ty)) {
            Some(position) => position,
            None => {
                self.slots.push((n, ty));
                self.slots.len() - 1
            }
        };
        self.base + position as u32
    }

    pub(crate) fn types(&self) -> impl Iterator<Item = WasmType> + '_ {
        self.slots.iter().map(|(_, ty)| *ty)
    }
}

/// Resolve scratch ops to plain local accesses
pub(crate) fn resolve_scratch(op: &CodeOp, scratch: &mut ScratchLocals) -> CodeOp {
    match *op {
        CodeOp::ScratchSet(n, ty) => CodeOp::Indexed(Opcode::LocalSet, scratch.index(n, ty)),
        CodeOp::ScratchGet(n, ty) => CodeOp::Indexed(Opcode::LocalGet, scratch.index(n, ty)),
        other => other,
    }
}

/// Write a complete function whose body is a fixed op sequence
pub fn write_code_function(
    writer: &mut dyn ModuleWriter,
    id: FunctionId,
    name: &str,
    params: &[WasmType],
    result: Option<WasmType>,
    ops: &[CodeOp],
) -> CompileResult<()> {
    writer.begin_function(id, name, params, result, &[])?;
    for op in ops {
        writer.write_code_op(op)?;
    }
    writer.end_function()
}

#[cfg(test)]
mod tests {
    use super::*;

    const I32: WasmType = WasmType::Value(ValueType::I32);
    const F64: WasmType = WasmType::Value(ValueType::F64);

    #[test]
    fn test_scratch_indices_follow_locals() {
        let mut scratch = ScratchLocals::default();
        scratch.reset(3);
        assert_eq!(scratch.index(0, I32), 3);
        assert_eq!(scratch.index(1, F64), 4);
        assert_eq!(scratch.index(0, I32), 3);
        assert_eq!(scratch.index(1, I32), 5);
        assert_eq!(scratch.types().collect::<Vec<_>>(), vec![I32, F64, I32]);

        scratch.reset(0);
        assert_eq!(scratch.index(1, F64), 0);
    }

    #[test]
    fn test_resolve_scratch() {
        let mut scratch = ScratchLocals::default();
        scratch.reset(2);
        assert_eq!(
            resolve_scratch(&CodeOp::ScratchSet(0, I32), &mut scratch),
            CodeOp::Indexed(Opcode::LocalSet, 2)
        );
        assert_eq!(
            resolve_scratch(&CodeOp::ScratchGet(0, I32), &mut scratch),
            CodeOp::Indexed(Opcode::LocalGet, 2)
        );
        assert_eq!(
            resolve_scratch(&CodeOp::I32Const(4), &mut scratch),
            CodeOp::I32Const(4)
        );
    }
}
