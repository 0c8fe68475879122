//! IR Instructions
//!
//! An `Instruction` is a source position plus an `InstrKind`. Every kind
//! answers the same four questions: what it pushes, how many values it pops,
//! which types those are (bottom to top), and how it is written to a
//! `ModuleWriter`. Unknown operator/type combinations are internal errors,
//! never silent defaults.

use std::cell::OnceCell;

use crate::error::{CompileError, CompileResult};
use crate::functions::{FunctionName, FunctionRegistry};
use crate::ir::types::{ArrayId, TypeRegistry};
use crate::ir::{array, lowering};
use crate::ir::{
    AnyType, ArrayOperator, BlockOperator, HostNumber, NumericOperator, NumericValue,
    ValueTypeConversion, VariableOperator,
};
use crate::locals::LocalVariableManager;
use crate::options::CompilerOptions;
use crate::strings;
use crate::writer::ModuleWriter;
use jwasm_bytecode::ValueType;

/// Origin of an instruction in the source bytecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodePosition {
    /// Byte offset in the source method's code
    pub offset: i32,
    /// Source line number, negative if unknown
    pub line: i32,
}

impl CodePosition {
    pub fn new(offset: i32, line: i32) -> Self {
        Self { offset, line }
    }

    /// Position of synthesized code
    pub fn unknown() -> Self {
        Self {
            offset: -1,
            line: -1,
        }
    }
}

impl std::fmt::Display for CodePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.offset >= 0, self.line >= 0) {
            (true, true) => write!(f, "offset {} (line {})", self.offset, self.line),
            (true, false) => write!(f, "offset {}", self.offset),
            (false, true) => write!(f, "line {}", self.line),
            (false, false) => write!(f, "unknown position"),
        }
    }
}

/// Registries an instruction needs while it is written
pub struct EmitContext<'a> {
    pub options: &'a CompilerOptions,
    pub types: &'a TypeRegistry,
    pub functions: &'a mut FunctionRegistry,
}

/// Instruction kinds
#[derive(Debug, Clone)]
pub enum InstrKind {
    /// Numeric constant
    Const { value: NumericValue },

    /// Numeric conversion
    Convert { conversion: ValueTypeConversion },

    /// Access to a target local index; its type is looked up once and cached
    Local {
        op: VariableOperator,
        index: u32,
        value_type: OnceCell<AnyType>,
    },

    /// Access to a source slot, translated through the slot manager
    LoadStore {
        op: VariableOperator,
        slot: u32,
        ty: AnyType,
        resolved: OnceCell<u32>,
    },

    /// Arithmetic, bitwise or comparison operator
    Numeric { op: NumericOperator, ty: ValueType },

    /// Array operation on an interned array type
    Array {
        op: ArrayOperator,
        element: AnyType,
        array: ArrayId,
    },

    /// Direct call
    Call {
        name: FunctionName,
        explicit_return: Option<AnyType>,
    },

    /// Load of an interned string literal
    StringConst { id: u32, ty: AnyType },

    /// Structured control or stack operator
    ///
    /// `ty` is the operand type of `RETURN` and `DROP`; `depth` is the label
    /// of `BR` and `BR_IF`.
    Block {
        op: BlockOperator,
        ty: Option<AnyType>,
        depth: u32,
    },
}

/// A single instruction node
#[derive(Debug, Clone)]
pub struct Instruction {
    position: CodePosition,
    kind: InstrKind,
}

impl Instruction {
    pub fn new(kind: InstrKind, position: CodePosition) -> Self {
        Self { position, kind }
    }

    /// Numeric constant from a literal
    pub fn constant(value: NumericValue, position: CodePosition) -> Self {
        Self::new(InstrKind::Const { value }, position)
    }

    /// Numeric constant from a boxed source number
    pub fn host_constant(value: HostNumber, position: CodePosition) -> CompileResult<Self> {
        Ok(Self::constant(value.to_numeric(position)?, position))
    }

    pub fn convert(conversion: ValueTypeConversion, position: CodePosition) -> Self {
        Self::new(InstrKind::Convert { conversion }, position)
    }

    pub fn local(op: VariableOperator, index: u32, position: CodePosition) -> Self {
        Self::new(
            InstrKind::Local {
                op,
                index,
                value_type: OnceCell::new(),
            },
            position,
        )
    }

    pub fn load_store(op: VariableOperator, slot: u32, ty: AnyType, position: CodePosition) -> Self {
        Self::new(
            InstrKind::LoadStore {
                op,
                slot,
                ty,
                resolved: OnceCell::new(),
            },
            position,
        )
    }

    pub fn numeric(op: NumericOperator, ty: ValueType, position: CodePosition) -> Self {
        Self::new(InstrKind::Numeric { op, ty }, position)
    }

    pub fn array(op: ArrayOperator, element: AnyType, array: ArrayId, position: CodePosition) -> Self {
        Self::new(InstrKind::Array { op, element, array }, position)
    }

    pub fn call(name: FunctionName, explicit_return: Option<AnyType>, position: CodePosition) -> Self {
        Self::new(
            InstrKind::Call {
                name,
                explicit_return,
            },
            position,
        )
    }

    pub fn string_const(id: u32, ty: AnyType, position: CodePosition) -> Self {
        Self::new(InstrKind::StringConst { id, ty }, position)
    }

    pub fn block(op: BlockOperator, ty: Option<AnyType>, depth: u32, position: CodePosition) -> Self {
        Self::new(InstrKind::Block { op, ty, depth }, position)
    }

    pub fn position(&self) -> CodePosition {
        self.position
    }

    pub fn kind(&self) -> &InstrKind {
        &self.kind
    }

    /// The block operator, if this is a block instruction
    pub fn block_operator(&self) -> Option<BlockOperator> {
        match &self.kind {
            InstrKind::Block { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Translate a source slot to its target local
    ///
    /// Only `LoadStore` instructions are affected; repeated calls are no-ops.
    pub fn resolve_locals(&self, locals: &mut LocalVariableManager) {
        if let InstrKind::LoadStore {
            slot, ty, resolved, ..
        } = &self.kind
        {
            if resolved.get().is_none() {
                let index = locals.resolve(*slot, *ty, self.position);
                let _ = resolved.set(index);
            }
        }
    }

    /// The type pushed onto the operand stack, `None` for no push
    pub fn push_type(&self, locals: &LocalVariableManager) -> CompileResult<Option<AnyType>> {
        let pushed = match &self.kind {
            InstrKind::Const { value } => Some(AnyType::Value(value.value_type())),
            InstrKind::Convert { conversion } => Some(AnyType::Value(conversion.push_type())),
            InstrKind::Local {
                op,
                index,
                value_type,
            } => match op {
                VariableOperator::Get | VariableOperator::Tee => {
                    Some(self.local_type(*index, value_type, locals)?)
                }
                VariableOperator::Set => None,
            },
            InstrKind::LoadStore { op, ty, .. } => match op {
                VariableOperator::Get | VariableOperator::Tee => Some(ty.stack_type()),
                VariableOperator::Set => None,
            },
            InstrKind::Numeric { op, ty } => {
                self.check_numeric(*op, *ty)?;
                if op.is_comparison() {
                    Some(AnyType::I32)
                } else {
                    Some(AnyType::Value(*ty))
                }
            }
            InstrKind::Array { op, element, array } => match op {
                ArrayOperator::New | ArrayOperator::NewArrayWithRtt => Some(AnyType::Array(*array)),
                ArrayOperator::Get => Some(*element),
                ArrayOperator::GetS | ArrayOperator::GetU => Some(extended_element(*element)),
                ArrayOperator::Set => None,
                ArrayOperator::Len => Some(AnyType::I32),
            },
            InstrKind::Call {
                name,
                explicit_return,
            } => explicit_return.or(name.result),
            InstrKind::StringConst { ty, .. } => Some(*ty),
            InstrKind::Block { .. } => {
                self.block_pop_types()?;
                None
            }
        };
        Ok(pushed)
    }

    /// Number of values popped from the operand stack
    pub fn pop_count(&self) -> CompileResult<usize> {
        let count = match &self.kind {
            InstrKind::Const { .. } | InstrKind::StringConst { .. } => 0,
            InstrKind::Convert { .. } => 1,
            InstrKind::Local { op, .. } | InstrKind::LoadStore { op, .. } => match op {
                VariableOperator::Get => 0,
                VariableOperator::Set | VariableOperator::Tee => 1,
            },
            InstrKind::Numeric { op, ty } => {
                self.check_numeric(*op, *ty)?;
                if op.is_unary() {
                    1
                } else {
                    2
                }
            }
            InstrKind::Array { op, .. } => match op {
                ArrayOperator::New | ArrayOperator::Len => 1,
                ArrayOperator::NewArrayWithRtt
                | ArrayOperator::Get
                | ArrayOperator::GetS
                | ArrayOperator::GetU => 2,
                ArrayOperator::Set => 3,
            },
            InstrKind::Call { name, .. } => name.params.len(),
            InstrKind::Block { .. } => self.block_pop_types()?.len(),
        };
        Ok(count)
    }

    /// Types popped from the operand stack, bottom to top; `None` if nothing is popped
    pub fn pop_types(&self, locals: &LocalVariableManager) -> CompileResult<Option<Vec<AnyType>>> {
        let types = match &self.kind {
            InstrKind::Const { .. } | InstrKind::StringConst { .. } => Vec::new(),
            InstrKind::Convert { conversion } => vec![AnyType::Value(conversion.pop_type())],
            InstrKind::Local {
                op,
                index,
                value_type,
            } => match op {
                VariableOperator::Get => Vec::new(),
                VariableOperator::Set | VariableOperator::Tee => {
                    vec![self.local_type(*index, value_type, locals)?]
                }
            },
            InstrKind::LoadStore { op, ty, .. } => match op {
                VariableOperator::Get => Vec::new(),
                VariableOperator::Set | VariableOperator::Tee => vec![ty.stack_type()],
            },
            InstrKind::Numeric { op, ty } => {
                self.check_numeric(*op, *ty)?;
                let operand = AnyType::Value(*ty);
                if op.is_unary() {
                    vec![operand]
                } else {
                    vec![operand, operand]
                }
            }
            InstrKind::Array { op, element, array } => {
                let array = AnyType::Array(*array);
                match op {
                    ArrayOperator::New => vec![AnyType::I32],
                    ArrayOperator::NewArrayWithRtt => vec![AnyType::I32, AnyType::I32],
                    ArrayOperator::Get | ArrayOperator::GetS | ArrayOperator::GetU => {
                        vec![array, AnyType::I32]
                    }
                    ArrayOperator::Set => vec![array, AnyType::I32, element.stack_type()],
                    ArrayOperator::Len => vec![array],
                }
            }
            InstrKind::Call { name, .. } => name.params.iter().map(|p| p.stack_type()).collect(),
            InstrKind::Block { .. } => self.block_pop_types()?,
        };
        Ok(if types.is_empty() { None } else { Some(types) })
    }

    /// Write this instruction to a module writer
    ///
    /// Array and string instructions register the helper functions they
    /// call; registration is idempotent.
    pub fn write_to(&self, writer: &mut dyn ModuleWriter, ctx: &mut EmitContext<'_>) -> CompileResult<()> {
        self.emit(writer, ctx)
            .map_err(|err| err.with_position(self.position))
    }

    fn emit(&self, writer: &mut dyn ModuleWriter, ctx: &mut EmitContext<'_>) -> CompileResult<()> {
        match &self.kind {
            InstrKind::Const { value } => writer.write_const(*value, value.value_type()),
            InstrKind::Convert { conversion } => writer.write_cast(*conversion),
            InstrKind::Local { op, index, .. } => writer.write_local(*op, *index),
            InstrKind::LoadStore {
                op, slot, resolved, ..
            } => {
                let index = resolved.get().copied().ok_or_else(|| {
                    CompileError::internal(format!("Source slot {} was not resolved", slot))
                })?;
                writer.write_local(*op, index)
            }
            InstrKind::Numeric { op, ty } => writer.write_numeric_operator(*op, *ty),
            InstrKind::Array { op, element, array } => match array::select(*op, *array, ctx)? {
                Some(helper) => {
                    let name = ctx.functions.entry(helper)?.name.clone();
                    writer.write_function_call(&name, helper, None)?;
                    for code in lowering::host_extension_ops(*op, *element) {
                        writer.write_code_op(code)?;
                    }
                    Ok(())
                }
                None => writer.write_array_operator(*op, ctx.types.array(*array)?),
            },
            InstrKind::Call {
                name,
                explicit_return,
            } => {
                let id = ctx.functions.mark_as_needed(name, false);
                let explicit_return = match explicit_return {
                    Some(ty) => Some(ctx.types.lower(*ty)?),
                    None => None,
                };
                writer.write_function_call(name, id, explicit_return)
            }
            InstrKind::StringConst { id, .. } => {
                let accessor = strings::string_constant_function(ctx.options, ctx.types);
                let accessor_id = ctx.functions.mark_as_needed(&accessor, false);
                // Placeholder body until the pool is finalized
                ctx.functions.mark_synthetic_as_needed(
                    &strings::strings_offset_function(ctx.options),
                    strings::strings_offset_body(0)?,
                );
                let id = i32::try_from(*id)
                    .map_err(|_| CompileError::internal(format!("String id {} exceeds i32", id)))?;
                writer.write_const(NumericValue::I32(id), ValueType::I32)?;
                writer.write_function_call(&accessor, accessor_id, None)
            }
            InstrKind::Block { op, depth, .. } => {
                self.block_pop_types()?;
                writer.write_block_operator(*op, *depth)
            }
        }
    }

    fn local_type(
        &self,
        index: u32,
        cache: &OnceCell<AnyType>,
        locals: &LocalVariableManager,
    ) -> CompileResult<AnyType> {
        if let Some(ty) = cache.get() {
            return Ok(*ty);
        }
        let ty = locals
            .get_value_type(index)
            .map_err(|err| err.with_position(self.position))?;
        let _ = cache.set(ty);
        Ok(ty)
    }

    fn check_numeric(&self, op: NumericOperator, ty: ValueType) -> CompileResult<()> {
        if lowering::numeric_ops(op, ty).is_some() {
            Ok(())
        } else {
            Err(CompileError::UnknownOperator {
                operator: format!("{}.{}", ty, op),
                kind: "numeric",
                position: Some(self.position),
            })
        }
    }

    fn block_pop_types(&self) -> CompileResult<Vec<AnyType>> {
        let InstrKind::Block { op, ty, .. } = &self.kind else {
            return Ok(Vec::new());
        };
        match (op, ty) {
            (BlockOperator::Return, ty) => Ok(ty.iter().map(|t| t.stack_type()).collect()),
            (BlockOperator::Drop, Some(ty)) => Ok(vec![ty.stack_type()]),
            (BlockOperator::Drop, None) => Err(CompileError::internal_at(
                "DROP without an operand type",
                self.position,
            )),
            (BlockOperator::BrIf, None) => Ok(vec![AnyType::I32]),
            (
                BlockOperator::Unreachable
                | BlockOperator::Block
                | BlockOperator::Loop
                | BlockOperator::End
                | BlockOperator::Br,
                None,
            ) => Ok(Vec::new()),
            (op, Some(ty)) => Err(CompileError::UnknownOperator {
                operator: format!("{} with operand {}", op, ty),
                kind: "block",
                position: Some(self.position),
            }),
        }
    }
}

/// Push type of a sign- or zero-extending array read
///
/// Packed element types come out widened to `i32`; everything else is
/// returned as stored.
fn extended_element(element: AnyType) -> AnyType {
    match element {
        AnyType::Value(ValueType::I8)
        | AnyType::Value(ValueType::I16)
        | AnyType::Value(ValueType::U16)
        | AnyType::Value(ValueType::Bool) => AnyType::I32,
        other => other,
    }
}
