//! Binary module writer
//!
//! Function bodies are buffered until `end_function`, because the local
//! declarations at the start of a body include scratch locals that are only
//! known once the code has been written. Call immediates are spliced in by
//! `finish_module`, when module function indices are known.

use super::{resolve_scratch, ModuleWriter, ScratchLocals};
use crate::error::{CompileError, CompileResult};
use crate::functions::{FunctionId, FunctionName, FunctionRegistry, ModuleIndices};
use crate::ir::CodeOp;
use jwasm_bytecode::opcode::BLOCK_TYPE_EMPTY;
use jwasm_bytecode::{BytecodeWriter, DataSection, DataSink, Opcode, WasmType};

/// A finished function body
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFunction {
    pub id: FunctionId,
    /// Module function index
    pub index: u32,
    pub name: String,
    pub params: Vec<WasmType>,
    pub result: Option<WasmType>,
    /// Size-prefixed body: locals, code, `end`
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct OpenFunction {
    id: FunctionId,
    name: String,
    params: Vec<WasmType>,
    result: Option<WasmType>,
    locals: Vec<WasmType>,
}

/// A body whose call immediates are not written yet
#[derive(Debug)]
struct BufferedFunction {
    id: FunctionId,
    name: String,
    params: Vec<WasmType>,
    result: Option<WasmType>,
    /// Local declarations, code and `end`
    body: Vec<u8>,
    /// Offsets in `body` that take the index of a called function
    calls: Vec<(usize, FunctionId)>,
}

impl BufferedFunction {
    fn resolve(self, indices: &ModuleIndices) -> CompileResult<EncodedFunction> {
        let mut body = BytecodeWriter::with_capacity(self.body.len() + self.calls.len() * 2);
        let mut copied = 0;
        for (offset, callee) in &self.calls {
            body.emit_bytes(&self.body[copied..*offset]);
            body.emit_varuint(indices.get(*callee)?);
            copied = *offset;
        }
        body.emit_bytes(&self.body[copied..]);

        let mut bytes = BytecodeWriter::with_capacity(body.offset() + 5);
        bytes.emit_varuint_checked(body.offset() as i64)?;
        bytes.emit_bytes(body.buffer());

        Ok(EncodedFunction {
            id: self.id,
            index: indices.get(self.id)?,
            name: self.name,
            params: self.params,
            result: self.result,
            bytes: bytes.into_bytes(),
        })
    }
}

/// Writer producing code section entries and a data section
#[derive(Debug, Default)]
pub struct BinaryModuleWriter {
    buffered: Vec<BufferedFunction>,
    functions: Vec<EncodedFunction>,
    import_count: u32,
    data: DataSection,
    current: Option<OpenFunction>,
    code: BytecodeWriter,
    calls: Vec<(usize, FunctionId)>,
    scratch: ScratchLocals,
}

impl BinaryModuleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished functions in module index order
    ///
    /// Empty until `finish_module` has run.
    pub fn functions(&self) -> &[EncodedFunction] {
        &self.functions
    }

    /// Look up a finished function by name
    pub fn function(&self, name: &str) -> Option<&EncodedFunction> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn data_section(&self) -> &DataSection {
        &self.data
    }

    /// Encode the code section payload: function count, then each body
    ///
    /// Every function after the imports must have a body.
    pub fn encode_code_section(&self) -> CompileResult<Vec<u8>> {
        if !self.buffered.is_empty() {
            return Err(CompileError::internal(
                "Code section encoded before the module was finished",
            ));
        }
        let mut writer = BytecodeWriter::new();
        writer.emit_varuint_checked(self.functions.len() as i64)?;
        for (position, function) in self.functions.iter().enumerate() {
            let expected = self.import_count + position as u32;
            if function.index != expected {
                return Err(CompileError::internal(format!(
                    "Function index {} has no body",
                    expected
                )));
            }
            writer.emit_bytes(&function.bytes);
        }
        Ok(writer.into_bytes())
    }

    /// Encode the data section payload
    pub fn encode_data_section(&self) -> CompileResult<Vec<u8>> {
        let mut writer = BytecodeWriter::new();
        self.data.encode_active_segment(&mut writer)?;
        Ok(writer.into_bytes())
    }

    fn open(&self) -> CompileResult<&OpenFunction> {
        self.current
            .as_ref()
            .ok_or_else(|| CompileError::internal("No function is being written"))
    }
}

impl ModuleWriter for BinaryModuleWriter {
    fn begin_function(
        &mut self,
        id: FunctionId,
        name: &str,
        params: &[WasmType],
        result: Option<WasmType>,
        locals: &[WasmType],
    ) -> CompileResult<()> {
        if let Some(open) = &self.current {
            return Err(CompileError::internal(format!(
                "Function {} started while {} is still open",
                name, open.name
            )));
        }
        self.code.clear();
        self.calls.clear();
        self.scratch.reset((params.len() + locals.len()) as u32);
        self.current = Some(OpenFunction {
            id,
            name: name.to_string(),
            params: params.to_vec(),
            result,
            locals: locals.to_vec(),
        });
        Ok(())
    }

    fn end_function(&mut self) -> CompileResult<()> {
        let open = self
            .current
            .take()
            .ok_or_else(|| CompileError::internal("end_function without begin_function"))?;

        let mut body = BytecodeWriter::new();
        let declared: Vec<WasmType> = open
            .locals
            .iter()
            .copied()
            .chain(self.scratch.types())
            .collect();
        let groups = run_lengths(&declared);
        body.emit_varuint_checked(groups.len() as i64)?;
        for (count, ty) in groups {
            body.emit_varuint_checked(count as i64)?;
            ty.encode(&mut body);
        }
        let header = body.offset();
        body.emit_bytes(self.code.buffer());
        body.emit_opcode(Opcode::End);

        log::debug!(
            "encoded {}: {} locals, {} bytes, {} calls",
            open.name,
            declared.len(),
            body.offset(),
            self.calls.len()
        );
        self.buffered.push(BufferedFunction {
            id: open.id,
            name: open.name,
            params: open.params,
            result: open.result,
            body: body.into_bytes(),
            calls: self
                .calls
                .drain(..)
                .map(|(offset, callee)| (header + offset, callee))
                .collect(),
        });
        self.code.clear();
        Ok(())
    }

    fn write_code_op(&mut self, op: &CodeOp) -> CompileResult<()> {
        self.open()?;
        match resolve_scratch(op, &mut self.scratch) {
            CodeOp::Op(opcode) => self.code.emit_opcode(opcode),
            CodeOp::I32Const(value) => self.code.emit_i32_const(value),
            CodeOp::I64Const(value) => self.code.emit_i64_const(value),
            CodeOp::F32Const(value) => self.code.emit_f32_const(value),
            CodeOp::F64Const(value) => self.code.emit_f64_const(value),
            CodeOp::Indexed(opcode, index) => self.code.emit_with_index(opcode, index),
            CodeOp::StructGet { type_index, field } => {
                self.code.emit_struct_get(type_index, field)
            }
            CodeOp::Block(opcode) => {
                self.code.emit_opcode(opcode);
                self.code.emit_u8(BLOCK_TYPE_EMPTY);
            }
            CodeOp::ScratchSet(..) | CodeOp::ScratchGet(..) => {
                return Err(CompileError::internal("Unresolved scratch local"))
            }
        }
        Ok(())
    }

    fn write_function_call(
        &mut self,
        name: &FunctionName,
        id: FunctionId,
        explicit_return: Option<WasmType>,
    ) -> CompileResult<()> {
        self.open()?;
        if let Some(ty) = explicit_return {
            log::trace!("call {} viewed as returning {}", name, ty);
        }
        self.code.emit_opcode(Opcode::Call);
        self.calls.push((self.code.offset(), id));
        Ok(())
    }

    fn data(&mut self) -> &mut dyn DataSink {
        &mut self.data
    }

    fn finish_module(&mut self, functions: &FunctionRegistry) -> CompileResult<()> {
        if let Some(open) = &self.current {
            return Err(CompileError::internal(format!(
                "Module finished while {} is still open",
                open.name
            )));
        }
        let indices = ModuleIndices::new(functions);
        for buffered in std::mem::take(&mut self.buffered) {
            self.functions.push(buffered.resolve(&indices)?);
        }
        self.functions.sort_by_key(|function| function.index);
        if let Some(pair) = self.functions.windows(2).find(|pair| pair[0].index == pair[1].index) {
            return Err(CompileError::internal(format!(
                "Function {} written twice",
                pair[1].name
            )));
        }
        self.import_count = indices.import_count();
        Ok(())
    }
}

/// Collapse consecutive equal types into `(count, type)` groups
fn run_lengths(types: &[WasmType]) -> Vec<(u32, WasmType)> {
    let mut groups: Vec<(u32, WasmType)> = Vec::new();
    for ty in types {
        match groups.last_mut() {
            Some((count, last)) if last == ty => *count += 1,
            _ => groups.push((1, *ty)),
        }
    }
    groups
}
