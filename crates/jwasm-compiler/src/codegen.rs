//! Module Code Generation
//!
//! `ModuleCompiler` is the compilation context of one module. It owns the
//! registries that instructions share (types, needed functions, string
//! pool, local slots) and drives each function through
//! resolve → verify → write. `finish` lays out the string pool and writes the
//! synthesized helper functions last.

use crate::error::CompileResult;
use crate::functions::{FunctionId, FunctionName, FunctionRegistry};
use crate::ir::{AnyType, ArrayOperator, CodePosition, EmitContext, Instruction, TypeRegistry};
use crate::locals::LocalVariableManager;
use crate::options::CompilerOptions;
use crate::strings::{self, StringPool};
use crate::verify::verify_function;
use crate::writer::{write_code_function, ModuleWriter};
use jwasm_bytecode::WasmType;

/// A function ready for code generation
#[derive(Debug, Clone)]
pub struct FunctionCode {
    pub name: FunctionName,
    pub instructions: Vec<Instruction>,
}

impl FunctionCode {
    pub fn new(name: FunctionName, instructions: Vec<Instruction>) -> Self {
        Self { name, instructions }
    }
}

/// Compilation context of one module
#[derive(Debug)]
pub struct ModuleCompiler {
    options: CompilerOptions,
    types: TypeRegistry,
    functions: FunctionRegistry,
    strings: StringPool,
    locals: LocalVariableManager,
}

impl ModuleCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        let types = TypeRegistry::new(options.use_gc);
        Self {
            options,
            types,
            functions: FunctionRegistry::new(),
            strings: StringPool::new(),
            locals: LocalVariableManager::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Array instruction on the interned array type of `element`
    pub fn array_instruction(
        &mut self,
        op: ArrayOperator,
        element: AnyType,
        position: CodePosition,
    ) -> CompileResult<Instruction> {
        let array = self.types.array_type(element)?;
        Ok(Instruction::array(op, element, array, position))
    }

    /// String literal instruction; the string is interned immediately
    pub fn string_constant(&mut self, value: &str, position: CodePosition) -> CompileResult<Instruction> {
        let id = self.strings.intern(value)?;
        Ok(Instruction::string_const(id, self.types.string_type(), position))
    }

    /// Compile one function into the writer
    pub fn compile_function(
        &mut self,
        writer: &mut dyn ModuleWriter,
        code: &FunctionCode,
    ) -> CompileResult<FunctionId> {
        let id = self.functions.mark_as_needed(&code.name, false);
        let full_name = code.name.full_name();
        log::debug!("compiling {} as {}", code.name, id);

        self.locals.reset();
        let mut slot = 0;
        for param in &code.name.params {
            self.locals.add_param(slot, *param)?;
            slot += if param.is_wide() { 2 } else { 1 };
        }
        for instr in &code.instructions {
            instr.resolve_locals(&mut self.locals);
        }

        verify_function(&full_name, code.name.result, &code.instructions, &self.locals)?;

        let params = self.lower_all(&code.name.params)?;
        let result = self.lower_result(code.name.result)?;
        let locals = self.lower_all(self.locals.local_types())?;
        writer.begin_function(id, &full_name, &params, result, &locals)?;

        let mut ctx = EmitContext {
            options: &self.options,
            types: &self.types,
            functions: &mut self.functions,
        };
        for instr in &code.instructions {
            instr.write_to(writer, &mut ctx)?;
        }
        writer.end_function()?;

        log::debug!(
            "compiled {}: {} instructions, {} locals",
            full_name,
            code.instructions.len(),
            locals.len()
        );
        self.locals.reset();
        Ok(id)
    }

    /// Finish the module
    ///
    /// Writes the string pool into the writer's data section, patches the
    /// offset function with the final base offset and writes every
    /// synthesized function that has a target code body. The writer then
    /// resolves calls against the complete function index space.
    pub fn finish(&mut self, writer: &mut dyn ModuleWriter) -> CompileResult<()> {
        self.strings.finalize(writer.data())?;

        let offset_function = strings::strings_offset_function(&self.options);
        if !self.strings.is_empty() || self.functions.lookup(&offset_function).is_some() {
            let base = self.strings.base_offset().unwrap_or(0);
            self.functions.mark_as_needed_and_replace_if_exists(
                &offset_function,
                strings::strings_offset_body(base)?,
            );
        }

        for (entry, ops) in self.functions.code_functions() {
            let params = self.lower_all(&entry.name.params)?;
            let result = self.lower_result(entry.name.result)?;
            write_code_function(writer, entry.id, &entry.name.full_name(), &params, result, ops)?;
        }
        writer.finish_module(&self.functions)?;
        log::debug!(
            "module finished: {} functions needed, {} host imports",
            self.functions.needed_count(),
            self.functions.host_imports().count()
        );
        Ok(())
    }

    fn lower_all(&self, types: &[AnyType]) -> CompileResult<Vec<WasmType>> {
        types.iter().map(|ty| self.types.lower(*ty)).collect()
    }

    fn lower_result(&self, result: Option<AnyType>) -> CompileResult<Option<WasmType>> {
        result.map(|ty| self.types.lower(ty)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::ir::{BlockOperator, NumericOperator, NumericValue, VariableOperator};
    use crate::writer::TextModuleWriter;
    use jwasm_bytecode::ValueType;

    fn pos(offset: i32) -> CodePosition {
        CodePosition::new(offset, offset / 4 + 1)
    }

    #[test]
    fn test_wide_params_take_two_slots() {
        let mut compiler = ModuleCompiler::new(CompilerOptions::default());
        let mut writer = TextModuleWriter::new(compiler.options());
        let name = FunctionName::new(
            "demo/M",
            "pick",
            "(JI)I",
            vec![AnyType::I64, AnyType::I32],
            Some(AnyType::I32),
        );
        // The int parameter lives in source slot 2
        let code = FunctionCode::new(
            name,
            vec![
                Instruction::load_store(VariableOperator::Get, 2, AnyType::I32, pos(0)),
                Instruction::block(BlockOperator::Return, Some(AnyType::I32), 0, pos(1)),
            ],
        );
        compiler.compile_function(&mut writer, &code).unwrap();
        assert!(writer.output().contains("  local.get 1\n"));
        assert!(!writer.output().contains("(local"));
    }

    #[test]
    fn test_verification_failure_aborts() {
        let mut compiler = ModuleCompiler::new(CompilerOptions::default());
        let mut writer = TextModuleWriter::new(compiler.options());
        let name = FunctionName::new("demo/M", "bad", "()I", Vec::new(), Some(AnyType::I32));
        let code = FunctionCode::new(
            name,
            vec![Instruction::numeric(NumericOperator::Add, ValueType::I32, pos(0))],
        );
        assert!(matches!(
            compiler.compile_function(&mut writer, &code),
            Err(CompileError::StackUnderflow { .. })
        ));
        assert!(writer.output().is_empty());
    }

    #[test]
    fn test_finish_without_strings_adds_nothing() {
        let mut compiler = ModuleCompiler::new(CompilerOptions::default());
        let mut writer = TextModuleWriter::new(compiler.options());
        let name = FunctionName::new("demo/M", "one", "()I", Vec::new(), Some(AnyType::I32));
        let code = FunctionCode::new(
            name,
            vec![Instruction::constant(NumericValue::I32(1), pos(0))],
        );
        compiler.compile_function(&mut writer, &code).unwrap();
        compiler.finish(&mut writer).unwrap();

        assert_eq!(compiler.functions().needed_count(), 1);
        assert!(writer.data_section().is_empty());
        assert!(compiler.finish(&mut writer).is_err());
    }
}
