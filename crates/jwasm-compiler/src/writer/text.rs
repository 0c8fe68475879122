//! Text module writer
//!
//! Renders functions in the target's text format. Used for diagnostics and
//! to make codegen tests readable. With `debug_names` calls name their
//! callee; otherwise they use the module function index, which is only
//! known after `finish_module`. Until then such calls print the function id.

use super::{resolve_scratch, ModuleWriter, ScratchLocals};
use crate::error::{CompileError, CompileResult};
use crate::functions::{FunctionId, FunctionName, FunctionRegistry, ModuleIndices};
use crate::ir::CodeOp;
use crate::options::CompilerOptions;
use jwasm_bytecode::{DataSection, DataSink, Opcode, WasmType};
use std::fmt::Write;

const INDENT: &str = "  ";

#[derive(Debug)]
enum Line {
    Text(String),
    /// Call by module index
    Call {
        indent: String,
        callee: FunctionId,
        comment: String,
    },
}

#[derive(Debug)]
struct OpenFunction {
    id: FunctionId,
    header: String,
    locals: Vec<WasmType>,
    body: Vec<Line>,
    depth: usize,
}

#[derive(Debug)]
struct TextFunction {
    id: FunctionId,
    /// `(func ...)` line and local declarations
    header: String,
    body: Vec<Line>,
}

/// Writer producing text-format functions
#[derive(Debug)]
pub struct TextModuleWriter {
    debug_names: bool,
    functions: Vec<TextFunction>,
    indices: Option<ModuleIndices>,
    output: String,
    data: DataSection,
    current: Option<OpenFunction>,
    scratch: ScratchLocals,
}

impl TextModuleWriter {
    pub fn new(options: &CompilerOptions) -> Self {
        Self {
            debug_names: options.debug_names,
            functions: Vec::new(),
            indices: None,
            output: String::new(),
            data: DataSection::new(),
            current: None,
            scratch: ScratchLocals::default(),
        }
    }

    /// Text of all finished functions
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_string(self) -> String {
        self.output
    }

    pub fn data_section(&self) -> &DataSection {
        &self.data
    }

    fn open(&mut self) -> CompileResult<&mut OpenFunction> {
        self.current
            .as_mut()
            .ok_or_else(|| CompileError::internal("No function is being written"))
    }

    fn line(&mut self, text: String) -> CompileResult<()> {
        let open = self.open()?;
        let indent = INDENT.repeat(open.depth + 1);
        open.body.push(Line::Text(format!("{}{}", indent, text)));
        Ok(())
    }

    fn enter(&mut self, text: String) -> CompileResult<()> {
        self.line(text)?;
        self.open()?.depth += 1;
        Ok(())
    }

    fn leave(&mut self) -> CompileResult<()> {
        let open = self.open()?;
        open.depth = open.depth.saturating_sub(1);
        self.line(Opcode::End.name().to_string())
    }

    fn render(&self, function: &TextFunction, out: &mut String) -> CompileResult<()> {
        out.push_str(&function.header);
        for line in &function.body {
            match line {
                Line::Text(text) => out.push_str(text),
                Line::Call {
                    indent,
                    callee,
                    comment,
                } => {
                    let target = match &self.indices {
                        Some(indices) => indices.get(*callee)?,
                        None => callee.as_u32(),
                    };
                    let _ = write!(out, "{}call {}{}", indent, target, comment);
                }
            }
            out.push('\n');
        }
        out.push_str(")\n");
        Ok(())
    }
}

impl ModuleWriter for TextModuleWriter {
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
                name, open.header
            )));
        }
        let mut header = format!("(func ${}", identifier(name));
        if !params.is_empty() {
            header.push_str(" (param");
            for param in params {
                let _ = write!(header, " {}", param);
            }
            header.push(')');
        }
        if let Some(result) = result {
            let _ = write!(header, " (result {})", result);
        }
        self.scratch.reset((params.len() + locals.len()) as u32);
        self.current = Some(OpenFunction {
            id,
            header,
            locals: locals.to_vec(),
            body: Vec::new(),
            depth: 0,
        });
        Ok(())
    }

    fn end_function(&mut self) -> CompileResult<()> {
        let open = self
            .current
            .take()
            .ok_or_else(|| CompileError::internal("end_function without begin_function"))?;
        let mut header = open.header;
        header.push('\n');

        let declared: Vec<WasmType> = open
            .locals
            .iter()
            .copied()
            .chain(self.scratch.types())
            .collect();
        if !declared.is_empty() {
            let names: Vec<String> = declared.iter().map(|ty| ty.to_string()).collect();
            let _ = writeln!(header, "{}(local {})", INDENT, names.join(" "));
        }

        let function = TextFunction {
            id: open.id,
            header,
            body: open.body,
        };
        let mut text = String::new();
        self.render(&function, &mut text)?;
        self.output.push_str(&text);
        self.functions.push(function);
        Ok(())
    }

    fn write_code_op(&mut self, op: &CodeOp) -> CompileResult<()> {
        self.open()?;
        match resolve_scratch(op, &mut self.scratch) {
            CodeOp::Op(Opcode::End) => self.leave(),
            CodeOp::Op(opcode) => self.line(opcode.name().to_string()),
            CodeOp::I32Const(value) => self.line(format!("i32.const {}", value)),
            CodeOp::I64Const(value) => self.line(format!("i64.const {}", value)),
            CodeOp::F32Const(value) => self.line(format!("f32.const {}", float_literal(value))),
            CodeOp::F64Const(value) => self.line(format!("f64.const {}", float_literal(value))),
            CodeOp::Indexed(opcode, index) => self.line(format!("{} {}", opcode.name(), index)),
            CodeOp::StructGet { type_index, field } => {
                self.line(format!("struct.get {} {}", type_index, field))
            }
            CodeOp::Block(opcode) => self.enter(opcode.name().to_string()),
            CodeOp::ScratchSet(..) | CodeOp::ScratchGet(..) => {
                Err(CompileError::internal("Unresolved scratch local"))
            }
        }
    }

    fn write_function_call(
        &mut self,
        name: &FunctionName,
        id: FunctionId,
        explicit_return: Option<WasmType>,
    ) -> CompileResult<()> {
        let comment = match explicit_return {
            Some(ty) => format!(" ;; -> {}", ty),
            None => String::new(),
        };
        if self.debug_names {
            return self.line(format!("call ${}{}", identifier(&name.full_name()), comment));
        }
        let open = self.open()?;
        open.body.push(Line::Call {
            indent: INDENT.repeat(open.depth + 1),
            callee: id,
            comment,
        });
        Ok(())
    }

    fn data(&mut self) -> &mut dyn DataSink {
        &mut self.data
    }

    fn finish_module(&mut self, functions: &FunctionRegistry) -> CompileResult<()> {
        if self.current.is_some() {
            return Err(CompileError::internal("Module finished while a function is open"));
        }
        let indices = ModuleIndices::new(functions);
        let mut keyed = Vec::with_capacity(self.functions.len());
        for function in std::mem::take(&mut self.functions) {
            keyed.push((indices.get(function.id)?, function));
        }
        keyed.sort_by_key(|(index, _)| *index);
        self.functions = keyed.into_iter().map(|(_, function)| function).collect();
        self.indices = Some(indices);

        let mut output = String::new();
        for function in &self.functions {
            self.render(function, &mut output)?;
        }
        self.output = output;
        Ok(())
    }
}

/// Float literal in text syntax; non-finite values use `nan` and `inf`
fn float_literal<F>(value: F) -> String
where
    F: Into<f64> + std::fmt::Display + Copy,
{
    let wide: f64 = value.into();
    let sign = if wide.is_sign_negative() { "-" } else { "" };
    if wide.is_nan() {
        format!("{}nan", sign)
    } else if wide.is_infinite() {
        format!("{}inf", sign)
    } else {
        value.to_string()
    }
}

/// Replace characters that cannot appear in a text-format identifier
fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '(' | ')' | ';' | ',' | '"' | '[' | ']' | '{' | '}' => '_',
            c => c,
        })
        .collect()
}
