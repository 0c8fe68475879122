//! JWasm Compiler - Instruction IR and Code Generation
//!
//! This crate turns a typed stack-machine instruction stream, as produced by a
//! class-file front end, into target module code. It owns the instruction
//! node contracts, local slot remapping, the array codegen strategies for the
//! GC and host profiles, and the string constant pool.
//!
//! # Pipeline
//!
//! ```text
//! Instructions → resolve locals → verify stack → write_to(ModuleWriter) → finish (string pool, call indices)
//! ```

pub mod codegen;
pub mod error;
pub mod functions;
pub mod ir;
pub mod locals;
pub mod options;
pub mod strings;
pub mod verify;
pub mod writer;

pub use codegen::{FunctionCode, ModuleCompiler};
pub use error::{CompileError, CompileResult};
pub use functions::{FunctionBody, FunctionId, FunctionName, FunctionRegistry, ModuleIndices};
pub use ir::{
    AnyType, ArrayId, ArrayOperator, BlockOperator, CodeOp, CodePosition, EmitContext, HostNumber,
    InstrKind, Instruction, NumericOperator, NumericValue, StructId, TypeRegistry,
    ValueTypeConversion, VariableOperator,
};
pub use locals::LocalVariableManager;
pub use options::CompilerOptions;
pub use strings::StringPool;
pub use verify::verify_function;
pub use writer::{BinaryModuleWriter, EncodedFunction, ModuleWriter, TextModuleWriter};

// Re-export target types for convenience
pub use jwasm_bytecode::{DataSection, DataSink, Opcode, ValueType, WasmType};
