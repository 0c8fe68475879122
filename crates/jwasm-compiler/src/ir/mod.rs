//! Intermediate Representation
//!
//! Typed stack-machine instructions between the class-file front end and the
//! module writers.

pub mod array;
pub mod conversion;
pub mod instr;
pub mod lowering;
pub mod operator;
pub mod types;
pub mod value;

pub use conversion::ValueTypeConversion;
pub use instr::{CodePosition, EmitContext, InstrKind, Instruction};
pub use lowering::CodeOp;
pub use operator::{ArrayOperator, BlockOperator, NumericOperator, VariableOperator};
pub use types::{AnyType, ArrayId, ArrayType, StructId, StructType, TypeRegistry};
pub use value::{HostNumber, NumericValue};
