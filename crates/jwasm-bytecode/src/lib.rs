//! JWasm Target Module Definitions
//!
//! This crate provides the value types, opcode table, LEB128 encoding and
//! the byte-level writer/reader used to produce the binary stack-machine
//! module format, plus the data-section byte sink.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod data;
pub mod encoder;
pub mod leb128;
pub mod opcode;
pub mod types;

pub use data::{DataSection, DataSink};
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use leb128::EncodeError;
pub use opcode::Opcode;
pub use types::{ValueType, WasmType};
