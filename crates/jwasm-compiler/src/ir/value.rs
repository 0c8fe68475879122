//! Constant values
//!
//! `NumericValue` is a literal the target can encode directly. `HostNumber`
//! is the boxed numeric kind a front end hands over; only the four kinds with
//! a matching target type can become constants.

use crate::error::{CompileError, CompileResult};
use crate::ir::CodePosition;
use jwasm_bytecode::ValueType;

/// A numeric literal of one of the four stack value types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl NumericValue {
    /// The value type of this literal
    pub fn value_type(&self) -> ValueType {
        match self {
            NumericValue::I32(_) => ValueType::I32,
            NumericValue::I64(_) => ValueType::I64,
            NumericValue::F32(_) => ValueType::F32,
            NumericValue::F64(_) => ValueType::F64,
        }
    }
}

impl std::fmt::Display for NumericValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericValue::I32(v) => write!(f, "{}", v),
            NumericValue::I64(v) => write!(f, "{}", v),
            NumericValue::F32(v) => write!(f, "{}", v),
            NumericValue::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Boxed numeric kinds of the source language
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostNumber {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Char(u16),
}

impl HostNumber {
    /// Source language name of the kind
    pub fn type_name(&self) -> &'static str {
        match self {
            HostNumber::Int(_) => "java.lang.Integer",
            HostNumber::Long(_) => "java.lang.Long",
            HostNumber::Float(_) => "java.lang.Float",
            HostNumber::Double(_) => "java.lang.Double",
            HostNumber::Byte(_) => "java.lang.Byte",
            HostNumber::Short(_) => "java.lang.Short",
            HostNumber::Char(_) => "java.lang.Character",
        }
    }

    /// Convert into a target literal
    pub fn to_numeric(self, position: CodePosition) -> CompileResult<NumericValue> {
        match self {
            HostNumber::Int(v) => Ok(NumericValue::I32(v)),
            HostNumber::Long(v) => Ok(NumericValue::I64(v)),
            HostNumber::Float(v) => Ok(NumericValue::F32(v)),
            HostNumber::Double(v) => Ok(NumericValue::F64(v)),
            HostNumber::Byte(_) | HostNumber::Short(_) | HostNumber::Char(_) => {
                Err(CompileError::UnsupportedConstant {
                    type_name: self.type_name().to_string(),
                    position: Some(position),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_kinds() {
        let pos = CodePosition::unknown();
        assert_eq!(
            HostNumber::Int(7).to_numeric(pos).unwrap(),
            NumericValue::I32(7)
        );
        assert_eq!(
            HostNumber::Long(-1).to_numeric(pos).unwrap().value_type(),
            ValueType::I64
        );
        assert_eq!(
            HostNumber::Float(1.5).to_numeric(pos).unwrap().value_type(),
            ValueType::F32
        );
        assert_eq!(
            HostNumber::Double(0.25).to_numeric(pos).unwrap(),
            NumericValue::F64(0.25)
        );
    }

    #[test]
    fn test_unsupported_kind_names_type() {
        let err = HostNumber::Char(65)
            .to_numeric(CodePosition::new(4, 2))
            .unwrap_err();
        match err {
            CompileError::UnsupportedConstant {
                type_name,
                position,
            } => {
                assert_eq!(type_name, "java.lang.Character");
                assert_eq!(position, Some(CodePosition::new(4, 2)));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
