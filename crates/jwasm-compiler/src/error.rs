//! Compilation errors

use crate::ir::CodePosition;
use jwasm_bytecode::EncodeError;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Internal compiler error: {message}{}", at(.position))]
    Internal {
        message: String,
        position: Option<CodePosition>,
    },

    #[error("Unknown operator {operator} for {kind}{}", at(.position))]
    UnknownOperator {
        operator: String,
        kind: &'static str,
        position: Option<CodePosition>,
    },

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodeError),

    #[error("Not supported constant type: {type_name}{}", at(.position))]
    UnsupportedConstant {
        type_name: String,
        position: Option<CodePosition>,
    },

    #[error("Stack underflow in {function} at {position}")]
    StackUnderflow {
        function: String,
        position: CodePosition,
    },

    #[error("Stack type mismatch in {function} at {position}: expected {expected}, found {found}")]
    StackTypeMismatch {
        function: String,
        position: CodePosition,
        expected: String,
        found: String,
    },

    #[error("Stack not balanced at end of {function}: expected [{expected}], found [{found}]")]
    StackNotBalanced {
        function: String,
        expected: String,
        found: String,
    },

    #[error("Unknown local variable index {index}")]
    UnknownLocal { index: u32 },

    #[error("String pool already finalized, cannot register {value:?}")]
    PoolFinalized { value: String },

    #[error("Invalid compiler options: {message}")]
    Config { message: String },
}

impl CompileError {
    /// Internal consistency error without a source position
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
            position: None,
        }
    }

    /// Internal consistency error at a source position
    pub fn internal_at(message: impl Into<String>, position: CodePosition) -> Self {
        CompileError::Internal {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Attach a source position to an error that has none yet
    pub fn with_position(mut self, at: CodePosition) -> Self {
        match &mut self {
            CompileError::Internal { position, .. }
            | CompileError::UnknownOperator { position, .. }
            | CompileError::UnsupportedConstant { position, .. } => {
                if position.is_none() {
                    *position = Some(at);
                }
            }
            _ => {}
        }
        self
    }
}

fn at(position: &Option<CodePosition>) -> String {
    match position {
        Some(position) => format!(" at {}", position),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_message_names_position() {
        let err = CompileError::internal_at("Unknown conversion", CodePosition::new(12, 7));
        assert_eq!(
            err.to_string(),
            "Internal compiler error: Unknown conversion at offset 12 (line 7)"
        );
    }

    #[test]
    fn test_with_position_keeps_existing() {
        let err = CompileError::internal("boom").with_position(CodePosition::new(3, 1));
        assert!(err.to_string().ends_with("at offset 3 (line 1)"));

        let err = CompileError::internal_at("boom", CodePosition::new(5, 2))
            .with_position(CodePosition::new(9, 9));
        assert!(err.to_string().ends_with("at offset 5 (line 2)"));
    }

    #[test]
    fn test_encoding_error_converts() {
        let err: CompileError = EncodeError::NegativeValue(-3).into();
        assert!(matches!(err, CompileError::Encoding(_)));
        assert!(err.to_string().contains("-3"));
    }
}
