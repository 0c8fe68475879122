//! Operators carried by instruction nodes

use jwasm_bytecode::Opcode;

/// Local variable access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableOperator {
    Get,
    Set,
    Tee,
}

impl VariableOperator {
    pub fn opcode(self) -> Opcode {
        match self {
            VariableOperator::Get => Opcode::LocalGet,
            VariableOperator::Set => Opcode::LocalSet,
            VariableOperator::Tee => Opcode::LocalTee,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VariableOperator::Get => "get",
            VariableOperator::Set => "set",
            VariableOperator::Tee => "tee",
        }
    }
}

/// Array operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayOperator {
    /// Allocate an array of a given size
    New,
    /// Read an element
    Get,
    /// Read a sub-word element, sign-extended
    GetS,
    /// Read a sub-word element, zero-extended
    GetU,
    /// Write an element
    Set,
    /// Array length
    Len,
    /// Allocate with an explicit runtime type descriptor
    NewArrayWithRtt,
}

impl ArrayOperator {
    pub const ALL: [ArrayOperator; 7] = [
        ArrayOperator::New,
        ArrayOperator::Get,
        ArrayOperator::GetS,
        ArrayOperator::GetU,
        ArrayOperator::Set,
        ArrayOperator::Len,
        ArrayOperator::NewArrayWithRtt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArrayOperator::New => "NEW",
            ArrayOperator::Get => "GET",
            ArrayOperator::GetS => "GET_S",
            ArrayOperator::GetU => "GET_U",
            ArrayOperator::Set => "SET",
            ArrayOperator::Len => "LEN",
            ArrayOperator::NewArrayWithRtt => "NEW_ARRAY_WITH_RTT",
        }
    }

    /// Check if this is one of the element read variants
    pub fn is_get(self) -> bool {
        matches!(
            self,
            ArrayOperator::Get | ArrayOperator::GetS | ArrayOperator::GetU
        )
    }
}

/// Arithmetic, bitwise and comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Neg,
    Eqz,
}

impl NumericOperator {
    pub const ALL: [NumericOperator; 19] = [
        NumericOperator::Add,
        NumericOperator::Sub,
        NumericOperator::Mul,
        NumericOperator::Div,
        NumericOperator::Rem,
        NumericOperator::And,
        NumericOperator::Or,
        NumericOperator::Xor,
        NumericOperator::Shl,
        NumericOperator::ShrS,
        NumericOperator::ShrU,
        NumericOperator::Eq,
        NumericOperator::Ne,
        NumericOperator::Lt,
        NumericOperator::Le,
        NumericOperator::Gt,
        NumericOperator::Ge,
        NumericOperator::Neg,
        NumericOperator::Eqz,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericOperator::Add => "add",
            NumericOperator::Sub => "sub",
            NumericOperator::Mul => "mul",
            NumericOperator::Div => "div",
            NumericOperator::Rem => "rem",
            NumericOperator::And => "and",
            NumericOperator::Or => "or",
            NumericOperator::Xor => "xor",
            NumericOperator::Shl => "shl",
            NumericOperator::ShrS => "shr_s",
            NumericOperator::ShrU => "shr_u",
            NumericOperator::Eq => "eq",
            NumericOperator::Ne => "ne",
            NumericOperator::Lt => "lt",
            NumericOperator::Le => "le",
            NumericOperator::Gt => "gt",
            NumericOperator::Ge => "ge",
            NumericOperator::Neg => "neg",
            NumericOperator::Eqz => "eqz",
        }
    }

    /// Check if the result is an `i32` truth value
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            NumericOperator::Eq
                | NumericOperator::Ne
                | NumericOperator::Lt
                | NumericOperator::Le
                | NumericOperator::Gt
                | NumericOperator::Ge
                | NumericOperator::Eqz
        )
    }

    /// Check if the operator takes a single operand
    pub fn is_unary(self) -> bool {
        matches!(self, NumericOperator::Neg | NumericOperator::Eqz)
    }
}

/// Structured control and stack operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockOperator {
    Return,
    Drop,
    Unreachable,
    Block,
    Loop,
    End,
    Br,
    BrIf,
}

impl BlockOperator {
    pub fn opcode(self) -> Opcode {
        match self {
            BlockOperator::Return => Opcode::Return,
            BlockOperator::Drop => Opcode::Drop,
            BlockOperator::Unreachable => Opcode::Unreachable,
            BlockOperator::Block => Opcode::Block,
            BlockOperator::Loop => Opcode::Loop,
            BlockOperator::End => Opcode::End,
            BlockOperator::Br => Opcode::Br,
            BlockOperator::BrIf => Opcode::BrIf,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockOperator::Return => "RETURN",
            BlockOperator::Drop => "DROP",
            BlockOperator::Unreachable => "UNREACHABLE",
            BlockOperator::Block => "BLOCK",
            BlockOperator::Loop => "LOOP",
            BlockOperator::End => "END",
            BlockOperator::Br => "BR",
            BlockOperator::BrIf => "BR_IF",
        }
    }
}

macro_rules! impl_display_by_name {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.name())
                }
            }
        )*
    };
}

impl_display_by_name!(VariableOperator, ArrayOperator, NumericOperator, BlockOperator);
