//! Stack contract verification
//!
//! Simulates the operand stack of a function using only the instructions'
//! own contracts. Every pop is checked against the value that is actually on
//! the stack, and the body must leave exactly the declared result behind.

use crate::error::{CompileError, CompileResult};
use crate::ir::{AnyType, BlockOperator, InstrKind, Instruction};
use crate::locals::LocalVariableManager;
use jwasm_bytecode::ValueType;

#[derive(Debug, Clone, Copy)]
struct Frame {
    height: usize,
    unreachable: bool,
}

/// Verify that a function body honors every instruction's stack contract
pub fn verify_function(
    name: &str,
    result: Option<AnyType>,
    instructions: &[Instruction],
    locals: &LocalVariableManager,
) -> CompileResult<()> {
    let mut stack: Vec<AnyType> = Vec::new();
    let mut frames = vec![Frame {
        height: 0,
        unreachable: false,
    }];

    for instr in instructions {
        let position = instr.position();
        let frame = *frames
            .last()
            .ok_or_else(|| CompileError::internal_at("Block frame missing", position))?;

        if let InstrKind::Block {
            op: BlockOperator::Return,
            ty,
            ..
        } = instr.kind()
        {
            let returned = ty.map(AnyType::stack_type);
            if returned != result.map(AnyType::stack_type) {
                return Err(CompileError::StackTypeMismatch {
                    function: name.to_string(),
                    position,
                    expected: describe(result),
                    found: describe(returned),
                });
            }
        }

        let pops = instr.pop_types(locals)?.unwrap_or_default();
        for expected in pops.iter().rev() {
            if stack.len() > frame.height {
                let found = stack.pop().ok_or_else(|| {
                    CompileError::internal_at("Operand stack out of sync", position)
                })?;
                if !compatible(*expected, found) {
                    return Err(CompileError::StackTypeMismatch {
                        function: name.to_string(),
                        position,
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
            } else if !frame.unreachable {
                return Err(CompileError::StackUnderflow {
                    function: name.to_string(),
                    position,
                });
            }
        }

        if let Some(pushed) = instr.push_type(locals)? {
            stack.push(pushed.stack_type());
        }

        match instr.block_operator() {
            Some(BlockOperator::Block | BlockOperator::Loop) => frames.push(Frame {
                height: stack.len(),
                unreachable: false,
            }),
            Some(BlockOperator::End) => {
                if frames.len() < 2 {
                    return Err(CompileError::internal_at(
                        "END without an open block",
                        position,
                    ));
                }
                if !frame.unreachable && stack.len() != frame.height {
                    return Err(CompileError::StackNotBalanced {
                        function: format!("{} block closed at {}", name, position),
                        expected: String::new(),
                        found: join(&stack[frame.height..]),
                    });
                }
                stack.truncate(frame.height);
                frames.pop();
            }
            Some(BlockOperator::Return | BlockOperator::Br | BlockOperator::Unreachable) => {
                stack.truncate(frame.height);
                if let Some(current) = frames.last_mut() {
                    current.unreachable = true;
                }
            }
            Some(BlockOperator::Drop | BlockOperator::BrIf) | None => {}
        }
    }

    if frames.len() != 1 {
        return Err(CompileError::internal(format!(
            "{} block(s) not closed in {}",
            frames.len() - 1,
            name
        )));
    }
    let unreachable = frames.last().map(|f| f.unreachable).unwrap_or(false);
    let expected: Vec<AnyType> = result.map(AnyType::stack_type).into_iter().collect();
    let balanced = stack.len() == expected.len()
        && stack
            .iter()
            .zip(&expected)
            .all(|(found, expected)| compatible(*expected, *found));
    if !balanced && !(unreachable && stack.is_empty()) {
        return Err(CompileError::StackNotBalanced {
            function: name.to_string(),
            expected: join(&expected),
            found: join(&stack),
        });
    }
    Ok(())
}

/// Check whether a found stack value satisfies an expected type
///
/// Generic reference types accept any reference.
fn compatible(expected: AnyType, found: AnyType) -> bool {
    if expected.stack_type() == found.stack_type() {
        return true;
    }
    matches!(
        expected,
        AnyType::Value(ValueType::AnyRef | ValueType::EqRef | ValueType::ExternRef)
    ) && found.is_ref_type()
}

fn describe(ty: Option<AnyType>) -> String {
    ty.map(|ty| ty.to_string()).unwrap_or_else(|| "void".to_string())
}

fn join(types: &[AnyType]) -> String {
    types
        .iter()
        .map(|ty| ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
