//! Local variable slot manager
//!
//! Source bytecode reuses a slot for values of different types over a
//! method's lifetime. The target needs one typed local per use, so every
//! `(slot, type)` pair gets its own target index. Parameters come first and
//! keep indices `0..P-1`.

use crate::error::{CompileError, CompileResult};
use crate::ir::{AnyType, CodePosition};
use rustc_hash::FxHashMap;

/// Maps source slots to typed target locals for one function
#[derive(Debug, Default)]
pub struct LocalVariableManager {
    slots: FxHashMap<(u32, AnyType), u32>,
    types: Vec<AnyType>,
    param_count: u32,
}

impl LocalVariableManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the next parameter
    ///
    /// Parameters must be registered before any other local is allocated.
    pub fn add_param(&mut self, slot: u32, ty: AnyType) -> CompileResult<u32> {
        if self.types.len() as u32 != self.param_count {
            return Err(CompileError::internal(format!(
                "Parameter in slot {} registered after locals were allocated",
                slot
            )));
        }
        let index = self.allocate(slot, ty.stack_type());
        self.param_count += 1;
        Ok(index)
    }

    /// Target index of a source slot used with a type, allocated on first use
    pub fn resolve(&mut self, slot: u32, ty: AnyType, position: CodePosition) -> u32 {
        let ty = ty.stack_type();
        if let Some(&index) = self.slots.get(&(slot, ty)) {
            return index;
        }
        let index = self.allocate(slot, ty);
        log::trace!("slot {} as {} -> local {} ({})", slot, ty, index, position);
        index
    }

    /// A fresh local not tied to any source slot
    pub fn temp_local(&mut self, ty: AnyType) -> u32 {
        let index = self.types.len() as u32;
        self.types.push(ty.stack_type());
        index
    }

    /// Type of an allocated target local
    pub fn get_value_type(&self, index: u32) -> CompileResult<AnyType> {
        self.types
            .get(index as usize)
            .copied()
            .ok_or(CompileError::UnknownLocal { index })
    }

    pub fn param_count(&self) -> u32 {
        self.param_count
    }

    /// Number of parameters and locals
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types of the non-parameter locals, in index order
    pub fn local_types(&self) -> &[AnyType] {
        &self.types[self.param_count as usize..]
    }

    /// Drop all allocations at the end of a function
    pub fn reset(&mut self) {
        self.slots.clear();
        self.types.clear();
        self.param_count = 0;
    }

    fn allocate(&mut self, slot: u32, ty: AnyType) -> u32 {
        let index = self.types.len() as u32;
        self.types.push(ty);
        self.slots.insert((slot, ty), index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jwasm_bytecode::ValueType;

    #[test]
    fn test_same_slot_different_types() {
        let mut locals = LocalVariableManager::new();
        let pos = CodePosition::unknown();
        let a = locals.resolve(2, AnyType::I32, pos);
        let b = locals.resolve(2, AnyType::I64, pos);
        let c = locals.resolve(2, AnyType::I32, pos);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(locals.len(), 2);
        assert_eq!(locals.get_value_type(b).unwrap(), AnyType::I64);
    }

    #[test]
    fn test_sub_word_shares_int_local() {
        let mut locals = LocalVariableManager::new();
        let pos = CodePosition::unknown();
        let a = locals.resolve(1, ValueType::I8.into(), pos);
        let b = locals.resolve(1, AnyType::I32, pos);
        assert_eq!(a, b);
        assert_eq!(locals.get_value_type(a).unwrap(), AnyType::I32);
    }

    #[test]
    fn test_params_come_first() {
        let mut locals = LocalVariableManager::new();
        assert_eq!(locals.add_param(0, AnyType::I64).unwrap(), 0);
        assert_eq!(locals.add_param(2, AnyType::F32).unwrap(), 1);
        let pos = CodePosition::unknown();
        assert_eq!(locals.resolve(2, AnyType::F32, pos), 1);
        assert_eq!(locals.resolve(3, AnyType::I32, pos), 2);
        assert_eq!(locals.param_count(), 2);
        assert_eq!(locals.local_types(), &[AnyType::I32]);

        assert!(locals.add_param(4, AnyType::I32).is_err());
    }

    #[test]
    fn test_temp_locals_are_fresh() {
        let mut locals = LocalVariableManager::new();
        let a = locals.temp_local(AnyType::I32);
        let b = locals.temp_local(AnyType::I32);
        assert_ne!(a, b);
        let pos = CodePosition::unknown();
        assert_eq!(locals.resolve(0, AnyType::I32, pos), 2);
    }

    #[test]
    fn test_unknown_local_and_reset() {
        let mut locals = LocalVariableManager::new();
        locals.resolve(0, AnyType::F64, CodePosition::unknown());
        assert!(matches!(
            locals.get_value_type(5),
            Err(CompileError::UnknownLocal { index: 5 })
        ));
        locals.reset();
        assert!(locals.is_empty());
        assert!(locals.get_value_type(0).is_err());
    }
}
