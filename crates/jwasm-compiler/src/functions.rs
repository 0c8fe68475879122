//! Function registry
//!
//! Tracks every function the module needs, compiled or synthetic. Identity is
//! the qualified name plus signature, so registering the same helper twice
//! yields the same `FunctionId` and a single entry.

use crate::error::{CompileError, CompileResult};
use crate::ir::{AnyType, CodeOp};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Function identifier in the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// Qualified function name with its stack signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionName {
    pub class_name: String,
    pub method_name: String,
    /// Method descriptor, e.g. `(I)Ljava/lang/String;`
    pub signature: String,
    pub params: Vec<AnyType>,
    pub result: Option<AnyType>,
}

impl FunctionName {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        signature: impl Into<String>,
        params: Vec<AnyType>,
        result: Option<AnyType>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            signature: signature.into(),
            params,
            result,
        }
    }

    /// `class.method`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }

    /// `class.method(signature)`, the registry key
    pub fn signature_name(&self) -> String {
        format!("{}.{}{}", self.class_name, self.method_name, self.signature)
    }
}

impl std::fmt::Display for FunctionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signature_name())
    }
}

/// Body of a synthetic function
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Target code, emitted like any compiled function
    Code(Vec<CodeOp>),
    /// Script imported from the host under `module`
    HostScript { module: String, code: String },
}

/// A function the module needs
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionEntry {
    pub id: FunctionId,
    pub name: FunctionName,
    pub is_import: bool,
    /// `None` for functions compiled from source
    pub body: Option<FunctionBody>,
}

/// Registry of needed functions for one module
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a function as needed, returning its id
    pub fn mark_as_needed(&mut self, name: &FunctionName, is_import: bool) -> FunctionId {
        self.insert(name, is_import, None, false)
    }

    /// Mark a synthetic function as needed; an existing entry is kept as is
    pub fn mark_synthetic_as_needed(&mut self, name: &FunctionName, body: FunctionBody) -> FunctionId {
        let is_import = matches!(body, FunctionBody::HostScript { .. });
        self.insert(name, is_import, Some(body), false)
    }

    /// Mark a synthetic function as needed, replacing the body of an existing entry
    ///
    /// The id of an existing entry does not change.
    pub fn mark_as_needed_and_replace_if_exists(
        &mut self,
        name: &FunctionName,
        body: FunctionBody,
    ) -> FunctionId {
        let is_import = matches!(body, FunctionBody::HostScript { .. });
        self.insert(name, is_import, Some(body), true)
    }

    fn insert(
        &mut self,
        name: &FunctionName,
        is_import: bool,
        body: Option<FunctionBody>,
        replace: bool,
    ) -> FunctionId {
        let next = FunctionId(self.functions.len() as u32);
        match self.functions.entry(name.signature_name()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if replace {
                    log::debug!("replacing body of {}", name);
                    existing.is_import = is_import;
                    existing.body = body;
                } else {
                    log::trace!("{} already needed as {}", name, existing.id);
                }
                existing.id
            }
            Entry::Vacant(entry) => {
                if body.is_some() {
                    log::debug!("synthetic function {} needed as {}", name, next);
                } else {
                    log::trace!("function {} needed as {}", name, next);
                }
                entry.insert(FunctionEntry {
                    id: next,
                    name: name.clone(),
                    is_import,
                    body,
                });
                next
            }
        }
    }

    /// Look up an entry by id
    pub fn get(&self, id: FunctionId) -> Option<&FunctionEntry> {
        self.functions.get_index(id.0 as usize).map(|(_, entry)| entry)
    }

    /// Look up an entry by id, failing for unknown ids
    pub fn entry(&self, id: FunctionId) -> CompileResult<&FunctionEntry> {
        self.get(id)
            .ok_or_else(|| CompileError::internal(format!("Unknown function {}", id)))
    }

    /// Look up an id by name
    pub fn lookup(&self, name: &FunctionName) -> Option<FunctionId> {
        self.functions.get(&name.signature_name()).map(|entry| entry.id)
    }

    /// Number of needed functions
    pub fn needed_count(&self) -> usize {
        self.functions.len()
    }

    /// All entries in id order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions.values()
    }

    /// Synthetic functions with a target code body
    pub fn code_functions(&self) -> impl Iterator<Item = (&FunctionEntry, &[CodeOp])> {
        self.functions.values().filter_map(|entry| match &entry.body {
            Some(FunctionBody::Code(ops)) => Some((entry, ops.as_slice())),
            _ => None,
        })
    }

    /// Host script imports
    pub fn host_imports(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions
            .values()
            .filter(|entry| matches!(entry.body, Some(FunctionBody::HostScript { .. })))
    }

    /// Number of imported functions
    pub fn import_count(&self) -> usize {
        self.functions.values().filter(|entry| entry.is_import).count()
    }

    /// Module function index of every entry, by id
    ///
    /// Imports come first, then the functions with a body in the module;
    /// each group keeps registry order.
    pub fn module_indices(&self) -> Vec<u32> {
        let mut next_import = 0;
        let mut next_defined = self.import_count() as u32;
        self.functions
            .values()
            .map(|entry| {
                let counter = if entry.is_import {
                    &mut next_import
                } else {
                    &mut next_defined
                };
                let index = *counter;
                *counter += 1;
                index
            })
            .collect()
    }
}

/// Lookup of module function indices, taken when the module is finished
#[derive(Debug, Clone, Default)]
pub struct ModuleIndices {
    indices: Vec<u32>,
    import_count: u32,
}

impl ModuleIndices {
    pub fn new(functions: &FunctionRegistry) -> Self {
        Self {
            indices: functions.module_indices(),
            import_count: functions.import_count() as u32,
        }
    }

    /// Module index of a function
    pub fn get(&self, id: FunctionId) -> CompileResult<u32> {
        self.indices
            .get(id.0 as usize)
            .copied()
            .ok_or_else(|| CompileError::internal(format!("Unknown function {}", id)))
    }

    /// Index of the first function with a body
    pub fn import_count(&self) -> u32 {
        self.import_count
    }
}
