//! Structural type registry
//!
//! `AnyType` is what instructions talk about on the simulated stack: a value
//! type, or a reference to a registered struct or array class. The registry
//! assigns type-section indices and vtable ids, interns one array type per
//! element type, and lowers everything to `WasmType` for the chosen profile.

use crate::error::{CompileError, CompileResult};
use jwasm_bytecode::{ValueType, WasmType};
use rustc_hash::FxHashMap;

/// Name of the built-in string class
pub const STRING_CLASS: &str = "java/lang/String";

/// Field index of the backing buffer in an array wrapper struct
pub const ARRAY_FIELD_BUFFER: u32 = 2;

/// Struct identifier in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub u32);

impl StructId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Array type identifier in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId(pub u32);

impl ArrayId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A type on the simulated operand stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyType {
    /// Primitive or built-in reference type
    Value(ValueType),
    /// Reference to a registered struct
    Struct(StructId),
    /// Reference to an interned array type
    Array(ArrayId),
}

impl AnyType {
    pub const I32: AnyType = AnyType::Value(ValueType::I32);
    pub const I64: AnyType = AnyType::Value(ValueType::I64);
    pub const F32: AnyType = AnyType::Value(ValueType::F32);
    pub const F64: AnyType = AnyType::Value(ValueType::F64);

    /// Check if values of this type are references
    pub fn is_ref_type(self) -> bool {
        match self {
            AnyType::Value(ty) => ty.is_ref_type(),
            AnyType::Struct(_) | AnyType::Array(_) => true,
        }
    }

    /// The type once the value sits on the operand stack
    pub fn stack_type(self) -> AnyType {
        match self {
            AnyType::Value(ty) => AnyType::Value(ty.stack_type()),
            other => other,
        }
    }

    /// The value type, if this is not a class reference
    pub fn as_value(self) -> Option<ValueType> {
        match self {
            AnyType::Value(ty) => Some(ty),
            _ => None,
        }
    }

    /// Long and double occupy two source slots
    pub fn is_wide(self) -> bool {
        matches!(
            self,
            AnyType::Value(ValueType::I64) | AnyType::Value(ValueType::F64)
        )
    }
}

impl From<ValueType> for AnyType {
    fn from(ty: ValueType) -> Self {
        AnyType::Value(ty)
    }
}

impl std::fmt::Display for AnyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyType::Value(ty) => write!(f, "{}", ty),
            AnyType::Struct(id) => write!(f, "struct{}", id.0),
            AnyType::Array(id) => write!(f, "array{}", id.0),
        }
    }
}

/// A registered struct class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub id: StructId,
    pub name: String,
    pub vtable: i32,
    pub type_index: u32,
    pub fields: Vec<AnyType>,
}

/// Native array companion of an array class (GC profile only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeArrayType {
    pub type_index: u32,
    /// Storage type; sub-word elements stay packed
    pub storage: WasmType,
}

/// An interned array class
///
/// Arrays are wrapped in a struct `{vtable: i32, hashcode: i32, buffer}` so
/// they behave like any other object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub id: ArrayId,
    pub element: AnyType,
    /// Class-file style descriptor, e.g. `[I` or `[Ljava/lang/String;`
    pub name: String,
    pub vtable: i32,
    pub type_index: u32,
    /// Element type as a local or parameter (sub-word widened)
    pub element_local: WasmType,
    pub native: Option<NativeArrayType>,
}

impl ArrayType {
    /// The stack type of a reference to this array
    pub fn as_any(&self) -> AnyType {
        AnyType::Array(self.id)
    }

    /// The native companion, required by inline array code
    pub fn native(&self) -> CompileResult<&NativeArrayType> {
        self.native.as_ref().ok_or_else(|| {
            CompileError::internal(format!("No native array type for {}", self.name))
        })
    }
}

/// Registry of struct and array classes for one module
#[derive(Debug)]
pub struct TypeRegistry {
    use_gc: bool,
    structs: Vec<StructType>,
    struct_names: FxHashMap<String, StructId>,
    arrays: Vec<ArrayType>,
    array_ids: FxHashMap<AnyType, ArrayId>,
    next_type_index: u32,
    next_vtable: i32,
    string_type: StructId,
}

impl TypeRegistry {
    /// Create a registry for the given capability profile
    pub fn new(use_gc: bool) -> Self {
        let mut registry = Self {
            use_gc,
            structs: Vec::new(),
            struct_names: FxHashMap::default(),
            arrays: Vec::new(),
            array_ids: FxHashMap::default(),
            next_type_index: 0,
            next_vtable: 0,
            string_type: StructId(0),
        };
        registry.string_type =
            registry.register_struct(STRING_CLASS, vec![AnyType::I32, AnyType::I32]);
        registry
    }

    /// Whether native struct and array types are available
    pub fn use_gc(&self) -> bool {
        self.use_gc
    }

    /// Register a struct class, returning the existing id for a known name
    pub fn register_struct(&mut self, name: &str, fields: Vec<AnyType>) -> StructId {
        if let Some(&id) = self.struct_names.get(name) {
            return id;
        }
        let id = StructId(self.structs.len() as u32);
        let type_index = self.allocate_type_index();
        let vtable = self.allocate_vtable();
        self.structs.push(StructType {
            id,
            name: name.to_string(),
            vtable,
            type_index,
            fields,
        });
        self.struct_names.insert(name.to_string(), id);
        id
    }

    /// The interned array type for an element type
    ///
    /// Repeated requests for the same element return the same id.
    pub fn array_type(&mut self, element: AnyType) -> CompileResult<ArrayId> {
        if let Some(&id) = self.array_ids.get(&element) {
            return Ok(id);
        }

        let name = format!("[{}", self.descriptor(element)?);
        let element_local = self.lower(element)?;
        let native = if self.use_gc {
            let storage = self.storage_type(element)?;
            Some(NativeArrayType {
                type_index: self.allocate_type_index(),
                storage,
            })
        } else {
            None
        };

        let id = ArrayId(self.arrays.len() as u32);
        let type_index = self.allocate_type_index();
        let vtable = self.allocate_vtable();
        log::trace!("array type {} for element {} (vtable {})", name, element, vtable);
        self.arrays.push(ArrayType {
            id,
            element,
            name,
            vtable,
            type_index,
            element_local,
            native,
        });
        self.array_ids.insert(element, id);
        Ok(id)
    }

    /// Look up an array type
    pub fn array(&self, id: ArrayId) -> CompileResult<&ArrayType> {
        self.arrays
            .get(id.0 as usize)
            .ok_or_else(|| CompileError::internal(format!("Unknown array type {}", id.0)))
    }

    /// Look up a struct type
    pub fn struct_type(&self, id: StructId) -> CompileResult<&StructType> {
        self.structs
            .get(id.0 as usize)
            .ok_or_else(|| CompileError::internal(format!("Unknown struct type {}", id.0)))
    }

    /// Look up a struct by class name
    pub fn struct_by_name(&self, name: &str) -> Option<StructId> {
        self.struct_names.get(name).copied()
    }

    /// The stack type of string references
    pub fn string_type(&self) -> AnyType {
        AnyType::Struct(self.string_type)
    }

    /// Number of registered array types
    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    /// Lower to the type used for locals, parameters and the operand stack
    ///
    /// Without GC support every class reference is a host reference.
    pub fn lower(&self, ty: AnyType) -> CompileResult<WasmType> {
        match ty {
            AnyType::Value(value) => Ok(WasmType::Value(value.stack_type())),
            AnyType::Struct(id) => {
                let index = self.struct_type(id)?.type_index;
                Ok(self.class_reference(index))
            }
            AnyType::Array(id) => {
                let index = self.array(id)?.type_index;
                Ok(self.class_reference(index))
            }
        }
    }

    /// Lower to the storage type of an array element; sub-word types stay packed
    pub fn storage_type(&self, ty: AnyType) -> CompileResult<WasmType> {
        match ty {
            AnyType::Value(value) => Ok(WasmType::Value(value)),
            other => self.lower(other),
        }
    }

    /// Class-file style type descriptor
    pub fn descriptor(&self, ty: AnyType) -> CompileResult<String> {
        let descriptor = match ty {
            AnyType::Value(value) => match value {
                ValueType::I32 => "I".to_string(),
                ValueType::I64 => "J".to_string(),
                ValueType::F32 => "F".to_string(),
                ValueType::F64 => "D".to_string(),
                ValueType::I8 => "B".to_string(),
                ValueType::I16 => "S".to_string(),
                ValueType::U16 => "C".to_string(),
                ValueType::Bool => "Z".to_string(),
                ValueType::FuncRef
                | ValueType::ExternRef
                | ValueType::AnyRef
                | ValueType::EqRef => "Ljava/lang/Object;".to_string(),
            },
            AnyType::Struct(id) => format!("L{};", self.struct_type(id)?.name),
            AnyType::Array(id) => self.array(id)?.name.clone(),
        };
        Ok(descriptor)
    }

    /// Method descriptor such as `(II)[I`
    pub fn method_descriptor(
        &self,
        params: &[AnyType],
        result: Option<AnyType>,
    ) -> CompileResult<String> {
        let mut descriptor = String::from("(");
        for param in params {
            descriptor.push_str(&self.descriptor(*param)?);
        }
        descriptor.push(')');
        match result {
            Some(result) => descriptor.push_str(&self.descriptor(result)?),
            None => descriptor.push('V'),
        }
        Ok(descriptor)
    }

    /// Readable name of a type, class names for references
    pub fn type_name(&self, ty: AnyType) -> CompileResult<String> {
        match ty {
            AnyType::Value(value) => Ok(value.name().to_string()),
            AnyType::Struct(id) => Ok(self.struct_type(id)?.name.clone()),
            AnyType::Array(id) => Ok(self.array(id)?.name.clone()),
        }
    }

    fn class_reference(&self, type_index: u32) -> WasmType {
        if self.use_gc {
            WasmType::Ref(type_index)
        } else {
            WasmType::Value(ValueType::ExternRef)
        }
    }

    fn allocate_type_index(&mut self) -> u32 {
        let index = self.next_type_index;
        self.next_type_index += 1;
        index
    }

    fn allocate_vtable(&mut self) -> i32 {
        let vtable = self.next_vtable;
        self.next_vtable += 1;
        vtable
    }
}
