//! Array codegen strategy
//!
//! With native GC types (profile A) element access is inline code and only
//! allocation goes through a synthesized target-code helper per element
//! type. Without them (profile B) every array operation calls a small host
//! script helper that keeps the backing buffer in a sealed object
//! `{0: vtable, 1: hashcode, 2: buffer}`.
//!
//! Host helpers are keyed by the function-signature type of the element, so
//! `byte`, `short` and `int` arrays share `array_get_i32`; only allocation
//! depends on the concrete element because it picks the buffer kind.

use crate::error::CompileResult;
use crate::functions::{FunctionBody, FunctionId, FunctionName};
use crate::ir::instr::EmitContext;
use crate::ir::types::{ArrayId, ArrayType, TypeRegistry};
use crate::ir::{AnyType, ArrayOperator, CodeOp};
use crate::options::CompilerOptions;
use jwasm_bytecode::{Opcode, ValueType};

/// Class name of the target-code array helpers
pub const NATIVE_HELPER_CLASS: &str = "jwasm/runtime/Arrays";

/// Register the helper an array operation needs, if any
///
/// Returns `None` when the operation is emitted inline.
pub fn select(
    op: ArrayOperator,
    array: ArrayId,
    ctx: &mut EmitContext<'_>,
) -> CompileResult<Option<FunctionId>> {
    let array = ctx.types.array(array)?;
    let helper = if ctx.options.use_gc {
        native_helper(op, array, ctx.types)?
    } else {
        Some(host_helper(op, array, ctx.types, ctx.options)?)
    };
    Ok(helper.map(|(name, body)| ctx.functions.mark_synthetic_as_needed(&name, body)))
}

/// Profile A: allocation helpers in target code, everything else inline
pub fn native_helper(
    op: ArrayOperator,
    array: &ArrayType,
    types: &TypeRegistry,
) -> CompileResult<Option<(FunctionName, FunctionBody)>> {
    let native = array.native()?;
    let element = element_name(array, types)?;
    let (method, params, vtable) = match op {
        ArrayOperator::New => (
            format!("array_new_{}", element),
            vec![AnyType::I32],
            CodeOp::I32Const(array.vtable),
        ),
        ArrayOperator::NewArrayWithRtt => (
            format!("array_new_rtt_{}", element),
            vec![AnyType::I32, AnyType::I32],
            CodeOp::Indexed(Opcode::LocalGet, 1),
        ),
        ArrayOperator::Get
        | ArrayOperator::GetS
        | ArrayOperator::GetU
        | ArrayOperator::Set
        | ArrayOperator::Len => return Ok(None),
    };

    let result = Some(array.as_any());
    let signature = types.method_descriptor(&params, result)?;
    let name = FunctionName::new(NATIVE_HELPER_CLASS, method, signature, params, result);
    let body = FunctionBody::Code(vec![
        vtable,
        CodeOp::I32Const(0),
        CodeOp::Indexed(Opcode::LocalGet, 0),
        CodeOp::Indexed(Opcode::ArrayNewDefault, native.type_index),
        CodeOp::Indexed(Opcode::StructNew, array.type_index),
        CodeOp::Op(Opcode::Return),
    ]);
    Ok(Some((name, body)))
}

/// Profile B: one host script helper per operator and signature type
pub fn host_helper(
    op: ArrayOperator,
    array: &ArrayType,
    types: &TypeRegistry,
    options: &CompilerOptions,
) -> CompileResult<(FunctionName, FunctionBody)> {
    let reference = AnyType::Value(ValueType::ExternRef);
    let function_type = host_function_type(array.element);
    let function_type_name = function_type.name();

    let (method, params, result, code) = match op {
        ArrayOperator::New => (
            format!("array_new_{}", element_name(array, types)?),
            vec![AnyType::I32],
            Some(array.as_any()),
            format!(
                "(l)=>Object.seal({{0:{},1:0,2:{}}})",
                array.vtable,
                host_buffer(array.element)
            ),
        ),
        ArrayOperator::NewArrayWithRtt => (
            format!("array_new_rtt_{}", element_name(array, types)?),
            vec![AnyType::I32, AnyType::I32],
            Some(array.as_any()),
            format!("(l,t)=>Object.seal({{0:t,1:0,2:{}}})", host_buffer(array.element)),
        ),
        ArrayOperator::Get | ArrayOperator::GetS | ArrayOperator::GetU => (
            format!("array_get_{}", function_type_name),
            vec![reference, AnyType::I32],
            Some(AnyType::Value(function_type)),
            "(a,i)=>a[2][i]".to_string(),
        ),
        ArrayOperator::Set => (
            format!("array_set_{}", function_type_name),
            vec![reference, AnyType::I32, AnyType::Value(function_type)],
            None,
            "(a,i,v)=>a[2][i]=v".to_string(),
        ),
        ArrayOperator::Len => (
            "array_len".to_string(),
            vec![reference],
            Some(AnyType::I32),
            "(a)=>a[2].length".to_string(),
        ),
    };

    let signature = types.method_descriptor(&params, result)?;
    let name = FunctionName::new(options.host_module.as_str(), method, signature, params, result);
    let body = FunctionBody::HostScript {
        module: options.host_module.clone(),
        code,
    };
    Ok((name, body))
}

/// The value type an element has in a host function signature
///
/// Sub-word types do not exist in signatures and widen to `i32`; all
/// references are host references.
pub fn host_function_type(element: AnyType) -> ValueType {
    match element {
        AnyType::Value(ty) if ty.is_sub_word() => ValueType::I32,
        AnyType::Value(ty) if ty.is_ref_type() => ValueType::ExternRef,
        AnyType::Value(ty) => ty,
        AnyType::Struct(_) | AnyType::Array(_) => ValueType::ExternRef,
    }
}

/// Host expression allocating a backing buffer of length `l`
fn host_buffer(element: AnyType) -> &'static str {
    match element {
        AnyType::Value(ValueType::I8) => "new Int8Array(l)",
        AnyType::Value(ValueType::Bool) => "new Uint8Array(l)",
        AnyType::Value(ValueType::I16) => "new Int16Array(l)",
        AnyType::Value(ValueType::U16) => "new Uint16Array(l)",
        AnyType::Value(ValueType::I32) => "new Int32Array(l)",
        AnyType::Value(ValueType::I64) => "new BigInt64Array(l)",
        AnyType::Value(ValueType::F32) => "new Float32Array(l)",
        AnyType::Value(ValueType::F64) => "new Float64Array(l)",
        _ => "Object.seal(new Array(l).fill(null))",
    }
}

/// Element part of a helper name
fn element_name(array: &ArrayType, types: &TypeRegistry) -> CompileResult<String> {
    match array.element {
        AnyType::Value(ty) => Ok(ty.name().to_string()),
        other => Ok(valid_js_name(&types.type_name(other)?)),
    }
}

/// Make a class name usable as a host identifier
pub fn valid_js_name(name: &str) -> String {
    name.chars()
        .filter(|&c| c != ';')
        .map(|c| match c {
            '[' | '/' | '.' => '_',
            c => c,
        })
        .collect()
}
