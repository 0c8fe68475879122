//! Integration tests for array code generation in both capability profiles

use jwasm_compiler::{
    AnyType, ArrayOperator, BinaryModuleWriter, BlockOperator, CodePosition, CompilerOptions,
    FunctionBody, FunctionCode, FunctionName, Instruction, ModuleCompiler, NumericValue,
    TextModuleWriter, ValueType, VariableOperator,
};

fn at(offset: i32) -> CodePosition {
    CodePosition::new(offset, 10 + offset)
}

fn options(use_gc: bool) -> CompilerOptions {
    CompilerOptions {
        use_gc,
        debug_names: true,
        ..CompilerOptions::default()
    }
}

/// `static T first(T[] a) { return a[0]; }`
fn first(compiler: &mut ModuleCompiler, element: AnyType, get: ArrayOperator) -> FunctionCode {
    let get = compiler.array_instruction(get, element, at(2)).unwrap();
    let array = match get.kind() {
        jwasm_compiler::InstrKind::Array { array, .. } => AnyType::Array(*array),
        other => panic!("unexpected {:?}", other),
    };
    let result = get
        .push_type(&jwasm_compiler::LocalVariableManager::new())
        .unwrap();
    let descriptor = compiler.types().descriptor(array).unwrap();
    FunctionCode::new(
        FunctionName::new(
            "demo/Arrays",
            "first",
            format!("({})I", descriptor),
            vec![array],
            result,
        ),
        vec![
            Instruction::load_store(VariableOperator::Get, 0, array, at(0)),
            Instruction::constant(NumericValue::I32(0), at(1)),
            get,
            Instruction::block(BlockOperator::Return, result, 0, at(3)),
        ],
    )
}

/// `static T[] make(int n) { return new T[n]; }`
fn make(compiler: &mut ModuleCompiler, method: &str, element: AnyType) -> FunctionCode {
    let new = compiler
        .array_instruction(ArrayOperator::New, element, at(1))
        .unwrap();
    let array = AnyType::Array(compiler.types_mut().array_type(element).unwrap());
    FunctionCode::new(
        FunctionName::new("demo/Arrays", method, "(I)[I", vec![AnyType::I32], Some(array)),
        vec![
            Instruction::load_store(VariableOperator::Get, 0, AnyType::I32, at(0)),
            new,
            Instruction::block(BlockOperator::Return, Some(array), 0, at(2)),
        ],
    )
}

#[test]
fn test_host_profile_calls_helper() {
    let mut compiler = ModuleCompiler::new(options(false));
    let mut writer = BinaryModuleWriter::new();
    let code = first(&mut compiler, AnyType::I32, ArrayOperator::Get);
    compiler.compile_function(&mut writer, &code).unwrap();
    compiler.finish(&mut writer).unwrap();

    // local.get 0, i32.const 0, call 0, return, end; the import takes index 0
    let function = writer.function("demo/Arrays.first").unwrap();
    assert_eq!(
        function.bytes,
        vec![0x09, 0x00, 0x20, 0x00, 0x41, 0x00, 0x10, 0x00, 0x0F, 0x0B]
    );
    assert_eq!(function.index, 1);
    assert_eq!(
        function.params,
        vec![jwasm_compiler::WasmType::Value(ValueType::ExternRef)]
    );

    let helper = compiler
        .functions()
        .get(jwasm_compiler::FunctionId::new(1))
        .unwrap();
    assert_eq!(helper.name.full_name(), "NonGC.array_get_i32");
    assert!(helper.is_import);
}

#[test]
fn test_host_helpers_are_shared_between_functions() {
    let mut compiler = ModuleCompiler::new(options(false));
    let mut writer = TextModuleWriter::new(compiler.options());

    let ints = first(&mut compiler, AnyType::I32, ArrayOperator::Get);
    compiler.compile_function(&mut writer, &ints).unwrap();
    let mut bytes = first(&mut compiler, ValueType::I8.into(), ArrayOperator::GetS);
    bytes.name.method_name = "firstByte".to_string();
    compiler.compile_function(&mut writer, &bytes).unwrap();
    let mut shorts = first(&mut compiler, ValueType::I16.into(), ArrayOperator::GetS);
    shorts.name.method_name = "firstShort".to_string();
    compiler.compile_function(&mut writer, &shorts).unwrap();
    compiler.finish(&mut writer).unwrap();

    let imports: Vec<String> = compiler
        .functions()
        .host_imports()
        .map(|entry| entry.name.method_name.clone())
        .collect();
    assert_eq!(imports, vec!["array_get_i32"]);
    assert_eq!(
        writer.output().matches("call $NonGC.array_get_i32\n").count(),
        3
    );
}

#[test]
fn test_host_allocation_depends_on_element() {
    let mut compiler = ModuleCompiler::new(options(false));
    let mut writer = TextModuleWriter::new(compiler.options());
    let bytes = make(&mut compiler, "bytes", ValueType::I8.into());
    let longs = make(&mut compiler, "longs", AnyType::I64);
    compiler.compile_function(&mut writer, &bytes).unwrap();
    compiler.compile_function(&mut writer, &longs).unwrap();

    let scripts: Vec<(String, String)> = compiler
        .functions()
        .host_imports()
        .map(|entry| match &entry.body {
            Some(FunctionBody::HostScript { module, code }) => {
                assert_eq!(module, "NonGC");
                (entry.name.method_name.clone(), code.clone())
            }
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[0].0, "array_new_i8");
    assert!(scripts[0].1.contains("new Int8Array(l)"));
    assert_eq!(scripts[1].0, "array_new_i64");
    assert!(scripts[1].1.contains("new BigInt64Array(l)"));
}

#[test]
fn test_native_profile_inlines_access() {
    let mut compiler = ModuleCompiler::new(options(true));
    let mut writer = TextModuleWriter::new(compiler.options());
    let code = first(&mut compiler, AnyType::I32, ArrayOperator::Get);
    compiler.compile_function(&mut writer, &code).unwrap();
    compiler.finish(&mut writer).unwrap();

    // String is type 0; int[] uses native array 1 inside wrapper struct 2
    assert_eq!(
        writer.output(),
        "(func $demo/Arrays.first (param (ref null 2)) (result i32)\n\
         \x20 (local i32)\n\
         \x20 local.get 0\n\
         \x20 i32.const 0\n\
         \x20 local.set 1\n\
         \x20 struct.get 2 2\n\
         \x20 local.get 1\n\
         \x20 array.get 1\n\
         \x20 return\n\
         )\n"
    );
    assert_eq!(compiler.functions().needed_count(), 1);
}

#[test]
fn test_native_profile_packed_read() {
    let mut compiler = ModuleCompiler::new(options(true));
    let mut writer = TextModuleWriter::new(compiler.options());
    let code = first(&mut compiler, ValueType::U16.into(), ArrayOperator::GetU);
    compiler.compile_function(&mut writer, &code).unwrap();
    assert!(writer.output().contains("  array.get_u 1\n"));
    assert!(writer.output().contains("(result i32)"));
}

#[test]
fn test_native_allocation_helper() {
    let mut compiler = ModuleCompiler::new(options(true));
    let mut writer = TextModuleWriter::new(compiler.options());
    let a = make(&mut compiler, "a", AnyType::I32);
    let b = make(&mut compiler, "b", AnyType::I32);
    compiler.compile_function(&mut writer, &a).unwrap();
    compiler.compile_function(&mut writer, &b).unwrap();
    compiler.finish(&mut writer).unwrap();

    let text = writer.output();
    assert_eq!(text.matches("call $jwasm/runtime/Arrays.array_new_i32\n").count(), 2);
    assert!(text.contains(
        "(func $jwasm/runtime/Arrays.array_new_i32 (param i32) (result (ref null 2))\n\
         \x20 i32.const 1\n\
         \x20 i32.const 0\n\
         \x20 local.get 0\n\
         \x20 array.new_default 1\n\
         \x20 struct.new 2\n\
         \x20 return\n\
         )\n"
    ));
    assert_eq!(compiler.functions().code_functions().count(), 1);
}

#[test]
fn test_native_set_and_len() {
    let mut compiler = ModuleCompiler::new(options(true));
    let mut writer = TextModuleWriter::new(compiler.options());
    let set = compiler
        .array_instruction(ArrayOperator::Set, AnyType::F64, at(3))
        .unwrap();
    let len = compiler
        .array_instruction(ArrayOperator::Len, AnyType::F64, at(5))
        .unwrap();
    let array = AnyType::Array(compiler.types_mut().array_type(AnyType::F64).unwrap());
    let code = FunctionCode::new(
        FunctionName::new("demo/Arrays", "fill", "([D)I", vec![array], Some(AnyType::I32)),
        vec![
            Instruction::load_store(VariableOperator::Get, 0, array, at(0)),
            Instruction::constant(NumericValue::I32(0), at(1)),
            Instruction::constant(NumericValue::F64(1.5), at(2)),
            set,
            Instruction::load_store(VariableOperator::Get, 0, array, at(4)),
            len,
            Instruction::block(BlockOperator::Return, Some(AnyType::I32), 0, at(6)),
        ],
    );
    compiler.compile_function(&mut writer, &code).unwrap();

    let text = writer.output();
    assert!(text.contains("  (local f64 i32)\n"));
    assert!(text.contains(
        "  local.set 1\n  local.set 2\n  struct.get 2 2\n  local.get 2\n  local.get 1\n  array.set 1\n"
    ));
    assert!(text.contains("  struct.get 2 2\n  array.len\n  return\n"));
}

#[test]
fn test_calls_target_bodies_in_code_section_order() {
    let mut compiler = ModuleCompiler::new(options(true));
    let mut writer = BinaryModuleWriter::new();
    let make = make(&mut compiler, "make", AnyType::I32);
    let one = FunctionCode::new(
        FunctionName::new("demo/Arrays", "one", "()I", Vec::new(), Some(AnyType::I32)),
        vec![
            Instruction::constant(NumericValue::I32(1), at(0)),
            Instruction::block(BlockOperator::Return, Some(AnyType::I32), 0, at(1)),
        ],
    );
    compiler.compile_function(&mut writer, &make).unwrap();
    compiler.compile_function(&mut writer, &one).unwrap();
    compiler.finish(&mut writer).unwrap();

    let order: Vec<&str> = writer
        .functions()
        .iter()
        .map(|function| function.name.as_str())
        .collect();
    assert_eq!(
        order,
        vec![
            "demo/Arrays.make",
            "jwasm/runtime/Arrays.array_new_i32",
            "demo/Arrays.one",
        ]
    );

    // local.get 0, call 1, return, end
    let make = writer.function("demo/Arrays.make").unwrap();
    assert_eq!(make.bytes, vec![0x07, 0x00, 0x20, 0x00, 0x10, 0x01, 0x0F, 0x0B]);
    assert_eq!(writer.functions()[1].index, 1);

    let section = writer.encode_code_section().unwrap();
    assert_eq!(section[0], 3);
}

/// `static int at(T[] a) { return a[0]; }` read with an explicit extension
fn host_read(element: ValueType, get: ArrayOperator) -> String {
    let mut compiler = ModuleCompiler::new(options(false));
    let mut writer = TextModuleWriter::new(compiler.options());
    let code = first(&mut compiler, element.into(), get);
    compiler.compile_function(&mut writer, &code).unwrap();
    writer.output().to_string()
}

#[test]
fn test_host_profile_extends_packed_reads() {
    let call = "  call $NonGC.array_get_i32\n";
    let cases = [
        (ValueType::I8, ArrayOperator::GetU, "  i32.const 255\n  i32.and\n"),
        (ValueType::I16, ArrayOperator::GetU, "  i32.const 65535\n  i32.and\n"),
        (ValueType::Bool, ArrayOperator::GetS, "  i32.extend8_s\n"),
        (ValueType::U16, ArrayOperator::GetS, "  i32.extend16_s\n"),
    ];
    for (element, get, extension) in cases {
        let text = host_read(element, get);
        assert!(
            text.contains(&format!("{}{}  return\n", call, extension)),
            "{} on {}: {}",
            get,
            element,
            text
        );
    }
}

#[test]
fn test_host_profile_keeps_matching_reads() {
    let plain = "  call $NonGC.array_get_i32\n  return\n";
    for (element, get) in [
        (ValueType::I8, ArrayOperator::GetS),
        (ValueType::I16, ArrayOperator::GetS),
        (ValueType::U16, ArrayOperator::GetU),
        (ValueType::Bool, ArrayOperator::GetU),
        (ValueType::I8, ArrayOperator::Get),
        (ValueType::U16, ArrayOperator::Get),
    ] {
        let text = host_read(element, get);
        assert!(text.contains(plain), "{} on {}: {}", get, element, text);
    }
}
