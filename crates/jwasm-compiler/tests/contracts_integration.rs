//! Integration tests for instruction stack contracts, local slots and conversions

use jwasm_compiler::{
    AnyType, ArrayOperator, BlockOperator, CodePosition, CompileError, CompilerOptions,
    FunctionCode, FunctionName, HostNumber, Instruction, LocalVariableManager, ModuleCompiler,
    NumericOperator, NumericValue, TextModuleWriter, TypeRegistry, ValueType, ValueTypeConversion,
    VariableOperator,
};

fn every_instruction(types: &mut TypeRegistry, locals: &mut LocalVariableManager) -> Vec<Instruction> {
    let pos = CodePosition::new(0, 1);
    let mut all = Vec::new();

    for value in [
        NumericValue::I32(1),
        NumericValue::I64(2),
        NumericValue::F32(3.0),
        NumericValue::F64(4.0),
    ] {
        all.push(Instruction::constant(value, pos));
    }
    for conversion in ValueTypeConversion::ALL {
        all.push(Instruction::convert(conversion, pos));
    }
    let index = locals.resolve(0, AnyType::F32, pos);
    for op in [VariableOperator::Get, VariableOperator::Set, VariableOperator::Tee] {
        all.push(Instruction::local(op, index, pos));
        all.push(Instruction::load_store(op, 3, AnyType::I64, pos));
    }
    for ty in [ValueType::I32, ValueType::I64, ValueType::F32, ValueType::F64] {
        for op in NumericOperator::ALL {
            let instr = Instruction::numeric(op, ty, pos);
            if instr.pop_count().is_ok() {
                all.push(instr);
            }
        }
    }
    let string = types.string_type();
    for element in [
        AnyType::I32,
        AnyType::F64,
        ValueType::I8.into(),
        ValueType::U16.into(),
        ValueType::Bool.into(),
        string,
    ] {
        let array = types.array_type(element).unwrap();
        for op in ArrayOperator::ALL {
            all.push(Instruction::array(op, element, array, pos));
        }
    }
    all.push(Instruction::call(
        FunctionName::new(
            "demo/Util",
            "mix",
            "(IJLjava/lang/String;)V",
            vec![AnyType::I32, AnyType::I64, string],
            None,
        ),
        None,
        pos,
    ));
    all.push(Instruction::string_const(0, string, pos));
    all.push(Instruction::block(BlockOperator::Return, Some(AnyType::F64), 0, pos));
    all.push(Instruction::block(BlockOperator::Return, None, 0, pos));
    all.push(Instruction::block(BlockOperator::Drop, Some(string), 0, pos));
    for op in [
        BlockOperator::Unreachable,
        BlockOperator::Block,
        BlockOperator::Loop,
        BlockOperator::End,
        BlockOperator::Br,
        BlockOperator::BrIf,
    ] {
        all.push(Instruction::block(op, None, 0, pos));
    }
    all
}

#[test]
fn test_pop_count_matches_pop_types() {
    let mut types = TypeRegistry::new(false);
    let mut locals = LocalVariableManager::new();
    let all = every_instruction(&mut types, &mut locals);
    for instr in &all {
        instr.resolve_locals(&mut locals);
    }

    for instr in &all {
        let count = instr.pop_count().unwrap();
        let types = instr.pop_types(&locals).unwrap();
        match types {
            None => assert_eq!(count, 0, "{:?}", instr.kind()),
            Some(types) => {
                assert!(!types.is_empty());
                assert_eq!(types.len(), count, "{:?}", instr.kind());
            }
        }
        // Queries are pure
        assert_eq!(instr.push_type(&locals).unwrap(), instr.push_type(&locals).unwrap());
    }
}

#[test]
fn test_numeric_operators_exclude_illegal_float_pairs() {
    let pos = CodePosition::unknown();
    for op in [
        NumericOperator::Rem,
        NumericOperator::And,
        NumericOperator::Or,
        NumericOperator::Xor,
        NumericOperator::Shl,
        NumericOperator::ShrS,
        NumericOperator::ShrU,
        NumericOperator::Eqz,
    ] {
        for ty in [ValueType::F32, ValueType::F64] {
            let instr = Instruction::numeric(op, ty, pos);
            assert!(matches!(
                instr.pop_count(),
                Err(CompileError::UnknownOperator { .. })
            ));
        }
    }
}

#[test]
fn test_slot_mapping_is_deterministic() {
    let run = || {
        let mut locals = LocalVariableManager::new();
        locals.add_param(0, AnyType::I32).unwrap();
        let pos = CodePosition::unknown();
        let uses = [
            (1, AnyType::I32),
            (1, AnyType::F64),
            (2, AnyType::I64),
            (1, AnyType::I32),
            (0, AnyType::I32),
            (2, AnyType::I64),
            (1, AnyType::F64),
        ];
        uses.iter()
            .map(|(slot, ty)| locals.resolve(*slot, *ty, pos))
            .collect::<Vec<_>>()
    };
    let first = run();
    assert_eq!(first, vec![1, 2, 3, 1, 0, 3, 2]);
    assert_eq!(first, run());
}

#[test]
fn test_slot_reuse_across_types_in_a_function() {
    let mut compiler = ModuleCompiler::new(CompilerOptions::default());
    let mut writer = TextModuleWriter::new(compiler.options());
    let pos = |offset| CodePosition::new(offset, 1);
    // slot 1 holds an int, then a double
    let code = FunctionCode::new(
        FunctionName::new("demo/Slots", "reuse", "()D", Vec::new(), Some(AnyType::F64)),
        vec![
            Instruction::constant(NumericValue::I32(7), pos(0)),
            Instruction::load_store(VariableOperator::Set, 1, AnyType::I32, pos(1)),
            Instruction::load_store(VariableOperator::Get, 1, AnyType::I32, pos(2)),
            Instruction::convert(ValueTypeConversion::I2D, pos(3)),
            Instruction::load_store(VariableOperator::Set, 1, AnyType::F64, pos(4)),
            Instruction::load_store(VariableOperator::Get, 1, AnyType::F64, pos(5)),
            Instruction::block(BlockOperator::Return, Some(AnyType::F64), 0, pos(6)),
        ],
    );
    compiler.compile_function(&mut writer, &code).unwrap();
    assert_eq!(
        writer.output(),
        "(func $demo/Slots.reuse (result f64)\n  (local i32 f64)\n  i32.const 7\n  local.set 0\n  local.get 0\n  f64.convert_i32_s\n  local.set 1\n  local.get 1\n  return\n)\n"
    );
}

#[test]
fn test_conversion_laws() {
    for v in [i32::MIN, -129, -1, 0, 1, 127, 128, 40_000, i32::MAX] {
        // Widening then narrowing back is the identity
        let wide = ValueTypeConversion::I2L.apply(NumericValue::I32(v)).unwrap();
        assert_eq!(ValueTypeConversion::L2I.apply(wide).unwrap(), NumericValue::I32(v));

        // Narrowing is idempotent
        for narrow in [ValueTypeConversion::I2B, ValueTypeConversion::I2S, ValueTypeConversion::I2C] {
            let once = narrow.apply(NumericValue::I32(v)).unwrap();
            assert_eq!(narrow.apply(once).unwrap(), once);
        }
    }

    for (value, expected) in [
        (f64::NAN, 0),
        (f64::INFINITY, i32::MAX),
        (f64::NEG_INFINITY, i32::MIN),
        (1e20, i32::MAX),
        (-2.9, -2),
    ] {
        assert_eq!(
            ValueTypeConversion::D2I.apply(NumericValue::F64(value)).unwrap(),
            NumericValue::I32(expected)
        );
    }
    assert_eq!(
        ValueTypeConversion::I2C.apply(NumericValue::I32(-1)).unwrap(),
        NumericValue::I32(0xFFFF)
    );
}

#[test]
fn test_host_number_constants() {
    let pos = CodePosition::new(4, 2);
    let locals = LocalVariableManager::new();
    let cases = [
        (HostNumber::Int(1), AnyType::I32),
        (HostNumber::Long(1), AnyType::I64),
        (HostNumber::Float(1.0), AnyType::F32),
        (HostNumber::Double(1.0), AnyType::F64),
    ];
    for (number, ty) in cases {
        let instr = Instruction::host_constant(number, pos).unwrap();
        assert_eq!(instr.push_type(&locals).unwrap(), Some(ty));
    }
    for number in [HostNumber::Byte(1), HostNumber::Short(1), HostNumber::Char(1)] {
        let err = Instruction::host_constant(number, pos).unwrap_err();
        assert!(err.to_string().contains(number.type_name()), "{}", err);
        assert!(err.to_string().contains("offset 4 (line 2)"), "{}", err);
    }
}
