//! Numeric conversions
//!
//! A closed set of source-to-target numeric conversions with fixed stack
//! contracts. Float-to-integer conversions saturate at the destination bounds
//! and map NaN to zero; sub-word conversions from `int` wrap to the
//! destination width, with `char` unsigned and `byte`/`short` signed.

use crate::error::{CompileError, CompileResult};
use crate::ir::NumericValue;
use jwasm_bytecode::ValueType;

/// Legal numeric conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTypeConversion {
    /// long to int
    L2I,
    /// float to int
    F2I,
    /// double to int
    D2I,
    /// int to byte
    I2B,
    /// int to char
    I2C,
    /// int to short
    I2S,
    /// int to long
    I2L,
    /// float to long
    F2L,
    /// double to long
    D2L,
    /// int to float
    I2F,
    /// long to float
    L2F,
    /// double to float
    D2F,
    /// int to double
    I2D,
    /// long to double
    L2D,
    /// float to double
    F2D,
}

impl ValueTypeConversion {
    pub const ALL: [ValueTypeConversion; 15] = [
        ValueTypeConversion::L2I,
        ValueTypeConversion::F2I,
        ValueTypeConversion::D2I,
        ValueTypeConversion::I2B,
        ValueTypeConversion::I2C,
        ValueTypeConversion::I2S,
        ValueTypeConversion::I2L,
        ValueTypeConversion::F2L,
        ValueTypeConversion::D2L,
        ValueTypeConversion::I2F,
        ValueTypeConversion::L2F,
        ValueTypeConversion::D2F,
        ValueTypeConversion::I2D,
        ValueTypeConversion::L2D,
        ValueTypeConversion::F2D,
    ];

    /// The type consumed from the stack
    pub fn pop_type(self) -> ValueType {
        use ValueTypeConversion::*;
        match self {
            I2B | I2C | I2S | I2L | I2F | I2D => ValueType::I32,
            L2I | L2F | L2D => ValueType::I64,
            F2I | F2L | F2D => ValueType::F32,
            D2I | D2L | D2F => ValueType::F64,
        }
    }

    /// The type produced on the stack
    ///
    /// Sub-word results are already widened back to `i32`.
    pub fn push_type(self) -> ValueType {
        use ValueTypeConversion::*;
        match self {
            L2I | F2I | D2I | I2B | I2C | I2S => ValueType::I32,
            I2L | F2L | D2L => ValueType::I64,
            I2F | L2F | D2F => ValueType::F32,
            I2D | L2D | F2D => ValueType::F64,
        }
    }

    /// Lower-case mnemonic, e.g. `l2i`
    pub fn name(self) -> &'static str {
        use ValueTypeConversion::*;
        match self {
            L2I => "l2i",
            F2I => "f2i",
            D2I => "d2i",
            I2B => "i2b",
            I2C => "i2c",
            I2S => "i2s",
            I2L => "i2l",
            F2L => "f2l",
            D2L => "d2l",
            I2F => "i2f",
            L2F => "l2f",
            D2F => "d2f",
            I2D => "i2d",
            L2D => "l2d",
            F2D => "f2d",
        }
    }

    /// Evaluate the conversion on a constant operand
    pub fn apply(self, value: NumericValue) -> CompileResult<NumericValue> {
        use NumericValue as V;
        use ValueTypeConversion::*;
        let result = match (self, value) {
            (L2I, V::I64(v)) => V::I32(v as i32),
            (F2I, V::F32(v)) => V::I32(v as i32),
            (D2I, V::F64(v)) => V::I32(v as i32),
            (I2B, V::I32(v)) => V::I32(i32::from(v as i8)),
            (I2C, V::I32(v)) => V::I32(i32::from(v as u16)),
            (I2S, V::I32(v)) => V::I32(i32::from(v as i16)),
            (I2L, V::I32(v)) => V::I64(i64::from(v)),
            (F2L, V::F32(v)) => V::I64(v as i64),
            (D2L, V::F64(v)) => V::I64(v as i64),
            (I2F, V::I32(v)) => V::F32(v as f32),
            (L2F, V::I64(v)) => V::F32(v as f32),
            (D2F, V::F64(v)) => V::F32(v as f32),
            (I2D, V::I32(v)) => V::F64(f64::from(v)),
            (L2D, V::I64(v)) => V::F64(v as f64),
            (F2D, V::F32(v)) => V::F64(f64::from(v)),
            (conversion, value) => {
                return Err(CompileError::internal(format!(
                    "Conversion {} cannot be applied to {} value {}",
                    conversion,
                    value.value_type(),
                    value
                )))
            }
        };
        Ok(result)
    }
}

impl std::fmt::Display for ValueTypeConversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ValueTypeConversion::*;

    fn int(value: NumericValue) -> i32 {
        match value {
            NumericValue::I32(v) => v,
            other => panic!("expected i32, got {:?}", other),
        }
    }

    fn long(value: NumericValue) -> i64 {
        match value {
            NumericValue::I64(v) => v,
            other => panic!("expected i64, got {:?}", other),
        }
    }

    #[test]
    fn test_tables_agree_with_apply() {
        for conversion in ValueTypeConversion::ALL {
            let operand = match conversion.pop_type() {
                ValueType::I32 => NumericValue::I32(1),
                ValueType::I64 => NumericValue::I64(1),
                ValueType::F32 => NumericValue::F32(1.0),
                ValueType::F64 => NumericValue::F64(1.0),
                other => panic!("unexpected pop type {}", other),
            };
            let result = conversion.apply(operand).unwrap();
            assert_eq!(result.value_type(), conversion.push_type(), "{}", conversion);
        }
    }

    #[test]
    fn test_float_to_int_saturates() {
        assert_eq!(int(F2I.apply(NumericValue::F32(1e20)).unwrap()), i32::MAX);
        assert_eq!(int(F2I.apply(NumericValue::F32(-1e20)).unwrap()), i32::MIN);
        assert_eq!(int(D2I.apply(NumericValue::F64(3e9)).unwrap()), i32::MAX);
        assert_eq!(long(D2L.apply(NumericValue::F64(-1e300)).unwrap()), i64::MIN);
        assert_eq!(long(F2L.apply(NumericValue::F32(f32::INFINITY)).unwrap()), i64::MAX);
    }

    #[test]
    fn test_nan_converts_to_zero() {
        assert_eq!(int(F2I.apply(NumericValue::F32(f32::NAN)).unwrap()), 0);
        assert_eq!(int(D2I.apply(NumericValue::F64(f64::NAN)).unwrap()), 0);
        assert_eq!(long(F2L.apply(NumericValue::F32(f32::NAN)).unwrap()), 0);
        assert_eq!(long(D2L.apply(NumericValue::F64(f64::NAN)).unwrap()), 0);
    }

    #[test]
    fn test_truncation_toward_zero() {
        assert_eq!(int(D2I.apply(NumericValue::F64(-2.9)).unwrap()), -2);
        assert_eq!(int(F2I.apply(NumericValue::F32(2.9)).unwrap()), 2);
    }

    #[test]
    fn test_sub_word_narrowing_wraps() {
        assert_eq!(int(I2B.apply(NumericValue::I32(200)).unwrap()), -56);
        assert_eq!(int(I2B.apply(NumericValue::I32(-129)).unwrap()), 127);
        assert_eq!(int(I2S.apply(NumericValue::I32(40_000)).unwrap()), -25_536);
        assert_eq!(int(I2C.apply(NumericValue::I32(-1)).unwrap()), 0xFFFF);
        assert_eq!(int(I2C.apply(NumericValue::I32(0x1_0041)).unwrap()), 0x41);
    }

    #[test]
    fn test_widen_then_narrow_is_identity() {
        for v in [0, 1, -1, i32::MAX, i32::MIN, 123_456] {
            let wide = I2L.apply(NumericValue::I32(v)).unwrap();
            assert_eq!(int(L2I.apply(wide).unwrap()), v);
            let double = I2D.apply(NumericValue::I32(v)).unwrap();
            assert_eq!(int(D2I.apply(double).unwrap()), v);
        }
        let float = F2D.apply(NumericValue::F32(0.1)).unwrap();
        assert_eq!(D2F.apply(float).unwrap(), NumericValue::F32(0.1));
    }

    #[test]
    fn test_long_to_int_wraps() {
        assert_eq!(int(L2I.apply(NumericValue::I64(1 << 32)).unwrap()), 0);
        assert_eq!(int(L2I.apply(NumericValue::I64(-1)).unwrap()), -1);
    }

    #[test]
    fn test_wrong_operand_type() {
        let err = L2I.apply(NumericValue::F32(1.0)).unwrap_err();
        assert!(matches!(err, CompileError::Internal { .. }));
        assert!(err.to_string().contains("l2i"));
    }
}
