use std::fmt;

use serde::Deserialize;

/// Numeric classification of a runtime type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericCategory {
    /// Not a number: references, `void`, `TypedReference`.
    NaN,
    Int,
    Float,
    NativeInt,
}

/// Concrete runtime types known to the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClrType {
    Void,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    IntPtr,
    UIntPtr,
    Single,
    Double,
    TypedReference,
    String,
    Object,
}

impl ClrType {
    pub const fn numeric_category(self) -> NumericCategory {
        match self {
            ClrType::Boolean
            | ClrType::Char
            | ClrType::SByte
            | ClrType::Byte
            | ClrType::Int16
            | ClrType::UInt16
            | ClrType::Int32
            | ClrType::UInt32
            | ClrType::Int64
            | ClrType::UInt64 => NumericCategory::Int,
            ClrType::IntPtr | ClrType::UIntPtr => NumericCategory::NativeInt,
            ClrType::Single | ClrType::Double => NumericCategory::Float,
            ClrType::Void | ClrType::TypedReference | ClrType::String | ClrType::Object => {
                NumericCategory::NaN
            }
        }
    }

    /// Width in bytes. Zero for non-numeric types; native ints report the
    /// 64-bit width.
    pub const fn precision(self) -> u8 {
        match self {
            ClrType::Boolean | ClrType::SByte | ClrType::Byte => 1,
            ClrType::Char | ClrType::Int16 | ClrType::UInt16 => 2,
            ClrType::Int32 | ClrType::UInt32 | ClrType::Single => 4,
            ClrType::Int64
            | ClrType::UInt64
            | ClrType::Double
            | ClrType::IntPtr
            | ClrType::UIntPtr => 8,
            ClrType::Void | ClrType::TypedReference | ClrType::String | ClrType::Object => 0,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ClrType::SByte
                | ClrType::Int16
                | ClrType::Int32
                | ClrType::Int64
                | ClrType::IntPtr
                | ClrType::Single
                | ClrType::Double
        )
    }

    /// Evaluation-stack category (ECMA-335 §III.1.1).
    pub const fn stack_type(self) -> StackType {
        match self.numeric_category() {
            NumericCategory::Int if self.precision() <= 4 => StackType::Int32,
            NumericCategory::Int => StackType::Int64,
            NumericCategory::NativeInt => StackType::NativeInt,
            NumericCategory::Float => StackType::Float,
            NumericCategory::NaN => match self {
                ClrType::TypedReference => StackType::TypedRef,
                _ => StackType::Object,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ClrType::Void => "void",
            ClrType::Boolean => "boolean",
            ClrType::Char => "char",
            ClrType::SByte => "sbyte",
            ClrType::Byte => "byte",
            ClrType::Int16 => "int16",
            ClrType::UInt16 => "uint16",
            ClrType::Int32 => "int32",
            ClrType::UInt32 => "uint32",
            ClrType::Int64 => "int64",
            ClrType::UInt64 => "uint64",
            ClrType::IntPtr => "intptr",
            ClrType::UIntPtr => "uintptr",
            ClrType::Single => "single",
            ClrType::Double => "double",
            ClrType::TypedReference => "typedreference",
            ClrType::String => "string",
            ClrType::Object => "object",
        }
    }
}

impl fmt::Display for ClrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The six evaluation-stack categories the inference tables are keyed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackType {
    Int32 = 0,
    Int64 = 1,
    NativeInt = 2,
    Float = 3,
    /// Managed pointer / `TypedReference` (`&` in Partition III tables).
    TypedRef = 4,
    Object = 5,
}

impl StackType {
    pub const COUNT: usize = 6;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StackType::Int32 => "int32",
            StackType::Int64 => "int64",
            StackType::NativeInt => "native int",
            StackType::Float => "F",
            StackType::TypedRef => "&",
            StackType::Object => "O",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_are_int32() {
        for ty in [
            ClrType::Boolean,
            ClrType::Char,
            ClrType::SByte,
            ClrType::Byte,
            ClrType::Int16,
            ClrType::UInt16,
            ClrType::Int32,
            ClrType::UInt32,
        ] {
            assert_eq!(ty.stack_type(), StackType::Int32, "{ty}");
        }
    }

    #[test]
    fn remaining_categories() {
        assert_eq!(ClrType::Int64.stack_type(), StackType::Int64);
        assert_eq!(ClrType::UInt64.stack_type(), StackType::Int64);
        assert_eq!(ClrType::IntPtr.stack_type(), StackType::NativeInt);
        assert_eq!(ClrType::UIntPtr.stack_type(), StackType::NativeInt);
        assert_eq!(ClrType::Single.stack_type(), StackType::Float);
        assert_eq!(ClrType::Double.stack_type(), StackType::Float);
        assert_eq!(ClrType::TypedReference.stack_type(), StackType::TypedRef);
        assert_eq!(ClrType::String.stack_type(), StackType::Object);
        assert_eq!(ClrType::Object.stack_type(), StackType::Object);
        assert_eq!(ClrType::Void.stack_type(), StackType::Object);
    }

    #[test]
    fn signedness() {
        assert!(ClrType::Int32.is_signed());
        assert!(!ClrType::UInt32.is_signed());
        assert!(!ClrType::Boolean.is_signed());
    }
}
