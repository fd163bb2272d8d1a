//! Value descriptors flowing through the symbolic executor.
//!
//! Every operand has a canonical name that doubles as its identity:
//! `A<index>` for arguments, `L<index>` for locals, `T<seq>` for
//! temporaries, `C<value>` for constants and `PC` for branch targets.

use std::fmt;

use crate::types::ClrType;

/// Literal carried by a constant operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constant {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl Constant {
    pub const fn ty(self) -> ClrType {
        match self {
            Constant::Int32(_) => ClrType::Int32,
            Constant::Int64(_) => ClrType::Int64,
            Constant::Float32(_) => ClrType::Single,
            Constant::Float64(_) => ClrType::Double,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int32(v) => write!(f, "{v}"),
            Constant::Int64(v) => write!(f, "{v}"),
            Constant::Float32(v) => write!(f, "{v}"),
            Constant::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// Discriminant of an [`Operand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandTag {
    Argument,
    Local,
    Temp,
    Const,
    BranchTarget,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    Argument { index: u16, ty: ClrType },
    Local { index: u16, ty: ClrType },
    /// Evaluation-stack value. `seq` is unique within one compilation.
    Temp { seq: u32, ty: ClrType },
    Const(Constant),
    /// Control-flow destination given as a logical instruction index.
    BranchTarget { index: usize },
}

impl Operand {
    pub fn name(&self) -> String {
        match self {
            Operand::Argument { index, .. } => format!("A{index}"),
            Operand::Local { index, .. } => format!("L{index}"),
            Operand::Temp { seq, .. } => format!("T{seq}"),
            Operand::Const(c) => format!("C{c}"),
            Operand::BranchTarget { .. } => "PC".to_string(),
        }
    }

    /// Declared type; `void` for branch targets.
    pub const fn ty(&self) -> ClrType {
        match *self {
            Operand::Argument { ty, .. } | Operand::Local { ty, .. } | Operand::Temp { ty, .. } => {
                ty
            }
            Operand::Const(c) => c.ty(),
            Operand::BranchTarget { .. } => ClrType::Void,
        }
    }

    pub const fn tag(&self) -> OperandTag {
        match self {
            Operand::Argument { .. } => OperandTag::Argument,
            Operand::Local { .. } => OperandTag::Local,
            Operand::Temp { .. } => OperandTag::Temp,
            Operand::Const(_) => OperandTag::Const,
            Operand::BranchTarget { .. } => OperandTag::BranchTarget,
        }
    }

    pub const fn branch_target(&self) -> Option<usize> {
        match *self {
            Operand::BranchTarget { index } => Some(index),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::BranchTarget { index } => write!(f, "PC:{index}"),
            other => write!(f, "{}:{}", other.name(), other.ty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        let arg = Operand::Argument { index: 2, ty: ClrType::Int32 };
        let local = Operand::Local { index: 0, ty: ClrType::Double };
        let temp = Operand::Temp { seq: 17, ty: ClrType::Int64 };
        let pc = Operand::BranchTarget { index: 4 };
        assert_eq!(arg.name(), "A2");
        assert_eq!(local.name(), "L0");
        assert_eq!(temp.name(), "T17");
        assert_eq!(pc.name(), "PC");
        assert_eq!(pc.ty(), ClrType::Void);
    }

    #[test]
    fn constant_names_carry_the_value() {
        assert_eq!(Operand::Const(Constant::Int32(-1)).name(), "C-1");
        assert_eq!(Operand::Const(Constant::Int64(1 << 40)).name(), "C1099511627776");
        assert_eq!(Operand::Const(Constant::Float64(1.5)).name(), "C1.5");
        assert_eq!(Operand::Const(Constant::Float32(2.0)).ty(), ClrType::Single);
    }

    #[test]
    fn display_includes_type() {
        let temp = Operand::Temp { seq: 3, ty: ClrType::Int32 };
        assert_eq!(temp.to_string(), "T3:int32");
        assert_eq!(Operand::BranchTarget { index: 9 }.to_string(), "PC:9");
    }
}
