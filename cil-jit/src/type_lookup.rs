//! Result types of stack operations, after ECMA-335 §III.1.5 (tables
//! III.2 through III.8).
//!
//! Every function here is pure and the tables are `static`, so lookups can
//! be shared freely across threads.

use cil_ir::{ClrType, StackType};
use cil_isa::{ExtendedOpcode, Opcode};

use crate::error::{JitError, Result};

const I32: Option<ClrType> = Some(ClrType::Int32);
const I64: Option<ClrType> = Some(ClrType::Int64);
const NAT: Option<ClrType> = Some(ClrType::IntPtr);
const F64: Option<ClrType> = Some(ClrType::Double);
const REF: Option<ClrType> = Some(ClrType::TypedReference);
const NO: Option<ClrType> = None;

/// Binary numeric operations, indexed by `[lhs][rhs]` stack type
/// (order: int32, int64, native int, F, &, O).
static BINARY: [[Option<ClrType>; StackType::COUNT]; StackType::COUNT] = [
    /* int32  */ [I32, NO, NAT, NO, REF, NO],
    /* int64  */ [NO, I64, NO, NO, NO, NO],
    /* native */ [NAT, NO, NAT, NO, REF, NO],
    /* F      */ [NO, NO, NO, F64, NO, NO],
    /* &      */ [REF, NO, REF, NO, NO, NO],
    /* O      */ [NO, NO, NO, NO, NO, NO],
];

/// Table III.2 lookup.
pub fn binary_numeric(op: &'static str, lhs: ClrType, rhs: ClrType) -> Result<ClrType> {
    BINARY[lhs.stack_type().index()][rhs.stack_type().index()]
        .ok_or(JitError::IllegalOperandTypes { op, lhs, rhs })
}

/// `sub` additionally allows the difference of two managed pointers.
fn subtract(op: &'static str, lhs: ClrType, rhs: ClrType) -> Result<ClrType> {
    match (lhs.stack_type(), rhs.stack_type()) {
        (StackType::TypedRef, StackType::TypedRef) => Ok(ClrType::IntPtr),
        _ => binary_numeric(op, lhs, rhs),
    }
}

/// Table III.3: the result has the operand's type.
pub fn unary_numeric(op: &'static str, ty: ClrType) -> Result<ClrType> {
    match ty.stack_type() {
        StackType::Int32 | StackType::Int64 | StackType::NativeInt | StackType::Float => Ok(ty),
        StackType::TypedRef | StackType::Object => Err(JitError::IllegalOperandType { op, ty }),
    }
}

/// `not` from table III.5: integers only.
fn unary_integer(op: &'static str, ty: ClrType) -> Result<ClrType> {
    match ty.stack_type() {
        StackType::Int32 | StackType::Int64 | StackType::NativeInt => Ok(ty),
        StackType::Float | StackType::TypedRef | StackType::Object => {
            Err(JitError::IllegalOperandType { op, ty })
        }
    }
}

/// Table III.6. The amount must be int32 or native int.
pub fn shift(op: &'static str, value: ClrType, amount: ClrType) -> Result<ClrType> {
    let value_ok = matches!(
        value.stack_type(),
        StackType::Int32 | StackType::Int64 | StackType::NativeInt
    );
    let amount_ok = matches!(amount.stack_type(), StackType::Int32 | StackType::NativeInt);
    if value_ok && amount_ok {
        Ok(ClrType::Int32)
    } else {
        Err(JitError::IllegalOperandTypes {
            op,
            lhs: value,
            rhs: amount,
        })
    }
}

/// Widening to 64 bits promotes every source in the int32 category, and
/// `float32`, to `int64`. Anything else passes through.
fn widen_to_64(source: ClrType) -> ClrType {
    match source.stack_type() {
        StackType::Int32 => ClrType::Int64,
        _ if source == ClrType::Single => ClrType::Int64,
        _ => source,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    Binary,
    Subtract,
    Unary,
    Not,
    Shift,
    /// Truncating conversion: the source type is kept.
    Truncate,
    Widen64,
    ToFloat,
    Compare,
    Dup,
}

impl Rule {
    fn arity(self) -> usize {
        match self {
            Rule::Binary | Rule::Subtract | Rule::Shift | Rule::Compare => 2,
            Rule::Unary | Rule::Not | Rule::Truncate | Rule::Widen64 | Rule::ToFloat | Rule::Dup => 1,
        }
    }
}

fn rule_for(opcode: Opcode, ext: Option<ExtendedOpcode>) -> Option<Rule> {
    if let Some(ext) = ext {
        return match ext {
            ExtendedOpcode::Ceq
            | ExtendedOpcode::Cgt
            | ExtendedOpcode::CgtUn
            | ExtendedOpcode::Clt
            | ExtendedOpcode::CltUn => Some(Rule::Compare),
            ExtendedOpcode::Arglist
            | ExtendedOpcode::Ldftn
            | ExtendedOpcode::Ldvirtftn
            | ExtendedOpcode::Ldarg
            | ExtendedOpcode::Ldarga
            | ExtendedOpcode::Starg
            | ExtendedOpcode::Ldloc
            | ExtendedOpcode::Ldloca
            | ExtendedOpcode::Stloc
            | ExtendedOpcode::Localloc
            | ExtendedOpcode::Endfilter
            | ExtendedOpcode::Unaligned
            | ExtendedOpcode::Volatile
            | ExtendedOpcode::Tail
            | ExtendedOpcode::Initobj
            | ExtendedOpcode::Constrained
            | ExtendedOpcode::Cpblk
            | ExtendedOpcode::Initblk
            | ExtendedOpcode::No
            | ExtendedOpcode::Rethrow
            | ExtendedOpcode::Sizeof
            | ExtendedOpcode::Refanytype
            | ExtendedOpcode::Readonly => None,
        };
    }
    let rule = match opcode {
        Opcode::Add
        | Opcode::AddOvf
        | Opcode::AddOvfUn
        | Opcode::Mul
        | Opcode::MulOvf
        | Opcode::MulOvfUn
        | Opcode::Div
        | Opcode::Rem => Rule::Binary,
        Opcode::Sub | Opcode::SubOvf | Opcode::SubOvfUn => Rule::Subtract,
        // Integer operations share the binary table.
        Opcode::And | Opcode::Or | Opcode::Xor | Opcode::DivUn | Opcode::RemUn => Rule::Binary,
        Opcode::Neg => Rule::Unary,
        Opcode::Not => Rule::Not,
        Opcode::Shl | Opcode::Shr | Opcode::ShrUn => Rule::Shift,
        Opcode::ConvI1
        | Opcode::ConvU1
        | Opcode::ConvI2
        | Opcode::ConvU2
        | Opcode::ConvI4
        | Opcode::ConvU4
        | Opcode::ConvI
        | Opcode::ConvU
        | Opcode::ConvOvfI1
        | Opcode::ConvOvfU1
        | Opcode::ConvOvfI2
        | Opcode::ConvOvfU2
        | Opcode::ConvOvfI4
        | Opcode::ConvOvfU4
        | Opcode::ConvOvfI
        | Opcode::ConvOvfU
        | Opcode::ConvOvfI1Un
        | Opcode::ConvOvfU1Un
        | Opcode::ConvOvfI2Un
        | Opcode::ConvOvfU2Un
        | Opcode::ConvOvfI4Un
        | Opcode::ConvOvfU4Un
        | Opcode::ConvOvfIUn
        | Opcode::ConvOvfUUn => Rule::Truncate,
        Opcode::ConvI8
        | Opcode::ConvU8
        | Opcode::ConvOvfI8
        | Opcode::ConvOvfU8
        | Opcode::ConvOvfI8Un
        | Opcode::ConvOvfU8Un => Rule::Widen64,
        Opcode::ConvR4 | Opcode::ConvR8 | Opcode::ConvRUn => Rule::ToFloat,
        Opcode::Dup => Rule::Dup,
        // Typed by their operand, not by the stack.
        Opcode::Ldarg0
        | Opcode::Ldarg1
        | Opcode::Ldarg2
        | Opcode::Ldarg3
        | Opcode::LdargS
        | Opcode::Ldloc0
        | Opcode::Ldloc1
        | Opcode::Ldloc2
        | Opcode::Ldloc3
        | Opcode::LdlocS
        | Opcode::Stloc0
        | Opcode::Stloc1
        | Opcode::Stloc2
        | Opcode::Stloc3
        | Opcode::StlocS
        | Opcode::StargS
        | Opcode::LdcI4M1
        | Opcode::LdcI4_0
        | Opcode::LdcI4_1
        | Opcode::LdcI4_2
        | Opcode::LdcI4_3
        | Opcode::LdcI4_4
        | Opcode::LdcI4_5
        | Opcode::LdcI4_6
        | Opcode::LdcI4_7
        | Opcode::LdcI4_8
        | Opcode::LdcI4S
        | Opcode::LdcI4
        | Opcode::LdcI8
        | Opcode::LdcR4
        | Opcode::LdcR8
        | Opcode::Ldsfld => return None,
        // Control flow.
        Opcode::Nop
        | Opcode::Break
        | Opcode::Pop
        | Opcode::Jmp
        | Opcode::Ret
        | Opcode::Br
        | Opcode::BrS
        | Opcode::Brfalse
        | Opcode::BrfalseS
        | Opcode::Brtrue
        | Opcode::BrtrueS
        | Opcode::Beq
        | Opcode::BeqS
        | Opcode::Bge
        | Opcode::BgeS
        | Opcode::BgeUn
        | Opcode::BgeUnS
        | Opcode::Bgt
        | Opcode::BgtS
        | Opcode::BgtUn
        | Opcode::BgtUnS
        | Opcode::Ble
        | Opcode::BleS
        | Opcode::BleUn
        | Opcode::BleUnS
        | Opcode::Blt
        | Opcode::BltS
        | Opcode::BltUn
        | Opcode::BltUnS
        | Opcode::BneUn
        | Opcode::BneUnS
        | Opcode::Switch
        | Opcode::Leave
        | Opcode::LeaveS
        | Opcode::Endfinally
        | Opcode::Throw
        | Opcode::ExtendedPrefix => return None,
        // Calls, addresses, indirection, objects and arrays.
        Opcode::Call
        | Opcode::Calli
        | Opcode::Callvirt
        | Opcode::Newobj
        | Opcode::LdargaS
        | Opcode::LdlocaS
        | Opcode::Ldnull
        | Opcode::Ldstr
        | Opcode::Ldtoken
        | Opcode::LdindI1
        | Opcode::LdindU1
        | Opcode::LdindI2
        | Opcode::LdindU2
        | Opcode::LdindI4
        | Opcode::LdindU4
        | Opcode::LdindI8
        | Opcode::LdindI
        | Opcode::LdindR4
        | Opcode::LdindR8
        | Opcode::LdindRef
        | Opcode::StindRef
        | Opcode::StindI1
        | Opcode::StindI2
        | Opcode::StindI4
        | Opcode::StindI8
        | Opcode::StindR4
        | Opcode::StindR8
        | Opcode::StindI
        | Opcode::Cpobj
        | Opcode::Ldobj
        | Opcode::Stobj
        | Opcode::Castclass
        | Opcode::Isinst
        | Opcode::Box
        | Opcode::Unbox
        | Opcode::UnboxAny
        | Opcode::Ldfld
        | Opcode::Ldflda
        | Opcode::Stfld
        | Opcode::Ldsflda
        | Opcode::Stsfld
        | Opcode::Newarr
        | Opcode::Ldlen
        | Opcode::Ldelema
        | Opcode::LdelemI1
        | Opcode::LdelemU1
        | Opcode::LdelemI2
        | Opcode::LdelemU2
        | Opcode::LdelemI4
        | Opcode::LdelemU4
        | Opcode::LdelemI8
        | Opcode::LdelemI
        | Opcode::LdelemR4
        | Opcode::LdelemR8
        | Opcode::LdelemRef
        | Opcode::Ldelem
        | Opcode::StelemI
        | Opcode::StelemI1
        | Opcode::StelemI2
        | Opcode::StelemI4
        | Opcode::StelemI8
        | Opcode::StelemR4
        | Opcode::StelemR8
        | Opcode::StelemRef
        | Opcode::Stelem
        | Opcode::Refanyval
        | Opcode::Mkrefany
        | Opcode::Ckfinite => return None,
    };
    Some(rule)
}

/// Whether [`query`] has an entry for the opcode.
pub fn has_rule(opcode: Opcode, ext: Option<ExtendedOpcode>) -> bool {
    rule_for(opcode, ext).is_some()
}

/// Result type of `opcode` applied to operands of `types` (in push order).
///
/// `Ok(None)` means the opcode has no table entry, i.e. it computes no
/// value from its stack operands. An entry whose operand types are not in
/// the table is an error, never a default.
pub fn query(
    opcode: Opcode,
    ext: Option<ExtendedOpcode>,
    types: &[ClrType],
) -> Result<Option<ClrType>> {
    let Some(rule) = rule_for(opcode, ext) else {
        return Ok(None);
    };
    let op = ext.map_or(opcode.mnemonic(), |ext| ext.mnemonic());
    if types.len() != rule.arity() {
        return Err(JitError::OperandCount {
            op,
            expected: rule.arity(),
            found: types.len(),
        });
    }
    let ty = match rule {
        Rule::Binary => binary_numeric(op, types[0], types[1])?,
        Rule::Subtract => subtract(op, types[0], types[1])?,
        Rule::Unary => unary_numeric(op, types[0])?,
        Rule::Not => unary_integer(op, types[0])?,
        Rule::Shift => shift(op, types[0], types[1])?,
        Rule::Truncate | Rule::Dup => types[0],
        Rule::Widen64 => widen_to_64(types[0]),
        Rule::ToFloat => ClrType::Double,
        Rule::Compare => ClrType::Boolean,
    };
    Ok(Some(ty))
}
