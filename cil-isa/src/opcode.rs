//! ECMA-335 Partition III opcode tables.
//!
//! One-byte opcodes live in [`Opcode`]; the two-byte opcodes introduced by the
//! `0xFE` prefix live in [`ExtendedOpcode`]. Both carry the same static
//! metadata ([`OpcodeInfo`]): mnemonic, inline operand encoding, stack
//! behavior and flow flags.

use std::fmt;

bitflags::bitflags! {
    /// Control-flow and encoding properties of an opcode.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpcodeFlags: u8 {
        /// Transfers control to one or more explicit targets.
        const BRANCH = 1 << 0;
        /// Only branches when a condition holds; falls through otherwise.
        const CONDITIONAL = 1 << 1;
        /// Leaves the method.
        const RETURN = 1 << 2;
        /// Raises an exception.
        const THROW = 1 << 3;
        /// Invokes another method.
        const CALL = 1 << 4;
        /// Instruction prefix (`volatile.`, `tail.`, ...).
        const PREFIX = 1 << 5;
        /// The `0xFE` marker that introduces an [`ExtendedOpcode`].
        const EXTENDED = 1 << 6;
    }
}

/// Encoding of the inline (immediate) operand that follows an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    None,
    ShortInlineI,
    InlineI,
    InlineI8,
    ShortInlineR,
    InlineR,
    ShortInlineBrTarget,
    InlineBrTarget,
    ShortInlineVar,
    InlineVar,
    InlineTok,
    InlineField,
    InlineMethod,
    InlineType,
    InlineString,
    InlineSig,
    /// `u32` count followed by that many `i32` branch offsets.
    InlineSwitch,
}

impl OperandKind {
    /// Size in bytes of the operand, or of its fixed header for `switch`.
    pub const fn size(self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::ShortInlineI
            | OperandKind::ShortInlineBrTarget
            | OperandKind::ShortInlineVar => 1,
            OperandKind::InlineVar => 2,
            OperandKind::InlineI
            | OperandKind::ShortInlineR
            | OperandKind::InlineBrTarget
            | OperandKind::InlineTok
            | OperandKind::InlineField
            | OperandKind::InlineMethod
            | OperandKind::InlineType
            | OperandKind::InlineString
            | OperandKind::InlineSig
            | OperandKind::InlineSwitch => 4,
            OperandKind::InlineI8 | OperandKind::InlineR => 8,
        }
    }

    /// Whether the operand is a relative branch offset.
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            OperandKind::ShortInlineBrTarget
                | OperandKind::InlineBrTarget
                | OperandKind::InlineSwitch
        )
    }
}

/// How many values an instruction removes from the evaluation stack, and of
/// which kind, as listed in Partition III.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PopBehavior {
    Pop0,
    Pop1,
    Pop1Pop1,
    Popi,
    PopiPop1,
    PopiPopi,
    PopiPopi8,
    PopiPopiPopi,
    PopiPopr4,
    PopiPopr8,
    Popref,
    PoprefPop1,
    PoprefPopi,
    PoprefPopiPopi,
    PoprefPopiPopi8,
    PoprefPopiPopr4,
    PoprefPopiPopr8,
    PoprefPopiPopref,
    PoprefPopiPop1,
    /// Empties the whole stack (`leave`).
    PopAll,
    /// Depends on the instruction's signature or context (`call`, `ret`).
    Varpop,
}

/// Pop count of a [`PopBehavior`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopArity {
    Fixed(usize),
    All,
    Variable,
}

impl PopBehavior {
    pub const fn arity(self) -> PopArity {
        match self {
            PopBehavior::Pop0 => PopArity::Fixed(0),
            PopBehavior::Pop1 | PopBehavior::Popi | PopBehavior::Popref => PopArity::Fixed(1),
            PopBehavior::Pop1Pop1
            | PopBehavior::PopiPop1
            | PopBehavior::PopiPopi
            | PopBehavior::PopiPopi8
            | PopBehavior::PopiPopr4
            | PopBehavior::PopiPopr8
            | PopBehavior::PoprefPop1
            | PopBehavior::PoprefPopi => PopArity::Fixed(2),
            PopBehavior::PopiPopiPopi
            | PopBehavior::PoprefPopiPopi
            | PopBehavior::PoprefPopiPopi8
            | PopBehavior::PoprefPopiPopr4
            | PopBehavior::PoprefPopiPopr8
            | PopBehavior::PoprefPopiPopref
            | PopBehavior::PoprefPopiPop1 => PopArity::Fixed(3),
            PopBehavior::PopAll => PopArity::All,
            PopBehavior::Varpop => PopArity::Variable,
        }
    }
}

/// What an instruction leaves on the evaluation stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PushBehavior {
    Push0,
    Push1,
    /// One value pushed twice (`dup`).
    Push1Push1,
    Pushi,
    Pushi8,
    Pushr4,
    Pushr8,
    Pushref,
    Varpush,
}

/// Push shape of a [`PushBehavior`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushArity {
    None,
    One,
    Duplicate,
    Variable,
}

impl PushBehavior {
    pub const fn arity(self) -> PushArity {
        match self {
            PushBehavior::Push0 => PushArity::None,
            PushBehavior::Push1
            | PushBehavior::Pushi
            | PushBehavior::Pushi8
            | PushBehavior::Pushr4
            | PushBehavior::Pushr8
            | PushBehavior::Pushref => PushArity::One,
            PushBehavior::Push1Push1 => PushArity::Duplicate,
            PushBehavior::Varpush => PushArity::Variable,
        }
    }
}

/// Static metadata for one opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    mnemonic: &'static str,
    operand: OperandKind,
    pop: PopBehavior,
    push: PushBehavior,
    flags: OpcodeFlags,
    extended: bool,
}

impl OpcodeInfo {
    #[inline]
    pub const fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    #[inline]
    pub const fn operand_kind(&self) -> OperandKind {
        self.operand
    }

    #[inline]
    pub const fn pop_behavior(&self) -> PopBehavior {
        self.pop
    }

    #[inline]
    pub const fn push_behavior(&self) -> PushBehavior {
        self.push
    }

    #[inline]
    pub const fn flags(&self) -> OpcodeFlags {
        self.flags
    }

    /// Whether this opcode is encoded behind the `0xFE` prefix.
    #[inline]
    pub const fn is_extended(&self) -> bool {
        self.extended
    }

    /// Encoded size in bytes, including the prefix byte for extended opcodes.
    /// For `switch` this is the size without the jump table.
    pub const fn size(&self) -> usize {
        let opcode_len = if self.extended { 2 } else { 1 };
        opcode_len + self.operand.size()
    }
}

macro_rules! opcode_table {
    (
        $(#[$meta:meta])*
        $name:ident, extended = $extended:literal {
            $( $variant:ident = $byte:literal, $mnemonic:literal, $operand:ident, $pop:ident, $push:ident, [$($flag:ident)*]; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum $name {
            $( $variant = $byte, )*
        }

        impl $name {
            /// Every opcode in the table, in encoding order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )* ];

            /// Look up an opcode by its encoding byte.
            pub const fn from_byte(byte: u8) -> Option<$name> {
                match byte {
                    $( $byte => Some($name::$variant), )*
                    _ => None,
                }
            }

            /// The encoding byte (the byte after `0xFE` for extended opcodes).
            #[inline]
            pub const fn byte(self) -> u8 {
                self as u8
            }

            pub const fn info(self) -> OpcodeInfo {
                match self {
                    $(
                        $name::$variant => OpcodeInfo {
                            mnemonic: $mnemonic,
                            operand: OperandKind::$operand,
                            pop: PopBehavior::$pop,
                            push: PushBehavior::$push,
                            flags: OpcodeFlags::empty()$(.union(OpcodeFlags::$flag))*,
                            extended: $extended,
                        },
                    )*
                }
            }

            #[inline]
            pub const fn mnemonic(self) -> &'static str {
                self.info().mnemonic
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}

opcode_table! {
    /// One-byte CIL opcodes.
    Opcode, extended = false {
        Nop = 0x00, "nop", None, Pop0, Push0, [];
        Break = 0x01, "break", None, Pop0, Push0, [];
        Ldarg0 = 0x02, "ldarg.0", None, Pop0, Push1, [];
        Ldarg1 = 0x03, "ldarg.1", None, Pop0, Push1, [];
        Ldarg2 = 0x04, "ldarg.2", None, Pop0, Push1, [];
        Ldarg3 = 0x05, "ldarg.3", None, Pop0, Push1, [];
        Ldloc0 = 0x06, "ldloc.0", None, Pop0, Push1, [];
        Ldloc1 = 0x07, "ldloc.1", None, Pop0, Push1, [];
        Ldloc2 = 0x08, "ldloc.2", None, Pop0, Push1, [];
        Ldloc3 = 0x09, "ldloc.3", None, Pop0, Push1, [];
        Stloc0 = 0x0A, "stloc.0", None, Pop1, Push0, [];
        Stloc1 = 0x0B, "stloc.1", None, Pop1, Push0, [];
        Stloc2 = 0x0C, "stloc.2", None, Pop1, Push0, [];
        Stloc3 = 0x0D, "stloc.3", None, Pop1, Push0, [];
        LdargS = 0x0E, "ldarg.s", ShortInlineVar, Pop0, Push1, [];
        LdargaS = 0x0F, "ldarga.s", ShortInlineVar, Pop0, Pushi, [];
        StargS = 0x10, "starg.s", ShortInlineVar, Pop1, Push0, [];
        LdlocS = 0x11, "ldloc.s", ShortInlineVar, Pop0, Push1, [];
        LdlocaS = 0x12, "ldloca.s", ShortInlineVar, Pop0, Pushi, [];
        StlocS = 0x13, "stloc.s", ShortInlineVar, Pop1, Push0, [];
        Ldnull = 0x14, "ldnull", None, Pop0, Pushref, [];
        LdcI4M1 = 0x15, "ldc.i4.m1", None, Pop0, Pushi, [];
        LdcI4_0 = 0x16, "ldc.i4.0", None, Pop0, Pushi, [];
        LdcI4_1 = 0x17, "ldc.i4.1", None, Pop0, Pushi, [];
        LdcI4_2 = 0x18, "ldc.i4.2", None, Pop0, Pushi, [];
        LdcI4_3 = 0x19, "ldc.i4.3", None, Pop0, Pushi, [];
        LdcI4_4 = 0x1A, "ldc.i4.4", None, Pop0, Pushi, [];
        LdcI4_5 = 0x1B, "ldc.i4.5", None, Pop0, Pushi, [];
        LdcI4_6 = 0x1C, "ldc.i4.6", None, Pop0, Pushi, [];
        LdcI4_7 = 0x1D, "ldc.i4.7", None, Pop0, Pushi, [];
        LdcI4_8 = 0x1E, "ldc.i4.8", None, Pop0, Pushi, [];
        LdcI4S = 0x1F, "ldc.i4.s", ShortInlineI, Pop0, Pushi, [];
        LdcI4 = 0x20, "ldc.i4", InlineI, Pop0, Pushi, [];
        LdcI8 = 0x21, "ldc.i8", InlineI8, Pop0, Pushi8, [];
        LdcR4 = 0x22, "ldc.r4", ShortInlineR, Pop0, Pushr4, [];
        LdcR8 = 0x23, "ldc.r8", InlineR, Pop0, Pushr8, [];
        Dup = 0x25, "dup", None, Pop1, Push1Push1, [];
        Pop = 0x26, "pop", None, Pop1, Push0, [];
        Jmp = 0x27, "jmp", InlineMethod, Pop0, Push0, [CALL RETURN];
        Call = 0x28, "call", InlineMethod, Varpop, Varpush, [CALL];
        Calli = 0x29, "calli", InlineSig, Varpop, Varpush, [CALL];
        Ret = 0x2A, "ret", None, Varpop, Push0, [RETURN];
        BrS = 0x2B, "br.s", ShortInlineBrTarget, Pop0, Push0, [BRANCH];
        BrfalseS = 0x2C, "brfalse.s", ShortInlineBrTarget, Popi, Push0, [BRANCH CONDITIONAL];
        BrtrueS = 0x2D, "brtrue.s", ShortInlineBrTarget, Popi, Push0, [BRANCH CONDITIONAL];
        BeqS = 0x2E, "beq.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BgeS = 0x2F, "bge.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BgtS = 0x30, "bgt.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BleS = 0x31, "ble.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BltS = 0x32, "blt.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BneUnS = 0x33, "bne.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BgeUnS = 0x34, "bge.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BgtUnS = 0x35, "bgt.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BleUnS = 0x36, "ble.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BltUnS = 0x37, "blt.un.s", ShortInlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        Br = 0x38, "br", InlineBrTarget, Pop0, Push0, [BRANCH];
        Brfalse = 0x39, "brfalse", InlineBrTarget, Popi, Push0, [BRANCH CONDITIONAL];
        Brtrue = 0x3A, "brtrue", InlineBrTarget, Popi, Push0, [BRANCH CONDITIONAL];
        Beq = 0x3B, "beq", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        Bge = 0x3C, "bge", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        Bgt = 0x3D, "bgt", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        Ble = 0x3E, "ble", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        Blt = 0x3F, "blt", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BneUn = 0x40, "bne.un", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BgeUn = 0x41, "bge.un", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BgtUn = 0x42, "bgt.un", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BleUn = 0x43, "ble.un", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        BltUn = 0x44, "blt.un", InlineBrTarget, Pop1Pop1, Push0, [BRANCH CONDITIONAL];
        Switch = 0x45, "switch", InlineSwitch, Popi, Push0, [BRANCH CONDITIONAL];
        LdindI1 = 0x46, "ldind.i1", None, Popi, Pushi, [];
        LdindU1 = 0x47, "ldind.u1", None, Popi, Pushi, [];
        LdindI2 = 0x48, "ldind.i2", None, Popi, Pushi, [];
        LdindU2 = 0x49, "ldind.u2", None, Popi, Pushi, [];
        LdindI4 = 0x4A, "ldind.i4", None, Popi, Pushi, [];
        LdindU4 = 0x4B, "ldind.u4", None, Popi, Pushi, [];
        LdindI8 = 0x4C, "ldind.i8", None, Popi, Pushi8, [];
        LdindI = 0x4D, "ldind.i", None, Popi, Pushi, [];
        LdindR4 = 0x4E, "ldind.r4", None, Popi, Pushr4, [];
        LdindR8 = 0x4F, "ldind.r8", None, Popi, Pushr8, [];
        LdindRef = 0x50, "ldind.ref", None, Popi, Pushref, [];
        StindRef = 0x51, "stind.ref", None, PopiPopi, Push0, [];
        StindI1 = 0x52, "stind.i1", None, PopiPopi, Push0, [];
        StindI2 = 0x53, "stind.i2", None, PopiPopi, Push0, [];
        StindI4 = 0x54, "stind.i4", None, PopiPopi, Push0, [];
        StindI8 = 0x55, "stind.i8", None, PopiPopi8, Push0, [];
        StindR4 = 0x56, "stind.r4", None, PopiPopr4, Push0, [];
        StindR8 = 0x57, "stind.r8", None, PopiPopr8, Push0, [];
        Add = 0x58, "add", None, Pop1Pop1, Push1, [];
        Sub = 0x59, "sub", None, Pop1Pop1, Push1, [];
        Mul = 0x5A, "mul", None, Pop1Pop1, Push1, [];
        Div = 0x5B, "div", None, Pop1Pop1, Push1, [];
        DivUn = 0x5C, "div.un", None, Pop1Pop1, Push1, [];
        Rem = 0x5D, "rem", None, Pop1Pop1, Push1, [];
        RemUn = 0x5E, "rem.un", None, Pop1Pop1, Push1, [];
        And = 0x5F, "and", None, Pop1Pop1, Push1, [];
        Or = 0x60, "or", None, Pop1Pop1, Push1, [];
        Xor = 0x61, "xor", None, Pop1Pop1, Push1, [];
        Shl = 0x62, "shl", None, Pop1Pop1, Push1, [];
        Shr = 0x63, "shr", None, Pop1Pop1, Push1, [];
        ShrUn = 0x64, "shr.un", None, Pop1Pop1, Push1, [];
        Neg = 0x65, "neg", None, Pop1, Push1, [];
        Not = 0x66, "not", None, Pop1, Push1, [];
        ConvI1 = 0x67, "conv.i1", None, Pop1, Pushi, [];
        ConvI2 = 0x68, "conv.i2", None, Pop1, Pushi, [];
        ConvI4 = 0x69, "conv.i4", None, Pop1, Pushi, [];
        ConvI8 = 0x6A, "conv.i8", None, Pop1, Pushi8, [];
        ConvR4 = 0x6B, "conv.r4", None, Pop1, Pushr4, [];
        ConvR8 = 0x6C, "conv.r8", None, Pop1, Pushr8, [];
        ConvU4 = 0x6D, "conv.u4", None, Pop1, Pushi, [];
        ConvU8 = 0x6E, "conv.u8", None, Pop1, Pushi8, [];
        Callvirt = 0x6F, "callvirt", InlineMethod, Varpop, Varpush, [CALL];
        Cpobj = 0x70, "cpobj", InlineType, PopiPopi, Push0, [];
        Ldobj = 0x71, "ldobj", InlineType, Popi, Push1, [];
        Ldstr = 0x72, "ldstr", InlineString, Pop0, Pushref, [];
        Newobj = 0x73, "newobj", InlineMethod, Varpop, Pushref, [CALL];
        Castclass = 0x74, "castclass", InlineType, Popref, Pushref, [];
        Isinst = 0x75, "isinst", InlineType, Popref, Pushi, [];
        ConvRUn = 0x76, "conv.r.un", None, Pop1, Pushr8, [];
        Unbox = 0x79, "unbox", InlineType, Popref, Pushi, [];
        Throw = 0x7A, "throw", None, Popref, Push0, [THROW];
        Ldfld = 0x7B, "ldfld", InlineField, Popref, Push1, [];
        Ldflda = 0x7C, "ldflda", InlineField, Popref, Pushi, [];
        Stfld = 0x7D, "stfld", InlineField, PoprefPop1, Push0, [];
        Ldsfld = 0x7E, "ldsfld", InlineField, Pop0, Push1, [];
        Ldsflda = 0x7F, "ldsflda", InlineField, Pop0, Pushi, [];
        Stsfld = 0x80, "stsfld", InlineField, Pop1, Push0, [];
        Stobj = 0x81, "stobj", InlineType, PopiPop1, Push0, [];
        ConvOvfI1Un = 0x82, "conv.ovf.i1.un", None, Pop1, Pushi, [];
        ConvOvfI2Un = 0x83, "conv.ovf.i2.un", None, Pop1, Pushi, [];
        ConvOvfI4Un = 0x84, "conv.ovf.i4.un", None, Pop1, Pushi, [];
        ConvOvfI8Un = 0x85, "conv.ovf.i8.un", None, Pop1, Pushi8, [];
        ConvOvfU1Un = 0x86, "conv.ovf.u1.un", None, Pop1, Pushi, [];
        ConvOvfU2Un = 0x87, "conv.ovf.u2.un", None, Pop1, Pushi, [];
        ConvOvfU4Un = 0x88, "conv.ovf.u4.un", None, Pop1, Pushi, [];
        ConvOvfU8Un = 0x89, "conv.ovf.u8.un", None, Pop1, Pushi8, [];
        ConvOvfIUn = 0x8A, "conv.ovf.i.un", None, Pop1, Pushi, [];
        ConvOvfUUn = 0x8B, "conv.ovf.u.un", None, Pop1, Pushi, [];
        Box = 0x8C, "box", InlineType, Pop1, Pushref, [];
        Newarr = 0x8D, "newarr", InlineType, Popi, Pushref, [];
        Ldlen = 0x8E, "ldlen", None, Popref, Pushi, [];
        Ldelema = 0x8F, "ldelema", InlineType, PoprefPopi, Pushi, [];
        LdelemI1 = 0x90, "ldelem.i1", None, PoprefPopi, Pushi, [];
        LdelemU1 = 0x91, "ldelem.u1", None, PoprefPopi, Pushi, [];
        LdelemI2 = 0x92, "ldelem.i2", None, PoprefPopi, Pushi, [];
        LdelemU2 = 0x93, "ldelem.u2", None, PoprefPopi, Pushi, [];
        LdelemI4 = 0x94, "ldelem.i4", None, PoprefPopi, Pushi, [];
        LdelemU4 = 0x95, "ldelem.u4", None, PoprefPopi, Pushi, [];
        LdelemI8 = 0x96, "ldelem.i8", None, PoprefPopi, Pushi8, [];
        LdelemI = 0x97, "ldelem.i", None, PoprefPopi, Pushi, [];
        LdelemR4 = 0x98, "ldelem.r4", None, PoprefPopi, Pushr4, [];
        LdelemR8 = 0x99, "ldelem.r8", None, PoprefPopi, Pushr8, [];
        LdelemRef = 0x9A, "ldelem.ref", None, PoprefPopi, Pushref, [];
        StelemI = 0x9B, "stelem.i", None, PoprefPopiPopi, Push0, [];
        StelemI1 = 0x9C, "stelem.i1", None, PoprefPopiPopi, Push0, [];
        StelemI2 = 0x9D, "stelem.i2", None, PoprefPopiPopi, Push0, [];
        StelemI4 = 0x9E, "stelem.i4", None, PoprefPopiPopi, Push0, [];
        StelemI8 = 0x9F, "stelem.i8", None, PoprefPopiPopi8, Push0, [];
        StelemR4 = 0xA0, "stelem.r4", None, PoprefPopiPopr4, Push0, [];
        StelemR8 = 0xA1, "stelem.r8", None, PoprefPopiPopr8, Push0, [];
        StelemRef = 0xA2, "stelem.ref", None, PoprefPopiPopref, Push0, [];
        Ldelem = 0xA3, "ldelem", InlineType, PoprefPopi, Push1, [];
        Stelem = 0xA4, "stelem", InlineType, PoprefPopiPop1, Push0, [];
        UnboxAny = 0xA5, "unbox.any", InlineType, Popref, Push1, [];
        ConvOvfI1 = 0xB3, "conv.ovf.i1", None, Pop1, Pushi, [];
        ConvOvfU1 = 0xB4, "conv.ovf.u1", None, Pop1, Pushi, [];
        ConvOvfI2 = 0xB5, "conv.ovf.i2", None, Pop1, Pushi, [];
        ConvOvfU2 = 0xB6, "conv.ovf.u2", None, Pop1, Pushi, [];
        ConvOvfI4 = 0xB7, "conv.ovf.i4", None, Pop1, Pushi, [];
        ConvOvfU4 = 0xB8, "conv.ovf.u4", None, Pop1, Pushi, [];
        ConvOvfI8 = 0xB9, "conv.ovf.i8", None, Pop1, Pushi8, [];
        ConvOvfU8 = 0xBA, "conv.ovf.u8", None, Pop1, Pushi8, [];
        Refanyval = 0xC2, "refanyval", InlineType, Pop1, Pushi, [];
        Ckfinite = 0xC3, "ckfinite", None, Pop1, Pushr8, [];
        Mkrefany = 0xC6, "mkrefany", InlineType, Popi, Push1, [];
        Ldtoken = 0xD0, "ldtoken", InlineTok, Pop0, Pushi, [];
        ConvU2 = 0xD1, "conv.u2", None, Pop1, Pushi, [];
        ConvU1 = 0xD2, "conv.u1", None, Pop1, Pushi, [];
        ConvI = 0xD3, "conv.i", None, Pop1, Pushi, [];
        ConvOvfI = 0xD4, "conv.ovf.i", None, Pop1, Pushi, [];
        ConvOvfU = 0xD5, "conv.ovf.u", None, Pop1, Pushi, [];
        AddOvf = 0xD6, "add.ovf", None, Pop1Pop1, Push1, [];
        AddOvfUn = 0xD7, "add.ovf.un", None, Pop1Pop1, Push1, [];
        MulOvf = 0xD8, "mul.ovf", None, Pop1Pop1, Push1, [];
        MulOvfUn = 0xD9, "mul.ovf.un", None, Pop1Pop1, Push1, [];
        SubOvf = 0xDA, "sub.ovf", None, Pop1Pop1, Push1, [];
        SubOvfUn = 0xDB, "sub.ovf.un", None, Pop1Pop1, Push1, [];
        Endfinally = 0xDC, "endfinally", None, Pop0, Push0, [RETURN];
        Leave = 0xDD, "leave", InlineBrTarget, PopAll, Push0, [BRANCH];
        LeaveS = 0xDE, "leave.s", ShortInlineBrTarget, PopAll, Push0, [BRANCH];
        StindI = 0xDF, "stind.i", None, PopiPopi, Push0, [];
        ConvU = 0xE0, "conv.u", None, Pop1, Pushi, [];
        ExtendedPrefix = 0xFE, "prefix1", None, Pop0, Push0, [EXTENDED];
    }
}

opcode_table! {
    /// Two-byte CIL opcodes, encoded as `0xFE` followed by the listed byte.
    ExtendedOpcode, extended = true {
        Arglist = 0x00, "arglist", None, Pop0, Pushi, [];
        Ceq = 0x01, "ceq", None, Pop1Pop1, Pushi, [];
        Cgt = 0x02, "cgt", None, Pop1Pop1, Pushi, [];
        CgtUn = 0x03, "cgt.un", None, Pop1Pop1, Pushi, [];
        Clt = 0x04, "clt", None, Pop1Pop1, Pushi, [];
        CltUn = 0x05, "clt.un", None, Pop1Pop1, Pushi, [];
        Ldftn = 0x06, "ldftn", InlineMethod, Pop0, Pushi, [];
        Ldvirtftn = 0x07, "ldvirtftn", InlineMethod, Popref, Pushi, [];
        Ldarg = 0x09, "ldarg", InlineVar, Pop0, Push1, [];
        Ldarga = 0x0A, "ldarga", InlineVar, Pop0, Pushi, [];
        Starg = 0x0B, "starg", InlineVar, Pop1, Push0, [];
        Ldloc = 0x0C, "ldloc", InlineVar, Pop0, Push1, [];
        Ldloca = 0x0D, "ldloca", InlineVar, Pop0, Pushi, [];
        Stloc = 0x0E, "stloc", InlineVar, Pop1, Push0, [];
        Localloc = 0x0F, "localloc", None, Popi, Pushi, [];
        Endfilter = 0x11, "endfilter", None, Popi, Push0, [RETURN];
        Unaligned = 0x12, "unaligned.", ShortInlineI, Pop0, Push0, [PREFIX];
        Volatile = 0x13, "volatile.", None, Pop0, Push0, [PREFIX];
        Tail = 0x14, "tail.", None, Pop0, Push0, [PREFIX];
        Initobj = 0x15, "initobj", InlineType, Popi, Push0, [];
        Constrained = 0x16, "constrained.", InlineType, Pop0, Push0, [PREFIX];
        Cpblk = 0x17, "cpblk", None, PopiPopiPopi, Push0, [];
        Initblk = 0x18, "initblk", None, PopiPopiPopi, Push0, [];
        No = 0x19, "no.", ShortInlineI, Pop0, Push0, [PREFIX];
        Rethrow = 0x1A, "rethrow", None, Pop0, Push0, [THROW];
        Sizeof = 0x1C, "sizeof", InlineType, Pop0, Pushi, [];
        Refanytype = 0x1D, "refanytype", None, Pop1, Pushi, [];
        Readonly = 0x1E, "readonly.", None, Pop0, Push0, [PREFIX];
    }
}

impl Opcode {
    /// The prefix byte that introduces an [`ExtendedOpcode`].
    pub const EXTENDED_PREFIX_BYTE: u8 = 0xFE;

    #[inline]
    pub const fn flags(self) -> OpcodeFlags {
        self.info().flags
    }

    #[inline]
    pub const fn is_branch(self) -> bool {
        self.info().flags.contains(OpcodeFlags::BRANCH)
    }
}

impl ExtendedOpcode {
    #[inline]
    pub const fn flags(self) -> OpcodeFlags {
        self.info().flags
    }
}

/// Find an opcode by mnemonic. Extended opcodes are searched after the
/// one-byte table; the `prefix1` pseudo-mnemonic never matches.
pub fn lookup_mnemonic(mnemonic: &str) -> Option<OpcodeInfo> {
    Opcode::ALL
        .iter()
        .filter(|op| **op != Opcode::ExtendedPrefix)
        .map(|op| op.info())
        .chain(ExtendedOpcode::ALL.iter().map(|op| op.info()))
        .find(|info| info.mnemonic == mnemonic)
}

/// Total number of opcodes in both tables, excluding the prefix marker.
pub fn opcode_count() -> usize {
    Opcode::ALL.len() - 1 + ExtendedOpcode::ALL.len()
}
