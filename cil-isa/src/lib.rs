//! ECMA-335 CIL instruction set: opcode tables, decoding and encoding.
//!
//! [`decode`] and [`IlIterator`] walk a method body in physical order and
//! hand out [`Instruction`]s whose immediates are decoded on demand.
//! [`encode`] assembles [`Insn`] lists with [`Label`] operands back into bytes.

pub mod decoder;
pub mod encoder;
pub mod opcode;

pub use decoder::{DecodeError, IlIterator, Instruction, decode};
pub use encoder::{EncodeError, Immediate, Insn, Label, Op, encode};
pub use opcode::{
    ExtendedOpcode, Opcode, OpcodeFlags, OpcodeInfo, OperandKind, PopArity, PopBehavior,
    PushArity, PushBehavior, lookup_mnemonic, opcode_count,
};
