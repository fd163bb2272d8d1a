use cil_ir::ClrType;
use cil_isa::{DecodeError, PopBehavior, PushBehavior};

/// Broad class of a [`JitError`], for callers that pick a fallback per kind
/// (e.g. interpret the method instead of compiling it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The engine does not implement the instruction or stack behavior.
    UnsupportedOperation,
    /// The input or the engine's own bookkeeping is inconsistent.
    InternalConsistency,
    /// No result type exists for the operand types.
    TypeInference,
}

/// Errors raised while compiling one method. Each aborts that compilation
/// only.
#[derive(Debug, thiserror::Error)]
pub enum JitError {
    #[error("unsupported opcode {mnemonic} at offset {offset:#x}")]
    UnsupportedOpcode { offset: u32, mnemonic: &'static str },

    #[error("unsupported pop behavior {behavior:?} of {mnemonic} at offset {offset:#x}")]
    UnsupportedPopBehavior {
        offset: u32,
        mnemonic: &'static str,
        behavior: PopBehavior,
    },

    #[error("unsupported push behavior {behavior:?} of {mnemonic} at offset {offset:#x}")]
    UnsupportedPushBehavior {
        offset: u32,
        mnemonic: &'static str,
        behavior: PushBehavior,
    },

    /// Branch destination that is not the start of a decoded instruction.
    #[error("branch at offset {offset:#x} targets {target:#x}, which is not an instruction boundary")]
    UnresolvedBranchTarget { offset: u32, target: i64 },

    /// Forward branch destination never reached by the first pass.
    #[error("branch target {target:#x} was never reached")]
    PendingBranchTarget { target: i64 },

    #[error("return at offset {offset:#x} leaves {depth} values on the stack")]
    NonEmptyStackAtReturn { offset: u32, depth: usize },

    #[error("{mnemonic} at offset {offset:#x} pops {needed} values from a stack of {depth}")]
    StackUnderflow {
        offset: u32,
        mnemonic: &'static str,
        needed: usize,
        depth: usize,
    },

    #[error("{mnemonic} at offset {offset:#x} produced a value but pushes nothing")]
    UnexpectedResult { offset: u32, mnemonic: &'static str },

    #[error("{mnemonic} at offset {offset:#x} must push a value but produced none")]
    MissingResult { offset: u32, mnemonic: &'static str },

    #[error("argument {index} at offset {offset:#x} out of range ({count} parameters)")]
    ArgumentOutOfRange { offset: u32, index: i64, count: usize },

    #[error("local {index} at offset {offset:#x} out of range ({count} locals)")]
    LocalOutOfRange { offset: u32, index: i64, count: usize },

    #[error("unknown field token {token:#010x} at offset {offset:#x}")]
    UnknownField { offset: u32, token: u32 },

    #[error("{mnemonic} at offset {offset:#x} has no usable immediate")]
    MissingImmediate { offset: u32, mnemonic: &'static str },

    /// Type lookup called with the wrong number of operand types.
    #[error("{op} expects {expected} operand types, got {found}")]
    OperandCount {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("malformed method body: {0}")]
    Decode(#[from] DecodeError),

    #[error("{op} is not defined for {lhs} and {rhs}")]
    IllegalOperandTypes {
        op: &'static str,
        lhs: ClrType,
        rhs: ClrType,
    },

    #[error("{op} is not defined for {ty}")]
    IllegalOperandType { op: &'static str, ty: ClrType },
}

impl JitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JitError::UnsupportedOpcode { .. }
            | JitError::UnsupportedPopBehavior { .. }
            | JitError::UnsupportedPushBehavior { .. } => ErrorKind::UnsupportedOperation,
            JitError::UnresolvedBranchTarget { .. }
            | JitError::PendingBranchTarget { .. }
            | JitError::NonEmptyStackAtReturn { .. }
            | JitError::StackUnderflow { .. }
            | JitError::UnexpectedResult { .. }
            | JitError::MissingResult { .. }
            | JitError::ArgumentOutOfRange { .. }
            | JitError::LocalOutOfRange { .. }
            | JitError::UnknownField { .. }
            | JitError::MissingImmediate { .. }
            | JitError::OperandCount { .. }
            | JitError::Decode(_) => ErrorKind::InternalConsistency,
            JitError::IllegalOperandTypes { .. } | JitError::IllegalOperandType { .. } => {
                ErrorKind::TypeInference
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, JitError>;
