use std::fmt;

use cil_isa::{ExtendedOpcode, Opcode};

use crate::operand::Operand;

/// One symbolically executed instruction, as handed to an operation
/// processor.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationInfo {
    /// Dense logical index of the instruction.
    pub index: usize,
    pub opcode: Opcode,
    /// Set only when `opcode` is [`Opcode::ExtendedPrefix`].
    pub ext_opcode: Option<ExtendedOpcode>,
    /// Stack inputs in push order, followed by structural operands
    /// (branch target, store destination, field token).
    pub operands: Vec<Operand>,
    pub result: Option<Operand>,
    /// Some branch lands on this instruction.
    pub jump_target: bool,
}

impl OperationInfo {
    pub fn mnemonic(&self) -> &'static str {
        match self.ext_opcode {
            Some(ext) => ext.mnemonic(),
            None => self.opcode.mnemonic(),
        }
    }

    /// Logical index of the branch destination, if any.
    pub fn branch_target(&self) -> Option<usize> {
        self.operands.iter().find_map(Operand::branch_target)
    }
}

impl fmt::Display for OperationInfo {
    /// `T2:int32 = add A0:int32, A1:int32`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "{result} = ")?;
        }
        f.write_str(self.mnemonic())?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}
