use crate::opcode::{ExtendedOpcode, Opcode, OpcodeInfo, OperandKind};

/// Branch destination expressed as an index into the instruction slice
/// passed to [`encode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// Either a one-byte or a `0xFE`-prefixed opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Base(Opcode),
    Extended(ExtendedOpcode),
}

impl Op {
    pub const fn info(self) -> OpcodeInfo {
        match self {
            Op::Base(op) => op.info(),
            Op::Extended(op) => op.info(),
        }
    }
}

impl From<Opcode> for Op {
    fn from(op: Opcode) -> Self {
        Op::Base(op)
    }
}

impl From<ExtendedOpcode> for Op {
    fn from(op: ExtendedOpcode) -> Self {
        Op::Extended(op)
    }
}

/// Immediate operand of an instruction to encode.
#[derive(Clone, Debug, PartialEq)]
pub enum Immediate {
    None,
    Int(i64),
    Float(f64),
    Label(Label),
    Switch(Vec<Label>),
}

/// An instruction to encode.
#[derive(Clone, Debug, PartialEq)]
pub struct Insn {
    op: Op,
    imm: Immediate,
}

impl Insn {
    /// Instruction without an inline operand.
    pub fn new(op: impl Into<Op>) -> Self {
        Insn {
            op: op.into(),
            imm: Immediate::None,
        }
    }

    /// Integer constant, variable index or metadata token.
    pub fn int(op: impl Into<Op>, value: i64) -> Self {
        Insn {
            op: op.into(),
            imm: Immediate::Int(value),
        }
    }

    pub fn float(op: impl Into<Op>, value: f64) -> Self {
        Insn {
            op: op.into(),
            imm: Immediate::Float(value),
        }
    }

    pub fn branch(op: impl Into<Op>, target: Label) -> Self {
        Insn {
            op: op.into(),
            imm: Immediate::Label(target),
        }
    }

    pub fn switch(targets: Vec<Label>) -> Self {
        Insn {
            op: Op::Base(Opcode::Switch),
            imm: Immediate::Switch(targets),
        }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn immediate(&self) -> &Immediate {
        &self.imm
    }

    fn size(&self) -> usize {
        let base = self.op.info().size();
        match &self.imm {
            Immediate::Switch(targets) => base + 4 * targets.len(),
            _ => base,
        }
    }
}

/// Errors from [`encode`].
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The immediate does not fit the opcode's operand kind.
    #[error("instruction {index} ({mnemonic}) has a mismatched immediate")]
    OperandMismatch { index: usize, mnemonic: &'static str },
    /// The bare `0xFE` marker was given instead of an [`ExtendedOpcode`].
    #[error("instruction {0} uses the extended prefix as an opcode")]
    PrefixOpcode(usize),
    /// The immediate value is outside the operand's encodable range.
    #[error("instruction {index}: immediate {value} out of range")]
    ImmediateOutOfRange { index: usize, value: i64 },
    /// A branch references an instruction index beyond the program length.
    #[error("label index {0} is out of bounds (program length: {1})")]
    LabelOutOfBounds(u32, usize),
    /// Short-form branch whose distance does not fit an `i8`.
    #[error("instruction {index}: branch distance {distance} does not fit the operand")]
    BranchOutOfRange { index: usize, distance: i64 },
    /// The encoded body would exceed `u32` offsets.
    #[error("encoded body of {0} bytes exceeds the u32 offset range")]
    TooLarge(usize),
}

/// Encode a sequence of instructions into a method body.
///
/// [`Label`] operands are instruction indices into `instructions`. Branch
/// forms are taken as given: a short branch that cannot reach its target is
/// an error rather than being widened.
///
/// Returns `(bytes, offsets)` where `offsets[i]` is the byte offset of
/// instruction `i` within `bytes`.
///
/// ```
/// use cil_isa::{encode, Insn, Label, Opcode};
///
/// let program = [
///     Insn::new(Opcode::Ldarg0),
///     Insn::branch(Opcode::BrtrueS, Label(3)),
///     Insn::new(Opcode::LdcI4_0),
///     Insn::new(Opcode::Ret),
/// ];
/// let (bytes, offsets) = encode(&program)?;
/// assert_eq!(offsets, vec![0, 1, 3, 4]);
/// assert_eq!(bytes, vec![0x02, 0x2d, 0x01, 0x16, 0x2a]);
/// # Ok::<(), cil_isa::EncodeError>(())
/// ```
pub fn encode(instructions: &[Insn]) -> Result<(Vec<u8>, Vec<u32>), EncodeError> {
    // 1. Validate operands and lay out offsets.
    let mut offsets = Vec::with_capacity(instructions.len());
    let mut pos = 0usize;
    for (index, insn) in instructions.iter().enumerate() {
        if insn.op == Op::Base(Opcode::ExtendedPrefix) {
            return Err(EncodeError::PrefixOpcode(index));
        }
        check_operand(index, insn)?;
        offsets.push(u32::try_from(pos).map_err(|_| EncodeError::TooLarge(pos))?);
        pos += insn.size();
    }
    if u32::try_from(pos).is_err() {
        return Err(EncodeError::TooLarge(pos));
    }

    // 2. Emit.
    let mut bytes = Vec::with_capacity(pos);
    for (index, insn) in instructions.iter().enumerate() {
        match insn.op {
            Op::Base(op) => bytes.push(op.byte()),
            Op::Extended(op) => {
                bytes.push(Opcode::EXTENDED_PREFIX_BYTE);
                bytes.push(op.byte());
            }
        }
        let next = offsets[index] as i64 + insn.size() as i64;
        let distance = |label: Label| -> Result<i64, EncodeError> {
            let target = offsets
                .get(label.0 as usize)
                .ok_or(EncodeError::LabelOutOfBounds(label.0, instructions.len()))?;
            Ok(*target as i64 - next)
        };
        let out_of_range = |value: i64| EncodeError::ImmediateOutOfRange { index, value };

        match (insn.op.info().operand_kind(), &insn.imm) {
            (OperandKind::None, Immediate::None) => {}
            (OperandKind::ShortInlineI, Immediate::Int(v)) => {
                let v = i8::try_from(*v).map_err(|_| out_of_range(*v))?;
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (OperandKind::ShortInlineVar, Immediate::Int(v)) => {
                let v = u8::try_from(*v).map_err(|_| out_of_range(*v))?;
                bytes.push(v);
            }
            (OperandKind::InlineVar, Immediate::Int(v)) => {
                let v = u16::try_from(*v).map_err(|_| out_of_range(*v))?;
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (OperandKind::InlineI, Immediate::Int(v)) => {
                let v = i32::try_from(*v).map_err(|_| out_of_range(*v))?;
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (OperandKind::InlineI8, Immediate::Int(v)) => {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (
                OperandKind::InlineTok
                | OperandKind::InlineField
                | OperandKind::InlineMethod
                | OperandKind::InlineType
                | OperandKind::InlineString
                | OperandKind::InlineSig,
                Immediate::Int(v),
            ) => {
                let v = u32::try_from(*v).map_err(|_| out_of_range(*v))?;
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (OperandKind::ShortInlineR, Immediate::Float(v)) => {
                bytes.extend_from_slice(&(*v as f32).to_le_bytes());
            }
            (OperandKind::InlineR, Immediate::Float(v)) => {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            (OperandKind::ShortInlineBrTarget, Immediate::Label(label)) => {
                let d = distance(*label)?;
                let d = i8::try_from(d)
                    .map_err(|_| EncodeError::BranchOutOfRange { index, distance: d })?;
                bytes.extend_from_slice(&d.to_le_bytes());
            }
            (OperandKind::InlineBrTarget, Immediate::Label(label)) => {
                let d = distance(*label)?;
                let d = i32::try_from(d)
                    .map_err(|_| EncodeError::BranchOutOfRange { index, distance: d })?;
                bytes.extend_from_slice(&d.to_le_bytes());
            }
            (OperandKind::InlineSwitch, Immediate::Switch(labels)) => {
                bytes.extend_from_slice(&(labels.len() as u32).to_le_bytes());
                for label in labels {
                    let d = distance(*label)?;
                    let d = i32::try_from(d)
                        .map_err(|_| EncodeError::BranchOutOfRange { index, distance: d })?;
                    bytes.extend_from_slice(&d.to_le_bytes());
                }
            }
            _ => {
                return Err(EncodeError::OperandMismatch {
                    index,
                    mnemonic: insn.op.info().mnemonic(),
                });
            }
        }
    }

    Ok((bytes, offsets))
}

fn check_operand(index: usize, insn: &Insn) -> Result<(), EncodeError> {
    let kind = insn.op.info().operand_kind();
    let ok = match &insn.imm {
        Immediate::None => kind == OperandKind::None,
        Immediate::Int(_) => !matches!(
            kind,
            OperandKind::None
                | OperandKind::ShortInlineR
                | OperandKind::InlineR
                | OperandKind::ShortInlineBrTarget
                | OperandKind::InlineBrTarget
                | OperandKind::InlineSwitch
        ),
        Immediate::Float(_) => matches!(kind, OperandKind::ShortInlineR | OperandKind::InlineR),
        Immediate::Label(_) => matches!(
            kind,
            OperandKind::ShortInlineBrTarget | OperandKind::InlineBrTarget
        ),
        Immediate::Switch(_) => kind == OperandKind::InlineSwitch,
    };
    if ok {
        Ok(())
    } else {
        Err(EncodeError::OperandMismatch {
            index,
            mnemonic: insn.op.info().mnemonic(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backward_short_branch_is_negative() {
        let program = [
            Insn::new(Opcode::Nop),
            Insn::branch(Opcode::BrS, Label(0)),
        ];
        let (bytes, offsets) = encode(&program).unwrap();
        assert_eq!(offsets, vec![0, 1]);
        // next = 3, target = 0
        assert_eq!(bytes, vec![0x00, 0x2b, (-3i8) as u8]);
    }

    #[test]
    fn switch_offsets_are_relative_to_end_of_table() {
        let program = [
            Insn::new(Opcode::Ldarg0),
            Insn::switch(vec![Label(2), Label(3)]),
            Insn::new(Opcode::Nop),
            Insn::new(Opcode::Ret),
        ];
        let (bytes, offsets) = encode(&program).unwrap();
        // switch at 1: opcode + count + 2 entries = 13 bytes, next = 14.
        assert_eq!(offsets, vec![0, 1, 14, 15]);
        assert_eq!(&bytes[2..6], &2u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &0i32.to_le_bytes());
        assert_eq!(&bytes[10..14], &1i32.to_le_bytes());
    }

    #[test]
    fn extended_opcode_is_prefixed() {
        let (bytes, _) = encode(&[Insn::int(ExtendedOpcode::Ldloc, 300)]).unwrap();
        assert_eq!(bytes, vec![0xfe, 0x0c, 0x2c, 0x01]);
    }

    #[test]
    fn mismatched_immediate_is_rejected() {
        let err = encode(&[Insn::new(Opcode::LdcI4S)]).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::OperandMismatch {
                index: 0,
                mnemonic: "ldc.i4.s"
            }
        ));
    }

    #[test]
    fn prefix_marker_is_rejected() {
        let err = encode(&[Insn::new(Opcode::ExtendedPrefix)]).unwrap_err();
        assert!(matches!(err, EncodeError::PrefixOpcode(0)));
    }
}
