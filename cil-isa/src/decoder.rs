use crate::opcode::{
    ExtendedOpcode, Opcode, OpcodeFlags, OpcodeInfo, OperandKind, PopBehavior, PushBehavior,
};

/// Errors from [`decode`] and [`IlIterator`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Unassigned one-byte opcode.
    #[error("invalid opcode {byte:#04x} at offset {offset:#x}")]
    InvalidOpcode { offset: usize, byte: u8 },
    /// Unassigned byte after the `0xFE` prefix.
    #[error("invalid extended opcode 0xfe {byte:#04x} at offset {offset:#x}")]
    InvalidExtendedOpcode { offset: usize, byte: u8 },
    /// Instruction truncated at the given byte offset.
    #[error("truncated instruction at offset {0:#x}")]
    Truncated(usize),
    /// Offsets are `u32`; larger bodies cannot be addressed.
    #[error("method body of {0} bytes exceeds the u32 offset range")]
    BodyTooLarge(usize),
}

/// One decoded instruction, borrowing its immediate bytes from the method body.
///
/// Immediates are decoded on demand through [`int_param`](Self::int_param),
/// [`float_param`](Self::float_param) and
/// [`switch_targets`](Self::switch_targets).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instruction<'a> {
    offset: u32,
    next_offset: u32,
    opcode: Opcode,
    ext_opcode: Option<ExtendedOpcode>,
    immediate: &'a [u8],
}

impl<'a> Instruction<'a> {
    /// Byte offset of this instruction within the method body.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Byte offset of the following instruction.
    #[inline]
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.next_offset - self.offset
    }

    /// The one-byte opcode; [`Opcode::ExtendedPrefix`] for two-byte opcodes.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Set only when [`opcode`](Self::opcode) is the extended prefix.
    #[inline]
    pub fn ext_opcode(&self) -> Option<ExtendedOpcode> {
        self.ext_opcode
    }

    /// Metadata of the effective opcode (the extended one when present).
    pub fn info(&self) -> OpcodeInfo {
        match self.ext_opcode {
            Some(ext) => ext.info(),
            None => self.opcode.info(),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        self.info().mnemonic()
    }

    pub fn pop_behavior(&self) -> PopBehavior {
        self.info().pop_behavior()
    }

    pub fn push_behavior(&self) -> PushBehavior {
        self.info().push_behavior()
    }

    pub fn flags(&self) -> OpcodeFlags {
        self.info().flags()
    }

    pub fn operand_kind(&self) -> OperandKind {
        self.info().operand_kind()
    }

    /// Raw immediate bytes, little-endian as encoded.
    #[inline]
    pub fn immediate(&self) -> &'a [u8] {
        self.immediate
    }

    /// Decode an integer immediate: constants, variable indices, metadata
    /// tokens and branch offsets. Short variable indices and tokens are
    /// zero-extended, everything else is sign-extended.
    pub fn int_param(&self) -> Option<i64> {
        let imm = self.immediate;
        match self.operand_kind() {
            OperandKind::ShortInlineI | OperandKind::ShortInlineBrTarget => {
                Some(imm[0] as i8 as i64)
            }
            OperandKind::ShortInlineVar => Some(imm[0] as i64),
            OperandKind::InlineVar => Some(u16::from_le_bytes(le(imm)) as i64),
            OperandKind::InlineI | OperandKind::InlineBrTarget => {
                Some(i32::from_le_bytes(le(imm)) as i64)
            }
            OperandKind::InlineI8 => Some(i64::from_le_bytes(le(imm))),
            OperandKind::InlineTok
            | OperandKind::InlineField
            | OperandKind::InlineMethod
            | OperandKind::InlineType
            | OperandKind::InlineString
            | OperandKind::InlineSig => Some(u32::from_le_bytes(le(imm)) as i64),
            OperandKind::None
            | OperandKind::ShortInlineR
            | OperandKind::InlineR
            | OperandKind::InlineSwitch => None,
        }
    }

    /// Decode a floating-point immediate (`ldc.r4`, `ldc.r8`).
    pub fn float_param(&self) -> Option<f64> {
        match self.operand_kind() {
            OperandKind::ShortInlineR => Some(f32::from_le_bytes(le(self.immediate)) as f64),
            OperandKind::InlineR => Some(f64::from_le_bytes(le(self.immediate))),
            _ => None,
        }
    }

    /// Relative offsets of a `switch` jump table.
    pub fn switch_targets(&self) -> Option<Vec<i32>> {
        if self.operand_kind() != OperandKind::InlineSwitch {
            return None;
        }
        let table = &self.immediate[4..];
        Some(
            table
                .chunks_exact(4)
                .map(|chunk| i32::from_le_bytes(le(chunk)))
                .collect(),
        )
    }

    /// Absolute byte offsets this instruction may branch to, in operand
    /// order. Relative offsets are measured from the next instruction.
    pub fn branch_targets(&self) -> Vec<i64> {
        let base = self.next_offset as i64;
        match self.operand_kind() {
            OperandKind::InlineSwitch => self
                .switch_targets()
                .unwrap_or_default()
                .into_iter()
                .map(|rel| base + rel as i64)
                .collect(),
            kind if kind.is_branch() => self.int_param().map(|rel| base + rel).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

/// Lazily decodes a method body in physical order.
///
/// Decoding stops after the first error.
#[derive(Clone, Debug)]
pub struct IlIterator<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> IlIterator<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        IlIterator {
            code,
            offset: 0,
            failed: false,
        }
    }

    fn decode_at(&self, offset: usize) -> Result<Instruction<'a>, DecodeError> {
        let code = self.code;
        let byte = code[offset];
        let opcode = Opcode::from_byte(byte).ok_or(DecodeError::InvalidOpcode { offset, byte })?;

        let (ext_opcode, info) = if opcode == Opcode::ExtendedPrefix {
            let &ext_byte = code.get(offset + 1).ok_or(DecodeError::Truncated(offset))?;
            let ext = ExtendedOpcode::from_byte(ext_byte).ok_or(
                DecodeError::InvalidExtendedOpcode {
                    offset,
                    byte: ext_byte,
                },
            )?;
            (Some(ext), ext.info())
        } else {
            (None, opcode.info())
        };

        let imm_start = offset + if ext_opcode.is_some() { 2 } else { 1 };
        let mut imm_len = info.operand_kind().size();
        if imm_start + imm_len > code.len() {
            return Err(DecodeError::Truncated(offset));
        }
        if info.operand_kind() == OperandKind::InlineSwitch {
            let count = u32::from_le_bytes(le(&code[imm_start..])) as usize;
            imm_len = count
                .checked_mul(4)
                .and_then(|table| table.checked_add(4))
                .ok_or(DecodeError::Truncated(offset))?;
            if imm_start + imm_len > code.len() {
                return Err(DecodeError::Truncated(offset));
            }
        }

        let next = imm_start + imm_len;
        let too_large = || DecodeError::BodyTooLarge(code.len());
        Ok(Instruction {
            offset: u32::try_from(offset).map_err(|_| too_large())?,
            next_offset: u32::try_from(next).map_err(|_| too_large())?,
            opcode,
            ext_opcode,
            immediate: &code[imm_start..next],
        })
    }
}

impl<'a> Iterator for IlIterator<'a> {
    type Item = Result<Instruction<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        match self.decode_at(self.offset) {
            Ok(insn) => {
                self.offset = insn.next_offset as usize;
                Some(Ok(insn))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Decode a whole method body into instructions in physical order.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction<'_>>, DecodeError> {
    IlIterator::new(code).collect()
}
