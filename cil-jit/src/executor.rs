//! Second pass: emulate the evaluation stack and emit one typed operation
//! per instruction.

use cil_ir::{ClrType, Constant, MethodInfo, Operand, OperationInfo, RuntimeInformation};
use cil_isa::{ExtendedOpcode, Instruction, Opcode, PopArity, PushArity};

use crate::error::{JitError, Result};
use crate::processor::OperationProcessor;
use crate::targets::JumpTargets;
use crate::type_lookup;

/// Where a load or store finds its argument/local index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Fixed(u16),
    Immediate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConstSource {
    Int32(i32),
    InlineInt32,
    InlineInt64,
    InlineFloat32,
    InlineFloat64,
}

/// What the executor does with an instruction besides the generic pop/push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpKind {
    LoadArg(Slot),
    LoadLocal(Slot),
    LoadConst(ConstSource),
    StoreArg(Slot),
    StoreLocal(Slot),
    LoadStaticField,
    /// Single-target branch, conditional or not.
    Branch,
    Return,
    /// Pure stack operation; the result type comes from the inference tables.
    Stack,
    Unsupported,
}

fn classify(opcode: Opcode, ext: Option<ExtendedOpcode>) -> OpKind {
    if let (Opcode::ExtendedPrefix, Some(ext)) = (opcode, ext) {
        return match ext {
            ExtendedOpcode::Ldarg => OpKind::LoadArg(Slot::Immediate),
            ExtendedOpcode::Ldloc => OpKind::LoadLocal(Slot::Immediate),
            ExtendedOpcode::Starg => OpKind::StoreArg(Slot::Immediate),
            ExtendedOpcode::Stloc => OpKind::StoreLocal(Slot::Immediate),
            ExtendedOpcode::Ceq
            | ExtendedOpcode::Cgt
            | ExtendedOpcode::CgtUn
            | ExtendedOpcode::Clt
            | ExtendedOpcode::CltUn => OpKind::Stack,
            ExtendedOpcode::Arglist
            | ExtendedOpcode::Ldftn
            | ExtendedOpcode::Ldvirtftn
            | ExtendedOpcode::Ldarga
            | ExtendedOpcode::Ldloca
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
            | ExtendedOpcode::Readonly => OpKind::Unsupported,
        };
    }
    match opcode {
        Opcode::Ldarg0 => OpKind::LoadArg(Slot::Fixed(0)),
        Opcode::Ldarg1 => OpKind::LoadArg(Slot::Fixed(1)),
        Opcode::Ldarg2 => OpKind::LoadArg(Slot::Fixed(2)),
        Opcode::Ldarg3 => OpKind::LoadArg(Slot::Fixed(3)),
        Opcode::LdargS => OpKind::LoadArg(Slot::Immediate),
        Opcode::Ldloc0 => OpKind::LoadLocal(Slot::Fixed(0)),
        Opcode::Ldloc1 => OpKind::LoadLocal(Slot::Fixed(1)),
        Opcode::Ldloc2 => OpKind::LoadLocal(Slot::Fixed(2)),
        Opcode::Ldloc3 => OpKind::LoadLocal(Slot::Fixed(3)),
        Opcode::LdlocS => OpKind::LoadLocal(Slot::Immediate),
        Opcode::StargS => OpKind::StoreArg(Slot::Immediate),
        Opcode::Stloc0 => OpKind::StoreLocal(Slot::Fixed(0)),
        Opcode::Stloc1 => OpKind::StoreLocal(Slot::Fixed(1)),
        Opcode::Stloc2 => OpKind::StoreLocal(Slot::Fixed(2)),
        Opcode::Stloc3 => OpKind::StoreLocal(Slot::Fixed(3)),
        Opcode::StlocS => OpKind::StoreLocal(Slot::Immediate),
        Opcode::LdcI4M1 => OpKind::LoadConst(ConstSource::Int32(-1)),
        Opcode::LdcI4_0 => OpKind::LoadConst(ConstSource::Int32(0)),
        Opcode::LdcI4_1 => OpKind::LoadConst(ConstSource::Int32(1)),
        Opcode::LdcI4_2 => OpKind::LoadConst(ConstSource::Int32(2)),
        Opcode::LdcI4_3 => OpKind::LoadConst(ConstSource::Int32(3)),
        Opcode::LdcI4_4 => OpKind::LoadConst(ConstSource::Int32(4)),
        Opcode::LdcI4_5 => OpKind::LoadConst(ConstSource::Int32(5)),
        Opcode::LdcI4_6 => OpKind::LoadConst(ConstSource::Int32(6)),
        Opcode::LdcI4_7 => OpKind::LoadConst(ConstSource::Int32(7)),
        Opcode::LdcI4_8 => OpKind::LoadConst(ConstSource::Int32(8)),
        Opcode::LdcI4S | Opcode::LdcI4 => OpKind::LoadConst(ConstSource::InlineInt32),
        Opcode::LdcI8 => OpKind::LoadConst(ConstSource::InlineInt64),
        Opcode::LdcR4 => OpKind::LoadConst(ConstSource::InlineFloat32),
        Opcode::LdcR8 => OpKind::LoadConst(ConstSource::InlineFloat64),
        Opcode::Ldsfld => OpKind::LoadStaticField,
        Opcode::Br
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
        | Opcode::BneUnS => OpKind::Branch,
        Opcode::Ret => OpKind::Return,
        Opcode::Nop
        | Opcode::Pop
        | Opcode::Dup
        | Opcode::Add
        | Opcode::AddOvf
        | Opcode::AddOvfUn
        | Opcode::Sub
        | Opcode::SubOvf
        | Opcode::SubOvfUn
        | Opcode::Mul
        | Opcode::MulOvf
        | Opcode::MulOvfUn
        | Opcode::Div
        | Opcode::DivUn
        | Opcode::Rem
        | Opcode::RemUn
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::ShrUn
        | Opcode::Neg
        | Opcode::Not
        | Opcode::ConvI1
        | Opcode::ConvU1
        | Opcode::ConvI2
        | Opcode::ConvU2
        | Opcode::ConvI4
        | Opcode::ConvU4
        | Opcode::ConvI8
        | Opcode::ConvU8
        | Opcode::ConvI
        | Opcode::ConvU
        | Opcode::ConvR4
        | Opcode::ConvR8
        | Opcode::ConvRUn
        | Opcode::ConvOvfI1
        | Opcode::ConvOvfU1
        | Opcode::ConvOvfI2
        | Opcode::ConvOvfU2
        | Opcode::ConvOvfI4
        | Opcode::ConvOvfU4
        | Opcode::ConvOvfI8
        | Opcode::ConvOvfU8
        | Opcode::ConvOvfI
        | Opcode::ConvOvfU
        | Opcode::ConvOvfI1Un
        | Opcode::ConvOvfU1Un
        | Opcode::ConvOvfI2Un
        | Opcode::ConvOvfU2Un
        | Opcode::ConvOvfI4Un
        | Opcode::ConvOvfU4Un
        | Opcode::ConvOvfI8Un
        | Opcode::ConvOvfU8Un
        | Opcode::ConvOvfIUn
        | Opcode::ConvOvfUUn => OpKind::Stack,
        // Calls, multi-target branches and exception flow.
        Opcode::Call
        | Opcode::Calli
        | Opcode::Callvirt
        | Opcode::Newobj
        | Opcode::Jmp
        | Opcode::Switch
        | Opcode::Leave
        | Opcode::LeaveS
        | Opcode::Endfinally
        | Opcode::Throw
        | Opcode::Break
        | Opcode::ExtendedPrefix => OpKind::Unsupported,
        // Addresses and indirect access.
        Opcode::LdargaS
        | Opcode::LdlocaS
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
        | Opcode::Ldsflda
        | Opcode::Ldflda
        | Opcode::Ldelema
        | Opcode::Ckfinite
        | Opcode::Refanyval
        | Opcode::Mkrefany => OpKind::Unsupported,
        // Objects, fields and arrays.
        Opcode::Ldnull
        | Opcode::Ldstr
        | Opcode::Ldtoken
        | Opcode::Cpobj
        | Opcode::Ldobj
        | Opcode::Stobj
        | Opcode::Castclass
        | Opcode::Isinst
        | Opcode::Box
        | Opcode::Unbox
        | Opcode::UnboxAny
        | Opcode::Ldfld
        | Opcode::Stfld
        | Opcode::Stsfld
        | Opcode::Newarr
        | Opcode::Ldlen
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
        | Opcode::Stelem => OpKind::Unsupported,
    }
}

/// Number of stack slots an instruction fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pushes {
    Zero,
    One,
    /// One value pushed twice.
    Duplicate,
}

/// Per-method symbolic execution state.
///
/// Everything here is scoped to a single compilation: create one executor
/// per method and drop it afterwards.
pub struct SymbolicExecutor<'a> {
    method: &'a MethodInfo,
    runtime: &'a dyn RuntimeInformation,
    targets: &'a JumpTargets,
    stack: Vec<Operand>,
    temp_seq: u32,
}

impl<'a> SymbolicExecutor<'a> {
    pub fn new(
        method: &'a MethodInfo,
        runtime: &'a dyn RuntimeInformation,
        targets: &'a JumpTargets,
    ) -> Self {
        SymbolicExecutor {
            method,
            runtime,
            targets,
            stack: Vec::new(),
            temp_seq: 0,
        }
    }

    /// Current evaluation stack, bottom first.
    pub fn stack(&self) -> &[Operand] {
        &self.stack
    }

    /// Execute every instruction in order, forwarding each operation to
    /// `processor`. Returns the number of operations emitted.
    pub fn run(
        &mut self,
        instructions: &[Instruction<'_>],
        processor: &mut dyn OperationProcessor,
    ) -> Result<usize> {
        for (index, insn) in instructions.iter().enumerate() {
            let op = self.step(index, insn)?;
            log::trace!("{:4} {op}", op.index);
            processor.process(op);
        }
        Ok(instructions.len())
    }

    /// Execute one instruction with logical index `index`.
    pub fn step(&mut self, index: usize, insn: &Instruction<'_>) -> Result<OperationInfo> {
        let offset = insn.offset();
        let mnemonic = insn.mnemonic();
        let kind = classify(insn.opcode(), insn.ext_opcode());
        let pushes = fixed_push(insn)?;
        let pops = self.pop_count(insn, kind)?;
        if kind == OpKind::Unsupported {
            return Err(JitError::UnsupportedOpcode { offset, mnemonic });
        }

        let mut operands = Vec::new();
        let mut output: Option<ClrType> = None;

        // Values that do not come from the stack.
        match kind {
            OpKind::LoadArg(slot) => {
                let arg = self.argument(insn, slot)?;
                output = Some(arg.ty());
                operands.push(arg);
            }
            OpKind::LoadLocal(slot) => {
                let local = self.local(insn, slot)?;
                output = Some(local.ty());
                operands.push(local);
            }
            OpKind::LoadConst(source) => {
                let constant = Operand::Const(load_constant(insn, source)?);
                output = Some(constant.ty());
                operands.push(constant);
            }
            _ => {}
        }

        let popped = self.pop_operands(insn, pops)?;
        let types: Vec<ClrType> = popped.iter().map(Operand::ty).collect();
        operands.extend(popped);

        // Destinations other than the stack.
        match kind {
            OpKind::Branch => operands.push(self.branch_target(insn)?),
            OpKind::StoreArg(slot) => operands.push(self.argument(insn, slot)?),
            OpKind::StoreLocal(slot) => operands.push(self.local(insn, slot)?),
            OpKind::LoadStaticField => {
                let token = insn
                    .int_param()
                    .and_then(|t| u32::try_from(t).ok())
                    .ok_or(JitError::MissingImmediate { offset, mnemonic })?;
                let field = self
                    .runtime
                    .field(token)
                    .ok_or(JitError::UnknownField { offset, token })?;
                operands.push(Operand::Const(Constant::Int32(token as i32)));
                output = Some(field.ty);
            }
            _ => {}
        }

        let result_ty = match output {
            Some(ty) => Some(ty),
            None => type_lookup::query(insn.opcode(), insn.ext_opcode(), &types)?,
        };

        let result = self.push_result(insn, pushes, result_ty)?;

        Ok(OperationInfo {
            index,
            opcode: insn.opcode(),
            ext_opcode: insn.ext_opcode(),
            operands,
            result,
            jump_target: self.targets.contains(offset),
        })
    }

    fn new_temp(&mut self, ty: ClrType) -> Operand {
        let seq = self.temp_seq;
        self.temp_seq += 1;
        Operand::Temp { seq, ty }
    }

    /// How many values the instruction pops. `ret` takes whatever is left,
    /// which must be at most one value.
    fn pop_count(&self, insn: &Instruction<'_>, kind: OpKind) -> Result<usize> {
        let offset = insn.offset();
        let pop = insn.pop_behavior();
        let depth = self.stack.len();
        match pop.arity() {
            PopArity::Fixed(n) => Ok(n),
            PopArity::All => Ok(depth),
            PopArity::Variable if kind == OpKind::Return => match depth {
                0 | 1 => Ok(depth),
                _ => Err(JitError::NonEmptyStackAtReturn { offset, depth }),
            },
            PopArity::Variable => Err(JitError::UnsupportedPopBehavior {
                offset,
                mnemonic: insn.mnemonic(),
                behavior: pop,
            }),
        }
    }

    /// Pop `count` inputs, returned in push order.
    fn pop_operands(&mut self, insn: &Instruction<'_>, count: usize) -> Result<Vec<Operand>> {
        let depth = self.stack.len();
        if count > depth {
            return Err(JitError::StackUnderflow {
                offset: insn.offset(),
                mnemonic: insn.mnemonic(),
                needed: count,
                depth,
            });
        }
        Ok(self.stack.split_off(depth - count))
    }

    /// Reconcile the inferred result with the push behavior and update the
    /// stack.
    fn push_result(
        &mut self,
        insn: &Instruction<'_>,
        pushes: Pushes,
        ty: Option<ClrType>,
    ) -> Result<Option<Operand>> {
        let offset = insn.offset();
        let mnemonic = insn.mnemonic();
        match (pushes, ty) {
            (Pushes::Zero, None) => Ok(None),
            (Pushes::Zero, Some(_)) => Err(JitError::UnexpectedResult { offset, mnemonic }),
            (Pushes::One | Pushes::Duplicate, None) => {
                Err(JitError::MissingResult { offset, mnemonic })
            }
            (Pushes::One, Some(ty)) => {
                let temp = self.new_temp(ty);
                self.stack.push(temp);
                Ok(Some(temp))
            }
            (Pushes::Duplicate, Some(ty)) => {
                let temp = self.new_temp(ty);
                self.stack.push(temp);
                self.stack.push(temp);
                Ok(Some(temp))
            }
        }
    }

    fn slot_index(insn: &Instruction<'_>, slot: Slot) -> Result<i64> {
        match slot {
            Slot::Fixed(index) => Ok(index as i64),
            Slot::Immediate => insn.int_param().ok_or(JitError::MissingImmediate {
                offset: insn.offset(),
                mnemonic: insn.mnemonic(),
            }),
        }
    }

    fn argument(&self, insn: &Instruction<'_>, slot: Slot) -> Result<Operand> {
        let index = Self::slot_index(insn, slot)?;
        u16::try_from(index)
            .ok()
            .and_then(|i| self.method.parameter(i))
            .map(|p| Operand::Argument {
                index: p.position,
                ty: p.ty,
            })
            .ok_or(JitError::ArgumentOutOfRange {
                offset: insn.offset(),
                index,
                count: self.method.parameters.len(),
            })
    }

    fn local(&self, insn: &Instruction<'_>, slot: Slot) -> Result<Operand> {
        let index = Self::slot_index(insn, slot)?;
        u16::try_from(index)
            .ok()
            .and_then(|i| self.method.local(i))
            .map(|l| Operand::Local {
                index: l.index,
                ty: l.ty,
            })
            .ok_or(JitError::LocalOutOfRange {
                offset: insn.offset(),
                index,
                count: self.method.locals.len(),
            })
    }

    fn branch_target(&self, insn: &Instruction<'_>) -> Result<Operand> {
        let target = insn
            .branch_targets()
            .first()
            .copied()
            .ok_or(JitError::MissingImmediate {
                offset: insn.offset(),
                mnemonic: insn.mnemonic(),
            })?;
        u32::try_from(target)
            .ok()
            .and_then(|offset| self.targets.get(offset))
            .map(|index| Operand::BranchTarget { index })
            .ok_or(JitError::UnresolvedBranchTarget {
                offset: insn.offset(),
                target,
            })
    }
}

fn fixed_push(insn: &Instruction<'_>) -> Result<Pushes> {
    let push = insn.push_behavior();
    match push.arity() {
        PushArity::None => Ok(Pushes::Zero),
        PushArity::One => Ok(Pushes::One),
        PushArity::Duplicate => Ok(Pushes::Duplicate),
        PushArity::Variable => Err(JitError::UnsupportedPushBehavior {
            offset: insn.offset(),
            mnemonic: insn.mnemonic(),
            behavior: push,
        }),
    }
}

fn load_constant(insn: &Instruction<'_>, source: ConstSource) -> Result<Constant> {
    let missing = || JitError::MissingImmediate {
        offset: insn.offset(),
        mnemonic: insn.mnemonic(),
    };
    Ok(match source {
        ConstSource::Int32(value) => Constant::Int32(value),
        // Both ldc.i4 forms sign-extend from at most 32 bits.
        ConstSource::InlineInt32 => Constant::Int32(insn.int_param().ok_or_else(missing)? as i32),
        ConstSource::InlineInt64 => Constant::Int64(insn.int_param().ok_or_else(missing)?),
        ConstSource::InlineFloat32 => {
            Constant::Float32(insn.float_param().ok_or_else(missing)? as f32)
        }
        ConstSource::InlineFloat64 => Constant::Float64(insn.float_param().ok_or_else(missing)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use cil_ir::FieldTable;

    fn decoded(code: &[u8]) -> Instruction<'_> {
        cil_isa::decode(code).unwrap()[0]
    }

    #[test]
    fn only_table_opcodes_are_stack_operations() {
        for &op in Opcode::ALL {
            let expected =
                type_lookup::has_rule(op, None) || matches!(op, Opcode::Nop | Opcode::Pop);
            assert_eq!(classify(op, None) == OpKind::Stack, expected, "{op}");
        }
        for &ext in ExtendedOpcode::ALL {
            let stack = classify(Opcode::ExtendedPrefix, Some(ext)) == OpKind::Stack;
            assert_eq!(stack, type_lookup::has_rule(Opcode::ExtendedPrefix, Some(ext)), "{ext}");
        }
    }

    #[test]
    fn result_must_match_push_behavior() {
        let method = MethodInfo::new("m", Vec::new());
        let fields = FieldTable::new();
        let targets = JumpTargets::resolve(&[]).unwrap();
        let mut exec = SymbolicExecutor::new(&method, &fields, &targets);

        // pop pushes nothing.
        let pop = decoded(&[0x26]);
        let err = exec.push_result(&pop, Pushes::Zero, Some(ClrType::Int32)).unwrap_err();
        assert!(matches!(err, JitError::UnexpectedResult { mnemonic: "pop", .. }));
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);

        // add must push its sum.
        let add = decoded(&[0x58]);
        let err = exec.push_result(&add, Pushes::One, None).unwrap_err();
        assert!(matches!(err, JitError::MissingResult { mnemonic: "add", .. }));
        let err = exec.push_result(&add, Pushes::Duplicate, None).unwrap_err();
        assert!(matches!(err, JitError::MissingResult { .. }));

        assert!(exec.stack().is_empty());
        assert_eq!(exec.push_result(&pop, Pushes::Zero, None).unwrap(), None);
    }

    #[test]
    fn variable_stack_behavior_is_unsupported() {
        let method = MethodInfo::new("m", Vec::new());
        let fields = FieldTable::new();
        let targets = JumpTargets::resolve(&[]).unwrap();
        let mut exec = SymbolicExecutor::new(&method, &fields, &targets);

        // newobj 0x06000001: variable pop, one push.
        let newobj = decoded(&[0x73, 0x01, 0x00, 0x00, 0x06]);
        let err = exec.step(0, &newobj).unwrap_err();
        assert!(matches!(err, JitError::UnsupportedPopBehavior { mnemonic: "newobj", .. }));
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

        // calli: variable push.
        let calli = decoded(&[0x29, 0x01, 0x00, 0x00, 0x11]);
        let err = exec.step(0, &calli).unwrap_err();
        assert!(matches!(err, JitError::UnsupportedPushBehavior { mnemonic: "calli", .. }));
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }
}
