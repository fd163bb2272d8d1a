mod common;

use cil_ir::{ClrType, Constant, FieldInfo, FieldTable, Operand, OperandTag};
use cil_isa::{ExtendedOpcode, Insn, Label, Opcode, PopArity, PushArity, decode};
use cil_jit::{
    ErrorKind, JitError, JumpTargets, OperationLog, SymbolicExecutor, compile_method,
};
use common::{method, names, run, run_with};

const I32: ClrType = ClrType::Int32;

#[test]
fn add_two_arguments() {
    let m = method(
        &[I32, I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg1),
            Insn::new(Opcode::Add),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(ops.len(), 4);

    assert_eq!(names(&ops[0]), ["A0"]);
    assert_eq!(ops[0].result, Some(Operand::Temp { seq: 0, ty: I32 }));
    assert_eq!(names(&ops[1]), ["A1"]);

    let add = &ops[2];
    assert_eq!(names(add), ["T0", "T1"]);
    assert_eq!(add.result.map(|r| r.ty()), Some(I32));

    let ret = &ops[3];
    assert_eq!(ret.operands.len(), 1);
    assert_eq!(ret.operands[0].ty(), I32);
    assert_eq!(ret.operands[0].name(), add.result.unwrap().name());
    assert!(ret.result.is_none());
}

#[test]
fn logical_indices_are_dense() {
    let m = method(
        &[I32],
        &[I32],
        &[
            Insn::new(Opcode::Nop),
            Insn::new(Opcode::Ldarg0),
            Insn::int(Opcode::LdcI4S, 3),
            Insn::new(Opcode::Mul),
            Insn::new(Opcode::Stloc0),
            Insn::new(Opcode::Ldloc0),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    let indices: Vec<usize> = ops.iter().map(|op| op.index).collect();
    assert_eq!(indices, (0..7).collect::<Vec<_>>());
}

#[test]
fn void_return_with_empty_stack() {
    let m = method(&[], &[], &[Insn::new(Opcode::Nop), Insn::new(Opcode::Ret)]);
    let ops = run(&m).unwrap();
    assert!(ops[1].operands.is_empty());
    assert!(ops[1].result.is_none());
}

#[test]
fn return_with_two_values_is_internal_error() {
    let m = method(
        &[I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ret),
        ],
    );
    let err = run(&m).unwrap_err();
    assert!(matches!(err, JitError::NonEmptyStackAtReturn { depth: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::InternalConsistency);
}

#[test]
fn stores_append_destination() {
    let m = method(
        &[I32],
        &[ClrType::Int64, I32],
        &[
            Insn::int(Opcode::LdcI4, 1000),
            Insn::new(Opcode::Stloc1),
            Insn::new(Opcode::Ldarg0),
            Insn::int(Opcode::StargS, 0),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(names(&ops[0]), ["C1000"]);
    assert_eq!(names(&ops[1]), ["T0", "L1"]);
    assert!(ops[1].result.is_none());
    assert_eq!(names(&ops[3]), ["T1", "A0"]);
}

#[test]
fn extended_loads_and_stores() {
    let m = method(
        &[I32, ClrType::Double],
        &[ClrType::Double],
        &[
            Insn::int(ExtendedOpcode::Ldarg, 1),
            Insn::int(ExtendedOpcode::Stloc, 0),
            Insn::int(ExtendedOpcode::Ldloc, 0),
            Insn::int(ExtendedOpcode::Starg, 1),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(ops[0].ext_opcode, Some(ExtendedOpcode::Ldarg));
    assert_eq!(ops[0].result.map(|r| r.ty()), Some(ClrType::Double));
    assert_eq!(names(&ops[1]), ["T0", "L0"]);
    assert_eq!(names(&ops[3]), ["T1", "A1"]);
}

#[test]
fn wide_constants() {
    let m = method(
        &[],
        &[],
        &[
            Insn::int(Opcode::LdcI8, 1 << 40),
            Insn::new(Opcode::Pop),
            Insn::float(Opcode::LdcR4, 0.5),
            Insn::new(Opcode::Pop),
            Insn::float(Opcode::LdcR8, 2.25),
            Insn::new(Opcode::Pop),
            Insn::new(Opcode::LdcI4M1),
            Insn::new(Opcode::Pop),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(ops[0].operands, [Operand::Const(Constant::Int64(1 << 40))]);
    assert_eq!(ops[0].result.map(|r| r.ty()), Some(ClrType::Int64));
    assert_eq!(ops[2].operands, [Operand::Const(Constant::Float32(0.5))]);
    assert_eq!(ops[2].result.map(|r| r.ty()), Some(ClrType::Single));
    assert_eq!(ops[4].result.map(|r| r.ty()), Some(ClrType::Double));
    assert_eq!(names(&ops[6]), ["C-1"]);
    assert_eq!(names(&ops[7]), ["T3"]);
}

#[test]
fn dup_pushes_one_temp_twice() {
    let m = method(
        &[I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Dup),
            Insn::new(Opcode::Add),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    let dup = ops[1].result.unwrap();
    assert_eq!(dup.ty(), I32);
    assert_eq!(names(&ops[1]), ["T0"]);
    // Both stack entries are the same value.
    assert_eq!(names(&ops[2]), [dup.name(), dup.name()]);
}

#[test]
fn temporaries_are_never_reused() {
    let m = method(
        &[I32, I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg1),
            Insn::new(Opcode::Sub),
            Insn::new(Opcode::Ldarg1),
            Insn::new(Opcode::Mul),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    let temps: Vec<String> = ops.iter().filter_map(|op| op.result).map(|r| r.name()).collect();
    assert_eq!(temps, ["T0", "T1", "T2", "T3", "T4"]);
    assert!(
        ops.iter()
            .filter_map(|op| op.result)
            .all(|r| r.tag() == OperandTag::Temp)
    );
}

#[test]
fn comparison_yields_bool() {
    let m = method(
        &[I32, I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg1),
            Insn::new(ExtendedOpcode::Clt),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(ops[2].opcode, Opcode::ExtendedPrefix);
    assert_eq!(ops[2].mnemonic(), "clt");
    assert_eq!(ops[2].result.map(|r| r.ty()), Some(ClrType::Boolean));
}

#[test]
fn forward_and_backward_branches_share_target() {
    // 0: ldarg.0
    // 1: brfalse.s -> 4
    // 2: nop
    // 3: br.s -> 4
    // 4: nop          <- target of both
    // 5: ldarg.0
    // 6: brtrue.s -> 4
    // 7: ret
    let m = method(
        &[I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::branch(Opcode::BrfalseS, Label(4)),
            Insn::new(Opcode::Nop),
            Insn::branch(Opcode::BrS, Label(4)),
            Insn::new(Opcode::Nop),
            Insn::new(Opcode::Ldarg0),
            Insn::branch(Opcode::BrtrueS, Label(4)),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(ops[1].branch_target(), Some(4));
    assert_eq!(ops[3].branch_target(), Some(4));
    assert_eq!(ops[6].branch_target(), Some(4));
    assert!(ops[4].jump_target);

    // Conditional branches consume their condition before the target.
    assert_eq!(names(&ops[1]), ["T0", "PC"]);
    assert_eq!(ops[1].operands[1].ty(), ClrType::Void);

    // Fall-through successors of branches are targets too.
    assert!(ops[2].jump_target);
    assert!(ops[7].jump_target);
    assert!(!ops[0].jump_target);
    assert!(!ops[5].jump_target);
}

#[test]
fn compare_and_branch_consumes_both_operands() {
    let m = method(
        &[I32, I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg1),
            Insn::branch(Opcode::Bge, Label(3)),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(names(&ops[2]), ["T0", "T1", "PC"]);
    assert_eq!(ops[2].branch_target(), Some(3));
}

#[test]
fn static_field_load_uses_field_type() {
    let fields: FieldTable = [FieldInfo {
        token: 0x0400_0002,
        name: "total".into(),
        ty: ClrType::Int64,
    }]
    .into_iter()
    .collect();
    let m = method(
        &[],
        &[],
        &[Insn::int(Opcode::Ldsfld, 0x0400_0002), Insn::new(Opcode::Ret)],
    );
    let ops = run_with(&m, &fields).unwrap();
    assert_eq!(
        ops[0].operands,
        [Operand::Const(Constant::Int32(0x0400_0002))]
    );
    assert_eq!(ops[0].result, Some(Operand::Temp { seq: 0, ty: ClrType::Int64 }));
    assert_eq!(ops[1].operands[0].ty(), ClrType::Int64);
}

#[test]
fn unknown_field_token() {
    let m = method(&[], &[], &[Insn::int(Opcode::Ldsfld, 5), Insn::new(Opcode::Ret)]);
    let err = run(&m).unwrap_err();
    assert!(matches!(err, JitError::UnknownField { token: 5, offset: 0 }));
    assert_eq!(err.kind(), ErrorKind::InternalConsistency);
}

#[test]
fn add_object_and_int32_is_type_error() {
    let m = method(
        &[ClrType::Object, I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg1),
            Insn::new(Opcode::Add),
            Insn::new(Opcode::Ret),
        ],
    );
    let err = run(&m).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeInference);
    assert!(matches!(
        err,
        JitError::IllegalOperandTypes {
            op: "add",
            lhs: ClrType::Object,
            rhs: ClrType::Int32
        }
    ));
}

#[test]
fn int32_native_int_mix() {
    for params in [[I32, ClrType::IntPtr], [ClrType::IntPtr, I32]] {
        let m = method(
            &params,
            &[],
            &[
                Insn::new(Opcode::Ldarg0),
                Insn::new(Opcode::Ldarg1),
                Insn::new(Opcode::Add),
                Insn::new(Opcode::Ret),
            ],
        );
        let ops = run(&m).unwrap();
        assert_eq!(ops[2].result.map(|r| r.ty()), Some(ClrType::IntPtr));
    }
}

#[test]
fn calls_are_unsupported() {
    let m = method(&[], &[], &[Insn::int(Opcode::Call, 0x0600_0001), Insn::new(Opcode::Ret)]);
    let err = run(&m).unwrap_err();
    assert!(matches!(err, JitError::UnsupportedPushBehavior { mnemonic: "call", .. }));
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

    let m = method(&[], &[], &[Insn::int(Opcode::Newobj, 0x0600_0001), Insn::new(Opcode::Ret)]);
    let err = run(&m).unwrap_err();
    assert!(matches!(err, JitError::UnsupportedPopBehavior { mnemonic: "newobj", .. }));
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

    let m = method(&[], &[], &[Insn::new(Opcode::Ldnull), Insn::new(Opcode::Ret)]);
    let err = run(&m).unwrap_err();
    assert!(matches!(err, JitError::UnsupportedOpcode { mnemonic: "ldnull", .. }));
}

#[test]
fn widened_unsigned_multiplies_with_int64() {
    let m = method(
        &[ClrType::UInt32, ClrType::Int64],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::ConvU8),
            Insn::new(Opcode::Ldarg1),
            Insn::new(Opcode::Mul),
            Insn::new(Opcode::Ret),
        ],
    );
    let ops = run(&m).unwrap();
    assert_eq!(ops[1].result.map(|r| r.ty()), Some(ClrType::Int64));
    assert_eq!(ops[3].result.map(|r| r.ty()), Some(ClrType::Int64));
    assert_eq!(ops[4].operands[0].ty(), ClrType::Int64);

    // Small integers widen the same way.
    let m = method(
        &[ClrType::Int16],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::ConvI8),
            Insn::new(Opcode::Ret),
        ],
    );
    assert_eq!(run(&m).unwrap()[1].result.map(|r| r.ty()), Some(ClrType::Int64));
}

#[test]
fn stack_depth_tracks_pushes_and_pops() {
    let m = method(
        &[I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Dup),
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Add),
            Insn::new(Opcode::Pop),
            Insn::branch(Opcode::BrS, Label(6)),
            Insn::new(Opcode::Ret),
        ],
    );
    let insns = decode(&m.body).unwrap();
    let targets = JumpTargets::resolve(&insns).unwrap();
    let fields = FieldTable::new();
    let mut exec = SymbolicExecutor::new(&m, &fields, &targets);

    let mut expected = 0usize;
    let mut depths = Vec::new();
    for (index, insn) in insns.iter().enumerate() {
        if insn.opcode() == Opcode::Ret {
            assert!(exec.stack().len() <= 1);
        }
        let popped = match insn.pop_behavior().arity() {
            PopArity::Fixed(n) => n,
            PopArity::All | PopArity::Variable => exec.stack().len(),
        };
        let pushed = match insn.push_behavior().arity() {
            PushArity::None => 0,
            PushArity::One => 1,
            PushArity::Duplicate => 2,
            PushArity::Variable => unreachable!(),
        };
        exec.step(index, insn).unwrap();
        expected = expected - popped + pushed;
        assert_eq!(exec.stack().len(), expected, "after {}", insn.mnemonic());
        depths.push(expected);
    }
    assert_eq!(depths, [1, 2, 3, 2, 1, 1, 0]);
}

#[test]
fn switch_targets_resolve_but_switch_is_unsupported() {
    let m = method(
        &[I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::switch(vec![Label(2), Label(3)]),
            Insn::new(Opcode::Nop),
            Insn::new(Opcode::Ret),
        ],
    );
    let mut log = OperationLog::new();
    let err = compile_method(&m, &FieldTable::new(), &mut log).unwrap_err();
    assert!(matches!(err, JitError::UnsupportedOpcode { mnemonic: "switch", .. }));
    // Operations before the failing instruction were delivered.
    assert_eq!(log.len(), 1);
}

#[test]
fn stack_underflow() {
    let m = method(&[], &[], &[Insn::new(Opcode::Add), Insn::new(Opcode::Ret)]);
    let err = run(&m).unwrap_err();
    assert!(matches!(
        err,
        JitError::StackUnderflow { needed: 2, depth: 0, .. }
    ));
}

#[test]
fn argument_out_of_range() {
    let m = method(&[I32], &[], &[Insn::new(Opcode::Ldarg2), Insn::new(Opcode::Ret)]);
    let err = run(&m).unwrap_err();
    assert!(matches!(
        err,
        JitError::ArgumentOutOfRange { index: 2, count: 1, .. }
    ));
    let m = method(&[], &[I32], &[Insn::int(Opcode::LdlocS, 9), Insn::new(Opcode::Ret)]);
    assert!(matches!(
        run(&m).unwrap_err(),
        JitError::LocalOutOfRange { index: 9, count: 1, .. }
    ));
}

#[test]
fn malformed_body_is_reported() {
    let mut m = method(&[], &[], &[Insn::new(Opcode::Ret)]);
    m.body = vec![0x00, 0x24];
    let err = run(&m).unwrap_err();
    assert!(matches!(err, JitError::Decode(_)));
    assert_eq!(err.kind(), ErrorKind::InternalConsistency);
}

#[test]
fn compilations_are_independent() {
    let m = method(
        &[I32, I32],
        &[],
        &[
            Insn::new(Opcode::Ldarg0),
            Insn::new(Opcode::Ldarg1),
            Insn::new(Opcode::Xor),
            Insn::new(Opcode::Ret),
        ],
    );
    let first = run(&m).unwrap();
    let second = run(&m).unwrap();
    assert_eq!(first, second);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| run(&m).unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for ops in results {
        assert_eq!(ops, first);
    }
}
