mod common;

use cil_isa::*;
use common::assert_roundtrip;

#[test]
fn arithmetic_body() {
    assert_roundtrip(&[
        Insn::new(Opcode::Ldarg0),
        Insn::new(Opcode::Ldarg1),
        Insn::new(Opcode::Add),
        Insn::new(Opcode::Ret),
    ]);
}

#[test]
fn constants_of_every_width() {
    assert_roundtrip(&[
        Insn::int(Opcode::LdcI4S, -128),
        Insn::int(Opcode::LdcI4, i32::MIN as i64),
        Insn::int(Opcode::LdcI8, i64::MAX),
        Insn::float(Opcode::LdcR4, 1.5),
        Insn::float(Opcode::LdcR8, -0.25),
        Insn::int(Opcode::Ldsfld, 0x0400_0001),
    ]);
}

#[test]
fn variable_indices_are_unsigned() {
    let (bytes, _) = encode(&[Insn::int(Opcode::LdlocS, 200)]).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded[0].int_param(), Some(200));

    assert_roundtrip(&[
        Insn::int(ExtendedOpcode::Ldarg, 65535),
        Insn::int(ExtendedOpcode::Stloc, 1000),
    ]);
}

#[test]
fn branches_and_switch() {
    assert_roundtrip(&[
        Insn::new(Opcode::Ldarg0),
        Insn::switch(vec![Label(3), Label(4), Label(0)]),
        Insn::branch(Opcode::BrS, Label(4)),
        Insn::new(Opcode::Nop),
        Insn::branch(Opcode::Leave, Label(5)),
        Insn::new(Opcode::Ret),
    ]);
}

#[test]
fn out_of_range_immediate_is_rejected() {
    let err = encode(&[Insn::int(Opcode::LdcI4S, 128)]).unwrap_err();
    assert!(matches!(
        err,
        EncodeError::ImmediateOutOfRange { index: 0, value: 128 }
    ));
    let err = encode(&[Insn::int(Opcode::StargS, -1)]).unwrap_err();
    assert!(matches!(err, EncodeError::ImmediateOutOfRange { .. }));
}

#[test]
fn label_out_of_bounds_is_rejected() {
    let err = encode(&[Insn::branch(Opcode::Br, Label(9))]).unwrap_err();
    assert!(matches!(err, EncodeError::LabelOutOfBounds(9, 1)));
}
