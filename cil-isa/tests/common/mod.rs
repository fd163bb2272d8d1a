use cil_isa::*;

/// Encode `program`, decode the bytes back and check that every instruction
/// comes back with the same opcode, offset and immediate.
pub fn assert_roundtrip(program: &[Insn]) {
    let (bytes, offsets) = encode(program).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.len(), program.len(), "length mismatch");
    for (i, (want, got)) in program.iter().zip(&decoded).enumerate() {
        assert_eq!(got.offset(), offsets[i], "offset mismatch at {i}");
        assert_eq!(want.op().info(), got.info(), "opcode mismatch at {i}");
        match want.immediate() {
            Immediate::None => assert!(got.immediate().is_empty(), "stray immediate at {i}"),
            Immediate::Int(v) => assert_eq!(got.int_param(), Some(*v), "immediate at {i}"),
            Immediate::Float(v) => {
                let back = got.float_param().unwrap();
                assert!((back - v).abs() < 1e-6, "float at {i}: {back} vs {v}");
            }
            Immediate::Label(label) => {
                assert_eq!(
                    got.branch_targets(),
                    vec![offsets[label.0 as usize] as i64],
                    "branch target at {i}"
                );
            }
            Immediate::Switch(labels) => {
                let want: Vec<i64> = labels.iter().map(|l| offsets[l.0 as usize] as i64).collect();
                assert_eq!(got.branch_targets(), want, "switch targets at {i}");
            }
        }
    }
}
