#![allow(dead_code)]

use cil_ir::{ClrType, FieldTable, MethodInfo, OperationInfo};
use cil_isa::{Insn, encode};
use cil_jit::{OperationLog, compile_method};

/// Assemble `program` into a method with the given parameter and local types.
pub fn method(params: &[ClrType], locals: &[ClrType], program: &[Insn]) -> MethodInfo {
    let (body, _) = encode(program).unwrap();
    MethodInfo::new("test", body)
        .with_parameters(params)
        .with_locals(locals)
}

pub fn run_with(method: &MethodInfo, fields: &FieldTable) -> cil_jit::Result<Vec<OperationInfo>> {
    let mut log = OperationLog::new();
    compile_method(method, fields, &mut log)?;
    Ok(log.into_operations())
}

pub fn run(method: &MethodInfo) -> cil_jit::Result<Vec<OperationInfo>> {
    run_with(method, &FieldTable::new())
}

/// Operand names of an operation's inputs.
pub fn names(op: &OperationInfo) -> Vec<String> {
    op.operands.iter().map(|o| o.name()).collect()
}
