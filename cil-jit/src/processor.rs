//! Consumers of the executor's operation stream.

use std::fmt::Write;

use cil_ir::{Operand, OperationInfo};

/// Receives one [`OperationInfo`] per instruction, in logical-index order.
///
/// Processors typically key their own value tables by operand name.
pub trait OperationProcessor {
    fn process(&mut self, op: OperationInfo);
}

impl<P: OperationProcessor + ?Sized> OperationProcessor for &mut P {
    fn process(&mut self, op: OperationInfo) {
        (**self).process(op);
    }
}

/// Collects every operation.
#[derive(Clone, Debug, Default)]
pub struct OperationLog {
    ops: Vec<OperationInfo>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[OperationInfo] {
        &self.ops
    }

    pub fn into_operations(self) -> Vec<OperationInfo> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl OperationProcessor for OperationLog {
    fn process(&mut self, op: OperationInfo) {
        self.ops.push(op);
    }
}

/// Renders operations as a block-structured text listing. A new `BB_<n>`
/// label starts at the entry and at every jump target.
#[derive(Debug, Default)]
pub struct Listing {
    out: String,
    started: bool,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

fn operand_text(operand: &Operand) -> String {
    match operand {
        Operand::BranchTarget { index } => format!("BB_{index}"),
        other => other.to_string(),
    }
}

impl OperationProcessor for Listing {
    fn process(&mut self, op: OperationInfo) {
        if !self.started || op.jump_target {
            let _ = writeln!(self.out, "BB_{}:", op.index);
            self.started = true;
        }
        let mut line = String::from("    ");
        if let Some(result) = &op.result {
            let _ = write!(line, "{result} = ");
        }
        line.push_str(op.mnemonic());
        let operands: Vec<String> = op.operands.iter().map(operand_text).collect();
        if !operands.is_empty() {
            line.push(' ');
            line.push_str(&operands.join(", "));
        }
        let _ = writeln!(self.out, "{line}");
    }
}
