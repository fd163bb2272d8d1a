//! Front end of a method JIT for ECMA-335 CIL.
//!
//! [`compile_method`] decodes a method body, resolves its jump targets
//! ([`targets`]) and then symbolically executes it ([`executor`]), handing
//! one typed, SSA-like [`OperationInfo`](cil_ir::OperationInfo) per
//! instruction to an [`OperationProcessor`].

pub mod error;
pub mod executor;
pub mod processor;
pub mod targets;
pub mod type_lookup;

pub use error::{ErrorKind, JitError, Result};
pub use executor::SymbolicExecutor;
pub use processor::{Listing, OperationLog, OperationProcessor};
pub use targets::JumpTargets;

use cil_ir::{MethodInfo, RuntimeInformation};

/// Run both passes over `method` and feed every operation to `processor`.
///
/// Jump targets are resolved over the whole body before the second pass
/// starts. Returns the number of operations emitted. On error the
/// processor may already have received the operations preceding the
/// failing instruction.
pub fn compile_method(
    method: &MethodInfo,
    runtime: &dyn RuntimeInformation,
    processor: &mut dyn OperationProcessor,
) -> Result<usize> {
    let instructions = cil_isa::decode(&method.body)?;
    let targets = JumpTargets::resolve(&instructions)?;
    log::debug!(
        "{}: {} instructions, {} jump targets",
        method.name,
        instructions.len(),
        targets.len()
    );
    let mut executor = SymbolicExecutor::new(method, runtime, &targets);
    let emitted = executor.run(&instructions, processor)?;
    log::debug!("{}: emitted {emitted} operations", method.name);
    Ok(emitted)
}
