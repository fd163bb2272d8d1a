//! First pass: map branch destinations from byte offsets to logical
//! instruction indices.

use std::collections::{BTreeMap, HashMap};

use cil_isa::{Instruction, OpcodeFlags};

use crate::error::{JitError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// Forward target not reached yet.
    Pending,
    Resolved(usize),
}

/// Jump targets of one method body, keyed by physical offset.
///
/// Besides explicit branch destinations this includes the instruction
/// following every branch (the fall-through edge), so backends that need
/// both successors spelled out find them here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JumpTargets {
    targets: BTreeMap<u32, usize>,
}

impl JumpTargets {
    /// Scan `instructions` once, in physical order.
    pub fn resolve(instructions: &[Instruction<'_>]) -> Result<Self> {
        let mut slots: BTreeMap<i64, Slot> = BTreeMap::new();
        // Every instruction seen so far: physical -> logical.
        let mut logical: HashMap<i64, usize> = HashMap::new();
        let mut after_branch = false;

        for (lindex, insn) in instructions.iter().enumerate() {
            let pindex = insn.offset() as i64;
            logical.insert(pindex, lindex);

            if after_branch || slots.contains_key(&pindex) {
                slots.insert(pindex, Slot::Resolved(lindex));
                after_branch = false;
            }

            if !insn.flags().contains(OpcodeFlags::BRANCH) {
                continue;
            }
            for target in insn.branch_targets() {
                if target <= pindex {
                    let &resolved = logical.get(&target).ok_or(JitError::UnresolvedBranchTarget {
                        offset: insn.offset(),
                        target,
                    })?;
                    slots.insert(target, Slot::Resolved(resolved));
                } else {
                    slots.entry(target).or_insert(Slot::Pending);
                }
            }
            after_branch = true;
        }

        let mut targets = BTreeMap::new();
        for (target, slot) in slots {
            match slot {
                Slot::Resolved(lindex) => {
                    // Resolved entries always come from a decoded offset.
                    targets.insert(target as u32, lindex);
                }
                Slot::Pending => return Err(JitError::PendingBranchTarget { target }),
            }
        }
        log::debug!("resolved {} jump targets", targets.len());
        Ok(JumpTargets { targets })
    }

    /// Logical index of the jump target at `offset`.
    pub fn get(&self, offset: u32) -> Option<usize> {
        self.targets.get(&offset).copied()
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.targets.contains_key(&offset)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// `(offset, logical index)` pairs in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.targets.iter().map(|(&offset, &index)| (offset, index))
    }
}
