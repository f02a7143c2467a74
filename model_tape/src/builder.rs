// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Program builder ("assembler") for [`TapeProgram`]s.
//!
//! The builder appends instructions and resolves jump targets through labels,
//! so callers never compute instruction indices by hand. A forward jump is
//! emitted with a placeholder operand and a recorded fixup; `finish()` patches
//! every fixup once the label has been placed.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::ops::TapeOp;
use crate::program::{Instruction, Operand, RegId, TapeProgram};

/// A label for jump targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(u32);

/// A label that was referenced but never placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedLabel;

impl fmt::Display for UnresolvedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label was referenced but never placed")
    }
}

impl core::error::Error for UnresolvedLabel {}

#[derive(Clone, Debug)]
struct Fixup {
    /// Instruction index carrying the placeholder.
    at: usize,
    /// Operand position within the instruction.
    input: usize,
    label: Label,
}

/// Append-only builder for [`TapeProgram`]s.
#[derive(Clone, Debug, Default)]
pub struct TapeBuilder {
    instructions: Vec<Instruction>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
}

impl TapeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of instructions appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if no instruction has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the index the next pushed instruction will occupy.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.instructions.len()
    }

    /// Appends an instruction and returns its index.
    ///
    /// In debug builds the operand list is checked against the op's generated
    /// signature.
    pub fn push(&mut self, op: TapeOp, inputs: Vec<Operand>) -> usize {
        debug_assert!(
            signature_matches(op, &inputs),
            "operand mismatch for {}: got {} operands",
            op.mnemonic(),
            inputs.len(),
        );
        let at = self.instructions.len();
        self.instructions.push(Instruction {
            op,
            inputs,
            debug_info: String::new(),
            id: -1,
        });
        at
    }

    /// Stamps debug info and instruction id onto the most recent instruction.
    pub fn note_last(&mut self, debug_info: impl Into<String>, id: i64) {
        if let Some(inst) = self.instructions.last_mut() {
            inst.debug_info = debug_info.into();
            inst.id = id;
        }
    }

    /// Stamps debug info onto the most recent instruction, keeping its id.
    pub fn tag_last(&mut self, debug_info: impl Into<String>) {
        if let Some(inst) = self.instructions.last_mut() {
            inst.debug_info = debug_info.into();
        }
    }

    /// Allocates a new, unplaced label.
    #[must_use]
    pub fn label(&mut self) -> Label {
        let id = u32::try_from(self.labels.len()).unwrap_or(u32::MAX);
        self.labels.push(None);
        Label(id)
    }

    /// Places `label` at the next instruction index.
    pub fn place(&mut self, label: Label) -> Result<(), UnresolvedLabel> {
        let at = self.next_index();
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .ok_or(UnresolvedLabel)?;
        *slot = Some(at);
        Ok(())
    }

    /// `Jmp target`.
    pub fn jmp(&mut self, target: Label) -> usize {
        let at = self.push(TapeOp::Jmp, alloc::vec![Operand::Int(-1)]);
        self.fixups.push(Fixup {
            at,
            input: 0,
            label: target,
        });
        at
    }

    /// `JmpTrue cond, target`.
    pub fn jmp_true(&mut self, cond: RegId, target: Label) -> usize {
        let at = self.push(
            TapeOp::JmpTrue,
            alloc::vec![Operand::Reg(cond), Operand::Int(-1)],
        );
        self.fixups.push(Fixup {
            at,
            input: 1,
            label: target,
        });
        at
    }

    /// `JmpFalse cond, target`.
    pub fn jmp_false(&mut self, cond: RegId, target: Label) -> usize {
        let at = self.push(
            TapeOp::JmpFalse,
            alloc::vec![Operand::Reg(cond), Operand::Int(-1)],
        );
        self.fixups.push(Fixup {
            at,
            input: 1,
            label: target,
        });
        at
    }

    /// `In dst, "name"`.
    pub fn input(&mut self, dst: RegId, name: &str) -> usize {
        self.push(
            TapeOp::In,
            alloc::vec![Operand::Reg(dst), Operand::Str(name.into())],
        )
    }

    /// `Out "name", src`.
    pub fn output(&mut self, name: &str, src: RegId) -> usize {
        self.push(
            TapeOp::Out,
            alloc::vec![Operand::Str(name.into()), Operand::Reg(src)],
        )
    }

    /// `Free v`.
    pub fn free(&mut self, v: RegId) -> usize {
        self.push(TapeOp::Free, alloc::vec![Operand::Reg(v)])
    }

    /// `Identity dst, src`.
    pub fn identity(&mut self, dst: RegId, src: RegId) -> usize {
        self.push(
            TapeOp::Identity,
            alloc::vec![Operand::Reg(dst), Operand::Reg(src)],
        )
    }

    /// `IntScalarConstant dst, value, dtype, host`.
    pub fn int_scalar_constant(&mut self, dst: RegId, value: i64, dtype: i64, host: bool) -> usize {
        self.push(
            TapeOp::IntScalarConstant,
            alloc::vec![
                Operand::Reg(dst),
                Operand::Int(value),
                Operand::Int(dtype),
                Operand::Int(i64::from(host)),
            ],
        )
    }

    /// Resolves all fixups and returns the finished program.
    pub fn finish(mut self) -> Result<TapeProgram, UnresolvedLabel> {
        for f in &self.fixups {
            let Some(target) = self.labels.get(f.label.0 as usize).copied().flatten() else {
                return Err(UnresolvedLabel);
            };
            let target = i64::try_from(target).map_err(|_| UnresolvedLabel)?;
            let inst = self.instructions.get_mut(f.at).ok_or(UnresolvedLabel)?;
            let slot = inst.inputs.get_mut(f.input).ok_or(UnresolvedLabel)?;
            *slot = Operand::Int(target);
        }
        Ok(TapeProgram {
            instructions: self.instructions,
        })
    }
}

fn signature_matches(op: TapeOp, inputs: &[Operand]) -> bool {
    let sig = op.signature();
    sig.len() == inputs.len()
        && sig
            .iter()
            .zip(inputs)
            .all(|(kind, operand)| operand.kind() == *kind)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::{TapeBuilder, UnresolvedLabel};
    use crate::ops::TapeOp;
    use crate::program::{Operand, RegId};

    #[test]
    fn labels_resolve_to_absolute_indices() {
        let mut b = TapeBuilder::new();
        let l_then = b.label();
        let l_done = b.label();

        b.jmp_true(RegId(1), l_then);
        b.identity(RegId(3), RegId(2));
        b.jmp(l_done);
        b.place(l_then).unwrap();
        b.identity(RegId(3), RegId(1));
        b.place(l_done).unwrap();
        b.free(RegId(1));

        let p = b.finish().unwrap();
        // JmpTrue targets the instruction after the else branch.
        assert_eq!(p.instructions[0].inputs[1], Operand::Int(3));
        // Jmp targets the join point.
        assert_eq!(p.instructions[2].inputs[0], Operand::Int(4));
    }

    #[test]
    fn unplaced_label_fails_finish() {
        let mut b = TapeBuilder::new();
        let l = b.label();
        b.jmp(l);
        assert_eq!(b.finish(), Err(UnresolvedLabel));
    }

    #[test]
    fn label_placed_at_end_resolves_past_last_instruction() {
        let mut b = TapeBuilder::new();
        let l = b.label();
        b.jmp(l);
        b.free(RegId(1));
        b.place(l).unwrap();
        let p = b.finish().unwrap();
        assert_eq!(p.instructions[0].inputs[0], Operand::Int(2));
    }

    #[test]
    fn note_last_stamps_debug_info_and_id() {
        let mut b = TapeBuilder::new();
        b.push(
            TapeOp::Relu,
            vec![Operand::Reg(RegId(2)), Operand::Reg(RegId(1))],
        );
        b.note_last("Relu_gensym_1", 7);
        let p = b.finish().unwrap();
        assert_eq!(p.instructions[0].debug_info, "Relu_gensym_1");
        assert_eq!(p.instructions[0].id, 7);
    }

    #[test]
    #[should_panic(expected = "operand mismatch")]
    fn debug_signature_check_rejects_bad_operands() {
        let mut b = TapeBuilder::new();
        b.push(TapeOp::Free, vec![Operand::Int(1)]);
    }
}
