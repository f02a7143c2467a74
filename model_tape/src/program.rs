// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Program container: instructions, operands, register references.
//!
//! The container is deliberately structural (a flat `Vec` of tagged
//! instructions) rather than byte-encoded; serialization to the VM's wire
//! format is the job of an external layer.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::ops::{OperandKind, TapeOp};

/// A register reference into the VM's value table.
///
/// Real registers are positive; [`RegId::NONE`] (`-1`) denotes an absent
/// optional operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegId(pub i32);

impl RegId {
    /// The "absent operand" register reference.
    pub const NONE: Self = Self(-1);

    /// Returns `true` unless this is [`RegId::NONE`].
    #[must_use]
    pub fn is_some(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_some() {
            write!(f, "${}", self.0)
        } else {
            write!(f, "$-")
        }
    }
}

/// A single instruction operand.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Integer scalar (also used for dtype codes, flags, and jump targets).
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Integer list (axes, pads, strides, widened constant elements).
    IntList(Vec<i64>),
    /// Floating-point list (constant elements).
    FloatList(Vec<f64>),
    /// UTF-8 string (value names, kernel paths, generated source).
    Str(String),
    /// A tensor shape.
    Shape(Vec<i64>),
    /// A register reference; [`RegId::NONE`] encodes an absent slot.
    Reg(RegId),
    /// A variadic register list.
    RegList(Vec<RegId>),
}

impl Operand {
    /// Returns the operand's kind tag.
    #[must_use]
    pub fn kind(&self) -> OperandKind {
        match self {
            Self::Int(_) => OperandKind::Int,
            Self::Float(_) => OperandKind::Float,
            Self::IntList(_) => OperandKind::IntList,
            Self::FloatList(_) => OperandKind::FloatList,
            Self::Str(_) => OperandKind::Str,
            Self::Shape(_) => OperandKind::Shape,
            Self::Reg(_) => OperandKind::Reg,
            Self::RegList(_) => OperandKind::RegList,
        }
    }

    /// Returns the register if this is a `Reg` operand.
    #[must_use]
    pub fn as_reg(&self) -> Option<RegId> {
        match self {
            Self::Reg(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int` operand.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::IntList(vs) => fmt_list(f, vs),
            Self::FloatList(vs) => fmt_list(f, vs),
            Self::Str(s) => write!(f, "\"{}\"", s.escape_default()),
            Self::Shape(dims) => {
                write!(f, "shape")?;
                fmt_list(f, dims)
            }
            Self::Reg(r) => write!(f, "{r}"),
            Self::RegList(rs) => fmt_list(f, rs),
        }
    }
}

fn fmt_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

/// A single tape instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    /// Op mnemonic.
    pub op: TapeOp,
    /// Flat operand list; layout per op is fixed by [`TapeOp::signature`].
    pub inputs: Vec<Operand>,
    /// Free-form debug string (source node summary, value name, or line tag).
    pub debug_info: String,
    /// Schedule order of the source node, or `-1` for housekeeping
    /// instructions inserted by the emitter.
    pub id: i64,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op.mnemonic())?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i == 0 {
                write!(f, " ")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{input}")?;
        }
        if self.id >= 0 {
            write!(f, " ; #{}", self.id)?;
        }
        if !self.debug_info.is_empty() {
            write!(f, " ; {}", self.debug_info)?;
        }
        Ok(())
    }
}

/// An emitted program: a totally ordered instruction list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TapeProgram {
    /// Instructions in execution order.
    pub instructions: Vec<Instruction>,
}

impl TapeProgram {
    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the program has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for TapeProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, inst) in self.instructions.iter().enumerate() {
            writeln!(f, "{i:04}: {inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::{String, ToString};
    use alloc::vec;

    use super::{Instruction, Operand, RegId, TapeProgram};
    use crate::ops::TapeOp;

    #[test]
    fn reg_id_none_is_absent() {
        assert!(!RegId::NONE.is_some());
        assert!(RegId(0).is_some());
        assert_eq!(RegId::NONE.to_string(), "$-");
        assert_eq!(RegId(3).to_string(), "$3");
    }

    #[test]
    fn instruction_display_is_stable() {
        let inst = Instruction {
            op: TapeOp::Conv,
            inputs: vec![
                Operand::Reg(RegId(4)),
                Operand::Reg(RegId(1)),
                Operand::Reg(RegId(2)),
                Operand::Reg(RegId::NONE),
                Operand::IntList(vec![1, 1]),
                Operand::IntList(vec![0, 0]),
            ],
            debug_info: String::from("Conv_gensym_1"),
            id: 2,
        };
        assert_eq!(
            inst.to_string(),
            "Conv $4, $1, $2, $-, [1, 1], [0, 0] ; #2 ; Conv_gensym_1"
        );
    }

    #[test]
    fn program_display_numbers_instructions() {
        let p = TapeProgram {
            instructions: vec![
                Instruction {
                    op: TapeOp::In,
                    inputs: vec![Operand::Reg(RegId(1)), Operand::Str("x".into())],
                    debug_info: String::from("x"),
                    id: -1,
                },
                Instruction {
                    op: TapeOp::Free,
                    inputs: vec![Operand::Reg(RegId(1))],
                    debug_info: String::new(),
                    id: -1,
                },
            ],
        };
        let text = p.to_string();
        assert!(text.starts_with("0000: In $1, \"x\" ; x\n"));
        assert!(text.contains("0001: Free $1"));
    }
}
