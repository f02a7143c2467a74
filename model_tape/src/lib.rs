// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `model_tape`: the linear instruction program ("tape") emitted by the model
//! compiler and consumed by the downstream register VM.
//!
//! A tape is an ordered list of instructions over a small operand vocabulary:
//! register references, scalars, lists, strings, and shapes. Register ids are
//! positive integers naming slots in the VM's value table; `-1` marks an
//! absent optional operand. Jump operands hold absolute instruction indices.
//!
//! ## Example
//!
//! ```no_run
//! extern crate alloc;
//!
//! use model_tape::builder::TapeBuilder;
//! use model_tape::program::RegId;
//!
//! let mut b = TapeBuilder::new();
//! let done = b.label();
//! b.input(RegId(1), "x");
//! b.jmp_true(RegId(1), done);
//! b.free(RegId(1));
//! b.place(done)?;
//! b.output("y", RegId(1));
//! let program = b.finish()?;
//! assert_eq!(program.instructions.len(), 4);
//! # Ok::<(), model_tape::builder::UnresolvedLabel>(())
//! ```

#![no_std]

extern crate alloc;

pub mod builder;
pub mod ops;
pub mod program;
