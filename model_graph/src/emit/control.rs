// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Control-flow lowering: `FusionGroup`, `If`, and `Loop` expand into flat
//! jump-threaded instructions.
//!
//! Branch and loop bodies share the session's register namespace; their
//! inputs are seeded with `Identity` copies from the outer registers and
//! freed at scope exit, so body-local register lifetimes never escape the
//! construct. Jump targets are labels resolved to absolute instruction
//! indices when the builder finishes.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use model_tape::ops::TapeOp;
use model_tape::program::{Operand, RegId};

use super::lower::{int, reg, regs, shape, string};
use crate::dtype::Dtype;
use crate::emit::{EmitError, Emitter};
use crate::graph::Graph;
use crate::node::Node;

impl Emitter<'_> {
    /// Pushes a control-flow instruction tagged `"{debug} @{line}"`.
    fn emit_cf(&mut self, debug: &str, id: i64, op: TapeOp, inputs: Vec<Operand>, line: u32) {
        self.b.push(op, inputs);
        self.b.note_last(format!("{debug} @{line}"), id);
    }

    /// `Identity dst, src` followed by a free of `src`.
    fn move_reg(&mut self, debug: &str, id: i64, dst: RegId, src: RegId, line: u32) {
        self.emit_cf(debug, id, TapeOp::Identity, vec![reg(dst), reg(src)], line);
        self.emit_free(src, line);
    }

    fn fusion_group_summary(&self, node: &Node, body: &Graph) -> String {
        let mut ops: Vec<&str> = Vec::new();
        for id in body.live_nodes() {
            ops.push(body.node(id).op().as_str());
        }
        format!("{} ({})", node.summary(), ops.join("+"))
    }

    pub(crate) fn emit_fusion_group(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        let body = node.subgraph().ok_or(EmitError::BadAttr {
            node: node.name().into(),
            detail: "fusion group carries no body graph",
        })?;
        if node.inputs().len() != body.input_values().len()
            || node.outputs().len() != body.output_values().len()
        {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "fusion body arity must match the group node",
            });
        }
        let debug = node.summary();
        let order = node.order();
        let group_id = node.int_or("fusion_group_id", 0);

        if self.opts.use_tvm && node.fusion_type() == "tvm" {
            let Some(backend) = self.backend.as_deref_mut() else {
                return Err(EmitError::MissingBackend {
                    node: node.name().into(),
                });
            };
            let kernel = backend.build_tvm(body, group_id)?;
            let summary = self.fusion_group_summary(node, body);
            self.log_line(&format!(
                "fusion group (TVM) {summary} => {}",
                kernel.library_path
            ));

            if node.outputs().len() != 1 {
                return Err(EmitError::Arity {
                    op: node.op(),
                    detail: "TVM lowering supports a single output",
                });
            }
            let mut inputs = Vec::with_capacity(node.inputs().len());
            for &v in node.inputs() {
                inputs.push(self.value_reg(g, v)?);
            }
            let mut outputs = Vec::with_capacity(node.outputs().len());
            for &v in node.outputs() {
                outputs.push(self.value_reg(g, v)?);
            }
            let out_shape = g
                .value(node.outputs()[0])
                .ty()
                .dims
                .clone()
                .unwrap_or_default();
            let num_outputs = i64::try_from(outputs.len()).unwrap_or(i64::MAX);
            self.emit_cf(
                &debug,
                order,
                TapeOp::Tvm,
                vec![
                    regs(outputs),
                    regs(inputs),
                    int(num_outputs),
                    string(&kernel.library_path),
                    string(&kernel.entry_point),
                    shape(out_shape),
                ],
                line!(),
            );
            return Ok(());
        }

        if self.opts.use_nvrtc && node.fusion_type() == "nvrtc" {
            let Some(backend) = self.backend.as_deref_mut() else {
                return Err(EmitError::MissingBackend {
                    node: node.name().into(),
                });
            };
            let kernel = backend.build_nvrtc(body, group_id)?;
            let summary = self.fusion_group_summary(node, body);
            self.log_line(&format!("fusion group (NVRTC) {summary}"));
            self.log_line(&kernel.source);

            let mut inputs = Vec::with_capacity(node.inputs().len());
            for &v in node.inputs() {
                inputs.push(self.value_reg(g, v)?);
            }
            let mut outputs = Vec::with_capacity(node.outputs().len());
            for &v in node.outputs() {
                outputs.push(self.value_reg(g, v)?);
            }
            let num_outputs = i64::try_from(outputs.len()).unwrap_or(i64::MAX);
            self.emit_cf(
                &debug,
                order,
                TapeOp::ElementWiseNvrtc,
                vec![
                    regs(outputs),
                    regs(inputs),
                    int(num_outputs),
                    string(&kernel.source),
                    int(group_id),
                ],
                line!(),
            );
            return Ok(());
        }

        // Inline expansion: copy outer inputs into the body registers, emit
        // the body, then move body outputs into the outer outputs.
        self.assign_graph_value_ids(body)?;

        for i in 0..node.inputs().len() {
            let from = self.value_reg(g, node.inputs()[i])?;
            let to = self.value_reg(body, body.input_values()[i])?;
            self.emit_cf(&debug, order, TapeOp::Identity, vec![reg(to), reg(from)], line!());
        }

        self.emit_graph(body, true, body.output_values())?;

        for &v in body.input_values() {
            let r = self.value_reg(body, v)?;
            self.emit_free(r, line!());
        }
        for i in 0..node.outputs().len() {
            let from = body.output_values()[i];
            let to = self.value_reg(g, node.outputs()[i])?;
            if body.value(from).is_null() {
                self.emit_cf(&debug, order, TapeOp::NullConstant, vec![reg(to)], line!());
            } else {
                let from = self.value_reg(body, from)?;
                self.move_reg(&debug, order, to, from, line!());
            }
        }
        Ok(())
    }

    pub(crate) fn emit_if(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        let then_body = node.then_branch().ok_or(EmitError::BadAttr {
            node: node.name().into(),
            detail: "If carries no then branch",
        })?;
        let else_body = node.else_branch().ok_or(EmitError::BadAttr {
            node: node.name().into(),
            detail: "If carries no else branch",
        })?;
        self.assign_graph_value_ids(then_body)?;
        self.assign_graph_value_ids(else_body)?;

        if node.inputs().len() != then_body.input_values().len() + 1
            || node.inputs().len() != else_body.input_values().len() + 1
        {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "branch inputs must be the If inputs minus the condition",
            });
        }
        if node.outputs().len() != then_body.output_values().len()
            || node.outputs().len() != else_body.output_values().len()
        {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "branch outputs must match the If outputs",
            });
        }

        let debug = node.summary();
        let order = node.order();
        let cond = self.value_reg(g, node.inputs()[0])?;

        let l_then = self.b.label();
        let l_done = self.b.label();

        self.b.jmp_true(cond, l_then);
        self.b.note_last(format!("{debug} @{}", line!()), order);

        self.emit_if_branch(g, node, else_body, &debug, order)?;

        self.b.jmp(l_done);
        self.b.note_last(format!("{debug} @{}", line!()), order);

        self.b.place(l_then)?;
        self.emit_if_branch(g, node, then_body, &debug, order)?;
        self.b.place(l_done)?;
        Ok(())
    }

    fn emit_if_branch(
        &mut self,
        g: &Graph,
        node: &Node,
        branch: &Graph,
        debug: &str,
        order: i64,
    ) -> Result<(), EmitError> {
        for i in 0..branch.input_values().len() {
            let from = self.value_reg(g, node.inputs()[i + 1])?;
            let to = self.value_reg(branch, branch.input_values()[i])?;
            self.emit_cf(debug, order, TapeOp::Identity, vec![reg(to), reg(from)], line!());
        }
        self.emit_graph(branch, true, branch.output_values())?;
        for &v in branch.input_values() {
            let r = self.value_reg(branch, v)?;
            self.emit_free(r, line!());
        }
        for i in 0..node.outputs().len() {
            let from = branch.output_values()[i];
            let to = self.value_reg(g, node.outputs()[i])?;
            if branch.value(from).is_null() {
                self.emit_cf(debug, order, TapeOp::NullConstant, vec![reg(to)], line!());
            } else {
                let from = self.value_reg(branch, from)?;
                self.move_reg(debug, order, to, from, line!());
            }
        }
        Ok(())
    }

    pub(crate) fn emit_loop(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        let body = node.body().ok_or(EmitError::BadAttr {
            node: node.name().into(),
            detail: "Loop carries no body graph",
        })?;

        let num_loop_inputs = node.inputs().len();
        let num_loop_outputs = node.outputs().len();
        let num_body_inputs = body.input_values().len();
        let num_body_outputs = body.output_values().len();
        if num_loop_inputs < 2 {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "expects a max trip count and a terminal condition",
            });
        }
        let num_states = num_loop_inputs - 2;
        if num_body_inputs != num_states + 2 {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "body inputs must be iteration, condition, then states",
            });
        }
        if num_body_outputs < num_states + 1 {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "body outputs must cover the condition and every state",
            });
        }
        let num_scans = num_body_outputs - 1 - num_states;
        if num_loop_outputs != num_states + num_scans {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "loop outputs must cover states and scan outputs",
            });
        }

        let max_trip_is_null = g.value(node.inputs()[0]).is_null();
        let terminal_is_null = g.value(node.inputs()[1]).is_null();
        if max_trip_is_null && terminal_is_null {
            return Err(EmitError::InfiniteLoop {
                node: node.name().into(),
            });
        }

        self.assign_graph_value_ids(body)?;
        let debug = node.summary();

        // Initialize loop variables.
        let iter_id = self.value_reg(body, body.input_values()[0])?;
        self.emit_cf(
            &debug,
            -1,
            TapeOp::IntScalarConstant,
            vec![reg(iter_id), int(0), int(Dtype::Int64.code()), int(1)],
            line!(),
        );
        let cond_id = self.value_reg(body, body.input_values()[1])?;
        self.emit_cf(
            &debug,
            -1,
            TapeOp::IntScalarConstant,
            vec![reg(cond_id), int(1), int(Dtype::Bool.code()), int(1)],
            line!(),
        );
        for i in 0..num_states {
            let from = self.value_reg(g, node.inputs()[i + 2])?;
            let to = self.value_reg(body, body.input_values()[i + 2])?;
            self.emit_cf(&debug, -1, TapeOp::Identity, vec![reg(to), reg(from)], line!());
        }

        // Temporary sequences accumulate scan outputs.
        let mut scan_out_ids: Vec<RegId> = Vec::with_capacity(num_scans);
        for _ in 0..num_scans {
            let id = self.alloc_reg();
            self.emit_cf(&debug, -1, TapeOp::SequenceCreate, vec![reg(id)], line!());
            scan_out_ids.push(id);
        }

        // Pre-loop guard: skip the whole loop when it would run zero times.
        let mut skip_cond: Option<RegId> = None;
        if !max_trip_is_null {
            let zero_id = self.alloc_reg();
            let guard_id = self.alloc_reg();
            self.emit_cf(
                &debug,
                -1,
                TapeOp::IntScalarConstant,
                vec![reg(zero_id), int(0), int(Dtype::Int64.code()), int(1)],
                line!(),
            );
            let max_reg = self.value_reg(g, node.inputs()[0])?;
            self.emit_cf(
                &debug,
                -1,
                TapeOp::Greater,
                vec![reg(guard_id), reg(max_reg), reg(zero_id)],
                line!(),
            );
            self.emit_free(zero_id, line!());
            skip_cond = Some(guard_id);
        }
        if !terminal_is_null {
            let term_reg = self.value_reg(g, node.inputs()[1])?;
            let tmp_id = self.alloc_reg();
            if let Some(guard_id) = skip_cond {
                self.emit_cf(
                    &debug,
                    -1,
                    TapeOp::Mul,
                    vec![reg(tmp_id), reg(guard_id), reg(term_reg)],
                    line!(),
                );
                self.emit_free(guard_id, line!());
            } else {
                self.emit_cf(
                    &debug,
                    -1,
                    TapeOp::Identity,
                    vec![reg(tmp_id), reg(term_reg)],
                    line!(),
                );
            }
            skip_cond = Some(tmp_id);
        }
        let l_end = self.b.label();
        if let Some(guard_id) = skip_cond {
            self.b.jmp_false(guard_id, l_end);
            self.b.note_last(format!("{debug} @{}", line!()), -1);
        }

        let l_loop = self.b.label();
        self.b.place(l_loop)?;

        self.emit_graph(body, true, body.output_values())?;

        // iter += 1
        let one_id = self.alloc_reg();
        self.emit_cf(
            &debug,
            -1,
            TapeOp::IntScalarConstant,
            vec![reg(one_id), int(1), int(Dtype::Int64.code()), int(1)],
            line!(),
        );
        let tmp_id = self.alloc_reg();
        self.emit_cf(
            &debug,
            -1,
            TapeOp::Add,
            vec![reg(tmp_id), reg(iter_id), reg(one_id)],
            line!(),
        );
        self.emit_free(one_id, line!());
        for &v in body.input_values() {
            let r = self.value_reg(body, v)?;
            self.emit_free(r, line!());
        }
        self.move_reg(&debug, -1, iter_id, tmp_id, line!());
        let body_cond = self.value_reg(body, body.output_values()[0])?;
        self.move_reg(&debug, -1, cond_id, body_cond, line!());

        // Propagate the loop state.
        for i in 0..num_states {
            let body_in = self.value_reg(body, body.input_values()[i + 2])?;
            let body_out = body.output_values()[i + 1];
            if body.value(body_out).is_null() {
                self.emit_cf(&debug, -1, TapeOp::NullConstant, vec![reg(body_in)], line!());
            } else {
                let body_out = self.value_reg(body, body_out)?;
                self.move_reg(&debug, -1, body_in, body_out, line!());
            }
        }

        // Push scan outputs.
        for i in 0..num_scans {
            let body_out = self.value_reg(body, body.output_values()[i + num_states + 1])?;
            self.emit_cf(
                &debug,
                -1,
                TapeOp::SequenceAppend,
                vec![reg(scan_out_ids[i]), reg(body_out)],
                line!(),
            );
            self.emit_free(body_out, line!());
        }

        // Check if the loop finishes. The `tmp` register is reused after its
        // free above; a rewrite counts as re-allocation for the VM.
        if terminal_is_null {
            self.emit_free(cond_id, line!());
            let max_reg = self.value_reg(g, node.inputs()[0])?;
            self.emit_cf(
                &debug,
                -1,
                TapeOp::Greater,
                vec![reg(cond_id), reg(max_reg), reg(iter_id)],
                line!(),
            );
        } else if !max_trip_is_null {
            let max_reg = self.value_reg(g, node.inputs()[0])?;
            self.emit_cf(
                &debug,
                -1,
                TapeOp::Greater,
                vec![reg(tmp_id), reg(max_reg), reg(iter_id)],
                line!(),
            );
            let tmp2_id = self.alloc_reg();
            self.emit_cf(
                &debug,
                -1,
                TapeOp::Mul,
                vec![reg(tmp2_id), reg(cond_id), reg(tmp_id)],
                line!(),
            );
            self.emit_free(cond_id, line!());
            self.move_reg(&debug, -1, cond_id, tmp2_id, line!());
            self.emit_free(tmp_id, line!());
        }
        self.b.jmp_true(cond_id, l_loop);
        self.b.note_last(format!("{debug} @{}", line!()), -1);

        self.b.place(l_end)?;
        if let Some(guard_id) = skip_cond {
            self.emit_free(guard_id, line!());
        }

        // Output final states.
        for i in 0..num_states {
            let body_in = self.value_reg(body, body.input_values()[i + 2])?;
            let loop_out = node.outputs()[i];
            if g.value(loop_out).is_null() {
                self.emit_free(body_in, line!());
            } else {
                let loop_out = self.value_reg(g, loop_out)?;
                self.move_reg(&debug, -1, loop_out, body_in, line!());
            }
        }

        // Stack and output scan outputs.
        let stack_axis = node.int_or("stack_axis", 0);
        for i in 0..num_scans {
            let loop_out = self.value_reg(g, node.outputs()[i + num_states])?;
            self.emit_cf(
                &debug,
                -1,
                TapeOp::SequenceStack,
                vec![reg(loop_out), reg(scan_out_ids[i]), int(stack_axis)],
                line!(),
            );
            self.emit_free(scan_out_ids[i], line!());
        }

        self.emit_free(iter_id, line!());
        self.emit_free(cond_id, line!());
        Ok(())
    }
}
