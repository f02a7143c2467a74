// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(missing_docs, reason = "integration test crate")]

use std::collections::HashSet;

use model_graph::def::{GraphDef, NodeDef, ValueInfoDef};
use model_graph::dtype::Dtype;
use model_graph::emit::{
    BackendError, CompilerOptions, EmitError, KernelBackend, NvrtcKernel, TvmKernel, emit_model,
};
use model_graph::graph::Graph;
use model_graph::node::{AttrValue, OpKind};
use model_graph::tensor::Tensor;
use model_graph::value::ValueType;
use model_tape::ops::TapeOp;
use model_tape::program::{Operand, RegId, TapeProgram};

fn emit(g: &Graph) -> TapeProgram {
    emit_model(g, &CompilerOptions::default(), None, None).unwrap()
}

fn ops_of(p: &TapeProgram) -> Vec<TapeOp> {
    p.instructions.iter().map(|i| i.op).collect()
}

fn reg_operands(inst: &model_tape::program::Instruction) -> Vec<RegId> {
    let mut regs = Vec::new();
    for op in &inst.inputs {
        match op {
            Operand::Reg(r) if r.is_some() => regs.push(*r),
            Operand::RegList(rs) => regs.extend(rs.iter().copied().filter(|r| r.is_some())),
            _ => {}
        }
    }
    regs
}

/// Walks a program in linear order and asserts that no freed register is
/// referenced again before being rewritten, and that no register is freed
/// twice in a row.
fn check_register_lifetimes(p: &TapeProgram) {
    let mut freed: HashSet<RegId> = HashSet::new();
    for (at, inst) in p.instructions.iter().enumerate() {
        let regs = reg_operands(inst);
        match inst.op {
            TapeOp::Jmp => {}
            TapeOp::Free => {
                let target = regs[0];
                assert!(
                    freed.insert(target),
                    "instruction {at}: double free of {target}"
                );
            }
            TapeOp::Out | TapeOp::JmpTrue | TapeOp::JmpFalse | TapeOp::Print => {
                for r in regs {
                    assert!(!freed.contains(&r), "instruction {at}: {r} read after free");
                }
            }
            TapeOp::SequenceAppend => {
                // Mutates the sequence in place: both operands must be live.
                for r in regs {
                    assert!(!freed.contains(&r), "instruction {at}: {r} read after free");
                }
            }
            _ => {
                // First register operand is the destination (a rewrite
                // re-allocates a freed id); the rest are sources.
                let mut it = regs.into_iter();
                if let Some(dst) = it.next() {
                    freed.remove(&dst);
                }
                for r in it {
                    assert!(!freed.contains(&r), "instruction {at}: {r} read after free");
                }
            }
        }
    }
}

fn scheduled(mut g: Graph) -> Graph {
    g.schedule();
    g
}

#[test]
fn identity_function_emits_the_canonical_shape() {
    let mut g = Graph::new("identity");
    let x = g.add_input_value("x", ValueType::unknown());
    let y = g.add_output_value("y", ValueType::unknown());
    g.add_node(OpKind::Identity, &[x], &[y], "");
    let g = scheduled(g);

    let p = emit(&g);
    assert_eq!(
        ops_of(&p),
        vec![
            TapeOp::In,
            TapeOp::Identity,
            TapeOp::Free,
            TapeOp::Out,
            TapeOp::Free,
        ]
    );
    let x_reg = p.instructions[0].inputs[0].as_reg().unwrap();
    let y_reg = p.instructions[1].inputs[0].as_reg().unwrap();
    assert_eq!(p.instructions[1].inputs[1].as_reg(), Some(x_reg));
    assert_eq!(p.instructions[2].inputs[0].as_reg(), Some(x_reg));
    assert_eq!(p.instructions[3].inputs[1].as_reg(), Some(y_reg));
    assert_eq!(p.instructions[4].inputs[0].as_reg(), Some(y_reg));
    check_register_lifetimes(&p);
}

#[test]
fn duplicate_named_output_round_trips_through_an_identity() {
    let def = GraphDef {
        name: "dup".into(),
        inputs: vec![ValueInfoDef::new("x", ValueType::unknown())],
        outputs: vec![ValueInfoDef::new("y", ValueType::unknown())],
        value_infos: vec![ValueInfoDef::new("y", ValueType::unknown())],
        nodes: vec![NodeDef {
            op_type: "Relu".into(),
            inputs: vec!["x".into()],
            outputs: vec!["y".into()],
            ..NodeDef::default()
        }],
        ..GraphDef::default()
    };
    let g = scheduled(Graph::from_def(&def).unwrap());

    let p = emit(&g);
    let ops = ops_of(&p);
    assert!(ops.contains(&TapeOp::Relu));
    assert!(ops.contains(&TapeOp::Identity));
    // The declared output is written exactly once, by the identity bridge.
    assert_eq!(
        p.instructions
            .iter()
            .filter(|i| i.op == TapeOp::Out)
            .count(),
        1
    );
    check_register_lifetimes(&p);

    // The identity survives a def round-trip.
    let d1 = g.to_def();
    let g2 = Graph::from_def(&d1).unwrap();
    assert_eq!(d1, g2.to_def());
}

#[test]
fn max_pool_allocates_and_frees_a_workspace_register() {
    let mut g = Graph::new("pool");
    let x = g.add_input_value("x", ValueType::unknown());
    let y = g.add_output_value("y", ValueType::unknown());
    let n = g.add_node(OpKind::MaxPool, &[x], &[y], "");
    g.node_mut(n)
        .set_attr("kernel_shape", AttrValue::Ints(vec![2, 2]));
    let g = scheduled(g);

    let p = emit(&g);
    let at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::MaxPool)
        .unwrap();
    let workspace = p.instructions[at].inputs[1].as_reg().unwrap();
    assert_eq!(p.instructions[at + 1].op, TapeOp::Free);
    assert_eq!(p.instructions[at + 1].inputs[0].as_reg(), Some(workspace));
    check_register_lifetimes(&p);
}

fn branch_body(name: &str) -> Graph {
    let mut b = Graph::new(name);
    let i = b.add_input_value(&format!("{name}_in"), ValueType::unknown());
    let o = b.add_output_value(&format!("{name}_out"), ValueType::unknown());
    b.add_node(OpKind::Identity, &[i], &[o], "");
    b.schedule();
    b
}

#[test]
fn if_lowering_threads_jumps_and_writes_outputs_in_both_branches() {
    let mut g = Graph::new("branchy");
    let cond = g.add_input_value("cond", ValueType::unknown());
    let x = g.add_input_value("x", ValueType::unknown());
    let out = g.add_output_value("out", ValueType::unknown());
    let n = g.add_node(OpKind::If, &[cond, x], &[out], "");
    g.node_mut(n).set_then_branch(branch_body("then"));
    g.node_mut(n).set_else_branch(branch_body("else"));
    let g = scheduled(g);

    let p = emit(&g);
    check_register_lifetimes(&p);

    let jmp_true_at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::JmpTrue)
        .unwrap();
    let jmp_at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::Jmp)
        .unwrap();
    assert!(jmp_true_at < jmp_at);

    // JmpTrue lands exactly past the unconditional Jmp that closes the else
    // branch; the Jmp lands past the final then-branch instruction.
    let then_start = p.instructions[jmp_true_at].inputs[1].as_int().unwrap() as usize;
    assert_eq!(then_start, jmp_at + 1);
    let done = p.instructions[jmp_at].inputs[0].as_int().unwrap() as usize;

    // Both branches write the outer output register exactly once.
    let out_inst = p.instructions.iter().find(|i| i.op == TapeOp::Out).unwrap();
    let out_reg = out_inst.inputs[1].as_reg().unwrap();
    let writes_in = |lo: usize, hi: usize| {
        p.instructions[lo..hi]
            .iter()
            .filter(|i| i.op == TapeOp::Identity && i.inputs[0].as_reg() == Some(out_reg))
            .count()
    };
    assert_eq!(writes_in(jmp_true_at + 1, jmp_at), 1, "else writes out once");
    assert_eq!(writes_in(then_start, done), 1, "then writes out once");
}

fn counting_loop_body() -> Graph {
    let mut b = Graph::new("body");
    let _iter = b.add_input_value("iter", ValueType::unknown());
    let _cond = b.add_input_value("cond_in", ValueType::unknown());
    let s_in = b.add_input_value("s_in", ValueType::unknown());
    let cond_out = b.add_output_value("cond_out", ValueType::unknown());
    let s_out = b.add_output_value("s_out", ValueType::unknown());
    let one = b.add_temp_value("one", ValueType::unknown());

    let c_true = b.add_node(OpKind::Constant, &[], &[cond_out], "");
    b.node_mut(c_true).set_attr(
        "value",
        AttrValue::Tensor(Tensor::new("t", Dtype::Bool, vec![], vec![1]).unwrap()),
    );
    let c_one = b.add_node(OpKind::Constant, &[], &[one], "");
    b.node_mut(c_one).set_attr(
        "value",
        AttrValue::Tensor(Tensor::from_i64s("one", vec![], &[1]).unwrap()),
    );
    b.add_node(OpKind::Add, &[s_in, one], &[s_out], "");
    b.schedule();
    b
}

#[test]
fn loop_lowering_guards_entry_and_jumps_back() {
    let mut g = Graph::new("counter");
    let max = g.add_input_value("max", ValueType::unknown());
    let no_term = g.add_null_value();
    let s0 = g.add_input_value("s0", ValueType::unknown());
    let s_final = g.add_output_value("s_final", ValueType::unknown());
    let n = g.add_node(OpKind::Loop, &[max, no_term, s0], &[s_final], "");
    g.node_mut(n).set_body(counting_loop_body());
    let g = scheduled(g);

    let p = emit(&g);
    check_register_lifetimes(&p);

    // One guarded entry: `max > 0` feeds a JmpFalse that skips the body.
    let jmp_false_at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::JmpFalse)
        .unwrap();
    let back_at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::JmpTrue)
        .unwrap();
    assert!(jmp_false_at < back_at);

    // The back edge targets the first body instruction, right past the
    // guard; the guard skips to right past the back edge.
    let loop_begin = p.instructions[back_at].inputs[1].as_int().unwrap() as usize;
    assert_eq!(loop_begin, jmp_false_at + 1);
    let loop_end = p.instructions[jmp_false_at].inputs[1].as_int().unwrap() as usize;
    assert_eq!(loop_end, back_at + 1);

    // The final state is moved into the declared output and emitted.
    let out_inst = p.instructions.iter().find(|i| i.op == TapeOp::Out).unwrap();
    assert_eq!(out_inst.inputs[0], Operand::Str("s_final".into()));
    let out_reg = out_inst.inputs[1].as_reg().unwrap();
    assert!(p.instructions[loop_end..].iter().any(
        |i| i.op == TapeOp::Identity && i.inputs[0].as_reg() == Some(out_reg)
    ));
}

#[test]
fn loop_with_both_trip_count_and_condition_combines_the_guard() {
    let mut g = Graph::new("guarded");
    let max = g.add_input_value("max", ValueType::unknown());
    let term = g.add_input_value("term", ValueType::unknown());
    let s0 = g.add_input_value("s0", ValueType::unknown());
    let s_final = g.add_output_value("s_final", ValueType::unknown());
    let n = g.add_node(OpKind::Loop, &[max, term, s0], &[s_final], "");
    g.node_mut(n).set_body(counting_loop_body());
    let g = scheduled(g);

    let p = emit(&g);
    check_register_lifetimes(&p);
    // Guard = (max > 0) * term, then JmpFalse.
    let jmp_false_at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::JmpFalse)
        .unwrap();
    assert!(
        p.instructions[..jmp_false_at]
            .iter()
            .any(|i| i.op == TapeOp::Mul)
    );
    // The in-loop recomputation multiplies `max > iter` into the body
    // condition as well.
    let back_at = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::JmpTrue)
        .unwrap();
    assert!(
        p.instructions[jmp_false_at + 1..back_at]
            .iter()
            .any(|i| i.op == TapeOp::Mul)
    );
}

#[test]
fn infinite_loop_is_rejected() {
    let mut g = Graph::new("forever");
    let no_max = g.add_null_value();
    let no_term = g.add_null_value();
    let s0 = g.add_input_value("s0", ValueType::unknown());
    let s_final = g.add_output_value("s_final", ValueType::unknown());
    let n = g.add_node(OpKind::Loop, &[no_max, no_term, s0], &[s_final], "");
    g.node_mut(n).set_body(counting_loop_body());
    let g = scheduled(g);

    assert!(matches!(
        emit_model(&g, &CompilerOptions::default(), None, None).unwrap_err(),
        EmitError::InfiniteLoop { .. }
    ));
}

#[test]
fn scan_outputs_accumulate_into_a_stacked_sequence() {
    // Body emits one scan output alongside the state.
    let mut b = Graph::new("body");
    let _iter = b.add_input_value("iter", ValueType::unknown());
    let _cond = b.add_input_value("cond_in", ValueType::unknown());
    let s_in = b.add_input_value("s_in", ValueType::unknown());
    let cond_out = b.add_output_value("cond_out", ValueType::unknown());
    let s_out = b.add_output_value("s_out", ValueType::unknown());
    let scan = b.add_output_value("scan", ValueType::unknown());
    let c_true = b.add_node(OpKind::Constant, &[], &[cond_out], "");
    b.node_mut(c_true).set_attr(
        "value",
        AttrValue::Tensor(Tensor::new("t", Dtype::Bool, vec![], vec![1]).unwrap()),
    );
    b.add_node(OpKind::Identity, &[s_in], &[s_out], "");
    b.add_node(OpKind::Relu, &[s_in], &[scan], "");
    b.schedule();

    let mut g = Graph::new("scanner");
    let max = g.add_input_value("max", ValueType::unknown());
    let no_term = g.add_null_value();
    let s0 = g.add_input_value("s0", ValueType::unknown());
    let s_final = g.add_output_value("s_final", ValueType::unknown());
    let scans = g.add_output_value("scans", ValueType::sequence());
    let n = g.add_node(OpKind::Loop, &[max, no_term, s0], &[s_final, scans], "");
    g.node_mut(n).set_attr("stack_axis", AttrValue::Int(1));
    g.node_mut(n).set_body(b);
    let g = scheduled(g);

    let p = emit(&g);
    check_register_lifetimes(&p);
    let ops = ops_of(&p);
    assert!(ops.contains(&TapeOp::SequenceCreate));
    assert!(ops.contains(&TapeOp::SequenceAppend));
    let stack = p
        .instructions
        .iter()
        .find(|i| i.op == TapeOp::SequenceStack)
        .unwrap();
    assert_eq!(stack.inputs[2], Operand::Int(1));
}

#[test]
fn sequence_append_fast_path_depends_on_user_count() {
    let mut g = Graph::new("seq");
    let seq = g.add_input_value("seq", ValueType::sequence());
    let item = g.add_input_value("item", ValueType::unknown());
    let out = g.add_output_value("out", ValueType::sequence());
    g.add_node(OpKind::SequenceAppend, &[seq, item], &[out], "");
    let g = scheduled(g);
    let single = emit(&g);
    assert!(ops_of(&single).contains(&TapeOp::SequenceMove));
    check_register_lifetimes(&single);

    let mut g = Graph::new("seq2");
    let seq = g.add_input_value("seq", ValueType::sequence());
    let item = g.add_input_value("item", ValueType::unknown());
    let out = g.add_output_value("out", ValueType::sequence());
    let size = g.add_output_value("size", ValueType::unknown());
    g.add_node(OpKind::SequenceAppend, &[seq, item], &[out], "");
    g.add_node(OpKind::SequenceSize, &[seq], &[size], "");
    let g = scheduled(g);
    let shared = emit(&g);
    assert!(ops_of(&shared).contains(&TapeOp::SequenceCopy));
    check_register_lifetimes(&shared);
}

struct FakeBackend {
    tvm_calls: usize,
    nvrtc_calls: usize,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            tvm_calls: 0,
            nvrtc_calls: 0,
        }
    }
}

impl KernelBackend for FakeBackend {
    fn build_tvm(&mut self, _body: &Graph, group_id: i64) -> Result<TvmKernel, BackendError> {
        self.tvm_calls += 1;
        Ok(TvmKernel {
            library_path: format!("/tmp/fusion_{group_id}.so"),
            entry_point: format!("fused_{group_id}"),
        })
    }

    fn build_nvrtc(&mut self, _body: &Graph, group_id: i64) -> Result<NvrtcKernel, BackendError> {
        self.nvrtc_calls += 1;
        Ok(NvrtcKernel {
            source: format!("__global__ void fused_{group_id}() {{}}"),
        })
    }
}

fn fusion_graph(fusion_type: &str) -> Graph {
    let mut body = Graph::new("fused_body");
    let bx = body.add_input_value("bx", ValueType::unknown());
    let by = body.add_output_value("by", ValueType::unknown());
    body.add_node(OpKind::Relu, &[bx], &[by], "");
    body.schedule();

    let mut g = Graph::new("fusion");
    let x = g.add_input_value("x", ValueType::unknown());
    let y = g.add_output_value("y", ValueType::tensor(Dtype::Float32, vec![2, 3]));
    let n = g.add_node(OpKind::FusionGroup, &[x], &[y], "");
    g.node_mut(n)
        .set_attr("fusion_type", AttrValue::Str(fusion_type.into()));
    g.node_mut(n).set_attr("fusion_group_id", AttrValue::Int(7));
    g.node_mut(n).set_subgraph(body);
    scheduled(g)
}

#[test]
fn fusion_group_inlines_without_a_backend_flag() {
    let g = fusion_graph("tvm");
    let p = emit(&g); // use_tvm is off: the body is inlined
    let ops = ops_of(&p);
    assert!(ops.contains(&TapeOp::Relu));
    assert!(!ops.contains(&TapeOp::Tvm));
    check_register_lifetimes(&p);
}

#[test]
fn fusion_group_delegates_to_tvm_backend() {
    let g = fusion_graph("tvm");
    let opts = CompilerOptions {
        use_tvm: true,
        ..CompilerOptions::default()
    };
    let mut backend = FakeBackend::new();
    let p = emit_model(&g, &opts, Some(&mut backend), None).unwrap();
    assert_eq!(backend.tvm_calls, 1);

    let tvm = p.instructions.iter().find(|i| i.op == TapeOp::Tvm).unwrap();
    assert_eq!(tvm.inputs[3], Operand::Str("/tmp/fusion_7.so".into()));
    assert_eq!(tvm.inputs[4], Operand::Str("fused_7".into()));
    assert_eq!(tvm.inputs[5], Operand::Shape(vec![2, 3]));
    assert!(!ops_of(&p).contains(&TapeOp::Relu), "body is not inlined");
    check_register_lifetimes(&p);
}

#[test]
fn fusion_group_delegates_to_nvrtc_backend() {
    let g = fusion_graph("nvrtc");
    let opts = CompilerOptions {
        use_nvrtc: true,
        ..CompilerOptions::default()
    };
    let mut backend = FakeBackend::new();
    let p = emit_model(&g, &opts, Some(&mut backend), None).unwrap();
    assert_eq!(backend.nvrtc_calls, 1);

    let k = p
        .instructions
        .iter()
        .find(|i| i.op == TapeOp::ElementWiseNvrtc)
        .unwrap();
    assert_eq!(
        k.inputs[3],
        Operand::Str("__global__ void fused_7() {}".into())
    );
    assert_eq!(k.inputs[4], Operand::Int(7));
    check_register_lifetimes(&p);
}

#[test]
fn fusion_backend_flag_without_backend_is_an_error() {
    let g = fusion_graph("tvm");
    let opts = CompilerOptions {
        use_tvm: true,
        ..CompilerOptions::default()
    };
    assert!(matches!(
        emit_model(&g, &opts, None, None).unwrap_err(),
        EmitError::MissingBackend { .. }
    ));
}

#[test]
fn every_declared_output_is_emitted_exactly_once_at_the_tail() {
    let mut g = Graph::new("multi");
    let x = g.add_input_value("x", ValueType::unknown());
    let y0 = g.add_output_value("y0", ValueType::unknown());
    let y1 = g.add_output_value("y1", ValueType::unknown());
    g.add_node(OpKind::Relu, &[x], &[y0], "");
    g.add_node(OpKind::Neg, &[x], &[y1], "");
    let g = scheduled(g);

    let p = emit(&g);
    check_register_lifetimes(&p);
    let outs: Vec<&str> = p
        .instructions
        .iter()
        .filter(|i| i.op == TapeOp::Out)
        .map(|i| match &i.inputs[0] {
            Operand::Str(s) => s.as_str(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(outs, vec!["y0", "y1"]);
    // Nothing but frees may follow the first Out.
    let first_out = p
        .instructions
        .iter()
        .position(|i| i.op == TapeOp::Out)
        .unwrap();
    assert!(
        p.instructions[first_out..]
            .iter()
            .all(|i| matches!(i.op, TapeOp::Out | TapeOp::Free))
    );
}

#[test]
fn housekeeping_instructions_carry_line_tags() {
    let mut g = Graph::new("tags");
    let x = g.add_input_value("x", ValueType::unknown());
    let y = g.add_output_value("y", ValueType::unknown());
    g.add_node(OpKind::Relu, &[x], &[y], "");
    let g = scheduled(g);

    let p = emit(&g);
    for inst in p.instructions.iter().filter(|i| i.op == TapeOp::Free) {
        assert!(
            inst.debug_info.contains('@'),
            "free instructions are tagged with their emitting line"
        );
        assert_eq!(inst.id, -1);
    }
    // Lowered compute instructions carry the node's schedule order.
    let relu = p.instructions.iter().find(|i| i.op == TapeOp::Relu).unwrap();
    assert_eq!(relu.id, 0);
}
