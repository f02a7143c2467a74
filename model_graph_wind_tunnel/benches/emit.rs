// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Emission throughput over a synthetic MLP graph.

use criterion::{Criterion, criterion_group, criterion_main};

use model_graph::emit::{CompilerOptions, emit_model};
use model_graph::graph::Graph;
use model_graph::node::OpKind;
use model_graph::value::ValueType;

fn mlp_graph(layers: usize) -> Graph {
    let mut g = Graph::new("mlp");
    let mut cur = g.add_input_value("x", ValueType::unknown());
    for layer in 0..layers {
        let w = g.add_input_value(&format!("w{layer}"), ValueType::unknown());
        let b = g.add_input_value(&format!("b{layer}"), ValueType::unknown());
        let mm = g.add_temp_value(&format!("mm{layer}"), ValueType::unknown());
        let sum = g.add_temp_value(&format!("sum{layer}"), ValueType::unknown());
        let act = if layer + 1 == layers {
            g.add_output_value("y", ValueType::unknown())
        } else {
            g.add_temp_value(&format!("act{layer}"), ValueType::unknown())
        };
        g.add_node(OpKind::MatMul, &[cur, w], &[mm], "");
        g.add_node(OpKind::Add, &[mm, b], &[sum], "");
        g.add_node(OpKind::Relu, &[sum], &[act], "");
        cur = act;
    }
    g.schedule();
    g
}

fn bench_emit(c: &mut Criterion) {
    let opts = CompilerOptions::default();
    for layers in [4_usize, 64] {
        let graph = mlp_graph(layers);
        c.bench_function(&format!("emit_mlp_{layers}_layers"), |b| {
            b.iter(|| {
                let program = emit_model(&graph, &opts, None, None).unwrap();
                std::hint::black_box(program.len())
            });
        });
    }
}

criterion_group!(benches, bench_emit);
criterion_main!(benches);
