// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node lowering: one dispatch table from [`OpKind`] to tape
//! instructions.
//!
//! Shaping rules applied uniformly: absent or null optional slots encode
//! register `-1`; declared pads must pair symmetric begins/ends and are
//! halved (defaulting to `[0, 0]`); strides default to `[1, 1]`; RNN
//! directions encode forward/reverse/bidirectional as 0/1/2.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use model_tape::ops::TapeOp;
use model_tape::program::{Operand, RegId};

use crate::dtype::Dtype;
use crate::emit::{EmitError, Emitter};
use crate::graph::Graph;
use crate::node::{Node, NodeId, OpKind};
use crate::tensor::Tensor;

pub(crate) fn reg(id: RegId) -> Operand {
    Operand::Reg(id)
}

pub(crate) fn regs(ids: Vec<RegId>) -> Operand {
    Operand::RegList(ids)
}

pub(crate) fn int(v: i64) -> Operand {
    Operand::Int(v)
}

pub(crate) fn ints(v: Vec<i64>) -> Operand {
    Operand::IntList(v)
}

pub(crate) fn float(v: f64) -> Operand {
    Operand::Float(v)
}

pub(crate) fn floats(v: Vec<f64>) -> Operand {
    Operand::FloatList(v)
}

pub(crate) fn string(v: &str) -> Operand {
    Operand::Str(String::from(v))
}

pub(crate) fn shape(v: Vec<i64>) -> Operand {
    Operand::Shape(v)
}

/// Halves symmetric 2N pads; empty pads default to 2-D zeros.
fn pads(node: &Node) -> Result<Vec<i64>, EmitError> {
    let mut pads = node.pads();
    if pads.is_empty() {
        return Ok(vec![0, 0]);
    }
    if pads.len() % 2 != 0 {
        return Err(EmitError::BadPads {
            node: node.name().into(),
        });
    }
    let half = pads.len() / 2;
    for i in 0..half {
        if pads[i] != pads[i + half] {
            return Err(EmitError::BadPads {
                node: node.name().into(),
            });
        }
    }
    pads.truncate(half);
    Ok(pads)
}

/// Declared strides; empty defaults to 2-D ones.
fn strides(node: &Node) -> Vec<i64> {
    let strides = node.strides();
    if strides.is_empty() {
        vec![1, 1]
    } else {
        strides
    }
}

fn direction(node: &Node) -> Result<i64, EmitError> {
    match node.direction() {
        "" | "forward" => Ok(0),
        "reverse" => Ok(1),
        "bidirectional" => Ok(2),
        other => Err(EmitError::UnknownDirection {
            node: node.name().into(),
            direction: other.into(),
        }),
    }
}

fn check_dilations(node: &Node) -> Result<(), EmitError> {
    if node.dilations().iter().any(|&d| d != 1) {
        return Err(EmitError::UnsupportedDilation {
            node: node.name().into(),
        });
    }
    Ok(())
}

fn check_no_custom_activations(node: &Node) -> Result<(), EmitError> {
    if !node.get_strs("activations").is_empty()
        || !node.get_floats("activation_alpha").is_empty()
        || !node.get_floats("activation_beta").is_empty()
    {
        return Err(EmitError::BadAttr {
            node: node.name().into(),
            detail: "custom activations are not supported yet",
        });
    }
    Ok(())
}

fn unary_tape_op(op: OpKind) -> Option<TapeOp> {
    Some(match op {
        OpKind::Identity => TapeOp::Identity,
        OpKind::Neg => TapeOp::Neg,
        OpKind::Reciprocal => TapeOp::Reciprocal,
        OpKind::Exp => TapeOp::Exp,
        OpKind::Log => TapeOp::Log,
        OpKind::Sqrt => TapeOp::Sqrt,
        OpKind::Tanh => TapeOp::Tanh,
        OpKind::Abs => TapeOp::Abs,
        OpKind::Relu => TapeOp::Relu,
        OpKind::Floor => TapeOp::Floor,
        OpKind::Ceil => TapeOp::Ceil,
        OpKind::Sigmoid => TapeOp::Sigmoid,
        OpKind::Not => TapeOp::Not,
        OpKind::Shape => TapeOp::Shape,
        OpKind::Size => TapeOp::Size,
        OpKind::GenericLen => TapeOp::GenericLen,
        OpKind::SequenceSize => TapeOp::SequenceSize,
        OpKind::SequenceLengths => TapeOp::SequenceLengths,
        _ => return None,
    })
}

fn binary_tape_op(op: OpKind) -> Option<TapeOp> {
    Some(match op {
        OpKind::Add => TapeOp::Add,
        OpKind::Sub => TapeOp::Sub,
        OpKind::Mul => TapeOp::Mul,
        OpKind::Div => TapeOp::Div,
        OpKind::Pow => TapeOp::Pow,
        OpKind::Equal => TapeOp::Equal,
        OpKind::Greater => TapeOp::Greater,
        OpKind::And => TapeOp::And,
        OpKind::Or => TapeOp::Or,
        OpKind::Xor => TapeOp::Xor,
        OpKind::GenericIs => TapeOp::GenericIs,
        OpKind::GenericAdd => TapeOp::GenericAdd,
        OpKind::GenericGetItem => TapeOp::GenericGetItem,
        OpKind::GenericAccumulateGrad => TapeOp::GenericAccumulateGrad,
        OpKind::ReluGrad => TapeOp::ReluGrad,
        OpKind::MaxPoolGrad => TapeOp::MaxPoolGrad,
        OpKind::AveragePoolGrad => TapeOp::AveragePoolGrad,
        OpKind::SelectItem => TapeOp::SelectItem,
        OpKind::Reshape => TapeOp::Reshape,
        OpKind::Expand => TapeOp::Expand,
        OpKind::MatMul => TapeOp::MatMul,
        OpKind::ReduceSumTo => TapeOp::ReduceSumTo,
        OpKind::LinearGradWeight => TapeOp::LinearGradWeight,
        OpKind::SequenceLookup => TapeOp::SequenceLookup,
        OpKind::SequenceUnpad => TapeOp::SequenceUnpad,
        _ => return None,
    })
}

fn reduce_tape_op(op: OpKind) -> Option<TapeOp> {
    Some(match op {
        OpKind::ReduceMax => TapeOp::ReduceMax,
        OpKind::ReduceSum => TapeOp::ReduceSum,
        OpKind::ReduceSumSquare => TapeOp::ReduceSumSquare,
        OpKind::ReduceMean => TapeOp::ReduceMean,
        _ => return None,
    })
}

impl Emitter<'_> {
    /// Pushes an instruction stamped with the node summary and order.
    pub(crate) fn emit_op(&mut self, node: &Node, op: TapeOp, inputs: Vec<Operand>) {
        self.b.push(op, inputs);
        self.b.note_last(node.summary(), node.order());
    }

    /// Mandatory input register.
    pub(crate) fn in_reg(&self, g: &Graph, node: &Node, i: usize) -> Result<RegId, EmitError> {
        let err = || EmitError::MandatoryInput {
            op: node.op(),
            index: i,
        };
        let &v = node.inputs().get(i).ok_or_else(err)?;
        let value = g.value(v);
        if value.is_null() {
            return Err(err());
        }
        self.reg_for(value)
    }

    /// Optional input register (`-1` when absent or null).
    pub(crate) fn oin_reg(&self, g: &Graph, node: &Node, i: usize) -> Result<RegId, EmitError> {
        match node.inputs().get(i) {
            None => Ok(RegId::NONE),
            Some(&v) if g.value(v).is_null() => Ok(RegId::NONE),
            Some(&v) => self.value_reg(g, v),
        }
    }

    /// Mandatory output register.
    pub(crate) fn out_reg(&self, g: &Graph, node: &Node, i: usize) -> Result<RegId, EmitError> {
        let err = || EmitError::MandatoryOutput {
            op: node.op(),
            index: i,
        };
        let &v = node.outputs().get(i).ok_or_else(err)?;
        let value = g.value(v);
        if value.is_null() {
            return Err(err());
        }
        self.reg_for(value)
    }

    /// Optional output register (`-1` when absent or null).
    pub(crate) fn oout_reg(&self, g: &Graph, node: &Node, i: usize) -> Result<RegId, EmitError> {
        match node.outputs().get(i) {
            None => Ok(RegId::NONE),
            Some(&v) if g.value(v).is_null() => Ok(RegId::NONE),
            Some(&v) => self.value_reg(g, v),
        }
    }

    fn all_in_regs(&self, g: &Graph, node: &Node) -> Result<Vec<RegId>, EmitError> {
        (0..node.inputs().len())
            .map(|i| self.in_reg(g, node, i))
            .collect()
    }

    fn all_out_regs(&self, g: &Graph, node: &Node) -> Result<Vec<RegId>, EmitError> {
        (0..node.outputs().len())
            .map(|i| self.out_reg(g, node, i))
            .collect()
    }

    /// Lowers one node into tape instructions.
    pub(crate) fn emit_node(&mut self, g: &Graph, node_id: NodeId) -> Result<(), EmitError> {
        let node = g.node(node_id);

        if let Some(op) = unary_tape_op(node.op()) {
            let y = self.out_reg(g, node, 0)?;
            let x = self.in_reg(g, node, 0)?;
            self.emit_op(node, op, vec![reg(y), reg(x)]);
            return Ok(());
        }
        if let Some(op) = binary_tape_op(node.op()) {
            let y = self.out_reg(g, node, 0)?;
            let a = self.in_reg(g, node, 0)?;
            let b = self.in_reg(g, node, 1)?;
            self.emit_op(node, op, vec![reg(y), reg(a), reg(b)]);
            return Ok(());
        }
        if let Some(op) = reduce_tape_op(node.op()) {
            let y = self.out_reg(g, node, 0)?;
            let x = self.in_reg(g, node, 0)?;
            let axes = node.get_ints("axes");
            let keepdims = node.int_or("keepdims", 1);
            self.emit_op(node, op, vec![reg(y), reg(x), ints(axes), int(keepdims)]);
            return Ok(());
        }

        match node.op() {
            OpKind::Dropout => {
                if node.outputs().len() >= 2 {
                    self.log_line("the second output of Dropout is not handled yet");
                }
                let y = self.out_reg(g, node, 0)?;
                let mask = self.oout_reg(g, node, 1)?;
                let x = self.in_reg(g, node, 0)?;
                let ratio = node.float_or("ratio", 0.5);
                self.emit_op(
                    node,
                    TapeOp::Dropout,
                    vec![reg(y), reg(mask), reg(x), float(ratio)],
                );
            }
            OpKind::Selu => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let alpha = node.float_or("alpha", 1.673_263_192_176_818_8);
                let gamma = node.float_or("gamma", 1.050_701_022_148_132_3);
                self.emit_op(
                    node,
                    TapeOp::Selu,
                    vec![reg(y), reg(x), float(alpha), float(gamma)],
                );
            }
            OpKind::LeakyRelu => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let alpha = node.float_or("alpha", 0.01);
                self.emit_op(node, TapeOp::LeakyRelu, vec![reg(y), reg(x), float(alpha)]);
            }
            OpKind::Elu => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let alpha = node.float_or("alpha", 1.0);
                self.emit_op(node, TapeOp::Elu, vec![reg(y), reg(x), float(alpha)]);
            }
            OpKind::Linear => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let w = self.in_reg(g, node, 1)?;
                let bias = self.oin_reg(g, node, 2)?;
                let n_batch_axes = node.int_or("n_batch_axes", 1);
                self.emit_op(
                    node,
                    TapeOp::Linear,
                    vec![reg(y), reg(x), reg(w), reg(bias), int(n_batch_axes)],
                );
            }
            OpKind::Conv => {
                check_dilations(node)?;
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let w = self.in_reg(g, node, 1)?;
                let bias = self.oin_reg(g, node, 2)?;
                self.emit_op(
                    node,
                    TapeOp::Conv,
                    vec![
                        reg(y),
                        reg(x),
                        reg(w),
                        reg(bias),
                        ints(strides(node)),
                        ints(pads(node)?),
                    ],
                );
            }
            OpKind::ConvTranspose => {
                check_dilations(node)?;
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let w = self.in_reg(g, node, 1)?;
                let bias = self.oin_reg(g, node, 2)?;
                let output_shape = node.get_ints("output_shape");
                self.emit_op(
                    node,
                    TapeOp::ConvTranspose,
                    vec![
                        reg(y),
                        reg(x),
                        reg(w),
                        reg(bias),
                        ints(strides(node)),
                        ints(pads(node)?),
                        ints(output_shape),
                    ],
                );
            }
            OpKind::ConvTransposeWithDynamicShape => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let w = self.in_reg(g, node, 1)?;
                let out_shape = self.in_reg(g, node, 2)?;
                self.emit_op(
                    node,
                    TapeOp::ConvTransposeWithDynamicShape,
                    vec![
                        reg(y),
                        reg(x),
                        reg(w),
                        reg(out_shape),
                        ints(strides(node)),
                        ints(pads(node)?),
                    ],
                );
            }
            OpKind::ConvGradWeight => {
                check_dilations(node)?;
                let gw = self.out_reg(g, node, 0)?;
                let w = self.in_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 1)?;
                let gy = self.in_reg(g, node, 2)?;
                self.emit_op(
                    node,
                    TapeOp::ConvGradWeight,
                    vec![
                        reg(gw),
                        reg(w),
                        reg(x),
                        reg(gy),
                        ints(strides(node)),
                        ints(pads(node)?),
                    ],
                );
            }
            OpKind::Rnn => {
                check_no_custom_activations(node)?;
                let operands = vec![
                    reg(self.oout_reg(g, node, 0)?),
                    reg(self.oout_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                    reg(self.oin_reg(g, node, 4)?),
                    reg(self.oin_reg(g, node, 5)?),
                    int(node.int_or("hidden_size", 0)),
                    int(direction(node)?),
                ];
                self.emit_op(node, TapeOp::Rnn, operands);
            }
            OpKind::Gru => {
                check_no_custom_activations(node)?;
                let operands = vec![
                    reg(self.oout_reg(g, node, 0)?),
                    reg(self.oout_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                    reg(self.oin_reg(g, node, 4)?),
                    reg(self.oin_reg(g, node, 5)?),
                    int(node.int_or("hidden_size", 0)),
                    int(node.int_or("linear_before_reset", 0)),
                    int(direction(node)?),
                ];
                self.emit_op(node, TapeOp::Gru, operands);
            }
            OpKind::Lstm => {
                check_no_custom_activations(node)?;
                let operands = vec![
                    reg(self.oout_reg(g, node, 0)?),
                    reg(self.oout_reg(g, node, 1)?),
                    reg(self.oout_reg(g, node, 2)?),
                    reg(self.oout_reg(g, node, 3)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                    reg(self.oin_reg(g, node, 4)?),
                    reg(self.oin_reg(g, node, 5)?),
                    reg(self.oin_reg(g, node, 6)?),
                    reg(self.oin_reg(g, node, 7)?),
                    int(node.int_or("hidden_size", 0)),
                    int(direction(node)?),
                ];
                self.emit_op(node, TapeOp::Lstm, operands);
            }
            OpKind::LstmGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.out_reg(g, node, 1)?),
                    reg(self.out_reg(g, node, 2)?),
                    reg(self.out_reg(g, node, 3)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                ];
                self.emit_op(node, TapeOp::LstmGrad, operands);
            }
            OpKind::Squeeze | OpKind::Unsqueeze => {
                let op = if node.op() == OpKind::Squeeze {
                    TapeOp::Squeeze
                } else {
                    TapeOp::Unsqueeze
                };
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(node, op, vec![reg(y), reg(x), ints(node.get_ints("axes"))]);
            }
            OpKind::Gemm => {
                let y = self.out_reg(g, node, 0)?;
                let a = self.in_reg(g, node, 0)?;
                let b = self.in_reg(g, node, 1)?;
                let c = self.in_reg(g, node, 2)?;
                let operands = vec![
                    reg(y),
                    reg(a),
                    reg(b),
                    reg(c),
                    float(node.float_or("alpha", 1.0)),
                    float(node.float_or("beta", 1.0)),
                    int(node.int_or("transA", 0)),
                    int(node.int_or("transB", 0)),
                ];
                self.emit_op(node, TapeOp::Gemm, operands);
            }
            OpKind::BatchNormalization => self.emit_batch_normalization(g, node)?,
            OpKind::BatchNormalizationGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.out_reg(g, node, 1)?),
                    reg(self.out_reg(g, node, 2)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                ];
                self.emit_op(node, TapeOp::BatchNormalizationGrad, operands);
            }
            OpKind::Lrn => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let alpha = node.float_or("alpha", 1e-4);
                let beta = node.float_or("beta", 0.75);
                let bias = node.float_or("bias", 1.0);
                let size = node.int_or("size", 0);
                if node.outputs().len() == 1 {
                    let unit_scale = self.alloc_reg();
                    self.emit_op(
                        node,
                        TapeOp::Lrn,
                        vec![
                            reg(y),
                            reg(unit_scale),
                            reg(x),
                            float(alpha),
                            float(beta),
                            float(bias),
                            int(size),
                        ],
                    );
                    self.emit_free(unit_scale, line!());
                } else {
                    let unit_scale = self.out_reg(g, node, 1)?;
                    self.emit_op(
                        node,
                        TapeOp::Lrn,
                        vec![
                            reg(y),
                            reg(unit_scale),
                            reg(x),
                            float(alpha),
                            float(beta),
                            float(bias),
                            int(size),
                        ],
                    );
                }
            }
            OpKind::LrnGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    reg(self.in_reg(g, node, 3)?),
                    float(node.float_or("alpha", 1e-4)),
                    float(node.float_or("beta", 0.75)),
                    float(node.float_or("bias", 1.0)),
                    int(node.int_or("size", 0)),
                ];
                self.emit_op(node, TapeOp::LrnGrad, operands);
            }
            OpKind::Pad => {
                if node.get_str("mode").unwrap_or("constant") != "constant" {
                    return Err(EmitError::UnsupportedPadMode {
                        node: node.name().into(),
                    });
                }
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::Pad,
                    vec![
                        reg(y),
                        reg(x),
                        ints(node.pads()),
                        float(node.float_or("value", 0.0)),
                    ],
                );
            }
            OpKind::MaxPool => self.emit_max_pool(g, node)?,
            OpKind::AveragePool => self.emit_average_pool(g, node)?,
            OpKind::Softmax | OpKind::LogSoftmax => {
                let op = if node.op() == OpKind::Softmax {
                    TapeOp::Softmax
                } else {
                    TapeOp::LogSoftmax
                };
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                // Negative axes remap to 1; this pins opset <= 12 semantics.
                let mut axis = node.int_or("axis", 1);
                if axis < 0 {
                    axis = 1;
                }
                self.emit_op(node, op, vec![reg(y), reg(x), int(axis)]);
            }
            OpKind::ArgMax => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let axis = node.int_or("axis", 0);
                let keepdims = node.int_or("keepdims", 1);
                self.emit_op(
                    node,
                    TapeOp::ArgMax,
                    vec![reg(y), reg(x), int(axis), int(keepdims)],
                );
            }
            OpKind::Hardmax => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::Hardmax,
                    vec![reg(y), reg(x), int(node.int_or("axis", 1))],
                );
            }
            OpKind::Cast => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::Cast,
                    vec![reg(y), reg(x), int(node.int_or("to", 0))],
                );
            }
            OpKind::OneHot => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    int(node.int_or("axis", -1)),
                ];
                self.emit_op(node, TapeOp::OneHot, operands);
            }
            OpKind::ConstantFill => {
                let input_as_shape = node.int_or("input_as_shape", 0);
                let want_inputs = usize::from(input_as_shape != 0);
                if node.inputs().len() != want_inputs {
                    return Err(EmitError::Arity {
                        op: node.op(),
                        detail: "input count must match input_as_shape",
                    });
                }
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.oin_reg(g, node, 0)?),
                    int(node.int_or("dtype", 1)),
                    ints(node.get_ints("extra_shape")),
                    ints(node.get_ints("shape")),
                    float(node.float_or("value", 0.0)),
                ];
                self.emit_op(node, TapeOp::ConstantFill, operands);
            }
            OpKind::Slice => {
                let starts = node.get_ints("starts");
                let ends = node.get_ints("ends");
                if starts.is_empty() || starts.len() != ends.len() {
                    return Err(EmitError::BadAttr {
                        node: node.name().into(),
                        detail: "starts and ends must be non-empty and congruent",
                    });
                }
                let mut axes = node.get_ints("axes");
                if axes.is_empty() {
                    axes = (0..starts.len() as i64).collect();
                } else if axes.len() != starts.len() {
                    return Err(EmitError::BadAttr {
                        node: node.name().into(),
                        detail: "axes must match starts",
                    });
                }
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::Slice,
                    vec![reg(y), reg(x), ints(axes), ints(starts), ints(ends)],
                );
            }
            OpKind::DynamicSlice => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                ];
                self.emit_op(node, TapeOp::DynamicSlice, operands);
            }
            OpKind::DynamicSliceGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    reg(self.in_reg(g, node, 3)?),
                    reg(self.oin_reg(g, node, 4)?),
                ];
                self.emit_op(node, TapeOp::DynamicSliceGrad, operands);
            }
            OpKind::Gather => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    int(node.int_or("axis", 0)),
                ];
                self.emit_op(node, TapeOp::Gather, operands);
            }
            OpKind::GatherGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                    int(node.int_or("axis", 0)),
                ];
                self.emit_op(node, TapeOp::GatherGrad, operands);
            }
            OpKind::SelectItemGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                ];
                self.emit_op(node, TapeOp::SelectItemGrad, operands);
            }
            OpKind::Concat => {
                let y = self.out_reg(g, node, 0)?;
                let ins = self.all_in_regs(g, node)?;
                self.emit_op(
                    node,
                    TapeOp::Concat,
                    vec![reg(y), regs(ins), int(node.int_or("axis", 1))],
                );
            }
            OpKind::Split => {
                let outs = self.all_out_regs(g, node)?;
                let x = self.in_reg(g, node, 0)?;
                let operands = vec![
                    regs(outs),
                    reg(x),
                    int(node.int_or("axis", 0)),
                    ints(node.get_ints("split")),
                ];
                self.emit_op(node, TapeOp::Split, operands);
            }
            OpKind::Clip => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let max = node.float_or("max", f64::from(f32::MAX));
                let min = node.float_or("min", f64::from(f32::MIN));
                self.emit_op(
                    node,
                    TapeOp::Clip,
                    vec![reg(y), reg(x), float(max), float(min)],
                );
            }
            OpKind::Max => {
                let y = self.out_reg(g, node, 0)?;
                let ins = self.all_in_regs(g, node)?;
                self.emit_op(node, TapeOp::Max, vec![reg(y), regs(ins)]);
            }
            OpKind::Transpose => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::Transpose,
                    vec![reg(y), reg(x), ints(node.get_ints("perm"))],
                );
            }
            OpKind::Print => {
                let ins = self.all_in_regs(g, node)?;
                self.emit_op(node, TapeOp::Print, vec![regs(ins)]);
            }
            OpKind::NullConstant => {
                let y = self.out_reg(g, node, 0)?;
                self.emit_op(node, TapeOp::NullConstant, vec![reg(y)]);
            }
            OpKind::Constant => {
                let out = self.out_reg(g, node, 0)?;
                let host = node.int_or("host", 0) != 0;
                let Some(tensor) = node.get_tensor("value") else {
                    return Err(EmitError::BadConstant {
                        node: node.name().into(),
                        detail: "Constant carries no tensor value",
                    });
                };
                self.emit_constant_tensor(node, tensor, out, host)?;
            }
            OpKind::SequenceConstants => self.emit_constant_sequence(g, node)?,
            OpKind::SequenceCreate => {
                let y = self.out_reg(g, node, 0)?;
                self.emit_op(node, TapeOp::SequenceCreate, vec![reg(y)]);
            }
            OpKind::SequenceAppend => {
                let seq = self.out_reg(g, node, 0)?;
                let src = self.in_reg(g, node, 0)?;
                let item = self.in_reg(g, node, 1)?;
                // A uniquely owned sequence is mutated in place; shared ones
                // are copied first to keep appends linear-time overall.
                if g.value(node.inputs()[0]).users().len() == 1 {
                    self.emit_op(node, TapeOp::SequenceMove, vec![reg(seq), reg(src)]);
                } else {
                    self.emit_op(node, TapeOp::SequenceCopy, vec![reg(seq), reg(src)]);
                }
                self.emit_op(node, TapeOp::SequenceAppend, vec![reg(seq), reg(item)]);
            }
            OpKind::SequencePop => {
                let seq = self.out_reg(g, node, 0)?;
                let item = self.out_reg(g, node, 1)?;
                let src = self.in_reg(g, node, 0)?;
                if g.value(node.inputs()[0]).users().len() == 1 {
                    self.emit_op(node, TapeOp::SequenceMove, vec![reg(seq), reg(src)]);
                } else {
                    self.emit_op(node, TapeOp::SequenceCopy, vec![reg(seq), reg(src)]);
                }
                self.emit_op(node, TapeOp::SequencePop, vec![reg(item), reg(seq)]);
            }
            OpKind::SequenceGetSlice => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.oin_reg(g, node, 1)?),
                    reg(self.oin_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                ];
                self.emit_op(node, TapeOp::SequenceGetSlice, operands);
            }
            OpKind::SequenceLookupGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.in_reg(g, node, 2)?),
                ];
                self.emit_op(node, TapeOp::SequenceLookupGrad, operands);
            }
            OpKind::SequenceGetSliceGrad => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    reg(self.oin_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                    reg(self.oin_reg(g, node, 4)?),
                ];
                self.emit_op(node, TapeOp::SequenceGetSliceGrad, operands);
            }
            OpKind::SequenceStack => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::SequenceStack,
                    vec![reg(y), reg(x), int(node.int_or("axis", 0))],
                );
            }
            OpKind::SequenceConcat => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let axis = node.int_or("axis", 0);
                if node.outputs().len() == 1 {
                    let lengths = self.alloc_reg();
                    self.emit_op(
                        node,
                        TapeOp::SequenceConcat,
                        vec![reg(y), reg(lengths), reg(x), int(axis)],
                    );
                    self.emit_free(lengths, line!());
                } else {
                    let lengths = self.out_reg(g, node, 1)?;
                    self.emit_op(
                        node,
                        TapeOp::SequenceConcat,
                        vec![reg(y), reg(lengths), reg(x), int(axis)],
                    );
                }
            }
            OpKind::SequenceSplitAxis => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 1)?),
                    int(node.int_or("axis", 0)),
                ];
                self.emit_op(node, TapeOp::SequenceSplitAxis, operands);
            }
            OpKind::SequenceSeparate => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                self.emit_op(
                    node,
                    TapeOp::SequenceSeparate,
                    vec![reg(y), reg(x), int(node.int_or("axis", 0))],
                );
            }
            OpKind::SequencePad => {
                let y = self.out_reg(g, node, 0)?;
                let x = self.in_reg(g, node, 0)?;
                let operands = vec![
                    reg(y),
                    reg(x),
                    int(node.int_or("length", 0)),
                    float(node.float_or("value", 0.0)),
                ];
                self.emit_op(node, TapeOp::SequencePad, operands);
            }
            OpKind::SequenceRange => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.oin_reg(g, node, 1)?),
                    reg(self.oin_reg(g, node, 2)?),
                ];
                self.emit_op(node, TapeOp::SequenceRange, operands);
            }
            OpKind::GenericGetSlice => {
                let operands = vec![
                    reg(self.out_reg(g, node, 0)?),
                    reg(self.in_reg(g, node, 0)?),
                    reg(self.oin_reg(g, node, 1)?),
                    reg(self.oin_reg(g, node, 2)?),
                    reg(self.oin_reg(g, node, 3)?),
                ];
                self.emit_op(node, TapeOp::GenericGetSlice, operands);
            }
            OpKind::FusionGroup => self.emit_fusion_group(g, node)?,
            OpKind::If => self.emit_if(g, node)?,
            OpKind::Loop => self.emit_loop(g, node)?,
            op => return Err(EmitError::UnsupportedOp { op }),
        }
        Ok(())
    }

    fn emit_batch_normalization(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        if node.inputs().len() != 5 {
            return Err(EmitError::Arity {
                op: node.op(),
                detail: "expects exactly 5 inputs",
            });
        }
        let mut num_onnx_outputs = node.outputs().len();
        let mut outs = vec![self.out_reg(g, node, 0)?];
        let &last = node.outputs().last().ok_or(EmitError::MandatoryOutput {
            op: node.op(),
            index: 0,
        })?;
        if g.value(last).ty().kind == crate::value::TypeKind::Opaque {
            // The trailing opaque saved-state output moves to slot 1.
            num_onnx_outputs -= 1;
            outs.push(self.out_reg(g, node, num_onnx_outputs)?);
        } else {
            outs.push(RegId::NONE);
        }
        for i in 1..num_onnx_outputs {
            outs.push(self.out_reg(g, node, i)?);
        }
        while outs.len() < 6 {
            outs.push(RegId::NONE);
        }
        outs.truncate(6);

        let mut operands: Vec<Operand> = outs.into_iter().map(reg).collect();
        for i in 0..5 {
            operands.push(reg(self.in_reg(g, node, i)?));
        }
        operands.push(float(node.float_or("epsilon", 1e-5)));
        operands.push(float(node.float_or("momentum", 0.9)));
        operands.push(int(node.int_or("spatial", 1)));
        self.emit_op(node, TapeOp::BatchNormalization, operands);
        Ok(())
    }

    fn emit_max_pool(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        if node.get_str("auto_pad").unwrap_or("NOTSET") != "NOTSET" {
            return Err(EmitError::UnsupportedAutoPad {
                node: node.name().into(),
            });
        }
        let y = self.out_reg(g, node, 0)?;
        let x = self.in_reg(g, node, 0)?;
        let kernel = node.get_ints("kernel_shape");
        let cover_all = node.int_or("cover_all", 0);
        if node.outputs().len() == 1 {
            let ctx = self.alloc_reg();
            self.emit_op(
                node,
                TapeOp::MaxPool,
                vec![
                    reg(y),
                    reg(ctx),
                    reg(x),
                    ints(kernel),
                    ints(strides(node)),
                    ints(pads(node)?),
                    int(cover_all),
                ],
            );
            self.emit_free(ctx, line!());
        } else {
            if node.outputs().len() != 3 {
                return Err(EmitError::Arity {
                    op: node.op(),
                    detail: "expects 1 or 3 outputs",
                });
            }
            if !g.value(node.outputs()[1]).is_null() {
                return Err(EmitError::Arity {
                    op: node.op(),
                    detail: "the second output must be null",
                });
            }
            let ctx = self.out_reg(g, node, 2)?;
            self.emit_op(
                node,
                TapeOp::MaxPool,
                vec![
                    reg(y),
                    reg(ctx),
                    reg(x),
                    ints(kernel),
                    ints(strides(node)),
                    ints(pads(node)?),
                    int(cover_all),
                ],
            );
        }
        Ok(())
    }

    fn emit_average_pool(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        if node.get_str("auto_pad").unwrap_or("NOTSET") != "NOTSET" {
            return Err(EmitError::UnsupportedAutoPad {
                node: node.name().into(),
            });
        }
        let y = self.out_reg(g, node, 0)?;
        let x = self.in_reg(g, node, 0)?;
        let kernel = node.get_ints("kernel_shape");
        let count_include_pad = node.int_or("count_include_pad", 0);
        if node.outputs().len() == 1 {
            let ctx = self.alloc_reg();
            self.emit_op(
                node,
                TapeOp::AveragePool,
                vec![
                    reg(y),
                    reg(ctx),
                    reg(x),
                    ints(kernel),
                    ints(strides(node)),
                    ints(pads(node)?),
                    int(count_include_pad),
                ],
            );
            self.emit_free(ctx, line!());
        } else {
            if node.outputs().len() != 2 {
                return Err(EmitError::Arity {
                    op: node.op(),
                    detail: "expects 1 or 2 outputs",
                });
            }
            let ctx = self.out_reg(g, node, 1)?;
            self.emit_op(
                node,
                TapeOp::AveragePool,
                vec![
                    reg(y),
                    reg(ctx),
                    reg(x),
                    ints(kernel),
                    ints(strides(node)),
                    ints(pads(node)?),
                    int(count_include_pad),
                ],
            );
        }
        Ok(())
    }

    /// Materializes one tensor into `out`.
    ///
    /// Floating dtypes read element-wise into `f64`; integer and bool dtypes
    /// widen to `i64`. Scalar integer constants always live on the host;
    /// integer vectors are host-resident iff the dtype is 64-bit.
    pub(crate) fn emit_constant_tensor(
        &mut self,
        node: &Node,
        tensor: &Tensor,
        out: RegId,
        host: bool,
    ) -> Result<(), EmitError> {
        let bad = |detail: &'static str| EmitError::BadConstant {
            node: node.name().into(),
            detail,
        };

        let mut dims: Vec<i64> = Vec::with_capacity(tensor.dims().len());
        for &d in tensor.dims() {
            if d < 0 || d >= (1_i64 << 32) {
                return Err(bad("dimension out of range"));
            }
            dims.push(d);
        }

        let dtype = tensor.dtype();
        let n = tensor.num_elements();
        if dtype.is_float() {
            if dtype.size_of() != 4 && dtype.size_of() != 8 {
                return Err(bad("unknown element width"));
            }
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                values.push(tensor.float_at(i).ok_or_else(|| bad("unreadable element"))?);
            }
            if dims.is_empty() {
                let v = values.first().copied().ok_or_else(|| bad("empty scalar"))?;
                self.emit_op(
                    node,
                    TapeOp::FloatScalarConstant,
                    vec![reg(out), float(v), int(dtype.code()), int(i64::from(host))],
                );
            } else {
                self.emit_op(
                    node,
                    TapeOp::FloatConstant,
                    vec![
                        reg(out),
                        floats(values),
                        int(dtype.code()),
                        shape(dims),
                        int(i64::from(host)),
                    ],
                );
            }
        } else {
            if !matches!(dtype.size_of(), 1 | 2 | 4 | 8) {
                return Err(bad("unknown element width"));
            }
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                values.push(tensor.int_at(i).ok_or_else(|| bad("unreadable element"))?);
            }
            if dims.is_empty() {
                let v = values.first().copied().ok_or_else(|| bad("empty scalar"))?;
                self.emit_op(
                    node,
                    TapeOp::IntScalarConstant,
                    vec![reg(out), int(v), int(dtype.code()), int(1)],
                );
            } else {
                let host = i64::from(dtype == Dtype::Int64);
                self.emit_op(
                    node,
                    TapeOp::IntConstant,
                    vec![
                        reg(out),
                        ints(values),
                        int(dtype.code()),
                        shape(dims),
                        int(host),
                    ],
                );
            }
        }
        Ok(())
    }

    fn emit_constant_sequence(&mut self, g: &Graph, node: &Node) -> Result<(), EmitError> {
        let tensors = node.get_tensors("value");
        let mut const_regs = Vec::with_capacity(tensors.len());
        for tensor in tensors {
            let id = self.alloc_reg();
            self.emit_constant_tensor(node, tensor, id, false)?;
            const_regs.push(id);
        }

        let out = self.out_reg(g, node, 0)?;
        self.emit_op(node, TapeOp::SequenceCreate, vec![reg(out)]);
        for id in const_regs {
            self.emit_op(node, TapeOp::SequenceAppend, vec![reg(out), reg(id)]);
            self.emit_free(id, line!());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;
    use alloc::vec::Vec;

    use model_tape::ops::TapeOp;
    use model_tape::program::{Operand, RegId, TapeProgram};

    use crate::emit::{CompilerOptions, EmitError, emit_model};
    use crate::graph::Graph;
    use crate::node::{AttrValue, NodeId, OpKind};
    use crate::tensor::Tensor;
    use crate::value::{ValueType, ValueId, ValueKind};

    fn ops_of(p: &TapeProgram) -> Vec<TapeOp> {
        p.instructions.iter().map(|i| i.op).collect()
    }

    fn single_node_graph(
        op: OpKind,
        num_inputs: usize,
        num_outputs: usize,
    ) -> (Graph, NodeId, Vec<ValueId>, Vec<ValueId>) {
        let mut g = Graph::new("test");
        let inputs: Vec<ValueId> = (0..num_inputs)
            .map(|i| g.add_input_value(&alloc::format!("in{i}"), ValueType::unknown()))
            .collect();
        let outputs: Vec<ValueId> = (0..num_outputs)
            .map(|i| g.add_output_value(&alloc::format!("out{i}"), ValueType::unknown()))
            .collect();
        let node = g.add_node(op, &inputs, &outputs, "");
        g.schedule();
        (g, node, inputs, outputs)
    }

    fn emit(g: &Graph) -> TapeProgram {
        emit_model(g, &CompilerOptions::default(), None, None).unwrap()
    }

    fn first_op<'p>(p: &'p TapeProgram, op: TapeOp) -> &'p model_tape::program::Instruction {
        p.instructions.iter().find(|i| i.op == op).unwrap()
    }

    #[test]
    fn conv_defaults_strides_and_pads() {
        let (mut g, node, ..) = single_node_graph(OpKind::Conv, 2, 1);
        let _ = node;
        g.schedule();
        let p = emit(&g);
        let conv = first_op(&p, TapeOp::Conv);
        // Optional bias is absent.
        assert_eq!(conv.inputs[3], Operand::Reg(RegId::NONE));
        assert_eq!(conv.inputs[4], Operand::IntList(vec![1, 1]));
        assert_eq!(conv.inputs[5], Operand::IntList(vec![0, 0]));
    }

    #[test]
    fn symmetric_pads_are_halved_and_asymmetric_rejected() {
        let (mut g, node, ..) = single_node_graph(OpKind::Conv, 2, 1);
        g.node_mut(node)
            .set_attr("pads", AttrValue::Ints(vec![1, 2, 1, 2]));
        let p = emit(&g);
        assert_eq!(
            first_op(&p, TapeOp::Conv).inputs[5],
            Operand::IntList(vec![1, 2])
        );

        let (mut g, node, ..) = single_node_graph(OpKind::Conv, 2, 1);
        g.node_mut(node)
            .set_attr("pads", AttrValue::Ints(vec![1, 2, 3, 4]));
        assert!(matches!(
            emit_model(&g, &CompilerOptions::default(), None, None).unwrap_err(),
            EmitError::BadPads { .. }
        ));
    }

    #[test]
    fn conv_rejects_dilations() {
        let (mut g, node, ..) = single_node_graph(OpKind::Conv, 2, 1);
        g.node_mut(node)
            .set_attr("dilations", AttrValue::Ints(vec![2, 2]));
        assert!(matches!(
            emit_model(&g, &CompilerOptions::default(), None, None).unwrap_err(),
            EmitError::UnsupportedDilation { .. }
        ));
    }

    #[test]
    fn max_pool_with_one_output_gets_a_scratch_register() {
        let (mut g, node, ..) = single_node_graph(OpKind::MaxPool, 1, 1);
        g.node_mut(node)
            .set_attr("kernel_shape", AttrValue::Ints(vec![2, 2]));
        let p = emit(&g);
        let pool_at = p
            .instructions
            .iter()
            .position(|i| i.op == TapeOp::MaxPool)
            .unwrap();
        let ctx = p.instructions[pool_at].inputs[1].as_reg().unwrap();
        // The scratch register is outside the named-value id range and is
        // freed immediately after the pool.
        assert!(ctx.is_some());
        assert_eq!(p.instructions[pool_at + 1].op, TapeOp::Free);
        assert_eq!(
            p.instructions[pool_at + 1].inputs[0].as_reg().unwrap(),
            ctx
        );
    }

    #[test]
    fn max_pool_enforces_null_middle_output() {
        let mut g = Graph::new("test");
        let x = g.add_input_value("x", ValueType::unknown());
        let y = g.add_output_value("y", ValueType::unknown());
        let mid = g.add_null_value();
        let ctx = g.add_output_value("ctx", ValueType::unknown());
        let n = g.add_node(OpKind::MaxPool, &[x], &[y, mid, ctx], "");
        g.node_mut(n)
            .set_attr("kernel_shape", AttrValue::Ints(vec![2, 2]));
        g.schedule();
        let p = emit(&g);
        let pool = first_op(&p, TapeOp::MaxPool);
        assert!(pool.inputs[1].as_reg().unwrap().is_some());
        // No scratch free directly after the pool in this form.
        let pool_at = p
            .instructions
            .iter()
            .position(|i| i.op == TapeOp::MaxPool)
            .unwrap();
        assert_ne!(p.instructions[pool_at + 1].op, TapeOp::Free);
    }

    #[test]
    fn softmax_negative_axis_remaps_to_one() {
        let (mut g, node, ..) = single_node_graph(OpKind::Softmax, 1, 1);
        g.node_mut(node).set_attr("axis", AttrValue::Int(-1));
        let p = emit(&g);
        assert_eq!(first_op(&p, TapeOp::Softmax).inputs[2], Operand::Int(1));
    }

    #[test]
    fn slice_defaults_axes_to_iota() {
        let (mut g, node, ..) = single_node_graph(OpKind::Slice, 1, 1);
        g.node_mut(node)
            .set_attr("starts", AttrValue::Ints(vec![0, 1]));
        g.node_mut(node)
            .set_attr("ends", AttrValue::Ints(vec![2, 3]));
        let p = emit(&g);
        assert_eq!(
            first_op(&p, TapeOp::Slice).inputs[2],
            Operand::IntList(vec![0, 1])
        );
    }

    #[test]
    fn batch_normalization_remaps_opaque_saved_state() {
        let mut g = Graph::new("test");
        let ins: Vec<ValueId> = (0..5)
            .map(|i| g.add_input_value(&alloc::format!("in{i}"), ValueType::unknown()))
            .collect();
        let y = g.add_output_value("y", ValueType::unknown());
        let saved = g.add_value("saved", ValueType::opaque(), ValueKind::OUTPUT);
        g.add_node(OpKind::BatchNormalization, &ins, &[y, saved], "");
        g.schedule();
        let p = emit(&g);
        let bn = first_op(&p, TapeOp::BatchNormalization);
        let y_reg = bn.inputs[0].as_reg().unwrap();
        let saved_reg = bn.inputs[1].as_reg().unwrap();
        assert!(y_reg.is_some());
        assert!(saved_reg.is_some());
        for slot in 2..6 {
            assert_eq!(bn.inputs[slot], Operand::Reg(RegId::NONE));
        }
    }

    #[test]
    fn sequence_append_fast_path_moves_single_user() {
        let mut g = Graph::new("test");
        let seq = g.add_input_value("seq", ValueType::sequence());
        let item = g.add_input_value("item", ValueType::unknown());
        let out = g.add_output_value("out", ValueType::sequence());
        g.add_node(OpKind::SequenceAppend, &[seq, item], &[out], "");
        g.schedule();
        let p = emit(&g);
        let ops = ops_of(&p);
        assert!(ops.contains(&TapeOp::SequenceMove));
        assert!(!ops.contains(&TapeOp::SequenceCopy));
    }

    #[test]
    fn sequence_append_copies_for_shared_sequences() {
        let mut g = Graph::new("test");
        let seq = g.add_input_value("seq", ValueType::sequence());
        let item = g.add_input_value("item", ValueType::unknown());
        let out = g.add_output_value("out", ValueType::sequence());
        let size = g.add_output_value("size", ValueType::unknown());
        g.add_node(OpKind::SequenceAppend, &[seq, item], &[out], "");
        g.add_node(OpKind::SequenceSize, &[seq], &[size], "");
        g.schedule();
        let p = emit(&g);
        let ops = ops_of(&p);
        assert!(ops.contains(&TapeOp::SequenceCopy));
        assert!(!ops.contains(&TapeOp::SequenceMove));
    }

    #[test]
    fn sequence_concat_allocates_and_frees_length_scratch() {
        let mut g = Graph::new("test");
        let seq = g.add_input_value("seq", ValueType::sequence());
        let y = g.add_output_value("y", ValueType::unknown());
        g.add_node(OpKind::SequenceConcat, &[seq], &[y], "");
        g.schedule();
        let p = emit(&g);
        let at = p
            .instructions
            .iter()
            .position(|i| i.op == TapeOp::SequenceConcat)
            .unwrap();
        let scratch = p.instructions[at].inputs[1].as_reg().unwrap();
        assert_eq!(p.instructions[at + 1].op, TapeOp::Free);
        assert_eq!(p.instructions[at + 1].inputs[0].as_reg().unwrap(), scratch);
    }

    #[test]
    fn float_scalar_constant_lowering() {
        let mut g = Graph::new("test");
        let y = g.add_output_value("y", ValueType::unknown());
        let n = g.add_node(OpKind::Constant, &[], &[y], "");
        g.node_mut(n).set_attr(
            "value",
            AttrValue::Tensor(Tensor::from_f32s("c", vec![], &[2.5]).unwrap()),
        );
        g.schedule();
        let p = emit(&g);
        let c = first_op(&p, TapeOp::FloatScalarConstant);
        assert_eq!(c.inputs[1], Operand::Float(2.5));
        assert_eq!(c.inputs[2], Operand::Int(1)); // float32 code
        assert_eq!(c.inputs[3], Operand::Int(0)); // not host-resident
    }

    #[test]
    fn int_vector_constant_is_host_only_for_int64() {
        let mut g = Graph::new("test");
        let y = g.add_output_value("y", ValueType::unknown());
        let n = g.add_node(OpKind::Constant, &[], &[y], "");
        g.node_mut(n).set_attr(
            "value",
            AttrValue::Tensor(Tensor::from_i64s("c", vec![2], &[3, 4]).unwrap()),
        );
        g.schedule();
        let p = emit(&g);
        let c = first_op(&p, TapeOp::IntConstant);
        assert_eq!(c.inputs[1], Operand::IntList(vec![3, 4]));
        assert_eq!(c.inputs[3], Operand::Shape(vec![2]));
        assert_eq!(c.inputs[4], Operand::Int(1));

        let mut g = Graph::new("test");
        let y = g.add_output_value("y", ValueType::unknown());
        let n = g.add_node(OpKind::Constant, &[], &[y], "");
        g.node_mut(n).set_attr(
            "value",
            AttrValue::Tensor(Tensor::from_i32s("c", vec![2], &[3, 4]).unwrap()),
        );
        g.schedule();
        let p = emit(&g);
        assert_eq!(
            first_op(&p, TapeOp::IntConstant).inputs[4],
            Operand::Int(0)
        );
    }

    #[test]
    fn sequence_constants_appends_then_frees_each_tensor() {
        let mut g = Graph::new("test");
        let y = g.add_output_value("y", ValueType::sequence());
        let n = g.add_node(OpKind::SequenceConstants, &[], &[y], "");
        g.node_mut(n).set_attr(
            "value",
            AttrValue::Tensors(vec![
                Tensor::from_i64s("a", vec![], &[1]).unwrap(),
                Tensor::from_i64s("b", vec![], &[2]).unwrap(),
            ]),
        );
        g.schedule();
        let p = emit(&g);
        let ops = ops_of(&p);
        assert_eq!(
            &ops[..7],
            &[
                TapeOp::IntScalarConstant,
                TapeOp::IntScalarConstant,
                TapeOp::SequenceCreate,
                TapeOp::SequenceAppend,
                TapeOp::Free,
                TapeOp::SequenceAppend,
                TapeOp::Free,
            ]
        );
    }

    #[test]
    fn constant_rejects_unknown_width_and_huge_dims() {
        let mut g = Graph::new("test");
        let y = g.add_output_value("y", ValueType::unknown());
        let n = g.add_node(OpKind::Constant, &[], &[y], "");
        g.node_mut(n).set_attr(
            "value",
            AttrValue::Tensor(Tensor::new("c", crate::dtype::Dtype::Float16, vec![1], vec![0, 0]).unwrap()),
        );
        g.schedule();
        assert!(matches!(
            emit_model(&g, &CompilerOptions::default(), None, None).unwrap_err(),
            EmitError::BadConstant { .. }
        ));
    }

    #[test]
    fn rnn_encodes_direction() {
        let mut g = Graph::new("test");
        let x = g.add_input_value("x", ValueType::unknown());
        let w = g.add_input_value("w", ValueType::unknown());
        let r = g.add_input_value("r", ValueType::unknown());
        let y = g.add_output_value("y", ValueType::unknown());
        let n = g.add_node(OpKind::Rnn, &[x, w, r], &[y], "");
        g.node_mut(n)
            .set_attr("direction", AttrValue::Str("bidirectional".into()));
        g.node_mut(n).set_attr("hidden_size", AttrValue::Int(8));
        g.schedule();
        let p = emit(&g);
        let rnn = first_op(&p, TapeOp::Rnn);
        assert_eq!(rnn.inputs[8], Operand::Int(8));
        assert_eq!(rnn.inputs[9], Operand::Int(2));

        let mut g = Graph::new("test");
        let x = g.add_input_value("x", ValueType::unknown());
        let w = g.add_input_value("w", ValueType::unknown());
        let r = g.add_input_value("r", ValueType::unknown());
        let y = g.add_output_value("y", ValueType::unknown());
        let n = g.add_node(OpKind::Rnn, &[x, w, r], &[y], "");
        g.node_mut(n)
            .set_attr("direction", AttrValue::Str("sideways".into()));
        g.schedule();
        assert!(matches!(
            emit_model(&g, &CompilerOptions::default(), None, None).unwrap_err(),
            EmitError::UnknownDirection { .. }
        ));
    }

    #[test]
    fn pad_requires_constant_mode_and_keeps_raw_pads() {
        let (mut g, node, ..) = single_node_graph(OpKind::Pad, 1, 1);
        g.node_mut(node)
            .set_attr("pads", AttrValue::Ints(vec![0, 1, 2, 3]));
        let p = emit(&g);
        // Pad keeps the full 2N pads, unlike conv/pool lowerings.
        assert_eq!(
            first_op(&p, TapeOp::Pad).inputs[2],
            Operand::IntList(vec![0, 1, 2, 3])
        );

        let (mut g, node, ..) = single_node_graph(OpKind::Pad, 1, 1);
        g.node_mut(node)
            .set_attr("mode", AttrValue::Str("reflect".into()));
        assert!(matches!(
            emit_model(&g, &CompilerOptions::default(), None, None).unwrap_err(),
            EmitError::UnsupportedPadMode { .. }
        ));
    }
}
