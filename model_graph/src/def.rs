// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory defs: the boundary structs external model loaders produce.
//!
//! A [`GraphDef`] is semantically equivalent to an ONNX `GraphProto` (typed
//! value infos, initializer tensors, attribute-bearing node protos, nested
//! graph attributes). Protobuf decoding lives outside this crate; loaders
//! build these plain structs and hand them to [`crate::graph::Graph::from_def`].

use alloc::string::String;
use alloc::vec::Vec;

use crate::tensor::Tensor;
use crate::value::ValueType;

/// A declared value: name plus type information.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueInfoDef {
    /// Value name.
    pub name: String,
    /// Declared type (kind, dtype, optional shape).
    pub ty: ValueType,
    /// Documentation string.
    pub doc_string: String,
}

impl ValueInfoDef {
    /// Creates a value info with an empty doc string.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            doc_string: String::new(),
        }
    }
}

/// An attribute value carried by a [`NodeDef`].
#[derive(Clone, Debug, PartialEq)]
pub enum AttrDef {
    /// Integer scalar.
    Int(i64),
    /// Integer list.
    Ints(Vec<i64>),
    /// Floating-point scalar.
    Float(f64),
    /// Floating-point list.
    Floats(Vec<f64>),
    /// String.
    Str(String),
    /// String list.
    Strs(Vec<String>),
    /// Tensor payload.
    Tensor(Tensor),
    /// Tensor-list payload.
    Tensors(Vec<Tensor>),
    /// Nested graph (control-flow bodies).
    Graph(GraphDef),
}

/// An operator instance as declared by the loader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeDef {
    /// Node name; auto-generated when empty.
    pub name: String,
    /// Operator name (see [`crate::node::OpKind`]).
    pub op_type: String,
    /// Input value names; empty strings denote absent optional slots.
    pub inputs: Vec<String>,
    /// Output value names; empty strings denote absent optional slots.
    pub outputs: Vec<String>,
    /// Attribute bag.
    pub attrs: Vec<(String, AttrDef)>,
    /// Documentation string.
    pub doc_string: String,
}

/// A model graph as declared by the loader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphDef {
    /// Graph name.
    pub name: String,
    /// Documentation string.
    pub doc_string: String,
    /// Declared inputs.
    pub inputs: Vec<ValueInfoDef>,
    /// Declared outputs.
    pub outputs: Vec<ValueInfoDef>,
    /// Declared intermediate values.
    pub value_infos: Vec<ValueInfoDef>,
    /// Initializer tensors; each must name a declared input.
    pub initializers: Vec<Tensor>,
    /// Operator instances in declaration order.
    pub nodes: Vec<NodeDef>,
}
