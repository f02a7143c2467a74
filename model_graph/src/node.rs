// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graph nodes: operator instances with attribute bags and nested subgraphs.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::graph::Graph;
use crate::tensor::Tensor;
use crate::value::ValueId;

/// Index of a node within its graph's node arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

macro_rules! op_kinds {
    ($($name:ident),* $(,)?) => {
        /// Operator kind: the ONNX subset this compiler lowers plus the
        /// private extension set (sequence/generic/gradient ops, fusion
        /// groups, print, backprop stack markers).
        #[allow(missing_docs)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum OpKind {
            $($name,)*
        }

        impl OpKind {
            /// The operator name as it appears in defs.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }

            /// Parses an operator name from a def.
            #[must_use]
            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $(stringify!($name) => Some(Self::$name),)*
                    _ => None,
                }
            }
        }
    };
}

op_kinds! {
    Abs,
    Add,
    And,
    ArgMax,
    AveragePool,
    AveragePoolGrad,
    BackpropStackPop,
    BackpropStackPush,
    BatchNormalization,
    BatchNormalizationGrad,
    Cast,
    Ceil,
    Clip,
    Concat,
    Constant,
    ConstantFill,
    Conv,
    ConvGradWeight,
    ConvTranspose,
    ConvTransposeWithDynamicShape,
    Div,
    Dropout,
    DynamicSlice,
    DynamicSliceGrad,
    Elu,
    Equal,
    Exp,
    Expand,
    Floor,
    FusionGroup,
    Gather,
    GatherGrad,
    Gemm,
    GenericAccumulateGrad,
    GenericAdd,
    GenericGetItem,
    GenericGetSlice,
    GenericIs,
    GenericLen,
    Greater,
    Gru,
    Hardmax,
    Identity,
    If,
    LeakyRelu,
    Linear,
    LinearGradWeight,
    Log,
    LogSoftmax,
    Loop,
    Lrn,
    LrnGrad,
    Lstm,
    LstmGrad,
    MatMul,
    Max,
    MaxPool,
    MaxPoolGrad,
    Mul,
    Neg,
    Not,
    NullConstant,
    OneHot,
    Or,
    Pad,
    Pow,
    Print,
    Reciprocal,
    ReduceMax,
    ReduceMean,
    ReduceSum,
    ReduceSumSquare,
    ReduceSumTo,
    Relu,
    ReluGrad,
    Reshape,
    Rnn,
    SelectItem,
    SelectItemGrad,
    SequenceAppend,
    SequenceConcat,
    SequenceConstants,
    SequenceCreate,
    SequenceGetSlice,
    SequenceGetSliceGrad,
    SequenceLengths,
    SequenceLookup,
    SequenceLookupGrad,
    SequencePad,
    SequencePop,
    SequenceRange,
    SequenceSeparate,
    SequenceSize,
    SequenceSplitAxis,
    SequenceStack,
    SequenceUnpad,
    Selu,
    Shape,
    Sigmoid,
    Size,
    Slice,
    Softmax,
    Split,
    Sqrt,
    Squeeze,
    Sub,
    Tanh,
    Transpose,
    Unsqueeze,
    Xor,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A variant-typed attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// Integer scalar (also used for booleans).
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
    /// Tensor (e.g. the payload of a `Constant` node).
    Tensor(Tensor),
    /// Tensor list (e.g. the payload of a `SequenceConstants` node).
    Tensors(Vec<Tensor>),
}

/// An operator instance.
///
/// Nested subgraphs (`subgraph`, `then_branch`, `else_branch`, `body`) are
/// owned by the node. `order` is the externally assigned schedule rank; `-1`
/// means unscheduled. Detached nodes remain in storage but are excluded from
/// every traversal.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) op: OpKind,
    pub(crate) inputs: Vec<ValueId>,
    pub(crate) outputs: Vec<ValueId>,
    pub(crate) attrs: Vec<(Box<str>, AttrValue)>,
    pub(crate) subgraph: Option<Box<Graph>>,
    pub(crate) then_branch: Option<Box<Graph>>,
    pub(crate) else_branch: Option<Box<Graph>>,
    pub(crate) body: Option<Box<Graph>>,
    pub(crate) order: i64,
    pub(crate) detached: bool,
    pub(crate) doc_string: String,
}

impl Node {
    pub(crate) fn new(
        name: impl Into<String>,
        op: OpKind,
        inputs: Vec<ValueId>,
        outputs: Vec<ValueId>,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            inputs,
            outputs,
            attrs: Vec::new(),
            subgraph: None,
            then_branch: None,
            else_branch: None,
            body: None,
            order: -1,
            detached: false,
            doc_string: String::new(),
        }
    }

    /// Unique node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator kind.
    #[must_use]
    pub fn op(&self) -> OpKind {
        self.op
    }

    /// Ordered input value ids (entries may reference null values).
    #[must_use]
    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    /// Ordered output value ids (entries may reference null values).
    #[must_use]
    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Schedule rank; `-1` when unscheduled.
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Sets the schedule rank.
    pub fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    /// Returns `true` if this node has been detached from the graph.
    #[must_use]
    pub fn detached(&self) -> bool {
        self.detached
    }

    /// A short summary used for instruction debug info.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{}({})", self.op.as_str(), self.name)
    }

    /// Raw attribute pairs in insertion order.
    #[must_use]
    pub fn attrs(&self) -> &[(Box<str>, AttrValue)] {
        &self.attrs
    }

    /// Sets (or replaces) an attribute.
    pub fn set_attr(&mut self, name: &str, value: AttrValue) {
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| n.as_ref() == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name.into(), value));
        }
    }

    fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Integer attribute.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer attribute with a default.
    #[must_use]
    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        self.get_int(name).unwrap_or(default)
    }

    /// Integer-list attribute; empty when absent.
    #[must_use]
    pub fn get_ints(&self, name: &str) -> Vec<i64> {
        match self.get(name) {
            Some(AttrValue::Ints(v)) => v.clone(),
            _ => Vec::new(),
        }
    }

    /// Float attribute.
    #[must_use]
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Float attribute with a default.
    #[must_use]
    pub fn float_or(&self, name: &str, default: f64) -> f64 {
        self.get_float(name).unwrap_or(default)
    }

    /// Float-list attribute; empty when absent.
    #[must_use]
    pub fn get_floats(&self, name: &str) -> Vec<f64> {
        match self.get(name) {
            Some(AttrValue::Floats(v)) => v.clone(),
            _ => Vec::new(),
        }
    }

    /// String attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// String-list attribute; empty when absent.
    #[must_use]
    pub fn get_strs(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(AttrValue::Strs(v)) => v,
            _ => &[],
        }
    }

    /// Tensor attribute (e.g. `value` on a `Constant` node).
    #[must_use]
    pub fn get_tensor(&self, name: &str) -> Option<&Tensor> {
        match self.get(name)? {
            AttrValue::Tensor(v) => Some(v),
            _ => None,
        }
    }

    /// Tensor-list attribute; empty when absent.
    #[must_use]
    pub fn get_tensors(&self, name: &str) -> &[Tensor] {
        match self.get(name) {
            Some(AttrValue::Tensors(v)) => v,
            _ => &[],
        }
    }

    /// The `pads` attribute as declared (2N entries, begins then ends).
    #[must_use]
    pub fn pads(&self) -> Vec<i64> {
        self.get_ints("pads")
    }

    /// The `strides` attribute as declared.
    #[must_use]
    pub fn strides(&self) -> Vec<i64> {
        self.get_ints("strides")
    }

    /// The `dilations` attribute as declared.
    #[must_use]
    pub fn dilations(&self) -> Vec<i64> {
        self.get_ints("dilations")
    }

    /// The RNN `direction` attribute; empty when absent.
    #[must_use]
    pub fn direction(&self) -> &str {
        self.get_str("direction").unwrap_or("")
    }

    /// The fusion-group kind tag (`"tvm"`, `"nvrtc"`, or empty).
    #[must_use]
    pub fn fusion_type(&self) -> &str {
        self.get_str("fusion_type").unwrap_or("")
    }

    /// The fused-body subgraph of a `FusionGroup` node.
    #[must_use]
    pub fn subgraph(&self) -> Option<&Graph> {
        self.subgraph.as_deref()
    }

    /// Attaches the fused-body subgraph.
    pub fn set_subgraph(&mut self, graph: Graph) {
        self.subgraph = Some(Box::new(graph));
    }

    /// The `then` branch of an `If` node.
    #[must_use]
    pub fn then_branch(&self) -> Option<&Graph> {
        self.then_branch.as_deref()
    }

    /// Attaches the `then` branch.
    pub fn set_then_branch(&mut self, graph: Graph) {
        self.then_branch = Some(Box::new(graph));
    }

    /// The `else` branch of an `If` node.
    #[must_use]
    pub fn else_branch(&self) -> Option<&Graph> {
        self.else_branch.as_deref()
    }

    /// Attaches the `else` branch.
    pub fn set_else_branch(&mut self, graph: Graph) {
        self.else_branch = Some(Box::new(graph));
    }

    /// The body of a `Loop` node.
    #[must_use]
    pub fn body(&self) -> Option<&Graph> {
        self.body.as_deref()
    }

    /// Attaches the loop body.
    pub fn set_body(&mut self, graph: Graph) {
        self.body = Some(Box::new(graph));
    }

    /// All nested subgraphs, in field order.
    pub fn subgraphs(&self) -> impl Iterator<Item = &Graph> {
        self.subgraph
            .as_deref()
            .into_iter()
            .chain(self.then_branch.as_deref())
            .chain(self.else_branch.as_deref())
            .chain(self.body.as_deref())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::{AttrValue, Node, OpKind};

    #[test]
    fn op_kind_round_trips_names() {
        assert_eq!(OpKind::Conv.as_str(), "Conv");
        assert_eq!(OpKind::from_str("SequenceAppend"), Some(OpKind::SequenceAppend));
        assert_eq!(OpKind::from_str("NotAnOp"), None);
    }

    #[test]
    fn attr_accessors_are_typed() {
        let mut n = Node::new("n1", OpKind::Conv, vec![], vec![]);
        n.set_attr("pads", AttrValue::Ints(vec![1, 1, 1, 1]));
        n.set_attr("alpha", AttrValue::Float(0.5));
        n.set_attr("mode", AttrValue::Str("constant".into()));

        assert_eq!(n.pads(), vec![1, 1, 1, 1]);
        assert_eq!(n.get_float("alpha"), Some(0.5));
        assert_eq!(n.get_str("mode"), Some("constant"));
        // Wrong-typed reads come back empty rather than panicking.
        assert_eq!(n.get_int("alpha"), None);
        assert!(n.strides().is_empty());

        n.set_attr("alpha", AttrValue::Float(0.75));
        assert_eq!(n.get_float("alpha"), Some(0.75));
        assert_eq!(n.attrs().len(), 3);
    }

    #[test]
    fn summary_names_op_and_node() {
        let n = Node::new("Relu_gensym_4", OpKind::Relu, vec![], vec![]);
        assert_eq!(n.summary(), "Relu(Relu_gensym_4)");
    }
}
