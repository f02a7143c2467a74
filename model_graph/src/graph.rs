// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The graph container: value and node arenas with producer/user edges.
//!
//! Values and nodes live in two dense arenas indexed by [`ValueId`] and
//! [`NodeId`]; producer and user edges are index fields, so edge updates are
//! O(1) and the value/node cross-references cannot form ownership cycles.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Write as _;

use hashbrown::HashMap;

use crate::def::{AttrDef, GraphDef, NodeDef, ValueInfoDef};
use crate::node::{AttrValue, Node, NodeId, OpKind};
use crate::value::{TypeKind, Value, ValueId, ValueKind, ValueType};

/// Graph construction and query errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A declared value name appeared twice.
    DuplicateValueName {
        /// The duplicated name.
        name: String,
    },
    /// An initializer names no declared value.
    UnknownInitializerTarget {
        /// The initializer name.
        name: String,
    },
    /// An initializer names a value that is not a graph input.
    InitializerForNonInput {
        /// The initializer name.
        name: String,
        /// The kind of the named value.
        kind: String,
    },
    /// A node declared an operator this compiler does not know.
    UnknownOpType {
        /// The operator name from the def.
        op_type: String,
    },
    /// No nested subgraph carries the requested name.
    SubgraphNotFound {
        /// The requested subgraph name.
        name: String,
    },
    /// More than one nested subgraph carries the requested name.
    DuplicateSubgraph {
        /// The requested subgraph name.
        name: String,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateValueName { name } => write!(f, "duplicated value name: {name}"),
            Self::UnknownInitializerTarget { name } => {
                write!(f, "invalid name for an initializer: {name}")
            }
            Self::InitializerForNonInput { name, kind } => {
                write!(f, "only an input can have an initializer, but {name} is {kind}")
            }
            Self::UnknownOpType { op_type } => write!(f, "unknown operator: {op_type}"),
            Self::SubgraphNotFound { name } => write!(f, "no subgraph found for name: {name}"),
            Self::DuplicateSubgraph { name } => {
                write!(f, "two subgraphs found for name: {name}")
            }
        }
    }
}

impl core::error::Error for GraphError {}

/// A model graph: value/node arenas plus ordered input/output/temp lists.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    name: String,
    doc_string: String,
    values: Vec<Value>,
    nodes: Vec<Node>,
    input_values: Vec<ValueId>,
    output_values: Vec<ValueId>,
    temp_values: Vec<ValueId>,
    gen_id: u64,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds a graph from a def.
    ///
    /// A duplicate-named declared output is resolved by inserting an
    /// `Identity` node from the already-defined value; duplicate input/temp
    /// names and bad initializer targets fail construction. Node operands
    /// that name no declared value are auto-created as temps.
    pub fn from_def(def: &GraphDef) -> Result<Self, GraphError> {
        let mut g = Self::new(&def.name);
        g.doc_string = def.doc_string.clone();

        let mut by_name: HashMap<String, ValueId> = HashMap::new();
        for info in &def.inputs {
            if by_name.contains_key(&info.name) {
                return Err(GraphError::DuplicateValueName {
                    name: info.name.clone(),
                });
            }
            let id = g.add_value(&info.name, info.ty.clone(), ValueKind::INPUT);
            g.values[id.index()].doc_string = info.doc_string.clone();
            by_name.insert(info.name.clone(), id);
        }
        for info in &def.outputs {
            let id = g.add_value(&info.name, info.ty.clone(), ValueKind::OUTPUT);
            g.values[id.index()].doc_string = info.doc_string.clone();
            if let Some(&existing) = by_name.get(&info.name) {
                // An output may coincide with an internal value; preserve SSA
                // by copying through an Identity node.
                g.add_node(OpKind::Identity, &[existing], &[id], "");
            } else {
                by_name.insert(info.name.clone(), id);
            }
        }
        for info in &def.value_infos {
            match by_name.get(&info.name).copied() {
                Some(existing) if g.values[existing.index()].is_output() => {
                    // The internal value shares its name with a declared
                    // output. Keep value names unique: user nodes read/write a
                    // fresh temp, and an Identity copies it into the output
                    // slot.
                    let tmp_name = g.gen_sym(&info.name);
                    let id = g.add_value(&tmp_name, info.ty.clone(), ValueKind::TEMP);
                    g.values[id.index()].doc_string = info.doc_string.clone();
                    g.add_node(OpKind::Identity, &[id], &[existing], "");
                    by_name.insert(info.name.clone(), id);
                }
                Some(_) => {
                    return Err(GraphError::DuplicateValueName {
                        name: info.name.clone(),
                    });
                }
                None => {
                    let id = g.add_value(&info.name, info.ty.clone(), ValueKind::TEMP);
                    g.values[id.index()].doc_string = info.doc_string.clone();
                    by_name.insert(info.name.clone(), id);
                }
            }
        }

        for tensor in &def.initializers {
            let Some(&id) = by_name.get(tensor.name()) else {
                return Err(GraphError::UnknownInitializerTarget {
                    name: tensor.name().to_string(),
                });
            };
            let value = &mut g.values[id.index()];
            if !value.is_input() {
                return Err(GraphError::InitializerForNonInput {
                    name: tensor.name().to_string(),
                    kind: value.kind().to_string(),
                });
            }
            value.initializer = Some(tensor.clone());
        }

        for ndef in &def.nodes {
            let mut resolve = |g: &mut Self, name: &str| -> ValueId {
                if let Some(&id) = by_name.get(name) {
                    return id;
                }
                let id = g.add_value(name, ValueType::unknown(), ValueKind::TEMP);
                by_name.insert(name.to_string(), id);
                id
            };
            let inputs: Vec<ValueId> = ndef.inputs.iter().map(|n| resolve(&mut g, n)).collect();
            let outputs: Vec<ValueId> = ndef.outputs.iter().map(|n| resolve(&mut g, n)).collect();

            let Some(op) = OpKind::from_str(&ndef.op_type) else {
                return Err(GraphError::UnknownOpType {
                    op_type: ndef.op_type.clone(),
                });
            };
            let name = if ndef.name.is_empty() {
                g.gen_sym(&ndef.op_type)
            } else {
                ndef.name.clone()
            };
            let node_id = g.add_node_named(name, op, inputs, outputs);
            g.nodes[node_id.index()].doc_string = ndef.doc_string.clone();

            for (aname, adef) in &ndef.attrs {
                match adef {
                    AttrDef::Graph(sub_def) => {
                        let sub = Self::from_def(sub_def)?;
                        let node = &mut g.nodes[node_id.index()];
                        match aname.as_str() {
                            "then_branch" => node.then_branch = Some(Box::new(sub)),
                            "else_branch" => node.else_branch = Some(Box::new(sub)),
                            "body" => node.body = Some(Box::new(sub)),
                            _ => node.subgraph = Some(Box::new(sub)),
                        }
                    }
                    AttrDef::Int(v) if aname == "order" => {
                        g.nodes[node_id.index()].order = *v;
                    }
                    _ => {
                        let value = attr_from_def(adef);
                        g.nodes[node_id.index()].set_attr(aname, value);
                    }
                }
            }
        }

        Ok(g)
    }

    /// Serializes the graph back into a def.
    ///
    /// Values are grouped by kind (null values are skipped), initializers
    /// ride alongside their inputs, and nodes appear in storage order.
    #[must_use]
    pub fn to_def(&self) -> GraphDef {
        let mut def = GraphDef {
            name: self.name.clone(),
            doc_string: self.doc_string.clone(),
            ..GraphDef::default()
        };
        for value in &self.values {
            let mut info = ValueInfoDef::new(value.name(), value.ty().clone());
            info.doc_string = value.doc_string().to_string();
            if value.is_input() {
                def.inputs.push(info);
            } else if value.is_output() {
                def.outputs.push(info);
            } else if value.is_temp() && !value.is_null() {
                def.value_infos.push(info);
            } else {
                continue;
            }
            if let Some(init) = value.initializer() {
                def.initializers.push(init.clone());
            }
        }
        for node in &self.nodes {
            let mut ndef = NodeDef {
                name: node.name().to_string(),
                op_type: node.op().as_str().to_string(),
                inputs: node
                    .inputs()
                    .iter()
                    .map(|&v| self.values[v.index()].name().to_string())
                    .collect(),
                outputs: node
                    .outputs()
                    .iter()
                    .map(|&v| self.values[v.index()].name().to_string())
                    .collect(),
                attrs: Vec::new(),
                doc_string: node.doc_string.clone(),
            };
            for (aname, value) in node.attrs() {
                ndef.attrs.push((aname.to_string(), attr_to_def(value)));
            }
            if node.order() >= 0 {
                ndef.attrs.push(("order".to_string(), AttrDef::Int(node.order())));
            }
            for (field, sub) in [
                ("subgraph", node.subgraph()),
                ("then_branch", node.then_branch()),
                ("else_branch", node.else_branch()),
                ("body", node.body()),
            ] {
                if let Some(sub) = sub {
                    ndef.attrs.push((field.to_string(), AttrDef::Graph(sub.to_def())));
                }
            }
            def.nodes.push(ndef);
        }
        def
    }

    /// Graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves a value id.
    ///
    /// # Panics
    /// Panics if `id` is not from this graph.
    #[must_use]
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    /// Resolves a node id.
    ///
    /// # Panics
    /// Panics if `id` is not from this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutable access to a node (attributes, subgraphs, schedule order).
    ///
    /// Input/output lists must not be edited through this handle; edge
    /// maintenance is the graph's job.
    #[must_use]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Declared inputs, in declaration order.
    #[must_use]
    pub fn input_values(&self) -> &[ValueId] {
        &self.input_values
    }

    /// Declared outputs, in declaration order.
    #[must_use]
    pub fn output_values(&self) -> &[ValueId] {
        &self.output_values
    }

    /// Intermediate values, in creation order.
    #[must_use]
    pub fn temp_values(&self) -> &[ValueId] {
        &self.temp_values
    }

    /// All value ids, in arena order.
    pub fn value_ids(&self) -> impl Iterator<Item = ValueId> {
        (0..self.values.len()).map(|i| ValueId(i as u32))
    }

    /// All node ids, in arena order (including detached nodes).
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// Non-detached nodes, in arena order.
    #[must_use]
    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| !self.nodes[id.index()].detached())
            .collect()
    }

    /// Adds a value of the given kind.
    ///
    /// An empty-named temp degrades to a pure null value; any other
    /// empty-named value composes the null bit.
    pub fn add_value(&mut self, name: &str, ty: ValueType, kind: ValueKind) -> ValueId {
        let kind = if name.is_empty() && kind == ValueKind::TEMP {
            ValueKind::NULL
        } else {
            kind
        };
        let id = ValueId(u32::try_from(self.values.len()).unwrap_or(u32::MAX));
        self.values.push(Value::new(name, ty, kind));
        if kind == ValueKind::INPUT {
            self.input_values.push(id);
        } else if kind == ValueKind::OUTPUT {
            self.output_values.push(id);
        } else if kind == ValueKind::TEMP {
            self.temp_values.push(id);
        }
        id
    }

    /// Adds a graph input.
    pub fn add_input_value(&mut self, name: &str, ty: ValueType) -> ValueId {
        self.add_value(name, ty, ValueKind::INPUT)
    }

    /// Adds a graph output.
    pub fn add_output_value(&mut self, name: &str, ty: ValueType) -> ValueId {
        self.add_value(name, ty, ValueKind::OUTPUT)
    }

    /// Adds an intermediate value.
    pub fn add_temp_value(&mut self, name: &str, ty: ValueType) -> ValueId {
        self.add_value(name, ty, ValueKind::TEMP)
    }

    /// Adds a null value for an absent optional slot.
    pub fn add_null_value(&mut self) -> ValueId {
        self.add_value("", ValueType::unknown(), ValueKind::NULL)
    }

    /// Adds a node, wiring user/producer edges.
    ///
    /// The node name is generated from `base` (or the op name when `base` is
    /// empty).
    pub fn add_node(
        &mut self,
        op: OpKind,
        inputs: &[ValueId],
        outputs: &[ValueId],
        base: &str,
    ) -> NodeId {
        let base = if base.is_empty() { op.as_str() } else { base };
        let name = self.gen_sym(base);
        self.add_node_named(name, op, inputs.to_vec(), outputs.to_vec())
    }

    fn add_node_named(
        &mut self,
        name: String,
        op: OpKind,
        inputs: Vec<ValueId>,
        outputs: Vec<ValueId>,
    ) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        for &input in &inputs {
            self.values[input.index()].users.push(id);
        }
        for &output in &outputs {
            self.values[output.index()].producer = Some(id);
        }
        self.nodes.push(Node::new(name, op, inputs, outputs));
        id
    }

    /// Detaches a node: user/producer edges are removed, the node stays in
    /// storage but is ignored by every traversal.
    pub fn detach_node(&mut self, node: NodeId) {
        let inputs = self.nodes[node.index()].inputs.clone();
        let outputs = self.nodes[node.index()].outputs.clone();
        for input in inputs {
            self.values[input.index()].detach_user(node);
        }
        for output in outputs {
            let value = &mut self.values[output.index()];
            if value.producer == Some(node) {
                value.producer = None;
            }
        }
        self.nodes[node.index()].detached = true;
    }

    /// Returns a fresh symbol `"{base}_gensym_{n}"` (or `"gensym_{n}"` for an
    /// empty base).
    pub fn gen_sym(&mut self, base: &str) -> String {
        self.gen_id += 1;
        if base.is_empty() {
            format!("gensym_{}", self.gen_id)
        } else {
            format!("{base}_gensym_{}", self.gen_id)
        }
    }

    /// Number of non-null inputs of `node`.
    #[must_use]
    pub fn actual_input_count(&self, node: NodeId) -> usize {
        self.nodes[node.index()]
            .inputs()
            .iter()
            .filter(|&&v| !self.values[v.index()].is_null())
            .count()
    }

    /// Topological order over all nodes reachable from the declared inputs.
    ///
    /// The worklist starts from the declared inputs plus every node with no
    /// actual (non-null) inputs; detached nodes are ignored.
    #[must_use]
    pub fn topologically_sorted_nodes(&self) -> Vec<NodeId> {
        let mut queue: VecDeque<ValueId> = self.input_values.iter().copied().collect();
        let mut input_counts: BTreeMap<NodeId, usize> = BTreeMap::new();
        for node in self.live_nodes() {
            input_counts.insert(node, self.actual_input_count(node));
        }

        let mut sorted: Vec<NodeId> = Vec::new();
        for (&node, &count) in &input_counts {
            if count == 0 {
                sorted.push(node);
                for &output in self.nodes[node.index()].outputs() {
                    queue.push_back(output);
                }
            }
        }

        while let Some(value) = queue.pop_front() {
            for &user in self.values[value.index()].users() {
                let Some(count) = input_counts.get_mut(&user) else {
                    continue;
                };
                if *count == 0 {
                    continue;
                }
                *count -= 1;
                if *count == 0 {
                    sorted.push(user);
                    for &output in self.nodes[user.index()].outputs() {
                        queue.push_back(output);
                    }
                }
            }
        }
        sorted
    }

    /// Values reachable backwards from `outputs` through producer edges.
    #[must_use]
    pub fn necessary_values(&self, outputs: &[ValueId]) -> BTreeSet<ValueId> {
        let mut queue: VecDeque<ValueId> = outputs.iter().copied().collect();
        let mut seen: BTreeSet<ValueId> = BTreeSet::new();
        while let Some(value) = queue.pop_front() {
            if let Some(producer) = self.values[value.index()].producer() {
                for &input in self.nodes[producer.index()].inputs() {
                    if seen.insert(input) {
                        queue.push_back(input);
                    }
                }
            }
        }
        seen
    }

    /// Nodes needed to compute `outputs`, mapped to their pending-input
    /// counts.
    ///
    /// Seeds are the output producers, every sink node (empty output list)
    /// adjacent to a discovered value, and every `BackpropStackPush` node.
    #[must_use]
    pub fn necessary_nodes_and_input_counts(&self, outputs: &[ValueId]) -> BTreeMap<NodeId, usize> {
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for &output in outputs {
            if let Some(producer) = self.values[output.index()].producer() {
                queue.push_back(producer);
            }
        }
        for node in self.node_ids() {
            if self.nodes[node.index()].op() == OpKind::BackpropStackPush {
                queue.push_back(node);
            }
        }

        let mut input_counts: BTreeMap<NodeId, usize> = BTreeMap::new();
        while let Some(node) = queue.pop_front() {
            if input_counts
                .insert(node, self.actual_input_count(node))
                .is_some()
            {
                continue;
            }
            for &input in self.nodes[node.index()].inputs() {
                if let Some(producer) = self.values[input.index()].producer() {
                    queue.push_back(producer);
                }
                for &user in self.values[input.index()].users() {
                    if self.nodes[user.index()].outputs().is_empty() {
                        queue.push_back(user);
                    }
                }
            }
            // Sinks hanging off our outputs are always necessary (e.g. Print).
            for &output in self.nodes[node.index()].outputs() {
                for &user in self.values[output.index()].users() {
                    if self.nodes[user.index()].outputs().is_empty() {
                        queue.push_back(user);
                    }
                }
            }
        }
        input_counts
    }

    /// The externally provided schedule: nodes with `order >= 0`, ascending.
    #[must_use]
    pub fn computation_sequence(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .node_ids()
            .filter(|&id| !self.nodes[id.index()].detached() && self.nodes[id.index()].order() >= 0)
            .collect();
        nodes.sort_by_key(|&id| self.nodes[id.index()].order());
        nodes
    }

    /// Assigns schedule ranks from the topological order.
    ///
    /// This is a convenience for pipelines without a dedicated scheduler
    /// pass; a freshly built graph becomes emittable.
    pub fn schedule(&mut self) {
        for (rank, node) in self.topologically_sorted_nodes().into_iter().enumerate() {
            self.nodes[node.index()].order = i64::try_from(rank).unwrap_or(i64::MAX);
        }
    }

    /// Finds the unique directly nested subgraph named `name`.
    pub fn get_subgraph(&self, name: &str) -> Result<&Graph, GraphError> {
        let mut found: Option<&Graph> = None;
        for node in &self.nodes {
            for sub in node.subgraphs() {
                if sub.name() == name {
                    if found.is_some() {
                        return Err(GraphError::DuplicateSubgraph { name: name.into() });
                    }
                    found = Some(sub);
                }
            }
        }
        found.ok_or_else(|| GraphError::SubgraphNotFound { name: name.into() })
    }

    /// Attaches a gradient peer, synchronizing its type when the shape is
    /// known.
    pub fn set_grad(&mut self, value: ValueId, grad: Option<ValueId>) {
        self.values[value.index()].grad = grad;
        if let Some(grad) = grad {
            let ty = self.values[value.index()].ty.clone();
            if ty.kind != TypeKind::Tensor || ty.has_known_shape() {
                self.values[grad.index()].ty = ty;
            }
        }
    }

    /// Clears all gradient links, restoring each peer's type from its value.
    pub fn reset_gradients(&mut self) {
        for index in 0..self.values.len() {
            if let Some(grad) = self.values[index].grad {
                let ty = self.values[index].ty.clone();
                self.values[grad.index()].ty = ty;
                self.values[index].grad = None;
            }
        }
    }

    /// Renders the subgraph nesting tree, one name per line.
    #[must_use]
    pub fn dump_subgraphs(&self) -> String {
        let mut out = String::new();
        self.dump_subgraphs_into(&mut out, 0);
        out
    }

    fn dump_subgraphs_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push(' ');
        }
        let _ = writeln!(out, "{}", self.name);
        for node in &self.nodes {
            for sub in node.subgraphs() {
                sub.dump_subgraphs_into(out, depth + 1);
            }
        }
    }
}

fn attr_from_def(def: &AttrDef) -> AttrValue {
    match def {
        AttrDef::Int(v) => AttrValue::Int(*v),
        AttrDef::Ints(v) => AttrValue::Ints(v.clone()),
        AttrDef::Float(v) => AttrValue::Float(*v),
        AttrDef::Floats(v) => AttrValue::Floats(v.clone()),
        AttrDef::Str(v) => AttrValue::Str(v.clone()),
        AttrDef::Strs(v) => AttrValue::Strs(v.clone()),
        AttrDef::Tensor(v) => AttrValue::Tensor(v.clone()),
        AttrDef::Tensors(v) => AttrValue::Tensors(v.clone()),
        AttrDef::Graph(_) => unreachable!("graph attributes are handled by the caller"),
    }
}

fn attr_to_def(value: &AttrValue) -> AttrDef {
    match value {
        AttrValue::Int(v) => AttrDef::Int(*v),
        AttrValue::Ints(v) => AttrDef::Ints(v.clone()),
        AttrValue::Float(v) => AttrDef::Float(*v),
        AttrValue::Floats(v) => AttrDef::Floats(v.clone()),
        AttrValue::Str(v) => AttrDef::Str(v.clone()),
        AttrValue::Strs(v) => AttrDef::Strs(v.clone()),
        AttrValue::Tensor(v) => AttrDef::Tensor(v.clone()),
        AttrValue::Tensors(v) => AttrDef::Tensors(v.clone()),
    }
}
