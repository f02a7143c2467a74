// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The emitter: lowers a scheduled graph onto a linear tape program.
//!
//! One emission session is a single linear walk over an immutable graph (and
//! its nested subgraphs). The session owns the value→register map, allocates
//! scratch registers, and inserts `In`/`Out`/`Free` housekeeping so register
//! lifetimes form non-overlapping intervals by construction.

mod control;
mod lower;
pub mod options;

use alloc::collections::BTreeMap;
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use model_tape::builder::{TapeBuilder, UnresolvedLabel};
use model_tape::program::{RegId, TapeProgram};

use crate::graph::Graph;
use crate::node::{NodeId, OpKind};
use crate::value::{Value, ValueId};

pub use options::{
    BackendError, BufferLog, CompilerOptions, EmitLog, KernelBackend, NvrtcKernel, TvmKernel,
};

/// An emission failure. All variants abort the session; no partial program
/// is returned.
#[derive(Clone, Debug, PartialEq)]
pub enum EmitError {
    /// The dispatch table has no lowering for this operator.
    UnsupportedOp {
        /// The unsupported operator.
        op: OpKind,
    },
    /// A value was referenced before an id was assigned to it.
    UnregisteredValue {
        /// The value name.
        name: String,
    },
    /// A register was requested for an unnamed (null) value.
    EmptyValueName,
    /// A value received two register ids.
    DuplicateRegistration {
        /// The value name.
        name: String,
    },
    /// A mandatory input slot was missing or null.
    MandatoryInput {
        /// The operator.
        op: OpKind,
        /// The slot index.
        index: usize,
    },
    /// A mandatory output slot was missing or null.
    MandatoryOutput {
        /// The operator.
        op: OpKind,
        /// The slot index.
        index: usize,
    },
    /// Input/output arity did not match the operator's shape.
    Arity {
        /// The operator.
        op: OpKind,
        /// What was violated.
        detail: &'static str,
    },
    /// Pads were odd-length or asymmetric.
    BadPads {
        /// The node name.
        node: String,
    },
    /// A dilation other than 1 was requested.
    UnsupportedDilation {
        /// The node name.
        node: String,
    },
    /// `auto_pad` other than `NOTSET` on a pooling operator.
    UnsupportedAutoPad {
        /// The node name.
        node: String,
    },
    /// `Pad` with a mode other than `constant`.
    UnsupportedPadMode {
        /// The node name.
        node: String,
    },
    /// An RNN `direction` string was not recognized.
    UnknownDirection {
        /// The node name.
        node: String,
        /// The offending direction string.
        direction: String,
    },
    /// An attribute combination this lowering does not support.
    BadAttr {
        /// The node name.
        node: String,
        /// What was violated.
        detail: &'static str,
    },
    /// A `Loop` with neither trip count nor terminal condition.
    InfiniteLoop {
        /// The node name.
        node: String,
    },
    /// A constant tensor the lowering cannot materialize.
    BadConstant {
        /// The node name.
        node: String,
        /// What was violated.
        detail: &'static str,
    },
    /// A liveness counter was decremented past zero.
    UserCountUnderflow {
        /// The value name.
        value: String,
    },
    /// A fusion backend was selected but no backend collaborator was given.
    MissingBackend {
        /// The fusion-group node name.
        node: String,
    },
    /// The kernel backend reported a failure.
    Backend(BackendError),
    /// A jump label was never placed (emitter bug).
    UnresolvedLabel(UnresolvedLabel),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOp { op } => write!(f, "unsupported op: {op}"),
            Self::UnregisteredValue { name } => write!(f, "value does not exist: {name}"),
            Self::EmptyValueName => write!(f, "register requested for an unnamed value"),
            Self::DuplicateRegistration { name } => {
                write!(f, "value registered twice: {name}")
            }
            Self::MandatoryInput { op, index } => {
                write!(f, "input {index} of {op} is mandatory")
            }
            Self::MandatoryOutput { op, index } => {
                write!(f, "output {index} of {op} is mandatory")
            }
            Self::Arity { op, detail } => write!(f, "{op}: {detail}"),
            Self::BadPads { node } => {
                write!(f, "{node}: pads must pair symmetric begins and ends")
            }
            Self::UnsupportedDilation { node } => {
                write!(f, "{node}: dilation is not supported yet")
            }
            Self::UnsupportedAutoPad { node } => {
                write!(f, "{node}: auto_pad is not supported")
            }
            Self::UnsupportedPadMode { node } => {
                write!(f, "{node}: only constant padding is supported")
            }
            Self::UnknownDirection { node, direction } => {
                write!(f, "{node}: unknown direction: {direction}")
            }
            Self::BadAttr { node, detail } => write!(f, "{node}: {detail}"),
            Self::InfiniteLoop { node } => write!(f, "{node}: infinite loop is detected"),
            Self::BadConstant { node, detail } => write!(f, "{node}: {detail}"),
            Self::UserCountUnderflow { value } => {
                write!(f, "user count underflow for value: {value}")
            }
            Self::MissingBackend { node } => {
                write!(f, "{node}: fusion backend selected but none registered")
            }
            Self::Backend(e) => write!(f, "{e}"),
            Self::UnresolvedLabel(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Backend(e) => Some(e),
            Self::UnresolvedLabel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for EmitError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl From<UnresolvedLabel> for EmitError {
    fn from(e: UnresolvedLabel) -> Self {
        Self::UnresolvedLabel(e)
    }
}

/// Identity key for a value within one emission session.
///
/// Graphs are immutable and pinned for the whole session (nested graphs are
/// boxed inside their nodes), so value addresses are stable and fold every
/// subgraph into one register namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct ValueKey(*const Value);

impl ValueKey {
    fn of(value: &Value) -> Self {
        Self(core::ptr::from_ref(value))
    }
}

/// Identity key for a node within one emission session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeKey(*const crate::node::Node);

impl NodeKey {
    fn of(node: &crate::node::Node) -> Self {
        Self(core::ptr::from_ref(node))
    }
}

pub(crate) struct Emitter<'a> {
    pub(crate) opts: &'a CompilerOptions,
    pub(crate) backend: Option<&'a mut dyn KernelBackend>,
    pub(crate) log: Option<&'a mut dyn EmitLog>,
    pub(crate) b: TapeBuilder,
    next_value_id: i32,
    value_ids: HashMap<ValueKey, RegId>,
    value_table: Vec<(RegId, String, Option<i64>)>,
    /// Residual backprop-stack registers, freed at finalization. No pass in
    /// this crate populates the map; the drain is part of the VM contract.
    stack_ids: BTreeMap<i64, RegId>,
    emitted: HashSet<NodeKey>,
}

impl<'a> Emitter<'a> {
    fn new(
        opts: &'a CompilerOptions,
        backend: Option<&'a mut dyn KernelBackend>,
        log: Option<&'a mut dyn EmitLog>,
    ) -> Self {
        Self {
            opts,
            backend,
            log,
            b: TapeBuilder::new(),
            next_value_id: 1,
            value_ids: HashMap::new(),
            value_table: Vec::new(),
            stack_ids: BTreeMap::new(),
            emitted: HashSet::new(),
        }
    }

    pub(crate) fn log_line(&mut self, line: &str) {
        if self.opts.compiler_log
            && let Some(log) = self.log.as_deref_mut()
        {
            log.message(line);
        }
    }

    /// Allocates a fresh scratch register.
    pub(crate) fn alloc_reg(&mut self) -> RegId {
        let id = self.next_value_id;
        self.next_value_id += 1;
        RegId(id)
    }

    fn register_value(&mut self, value: &Value) -> Result<RegId, EmitError> {
        let reg = RegId(self.next_value_id);
        self.next_value_id += 1;
        if self.value_ids.insert(ValueKey::of(value), reg).is_some() {
            return Err(EmitError::DuplicateRegistration {
                name: value.name().to_string(),
            });
        }
        if self.opts.compiler_log {
            self.value_table
                .push((reg, value.name().to_string(), value.ty().nbytes()));
        }
        Ok(reg)
    }

    /// Assigns register ids for a graph: inputs, then temps, then outputs.
    /// Empty-named output slots are allowed and skipped.
    pub(crate) fn assign_graph_value_ids(&mut self, g: &Graph) -> Result<(), EmitError> {
        for &v in g.input_values() {
            self.register_value(g.value(v))?;
        }
        for &v in g.temp_values() {
            self.register_value(g.value(v))?;
        }
        for &v in g.output_values() {
            let value = g.value(v);
            if value.name().is_empty() {
                continue;
            }
            self.register_value(value)?;
        }
        Ok(())
    }

    /// Assigns register ids for an arbitrary value set (bare node-subset
    /// emission).
    pub(crate) fn assign_value_ids(
        &mut self,
        g: &Graph,
        values: &BTreeSet<ValueId>,
    ) -> Result<(), EmitError> {
        for &v in values {
            self.register_value(g.value(v))?;
        }
        Ok(())
    }

    /// The register assigned to `value`.
    pub(crate) fn reg_for(&self, value: &Value) -> Result<RegId, EmitError> {
        if value.name().is_empty() {
            return Err(EmitError::EmptyValueName);
        }
        self.value_ids
            .get(&ValueKey::of(value))
            .copied()
            .ok_or_else(|| EmitError::UnregisteredValue {
                name: value.name().to_string(),
            })
    }

    /// The register assigned to a value id of `g`.
    pub(crate) fn value_reg(&self, g: &Graph, v: ValueId) -> Result<RegId, EmitError> {
        self.reg_for(g.value(v))
    }

    /// Emits a `Free` tagged with the emitting source line.
    pub(crate) fn emit_free(&mut self, reg: RegId, line: u32) {
        self.b.free(reg);
        self.b.tag_last(format!("@{line}"));
    }

    /// Emits one graph in computation order with reference-count liveness.
    ///
    /// Top-level emission (`in_loop == false`) also binds each graph input
    /// with an `In` instruction on its first reference.
    pub(crate) fn emit_graph(
        &mut self,
        g: &Graph,
        in_loop: bool,
        output_values: &[ValueId],
    ) -> Result<(), EmitError> {
        let mut users_left: HashMap<ValueKey, usize> = HashMap::new();
        if !in_loop {
            for &v in g.input_values() {
                let value = g.value(v);
                users_left.insert(ValueKey::of(value), value.users().len());
            }
        }
        for &v in g.temp_values() {
            let value = g.value(v);
            users_left.insert(ValueKey::of(value), value.users().len());
        }

        let mut staged_inputs: HashSet<ValueKey> = HashSet::new();
        let mut todo_outputs: HashSet<ValueKey> = output_values
            .iter()
            .map(|&v| ValueKey::of(g.value(v)))
            .collect();

        for node_id in g.computation_sequence() {
            let node = g.node(node_id);
            if !self.emitted.insert(NodeKey::of(node)) {
                continue;
            }

            if !in_loop {
                for &input in node.inputs() {
                    let value = g.value(input);
                    if !value.is_input() {
                        continue;
                    }
                    if !staged_inputs.insert(ValueKey::of(value)) {
                        continue;
                    }
                    let reg = self.reg_for(value)?;
                    self.b.input(reg, value.name());
                    self.b.tag_last(value.name());
                }
            }

            self.emit_node(g, node_id)?;

            for &output in node.outputs() {
                let value = g.value(output);
                if todo_outputs.remove(&ValueKey::of(value)) {
                    continue;
                }
                // Batch-norm outputs are owned by the VM; see the design
                // notes. Everything else that is dead on arrival is freed
                // immediately.
                if value.is_temp()
                    && !value.is_null()
                    && value.users().is_empty()
                    && node.op() != OpKind::BatchNormalization
                {
                    let reg = self.reg_for(value)?;
                    self.emit_free(reg, line!());
                }
            }

            for &input in node.inputs() {
                let value = g.value(input);
                let Some(count) = users_left.get_mut(&ValueKey::of(value)) else {
                    continue;
                };
                if *count == 0 {
                    return Err(EmitError::UserCountUnderflow {
                        value: value.name().to_string(),
                    });
                }
                *count -= 1;
                if *count == 0 {
                    let reg = self.reg_for(value)?;
                    self.emit_free(reg, line!());
                }
            }
        }
        Ok(())
    }

    /// Emits an `Out` per declared output, freeing the register afterwards.
    fn emit_outputs(&mut self, g: &Graph, output_values: &[ValueId]) -> Result<(), EmitError> {
        for &v in output_values {
            let value = g.value(v);
            let reg = self.reg_for(value)?;
            self.b.output(value.name(), reg);
            self.b.tag_last(value.name());
            self.emit_free(reg, line!());
        }
        Ok(())
    }

    /// Frees residual stack registers in deterministic order.
    fn emit_stack_quit(&mut self) {
        let regs: Vec<RegId> = self.stack_ids.values().copied().collect();
        for reg in regs {
            self.emit_free(reg, line!());
        }
    }

    fn log_value_table(&mut self) {
        if !self.opts.compiler_log {
            return;
        }
        let table = core::mem::take(&mut self.value_table);
        self.log_line(&format!("=== {} variables ===", table.len()));
        let mut total: i64 = 0;
        for (reg, name, nbytes) in &table {
            let size = nbytes.unwrap_or(-1);
            if size > 0 {
                total += size;
            }
            self.log_line(&format!("{reg}: {name} {size}"));
        }
        self.log_line(&format!(
            "Total size of all values: {}MB",
            total / 1000 / 1000
        ));
        self.value_table = table;
    }
}

/// Lowers a scheduled model graph into a tape program.
///
/// `backend` is consulted only for fusion groups whose `fusion_type` matches
/// an enabled backend flag; `log` receives diagnostics when
/// [`CompilerOptions::compiler_log`] is set.
pub fn emit_model<'a>(
    graph: &Graph,
    opts: &'a CompilerOptions,
    backend: Option<&'a mut dyn KernelBackend>,
    log: Option<&'a mut dyn EmitLog>,
) -> Result<TapeProgram, EmitError> {
    let mut e = Emitter::new(opts, backend, log);
    e.assign_graph_value_ids(graph)?;
    e.emit_graph(graph, false, graph.output_values())?;
    e.emit_outputs(graph, graph.output_values())?;
    e.log_value_table();
    e.emit_stack_quit();
    Ok(e.b.finish()?)
}

/// Lowers a bare node subset without driver liveness.
///
/// Register ids are assigned for the union of the nodes' operands; the
/// returned vector holds the registers of `fetches`, in order.
pub fn emit_nodes<'a>(
    graph: &Graph,
    nodes: &[NodeId],
    fetches: &[ValueId],
    opts: &'a CompilerOptions,
    backend: Option<&'a mut dyn KernelBackend>,
    log: Option<&'a mut dyn EmitLog>,
) -> Result<(TapeProgram, Vec<RegId>), EmitError> {
    let mut e = Emitter::new(opts, backend, log);

    let mut values: BTreeSet<ValueId> = BTreeSet::new();
    for &node in nodes {
        values.extend(graph.node(node).inputs().iter().copied());
        values.extend(graph.node(node).outputs().iter().copied());
    }
    e.assign_value_ids(graph, &values)?;

    let mut fetch_regs = Vec::with_capacity(fetches.len());
    for &fetch in fetches {
        fetch_regs.push(e.value_reg(graph, fetch)?);
    }
    for &node in nodes {
        e.emit_node(graph, node)?;
    }
    Ok((e.b.finish()?, fetch_regs))
}
