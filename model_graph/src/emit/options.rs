// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Emission options and collaborator seams.
//!
//! Configuration is threaded as an explicit [`CompilerOptions`] value; there
//! is no process-global state. Pipeline-stage toggles ride along for the
//! surrounding pipeline even where the emitter itself does not consult them.

use alloc::string::String;
use core::fmt;

use crate::graph::Graph;

/// Process-wide compiler options.
#[derive(Clone, Debug, Default)]
pub struct CompilerOptions {
    /// Emit diagnostic lines (per-register value table, fusion summaries)
    /// into the [`EmitLog`] sink.
    pub compiler_log: bool,
    /// Relax certain conformance checks in surrounding pipeline stages.
    pub permissive: bool,
    /// Skip the shape-inference stage.
    pub skip_inference: bool,
    /// Replace constants during simplification.
    pub replace_constant: bool,
    /// Rewrite pools with imbalanced pads during simplification.
    pub modify_pool_with_imbalanced_pads: bool,
    /// Run the operator-fusion stage.
    pub fuse_operations: bool,
    /// Reuse previously generated TVM kernels.
    pub reuse_tvm_code: bool,
    /// Relu rematerialization policy.
    pub recompute_relu: i32,
    /// Prefer CUDA devices in the downstream VM.
    pub use_cuda: bool,
    /// Lower `"nvrtc"` fusion groups through the NVRTC backend.
    pub use_nvrtc: bool,
    /// Lower `"tvm"` fusion groups through the TVM backend.
    pub use_tvm: bool,
    /// Backend name hint for kernel builders.
    pub backend_name: String,
    /// AutoTVM tuning log path for the TVM backend.
    pub autotvm_log: String,
    /// Directory to dump AutoTVM tasks into.
    pub dump_autotvm_task_dir: String,
    /// Dump the graph after shape inference.
    pub dump_after_inference: bool,
    /// Dump the graph after simplification.
    pub dump_after_simplification: bool,
    /// Dump the graph after gradient synthesis.
    pub dump_after_gradient: bool,
    /// Dump the graph after fusion.
    pub dump_after_fusion: bool,
    /// Dump the graph after scheduling.
    pub dump_after_scheduling: bool,
    /// Dump nested subgraphs alongside the main graph.
    pub dump_subgraphs: bool,
}

/// A borrowed sink for emission diagnostics.
///
/// The emitter performs no I/O; callers that want `compiler_log` output pass
/// a sink and decide where the lines go.
pub trait EmitLog {
    /// Receives one diagnostic line.
    fn message(&mut self, line: &str);
}

/// A log sink that collects lines into a string, for tests and tools.
#[derive(Debug, Default)]
pub struct BufferLog {
    /// Collected lines, newline-terminated.
    pub text: String,
}

impl EmitLog for BufferLog {
    fn message(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }
}

/// A compiled TVM kernel: shared object plus entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TvmKernel {
    /// Path of the compiled shared object.
    pub library_path: String,
    /// Entry-point function name.
    pub entry_point: String,
}

/// A generated NVRTC kernel: source code compiled at load time by the VM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NvrtcKernel {
    /// CUDA source code for the fused element-wise kernel.
    pub source: String,
}

/// A kernel-compilation failure reported by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendError {
    /// Human-readable failure description.
    pub message: String,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel backend failed: {}", self.message)
    }
}

impl core::error::Error for BackendError {}

/// External kernel-compilation collaborator for fusion groups.
///
/// The emitter hands over the fused body graph (node list plus input/output
/// value types) and receives either a shared-object reference or generated
/// source. Calls are synchronous.
pub trait KernelBackend {
    /// Compiles `body` into a TVM kernel.
    fn build_tvm(&mut self, body: &Graph, group_id: i64) -> Result<TvmKernel, BackendError>;

    /// Generates NVRTC source for an element-wise fused `body`.
    fn build_nvrtc(&mut self, body: &Graph, group_id: i64) -> Result<NvrtcKernel, BackendError>;
}
