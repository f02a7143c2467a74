// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmark crate for `model_graph` emission. See `benches/`.
