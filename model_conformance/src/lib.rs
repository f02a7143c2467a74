// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conformance test crate for whole-model emission. See `tests/`.
