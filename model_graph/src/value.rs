// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graph values: named typed slots produced and consumed by nodes.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::dtype::Dtype;
use crate::node::NodeId;
use crate::tensor::Tensor;

/// Index of a value within its graph's value arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Value kind bits.
///
/// `NULL` composes with `INPUT`/`OUTPUT`/`TEMP` to mark optional slots; a
/// value with an empty name always carries `NULL`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueKind(u8);

impl core::ops::BitOr for ValueKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl ValueKind {
    /// Graph input.
    pub const INPUT: Self = Self(1);
    /// Graph output.
    pub const OUTPUT: Self = Self(2);
    /// Intermediate value.
    pub const TEMP: Self = Self(4);
    /// Absent/optional slot.
    pub const NULL: Self = Self(8);

    /// Returns `true` if all bits of `other` are set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::TEMP {
            return write!(f, "Temp");
        }
        let mut parts: Vec<&str> = Vec::new();
        if self.contains(Self::INPUT) {
            parts.push("Input");
        }
        if self.contains(Self::OUTPUT) {
            parts.push("Output");
        }
        if self.contains(Self::NULL) {
            parts.push("Null");
        }
        if parts.is_empty() {
            return write!(f, "???({})", self.0);
        }
        write!(f, "{}", parts.join("|"))
    }
}

/// The shape-level kind of a value's type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeKind {
    /// A dense tensor.
    #[default]
    Tensor,
    /// A sequence of tensors.
    Sequence,
    /// Compiler-private state handed through the VM (e.g. saved batch-norm
    /// statistics).
    Opaque,
}

/// A value's type: kind, element dtype, and optional shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueType {
    /// Shape-level kind.
    pub kind: TypeKind,
    /// Element dtype; [`Dtype::Unknown`] when untyped.
    pub dtype: Dtype,
    /// Dimensions, or `None` when the shape is unknown.
    pub dims: Option<Vec<i64>>,
}

impl ValueType {
    /// An untyped tensor.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// A tensor type with known dtype and shape.
    #[must_use]
    pub fn tensor(dtype: Dtype, dims: Vec<i64>) -> Self {
        Self {
            kind: TypeKind::Tensor,
            dtype,
            dims: Some(dims),
        }
    }

    /// A sequence type.
    #[must_use]
    pub fn sequence() -> Self {
        Self {
            kind: TypeKind::Sequence,
            dtype: Dtype::Unknown,
            dims: None,
        }
    }

    /// An opaque type.
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            kind: TypeKind::Opaque,
            dtype: Dtype::Unknown,
            dims: None,
        }
    }

    /// Returns `true` if the shape is known.
    #[must_use]
    pub fn has_known_shape(&self) -> bool {
        self.dims.is_some()
    }

    /// Total size in bytes, or `None` if dtype or shape is unknown.
    #[must_use]
    pub fn nbytes(&self) -> Option<i64> {
        let width = i64::try_from(self.dtype.size_of()).ok()?;
        if width == 0 {
            return None;
        }
        let dims = self.dims.as_ref()?;
        let mut total = width;
        for &d in dims {
            total = total.checked_mul(d)?;
        }
        Some(total)
    }
}

/// A named typed slot in a graph.
///
/// Producer/user edges are arena indices maintained by the owning graph; a
/// value never outlives its graph.
#[derive(Clone, Debug)]
pub struct Value {
    pub(crate) name: String,
    pub(crate) kind: ValueKind,
    pub(crate) ty: ValueType,
    pub(crate) initializer: Option<Tensor>,
    pub(crate) producer: Option<NodeId>,
    pub(crate) users: Vec<NodeId>,
    pub(crate) grad: Option<ValueId>,
    pub(crate) doc_string: String,
}

impl Value {
    pub(crate) fn new(name: impl Into<String>, ty: ValueType, kind: ValueKind) -> Self {
        let name = name.into();
        let kind = if name.is_empty() {
            kind | ValueKind::NULL
        } else {
            kind
        };
        Self {
            name,
            kind,
            ty,
            initializer: None,
            producer: None,
            users: Vec::new(),
            grad: None,
            doc_string: String::new(),
        }
    }

    /// Value name; empty for null values.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind bits.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Value type.
    #[must_use]
    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Returns `true` for graph inputs.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.kind.contains(ValueKind::INPUT)
    }

    /// Returns `true` for graph outputs.
    #[must_use]
    pub fn is_output(&self) -> bool {
        self.kind.contains(ValueKind::OUTPUT)
    }

    /// Returns `true` for intermediate values.
    #[must_use]
    pub fn is_temp(&self) -> bool {
        self.kind.contains(ValueKind::TEMP)
    }

    /// Returns `true` for absent/optional slots.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind.contains(ValueKind::NULL)
    }

    /// The attached initializer, if any (input-kind values only).
    #[must_use]
    pub fn initializer(&self) -> Option<&Tensor> {
        self.initializer.as_ref()
    }

    /// The node producing this value, if any.
    #[must_use]
    pub fn producer(&self) -> Option<NodeId> {
        self.producer
    }

    /// Nodes consuming this value, one entry per input occurrence.
    #[must_use]
    pub fn users(&self) -> &[NodeId] {
        &self.users
    }

    /// The gradient peer, if one has been attached.
    #[must_use]
    pub fn grad(&self) -> Option<ValueId> {
        self.grad
    }

    /// Documentation string carried from the def.
    #[must_use]
    pub fn doc_string(&self) -> &str {
        &self.doc_string
    }

    pub(crate) fn detach_user(&mut self, user: NodeId) {
        let found = self.users.iter().position(|&n| n == user);
        debug_assert!(found.is_some(), "detaching a non-user node");
        if let Some(at) = found {
            self.users.remove(at);
        }
    }
}
