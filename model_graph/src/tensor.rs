// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense tensors used for initializers and constant lowering.
//!
//! Elements are stored as a packed little-endian byte buffer. The emitter
//! only ever reads elements widened to `f64`/`i64`, so the accessors decode
//! per dtype instead of exposing typed views.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::dtype::Dtype;

/// A tensor construction error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TensorError {
    /// Buffer length does not match `dims` × element width.
    LengthMismatch {
        /// Tensor name.
        name: String,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
    /// A dimension was negative.
    NegativeDim {
        /// Tensor name.
        name: String,
    },
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "tensor '{name}': buffer holds {actual} bytes, dims require {expected}"
            ),
            Self::NegativeDim { name } => write!(f, "tensor '{name}': negative dimension"),
        }
    }
}

impl core::error::Error for TensorError {}

/// A dense tensor: name, element type, dimensions, packed element bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    name: String,
    dtype: Dtype,
    dims: Vec<i64>,
    data: Vec<u8>,
}

impl Tensor {
    /// Creates a tensor from packed little-endian element bytes.
    pub fn new(
        name: impl Into<String>,
        dtype: Dtype,
        dims: Vec<i64>,
        data: Vec<u8>,
    ) -> Result<Self, TensorError> {
        let name = name.into();
        let mut count: usize = 1;
        for &d in &dims {
            if d < 0 {
                return Err(TensorError::NegativeDim { name });
            }
            count = count.saturating_mul(usize::try_from(d).unwrap_or(usize::MAX));
        }
        let expected = count.saturating_mul(dtype.size_of());
        if expected != data.len() {
            return Err(TensorError::LengthMismatch {
                name,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            name,
            dtype,
            dims,
            data,
        })
    }

    /// Creates an `f32` tensor from elements.
    pub fn from_f32s(
        name: impl Into<String>,
        dims: Vec<i64>,
        values: &[f32],
    ) -> Result<Self, TensorError> {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self::new(name, Dtype::Float32, dims, data)
    }

    /// Creates an `f64` tensor from elements.
    pub fn from_f64s(
        name: impl Into<String>,
        dims: Vec<i64>,
        values: &[f64],
    ) -> Result<Self, TensorError> {
        let mut data = Vec::with_capacity(values.len() * 8);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self::new(name, Dtype::Float64, dims, data)
    }

    /// Creates an `i32` tensor from elements.
    pub fn from_i32s(
        name: impl Into<String>,
        dims: Vec<i64>,
        values: &[i32],
    ) -> Result<Self, TensorError> {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self::new(name, Dtype::Int32, dims, data)
    }

    /// Creates an `i64` tensor from elements.
    pub fn from_i64s(
        name: impl Into<String>,
        dims: Vec<i64>,
        values: &[i64],
    ) -> Result<Self, TensorError> {
        let mut data = Vec::with_capacity(values.len() * 8);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self::new(name, Dtype::Int64, dims, data)
    }

    /// Tensor name (matches the value it initializes).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Dimensions; empty for scalars.
    #[must_use]
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    /// Number of elements.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        let width = self.dtype.size_of();
        if width == 0 { 0 } else { self.data.len() / width }
    }

    /// Total size in bytes.
    #[must_use]
    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    /// Element `i` widened to `f64`; `None` for non-f32/f64 dtypes or out of
    /// bounds.
    #[must_use]
    pub fn float_at(&self, i: usize) -> Option<f64> {
        let width = self.dtype.size_of();
        let at = i.checked_mul(width)?;
        let bytes = self.data.get(at..at + width)?;
        match self.dtype {
            Dtype::Float32 => Some(f64::from(f32::from_le_bytes(bytes.try_into().ok()?))),
            Dtype::Float64 => Some(f64::from_le_bytes(bytes.try_into().ok()?)),
            _ => None,
        }
    }

    /// Element `i` widened to `i64`; `None` for float dtypes or out of
    /// bounds.
    #[must_use]
    pub fn int_at(&self, i: usize) -> Option<i64> {
        let width = self.dtype.size_of();
        let at = i.checked_mul(width)?;
        let bytes = self.data.get(at..at + width)?;
        match self.dtype {
            Dtype::Bool | Dtype::UInt8 => Some(i64::from(bytes[0])),
            Dtype::Int8 => Some(i64::from(bytes[0] as i8)),
            Dtype::Int16 => Some(i64::from(i16::from_le_bytes(bytes.try_into().ok()?))),
            Dtype::Int32 => Some(i64::from(i32::from_le_bytes(bytes.try_into().ok()?))),
            Dtype::Int64 => Some(i64::from_le_bytes(bytes.try_into().ok()?)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::{Tensor, TensorError};
    use crate::dtype::Dtype;

    #[test]
    fn scalar_tensor_has_one_element() {
        let t = Tensor::from_f32s("w", vec![], &[2.5]).unwrap();
        assert_eq!(t.num_elements(), 1);
        assert_eq!(t.float_at(0), Some(2.5));
        assert_eq!(t.float_at(1), None);
        assert_eq!(t.int_at(0), None);
    }

    #[test]
    fn int_elements_widen_with_sign() {
        let t = Tensor::from_i32s("idx", vec![2], &[-3, 7]).unwrap();
        assert_eq!(t.int_at(0), Some(-3));
        assert_eq!(t.int_at(1), Some(7));

        let b = Tensor::new("flags", Dtype::Int8, vec![1], vec![0xFF]).unwrap();
        assert_eq!(b.int_at(0), Some(-1));

        let u = Tensor::new("bytes", Dtype::UInt8, vec![1], vec![0xFF]).unwrap();
        assert_eq!(u.int_at(0), Some(255));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = Tensor::new("w", Dtype::Float32, vec![2], vec![0; 4]).unwrap_err();
        assert!(matches!(err, TensorError::LengthMismatch { expected: 8, .. }));
    }

    #[test]
    fn negative_dim_is_rejected() {
        let err = Tensor::new("w", Dtype::Float32, vec![-1], vec![]).unwrap_err();
        assert!(matches!(err, TensorError::NegativeDim { .. }));
    }
}
