// Copyright 2026 the Model Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tensor element types.
//!
//! Codes match the ONNX `TensorProto.DataType` enumeration so that defs can
//! carry dtype fields straight through.

use core::fmt;

/// A tensor element type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// Element type is not (yet) known.
    #[default]
    Unknown,
    /// Boolean, stored as one byte.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// IEEE 754 half precision.
    Float16,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

impl Dtype {
    /// Size of one element in bytes (0 for [`Dtype::Unknown`]).
    #[must_use]
    pub fn size_of(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::Float16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Returns `true` for floating-point element types.
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// The ONNX `TensorProto.DataType` code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Float32 => 1,
            Self::UInt8 => 2,
            Self::Int8 => 3,
            Self::Int16 => 5,
            Self::Int32 => 6,
            Self::Int64 => 7,
            Self::Bool => 9,
            Self::Float16 => 10,
            Self::Float64 => 11,
        }
    }

    /// Parses an ONNX `TensorProto.DataType` code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Unknown,
            1 => Self::Float32,
            2 => Self::UInt8,
            3 => Self::Int8,
            5 => Self::Int16,
            6 => Self::Int32,
            7 => Self::Int64,
            9 => Self::Bool,
            10 => Self::Float16,
            11 => Self::Float64,
            _ => return None,
        })
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::Dtype;

    #[test]
    fn codes_round_trip() {
        for dtype in [
            Dtype::Unknown,
            Dtype::Bool,
            Dtype::Int8,
            Dtype::Int16,
            Dtype::Int32,
            Dtype::Int64,
            Dtype::UInt8,
            Dtype::Float16,
            Dtype::Float32,
            Dtype::Float64,
        ] {
            assert_eq!(Dtype::from_code(dtype.code()), Some(dtype));
        }
        assert_eq!(Dtype::from_code(99), None);
    }

    #[test]
    fn float_classification() {
        assert!(Dtype::Float32.is_float());
        assert!(Dtype::Float16.is_float());
        assert!(!Dtype::Int64.is_float());
        assert_eq!(Dtype::Int64.size_of(), 8);
        assert_eq!(Dtype::Unknown.size_of(), 0);
    }
}
