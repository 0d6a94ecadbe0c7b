// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use std::str::FromStr;

use crate::ParseError;

/// Enumerates the numeric types a [`crate::Tensor`] can hold.
///
/// The set is closed: operator factories dispatch exhaustively on `DType`,
/// so adding a variant means extending every dispatch site in one step,
/// enforced by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 32-bit signed integer (accumulator outputs).
    S32,
    /// 8-bit signed integer (quantized weights and activations).
    S8,
    /// 8-bit unsigned integer (quantized activations).
    U8,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::S32 => 4,
            DType::S8 => 1,
            DType::U8 => 1,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::S32 => "s32",
            DType::S8 => "s8",
            DType::U8 => "u8",
        }
    }

    /// All supported data types, in dispatch order.
    pub fn all() -> [DType; 4] {
        [DType::F32, DType::S32, DType::S8, DType::U8]
    }
}

impl FromStr for DType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f32" => Ok(DType::F32),
            "s32" | "i32" => Ok(DType::S32),
            "s8" | "i8" => Ok(DType::S8),
            "u8" => Ok(DType::U8),
            other => Err(ParseError::UnknownDType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::S32.size_bytes(), 4);
        assert_eq!(DType::S8.size_bytes(), 1);
        assert_eq!(DType::U8.size_bytes(), 1);
    }

    #[test]
    fn test_parse() {
        assert_eq!("f32".parse::<DType>().unwrap(), DType::F32);
        assert_eq!("i8".parse::<DType>().unwrap(), DType::S8);
        assert_eq!("u8".parse::<DType>().unwrap(), DType::U8);
        assert!("f64".parse::<DType>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for dt in DType::all() {
            assert_eq!(dt.as_str().parse::<DType>().unwrap(), dt);
        }
    }
}
