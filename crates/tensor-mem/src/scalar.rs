// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Scalar`] trait unifying the four element types for generic kernels,
//! and the [`RoundMode`] policy for quantizing accumulator values.

use crate::DType;

/// Policy for mapping a scaled fractional accumulator value onto an integer
/// destination type. Ignored for floating-point destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundMode {
    /// Round to the nearest representable value, halves away from zero.
    Nearest,
    /// Round toward negative infinity.
    Down,
}

impl RoundMode {
    /// Applies the rounding policy to a raw accumulator value.
    pub fn apply(self, v: f32) -> f32 {
        match self {
            RoundMode::Nearest => v.round(),
            RoundMode::Down => v.floor(),
        }
    }
}

/// An element type a tensor buffer can hold.
///
/// Kernels are generic over the *destination* scalar; mixed-precision
/// reads (u8 activations against s8 weights) go through
/// [`Tensor::load_f32`](crate::Tensor::load_f32) instead.
pub trait Scalar: Copy + Default + PartialEq + std::fmt::Debug + Send + 'static {
    /// The runtime tag matching this type.
    const DTYPE: DType;

    /// Widens the value to `f32` for accumulation.
    fn to_f32(self) -> f32;

    /// Narrows an accumulator value into this type, rounding per `mode`
    /// and saturating at the type's representable range.
    fn from_accum(v: f32, mode: RoundMode) -> Self;

    /// Clamp-to-nonnegative rectification.
    fn relu(self) -> Self;
}

impl Scalar for f32 {
    const DTYPE: DType = DType::F32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_accum(v: f32, _mode: RoundMode) -> Self {
        v
    }

    fn relu(self) -> Self {
        self.max(0.0)
    }
}

// Float-to-int `as` casts saturate, so the conversions below are
// well-defined for every accumulator value including NaN (maps to 0).

impl Scalar for i32 {
    const DTYPE: DType = DType::S32;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_accum(v: f32, mode: RoundMode) -> Self {
        mode.apply(v) as i32
    }

    fn relu(self) -> Self {
        self.max(0)
    }
}

impl Scalar for i8 {
    const DTYPE: DType = DType::S8;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_accum(v: f32, mode: RoundMode) -> Self {
        mode.apply(v) as i8
    }

    fn relu(self) -> Self {
        self.max(0)
    }
}

impl Scalar for u8 {
    const DTYPE: DType = DType::U8;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_accum(v: f32, mode: RoundMode) -> Self {
        mode.apply(v) as u8
    }

    fn relu(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_nearest() {
        assert_eq!(i32::from_accum(2.5, RoundMode::Nearest), 3);
        assert_eq!(i32::from_accum(-2.5, RoundMode::Nearest), -3);
        assert_eq!(i32::from_accum(2.4, RoundMode::Nearest), 2);
    }

    #[test]
    fn test_round_down() {
        assert_eq!(i32::from_accum(2.9, RoundMode::Down), 2);
        assert_eq!(i32::from_accum(-2.1, RoundMode::Down), -3);
    }

    #[test]
    fn test_saturation() {
        assert_eq!(i8::from_accum(300.0, RoundMode::Nearest), 127);
        assert_eq!(i8::from_accum(-300.0, RoundMode::Nearest), -128);
        assert_eq!(u8::from_accum(300.0, RoundMode::Nearest), 255);
        assert_eq!(u8::from_accum(-5.0, RoundMode::Nearest), 0);
    }

    #[test]
    fn test_f32_passthrough() {
        assert_eq!(f32::from_accum(2.5, RoundMode::Down), 2.5);
    }

    #[test]
    fn test_relu() {
        assert_eq!((-1.5f32).relu(), 0.0);
        assert_eq!(2.0f32.relu(), 2.0);
        assert_eq!((-7i8).relu(), 0);
        assert_eq!((-7i32).relu(), 0);
        assert_eq!(200u8.relu(), 200);
    }
}
