// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator factories.
//!
//! Each factory selects the concrete kernel instantiation purely from the
//! destination tensor's element dtype. The dtype enum is closed, so the
//! dispatch is exhaustive by construction: an unsupported destination type
//! is unrepresentable rather than a runtime "bad data_type" failure, and
//! adding a dtype extends the enum and every match below in one
//! compiler-checked step.
//!
//! Factories only construct. Shape and parameter contracts are validated
//! eagerly (fatally, on violation), but no data moves until the returned
//! operator's [`submit`](Op::submit) is called. The operator borrows its
//! sources immutably and its destination mutably for its lifetime; callers
//! keep ownership throughout.

use tensor_mem::{DType, RoundMode, Tensor};

use crate::ops::{ConcatOp, Conv1x1Stage, ConvOp};
use crate::Op;

/// Builds a channel-axis concatenation operator.
///
/// `post_relu` fuses a clamp-to-nonnegative rectification into the copy.
pub fn concat<'a>(
    srcs: Vec<&'a Tensor>,
    dst: &'a mut Tensor,
    post_relu: bool,
) -> Box<dyn Op + 'a> {
    match dst.dtype() {
        DType::F32 => Box::new(ConcatOp::<f32>::new(srcs, dst, post_relu)),
        DType::S32 => Box::new(ConcatOp::<i32>::new(srcs, dst, post_relu)),
        DType::S8 => Box::new(ConcatOp::<i8>::new(srcs, dst, post_relu)),
        DType::U8 => Box::new(ConcatOp::<u8>::new(srcs, dst, post_relu)),
    }
}

/// Builds a single-stage convolution operator.
///
/// Equivalent to [`conv_fused`] with the pointwise stage absent.
#[allow(clippy::too_many_arguments)]
pub fn conv<'a>(
    src: &'a Tensor,
    weights: &'a Tensor,
    bias: &'a Tensor,
    stride: [usize; 2],
    padding: [usize; 2],
    dst: &'a mut Tensor,
    relu: bool,
    scales: Vec<f32>,
    round_mode: RoundMode,
) -> Box<dyn Op + 'a> {
    conv_fused(
        src, weights, bias, stride, padding, None, dst, relu, scales, round_mode,
    )
}

/// Builds a convolution operator with an optional fused pointwise stage.
///
/// When `stage1` is present, the primary convolution's output feeds the
/// 1x1 stage directly and `dst` receives the pointwise result; when absent,
/// the primary stage's (optionally rectified, requantized) output is the
/// destination. `relu`, `scales`, and `round_mode` govern the primary
/// stage; the pointwise stage carries its own in [`Conv1x1Stage`].
#[allow(clippy::too_many_arguments)]
pub fn conv_fused<'a>(
    src: &'a Tensor,
    weights: &'a Tensor,
    bias: &'a Tensor,
    stride: [usize; 2],
    padding: [usize; 2],
    stage1: Option<Conv1x1Stage<'a>>,
    dst: &'a mut Tensor,
    relu: bool,
    scales: Vec<f32>,
    round_mode: RoundMode,
) -> Box<dyn Op + 'a> {
    match dst.dtype() {
        DType::F32 => Box::new(ConvOp::<f32>::new(
            src, weights, bias, stride, padding, stage1, dst, relu, scales, round_mode,
        )),
        DType::S32 => Box::new(ConvOp::<i32>::new(
            src, weights, bias, stride, padding, stage1, dst, relu, scales, round_mode,
        )),
        DType::S8 => Box::new(ConvOp::<i8>::new(
            src, weights, bias, stride, padding, stage1, dst, relu, scales, round_mode,
        )),
        DType::U8 => Box::new(ConvOp::<u8>::new(
            src, weights, bias, stride, padding, stage1, dst, relu, scales, round_mode,
        )),
    }
}
