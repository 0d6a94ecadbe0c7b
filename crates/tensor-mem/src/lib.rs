// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-mem
//!
//! Layout-aware tensor memory entities for quantized inference kernels.
//!
//! This crate provides:
//! - [`Tensor`] — an owned, immutable-in-shape tensor with an aligned buffer.
//! - [`Format`] — physical memory layouts (`nchw`, `nhwc`, flat vectors, and
//!   the blocked `OIhw4i16o4i` weight layout) with pure shape/offset mappings.
//! - [`DType`] — supported element types (f32, s32, s8, u8).
//! - [`Scalar`] / [`RoundMode`] — generic element access and the quantization
//!   rounding policy shared with the kernel layer.
//! - [`AlignedBuffer`] — the RAII aligned allocation every tensor owns.
//!
//! # Error Model
//! Contract violations (unsupported mappings, zero-sized buffers, dtype
//! mismatches) are fatal panics: callers are expected to supply pre-validated
//! shapes. The element-count postcondition of every layout mapping is a
//! separately-worded internal invariant check. Only text parsing returns a
//! recoverable [`ParseError`].

mod buffer;
mod dtype;
mod error;
mod format;
mod scalar;
mod tensor;

pub use buffer::AlignedBuffer;
pub use dtype::DType;
pub use error::ParseError;
pub use format::{Format, CHANNEL_BLOCK};
pub use scalar::{RoundMode, Scalar};
pub use tensor::{Tensor, DEFAULT_ALIGNMENT};
