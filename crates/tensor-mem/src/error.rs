// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor metadata parsing.
//!
//! Shape, layout, and dtype *contract* violations are fatal by design and
//! panic at the API boundary; the only recoverable surface in this crate
//! is parsing enum values from user-supplied text (CLI flags, config files).

/// Errors produced when parsing tensor metadata from text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The string does not name a supported element data type.
    #[error("unknown data type '{0}'; expected one of f32, s32, s8, u8")]
    UnknownDType(String),

    /// The string does not name a supported memory format.
    #[error("unknown memory format '{0}'; expected one of nchw, nhwc, x, OIhw4i16o4i")]
    UnknownFormat(String),
}
