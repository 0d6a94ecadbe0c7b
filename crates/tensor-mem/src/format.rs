// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory format descriptors.
//!
//! A [`Format`] maps a logical NCHW shape onto a physical dimension
//! sequence and an element offset function. The mapping is pure: it only
//! changes how indices resolve into the flat buffer, never the data itself.

use std::str::FromStr;

use crate::ParseError;

/// Channel blocking factor of the [`Format::OIhw4i16o4i`] weight layout.
pub const CHANNEL_BLOCK: usize = 16;

/// Physical arrangement of a tensor's elements in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Format {
    /// Row-major, channel-major: `(n, c, h, w)`.
    #[serde(rename = "nchw")]
    Nchw,
    /// Channel-last: `(n, h, w, c)`.
    #[serde(rename = "nhwc")]
    Nhwc,
    /// Flat vector, used for biases and 1-D tensors.
    #[serde(rename = "x")]
    X,
    /// Blocked weight layout for vectorized execution:
    /// `(o/16, i/16, h, w, 4, 16, 4)`. Both channel counts must be
    /// divisible by 16.
    #[serde(rename = "OIhw4i16o4i")]
    OIhw4i16o4i,
}

impl Format {
    /// Maps a logical NCHW shape to the physical dimension sequence of
    /// this format.
    ///
    /// # Panics
    /// - `X` (and any future format without a 4-D mapping): vector tensors
    ///   are built through [`crate::Tensor::vector`], never through a shape
    ///   mapping. Requesting one here is a caller bug.
    /// - `OIhw4i16o4i` with channel counts not divisible by 16.
    /// - Element-count mismatch between logical and physical dims; this is
    ///   an internal invariant of the mapping itself and signals a bug in
    ///   this function, not in the caller.
    pub fn physical_dims(self, nchw: [usize; 4]) -> Vec<usize> {
        let [n, c, h, w] = nchw;
        let dims = match self {
            Format::Nchw => vec![n, c, h, w],
            Format::Nhwc => vec![n, h, w, c],
            Format::OIhw4i16o4i => {
                // Weight tensors: n axis is output channels, c axis input channels.
                assert!(
                    n % CHANNEL_BLOCK == 0 && c % CHANNEL_BLOCK == 0,
                    "format OIhw4i16o4i requires channel counts divisible by {CHANNEL_BLOCK}, \
                     got {n}x{c}"
                );
                vec![n / CHANNEL_BLOCK, c / CHANNEL_BLOCK, h, w, 4, CHANNEL_BLOCK, 4]
            }
            Format::X => panic!("format {self:?} has no physical mapping for a 4-D shape"),
        };

        let logical: usize = nchw.iter().product();
        let physical: usize = dims.iter().product();
        assert_eq!(
            logical, physical,
            "layout element-count invariant violated for {self:?}: {logical} != {physical}"
        );
        dims
    }

    /// Element offset of the logical coordinate `(n, c, h, w)` inside a
    /// buffer laid out in this format.
    ///
    /// For [`Format::OIhw4i16o4i`], `n` indexes output channels and `c`
    /// input channels, split into block/remainder pairs `(4i, 16o, 4i)`.
    ///
    /// # Panics
    /// Panics for `X`; 1-D tensors are indexed directly.
    pub fn offset(self, nchw: [usize; 4], n: usize, c: usize, h: usize, w: usize) -> usize {
        let [_, ch, hh, ww] = nchw;
        match self {
            Format::Nchw => ((n * ch + c) * hh + h) * ww + w,
            Format::Nhwc => ((n * hh + h) * ww + w) * ch + c,
            Format::OIhw4i16o4i => {
                let i_blocks = ch / CHANNEL_BLOCK;
                let (o_blk, o_in) = (n / CHANNEL_BLOCK, n % CHANNEL_BLOCK);
                let (i_blk, i_in) = (c / CHANNEL_BLOCK, c % CHANNEL_BLOCK);
                let (i_mid, i_lo) = (i_in / 4, i_in % 4);
                (((((o_blk * i_blocks + i_blk) * hh + h) * ww + w) * 4 + i_mid) * CHANNEL_BLOCK
                    + o_in)
                    * 4
                    + i_lo
            }
            Format::X => panic!("format {self:?} is 1-D; index the buffer directly"),
        }
    }

    /// Returns a human-readable label for this format.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Nchw => "nchw",
            Format::Nhwc => "nhwc",
            Format::X => "x",
            Format::OIhw4i16o4i => "OIhw4i16o4i",
        }
    }
}

impl FromStr for Format {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nchw" => Ok(Format::Nchw),
            "nhwc" => Ok(Format::Nhwc),
            "x" => Ok(Format::X),
            "OIhw4i16o4i" => Ok(Format::OIhw4i16o4i),
            other => Err(ParseError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nchw_identity() {
        assert_eq!(Format::Nchw.physical_dims([2, 4, 3, 3]), vec![2, 4, 3, 3]);
    }

    #[test]
    fn test_nhwc_permutation() {
        assert_eq!(Format::Nhwc.physical_dims([2, 4, 3, 3]), vec![2, 3, 3, 4]);
    }

    #[test]
    fn test_blocked_dims() {
        let dims = Format::OIhw4i16o4i.physical_dims([32, 64, 3, 3]);
        assert_eq!(dims, vec![2, 4, 3, 3, 4, 16, 4]);
        assert_eq!(dims.iter().product::<usize>(), 32 * 64 * 3 * 3);
    }

    #[test]
    fn test_element_count_invariant() {
        for fmt in [Format::Nchw, Format::Nhwc] {
            let shape = [3, 5, 7, 2];
            let dims = fmt.physical_dims(shape);
            assert_eq!(
                dims.iter().product::<usize>(),
                shape.iter().product::<usize>()
            );
        }
    }

    #[test]
    #[should_panic(expected = "divisible by 16")]
    fn test_blocked_rejects_unaligned_channels() {
        Format::OIhw4i16o4i.physical_dims([24, 64, 3, 3]);
    }

    #[test]
    #[should_panic(expected = "no physical mapping")]
    fn test_x_has_no_4d_mapping() {
        Format::X.physical_dims([1, 3, 1, 1]);
    }

    #[test]
    fn test_nchw_offsets_are_row_major() {
        let shape = [1, 2, 2, 2];
        assert_eq!(Format::Nchw.offset(shape, 0, 0, 0, 0), 0);
        assert_eq!(Format::Nchw.offset(shape, 0, 0, 0, 1), 1);
        assert_eq!(Format::Nchw.offset(shape, 0, 0, 1, 0), 2);
        assert_eq!(Format::Nchw.offset(shape, 0, 1, 0, 0), 4);
    }

    #[test]
    fn test_nhwc_offsets_are_channel_last() {
        let shape = [1, 2, 2, 2];
        assert_eq!(Format::Nhwc.offset(shape, 0, 0, 0, 0), 0);
        assert_eq!(Format::Nhwc.offset(shape, 0, 1, 0, 0), 1);
        assert_eq!(Format::Nhwc.offset(shape, 0, 0, 0, 1), 2);
        assert_eq!(Format::Nhwc.offset(shape, 0, 0, 1, 0), 4);
    }

    /// Every logical coordinate must map to a distinct in-range offset.
    #[test]
    fn test_offsets_are_a_bijection() {
        for fmt in [Format::Nchw, Format::Nhwc, Format::OIhw4i16o4i] {
            let shape = match fmt {
                Format::OIhw4i16o4i => [16, 16, 2, 2],
                _ => [2, 3, 4, 5],
            };
            let total: usize = shape.iter().product();
            let mut seen = vec![false; total];
            for n in 0..shape[0] {
                for c in 0..shape[1] {
                    for h in 0..shape[2] {
                        for w in 0..shape[3] {
                            let off = fmt.offset(shape, n, c, h, w);
                            assert!(off < total, "{fmt:?} offset {off} out of range");
                            assert!(!seen[off], "{fmt:?} offset {off} mapped twice");
                            seen[off] = true;
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("nhwc".parse::<Format>().unwrap(), Format::Nhwc);
        assert_eq!(
            "OIhw4i16o4i".parse::<Format>().unwrap(),
            Format::OIhw4i16o4i
        );
        assert!("chwn".parse::<Format>().is_err());
    }
}
