// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Channel-axis concatenation kernel.

use std::marker::PhantomData;

use tensor_mem::{Scalar, Tensor};

use crate::Op;

/// Concatenates an ordered sequence of sources along the logical channel
/// axis into the destination, optionally applying a fused ReLU.
///
/// All sources must share the destination's dtype and batch/spatial dims;
/// the destination's channel count must equal the sum of the sources'.
/// Violations are fatal at construction. No data moves until
/// [`submit`](Op::submit).
pub struct ConcatOp<'a, T: Scalar> {
    srcs: Vec<&'a Tensor>,
    dst: &'a mut Tensor,
    post_relu: bool,
    name: String,
    _t: PhantomData<T>,
}

impl<'a, T: Scalar> ConcatOp<'a, T> {
    pub fn new(srcs: Vec<&'a Tensor>, dst: &'a mut Tensor, post_relu: bool) -> Self {
        assert!(!srcs.is_empty(), "concat requires at least one source");
        assert_eq!(
            T::DTYPE,
            dst.dtype(),
            "concat kernel instantiated for {} but destination is {}",
            T::DTYPE,
            dst.dtype()
        );

        let [n, c, h, w] = dst.nchw_dims();
        let mut channels = 0;
        for (i, s) in srcs.iter().enumerate() {
            let [sn, sc, sh, sw] = s.nchw_dims();
            assert_eq!(
                s.dtype(),
                dst.dtype(),
                "concat source {i} dtype {} != destination {}",
                s.dtype(),
                dst.dtype()
            );
            assert!(
                sn == n && sh == h && sw == w,
                "concat source {i} shape {:?} incompatible with destination {:?}",
                s.nchw_dims(),
                dst.nchw_dims()
            );
            channels += sc;
        }
        assert_eq!(
            channels, c,
            "concat source channel sum {channels} != destination channels {c}"
        );

        let name = format!("concat_{}", T::DTYPE.as_str());
        Self {
            srcs,
            dst,
            post_relu,
            name,
            _t: PhantomData,
        }
    }
}

impl<T: Scalar> Op for ConcatOp<'_, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&mut self) {
        let [n, _, h, w] = self.dst.nchw_dims();
        let dst_fmt = self.dst.format();
        let dst_dims = self.dst.nchw_dims();
        let post_relu = self.post_relu;
        let out = self.dst.as_mut_slice::<T>();

        let mut c_base = 0;
        for src in &self.srcs {
            let [_, sc, _, _] = src.nchw_dims();
            let data = src.as_slice::<T>();
            for b in 0..n {
                for c in 0..sc {
                    for y in 0..h {
                        for x in 0..w {
                            let mut v = data[src.offset(b, c, y, x)];
                            if post_relu {
                                v = v.relu();
                            }
                            out[dst_fmt.offset(dst_dims, b, c_base + c, y, x)] = v;
                        }
                    }
                }
            }
            c_base += sc;
        }
    }
}
