// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution kernel with an optional fused pointwise stage.
//!
//! The primary convolution (any kernel size, [h, w] stride and zero
//! padding) may be followed by a 1x1 convolution consuming its output
//! directly, without materializing the intermediate through the caller.
//! Each stage carries its own rectification flag, per-output-channel scale
//! vector, and rounding mode.
//!
//! Accumulation is in f32; the accumulator (bias included) is scaled,
//! optionally rectified, then narrowed to the destination type per the
//! stage's rounding mode.

use std::marker::PhantomData;

use tensor_mem::{Format, RoundMode, Scalar, Tensor};

use crate::Op;

/// Parameters of the optional fused pointwise stage.
///
/// Presence of this value *is* the fused/two-stage distinction; there is no
/// null convention. The weights must be a 1x1 kernel over the primary
/// stage's output channels.
pub struct Conv1x1Stage<'a> {
    pub weights: &'a Tensor,
    pub bias: &'a Tensor,
    pub relu: bool,
    pub scales: Vec<f32>,
    pub round_mode: RoundMode,
}

/// The convolution operator, generic over the destination element type.
pub struct ConvOp<'a, T: Scalar> {
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
    /// Logical `(n, oc, oh, ow)` of the primary stage's output.
    mid_dims: [usize; 4],
    name: String,
    _t: PhantomData<T>,
}

impl<'a, T: Scalar> ConvOp<'a, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
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
    ) -> Self {
        assert_eq!(
            T::DTYPE,
            dst.dtype(),
            "conv kernel instantiated for {} but destination is {}",
            T::DTYPE,
            dst.dtype()
        );
        check_activation(src, "source");
        check_activation(dst, "destination");
        check_weights(weights, "primary");

        let [n, ic, ih, iw] = src.nchw_dims();
        let [oc, wic, kh, kw] = weights.nchw_dims();
        assert_eq!(
            wic, ic,
            "primary weights expect {wic} input channels, source has {ic}"
        );
        check_bias(bias, oc, "primary");
        check_scales(&scales, oc, "primary");

        let [sh, sw] = stride;
        let [ph, pw] = padding;
        assert!(sh > 0 && sw > 0, "conv stride must be positive");
        assert!(
            ih + 2 * ph >= kh && iw + 2 * pw >= kw,
            "conv kernel {kh}x{kw} exceeds padded input {}x{}",
            ih + 2 * ph,
            iw + 2 * pw
        );
        let oh = (ih + 2 * ph - kh) / sh + 1;
        let ow = (iw + 2 * pw - kw) / sw + 1;

        let out_channels = match &stage1 {
            Some(s1) => {
                check_weights(s1.weights, "pointwise");
                let [oc1, ic1, k1h, k1w] = s1.weights.nchw_dims();
                assert!(
                    k1h == 1 && k1w == 1,
                    "pointwise stage requires a 1x1 kernel, got {k1h}x{k1w}"
                );
                assert_eq!(
                    ic1, oc,
                    "pointwise weights expect {ic1} input channels, primary stage produces {oc}"
                );
                check_bias(s1.bias, oc1, "pointwise");
                check_scales(&s1.scales, oc1, "pointwise");
                oc1
            }
            None => oc,
        };
        assert_eq!(
            dst.nchw_dims(),
            [n, out_channels, oh, ow],
            "conv destination shape {:?} != expected {:?}",
            dst.nchw_dims(),
            [n, out_channels, oh, ow]
        );

        let name = if stage1.is_some() {
            format!("conv_fused_{}", T::DTYPE.as_str())
        } else {
            format!("conv_{}", T::DTYPE.as_str())
        };
        Self {
            src,
            weights,
            bias,
            stride,
            padding,
            stage1,
            dst,
            relu,
            scales,
            round_mode,
            mid_dims: [n, oc, oh, ow],
            name,
            _t: PhantomData,
        }
    }

    /// Runs the primary convolution, quantized to `T`, into a plain
    /// nchw-ordered buffer.
    ///
    /// This is the value the pointwise stage consumes; without a pointwise
    /// stage it is written to the destination verbatim, which is what makes
    /// the single-stage form bit-identical to "fused with stage two absent".
    fn stage0(&self) -> Vec<T> {
        let [_, ic, ih, iw] = self.src.nchw_dims();
        let [_, _, kh, kw] = self.weights.nchw_dims();
        let [n, oc, oh, ow] = self.mid_dims;
        let [sh, sw] = self.stride;
        let [ph, pw] = self.padding;

        let mut out = Vec::with_capacity(n * oc * oh * ow);
        for b in 0..n {
            for o in 0..oc {
                let scale = scale_at(&self.scales, o);
                let bias = self.bias.load_f32(o);
                for y in 0..oh {
                    for x in 0..ow {
                        let mut acc = bias;
                        for i in 0..ic {
                            for ky in 0..kh {
                                let sy = y * sh + ky;
                                // Zero padding: out-of-range taps contribute nothing.
                                if sy < ph || sy - ph >= ih {
                                    continue;
                                }
                                for kx in 0..kw {
                                    let sx = x * sw + kx;
                                    if sx < pw || sx - pw >= iw {
                                        continue;
                                    }
                                    let s = self.src.load_f32(self.src.offset(b, i, sy - ph, sx - pw));
                                    let w =
                                        self.weights.load_f32(self.weights.offset(o, i, ky, kx));
                                    acc += s * w;
                                }
                            }
                        }
                        let mut v = acc * scale;
                        if self.relu {
                            v = v.max(0.0);
                        }
                        out.push(T::from_accum(v, self.round_mode));
                    }
                }
            }
        }
        out
    }
}

impl<T: Scalar> Op for ConvOp<'_, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&mut self) {
        let mid = self.stage0();
        let [n, oc0, oh, ow] = self.mid_dims;
        let dst_fmt = self.dst.format();
        let dst_dims = self.dst.nchw_dims();

        match &self.stage1 {
            None => {
                let out = self.dst.as_mut_slice::<T>();
                let mut idx = 0;
                for b in 0..n {
                    for o in 0..oc0 {
                        for y in 0..oh {
                            for x in 0..ow {
                                out[dst_fmt.offset(dst_dims, b, o, y, x)] = mid[idx];
                                idx += 1;
                            }
                        }
                    }
                }
            }
            Some(s1) => {
                let [oc1, _, _, _] = s1.weights.nchw_dims();
                let out = self.dst.as_mut_slice::<T>();
                for b in 0..n {
                    for o in 0..oc1 {
                        let scale = scale_at(&s1.scales, o);
                        let bias = s1.bias.load_f32(o);
                        for y in 0..oh {
                            for x in 0..ow {
                                let mut acc = bias;
                                for c in 0..oc0 {
                                    let m = mid[((b * oc0 + c) * oh + y) * ow + x].to_f32();
                                    let w =
                                        s1.weights.load_f32(s1.weights.offset(o, c, 0, 0));
                                    acc += m * w;
                                }
                                let mut v = acc * scale;
                                if s1.relu {
                                    v = v.max(0.0);
                                }
                                out[dst_fmt.offset(dst_dims, b, o, y, x)] =
                                    T::from_accum(v, s1.round_mode);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn check_activation(t: &Tensor, what: &str) {
    assert!(
        matches!(t.format(), Format::Nchw | Format::Nhwc),
        "conv {what} must be nchw or nhwc, got {}",
        t.format()
    );
}

fn check_weights(t: &Tensor, stage: &str) {
    assert!(
        matches!(t.format(), Format::Nchw | Format::OIhw4i16o4i),
        "conv {stage} weights must be nchw or OIhw4i16o4i, got {}",
        t.format()
    );
}

fn check_bias(t: &Tensor, oc: usize, stage: &str) {
    assert_eq!(
        t.format(),
        Format::X,
        "conv {stage} bias must be a flat vector"
    );
    assert_eq!(
        t.nchw_dims()[0],
        oc,
        "conv {stage} bias length {} != {oc} output channels",
        t.nchw_dims()[0]
    );
}

fn check_scales(scales: &[f32], oc: usize, stage: &str) {
    assert!(
        scales.is_empty() || scales.len() == 1 || scales.len() == oc,
        "conv {stage} scale vector length {} incompatible with {oc} output channels",
        scales.len()
    );
}

/// Resolves the output-channel scale: empty means unscaled, a single value
/// is common to all channels, otherwise one value per channel.
fn scale_at(scales: &[f32], oc: usize) -> f32 {
    match scales.len() {
        0 => 1.0,
        1 => scales[0],
        _ => scales[oc],
    }
}
