// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: factory dispatch and end-to-end operator execution
//! through the public API.

use op_runtime::{concat, conv, conv_fused, Conv1x1Stage, Op};
use tensor_mem::{DType, Format, RoundMode, Tensor, DEFAULT_ALIGNMENT};

// ── Helpers ────────────────────────────────────────────────────

/// Fills a tensor with a small deterministic pattern over its logical
/// coordinates, identical across layouts.
fn fill_pattern(t: &mut Tensor) {
    let [n, c, h, w] = t.nchw_dims();
    let dtype = t.dtype();
    for b in 0..n {
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    let v = ((b + 3 * ch + 5 * y + 7 * x) % 11) as f32 - 4.0;
                    let off = t.offset(b, ch, y, x);
                    match dtype {
                        DType::F32 => t.as_mut_slice::<f32>()[off] = v * 0.5,
                        DType::S32 => t.as_mut_slice::<i32>()[off] = v as i32,
                        DType::S8 => t.as_mut_slice::<i8>()[off] = v as i8,
                        DType::U8 => t.as_mut_slice::<u8>()[off] = (v + 4.0) as u8,
                    }
                }
            }
        }
    }
}

fn read_logical_f32(t: &Tensor) -> Vec<f32> {
    let [n, c, h, w] = t.nchw_dims();
    let mut out = Vec::with_capacity(t.size());
    for b in 0..n {
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    out.push(t.load_f32(t.offset(b, ch, y, x)));
                }
            }
        }
    }
    out
}

fn weights_for(dst_dtype: DType, dims: [usize; 4]) -> Tensor {
    // Quantized destinations pair with s8 weights, float with f32.
    let dtype = match dst_dtype {
        DType::F32 => DType::F32,
        _ => DType::S8,
    };
    let mut t = Tensor::new(dims, Format::Nchw, dtype, DEFAULT_ALIGNMENT);
    fill_pattern(&mut t);
    t
}

fn bias_for(dst_dtype: DType, len: usize) -> Tensor {
    let dtype = match dst_dtype {
        DType::F32 => DType::F32,
        _ => DType::S32,
    };
    Tensor::vector(len, dtype, DEFAULT_ALIGNMENT)
}

// ── Dispatch completeness ──────────────────────────────────────

#[test]
fn concat_constructs_and_runs_for_every_dtype() {
    for dtype in DType::all() {
        let mut a = Tensor::new([1, 1, 2, 2], Format::Nchw, dtype, DEFAULT_ALIGNMENT);
        fill_pattern(&mut a);
        let mut b = Tensor::new([1, 1, 2, 2], Format::Nchw, dtype, DEFAULT_ALIGNMENT);
        fill_pattern(&mut b);
        let mut dst = Tensor::new([1, 2, 2, 2], Format::Nchw, dtype, DEFAULT_ALIGNMENT);

        let mut op = concat(vec![&a, &b], &mut dst, false);
        assert!(
            op.name().contains(dtype.as_str()),
            "operator name '{}' should carry the dtype tag",
            op.name()
        );
        op.submit();
        drop(op);

        let logical = read_logical_f32(&dst);
        assert_eq!(&logical[..4], &read_logical_f32(&a)[..]);
        assert_eq!(&logical[4..], &read_logical_f32(&b)[..]);
    }
}

#[test]
fn conv_constructs_and_runs_for_every_dtype() {
    for dtype in DType::all() {
        let mut src = Tensor::new([1, 2, 3, 3], Format::Nhwc, dtype, DEFAULT_ALIGNMENT);
        fill_pattern(&mut src);
        let wei = weights_for(dtype, [4, 2, 3, 3]);
        let bia = bias_for(dtype, 4);
        let mut dst = Tensor::new([1, 4, 3, 3], Format::Nhwc, dtype, DEFAULT_ALIGNMENT);

        let mut op = conv(
            &src,
            &wei,
            &bia,
            [1, 1],
            [1, 1],
            &mut dst,
            true,
            vec![0.5],
            RoundMode::Nearest,
        );
        assert!(op.name().contains(dtype.as_str()));
        op.submit();
    }
}

// ── Single-stage / fused equivalence ───────────────────────────

#[test]
fn single_stage_conv_equals_fused_with_absent_stage() {
    for dtype in [DType::F32, DType::U8] {
        let mut src = Tensor::new([2, 3, 4, 4], Format::Nchw, dtype, DEFAULT_ALIGNMENT);
        fill_pattern(&mut src);
        let wei = weights_for(dtype, [2, 3, 3, 3]);
        let bia = bias_for(dtype, 2);

        let mut plain = Tensor::new([2, 2, 2, 2], Format::Nchw, dtype, DEFAULT_ALIGNMENT);
        conv(
            &src,
            &wei,
            &bia,
            [1, 1],
            [0, 0],
            &mut plain,
            true,
            vec![0.25, 0.5],
            RoundMode::Down,
        )
        .submit();

        let mut fused = Tensor::new([2, 2, 2, 2], Format::Nchw, dtype, DEFAULT_ALIGNMENT);
        conv_fused(
            &src,
            &wei,
            &bia,
            [1, 1],
            [0, 0],
            None,
            &mut fused,
            true,
            vec![0.25, 0.5],
            RoundMode::Down,
        )
        .submit();

        assert_eq!(read_logical_f32(&plain), read_logical_f32(&fused));
    }
}

// ── Fused two-stage execution ──────────────────────────────────

#[test]
fn fused_pointwise_stage_runs_quantized() {
    let mut src = Tensor::new([1, 2, 2, 2], Format::Nhwc, DType::U8, DEFAULT_ALIGNMENT);
    fill_pattern(&mut src);
    let wei = weights_for(DType::U8, [2, 2, 1, 1]);
    let bia = bias_for(DType::U8, 2);
    let wei1 = weights_for(DType::U8, [4, 2, 1, 1]);
    let bia1 = bias_for(DType::U8, 4);

    let mut dst = Tensor::new([1, 4, 2, 2], Format::Nhwc, DType::U8, DEFAULT_ALIGNMENT);
    let mut op = conv_fused(
        &src,
        &wei,
        &bia,
        [1, 1],
        [0, 0],
        Some(Conv1x1Stage {
            weights: &wei1,
            bias: &bia1,
            relu: true,
            scales: vec![0.1],
            round_mode: RoundMode::Nearest,
        }),
        &mut dst,
        true,
        vec![0.5],
        RoundMode::Nearest,
    );
    assert_eq!(op.name(), "conv_fused_u8");
    op.submit();
    // Repeated submission is idempotent on the same inputs.
    op.submit();
    drop(op);

    let first = read_logical_f32(&dst);
    assert_eq!(first.len(), 16);
}

// ── Layout independence ────────────────────────────────────────

#[test]
fn conv_results_agree_across_activation_layouts() {
    let mut results = Vec::new();
    for fmt in [Format::Nchw, Format::Nhwc] {
        let mut src = Tensor::new([1, 3, 4, 4], fmt, DType::F32, DEFAULT_ALIGNMENT);
        fill_pattern(&mut src);
        let wei = weights_for(DType::F32, [2, 3, 3, 3]);
        let bia = bias_for(DType::F32, 2);
        let mut dst = Tensor::new([1, 2, 2, 2], fmt, DType::F32, DEFAULT_ALIGNMENT);

        conv(
            &src,
            &wei,
            &bia,
            [1, 1],
            [0, 0],
            &mut dst,
            false,
            vec![],
            RoundMode::Nearest,
        )
        .submit();
        results.push(read_logical_f32(&dst));
    }
    assert_eq!(results[0], results[1]);
}

// ── End-to-end concat scenario ─────────────────────────────────

#[test]
fn concat_stacks_channels_without_value_alteration() {
    let mut a = Tensor::new([1, 2, 4, 4], Format::Nchw, DType::F32, DEFAULT_ALIGNMENT);
    let mut b = Tensor::new([1, 2, 4, 4], Format::Nchw, DType::F32, DEFAULT_ALIGNMENT);
    for (i, v) in a.as_mut_slice::<f32>().iter_mut().enumerate() {
        *v = i as f32 - 10.0;
    }
    for (i, v) in b.as_mut_slice::<f32>().iter_mut().enumerate() {
        *v = 100.0 + i as f32;
    }
    let mut dst = Tensor::new([1, 4, 4, 4], Format::Nchw, DType::F32, DEFAULT_ALIGNMENT);

    concat(vec![&a, &b], &mut dst, false).submit();

    // nchw destination: source planes land contiguously, in order, unchanged.
    let out = dst.as_slice::<f32>();
    assert_eq!(&out[..32], a.as_slice::<f32>());
    assert_eq!(&out[32..], b.as_slice::<f32>());
}
