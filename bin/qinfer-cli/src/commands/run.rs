// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `qinfer run` command: execute a synthetic operator pipeline.
//!
//! Builds the scenario's tensors, constructs a (possibly fused) convolution
//! through the factory layer, feeds its output into a channel concatenation,
//! and reports per-operator submission timings.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use op_runtime::{concat, conv, conv_fused, Conv1x1Stage, Op};
use tensor_mem::{DType, Format, Tensor, CHANNEL_BLOCK, DEFAULT_ALIGNMENT};

use crate::config::ScenarioConfig;

pub fn execute(config_path: Option<PathBuf>, iterations: usize) -> anyhow::Result<()> {
    anyhow::ensure!(iterations > 0, "iterations must be positive");

    let scenario = match &config_path {
        Some(p) => ScenarioConfig::from_file(p)?,
        None => ScenarioConfig::default(),
    };
    let [oh, ow] = scenario.out_spatial()?;

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              qinfer · Pipeline Runner               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("  Scenario:");
    println!("   Dtype:      {}", scenario.dtype);
    println!(
        "   Source:     {}x{}x{}x{} (nhwc)",
        scenario.batch, scenario.in_channels, scenario.height, scenario.width
    );
    println!(
        "   Primary:    {} -> {} channels, {}x{} kernel, stride {:?}, padding {:?}",
        scenario.in_channels,
        scenario.out_channels,
        scenario.kernel[0],
        scenario.kernel[1],
        scenario.stride,
        scenario.padding
    );
    match &scenario.pointwise {
        Some(p) => println!("   Pointwise:  {} -> {} channels (fused 1x1)", scenario.out_channels, p.channels),
        None => println!("   Pointwise:  absent"),
    }
    println!("   Iterations: {iterations}");
    println!();

    // ── Tensors ────────────────────────────────────────────────
    let act_fmt = Format::Nhwc;
    let mut src = Tensor::new(
        [
            scenario.batch,
            scenario.in_channels,
            scenario.height,
            scenario.width,
        ],
        act_fmt,
        scenario.dtype,
        DEFAULT_ALIGNMENT,
    );
    fill_activation(&mut src);

    let [kh, kw] = scenario.kernel;
    let wei = build_weights(
        scenario.dtype,
        [scenario.out_channels, scenario.in_channels, kh, kw],
    );
    let bia = build_bias(scenario.dtype, scenario.out_channels);

    let final_channels = scenario
        .pointwise
        .as_ref()
        .map(|p| p.channels)
        .unwrap_or(scenario.out_channels);
    let mut conv_out = Tensor::new(
        [scenario.batch, final_channels, oh, ow],
        act_fmt,
        scenario.dtype,
        DEFAULT_ALIGNMENT,
    );

    let stage1_tensors = scenario.pointwise.as_ref().map(|p| {
        (
            build_weights(scenario.dtype, [p.channels, scenario.out_channels, 1, 1]),
            build_bias(scenario.dtype, p.channels),
        )
    });

    tracing::debug!("weights stored as {}", wei.format());

    // ── Convolution ────────────────────────────────────────────
    let conv_times = {
        let mut op: Box<dyn Op + '_> = match (&scenario.pointwise, &stage1_tensors) {
            (Some(p), Some((w1, b1))) => conv_fused(
                &src,
                &wei,
                &bia,
                scenario.stride,
                scenario.padding,
                Some(Conv1x1Stage {
                    weights: w1,
                    bias: b1,
                    relu: p.relu,
                    scales: p.scales.clone(),
                    round_mode: p.round_mode,
                }),
                &mut conv_out,
                scenario.relu,
                scenario.scales.clone(),
                scenario.round_mode,
            ),
            _ => conv(
                &src,
                &wei,
                &bia,
                scenario.stride,
                scenario.padding,
                &mut conv_out,
                scenario.relu,
                scenario.scales.clone(),
                scenario.round_mode,
            ),
        };
        time_submits(op.as_mut(), iterations)
    };

    // ── Concatenation ──────────────────────────────────────────
    // Concatenate the convolution output with itself, doubling channels.
    let mut concat_out = Tensor::new(
        [scenario.batch, 2 * final_channels, oh, ow],
        act_fmt,
        scenario.dtype,
        DEFAULT_ALIGNMENT,
    );
    let concat_times = {
        let mut op = concat(vec![&conv_out, &conv_out], &mut concat_out, false);
        time_submits(op.as_mut(), iterations)
    };

    // ── Summary ────────────────────────────────────────────────
    println!(
        "  {:<20} {:>10} {:>10} {:>10}",
        "Operator", "mean ms", "min ms", "max ms"
    );
    println!("  {}", "-".repeat(54));
    summarize(
        if scenario.pointwise.is_some() {
            "conv (fused 1x1)"
        } else {
            "conv"
        },
        &conv_times,
    );
    summarize("concat", &concat_times);
    println!();

    let elements = concat_out.size();
    let mean_value: f64 = (0..elements)
        .map(|i| concat_out.load_f32(i) as f64)
        .sum::<f64>()
        / elements as f64;
    println!(
        "  Output: {:?} ({} elements, mean value {:.3})",
        concat_out.nchw_dims(),
        elements,
        mean_value
    );
    Ok(())
}

fn time_submits(op: &mut dyn Op, iterations: usize) -> Vec<Duration> {
    let mut times = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        op.submit();
        times.push(start.elapsed());
    }
    times
}

fn summarize(name: &str, times: &[Duration]) {
    let ms = |d: &Duration| d.as_secs_f64() * 1000.0;
    let mean = times.iter().map(ms).sum::<f64>() / times.len() as f64;
    let min = times.iter().map(ms).fold(f64::INFINITY, f64::min);
    let max = times.iter().map(ms).fold(0.0f64, f64::max);
    println!("  {name:<20} {mean:>10.3} {min:>10.3} {max:>10.3}");
}

/// Deterministic activation data in the tensor's own dtype.
fn fill_activation(t: &mut Tensor) {
    match t.dtype() {
        DType::F32 => {
            for (i, v) in t.as_mut_slice::<f32>().iter_mut().enumerate() {
                *v = ((i % 23) as f32 - 11.0) * 0.125;
            }
        }
        DType::S32 => {
            for (i, v) in t.as_mut_slice::<i32>().iter_mut().enumerate() {
                *v = (i % 23) as i32 - 11;
            }
        }
        DType::S8 => {
            for (i, v) in t.as_mut_slice::<i8>().iter_mut().enumerate() {
                *v = ((i % 23) as i32 - 11) as i8;
            }
        }
        DType::U8 => {
            for (i, v) in t.as_mut_slice::<u8>().iter_mut().enumerate() {
                *v = (i % 23) as u8;
            }
        }
    }
}

/// Weight tensor paired to the destination dtype: f32 destinations use f32
/// weights, quantized ones use s8. Uses the blocked layout when both
/// channel counts allow it.
fn build_weights(dst_dtype: DType, dims: [usize; 4]) -> Tensor {
    let fmt = if dims[0] % CHANNEL_BLOCK == 0 && dims[1] % CHANNEL_BLOCK == 0 {
        Format::OIhw4i16o4i
    } else {
        Format::Nchw
    };
    let dtype = match dst_dtype {
        DType::F32 => DType::F32,
        _ => DType::S8,
    };
    let mut t = Tensor::new(dims, fmt, dtype, DEFAULT_ALIGNMENT);
    match dtype {
        DType::F32 => {
            for (i, v) in t.as_mut_slice::<f32>().iter_mut().enumerate() {
                *v = ((i % 13) as f32 - 6.0) * 0.1;
            }
        }
        _ => {
            for (i, v) in t.as_mut_slice::<i8>().iter_mut().enumerate() {
                *v = ((i % 13) as i32 - 6) as i8;
            }
        }
    }
    t
}

/// Bias vector paired to the destination dtype: f32 or s32.
fn build_bias(dst_dtype: DType, len: usize) -> Tensor {
    let dtype = match dst_dtype {
        DType::F32 => DType::F32,
        _ => DType::S32,
    };
    let mut t = Tensor::vector(len, dtype, DEFAULT_ALIGNMENT);
    match dtype {
        DType::F32 => {
            for (i, v) in t.as_mut_slice::<f32>().iter_mut().enumerate() {
                *v = i as f32 * 0.5 - 1.0;
            }
        }
        _ => {
            for (i, v) in t.as_mut_slice::<i32>().iter_mut().enumerate() {
                *v = i as i32 - 2;
            }
        }
    }
    t
}
