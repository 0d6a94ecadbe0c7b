// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `qinfer layout` command: display the physical mapping of a logical shape.

use tensor_mem::{DType, Format, CHANNEL_BLOCK};

pub fn execute(shape: &str, format: &str) -> anyhow::Result<()> {
    let dims = parse_shape(shape)?;
    let fmt: Format = format.parse()?;

    // Pre-validate what Format::physical_dims treats as fatal, so a typo on
    // the command line reports as a normal error instead of a panic.
    anyhow::ensure!(
        fmt != Format::X,
        "format 'x' is for 1-D vectors and has no 4-D mapping"
    );
    if fmt == Format::OIhw4i16o4i {
        anyhow::ensure!(
            dims[0] % CHANNEL_BLOCK == 0 && dims[1] % CHANNEL_BLOCK == 0,
            "format OIhw4i16o4i requires channel counts divisible by {CHANNEL_BLOCK}, got {}x{}",
            dims[0],
            dims[1]
        );
    }

    let physical = fmt.physical_dims(dims);
    let elements: usize = physical.iter().product();

    println!("  Logical (nchw): {dims:?}");
    println!("  Format:         {fmt}");
    println!("  Physical dims:  {physical:?}");
    println!("  Elements:       {elements}");
    println!();
    println!("  Buffer size by element type:");
    for dtype in DType::all() {
        println!(
            "   {:<4} {:>12} bytes",
            dtype.as_str(),
            elements * dtype.size_bytes()
        );
    }
    Ok(())
}

/// Parses a comma-separated NCHW shape.
fn parse_shape(s: &str) -> anyhow::Result<[usize; 4]> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("invalid shape '{s}': {e}"))?;
    anyhow::ensure!(
        parts.len() == 4,
        "expected 4 comma-separated dims, got {}",
        parts.len()
    );
    Ok([parts[0], parts[1], parts[2], parts[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("1,64,56,56").unwrap(), [1, 64, 56, 56]);
        assert_eq!(parse_shape(" 2, 4, 3, 3 ").unwrap(), [2, 4, 3, 3]);
        assert!(parse_shape("1,2,3").is_err());
        assert!(parse_shape("a,b,c,d").is_err());
    }
}
