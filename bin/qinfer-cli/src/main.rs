// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # qinfer
//!
//! Command-line interface for the qinfer operator core.
//!
//! ## Usage
//! ```bash
//! # Run the default quantized fused-conv + concat pipeline
//! qinfer run
//!
//! # Run a scenario from a TOML file, timing 100 submissions
//! qinfer run --config scenario.toml --iterations 100
//!
//! # Inspect how a logical shape maps into a physical layout
//! qinfer layout --shape 32,64,3,3 --format OIhw4i16o4i
//! ```

mod commands;
mod config;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "qinfer",
    about = "Typed-memory and operator-dispatch core for quantized inference kernels",
    version
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic fused-convolution + concatenation pipeline.
    Run {
        /// Path to a TOML scenario file (built-in defaults when omitted).
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Number of times each operator is submitted.
        #[arg(short, long, default_value_t = 10)]
        iterations: usize,
    },

    /// Show the physical dimension mapping of a logical NCHW shape.
    Layout {
        /// Logical NCHW shape, comma-separated (e.g. "1,64,56,56").
        #[arg(short, long)]
        shape: String,

        /// Memory format: nchw, nhwc, or OIhw4i16o4i.
        #[arg(short, long, default_value = "nchw")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { config, iterations } => commands::run::execute(config, iterations),
        Commands::Layout { shape, format } => commands::layout::execute(&shape, &format),
    }
}
