// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scenario configuration loaded from TOML files or built programmatically.
//!
//! # TOML Format
//! ```toml
//! dtype = "u8"
//! batch = 1
//! in_channels = 16
//! height = 32
//! width = 32
//! out_channels = 16
//! kernel = [3, 3]
//! stride = [1, 1]
//! padding = [1, 1]
//! relu = true
//! scales = [0.05]
//! round_mode = "nearest"
//!
//! [pointwise]
//! channels = 32
//! relu = true
//! scales = [0.1]
//! ```

use std::path::Path;

use tensor_mem::{DType, RoundMode};

/// Errors from loading a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The scenario file could not be read.
    #[error("cannot read scenario '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The scenario file is not valid TOML for this schema.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The scenario parameters are inconsistent.
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Optional fused pointwise (1x1) stage of the scenario pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PointwiseConfig {
    /// Output channels of the pointwise projection.
    pub channels: usize,
    #[serde(default)]
    pub relu: bool,
    #[serde(default)]
    pub scales: Vec<f32>,
    #[serde(default = "default_round")]
    pub round_mode: RoundMode,
}

/// A synthetic convolution scenario.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScenarioConfig {
    /// Destination element type; selects the kernel instantiation.
    pub dtype: DType,
    pub batch: usize,
    pub in_channels: usize,
    pub height: usize,
    pub width: usize,
    /// Output channels of the primary convolution.
    pub out_channels: usize,
    /// Kernel size of the primary convolution, `[h, w]`.
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub padding: [usize; 2],
    #[serde(default)]
    pub relu: bool,
    #[serde(default)]
    pub scales: Vec<f32>,
    #[serde(default = "default_round")]
    pub round_mode: RoundMode,
    /// Present = fused two-stage convolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointwise: Option<PointwiseConfig>,
}

fn default_round() -> RoundMode {
    RoundMode::Nearest
}

impl ScenarioConfig {
    /// Loads a scenario from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parses a scenario from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Output spatial dims of the primary convolution.
    pub fn out_spatial(&self) -> Result<[usize; 2], ConfigError> {
        let [kh, kw] = self.kernel;
        let [sh, sw] = self.stride;
        let [ph, pw] = self.padding;
        if sh == 0 || sw == 0 {
            return Err(ConfigError::Invalid("stride must be positive".into()));
        }
        if self.height + 2 * ph < kh || self.width + 2 * pw < kw {
            return Err(ConfigError::Invalid(format!(
                "kernel {kh}x{kw} exceeds padded input {}x{}",
                self.height + 2 * ph,
                self.width + 2 * pw
            )));
        }
        Ok([
            (self.height + 2 * ph - kh) / sh + 1,
            (self.width + 2 * pw - kw) / sw + 1,
        ])
    }
}

impl Default for ScenarioConfig {
    /// A small quantized squeeze/expand block: 3x3 u8 conv fused with a
    /// channel-doubling 1x1 projection.
    fn default() -> Self {
        Self {
            dtype: DType::U8,
            batch: 1,
            in_channels: 16,
            height: 32,
            width: 32,
            out_channels: 16,
            kernel: [3, 3],
            stride: [1, 1],
            padding: [1, 1],
            relu: true,
            scales: vec![0.05],
            round_mode: RoundMode::Nearest,
            pointwise: Some(PointwiseConfig {
                channels: 32,
                relu: true,
                scales: vec![0.1],
                round_mode: RoundMode::Nearest,
            }),
        }
    }
}
