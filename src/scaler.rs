// Scaler
// The scale() entry point, engine configuration and channel documents

use crate::chain;
use crate::error::Result;
use crate::properties::{widen, ChannelProperties, RawSample};
use crate::scale_parser::{parse_status, ScaleChain};
use crate::scales::ScalingStatus;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    /// Upper bound on Newton iterations for RTD temperatures below 0 °C.
    pub rtd_max_iterations: u32,
    /// Step size (°C) at which the RTD Newton iteration is considered converged.
    pub rtd_tolerance: f64,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        ScalerConfig {
            rtd_max_iterations: 50,
            rtd_tolerance: 1e-9,
        }
    }
}

/// Converts raw channel samples to physical values.
#[derive(Debug, Clone, Default)]
pub struct Scaler {
    config: ScalerConfig,
}

impl Scaler {
    pub fn new(config: ScalerConfig) -> Self {
        Scaler { config }
    }

    pub fn config(&self) -> &ScalerConfig {
        &self.config
    }

    /// Scale one channel's raw values according to its properties.
    ///
    /// Channels whose status is `scaled` are returned unchanged.
    pub fn scale(&self, properties: &ChannelProperties, raw: &[f64]) -> Result<Vec<f64>> {
        if parse_status(properties)? == ScalingStatus::Scaled {
            debug!("channel already scaled, returning raw values");
            return Ok(raw.to_vec());
        }
        let chain = ScaleChain::from_properties(properties)?;
        self.scale_with_chain(&chain, raw)
    }

    /// Scale with an already parsed chain.
    pub fn scale_with_chain(&self, chain: &ScaleChain, raw: &[f64]) -> Result<Vec<f64>> {
        if chain.status == ScalingStatus::Scaled {
            debug!("channel already scaled, returning raw values");
            return Ok(raw.to_vec());
        }
        chain::resolve(chain, raw, &self.config)
    }

    /// Widen integer or single precision samples and scale them.
    pub fn scale_samples<T: RawSample>(
        &self,
        properties: &ChannelProperties,
        raw: &[T],
    ) -> Result<Vec<f64>> {
        self.scale(properties, &widen(raw))
    }

    /// Scale many channels in parallel. Results are in input order; a
    /// failing channel does not affect the others.
    pub fn scale_channels(&self, channels: &[ChannelRecord]) -> Vec<Result<Vec<f64>>> {
        channels
            .par_iter()
            .map(|channel| self.scale(&channel.properties, &channel.data))
            .collect()
    }
}

/// Scale `raw` with the default configuration.
pub fn scale(properties: &ChannelProperties, raw: &[f64]) -> Result<Vec<f64>> {
    Scaler::default().scale(properties, raw)
}

/// A channel as handed over by the file decoding layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub name: String,
    #[serde(default)]
    pub properties: ChannelProperties,
    #[serde(default)]
    pub data: Vec<f64>,
}

/// A set of decoded channels plus the configuration to scale them with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelDocument {
    #[serde(default)]
    pub config: ScalerConfig,
    pub channels: Vec<ChannelRecord>,
}

impl ChannelDocument {
    /// Load a channel document from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn scaler(&self) -> Scaler {
        Scaler::new(self.config.clone())
    }
}
