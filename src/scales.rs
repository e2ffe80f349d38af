// Scale Definitions
// Typed scale kinds and the arithmetic evaluators

use crate::error::{Result, ScalingError};
use crate::reference_tables::{BridgeConfiguration, ExcitationType, ThermocoupleType};
use crate::rtd;
use crate::scaler::ScalerConfig;
use crate::strain;
use crate::thermocouple;
use log::warn;
use std::cmp::Ordering;
use std::fmt;

/// Where a scale reads its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// The channel's unscaled samples.
    Raw,
    /// The output of the scale at this index in the same chain.
    PriorScale(usize),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Raw => write!(f, "raw"),
            InputSource::PriorScale(i) => write!(f, "scale {}", i),
        }
    }
}

/// Whether the stored samples still need scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingStatus {
    /// Stored values are raw and the chain must be applied.
    #[default]
    Unscaled,
    /// Stored values are already in physical units.
    Scaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermocoupleDirection {
    VoltageToTemperature,
    TemperatureToVoltage,
}

/// 2, 3 or 4-wire resistance measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResistanceConfiguration {
    TwoWire,
    ThreeWire,
    FourWire,
}

impl ResistanceConfiguration {
    pub fn from_wires(wires: i64) -> Option<Self> {
        match wires {
            2 => Some(ResistanceConfiguration::TwoWire),
            3 => Some(ResistanceConfiguration::ThreeWire),
            4 => Some(ResistanceConfiguration::FourWire),
            _ => None,
        }
    }

    /// Resistance to subtract from a measured value for the given lead wire resistance.
    pub fn lead_compensation(self, lead_resistance: f64) -> f64 {
        match self {
            ResistanceConfiguration::TwoWire => 2.0 * lead_resistance,
            ResistanceConfiguration::ThreeWire => lead_resistance,
            ResistanceConfiguration::FourWire => 0.0,
        }
    }
}

/// Piecewise linear lookup from pre-scaled to scaled values.
///
/// Knots are validated on construction: equal lengths, at least one knot,
/// strictly ascending pre-scaled values.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    pre_scaled: Vec<f64>,
    scaled: Vec<f64>,
}

impl LookupTable {
    pub fn new(scale: usize, pre_scaled: Vec<f64>, scaled: Vec<f64>) -> Result<Self> {
        if pre_scaled.len() != scaled.len() {
            return Err(ScalingError::InvalidTable {
                scale,
                reason: format!(
                    "{} pre-scaled values but {} scaled values",
                    pre_scaled.len(),
                    scaled.len()
                ),
            });
        }
        if pre_scaled.is_empty() {
            return Err(ScalingError::InvalidTable {
                scale,
                reason: "table has no knots".to_string(),
            });
        }
        if let Some(k) = pre_scaled
            .windows(2)
            .position(|w| w[0].partial_cmp(&w[1]) != Some(Ordering::Less))
        {
            return Err(ScalingError::InvalidTable {
                scale,
                reason: format!(
                    "pre-scaled values not strictly ascending at knot {} ({} then {})",
                    k + 1,
                    pre_scaled[k],
                    pre_scaled[k + 1]
                ),
            });
        }
        Ok(LookupTable { pre_scaled, scaled })
    }

    pub fn pre_scaled(&self) -> &[f64] {
        &self.pre_scaled
    }

    pub fn scaled(&self) -> &[f64] {
        &self.scaled
    }

    /// Look up one value. Returns the value and whether it was clamped.
    fn lookup(&self, x: f64) -> (f64, bool) {
        let last = self.pre_scaled.len() - 1;
        if x.is_nan() {
            return (x, false);
        }
        if x <= self.pre_scaled[0] {
            return (self.scaled[0], x < self.pre_scaled[0]);
        }
        if x >= self.pre_scaled[last] {
            return (self.scaled[last], x > self.pre_scaled[last]);
        }
        // first knot strictly greater than x; x lies in [k - 1, k)
        let k = self.pre_scaled.partition_point(|&knot| knot <= x);
        let (x0, x1) = (self.pre_scaled[k - 1], self.pre_scaled[k]);
        let (y0, y1) = (self.scaled[k - 1], self.scaled[k]);
        if x == x0 {
            return (y0, false);
        }
        (y0 + (x - x0) * (y1 - y0) / (x1 - x0), false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RtdParameters {
    pub current_excitation: f64,
    pub r0: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub lead_resistance: f64,
    pub configuration: ResistanceConfiguration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrainParameters {
    pub configuration: BridgeConfiguration,
    pub gauge_factor: f64,
    pub poisson_ratio: f64,
    pub gage_resistance: f64,
    pub lead_resistance: f64,
    pub excitation_voltage: f64,
    pub initial_bridge_voltage: f64,
    pub shunt_calibration_gain_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThermistorParameters {
    pub configuration: ResistanceConfiguration,
    pub excitation_type: ExcitationType,
    pub excitation_value: f64,
    pub r1: f64,
    pub lead_resistance: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub temperature_offset: f64,
}

/// Kind-specific parameters of a scale.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleKind {
    Linear { slope: f64, intercept: f64 },
    /// Coefficients in ascending power order, never empty.
    Polynomial { coefficients: Vec<f64> },
    Table(LookupTable),
    Thermocouple {
        thermocouple_type: ThermocoupleType,
        direction: ThermocoupleDirection,
    },
    Rtd(RtdParameters),
    Strain(StrainParameters),
    Thermistor(ThermistorParameters),
    /// `left + right`, left being the scale's main input.
    Add { right: InputSource },
    /// `left - right`, left being the scale's main input.
    Subtract { right: InputSource },
    /// Scaling performed by the vendor API; passes values through.
    AdvancedApi,
}

impl ScaleKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScaleKind::Linear { .. } => "Linear",
            ScaleKind::Polynomial { .. } => "Polynomial",
            ScaleKind::Table(_) => "Table",
            ScaleKind::Thermocouple { .. } => "Thermocouple",
            ScaleKind::Rtd(_) => "RTD",
            ScaleKind::Strain(_) => "Strain",
            ScaleKind::Thermistor(_) => "Thermistor",
            ScaleKind::Add { .. } => "Add",
            ScaleKind::Subtract { .. } => "Subtract",
            ScaleKind::AdvancedApi => "AdvancedAPI",
        }
    }
}

/// One entry of a channel's scale chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleDefinition {
    pub kind: ScaleKind,
    pub input: InputSource,
}

impl ScaleDefinition {
    pub fn new(kind: ScaleKind, input: InputSource) -> Self {
        ScaleDefinition { kind, input }
    }

    /// Every source this scale reads, main input first.
    pub fn sources(&self) -> Vec<InputSource> {
        match self.kind {
            ScaleKind::Add { right } | ScaleKind::Subtract { right } => vec![self.input, right],
            _ => vec![self.input],
        }
    }

    /// Apply this scale. `inputs` holds one array per entry of [`sources`](Self::sources).
    pub fn evaluate(
        &self,
        index: usize,
        inputs: &[&[f64]],
        config: &ScalerConfig,
    ) -> Result<Vec<f64>> {
        let expected = self.sources().len();
        if inputs.len() != expected {
            return Err(ScalingError::InputMismatch {
                scale: index,
                reason: format!("expected {} input array(s), got {}", expected, inputs.len()),
            });
        }
        let input = inputs[0];
        if let Some(other) = inputs[1..].iter().find(|other| other.len() != input.len()) {
            return Err(ScalingError::InputMismatch {
                scale: index,
                reason: format!("operand lengths {} and {} differ", input.len(), other.len()),
            });
        }

        let output = match &self.kind {
            ScaleKind::Linear { slope, intercept } => linear(input, *slope, *intercept),
            ScaleKind::Polynomial { coefficients } => polynomial(input, coefficients),
            ScaleKind::Table(table) => lookup(index, input, table),
            ScaleKind::Thermocouple {
                thermocouple_type,
                direction,
            } => thermocouple::scale(index, input, *thermocouple_type, *direction),
            ScaleKind::Rtd(params) => rtd::scale_rtd(index, input, params, config)?,
            ScaleKind::Strain(params) => strain::scale(input, params),
            ScaleKind::Thermistor(params) => rtd::scale_thermistor(index, input, params)?,
            ScaleKind::Add { .. } => input.iter().zip(inputs[1]).map(|(l, r)| l + r).collect(),
            ScaleKind::Subtract { .. } => {
                input.iter().zip(inputs[1]).map(|(l, r)| l - r).collect()
            }
            ScaleKind::AdvancedApi => input.to_vec(),
        };
        Ok(output)
    }
}

impl fmt::Display for ScaleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ScaleKind::Linear { slope, intercept } => {
                write!(f, "Linear(slope={}, intercept={})", slope, intercept)?
            }
            ScaleKind::Polynomial { coefficients } => {
                write!(f, "Polynomial(coefficients={:?})", coefficients)?
            }
            ScaleKind::Table(table) => write!(f, "Table({} knots)", table.pre_scaled.len())?,
            ScaleKind::Thermocouple {
                thermocouple_type,
                direction,
            } => write!(f, "Thermocouple(type={:?}, {:?})", thermocouple_type, direction)?,
            ScaleKind::Rtd(p) => write!(f, "RTD(R0={}, {:?})", p.r0, p.configuration)?,
            ScaleKind::Strain(p) => write!(
                f,
                "Strain({:?}, GF={})",
                p.configuration, p.gauge_factor
            )?,
            ScaleKind::Thermistor(p) => write!(f, "Thermistor({:?})", p.excitation_type)?,
            ScaleKind::Add { right } => write!(f, "Add(right={})", right)?,
            ScaleKind::Subtract { right } => write!(f, "Subtract(right={})", right)?,
            ScaleKind::AdvancedApi => write!(f, "AdvancedAPI")?,
        }
        write!(f, " <- {}", self.input)
    }
}

/// Evaluate a polynomial with ascending coefficients by Horner's method.
#[inline]
pub fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

pub fn linear(input: &[f64], slope: f64, intercept: f64) -> Vec<f64> {
    input.iter().map(|&x| slope * x + intercept).collect()
}

pub fn polynomial(input: &[f64], coefficients: &[f64]) -> Vec<f64> {
    input.iter().map(|&x| horner(coefficients, x)).collect()
}

pub fn lookup(index: usize, input: &[f64], table: &LookupTable) -> Vec<f64> {
    let mut clamped = 0usize;
    let output = input
        .iter()
        .map(|&x| {
            let (y, was_clamped) = table.lookup(x);
            clamped += was_clamped as usize;
            y
        })
        .collect();
    if clamped > 0 {
        warn!(
            "scale {}: {} of {} samples outside table range, clamped to end knots",
            index,
            clamped,
            input.len()
        );
    }
    output
}
