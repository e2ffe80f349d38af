// src/lib.rs
// TDMS Scale Library - Public API

//! # TDMS Scale
//!
//! Converts raw NI TDMS channel samples into engineering units using the
//! scale chain a channel declares in its `NI_Scale[i]_*` properties.
//!
//! ## Features
//!
//! - Linear, polynomial, table, thermocouple, RTD, strain, thermistor,
//!   add, subtract and AdvancedAPI (pass-through) scales
//! - Chained scales in dependency order, with cycle detection
//! - NIST ITS-90 thermocouple reference functions for types B, E, J, K, N, R, S and T
//! - Parallel scaling of many channels
//!
//! ## Example
//!
//! ```
//! use tdms_scale::{scale, ChannelProperties};
//!
//! let props = ChannelProperties::new()
//!     .with("NI_Scaling_Status", "unscaled")
//!     .with("NI_Number_Of_Scales", 1i32)
//!     .with("NI_Scale[0]_Scale_Type", "Linear")
//!     .with("NI_Scale[0]_Linear_Slope", 2.0)
//!     .with("NI_Scale[0]_Linear_Y_Intercept", 10.0)
//!     .with("NI_Scale[0]_Linear_Input_Source", 0xFFFF_FFFFu32);
//!
//! let scaled = scale(&props, &[1.0, 2.0, 3.0]).expect("valid scale chain");
//! assert_eq!(scaled, vec![12.0, 14.0, 16.0]);
//! ```

mod chain;
mod error;
mod properties;
pub mod reference_tables;
mod rtd;
mod scale_parser;
mod scaler;
mod scales;
mod strain;
mod thermocouple;

pub use chain::{evaluation_order, resolve};
pub use error::{ErrorCategory, Result, ScalingError};
pub use properties::{widen, ChannelProperties, PropertyValue, RawSample, Timestamp};
pub use reference_tables::{BridgeConfiguration, ExcitationType, ThermocoupleType};
pub use scale_parser::{ScaleChain, NUMBER_OF_SCALES, RAW_INPUT_SOURCE, SCALING_STATUS};
pub use scaler::{scale, ChannelDocument, ChannelRecord, Scaler, ScalerConfig};
pub use scales::{
    InputSource, LookupTable, ResistanceConfiguration, RtdParameters, ScaleDefinition, ScaleKind,
    ScalingStatus, StrainParameters, ThermistorParameters, ThermocoupleDirection,
};
