// Scale Descriptor Parser
// Builds a typed ScaleChain from NI_Scale[i]_* channel properties

use crate::error::{Result, ScalingError};
use crate::properties::{ChannelProperties, PropertyValue};
use crate::reference_tables::{BridgeConfiguration, ExcitationType, ThermocoupleType};
use crate::scales::{
    InputSource, LookupTable, ResistanceConfiguration, RtdParameters, ScaleDefinition, ScaleKind,
    ScalingStatus, StrainParameters, ThermistorParameters, ThermocoupleDirection,
};
use log::debug;
use std::fmt::Write;

pub const SCALING_STATUS: &str = "NI_Scaling_Status";
pub const NUMBER_OF_SCALES: &str = "NI_Number_Of_Scales";

/// Input source value meaning "the channel's raw data".
pub const RAW_INPUT_SOURCE: i64 = 0xFFFF_FFFF;

/// Ordered scales declared by one channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScaleChain {
    pub status: ScalingStatus,
    pub scales: Vec<ScaleDefinition>,
}

impl ScaleChain {
    pub fn new(status: ScalingStatus, scales: Vec<ScaleDefinition>) -> Self {
        ScaleChain { status, scales }
    }

    /// Parse the chain described by a channel's properties.
    ///
    /// A channel without `NI_Number_Of_Scales` has an empty chain.
    pub fn from_properties(props: &ChannelProperties) -> Result<Self> {
        let status = parse_status(props)?;
        let count = match props.get(NUMBER_OF_SCALES) {
            None => 0,
            Some(value) => value
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| ScalingError::InvalidScaleCount(format!("{:?}", value)))?,
        };

        let scales = (0..count)
            .map(|index| ScaleReader::new(props, index).read())
            .collect::<Result<Vec<_>>>()?;

        debug!("parsed {} scale(s), status {:?}", scales.len(), status);
        Ok(ScaleChain { status, scales })
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// One line per scale, for display.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (i, scale) in self.scales.iter().enumerate() {
            let _ = writeln!(out, "[{}] {}", i, scale);
        }
        out
    }
}

pub(crate) fn parse_status(props: &ChannelProperties) -> Result<ScalingStatus> {
    match props.get(SCALING_STATUS) {
        None => Ok(ScalingStatus::Unscaled),
        Some(value) => match value.as_str() {
            Some("unscaled") => Ok(ScalingStatus::Unscaled),
            Some("scaled") => Ok(ScalingStatus::Scaled),
            _ => Err(ScalingError::InvalidScalingStatus(format!("{:?}", value))),
        },
    }
}

/// Typed access to the `NI_Scale[index]_*` properties of one scale.
struct ScaleReader<'a> {
    props: &'a ChannelProperties,
    index: usize,
}

impl<'a> ScaleReader<'a> {
    fn new(props: &'a ChannelProperties, index: usize) -> Self {
        ScaleReader { props, index }
    }

    fn key(&self, parameter: &str) -> String {
        format!("NI_Scale[{}]_{}", self.index, parameter)
    }

    fn value(&self, parameter: &str) -> Option<&'a PropertyValue> {
        self.props.get(&self.key(parameter))
    }

    fn require(&self, parameter: &str) -> Result<&'a PropertyValue> {
        self.value(parameter)
            .ok_or_else(|| ScalingError::missing(self.index, parameter))
    }

    fn number(&self, parameter: &str) -> Result<f64> {
        let value = self.require(parameter)?;
        value.as_f64().ok_or_else(|| {
            ScalingError::invalid(
                self.index,
                parameter,
                format!("expected a number, found {}", value.type_name()),
            )
        })
    }

    fn integer(&self, parameter: &str) -> Result<i64> {
        let value = self.require(parameter)?;
        value.as_i64().ok_or_else(|| {
            ScalingError::invalid(
                self.index,
                parameter,
                format!("expected an integer, found {:?}", value),
            )
        })
    }

    fn nonzero(&self, parameter: &str) -> Result<f64> {
        let value = self.number(parameter)?;
        if value == 0.0 {
            return Err(ScalingError::invalid(self.index, parameter, "must not be zero"));
        }
        Ok(value)
    }

    fn input_source(&self, parameter: &str) -> Result<InputSource> {
        match self.value(parameter) {
            None => Ok(InputSource::Raw),
            Some(value) => self.decode_source(value),
        }
    }

    fn required_input_source(&self, parameter: &str) -> Result<InputSource> {
        self.decode_source(self.require(parameter)?)
    }

    fn decode_source(&self, value: &PropertyValue) -> Result<InputSource> {
        match value.as_i64() {
            Some(RAW_INPUT_SOURCE) | Some(-1) => Ok(InputSource::Raw),
            Some(n) if (0..RAW_INPUT_SOURCE).contains(&n) => {
                Ok(InputSource::PriorScale(n as usize))
            }
            _ => Err(ScalingError::InvalidInputSource {
                scale: self.index,
                value: format!("{:?}", value),
            }),
        }
    }

    /// `name[0]`, `name[1]`, ... either up to `name_Size` or until the first gap.
    fn array(&self, name: &str) -> Result<Vec<f64>> {
        let size_parameter = format!("{}_Size", name);
        match self.value(&size_parameter) {
            Some(_) => {
                let size = usize::try_from(self.integer(&size_parameter)?).map_err(|_| {
                    ScalingError::invalid(self.index, size_parameter.as_str(), "negative size")
                })?;
                (0..size)
                    .map(|k| self.number(&format!("{}[{}]", name, k)))
                    .collect()
            }
            None => {
                let mut values = Vec::new();
                while self.value(&format!("{}[{}]", name, values.len())).is_some() {
                    values.push(self.number(&format!("{}[{}]", name, values.len()))?);
                }
                Ok(values)
            }
        }
    }

    fn wiring(&self, parameter: &str) -> Result<ResistanceConfiguration> {
        let wires = self.integer(parameter)?;
        ResistanceConfiguration::from_wires(wires).ok_or_else(|| {
            ScalingError::invalid(
                self.index,
                parameter,
                format!("expected 2, 3 or 4 wires, found {}", wires),
            )
        })
    }

    fn read(&self) -> Result<ScaleDefinition> {
        let kind_value = self.require("Scale_Type")?;
        let kind = kind_value.as_str().ok_or_else(|| {
            ScalingError::invalid(self.index, "Scale_Type", "expected a string")
        })?;

        let scale = match kind {
            "Linear" => ScaleDefinition::new(
                ScaleKind::Linear {
                    slope: self.number("Linear_Slope")?,
                    intercept: self.number("Linear_Y_Intercept")?,
                },
                self.input_source("Linear_Input_Source")?,
            ),
            "Polynomial" => {
                let coefficients = self.array("Polynomial_Coefficients")?;
                if coefficients.is_empty() {
                    return Err(ScalingError::EmptyPolynomial { scale: self.index });
                }
                ScaleDefinition::new(
                    ScaleKind::Polynomial { coefficients },
                    self.input_source("Polynomial_Input_Source")?,
                )
            }
            "Table" => {
                let pre_scaled = self.array("Table_Pre_Scaled_Values")?;
                let scaled = self.array("Table_Scaled_Values")?;
                ScaleDefinition::new(
                    ScaleKind::Table(LookupTable::new(self.index, pre_scaled, scaled)?),
                    self.input_source("Table_Input_Source")?,
                )
            }
            "Thermocouple" => self.thermocouple()?,
            "RTD" => ScaleDefinition::new(
                ScaleKind::Rtd(RtdParameters {
                    current_excitation: self.nonzero("RTD_Current_Excitation")?,
                    r0: self.positive("RTD_R0_Nominal_Resistance")?,
                    a: self.number("RTD_A")?,
                    b: self.number("RTD_B")?,
                    c: self.number("RTD_C")?,
                    lead_resistance: self.number("RTD_Lead_Wire_Resistance")?,
                    configuration: self.wiring("RTD_Resistance_Configuration")?,
                }),
                self.input_source("RTD_Input_Source")?,
            ),
            "Strain" => self.strain()?,
            "Thermistor" => self.thermistor()?,
            "Add" => ScaleDefinition::new(
                ScaleKind::Add {
                    right: self.required_input_source("Add_Right_Operand_Input_Source")?,
                },
                self.required_input_source("Add_Left_Operand_Input_Source")?,
            ),
            "Subtract" => ScaleDefinition::new(
                ScaleKind::Subtract {
                    right: self.required_input_source("Subtract_Right_Operand_Input_Source")?,
                },
                self.required_input_source("Subtract_Left_Operand_Input_Source")?,
            ),
            "AdvancedAPI" => ScaleDefinition::new(
                ScaleKind::AdvancedApi,
                self.input_source("AdvancedAPI_Input_Source")?,
            ),
            other => {
                return Err(ScalingError::UnknownScaleKind {
                    scale: self.index,
                    kind: other.to_string(),
                })
            }
        };
        Ok(scale)
    }

    fn positive(&self, parameter: &str) -> Result<f64> {
        let value = self.number(parameter)?;
        if value <= 0.0 {
            return Err(ScalingError::invalid(self.index, parameter, "must be positive"));
        }
        Ok(value)
    }

    fn thermocouple(&self) -> Result<ScaleDefinition> {
        let code = self.integer("Thermocouple_Thermocouple_Type")?;
        let thermocouple_type = ThermocoupleType::from_code(code)
            .ok_or(ScalingError::UnknownThermocoupleType {
                scale: self.index,
                code,
            })?;
        let direction = match self.integer("Thermocouple_Scaling_Direction")? {
            0 => ThermocoupleDirection::VoltageToTemperature,
            1 => ThermocoupleDirection::TemperatureToVoltage,
            other => {
                return Err(ScalingError::invalid(
                    self.index,
                    "Thermocouple_Scaling_Direction",
                    format!("expected 0 or 1, found {}", other),
                ))
            }
        };
        Ok(ScaleDefinition::new(
            ScaleKind::Thermocouple {
                thermocouple_type,
                direction,
            },
            self.input_source("Thermocouple_Input_Source")?,
        ))
    }

    fn strain(&self) -> Result<ScaleDefinition> {
        let code = self.integer("Strain_Configuration")?;
        let configuration = BridgeConfiguration::from_code(code).ok_or(
            ScalingError::UnknownBridgeConfiguration {
                scale: self.index,
                code,
            },
        )?;
        Ok(ScaleDefinition::new(
            ScaleKind::Strain(StrainParameters {
                configuration,
                gauge_factor: self.nonzero("Strain_Gage_Factor")?,
                poisson_ratio: self.number("Strain_Poisson_Ratio")?,
                gage_resistance: self.nonzero("Strain_Gage_Resistance")?,
                lead_resistance: self.number("Strain_Lead_Wire_Resistance")?,
                excitation_voltage: self.nonzero("Strain_Voltage_Excitation")?,
                initial_bridge_voltage: self.number("Strain_Initial_Bridge_Voltage")?,
                shunt_calibration_gain_adjustment: self
                    .number("Strain_Bridge_Shunt_Calibration_Gain_Adjustment")?,
            }),
            self.input_source("Strain_Input_Source")?,
        ))
    }

    fn thermistor(&self) -> Result<ScaleDefinition> {
        let code = self.integer("Thermistor_Excitation_Type")?;
        let excitation_type =
            ExcitationType::from_code(code).ok_or(ScalingError::UnknownExcitationType {
                scale: self.index,
                code,
            })?;
        Ok(ScaleDefinition::new(
            ScaleKind::Thermistor(ThermistorParameters {
                configuration: self.wiring("Thermistor_Resistance_Configuration")?,
                excitation_type,
                excitation_value: self.nonzero("Thermistor_Excitation_Value")?,
                r1: self.number("Thermistor_R1_Reference_Resistance")?,
                lead_resistance: self.number("Thermistor_Lead_Wire_Resistance")?,
                a: self.number("Thermistor_A")?,
                b: self.number("Thermistor_B")?,
                c: self.number("Thermistor_C")?,
                temperature_offset: self.number("Thermistor_Temperature_Offset")?,
            }),
            self.input_source("Thermistor_Input_Source")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_props() -> ChannelProperties {
        ChannelProperties::new()
            .with("NI_Scaling_Status", "unscaled")
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Linear")
            .with("NI_Scale[0]_Linear_Slope", 2.0)
            .with("NI_Scale[0]_Linear_Y_Intercept", 10.0)
            .with("NI_Scale[0]_Linear_Input_Source", 0xFFFF_FFFFu32)
    }

    #[test]
    fn test_missing_count_is_empty_chain() {
        let chain = ScaleChain::from_properties(&ChannelProperties::new()).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.status, ScalingStatus::Unscaled);
    }

    #[test]
    fn test_linear() {
        let chain = ScaleChain::from_properties(&linear_props()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(
            chain.scales[0],
            ScaleDefinition::new(
                ScaleKind::Linear {
                    slope: 2.0,
                    intercept: 10.0
                },
                InputSource::Raw
            )
        );
    }

    #[test]
    fn test_scaled_status() {
        let props = linear_props().with("NI_Scaling_Status", "scaled");
        let chain = ScaleChain::from_properties(&props).unwrap();
        assert_eq!(chain.status, ScalingStatus::Scaled);

        let props = linear_props().with("NI_Scaling_Status", "sort of");
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::InvalidScalingStatus(_))
        ));
    }

    #[test]
    fn test_missing_parameter_names_scale_and_parameter() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 2i32)
            .with("NI_Scale[0]_Scale_Type", "Linear")
            .with("NI_Scale[0]_Linear_Slope", 1.0)
            .with("NI_Scale[0]_Linear_Y_Intercept", 0.0)
            .with("NI_Scale[1]_Scale_Type", "Linear")
            .with("NI_Scale[1]_Linear_Slope", 1.0);
        match ScaleChain::from_properties(&props) {
            Err(ScalingError::MissingParameter { scale, parameter }) => {
                assert_eq!(scale, 1);
                assert_eq!(parameter, "Linear_Y_Intercept");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type() {
        let props = linear_props().with("NI_Scale[0]_Linear_Slope", "two");
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::InvalidParameter { scale: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let props = linear_props().with("NI_Scale[0]_Scale_Type", "Cubic");
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::UnknownScaleKind { scale: 0, .. })
        ));
    }

    #[test]
    fn test_polynomial_without_size() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Polynomial")
            .with("NI_Scale[0]_Polynomial_Coefficients[0]", 10.0)
            .with("NI_Scale[0]_Polynomial_Coefficients[1]", 1.0)
            .with("NI_Scale[0]_Polynomial_Coefficients[2]", 2.0)
            .with("NI_Scale[0]_Polynomial_Coefficients[3]", 3.0);
        let chain = ScaleChain::from_properties(&props).unwrap();
        assert_eq!(
            chain.scales[0].kind,
            ScaleKind::Polynomial {
                coefficients: vec![10.0, 1.0, 2.0, 3.0]
            }
        );
    }

    #[test]
    fn test_polynomial_size_requires_every_coefficient() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Polynomial")
            .with("NI_Scale[0]_Polynomial_Coefficients_Size", 2i32)
            .with("NI_Scale[0]_Polynomial_Coefficients[0]", 10.0);
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::MissingParameter { scale: 0, .. })
        ));
    }

    #[test]
    fn test_empty_polynomial() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Polynomial");
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::EmptyPolynomial { scale: 0 })
        ));
    }

    #[test]
    fn test_table_must_be_monotonic() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Table")
            .with("NI_Scale[0]_Table_Pre_Scaled_Values_Size", 3i32)
            .with("NI_Scale[0]_Table_Pre_Scaled_Values[0]", 2.0)
            .with("NI_Scale[0]_Table_Pre_Scaled_Values[1]", 8.0)
            .with("NI_Scale[0]_Table_Pre_Scaled_Values[2]", 4.0)
            .with("NI_Scale[0]_Table_Scaled_Values_Size", 3i32)
            .with("NI_Scale[0]_Table_Scaled_Values[0]", 1.0)
            .with("NI_Scale[0]_Table_Scaled_Values[1]", 2.0)
            .with("NI_Scale[0]_Table_Scaled_Values[2]", 3.0);
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::InvalidTable { scale: 0, .. })
        ));
    }

    #[test]
    fn test_thermocouple() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Thermocouple")
            .with("NI_Scale[0]_Thermocouple_Thermocouple_Type", 10073i32)
            .with("NI_Scale[0]_Thermocouple_Scaling_Direction", 0i32)
            .with("NI_Scale[0]_Thermocouple_Input_Source", 0xFFFF_FFFFu32);
        let chain = ScaleChain::from_properties(&props).unwrap();
        assert_eq!(
            chain.scales[0].kind,
            ScaleKind::Thermocouple {
                thermocouple_type: ThermocoupleType::K,
                direction: ThermocoupleDirection::VoltageToTemperature,
            }
        );

        let props = props.with("NI_Scale[0]_Thermocouple_Thermocouple_Type", 12345i32);
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::UnknownThermocoupleType {
                scale: 0,
                code: 12345
            })
        ));
    }

    #[test]
    fn test_rtd_wiring() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "RTD")
            .with("NI_Scale[0]_RTD_Current_Excitation", 0.001)
            .with("NI_Scale[0]_RTD_R0_Nominal_Resistance", 100.0)
            .with("NI_Scale[0]_RTD_A", 0.0039083)
            .with("NI_Scale[0]_RTD_B", -5.775e-07)
            .with("NI_Scale[0]_RTD_C", -4.183e-12)
            .with("NI_Scale[0]_RTD_Lead_Wire_Resistance", 0.0)
            .with("NI_Scale[0]_RTD_Resistance_Configuration", 5i32);
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::InvalidParameter { scale: 0, ref parameter, .. })
                if parameter == "RTD_Resistance_Configuration"
        ));
    }

    #[test]
    fn test_strain_rejects_zero_excitation() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 1i32)
            .with("NI_Scale[0]_Scale_Type", "Strain")
            .with("NI_Scale[0]_Strain_Configuration", 10183i32)
            .with("NI_Scale[0]_Strain_Gage_Factor", 2.0)
            .with("NI_Scale[0]_Strain_Poisson_Ratio", 0.3)
            .with("NI_Scale[0]_Strain_Gage_Resistance", 350.0)
            .with("NI_Scale[0]_Strain_Lead_Wire_Resistance", 0.0)
            .with("NI_Scale[0]_Strain_Voltage_Excitation", 0.0)
            .with("NI_Scale[0]_Strain_Initial_Bridge_Voltage", 0.0)
            .with("NI_Scale[0]_Strain_Bridge_Shunt_Calibration_Gain_Adjustment", 1.0);
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::InvalidParameter { scale: 0, .. })
        ));
    }

    #[test]
    fn test_input_sources() {
        let props = ChannelProperties::new()
            .with("NI_Number_Of_Scales", 3i32)
            .with("NI_Scale[0]_Scale_Type", "AdvancedAPI")
            .with("NI_Scale[1]_Scale_Type", "Add")
            .with("NI_Scale[1]_Add_Left_Operand_Input_Source", -1i32)
            .with("NI_Scale[1]_Add_Right_Operand_Input_Source", 0i32)
            .with("NI_Scale[2]_Scale_Type", "Subtract")
            .with("NI_Scale[2]_Subtract_Left_Operand_Input_Source", 1i64)
            .with("NI_Scale[2]_Subtract_Right_Operand_Input_Source", 0xFFFF_FFFFu32);
        let chain = ScaleChain::from_properties(&props).unwrap();
        assert_eq!(chain.scales[0].sources(), vec![InputSource::Raw]);
        assert_eq!(
            chain.scales[1].sources(),
            vec![InputSource::Raw, InputSource::PriorScale(0)]
        );
        assert_eq!(
            chain.scales[2].sources(),
            vec![InputSource::PriorScale(1), InputSource::Raw]
        );

        let props = props.with("NI_Scale[1]_Add_Right_Operand_Input_Source", -7i32);
        assert!(matches!(
            ScaleChain::from_properties(&props),
            Err(ScalingError::InvalidInputSource { scale: 1, .. })
        ));
    }

    #[test]
    fn test_describe() {
        let chain = ScaleChain::from_properties(&linear_props()).unwrap();
        assert_eq!(
            chain.describe(),
            "[0] Linear(slope=2, intercept=10) <- raw\n"
        );
    }
}
