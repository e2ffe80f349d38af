// RTD and Thermistor Scaling
// Measured voltage -> resistance -> temperature (°C)

use crate::error::{Result, ScalingError};
use crate::reference_tables::{ExcitationType, RTD_MAX_TEMPERATURE, RTD_MIN_TEMPERATURE};
use crate::scaler::ScalerConfig;
use crate::scales::{RtdParameters, ThermistorParameters};
use log::debug;

const KELVIN_OFFSET: f64 = 273.15;

/// Convert RTD voltages to temperature.
///
/// The voltage is turned into a resistance with the excitation current and
/// lead compensation, then the Callendar-Van Dusen relation is inverted:
/// closed form above 0 °C, Newton-Raphson below.
pub fn scale_rtd(
    index: usize,
    input: &[f64],
    params: &RtdParameters,
    config: &ScalerConfig,
) -> Result<Vec<f64>> {
    let lead = params.configuration.lead_compensation(params.lead_resistance);
    let mut output = Vec::with_capacity(input.len());
    for (sample, &v) in input.iter().enumerate() {
        let resistance = v / params.current_excitation - lead;
        output.push(rtd_temperature(index, sample, resistance, params, config)?);
    }
    Ok(output)
}

fn rtd_temperature(
    index: usize,
    sample: usize,
    resistance: f64,
    params: &RtdParameters,
    config: &ScalerConfig,
) -> Result<f64> {
    if resistance.is_nan() {
        return Ok(resistance);
    }
    if resistance <= 0.0 || resistance.is_infinite() {
        return Err(ScalingError::OutOfRange {
            scale: index,
            sample,
            reason: format!("RTD resistance {} ohm", resistance),
        });
    }

    let RtdParameters { r0, a, b, .. } = *params;
    let ratio = resistance / r0;

    // R = R0 (1 + A T + B T^2) for T >= 0
    let estimate = if b == 0.0 {
        (ratio - 1.0) / a
    } else {
        let discriminant = a * a - 4.0 * b * (1.0 - ratio);
        if discriminant < 0.0 {
            return Err(ScalingError::OutOfRange {
                scale: index,
                sample,
                reason: format!("RTD resistance {} ohm has no real temperature", resistance),
            });
        }
        (-a + discriminant.sqrt()) / (2.0 * b)
    };

    let temperature = if estimate >= 0.0 {
        estimate
    } else {
        solve_below_zero(index, sample, resistance, estimate, params, config)?
    };

    if !(RTD_MIN_TEMPERATURE..=RTD_MAX_TEMPERATURE).contains(&temperature) {
        return Err(ScalingError::OutOfRange {
            scale: index,
            sample,
            reason: format!(
                "RTD temperature {:.3} °C outside {}..{} °C",
                temperature, RTD_MIN_TEMPERATURE, RTD_MAX_TEMPERATURE
            ),
        });
    }
    Ok(temperature)
}

/// Newton-Raphson on R0 (1 + A T + B T^2 + C (T - 100) T^3) - R = 0.
fn solve_below_zero(
    index: usize,
    sample: usize,
    resistance: f64,
    start: f64,
    params: &RtdParameters,
    config: &ScalerConfig,
) -> Result<f64> {
    let RtdParameters { r0, a, b, c, .. } = *params;
    let mut t = start;
    for iteration in 0..config.rtd_max_iterations {
        let f = r0 * (1.0 + a * t + b * t * t + c * (t - 100.0) * t * t * t) - resistance;
        let df = r0 * (a + 2.0 * b * t + c * (4.0 * t * t * t - 300.0 * t * t));
        if df == 0.0 || !df.is_finite() {
            break;
        }
        let step = f / df;
        t -= step;
        if step.abs() < config.rtd_tolerance {
            debug!(
                "scale {}: RTD sample {} converged after {} iterations",
                index,
                sample,
                iteration + 1
            );
            return Ok(t);
        }
    }
    Err(ScalingError::RtdNonConvergence {
        scale: index,
        sample,
        resistance,
    })
}

/// Convert thermistor voltages to temperature with the Steinhart-Hart equation.
pub fn scale_thermistor(
    index: usize,
    input: &[f64],
    params: &ThermistorParameters,
) -> Result<Vec<f64>> {
    let lead = params.configuration.lead_compensation(params.lead_resistance);
    let mut output = Vec::with_capacity(input.len());
    for (sample, &v) in input.iter().enumerate() {
        let measured = match params.excitation_type {
            ExcitationType::Current => v / params.excitation_value,
            ExcitationType::Voltage => params.r1 * v / (params.excitation_value - v),
        };
        let resistance = measured - lead;
        if resistance.is_nan() {
            output.push(resistance);
            continue;
        }
        if resistance <= 0.0 || resistance.is_infinite() {
            return Err(ScalingError::OutOfRange {
                scale: index,
                sample,
                reason: format!("thermistor resistance {} ohm", resistance),
            });
        }
        let ln_r = resistance.ln();
        let kelvin = 1.0 / (params.a + params.b * ln_r + params.c * ln_r * ln_r * ln_r);
        output.push(kelvin - KELVIN_OFFSET + params.temperature_offset);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scales::ResistanceConfiguration;

    fn pt100(configuration: ResistanceConfiguration, lead_resistance: f64) -> RtdParameters {
        RtdParameters {
            current_excitation: 0.001,
            r0: 100.0,
            a: 0.0039083,
            b: -5.775e-7,
            c: -4.183e-12,
            lead_resistance,
            configuration,
        }
    }

    #[test]
    fn test_pt100_two_wire() {
        let params = pt100(ResistanceConfiguration::TwoWire, 0.0);
        let out = scale_rtd(
            0,
            &[0.08, 0.10, 0.12, 0.14, 0.16],
            &params,
            &ScalerConfig::default(),
        )
        .unwrap();
        let expected = [-50.77, 0.0, 51.57, 103.94, 157.17];
        for (a, e) in out.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 0.1, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_zero_crossing() {
        let params = pt100(ResistanceConfiguration::FourWire, 0.0);
        let out = scale_rtd(
            0,
            &[0.0999, 0.1, 0.1001],
            &params,
            &ScalerConfig::default(),
        )
        .unwrap();
        assert!(out[0] < 0.0 && out[2] > 0.0);
        assert!(out[1].abs() < 0.1);
    }

    #[test]
    fn test_lead_compensation() {
        // 2-wire with 1 ohm leads: 102 ohm measured -> 100 ohm -> 0 °C
        let two = pt100(ResistanceConfiguration::TwoWire, 1.0);
        let three = pt100(ResistanceConfiguration::ThreeWire, 1.0);
        let config = ScalerConfig::default();
        assert!(scale_rtd(0, &[0.102], &two, &config).unwrap()[0].abs() < 1e-9);
        assert!(scale_rtd(0, &[0.101], &three, &config).unwrap()[0].abs() < 1e-9);
    }

    #[test]
    fn test_sub_zero_satisfies_cvd() {
        let params = pt100(ResistanceConfiguration::FourWire, 0.0);
        let t = scale_rtd(0, &[0.01853], &params, &ScalerConfig::default()).unwrap()[0];
        assert!((t + 200.0).abs() < 0.05, "{}", t);
    }

    #[test]
    fn test_non_convergence_is_reported() {
        let params = pt100(ResistanceConfiguration::FourWire, 0.0);
        let config = ScalerConfig {
            rtd_max_iterations: 0,
            ..ScalerConfig::default()
        };
        let result = scale_rtd(2, &[0.1, 0.09], &params, &config);
        assert!(matches!(
            result,
            Err(ScalingError::RtdNonConvergence {
                scale: 2,
                sample: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_out_of_range_resistance() {
        let params = pt100(ResistanceConfiguration::FourWire, 0.0);
        let config = ScalerConfig::default();
        assert!(matches!(
            scale_rtd(0, &[-0.01], &params, &config),
            Err(ScalingError::OutOfRange { sample: 0, .. })
        ));
        // ~1000 °C, beyond the supported band
        assert!(matches!(
            scale_rtd(0, &[0.45], &params, &config),
            Err(ScalingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_infinite_input_is_out_of_range() {
        let params = pt100(ResistanceConfiguration::FourWire, 0.0);
        let config = ScalerConfig::default();
        assert!(matches!(
            scale_rtd(1, &[0.1, f64::INFINITY], &params, &config),
            Err(ScalingError::OutOfRange { scale: 1, sample: 1, .. })
        ));
        assert!(matches!(
            scale_rtd(1, &[f64::NEG_INFINITY], &params, &config),
            Err(ScalingError::OutOfRange { scale: 1, sample: 0, .. })
        ));
    }

    #[test]
    fn test_nan_passes_through() {
        let params = pt100(ResistanceConfiguration::TwoWire, 0.0);
        let out = scale_rtd(0, &[f64::NAN], &params, &ScalerConfig::default()).unwrap();
        assert!(out[0].is_nan());
    }

    fn thermistor(excitation_type: ExcitationType, excitation_value: f64) -> ThermistorParameters {
        // 10k NTC, Steinhart-Hart coefficients for the common 44006 part
        ThermistorParameters {
            configuration: ResistanceConfiguration::FourWire,
            excitation_type,
            excitation_value,
            r1: 10_000.0,
            lead_resistance: 0.0,
            a: 1.032e-3,
            b: 2.387e-4,
            c: 1.580e-7,
            temperature_offset: 0.0,
        }
    }

    #[test]
    fn test_thermistor_current_excitation() {
        // 10 kohm at 100 uA -> 1 V, about 25 °C
        let params = thermistor(ExcitationType::Current, 1e-4);
        let out = scale_thermistor(0, &[1.0], &params).unwrap();
        assert!((out[0] - 25.0).abs() < 0.2, "{}", out[0]);
    }

    #[test]
    fn test_thermistor_voltage_excitation_matches_current() {
        // divider with R1 = 10k at 2.5 V: half the excitation means 10 kohm
        let by_voltage = scale_thermistor(0, &[1.25], &thermistor(ExcitationType::Voltage, 2.5))
            .unwrap();
        let by_current = scale_thermistor(0, &[1.0], &thermistor(ExcitationType::Current, 1e-4))
            .unwrap();
        assert!((by_voltage[0] - by_current[0]).abs() < 1e-9);
    }

    #[test]
    fn test_thermistor_offset_and_errors() {
        let mut params = thermistor(ExcitationType::Current, 1e-4);
        params.temperature_offset = 1.5;
        let base = scale_thermistor(0, &[1.0], &thermistor(ExcitationType::Current, 1e-4)).unwrap();
        let shifted = scale_thermistor(0, &[1.0], &params).unwrap();
        assert!((shifted[0] - base[0] - 1.5).abs() < 1e-9);
        assert!(matches!(
            scale_thermistor(4, &[0.0], &params),
            Err(ScalingError::OutOfRange { scale: 4, .. })
        ));
    }
}
