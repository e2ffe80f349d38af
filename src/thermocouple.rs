// Thermocouple Scaling
// Voltage (microvolts) <-> temperature (°C) through the ITS-90 reference functions

use crate::reference_tables::{PolynomialSegment, ThermocoupleType};
use crate::scales::{horner, ThermocoupleDirection};
use log::warn;

const MICROVOLTS_PER_MILLIVOLT: f64 = 1000.0;

/// Convert every sample of `input` in the given direction.
///
/// Values outside the range covered by the reference functions are clamped
/// to the nearest end of that range before evaluation.
pub fn scale(
    index: usize,
    input: &[f64],
    thermocouple_type: ThermocoupleType,
    direction: ThermocoupleDirection,
) -> Vec<f64> {
    let table = thermocouple_type.table();
    let mut clamped = 0usize;

    let output = match direction {
        ThermocoupleDirection::VoltageToTemperature => input
            .iter()
            .map(|&uv| {
                let (t, was_clamped) =
                    evaluate(table.voltage_to_temperature, uv / MICROVOLTS_PER_MILLIVOLT);
                clamped += was_clamped as usize;
                t
            })
            .collect(),
        ThermocoupleDirection::TemperatureToVoltage => input
            .iter()
            .map(|&t| {
                let (mv, was_clamped) = evaluate(table.temperature_to_voltage, t);
                clamped += was_clamped as usize;
                mv * MICROVOLTS_PER_MILLIVOLT
            })
            .collect(),
    };

    if clamped > 0 {
        warn!(
            "scale {}: {} of {} samples outside the type {:?} reference range, clamped",
            index,
            clamped,
            input.len(),
            thermocouple_type
        );
    }
    output
}

/// Evaluate a piecewise reference function, returning whether `x` was clamped.
fn evaluate(segments: &[PolynomialSegment], x: f64) -> (f64, bool) {
    if x.is_nan() || segments.is_empty() {
        return (f64::NAN, false);
    }
    let lower = segments[0].lower;
    let upper = segments[segments.len() - 1].upper;
    let clamped = x.clamp(lower, upper);

    let segment = segments
        .iter()
        .find(|s| s.contains(clamped))
        .unwrap_or(&segments[segments.len() - 1]);

    let mut value = horner(segment.coefficients, clamped);
    if let Some([a0, a1, a2]) = segment.exponential {
        value += a0 * (a1 * (clamped - a2) * (clamped - a2)).exp();
    }
    (value, clamped != x)
}
