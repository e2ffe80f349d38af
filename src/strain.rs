// Strain Scaling
// Bridge voltage -> strain for quarter, half and full bridge gages

use crate::scales::StrainParameters;

/// Bridge output ratio corrected for the unstrained offset and the shunt
/// calibration gain.
#[inline]
pub fn bridge_ratio(voltage: f64, params: &StrainParameters) -> f64 {
    params.shunt_calibration_gain_adjustment * (voltage - params.initial_bridge_voltage)
        / params.excitation_voltage
}

pub fn scale(input: &[f64], params: &StrainParameters) -> Vec<f64> {
    let lead_ratio = params.lead_resistance / params.gage_resistance;
    input
        .iter()
        .map(|&v| {
            params.configuration.strain(
                bridge_ratio(v, params),
                params.gauge_factor,
                params.poisson_ratio,
                lead_ratio,
            )
        })
        .collect()
}
