// Chain Resolver
// Dependency-ordered evaluation of a channel's scale chain

use crate::error::{Result, ScalingError};
use crate::scale_parser::ScaleChain;
use crate::scaler::ScalerConfig;
use crate::scales::{InputSource, ScaleDefinition};
use log::debug;
use std::collections::VecDeque;

/// Order in which the chain's scales must run so that every scale runs
/// after the scales it reads from.
///
/// Fails when a scale reads from an index outside the chain or when the
/// chain contains a cycle.
pub fn evaluation_order(scales: &[ScaleDefinition]) -> Result<Vec<usize>> {
    let n = scales.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (index, scale) in scales.iter().enumerate() {
        for source in scale.sources() {
            if let InputSource::PriorScale(dep) = source {
                if dep >= n {
                    return Err(ScalingError::UndefinedReference {
                        scale: index,
                        source_index: dep,
                    });
                }
                in_degree[index] += 1;
                dependents[dep].push(index);
            }
        }
    }

    // Kahn's algorithm; ready scales are taken in ascending index order
    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &next in &dependents[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() < n {
        let scales = (0..n).filter(|&i| in_degree[i] > 0).collect();
        return Err(ScalingError::Cycle { scales });
    }
    Ok(order)
}

/// Scales the terminal (last) scale depends on, itself included.
fn required_scales(scales: &[ScaleDefinition]) -> Vec<bool> {
    let mut required = vec![false; scales.len()];
    let mut pending: Vec<usize> = scales.len().checked_sub(1).into_iter().collect();
    while let Some(index) = pending.pop() {
        if std::mem::replace(&mut required[index], true) {
            continue;
        }
        for source in scales[index].sources() {
            if let InputSource::PriorScale(dep) = source {
                pending.push(dep);
            }
        }
    }
    required
}

/// Apply every scale of `chain` to `raw` and return the terminal scale's output.
///
/// An empty chain returns the raw values. The scaling status is not
/// consulted here; see [`Scaler::scale`](crate::Scaler::scale).
pub fn resolve(chain: &ScaleChain, raw: &[f64], config: &ScalerConfig) -> Result<Vec<f64>> {
    let scales = &chain.scales;
    if scales.is_empty() {
        return Ok(raw.to_vec());
    }

    let order = evaluation_order(scales)?;
    let required = required_scales(scales);
    debug!("evaluation order {:?}", order);

    let mut outputs: Vec<Option<Vec<f64>>> = vec![None; scales.len()];
    for index in order.into_iter().filter(|&i| required[i]) {
        let scale = &scales[index];
        let inputs = scale
            .sources()
            .into_iter()
            .map(|source| match source {
                InputSource::Raw => Ok(raw),
                InputSource::PriorScale(dep) => outputs[dep].as_deref().ok_or(
                    ScalingError::UndefinedReference {
                        scale: index,
                        source_index: dep,
                    },
                ),
            })
            .collect::<Result<Vec<&[f64]>>>()?;
        let output = scale.evaluate(index, &inputs, config)?;
        outputs[index] = Some(output);
    }

    let terminal = scales.len() - 1;
    outputs[terminal]
        .take()
        .ok_or(ScalingError::UndefinedReference {
            scale: terminal,
            source_index: terminal,
        })
}
