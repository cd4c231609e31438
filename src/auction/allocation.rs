//! Greedy allocation and the capacity-feasibility post-pass

use crate::error::{Error, Result};
use ndarray::Array2;

/// Residual capacity of a node, as seen by the feasibility filter
///
/// An inactive node is represented by a zero residual, so assignments that
/// reference it are rejected rather than raised as errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Residual {
    pub cpu: u32,
    pub memory: u32,
}

/// Resource demand of a device's bidding task
#[derive(Debug, Clone, Copy, Default)]
pub struct Demand {
    pub cpu: u32,
    pub memory: u32,
}

fn check_shapes(valuations: &Array2<f64>, costs: &Array2<f64>) -> Result<(usize, usize)> {
    let dim = valuations.dim();
    if costs.dim() != dim {
        return Err(Error::ShapeMismatch {
            expected: dim,
            got: costs.dim(),
        });
    }
    Ok(dim)
}

/// Compute the greedy per-device allocation
///
/// For every device row, selects the node with the highest margin
/// `valuation - cost`, but only when that margin is strictly positive;
/// otherwise the row stays all-zero (the device is rejected this round).
/// Ties break to the lowest node index. Pure function; capacity is the
/// ledger's separate concern.
pub fn compute_allocation(valuations: &Array2<f64>, costs: &Array2<f64>) -> Result<Array2<f64>> {
    let (m, n) = check_shapes(valuations, costs)?;
    let mut allocation = Array2::<f64>::zeros((m, n));

    for i in 0..m {
        let mut best: Option<(usize, f64)> = None;
        for j in 0..n {
            let margin = valuations[[i, j]] - costs[[i, j]];
            let better = match best {
                Some((_, b)) => margin > b,
                None => true,
            };
            if better {
                best = Some((j, margin));
            }
        }
        if let Some((j, margin)) = best
            && margin > 0.0
        {
            allocation[[i, j]] = 1.0;
        }
    }

    Ok(allocation)
}

/// Filter an allocation down to what node capacity actually admits
///
/// Devices are processed in descending order of their allocated margin, so
/// when a node saturates the lowest-margin bidders lose their slot first.
/// Cleared rows mean rejection; the auction's payment computation still runs
/// on the unconstrained allocation.
pub fn capacity_filter(
    allocation: &Array2<f64>,
    valuations: &Array2<f64>,
    costs: &Array2<f64>,
    demands: &[Demand],
    residuals: &[Residual],
) -> Result<Array2<f64>> {
    let (m, n) = check_shapes(valuations, costs)?;
    if allocation.dim() != (m, n) {
        return Err(Error::ShapeMismatch {
            expected: (m, n),
            got: allocation.dim(),
        });
    }
    if demands.len() != m {
        return Err(Error::ValidationError(format!(
            "expected {m} demands, got {}",
            demands.len()
        )));
    }
    if residuals.len() != n {
        return Err(Error::ValidationError(format!(
            "expected {n} residuals, got {}",
            residuals.len()
        )));
    }

    // (device, node, margin) for every assigned cell
    let mut assigned: Vec<(usize, usize, f64)> = Vec::new();
    for i in 0..m {
        for j in 0..n {
            if allocation[[i, j]] > 0.0 {
                assigned.push((i, j, valuations[[i, j]] - costs[[i, j]]));
            }
        }
    }
    assigned.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut remaining = residuals.to_vec();
    let mut feasible = Array2::<f64>::zeros((m, n));
    for (i, j, _) in assigned {
        let demand = demands[i];
        let node = &mut remaining[j];
        if node.cpu >= demand.cpu && node.memory >= demand.memory {
            node.cpu -= demand.cpu;
            node.memory -= demand.memory;
            feasible[[i, j]] = 1.0;
        }
    }

    Ok(feasible)
}
