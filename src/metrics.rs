//! Fairness and welfare metrics

use ndarray::Array2;

/// Gini coefficient of a payment distribution
///
/// 0 = perfectly equal, 1 = maximal inequality. Degenerate inputs (fewer
/// than two entries, or a zero sum) yield the sentinel 0.0 rather than a
/// numerical fault.
pub fn gini_coefficient(payments: &[f64]) -> f64 {
    if payments.len() <= 1 {
        return 0.0;
    }
    let mut vals = payments.to_vec();
    vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = vals.len() as f64;
    let total: f64 = vals.iter().sum();
    if total.abs() < 1e-12 {
        return 0.0;
    }
    let weighted: f64 = vals
        .iter()
        .enumerate()
        .map(|(k, v)| (k as f64 + 1.0) * v)
        .sum();
    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

/// Jain fairness index over per-device allocation totals
///
/// Ranges in (0, 1]; 1 = perfectly fair. Degenerate inputs (empty, or all
/// zero) yield the sentinel 0.0.
pub fn jain_fairness_index(shares: &[f64]) -> f64 {
    if shares.is_empty() {
        return 0.0;
    }
    let sum: f64 = shares.iter().sum();
    let sum_sq: f64 = shares.iter().map(|x| x * x).sum();
    if sum_sq.abs() < 1e-12 {
        return 0.0;
    }
    (sum * sum) / (shares.len() as f64 * sum_sq)
}

/// Total realized utility minus total realized cost under an allocation
pub fn social_welfare(
    allocation: &Array2<f64>,
    valuations: &Array2<f64>,
    costs: &Array2<f64>,
) -> f64 {
    (allocation * valuations).sum() - (allocation * costs).sum()
}

/// Share of accepted tasks, in percent
pub fn acceptance_rate(accepted: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    accepted as f64 / total as f64 * 100.0
}

pub fn avg_latency(latencies: &[f64]) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    latencies.iter().sum::<f64>() / latencies.len() as f64
}

/// Mean utilization across resource dimensions, in percent
pub fn resource_utilization(used: &[f64], capacity: &[f64]) -> f64 {
    if used.is_empty() || used.len() != capacity.len() {
        return 0.0;
    }
    let mean: f64 = used
        .iter()
        .zip(capacity)
        .map(|(u, c)| if *c > 0.0 { u / c } else { 0.0 })
        .sum::<f64>()
        / used.len() as f64;
    mean * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn gini_of_equal_payments_is_zero() {
        let payments = vec![2.5; 6];
        assert!(gini_coefficient(&payments).abs() < 1e-9);
    }

    #[test]
    fn gini_is_scale_invariant() {
        let payments = vec![1.0, 2.0, 3.0, 10.0];
        let scaled: Vec<f64> = payments.iter().map(|p| p * 42.0).collect();
        let a = gini_coefficient(&payments);
        let b = gini_coefficient(&scaled);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn gini_degenerate_inputs_return_sentinel() {
        assert_eq!(gini_coefficient(&[]), 0.0);
        assert_eq!(gini_coefficient(&[1.0]), 0.0);
        assert_eq!(gini_coefficient(&[1.0, -1.0]), 0.0);
    }

    #[test]
    fn jain_of_equal_shares_is_one() {
        let shares = vec![3.0; 5];
        assert!((jain_fairness_index(&shares) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn jain_of_single_loaded_device_is_one_over_n() {
        let shares = vec![7.0, 0.0, 0.0, 0.0];
        assert!((jain_fairness_index(&shares) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn jain_degenerate_inputs_return_sentinel() {
        assert_eq!(jain_fairness_index(&[]), 0.0);
        assert_eq!(jain_fairness_index(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn social_welfare_sums_margins_of_allocated_cells() {
        let allocation = array![[1.0, 0.0], [0.0, 1.0]];
        let valuations = array![[1.0, 0.2], [0.3, 0.8]];
        let costs = array![[0.4, 0.1], [0.1, 0.3]];
        let sw = social_welfare(&allocation, &valuations, &costs);
        assert!((sw - (0.6 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn acceptance_rate_guards_empty_round() {
        assert_eq!(acceptance_rate(0, 0), 0.0);
        assert!((acceptance_rate(3, 4) - 75.0).abs() < 1e-12);
    }

    #[test]
    fn latency_and_utilization_helpers() {
        assert_eq!(avg_latency(&[]), 0.0);
        assert!((avg_latency(&[1.0, 3.0]) - 2.0).abs() < 1e-12);
        assert!((resource_utilization(&[50.0, 100.0], &[100.0, 100.0]) - 75.0).abs() < 1e-12);
        assert_eq!(resource_utilization(&[], &[]), 0.0);
    }
}
