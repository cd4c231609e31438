//! VCG externality payments

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};

/// Compute VCG payments and the realized social welfare
///
/// Social welfare is `sum(A .* U) - sum(A .* C)`. The payment for device `i`
/// is the externality it imposes: the welfare of the allocation with row `i`
/// zeroed, minus what the others realize alongside `i`, where `i`'s own
/// contribution is its gross utility `sum_j A[i,j] * U[i,j]`. Costs enter
/// both welfare terms symmetrically.
///
/// Zeroing one row leaves every other row's terms unchanged, so the
/// leave-one-out welfare is the total minus that row's margin; one pass of
/// per-row sums gives all m payments in O(m*n) instead of the naive
/// O(m^2*n) recomputation.
///
/// Payments carry no sign guarantee; callers filter to the positive subset
/// before inequality statistics.
pub fn vcg_payments(
    allocation: &Array2<f64>,
    valuations: &Array2<f64>,
    costs: &Array2<f64>,
) -> Result<(Array1<f64>, f64)> {
    let dim = allocation.dim();
    if valuations.dim() != dim {
        return Err(Error::ShapeMismatch {
            expected: dim,
            got: valuations.dim(),
        });
    }
    if costs.dim() != dim {
        return Err(Error::ShapeMismatch {
            expected: dim,
            got: costs.dim(),
        });
    }

    let (m, _n) = dim;
    let mut utility = Array1::<f64>::zeros(m);
    let mut cost = Array1::<f64>::zeros(m);
    for i in 0..m {
        utility[i] = allocation.row(i).dot(&valuations.row(i));
        cost[i] = allocation.row(i).dot(&costs.row(i));
    }
    let social_welfare = utility.sum() - cost.sum();

    let mut payments = Array1::<f64>::zeros(m);
    for i in 0..m {
        let sw_without_i = social_welfare - (utility[i] - cost[i]);
        payments[i] = sw_without_i - (social_welfare - utility[i]);
    }

    Ok((payments, social_welfare))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::allocation::compute_allocation;
    use ndarray::Array2;

    #[test]
    fn uniform_bids_all_land_on_node_zero() {
        // 5 devices, 3 nodes, U = 1.0, C = 0.3 everywhere.
        let valuations = Array2::from_elem((5, 3), 1.0);
        let costs = Array2::from_elem((5, 3), 0.3);
        let allocation = compute_allocation(&valuations, &costs).unwrap();
        for i in 0..5 {
            assert_eq!(allocation[[i, 0]], 1.0);
            assert_eq!(allocation.row(i).sum(), 1.0);
        }
        let (_, sw) = vcg_payments(&allocation, &valuations, &costs).unwrap();
        assert!((sw - 3.5).abs() < 1e-12);
    }

    #[test]
    fn externality_matches_leave_one_out_welfare() {
        let valuations = Array2::from_elem((5, 3), 1.0);
        let costs = Array2::from_elem((5, 3), 0.3);
        let allocation = compute_allocation(&valuations, &costs).unwrap();
        let (payments, sw) = vcg_payments(&allocation, &valuations, &costs).unwrap();

        // Zeroing device 2's row by hand: SW drops to 4 * 0.7 = 2.8, so its
        // payment is 2.8 - (3.5 - 1.0) = 0.3.
        let mut without = allocation.clone();
        for j in 0..3 {
            without[[2, j]] = 0.0;
        }
        let sw_without: f64 = (&without * &valuations).sum() - (&without * &costs).sum();
        assert!((sw_without - 2.8).abs() < 1e-12);
        assert!((payments[2] - 0.3).abs() < 1e-12);
        assert!((sw - 3.5).abs() < 1e-12);
    }

    #[test]
    fn rejected_devices_pay_nothing() {
        let valuations = Array2::from_elem((3, 2), 0.1);
        let costs = Array2::from_elem((3, 2), 0.5);
        let allocation = compute_allocation(&valuations, &costs).unwrap();
        let (payments, sw) = vcg_payments(&allocation, &valuations, &costs).unwrap();
        assert_eq!(sw, 0.0);
        assert!(payments.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn negative_payments_are_representable() {
        // A hand-built allocation with a negative-margin cell: the engine
        // never produces one, but downstream must tolerate the sign.
        let mut allocation = Array2::<f64>::zeros((2, 2));
        allocation[[0, 0]] = 1.0;
        allocation[[1, 1]] = 1.0;
        let mut valuations = Array2::from_elem((2, 2), 1.0);
        valuations[[1, 1]] = -0.5;
        let costs = Array2::from_elem((2, 2), 0.2);
        let (payments, _) = vcg_payments(&allocation, &valuations, &costs).unwrap();
        assert!(payments.iter().any(|p| *p < 1.0));
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let allocation = Array2::<f64>::zeros((2, 2));
        let valuations = Array2::<f64>::zeros((2, 3));
        let costs = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            vcg_payments(&allocation, &valuations, &costs),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
