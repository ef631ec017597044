//! User's, producer's and overall accuracy from the area error matrix.
//! Zero denominators propagate as `NaN`.

use crate::area::AreaMatrix;

/// User's accuracy of each mapped class: `p_jj / p_·j`.
pub fn compute_u_j(am: &AreaMatrix) -> Vec<f64> {
    am.diag()
        .iter()
        .zip(am.col_sums())
        .map(|(&p_jj, p_dot_j)| p_jj / p_dot_j)
        .collect()
}

/// Producer's accuracy of each reference class: `p_ii / p_i·`.
pub fn compute_p_i(am: &AreaMatrix) -> Vec<f64> {
    am.diag()
        .iter()
        .zip(am.row_sums())
        .map(|(&p_ii, p_i_dot)| p_ii / p_i_dot)
        .collect()
}

/// Overall accuracy: `Σ p_ii`.
pub fn compute_acc(am: &AreaMatrix) -> f64 {
    am.diag().iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::compute_area_error_matrix;
    use crate::confusion::ConfusionMatrix;
    use approx::assert_abs_diff_eq;

    fn am(rows: &[Vec<u64>], w: &[f64]) -> AreaMatrix {
        let cm = ConfusionMatrix::from_rows(rows).unwrap();
        compute_area_error_matrix(&cm, w).unwrap()
    }

    #[test]
    fn binary_user_accuracy() {
        let am = am(&[vec![50, 5], vec![3, 42]], &[0.52, 0.48]);
        let u = compute_u_j(&am);
        assert_abs_diff_eq!(u[0], 50.0 / 53.0, epsilon = 1e-12);
        assert_abs_diff_eq!(u[1], 0.8936, epsilon = 1e-4);
    }

    #[test]
    fn binary_producer_accuracy() {
        let am = am(&[vec![50, 5], vec![3, 42]], &[0.52, 0.48]);
        let p = compute_p_i(&am);
        let p00 = 0.52 * 50.0 / 53.0;
        let p01 = 0.48 * 5.0 / 47.0;
        assert_abs_diff_eq!(p[0], p00 / (p00 + p01), epsilon = 1e-12);
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn zero_sample_column_gives_nan_user_accuracy() {
        let am = am(&[vec![10, 0], vec![5, 0]], &[0.5, 0.5]);
        let u = compute_u_j(&am);
        assert_abs_diff_eq!(u[0], 10.0 / 15.0, epsilon = 1e-12);
        assert!(u[1].is_nan());
    }

    #[test]
    fn overall_accuracy_is_diagonal_sum() {
        let am = am(&[vec![50, 5], vec![3, 42]], &[0.52, 0.48]);
        let acc = compute_acc(&am);
        assert_eq!(acc, am.get(0, 0) + am.get(1, 1));
        assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn perfect_map_has_unit_accuracies() {
        let am = am(&[vec![20, 0, 0], vec![0, 7, 0], vec![0, 0, 31]], &[0.2, 0.3, 0.5]);
        assert_abs_diff_eq!(compute_acc(&am), 1.0, epsilon = 1e-12);
        for v in compute_u_j(&am).into_iter().chain(compute_p_i(&am)) {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn accepts_arbitrary_proportion_matrix() {
        let am = AreaMatrix::from_rows(&[vec![0.4, 0.1], vec![0.1, 0.4]]).unwrap();
        assert_abs_diff_eq!(compute_acc(&am), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(compute_u_j(&am)[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(compute_p_i(&am)[1], 0.8, epsilon = 1e-12);
    }
}
