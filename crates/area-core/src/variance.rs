//! Sampling variances of the stratified estimators (Olofsson et al. 2014).
//!
//! Every formula divides by `n_·j − 1`, the per-stratum sample count less
//! one. A stratum with fewer than two samples therefore yields `Inf` or `NaN`
//! for the classes it touches; callers read that as "insufficient sample".

use tracing::debug;

use crate::area::AreaMatrix;
use crate::confusion::ConfusionMatrix;
use crate::error::{check_len, Result};

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;

/// `n_·j − 1` per mapped class, as floats.
fn dof(cm: &ConfusionMatrix) -> Vec<f64> {
    let n_dot_j = cm.col_sums();
    if n_dot_j.iter().any(|&n| n < 2) {
        debug!(?n_dot_j, "stratum with fewer than two samples; variance undefined");
    }
    n_dot_j.iter().map(|&n| n as f64 - 1.0).collect()
}

/// `a²` computed in 128-bit integers, then widened to `f64`.
#[inline]
fn squared_px(a: u64) -> f64 {
    let a = a as u128;
    (a * a) as f64
}

/// Variance of user's accuracy: `u_j (1 − u_j) / (n_·j − 1)`.
pub fn compute_var_u_j(u_j: &[f64], cm: &ConfusionMatrix) -> Result<Vec<f64>> {
    check_len("u_j", cm.k(), u_j.len())?;
    Ok(u_j
        .iter()
        .zip(dof(cm))
        .map(|(&u, d)| u * (1.0 - u) / d)
        .collect())
}

/// Cross-class term of Eq. 7 for each reference class `i`:
/// `Σ_{j≠i} a_j² · r_ij (1 − r_ij) / (n_·j − 1)` with `r_ij = n_ij / n_·j`.
///
/// Both `r` and `1 − r` have their diagonals zeroed before the sum, which is
/// what enforces `j ≠ i`. The zeroing works on locally owned matrices.
pub(crate) fn confusion_leakage(a_j: &[u64], cm: &ConfusionMatrix) -> Vec<f64> {
    let k = cm.k();
    let n_dot_j = cm.col_sums();
    let d = dof(cm);

    let mut ratio = vec![0f64; k * k];
    let mut complement = vec![0f64; k * k];
    for i in 0..k {
        for j in 0..k {
            let r = cm.get(i, j) as f64 / n_dot_j[j] as f64;
            ratio[i * k + j] = r;
            complement[i * k + j] = 1.0 - r;
        }
    }
    for i in 0..k {
        ratio[i * k + i] = 0.0;
        complement[i * k + i] = 0.0;
    }

    (0..k)
        .map(|i| {
            (0..k)
                .map(|j| squared_px(a_j[j]) * ratio[i * k + j] * complement[i * k + j] / d[j])
                .sum()
        })
        .collect()
}

/// Estimated pixel total of each reference class, `N̂_i = Σ_j a_j n_ij / n_·j`.
fn reference_pixel_totals(a_j: &[u64], cm: &ConfusionMatrix) -> Vec<f64> {
    let k = cm.k();
    let n_dot_j = cm.col_sums();
    (0..k)
        .map(|i| {
            (0..k)
                .map(|j| a_j[j] as f64 / n_dot_j[j] as f64 * cm.get(i, j) as f64)
                .sum()
        })
        .collect()
}

/// Variance of producer's accuracy, Eq. 7 of Olofsson et al. (2014).
///
/// ```text
/// V(p_i) = 1/N̂_i² · [ a_i² (1 − p_i)² u_i (1 − u_i) / (n_·i − 1)
///                    + p_i² Σ_{j≠i} a_j² (n_ij/n_·j)(1 − n_ij/n_·j) / (n_·j − 1) ]
/// ```
///
/// `a_j` are mapped-class pixel totals. Their squares are formed in `u128`
/// so pixel counts in the billions cannot overflow.
pub fn compute_var_p_i(
    p_i: &[f64],
    u_j: &[f64],
    a_j: &[u64],
    cm: &ConfusionMatrix,
) -> Result<Vec<f64>> {
    let k = cm.k();
    check_len("p_i", k, p_i.len())?;
    check_len("u_j", k, u_j.len())?;
    check_len("a_j", k, a_j.len())?;

    let n_i_px = reference_pixel_totals(a_j, cm);
    let sigma = confusion_leakage(a_j, cm);
    let d = dof(cm);

    Ok((0..k)
        .map(|i| {
            let (p, u) = (p_i[i], u_j[i]);
            let expr_1 = squared_px(a_j[i]) * (1.0 - p).powi(2) * u * (1.0 - u) / d[i];
            let expr_2 = p * p * sigma[i];
            (expr_1 + expr_2) / (n_i_px[i] * n_i_px[i])
        })
        .collect())
}

/// Variance of overall accuracy: `Σ w_j² u_j (1 − u_j) / (n_·j − 1)`.
pub fn compute_var_acc(w_j: &[f64], u_j: &[f64], cm: &ConfusionMatrix) -> Result<f64> {
    check_len("w_j", cm.k(), w_j.len())?;
    check_len("u_j", cm.k(), u_j.len())?;
    Ok(w_j
        .iter()
        .zip(u_j)
        .zip(dof(cm))
        .map(|((&w, &u), d)| w * w * u * (1.0 - u) / d)
        .sum())
}

/// Standard error (not variance) of the area-proportion estimator `p_i·`:
/// `sqrt( Σ_j (w_j p_ij − p_ij²) / (n_·j − 1) )`.
pub fn compute_std_p_i(w_j: &[f64], am: &AreaMatrix, cm: &ConfusionMatrix) -> Result<Vec<f64>> {
    let k = cm.k();
    check_len("w_j", k, w_j.len())?;
    check_len("area matrix", k, am.k())?;
    let d = dof(cm);

    Ok((0..k)
        .map(|i| {
            (0..k)
                .map(|j| {
                    let p = am.get(i, j);
                    (w_j[j] * p - p * p) / d[j]
                })
                .sum::<f64>()
                .sqrt()
        })
        .collect())
}

/// 95% confidence half-width `1.96 · √v` for each variance.
pub fn ci95(variances: &[f64]) -> Vec<f64> {
    variances.iter().map(|&v| Z_95 * v.sqrt()).collect()
}

/// False for the `NaN`/`Inf` sentinels produced by degenerate strata.
#[inline]
pub fn is_defined(value: f64) -> bool {
    value.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::{compute_p_i, compute_u_j};
    use crate::area::compute_area_error_matrix;
    use crate::error::EstimateError;
    use approx::assert_abs_diff_eq;

    fn cm(rows: &[Vec<u64>]) -> ConfusionMatrix {
        ConfusionMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn user_variance_single_sample_is_undefined_not_an_error() {
        let cm = cm(&[vec![1, 0], vec![0, 1]]);
        let v = compute_var_u_j(&[0.9, 0.8], &cm).unwrap();
        assert!(v.iter().all(|x| !is_defined(*x)), "got {v:?}");
    }

    #[test]
    fn user_variance_formula() {
        let cm = cm(&[vec![50, 5], vec![3, 42]]);
        let v = compute_var_u_j(&[0.9, 0.8], &cm).unwrap();
        assert_abs_diff_eq!(v[0], 0.9 * 0.1 / 52.0, epsilon = 1e-15);
        assert_abs_diff_eq!(v[1], 0.8 * 0.2 / 46.0, epsilon = 1e-15);
    }

    #[test]
    fn variances_are_non_negative_with_two_or_more_samples() {
        let cm = cm(&[vec![9, 3, 0], vec![1, 12, 4], vec![2, 0, 7]]);
        let w = [0.5, 0.3, 0.2];
        let am = compute_area_error_matrix(&cm, &w).unwrap();
        let u = compute_u_j(&am);
        assert!(compute_var_u_j(&u, &cm).unwrap().iter().all(|&v| v >= 0.0));
        assert!(compute_var_acc(&w, &u, &cm).unwrap() >= 0.0);
        let p = compute_p_i(&am);
        let vp = compute_var_p_i(&p, &u, &[500, 300, 200], &cm).unwrap();
        assert!(vp.iter().all(|&v| v >= 0.0), "got {vp:?}");
    }

    #[test]
    fn leakage_ignores_own_diagonal() {
        let a = [1_000_000, 2_000_000, 3_000_000];
        let base = cm(&[vec![40, 3, 2], vec![5, 30, 4], vec![1, 6, 50]]);
        let bumped = cm(&[vec![40, 3, 2], vec![5, 90, 4], vec![1, 6, 50]]);
        let before = confusion_leakage(&a, &base);
        let after = confusion_leakage(&a, &bumped);
        assert_eq!(before[1].to_bits(), after[1].to_bits());
        // Column 1 feeds the other rows' sums, so those do move.
        assert_ne!(before[0], after[0]);
    }

    #[test]
    fn leakage_does_not_touch_caller_matrix() {
        let cm = cm(&[vec![4, 1], vec![1, 4]]);
        let snapshot = cm.clone();
        let _ = confusion_leakage(&[10, 10], &cm);
        assert_eq!(cm, snapshot);
    }

    #[test]
    fn producer_variance_survives_billions_of_pixels() {
        let cm = cm(&[vec![90, 10], vec![10, 90]]);
        let w = [0.5, 0.5];
        let am = compute_area_error_matrix(&cm, &w).unwrap();
        let (u, p) = (compute_u_j(&am), compute_p_i(&am));

        let small = compute_var_p_i(&p, &u, &[1_000, 1_000], &cm).unwrap();
        let huge = compute_var_p_i(&p, &u, &[5_000_000_000, 5_000_000_000], &cm).unwrap();
        // Equal pixel totals scale out of Eq. 7 entirely.
        for (s, h) in small.iter().zip(huge.iter()) {
            assert!(h.is_finite() && *h > 0.0);
            assert_abs_diff_eq!(*s, *h, epsilon = 1e-12);
        }
    }

    #[test]
    fn overall_variance_formula() {
        let cm = cm(&[vec![50, 5], vec![3, 42]]);
        let v = compute_var_acc(&[0.52, 0.48], &[0.9, 0.8], &cm).unwrap();
        let expected = 0.52f64.powi(2) * 0.09 / 52.0 + 0.48f64.powi(2) * 0.16 / 46.0;
        assert_abs_diff_eq!(v, expected, epsilon = 1e-15);
    }

    #[test]
    fn std_of_perfect_map_is_zero() {
        let cm = cm(&[vec![10, 0], vec![0, 10]]);
        let w = [0.4, 0.6];
        let am = compute_area_error_matrix(&cm, &w).unwrap();
        let s = compute_std_p_i(&w, &am, &cm).unwrap();
        assert_abs_diff_eq!(s[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn length_mismatches_are_shape_errors() {
        let cm = cm(&[vec![3, 1], vec![1, 3]]);
        assert!(matches!(
            compute_var_u_j(&[0.5], &cm),
            Err(EstimateError::ShapeMismatch { what: "u_j", .. })
        ));
        assert!(matches!(
            compute_var_p_i(&[0.5, 0.5], &[0.5, 0.5], &[1, 2, 3], &cm),
            Err(EstimateError::ShapeMismatch { what: "a_j", .. })
        ));
        assert!(compute_var_acc(&[1.0], &[0.5, 0.5], &cm).is_err());
        let am = AreaMatrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(compute_std_p_i(&[0.5, 0.5], &am, &cm).is_err());
    }

    #[test]
    fn ci95_scales_square_root() {
        let ci = ci95(&[0.0, 0.01, f64::NAN]);
        assert_eq!(ci[0], 0.0);
        assert_abs_diff_eq!(ci[1], 0.196, epsilon = 1e-12);
        assert!(ci[2].is_nan());
    }

    #[test]
    fn estimators_are_idempotent() {
        let cm = cm(&[vec![50, 5], vec![3, 42]]);
        let u = [0.94, 0.89];
        let p = [0.93, 0.90];
        let a = [5_200_000, 4_800_000];
        let first = compute_var_p_i(&p, &u, &a, &cm).unwrap();
        let second = compute_var_p_i(&p, &u, &a, &cm).unwrap();
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}
