//! Error matrix in area-proportion space.
//!
//! `p[i,j] = w_j · n[i,j] / n_·j` is the estimated share of the total mapped
//! area that is reference class `i` and mapped class `j` (Olofsson et al.
//! 2014, Eq. 4). Columns sum to the mapped-class weight `w_j`.
//!
//! A column with no samples has `n_·j = 0`; its entries come out `NaN` and
//! are passed on rather than rejected, so one unobserved class does not
//! block reporting for the others.

use tracing::debug;

use crate::confusion::ConfusionMatrix;
use crate::error::{check_len, EstimateError, Result};

/// A square `k×k` matrix of area proportions, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMatrix {
    data: Vec<f64>,
    k: usize,
}

impl AreaMatrix {
    /// Build from nested rows; the input must be non-empty and square.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let k = rows.len();
        if k == 0 {
            return Err(EstimateError::ShapeMismatch {
                what: "area matrix rows",
                expected: 1,
                found: 0,
            });
        }
        let mut data = Vec::with_capacity(k * k);
        for row in rows {
            check_len("area matrix columns", k, row.len())?;
            data.extend_from_slice(row);
        }
        Ok(Self { data, k })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.k + col]
    }

    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.k)
            .map(|j| (0..self.k).map(|i| self.get(i, j)).sum())
            .collect()
    }

    /// Estimated area proportion of each reference class, `p_i·`.
    pub fn row_sums(&self) -> Vec<f64> {
        self.data.chunks(self.k).map(|r| r.iter().sum()).collect()
    }

    pub fn diag(&self) -> Vec<f64> {
        (0..self.k).map(|i| self.get(i, i)).collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.k).map(|r| r.to_vec()).collect()
    }
}

/// Mapped-class weights `w_j = a_j / Σ a` from pixel totals.
///
/// Fails when every count is zero, since the weights would be undefined for
/// all classes at once.
pub fn area_weights(a_j: &[u64]) -> Result<Vec<f64>> {
    let total: u128 = a_j.iter().map(|&a| a as u128).sum();
    if total == 0 {
        return Err(EstimateError::InvalidConfig(
            "pixel counts sum to zero".to_string(),
        ));
    }
    let total = total as f64;
    Ok(a_j.iter().map(|&a| a as f64 / total).collect())
}

/// Single entry `p[i,j]` of the area error matrix.
pub fn compute_p_ij(cm: &ConfusionMatrix, w_j: &[f64], i: usize, j: usize) -> Result<f64> {
    let k = cm.k();
    check_len("w_j", k, w_j.len())?;
    if i >= k {
        return Err(EstimateError::ShapeMismatch { what: "row index", expected: k, found: i });
    }
    if j >= k {
        return Err(EstimateError::ShapeMismatch { what: "column index", expected: k, found: j });
    }
    let n_dot_j: u64 = (0..k).map(|r| cm.get(r, j)).sum();
    Ok(w_j[j] * (cm.get(i, j) as f64 / n_dot_j as f64))
}

/// Full area error matrix `p[i,j] = w_j · n[i,j] / n_·j`.
pub fn compute_area_error_matrix(cm: &ConfusionMatrix, w_j: &[f64]) -> Result<AreaMatrix> {
    let k = cm.k();
    check_len("w_j", k, w_j.len())?;

    let n_dot_j = cm.col_sums();
    for (j, &n) in n_dot_j.iter().enumerate() {
        if n == 0 {
            debug!(class = j, "mapped class has no samples; area column is undefined");
        }
    }

    let mut data = Vec::with_capacity(k * k);
    for i in 0..k {
        for j in 0..k {
            data.push(w_j[j] * cm.get(i, j) as f64 / n_dot_j[j] as f64);
        }
    }
    Ok(AreaMatrix { data, k })
}
