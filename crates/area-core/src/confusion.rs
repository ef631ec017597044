//! Sample-count confusion matrix and its construction from labeled samples.
//!
//! Ordering is fixed: row = reference (truth) class, column = mapped
//! (predicted) class. `cm.get(i, j)` counts sample units whose true class is
//! `i` and whose mapped class is `j`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EstimateError, Result};

/// A square `k×k` matrix of sample counts, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    data: Vec<u64>,
    k: usize,
}

impl ConfusionMatrix {
    /// All-zero matrix for `k` classes. `k` must be at least 1.
    pub(crate) fn zeros(k: usize) -> Self {
        Self { data: vec![0; k * k], k }
    }

    /// Build from nested rows (reference-major). Fails when the input is
    /// empty or any row length differs from the row count.
    pub fn from_rows(rows: &[Vec<u64>]) -> Result<Self> {
        let k = rows.len();
        if k == 0 {
            return Err(EstimateError::ShapeMismatch {
                what: "confusion matrix rows",
                expected: 1,
                found: 0,
            });
        }
        let mut data = Vec::with_capacity(k * k);
        for row in rows {
            if row.len() != k {
                return Err(EstimateError::ShapeMismatch {
                    what: "confusion matrix columns",
                    expected: k,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, k })
    }

    /// Number of classes.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data[row * self.k + col]
    }

    #[inline]
    fn increment(&mut self, row: usize, col: usize) {
        self.data[row * self.k + col] += 1;
    }

    /// Samples per mapped class, `n_·j`.
    pub fn col_sums(&self) -> Vec<u64> {
        (0..self.k)
            .map(|j| (0..self.k).map(|i| self.get(i, j)).sum())
            .collect()
    }

    /// Samples per reference class, `n_i·`.
    pub fn row_sums(&self) -> Vec<u64> {
        (0..self.k)
            .map(|i| self.data[i * self.k..(i + 1) * self.k].iter().sum())
            .collect()
    }

    pub fn diag(&self) -> Vec<u64> {
        (0..self.k).map(|i| self.get(i, i)).collect()
    }

    pub fn total(&self) -> u64 {
        self.data.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Nested rows, the inverse of [`ConfusionMatrix::from_rows`].
    pub fn to_rows(&self) -> Vec<Vec<u64>> {
        self.data.chunks(self.k).map(|r| r.to_vec()).collect()
    }
}

// ── Sample records ────────────────────────────────────────────────────────────

/// One reference/map sample pair as exported by the dataset-assembly layer.
///
/// Labels are read as JSON numbers and coerced to class codes during
/// matrix construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(rename = "Reference label")]
    pub reference: f64,
    #[serde(rename = "Mapped class")]
    pub mapped: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SampleRecord {
    pub fn new(reference: f64, mapped: f64) -> Self {
        Self { reference, mapped, id: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Explicit list of sample ids to leave out of the matrix (e.g. samples whose
/// imagery never exported).
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    excluded_ids: HashSet<String>,
}

impl SampleFilter {
    pub fn new<I, S>(excluded_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { excluded_ids: excluded_ids.into_iter().map(Into::into).collect() }
    }

    /// Records without an id are always kept.
    pub fn allows(&self, record: &SampleRecord) -> bool {
        match &record.id {
            Some(id) => !self.excluded_ids.contains(id),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.excluded_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded_ids.is_empty()
    }
}

/// Coerce a label to a class code in `0..k`.
fn class_code(index: usize, value: f64, k: usize) -> Result<usize> {
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value >= k as f64 {
        return Err(EstimateError::InvalidLabel { index, value });
    }
    Ok(value as usize)
}

/// Cross-tabulate reference against mapped labels for `n_classes` classes.
///
/// Records rejected by `filter` are skipped; the first malformed label among
/// the remaining records aborts with [`EstimateError::InvalidLabel`].
pub fn compute_confusion_matrix(
    records: &[SampleRecord],
    n_classes: usize,
    filter: &SampleFilter,
) -> Result<ConfusionMatrix> {
    if n_classes == 0 {
        return Err(EstimateError::InvalidConfig(
            "class count must be at least 1".to_string(),
        ));
    }

    let mut cm = ConfusionMatrix::zeros(n_classes);
    let mut skipped = 0usize;
    for (index, record) in records.iter().enumerate() {
        if !filter.allows(record) {
            skipped += 1;
            continue;
        }
        let truth = class_code(index, record.reference, n_classes)?;
        let mapped = class_code(index, record.mapped, n_classes)?;
        cm.increment(truth, mapped);
    }

    debug!(
        counted = records.len() - skipped,
        skipped,
        n_classes,
        "built confusion matrix"
    );
    Ok(cm)
}
