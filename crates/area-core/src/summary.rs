//! Labeled summary tables for console display and JSON reports.
//!
//! Assembly only: every number comes in already computed, except the
//! one-vs-rest rates in [`create_confusion_matrix_summary`], which are simple
//! count ratios.

use std::fmt;

use serde::Serialize;

use crate::confusion::ConfusionMatrix;
use crate::error::{check_len, EstimateError, Result};
use crate::variance::Z_95;

/// Row names of the area estimate table, in display order.
pub const AREA_SUMMARY_ROWS: [&str; 6] = [
    "Estimated area [ha]",
    "95% CI of area [ha]",
    "User's accuracy",
    "95% CI of user acc.",
    "Producer's accuracy",
    "95% CI of prod acc.",
];

/// Row names of the confusion matrix table, in display order.
pub const CONFUSION_SUMMARY_ROWS: [&str; 3] =
    ["False Positive Rate", "True Positive Rate", "Accuracy"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    /// One value per class, in column order. `NaN` serializes as `null`.
    pub values: Vec<f64>,
}

/// Metric rows against class-label columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    fn build<S: AsRef<str>>(names: &[&str], data: Vec<Vec<f64>>, columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: names
                .iter()
                .zip(data)
                .map(|(name, values)| SummaryRow { name: name.to_string(), values })
                .collect(),
        }
    }

    pub fn row(&self, name: &str) -> Option<&[f64]> {
        self.rows.iter().find(|r| r.name == name).map(|r| r.values.as_slice())
    }

    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(row).map(|values| values[col])
    }
}

impl fmt::Display for SummaryTable {
    /// Fixed-width text table, values rounded to two decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_w = self.rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, label)| {
                self.rows
                    .iter()
                    .map(|r| format!("{:.2}", r.values[c]).len())
                    .chain(std::iter::once(label.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:name_w$}", "")?;
        for (label, &w) in self.columns.iter().zip(&widths) {
            write!(f, "  {label:>w$}")?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{:<name_w$}", row.name)?;
            for (v, &w) in row.values.iter().zip(&widths) {
                write!(f, "  {:>w$}", format!("{v:.2}"))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ── Area estimate summary ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallAccuracy {
    pub accuracy: f64,
    /// 95% confidence half-width.
    pub ci: f64,
}

impl OverallAccuracy {
    /// Point estimate and half-width `1.96 · √variance`.
    pub fn from_variance(accuracy: f64, variance: f64) -> Self {
        Self { accuracy, ci: Z_95 * variance.sqrt() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaEstimateSummary {
    #[serde(flatten)]
    pub table: SummaryTable,
    pub overall_accuracy: Option<OverallAccuracy>,
}

impl AreaEstimateSummary {
    pub fn with_overall_accuracy(mut self, overall: OverallAccuracy) -> Self {
        self.overall_accuracy = Some(overall);
        self
    }
}

impl fmt::Display for AreaEstimateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        if let Some(o) = self.overall_accuracy {
            writeln!(
                f,
                "\nOverall accuracy and 95% CI of accuracy - {:.2} \u{00B1} {:.2}",
                o.accuracy, o.ci
            )?;
        }
        Ok(())
    }
}

/// Assemble the area / accuracy table. Every array must have one entry per
/// label; `columns` fixes the column order.
#[allow(clippy::too_many_arguments)]
pub fn create_area_estimate_summary<S: AsRef<str>>(
    a_ha: &[f64],
    err_ha: &[f64],
    u_j: &[f64],
    err_u_j: &[f64],
    p_i: &[f64],
    err_p_i: &[f64],
    columns: &[S],
) -> Result<AreaEstimateSummary> {
    let k = columns.len();
    check_len("a_ha", k, a_ha.len())?;
    check_len("err_ha", k, err_ha.len())?;
    check_len("u_j", k, u_j.len())?;
    check_len("err_u_j", k, err_u_j.len())?;
    check_len("p_i", k, p_i.len())?;
    check_len("err_p_i", k, err_p_i.len())?;

    let data = [a_ha, err_ha, u_j, err_u_j, p_i, err_p_i]
        .iter()
        .map(|v| v.to_vec())
        .collect();
    Ok(AreaEstimateSummary {
        table: SummaryTable::build(&AREA_SUMMARY_ROWS, data, columns),
        overall_accuracy: None,
    })
}

/// Hectare area estimate from counts, pixel totals and weights.
///
/// Not available yet: always returns [`EstimateError::NotImplemented`].
/// Callers assemble areas from the area error matrix row sums and
/// [`crate::compute_std_p_i`] themselves.
pub fn compute_area_estimate(
    _cm: &ConfusionMatrix,
    _a_j: &[u64],
    _w_j: &[f64],
) -> Result<AreaEstimateSummary> {
    Err(EstimateError::NotImplemented("compute_area_estimate"))
}

// ── Confusion matrix summary ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrixSummary {
    #[serde(flatten)]
    pub table: SummaryTable,
}

impl fmt::Display for ConfusionMatrixSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)
    }
}

/// One-vs-rest false positive rate, true positive rate and accuracy per class,
/// straight from sample counts.
pub fn create_confusion_matrix_summary<S: AsRef<str>>(
    cm: &ConfusionMatrix,
    columns: &[S],
) -> Result<ConfusionMatrixSummary> {
    check_len("class labels", cm.k(), columns.len())?;

    let total = cm.total() as f64;
    let col_sums = cm.col_sums();
    let row_sums = cm.row_sums();

    let mut fpr = Vec::with_capacity(cm.k());
    let mut tpr = Vec::with_capacity(cm.k());
    let mut acc = Vec::with_capacity(cm.k());
    for (c, tp) in cm.diag().into_iter().enumerate() {
        let fp = (col_sums[c] - tp) as f64;
        let fn_ = (row_sums[c] - tp) as f64;
        let tp = tp as f64;
        let tn = total - (fp + fn_ + tp);
        fpr.push(fp / (fp + tn));
        tpr.push(tp / (tp + fn_));
        acc.push((tp + tn) / total);
    }

    Ok(ConfusionMatrixSummary {
        table: SummaryTable::build(&CONFUSION_SUMMARY_ROWS, vec![fpr, tpr, acc], columns),
    })
}

/// Text rendering of the raw count matrix: mapped classes across the top,
/// reference classes down the side.
pub fn render_confusion_matrix<S: AsRef<str>>(cm: &ConfusionMatrix, labels: &[S]) -> Result<String> {
    check_len("class labels", cm.k(), labels.len())?;

    let label_w = labels.iter().map(|l| l.as_ref().len()).max().unwrap_or(0);
    let cell_w = labels
        .iter()
        .map(|l| l.as_ref().len())
        .chain(std::iter::once(cm.max_count().to_string().len()))
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    out.push_str(&format!("{:label_w$}  Map\n", "Reference"));
    out.push_str(&format!("{:label_w$}", ""));
    for l in labels {
        out.push_str(&format!("  {:>cell_w$}", l.as_ref()));
    }
    out.push('\n');
    for (i, l) in labels.iter().enumerate() {
        out.push_str(&format!("{:<label_w$}", l.as_ref()));
        for j in 0..cm.k() {
            out.push_str(&format!("  {:>cell_w$}", cm.get(i, j)));
        }
        out.push('\n');
    }
    Ok(out)
}
