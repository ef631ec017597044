//! Design-based area and accuracy estimation for land-cover maps.
//!
//! Implements the stratified estimators of Olofsson et al. (2014), "Good
//! practices for estimating area and assessing accuracy of land change":
//! a reference/map sample confusion matrix plus mapped-class pixel totals
//! give unbiased class areas, user's and producer's accuracies, and their
//! sampling variances.
//!
//! Structural problems (shape mismatches, bad labels) are `Err` values.
//! Statistically undefined results (a class with no samples, a stratum with
//! a single sample) are `NaN`/`Inf` in the returned arrays.

pub mod accuracy;
pub mod area;
pub mod config;
pub mod confusion;
pub mod error;
pub mod summary;
pub mod variance;

pub use accuracy::{compute_acc, compute_p_i, compute_u_j};
pub use area::{area_weights, compute_area_error_matrix, compute_p_ij, AreaMatrix};
pub use config::EstimateConfig;
pub use confusion::{compute_confusion_matrix, ConfusionMatrix, SampleFilter, SampleRecord};
pub use error::{EstimateError, Result};
pub use summary::{
    compute_area_estimate, create_area_estimate_summary, create_confusion_matrix_summary,
    render_confusion_matrix, AreaEstimateSummary, ConfusionMatrixSummary, OverallAccuracy,
    SummaryTable,
};
pub use variance::{
    ci95, compute_std_p_i, compute_var_acc, compute_var_p_i, compute_var_u_j, is_defined, Z_95,
};
