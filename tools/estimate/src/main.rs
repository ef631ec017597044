//! Stratified area estimate for a classified map.
//! Reads a run configuration (class labels, mapped pixel totals, pixel size)
//! and either a labeled sample table or a ready-made confusion matrix, prints
//! the area/accuracy and confusion-matrix summaries, and writes a JSON report.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use area_core::{
    ci95, compute_acc, compute_area_error_matrix, compute_confusion_matrix, compute_p_i,
    compute_std_p_i, compute_u_j, compute_var_acc, compute_var_p_i, compute_var_u_j,
    create_area_estimate_summary, create_confusion_matrix_summary, render_confusion_matrix,
    AreaEstimateSummary, AreaMatrix, ConfusionMatrix, ConfusionMatrixSummary, EstimateConfig,
    OverallAccuracy, SampleRecord, Z_95,
};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "estimate", about = "Design-based area and accuracy estimate from reference samples")]
struct Args {
    /// Run configuration JSON (class labels, pixel counts, pixel area).
    #[arg(short, long)]
    config: String,

    /// Sample table JSON: records with "Reference label" and "Mapped class".
    #[arg(short, long, conflicts_with = "matrix")]
    samples: Option<String>,

    /// Confusion matrix JSON as nested rows (reference rows, map columns).
    #[arg(short, long)]
    matrix: Option<String>,

    /// Output path for the JSON report.
    #[arg(short, long, default_value = "data/area_estimate.json")]
    output: String,
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report {
    class_labels: Vec<String>,
    confusion_matrix: Vec<Vec<u64>>,
    area_weights: Vec<f64>,
    area_error_matrix: Vec<Vec<f64>>,
    total_area_ha: f64,
    overall_accuracy: OverallAccuracy,
    area_estimate: AreaEstimateSummary,
    confusion_summary: ConfusionMatrixSummary,
}

// ── Estimation ────────────────────────────────────────────────────────────────

/// Hectare areas `p_i· · A` and their 95% half-widths `1.96 · S(p_i·) · A`.
fn area_in_hectares(am: &AreaMatrix, std_p_i: &[f64], total_ha: f64) -> (Vec<f64>, Vec<f64>) {
    let area = am.row_sums().iter().map(|p| p * total_ha).collect();
    let err = std_p_i.iter().map(|s| Z_95 * s * total_ha).collect();
    (area, err)
}

fn estimate(config: &EstimateConfig, cm: &ConfusionMatrix) -> Result<Report> {
    if cm.k() != config.n_classes() {
        bail!(
            "confusion matrix has {} classes but config lists {}",
            cm.k(),
            config.n_classes()
        );
    }

    let w_j = config.area_weights()?;
    let am = compute_area_error_matrix(cm, &w_j)?;

    let u_j = compute_u_j(&am);
    let p_i = compute_p_i(&am);
    let acc = compute_acc(&am);

    let var_u_j = compute_var_u_j(&u_j, cm)?;
    let var_p_i = compute_var_p_i(&p_i, &u_j, &config.pixel_counts, cm)?;
    let var_acc = compute_var_acc(&w_j, &u_j, cm)?;
    let std_p_i = compute_std_p_i(&w_j, &am, cm)?;

    for (label, v) in config.class_labels.iter().zip(&var_u_j) {
        if !v.is_finite() {
            warn!(class = %label, "fewer than two samples mapped to class; variances undefined");
        }
    }

    let total_area_ha = config.total_area_ha();
    let (area_ha, err_ha) = area_in_hectares(&am, &std_p_i, total_area_ha);
    let overall_accuracy = OverallAccuracy::from_variance(acc, var_acc);

    let area_estimate = create_area_estimate_summary(
        &area_ha,
        &err_ha,
        &u_j,
        &ci95(&var_u_j),
        &p_i,
        &ci95(&var_p_i),
        &config.class_labels,
    )?
    .with_overall_accuracy(overall_accuracy);
    let confusion_summary = create_confusion_matrix_summary(cm, &config.class_labels)?;

    Ok(Report {
        class_labels: config.class_labels.clone(),
        confusion_matrix: cm.to_rows(),
        area_weights: w_j,
        area_error_matrix: am.to_rows(),
        total_area_ha,
        overall_accuracy,
        area_estimate,
        confusion_summary,
    })
}

// ── I/O ───────────────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<EstimateConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EstimateConfig::from_json_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn load_confusion_matrix(args: &Args, config: &EstimateConfig) -> Result<ConfusionMatrix> {
    if let Some(path) = &args.samples {
        let records: Vec<SampleRecord> = serde_json::from_str(
            &fs::read_to_string(path).with_context(|| format!("reading samples {path}"))?,
        )
        .with_context(|| format!("parsing samples {path}"))?;
        info!(records = records.len(), path = %path, "loaded sample table");
        let filter = config.sample_filter();
        if !filter.is_empty() {
            info!(excluded = filter.len(), "applying sample exclusion list");
        }
        Ok(compute_confusion_matrix(&records, config.n_classes(), &filter)?)
    } else if let Some(path) = &args.matrix {
        let rows: Vec<Vec<u64>> = serde_json::from_str(
            &fs::read_to_string(path).with_context(|| format!("reading matrix {path}"))?,
        )
        .with_context(|| format!("parsing matrix {path}"))?;
        Ok(ConfusionMatrix::from_rows(&rows)?)
    } else {
        bail!("one of --samples or --matrix is required");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(Path::new(&args.config))?;
    let cm = load_confusion_matrix(&args, &config)?;
    info!(classes = cm.k(), samples = cm.total(), "confusion matrix ready");

    let report = estimate(&config, &cm)?;

    println!("{}", render_confusion_matrix(&cm, &config.class_labels)?);
    println!("{}", report.confusion_summary);
    println!("{}", report.area_estimate);

    let out_path = Path::new(&args.output);
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(out_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", out_path.display()))?;
    info!(path = %out_path.display(), "wrote report");

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
