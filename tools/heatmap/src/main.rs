//! Confusion matrix heat map: renders the matrix from an `estimate` report
//! as a PNG. Rows are reference classes top to bottom, columns are mapped
//! classes left to right, in report label order.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "heatmap", about = "Render a confusion matrix heat map from an estimate report")]
struct Args {
    /// JSON report written by `estimate`.
    #[arg(short, long, default_value = "data/area_estimate.json")]
    report: String,

    /// Output PNG path.
    #[arg(short, long, default_value = "data/debug/confusion_matrix.png")]
    output: String,

    /// Edge length of one matrix cell in pixels.
    #[arg(long, default_value_t = 64)]
    cell: u32,
}

#[derive(Deserialize)]
struct ReportMatrix {
    class_labels: Vec<String>,
    confusion_matrix: Vec<Vec<u64>>,
}

// ── Colour helpers ────────────────────────────────────────────────────────────

const GRID: image::Rgb<u8> = image::Rgb([255, 255, 255]);

/// Share of the largest count → green-blue ramp: 0 = pale, 1 = deep blue.
fn crest(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    [lerp(165.0, 44.0), lerp(205.0, 30.0), lerp(144.0, 110.0)]
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn render(matrix: &[Vec<u64>], cell: u32) -> Result<image::RgbImage> {
    let k = matrix.len();
    if k == 0 || matrix.iter().any(|row| row.len() != k) {
        bail!("confusion matrix must be square and non-empty");
    }
    if cell < 3 {
        bail!("cell size must be at least 3 pixels, got {cell}");
    }

    let max = matrix.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;
    let side = k as u32 * cell;
    let mut img = image::RgbImage::new(side, side);

    for (r, row) in matrix.iter().enumerate() {
        for (c, &count) in row.iter().enumerate() {
            let [rv, gv, bv] = crest(count as f64 / max);
            for dy in 0..cell {
                for dx in 0..cell {
                    let px = if dx == 0 || dy == 0 { GRID } else { image::Rgb([rv, gv, bv]) };
                    img.put_pixel(c as u32 * cell + dx, r as u32 * cell + dy, px);
                }
            }
        }
    }
    Ok(img)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let report: ReportMatrix = serde_json::from_str(
        &fs::read_to_string(&args.report).with_context(|| format!("reading {}", args.report))?,
    )
    .with_context(|| format!("parsing {}", args.report))?;

    if report.class_labels.len() != report.confusion_matrix.len() {
        bail!(
            "{} class labels for a {}-class matrix",
            report.class_labels.len(),
            report.confusion_matrix.len()
        );
    }
    info!(
        reference = "rows",
        map = "columns",
        labels = ?report.class_labels,
        "rendering confusion matrix"
    );

    let img = render(&report.confusion_matrix, args.cell)?;

    let out_path = Path::new(&args.output);
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    img.save(out_path)
        .with_context(|| format!("saving {}", out_path.display()))?;
    info!(path = %out_path.display(), "wrote heat map");
    Ok(())
}
