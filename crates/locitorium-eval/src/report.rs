//! Benchmark aggregation across models.

use std::path::{Path, PathBuf};

use locitorium_core::{GoldDoc, PredDoc, Result};
use tracing::{debug, warn};

use crate::io::load_predictions;
use crate::metrics::{topk_accuracy, TopkMetrics};

const PREDICTIONS_PREFIX: &str = "predictions_";

/// Make a model name usable in a file name.
pub fn sanitize_model_name(model: &str) -> String {
    model.replace(['/', ':'], "_")
}

/// `predictions_{model}.jsonl` inside `dir`.
pub fn predictions_path(dir: &Path, model: &str) -> PathBuf {
    dir.join(format!("{}{}.jsonl", PREDICTIONS_PREFIX, sanitize_model_name(model)))
}

/// One table row: accuracy plus mean stage timings for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchRow {
    pub model: String,
    pub metrics: TopkMetrics,
    pub avg_total_s: f64,
    pub avg_extract_s: f64,
    pub avg_candidate_s: f64,
    pub avg_resolve_s: f64,
    pub docs: usize,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl BenchRow {
    /// Optional stage timings are averaged over the documents that have them.
    pub fn from_predictions(model: &str, gold: &[GoldDoc], preds: &[PredDoc], k: usize) -> Self {
        let collect = |f: fn(&PredDoc) -> Option<f64>| preds.iter().filter_map(f).collect::<Vec<_>>();
        Self {
            model: model.to_string(),
            metrics: topk_accuracy(gold, preds, k),
            avg_total_s: mean(&collect(|d| Some(d.metrics.total_s))),
            avg_extract_s: mean(&collect(|d| d.metrics.extract_s)),
            avg_candidate_s: mean(&collect(|d| d.metrics.candidate_s)),
            avg_resolve_s: mean(&collect(|d| d.metrics.resolve_s)),
            docs: preds.len(),
        }
    }
}

/// Model order: the non-blank lines of `models_file` if it exists, else the
/// sorted `predictions_*.jsonl` files found in `preds_dir`.
pub fn model_order(models_file: Option<&Path>, preds_dir: &Path) -> Result<Vec<String>> {
    if let Some(path) = models_file.filter(|p| p.exists()) {
        let raw = std::fs::read_to_string(path)?;
        return Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect());
    }

    let mut names: Vec<String> = std::fs::read_dir(preds_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            name.strip_prefix(PREDICTIONS_PREFIX)
                .and_then(|rest| rest.strip_suffix(".jsonl"))
                .map(String::from)
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Build one row per model whose prediction file exists and is non-empty.
pub fn aggregate_bench(
    gold: &[GoldDoc],
    preds_dir: &Path,
    models_file: Option<&Path>,
    k: usize,
) -> Result<Vec<BenchRow>> {
    let mut rows = Vec::new();
    for model in model_order(models_file, preds_dir)? {
        let path = predictions_path(preds_dir, &model);
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            warn!("Skipping {}: no predictions at {}", model, path.display());
            continue;
        }
        let preds = load_predictions(&path)?;
        debug!("Loaded {} predictions for {}", preds.len(), model);
        rows.push(BenchRow::from_predictions(&model, gold, &preds, k));
    }
    Ok(rows)
}

/// Markdown table with three-decimal figures.
pub fn render_markdown(rows: &[BenchRow], k: usize) -> String {
    let header = [
        "model".to_string(),
        "top1".to_string(),
        format!("top{}", k),
        "avg_total_s".to_string(),
        "avg_extract_s".to_string(),
        "avg_candidate_s".to_string(),
        "avg_resolve_s".to_string(),
        "docs".to_string(),
    ];

    let mut out = String::new();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("| {} |\n", vec!["---"; header.len()].join(" | ")));
    for row in rows {
        let cells = [
            row.model.clone(),
            format!("{:.3}", row.metrics.top1),
            format!("{:.3}", row.metrics.topk),
            format!("{:.3}", row.avg_total_s),
            format!("{:.3}", row.avg_extract_s),
            format!("{:.3}", row.avg_candidate_s),
            format!("{:.3}", row.avg_resolve_s),
            row.docs.to_string(),
        ];
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}
