//! Offline evaluation of stored predictions against gold annotations.

pub mod io;
pub mod metrics;
pub mod report;

pub use io::{load_gold, load_inputs, load_predictions, read_jsonl, write_jsonl};
pub use metrics::{topk_accuracy, TopkMetrics};
pub use report::{aggregate_bench, render_markdown, BenchRow};
