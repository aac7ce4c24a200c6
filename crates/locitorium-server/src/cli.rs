//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use locitorium_clients::NominatimClient;
use locitorium_core::AppConfig;
use locitorium_eval::report::{predictions_path, sanitize_model_name};
use locitorium_eval::{aggregate_bench, load_gold, load_inputs, load_predictions, render_markdown, topk_accuracy};
use locitorium_runtime::{preflight, run_dataset_to_file};
use locitorium_server::{build_router, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "locitorium", version, about = "Toponym resolution with a local LLM and Nominatim")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline over a dataset and write predictions as JSONL.
    Run {
        /// Path to dataset.jsonl
        input: PathBuf,
        /// Path to predictions.jsonl
        output: PathBuf,
        /// Override the Ollama model
        #[arg(long)]
        model: Option<String>,
        #[command(flatten)]
        thinking: ThinkingArgs,
        /// Write raw prompts and responses here
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },
    /// Run the pipeline once per model, one predictions file each.
    Bench {
        /// Path to dataset.jsonl
        input: PathBuf,
        /// Output directory for predictions
        output_dir: PathBuf,
        /// Ollama models to benchmark
        #[arg(long, num_args = 1.., required = true)]
        models: Vec<String>,
        #[command(flatten)]
        thinking: ThinkingArgs,
        /// Write raw prompts and responses under a per-model subdirectory
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },
    /// Score a predictions file against gold annotations.
    Eval {
        gold: PathBuf,
        predictions: PathBuf,
        #[arg(long, default_value_t = 5)]
        k: usize,
    },
    /// Print a Markdown table of accuracy and timings per model.
    Aggregate {
        #[arg(long)]
        gold: PathBuf,
        #[arg(long)]
        preds_dir: PathBuf,
        /// Optional file listing models in display order, one per line
        #[arg(long)]
        models: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        k: usize,
    },
    /// Serve the HTTP endpoint.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },
}

/// `--thinking` / `--no-thinking`; neither leaves the model default.
#[derive(Debug, Clone, Copy, Args)]
pub struct ThinkingArgs {
    /// Enable model thinking if supported
    #[arg(long, conflicts_with = "no_thinking")]
    thinking: bool,
    /// Disable model thinking if supported
    #[arg(long)]
    no_thinking: bool,
}

impl ThinkingArgs {
    pub fn value(&self) -> Option<bool> {
        match (self.thinking, self.no_thinking) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

fn overridden(
    base: &AppConfig,
    model: Option<&str>,
    thinking: ThinkingArgs,
    debug_dir: Option<PathBuf>,
) -> AppConfig {
    let mut config = base.clone();
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(value) = thinking.value() {
        config = config.with_thinking(Some(value));
    }
    if debug_dir.is_some() {
        config = config.with_debug_dir(debug_dir);
    }
    config
}

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let base = AppConfig::from_env()?;

    match cli.command {
        Command::Run {
            input,
            output,
            model,
            thinking,
            debug_dir,
        } => {
            let config = overridden(&base, model.as_deref(), thinking, debug_dir);
            let docs = load_inputs(&input).with_context(|| format!("reading {}", input.display()))?;
            let written = run_dataset_to_file(&docs, config, &output).await?;
            info!("Wrote {} predictions to {}", written, output.display());
        }
        Command::Bench {
            input,
            output_dir,
            models,
            thinking,
            debug_dir,
        } => {
            let docs = load_inputs(&input).with_context(|| format!("reading {}", input.display()))?;
            std::fs::create_dir_all(&output_dir)?;
            for model in &models {
                let model_debug = debug_dir.as_ref().map(|d| d.join(sanitize_model_name(model)));
                let config = overridden(&base, Some(model.as_str()), thinking, model_debug);
                let out_path = predictions_path(&output_dir, model);
                run_dataset_to_file(&docs, config, &out_path).await?;
                println!("wrote {}", out_path.display());
            }
        }
        Command::Eval { gold, predictions, k } => {
            let gold = load_gold(&gold)?;
            let preds = load_predictions(&predictions)?;
            print!("{}", format_metrics(&topk_accuracy(&gold, &preds, k)));
        }
        Command::Aggregate {
            gold,
            preds_dir,
            models,
            k,
        } => {
            let gold = load_gold(&gold)?;
            let rows = aggregate_bench(&gold, &preds_dir, models.as_deref(), k)?;
            print!("{}", render_markdown(&rows, k));
        }
        Command::Serve { bind } => serve(base, &bind).await?,
    }
    Ok(())
}

fn format_metrics(metrics: &locitorium_eval::TopkMetrics) -> String {
    format!(
        "mentions: {}\ntop1: {:?}\ntopk: {:?}\nmacro_top1: {:?}\nmacro_topk: {:?}\n",
        metrics.mentions, metrics.top1, metrics.topk, metrics.macro_top1, metrics.macro_topk
    )
}

async fn serve(config: AppConfig, bind: &str) -> anyhow::Result<()> {
    let gazetteer = NominatimClient::from_config(&config)?;
    preflight(&gazetteer)
        .await
        .with_context(|| format!("gazetteer preflight against {} failed", config.nominatim_base_url))?;

    let app = build_router(Arc::new(AppState::new(config)));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("locitorium listening on {}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_run_with_overrides() {
        let command = parse(&[
            "locitorium", "run", "in.jsonl", "out.jsonl", "--model", "qwen3:8b", "--no-thinking",
            "--debug-dir", "dbg",
        ]);
        match command {
            Command::Run {
                model,
                thinking,
                debug_dir,
                ..
            } => {
                assert_eq!(model.as_deref(), Some("qwen3:8b"));
                assert_eq!(thinking.value(), Some(false));
                assert_eq!(debug_dir, Some(PathBuf::from("dbg")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_thinking_flags_conflict() {
        let result = Cli::try_parse_from(["locitorium", "run", "a", "b", "--thinking", "--no-thinking"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bench_requires_models() {
        assert!(Cli::try_parse_from(["locitorium", "bench", "in.jsonl", "out"]).is_err());
        match parse(&["locitorium", "bench", "in.jsonl", "out", "--models", "a:1b", "b/c"]) {
            Command::Bench { models, thinking, .. } => {
                assert_eq!(models, vec!["a:1b", "b/c"]);
                assert_eq!(thinking.value(), None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_eval_and_serve_defaults() {
        match parse(&["locitorium", "eval", "gold.jsonl", "preds.jsonl"]) {
            Command::Eval { k, .. } => assert_eq!(k, 5),
            other => panic!("unexpected command: {:?}", other),
        }
        match parse(&["locitorium", "serve"]) {
            Command::Serve { bind } => assert_eq!(bind, "0.0.0.0:8000"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overridden_keeps_base_when_unset() {
        let base = AppConfig::default();
        let thinking = ThinkingArgs {
            thinking: false,
            no_thinking: false,
        };
        assert_eq!(overridden(&base, None, thinking, None), base);

        let per_model = overridden(&base, Some("m"), thinking, Some(PathBuf::from("dbg/m")));
        assert_eq!(per_model.ollama_model, "m");
        assert_eq!(per_model.debug_dir, Some(PathBuf::from("dbg/m")));
    }

    #[test]
    fn test_format_metrics() {
        let text = format_metrics(&locitorium_eval::TopkMetrics {
            mentions: 2,
            top1: 0.5,
            topk: 1.0,
            macro_top1: 0.5,
            macro_topk: 1.0,
        });
        assert_eq!(text, "mentions: 2\ntop1: 0.5\ntopk: 1.0\nmacro_top1: 0.5\nmacro_topk: 1.0\n");
    }
}
