//! Command-line interface
//!
//! `train` runs the full selection pipeline and prints a report; `diagnose`
//! audits a raw data file for leakage without running selection.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::diagnostics::{diagnose, DiagnosticsReport};
use crate::pipeline::{run_pipeline, RunConfig, RunSummary};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 190, 90) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<22}", key)), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "automl-select")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-validated model selection for binary tabular classification")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate the candidates, select one and write the artifacts
    Train(TrainArgs),

    /// Audit a data file for duplicate rows and leakage
    Diagnose(DiagnoseArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// JSON run configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input CSV file
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Outcome column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Run seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Fraction of rows held out for the final evaluation
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Sampled configurations per searched candidate
    #[arg(long)]
    pub search_iter: Option<usize>,

    /// Skip hyperparameter search
    #[arg(long)]
    pub no_search: bool,

    /// Wall-clock budget per searched candidate, in seconds
    #[arg(long)]
    pub search_budget_secs: Option<f64>,

    /// Output path of the fitted pipeline
    #[arg(long)]
    pub model_out: Option<PathBuf>,

    /// Output path of the metadata record
    #[arg(long)]
    pub metadata_out: Option<PathBuf>,

    /// Worker threads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Also write the run summary as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

impl TrainArgs {
    /// Defaults, then the config file, then individual flags
    pub fn to_config(&self) -> crate::error::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(target) = &self.target {
            config.target_column = target.clone();
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(k) = self.cv_folds {
            config.cv_folds = k;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(n) = self.search_iter {
            config.search_iterations = n;
        }
        if self.no_search {
            config.search_enabled = false;
        }
        if self.search_budget_secs.is_some() {
            config.search_budget_secs = self.search_budget_secs;
        }
        if let Some(path) = &self.model_out {
            config.model_output = path.clone();
        }
        if let Some(path) = &self.metadata_out {
            config.metadata_output = path.clone();
        }
        if self.jobs.is_some() {
            config.n_jobs = self.jobs;
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DiagnoseArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub data: PathBuf,

    /// Outcome column name
    #[arg(short, long, default_value = "target")]
    pub target: String,

    /// Seed of the audited holdout split and the importance forest
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Holdout fraction of the split to audit
    #[arg(long, default_value = "0.2")]
    pub test_size: f64,
}

impl DiagnoseArgs {
    pub fn to_config(&self) -> RunConfig {
        RunConfig::default()
            .with_data_path(&self.data)
            .with_target_column(&self.target)
            .with_random_seed(self.seed)
            .with_test_size(self.test_size)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    let config = args.to_config().context("configuration")?;

    section("Train");
    step_run(&format!("Running pipeline on {}", config.data_path.display()));
    let start = Instant::now();
    let summary = run_pipeline(&config)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_summary(&summary);

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&summary).context("encoding run summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
        println!("  {} {}", muted("report"), path.display());
    }

    println!();
    Ok(())
}

pub fn cmd_diagnose(args: &DiagnoseArgs) -> anyhow::Result<()> {
    let config = args.to_config();

    section("Diagnose");
    step_run(&format!("Auditing {}", config.data_path.display()));
    let report = diagnose(&config)?;
    step_done(&format!("{} rows", report.n_rows));

    print_diagnostics(&report);
    println!();
    Ok(())
}

// ─── Reports ───────────────────────────────────────────────────────────────────

pub fn print_summary(summary: &RunSummary) {
    let ds = &summary.dataset;

    section("Dataset");
    println!("  {}", kv("source", &ds.source_path));
    println!("  {}", kv("rows", &ds.n_samples.to_string()));
    println!("  {}", kv("features", &ds.n_features.to_string()));
    println!("  {}", kv("duplicates removed", &ds.duplicates_removed.to_string()));
    let classes: Vec<String> = ds.class_counts.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    println!("  {}", kv("classes", &classes.join("  ")));

    section("Cross-validation");
    for r in &summary.evaluations {
        println!(
            "  {:<28} {} {}",
            r.candidate_name,
            format!("{:.4}", r.mean).white().bold(),
            dim(&format!("± {:.4}", r.std))
        );
    }
    for f in &summary.failures {
        println!("  {:<28} {} {}", f.candidate_name, warn("excluded"), dim(&f.reason));
    }

    if !summary.tuning.is_empty() {
        section("Search");
        for t in &summary.tuning {
            println!(
                "  {:<28} {} {}",
                t.tuned_name,
                format!("{:.4}", t.best_result.mean).white().bold(),
                dim(&format!(
                    "{} trials  {}",
                    t.trials_completed,
                    crate::optimizer::format_params(&t.best_params)
                ))
            );
            if t.budget_exhausted {
                println!("  {:<28} {}", "", warn("budget exhausted"));
            }
        }
    }

    section("Ranking");
    for (pos, entry) in summary.ranking.iter().enumerate() {
        let name = if pos == 0 { entry.name.green().bold() } else { entry.name.normal() };
        println!(
            "  {:>2}. {:<28} {:.4} {}",
            pos + 1,
            name,
            entry.mean,
            dim(&format!("± {:.4}", entry.std))
        );
    }

    let h = &summary.holdout;
    println!();
    line_box_top();
    line_box(&format!("{} {}", accent("Selected"), summary.selected.candidate_name.white().bold()));
    line_box_sep();
    line_box(&kv("cv accuracy", &format!("{:.4} ± {:.4}", summary.selected.mean_cv_score, summary.selected.std_cv_score)));
    line_box(&kv("train accuracy", &format!("{:.4}", h.train_accuracy)));
    line_box(&kv("test accuracy", &format!("{:.4}", h.test_accuracy)));
    line_box(&kv("train-partition cv", &format!("{:.4} ± {:.4}", h.cv_train.mean, h.cv_train.std)));
    match h.roc_auc {
        Some(auc) => line_box(&kv("roc auc", &format!("{:.4}", auc))),
        None => line_box(&kv("roc auc", "n/a")),
    }
    line_box_bottom();

    section("Confusion matrix");
    let m = &h.confusion_matrix.matrix;
    println!("  {:>10} {:>8} {:>8}", "", muted("pred 0"), muted("pred 1"));
    println!("  {:>10} {:>8} {:>8}", muted("true 0"), m[0][0], m[0][1]);
    println!("  {:>10} {:>8} {:>8}", muted("true 1"), m[1][0], m[1][1]);

    section("Classification report");
    for line in h.classification_report.to_text().lines() {
        println!("  {}", line);
    }

    section("Artifacts");
    println!("  {}", kv("model", &summary.model_path.display().to_string()));
    println!("  {}", kv("metadata", &summary.metadata_path.display().to_string()));
    println!("  {}", kv("elapsed", &format!("{:.2}s", summary.duration_secs)));
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn print_diagnostics(report: &DiagnosticsReport) {
    section("Dataset");
    println!("  {}", kv("source", &report.source_path));
    println!("  {}", kv("rows", &report.n_rows.to_string()));
    println!("  {}", kv("columns", &report.feature_names.join(", ")));
    let classes: Vec<String> = report.class_counts.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    println!("  {}", kv("classes", &classes.join("  ")));

    section("Checks");
    println!("  {}", kv("duplicate rows", &report.duplicate_rows.to_string()));
    println!("  {}", kv("identical to target", &list_or_none(&report.identical_to_target)));
    let separators: Vec<String> = report
        .suspected_separators
        .iter()
        .map(|s| format!("{} {:?}", s.column, s.unique_per_class))
        .collect();
    println!("  {}", kv("suspected separators", &list_or_none(&separators)));
    println!("  {}", kv("constant columns", &list_or_none(&report.constant_columns)));

    let overlap = report.train_test_overlap.to_string();
    let overlap = if report.train_test_overlap == 0 { ok(&overlap) } else { warn(&overlap) };
    println!("  {} {}", muted(&format!("{:<22}", "train/test overlap")), overlap);

    if !report.feature_importances.is_empty() {
        section("Feature importance");
        for (i, (name, importance)) in report.feature_importances.iter().enumerate() {
            println!("  {:>2}. {:<28} {:.4}", i + 1, name, importance);
        }
    }

    println!();
    if report.is_clean() {
        println!("  {} {}", ok("✓"), "no leakage indicators found");
    } else {
        println!("  {} {}", warn("!"), "review the findings above before training");
    }
}
