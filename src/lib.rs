//! Detviz: data model and value-to-color encoding for interactive object
//! detection exploration.
//!
//! The visualization widgets of a detection exploration tool (scatter
//! plot, image/annotation overlay, score table, parameter and filter
//! forms) share two things: a vocabulary of domain types, and a way to
//! turn numbers into display colors. This crate provides both, plus the
//! dataset-level operations built on them.
//!
//! # Modules
//!
//! - [`color`]: pure value-to-color encoding (quantize, hex, decimal)
//! - [`model`]: shared domain types (images, categories, annotations,
//!   parameter descriptions, fixed-arity vectors)
//! - [`dataset`]: COCO JSON loading, writing, and indexed lookup
//! - [`validation`]: dataset validation and error reporting
//! - [`scoring`]: per-image detection comparison scores
//! - [`filtering`]: composable category filters over the image set
//! - [`error`]: error types for detviz operations

pub mod color;
pub mod dataset;
pub mod error;
pub mod filtering;
pub mod model;
pub mod scoring;
pub mod validation;

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::DetvizError;

use crate::model::ImageId;
use crate::scoring::AnnotationsByImage;

/// The detviz CLI application.
#[derive(Parser)]
#[command(name = "detviz")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a COCO JSON dataset for errors and warnings.
    Validate(ValidateArgs),

    /// Score detections against ground truth, image by image.
    Score(ScoreArgs),
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Input COCO JSON file to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Compare declared image dimensions against the files next to the
    /// dataset.
    #[arg(long)]
    check_images: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the score subcommand.
#[derive(clap::Args)]
struct ScoreArgs {
    /// Ground-truth COCO JSON file.
    ground_truth: PathBuf,

    /// Detection results as COCO JSON (same image ids, usually with
    /// scores).
    predictions: PathBuf,

    /// Output format for the table ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the detviz CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DetvizError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Score(args)) => run_score(args),
        None => {
            // No subcommand: just print a help hint and exit successfully
            println!("detviz {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Data model and color encoding for object detection exploration.");
            println!();
            println!("Run 'detviz --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), DetvizError> {
    let dataset = dataset::read_coco_json(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
        image_root: if args.check_images {
            Some(args.input.parent().unwrap_or(std::path::Path::new(".")).to_path_buf())
        } else {
            None
        },
    };
    let report = validation::validate_dataset(&dataset, &opts);

    // Output results
    match args.output.as_str() {
        "json" => {
            // Simple JSON output for programmatic use
            println!("{{");
            println!("  \"error_count\": {},", report.error_count());
            println!("  \"warning_count\": {},", report.warning_count());
            println!("  \"issues\": [");
            for (i, issue) in report.issues.iter().enumerate() {
                let comma = if i < report.issues.len() - 1 { "," } else { "" };
                println!("    {{");
                println!("      \"severity\": \"{:?}\",", issue.severity);
                println!("      \"code\": \"{:?}\",", issue.code);
                println!(
                    "      \"message\": \"{}\",",
                    issue.message.replace('"', "\\\"")
                );
                println!("      \"context\": \"{}\"", issue.context);
                println!("    }}{}", comma);
            }
            println!("  ]");
            println!("}}");
        }
        "text" => {
            print!("{}", report);
        }
        other => {
            return Err(DetvizError::UnsupportedOutput(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    // Determine exit status
    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(DetvizError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// One row of the score table.
struct ScoreRow {
    image_id: u64,
    score: f64,
    /// Hex fill color for the row's plot point, low scores red, high green.
    color: String,
}

/// Execute the score subcommand.
fn run_score(args: ScoreArgs) -> Result<(), DetvizError> {
    let ground_truth = dataset::read_coco_json(&args.ground_truth)?;
    let predictions = dataset::read_coco_json(&args.predictions)?;

    // Every ground-truth image is scored, even ones with no annotations.
    let mut actual: AnnotationsByImage = BTreeMap::new();
    for image in &ground_truth.images {
        actual.insert(image.id, ground_truth.annotations_for(image.id).to_vec());
    }

    let index = ground_truth.index();
    let mut scores = scoring::compute_scores(&index, &actual, &predictions.annotations);
    scores.sort_by_key(|(image_id, _)| *image_id);

    let rows: Vec<ScoreRow> = scores
        .iter()
        .map(|&(image_id, score)| ScoreRow {
            image_id: image_id.as_u64(),
            score,
            color: color::to_hex(&[1.0 - score, score, 0.0]),
        })
        .collect();

    match args.output.as_str() {
        "json" => {
            // Simple JSON output for programmatic use
            println!("[");
            for (i, row) in rows.iter().enumerate() {
                let comma = if i < rows.len() - 1 { "," } else { "" };
                println!("  {{");
                println!("    \"image_id\": {},", row.image_id);
                println!("    \"score\": {},", row.score);
                println!("    \"color\": \"{}\"", row.color);
                println!("  }}{}", comma);
            }
            println!("]");
        }
        "text" => {
            println!("{:<10} {:>7}  {}", "image", "score", "color");
            for row in &rows {
                println!("{:<10} {:>7.3}  #{}", row.image_id, row.score, row.color);
            }
            println!();
            println!("{} image(s), mean score {:.3}", rows.len(), mean_score(&scores));
        }
        other => {
            return Err(DetvizError::UnsupportedOutput(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    Ok(())
}

fn mean_score(scores: &[(ImageId, f64)]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|(_, score)| score).sum::<f64>() / scores.len() as f64
}
