//! Basic evaluation example demonstrating core functionality.
//!
//! Run with `RUST_LOG=debug` to see per-class matching details.

use fedeval::config::EvalConfig;
use fedeval::geometry::box_iou;
use fedeval::loader::{load_evaluation_dirs, parse_labels, RecordKind};
use fedeval::report::{format_summary, save_reports};
use fedeval::stats::LoadStats;
use fedeval::{evaluate_with_config, BoundingBox, ImageAnnotations};
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== mAP@0.5 Evaluation Example ===\n");

    // Example 1: IoU Calculation
    println!("1. IoU Calculation");
    let bbox1 = BoundingBox::from_center_size(0.3, 0.3, 0.4, 0.4);
    let bbox2 = BoundingBox::from_center_size(0.5, 0.5, 0.4, 0.4);
    println!("   IoU between overlapping boxes: {:.4}", box_iou(&bbox1, &bbox2));
    println!();

    // Example 2: Parse label text
    println!("2. Parsing YOLO Labels");
    let config = EvalConfig::new(3).with_names(["person", "car", "dog"]);
    let mut stats = LoadStats::new();

    let mut ground_truth = ImageAnnotations::new();
    let gt_text = "0 0.25 0.30 0.20 0.40\n1 0.70 0.60 0.30 0.20\n";
    for record in parse_labels(gt_text, RecordKind::GroundTruth, &config, &mut stats) {
        ground_truth.push("street_001", record);
    }

    let mut predictions = ImageAnnotations::new();
    let pred_text = "0 0.26 0.31 0.20 0.38 0.92\n1 0.40 0.60 0.30 0.20 0.85\n1 0.71 0.60 0.29 0.21 0.55\nbad line\n";
    for record in parse_labels(pred_text, RecordKind::Prediction, &config, &mut stats) {
        predictions.push("street_001", record);
    }
    println!("   {}", stats.summary_string());
    println!();

    // Example 3: Evaluate
    println!("3. Evaluating");
    let report = evaluate_with_config(&ground_truth, &predictions, &config)?;
    print!("{}", format_summary(&report, &config.class_names()));
    println!();

    // Example 4: Round trip through label directories
    println!("4. Evaluating Label Directories");
    let work = std::env::temp_dir().join("fedeval_demo");
    let gt_dir = work.join("labels");
    let pred_dir = work.join("predictions");
    fs::create_dir_all(&gt_dir)?;
    fs::create_dir_all(&pred_dir)?;
    fs::write(gt_dir.join("street_001.txt"), gt_text)?;
    fs::write(pred_dir.join("street_001.txt"), pred_text)?;

    let (ground_truth, predictions, stats) = load_evaluation_dirs(&gt_dir, &pred_dir, &config)?;
    let report = evaluate_with_config(&ground_truth, &predictions, &config)?;
    save_reports(&work, &report, &config.class_names())?;
    println!("   {}", stats.summary_string());
    println!("   mAP@0.5 = {:.4}, results written to {}", report.mean_ap, work.display());

    Ok(())
}
