//! Main evaluation orchestrator for mAP@0.5.

use crate::config::EvalConfig;
use crate::error::Result;
use crate::matching::{collect_predictions, group_ground_truth, match_predictions};
use crate::metrics::ap::{calculate_ap, calculate_map};
use crate::metrics::precision_recall::calculate_precision_recall_curve;
use crate::types::{ClassEvaluation, DatasetReport, ImageAnnotations};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Evaluate predictions against ground truth at `IoU` 0.5.
///
/// **Independent per-class evaluation**: every class in `[0, num_classes)`
/// is matched and scored on its own, then the defined APs are averaged.
///
/// # Arguments
///
/// * `ground_truth` - Ground truth boxes per image
/// * `predictions` - Scored predictions per image
/// * `num_classes` - Number of classes to evaluate
///
/// # Returns
///
/// Returns a `DatasetReport` with one `ClassEvaluation` per class.
///
/// # Errors
///
/// Returns a validation error if `num_classes` is 0.
pub fn evaluate(
    ground_truth: &ImageAnnotations,
    predictions: &ImageAnnotations,
    num_classes: usize,
) -> Result<DatasetReport> {
    evaluate_with_config(ground_truth, predictions, &EvalConfig::new(num_classes))
}

/// Evaluate with explicit settings (class count and `IoU` threshold).
///
/// Classes are scored in parallel on the rayon pool. Each class only reads
/// the shared inputs, and results are collected back in class id order, so
/// the report does not depend on scheduling.
pub fn evaluate_with_config(
    ground_truth: &ImageAnnotations,
    predictions: &ImageAnnotations,
    config: &EvalConfig,
) -> Result<DatasetReport> {
    config.validate()?;

    let out_of_range = count_out_of_range(ground_truth, config.num_classes)
        + count_out_of_range(predictions, config.num_classes);
    if out_of_range > 0 {
        warn!(
            records = out_of_range,
            num_classes = config.num_classes,
            "ignoring records with class id out of range"
        );
    }

    // INDEPENDENT SWEEP FOR EACH CLASS
    let per_class: Vec<ClassEvaluation> = (0..config.num_classes)
        .into_par_iter()
        .map(|class_id| evaluate_class(ground_truth, predictions, class_id, config.iou_threshold))
        .collect();

    let aps: Vec<f64> = per_class.iter().map(|c| c.ap).collect();
    let report = DatasetReport {
        iou_threshold: config.iou_threshold,
        mean_ap: calculate_map(&aps),
        per_class,
    };

    info!(
        mean_ap = report.mean_ap,
        defined_classes = report.num_defined(),
        num_classes = config.num_classes,
        "evaluation finished"
    );

    Ok(report)
}

/// Evaluate a single class at a specific `IoU` threshold.
///
/// A class with no ground truth anywhere gets NaN AP, precision and recall;
/// its predictions are not matched at all.
pub fn evaluate_class(
    ground_truth: &ImageAnnotations,
    predictions: &ImageAnnotations,
    class_id: usize,
    iou_threshold: f64,
) -> ClassEvaluation {
    let class_predictions = collect_predictions(predictions, class_id);
    let class_gt = group_ground_truth(ground_truth, class_id);
    let num_ground_truth: usize = class_gt.values().map(Vec::len).sum();

    if num_ground_truth == 0 {
        debug!(class_id, predictions = class_predictions.len(), "no ground truth, AP undefined");
        return ClassEvaluation::undefined(class_id, class_predictions.len());
    }

    let matches = match_predictions(&class_predictions, &class_gt, iou_threshold);
    let verdicts: Vec<bool> = matches.iter().map(|m| m.is_true_positive).collect();

    let curve = calculate_precision_recall_curve(&verdicts, num_ground_truth);
    let ap = calculate_ap(&curve.precision, &curve.recall);

    debug!(
        class_id,
        ap,
        num_ground_truth,
        true_positives = curve.true_positives,
        false_positives = curve.false_positives,
        "class evaluated"
    );

    ClassEvaluation {
        class_id,
        ap,
        precision: curve.final_precision(),
        recall: curve.final_recall(),
        num_ground_truth,
        num_predictions: class_predictions.len(),
        true_positives: curve.true_positives,
    }
}

fn count_out_of_range(annotations: &ImageAnnotations, num_classes: usize) -> usize {
    annotations
        .iter()
        .flat_map(|(_, records)| records)
        .filter(|r| r.class_id >= num_classes)
        .count()
}
