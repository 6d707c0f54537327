//! Greedy matching of predictions to ground truth for a single class.

use crate::geometry::iou;
use crate::types::{BoundingBox, ImageAnnotations};
use std::collections::HashMap;
use tracing::trace;

/// Minimum `IoU` for a prediction to claim a ground-truth box.
pub const IOU_THRESHOLD: f64 = 0.5;

/// Ground-truth boxes of one class, keyed by image id.
pub type ClassGroundTruth<'a> = HashMap<&'a str, Vec<BoundingBox>>;

/// A prediction of one class, tagged with the image it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBox<'a> {
    pub image_id: &'a str,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Verdict for a single prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Position of the prediction in the input slice
    pub prediction_index: usize,
    pub confidence: f64,
    /// Index of the best-overlapping ground-truth box in the prediction's image,
    /// `None` when the image has no ground truth for the class
    pub best_ground_truth: Option<usize>,
    /// `IoU` with `best_ground_truth` (0.0 when there is none)
    pub iou: f64,
    pub is_true_positive: bool,
}

/// Order of `predictions` by confidence, highest first.
///
/// The sort is stable: equal confidences keep their input order. AP depends
/// on this tie-break, so it must not be replaced by an unstable sort.
pub fn ranking_order(predictions: &[ScoredBox<'_>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..predictions.len()).collect();
    order.sort_by(|&a, &b| {
        predictions[b]
            .confidence
            .total_cmp(&predictions[a].confidence)
    });
    order
}

/// Match predictions of one class to that class's ground truth.
///
/// Predictions are visited from highest to lowest confidence (see
/// [`ranking_order`]). Each one is compared with every ground-truth box of
/// its image, claimed or not, and takes the first box with the highest `IoU`.
/// It is a true positive when that `IoU` reaches `iou_threshold` and the box
/// is still unclaimed; the box is then claimed for good. Everything else,
/// including predictions on images without ground truth, is a false positive.
///
/// # Returns
///
/// One `Match` per prediction, in ranked order.
pub fn match_predictions(
    predictions: &[ScoredBox<'_>],
    ground_truth: &ClassGroundTruth<'_>,
    iou_threshold: f64,
) -> Vec<Match> {
    let mut claimed: HashMap<&str, Vec<bool>> = HashMap::new();
    let mut matches = Vec::with_capacity(predictions.len());

    for pred_idx in ranking_order(predictions) {
        let pred = &predictions[pred_idx];
        let gt_boxes = ground_truth
            .get(pred.image_id)
            .map_or(&[][..], Vec::as_slice);

        if gt_boxes.is_empty() {
            trace!(image = pred.image_id, "no ground truth, false positive");
            matches.push(Match {
                prediction_index: pred_idx,
                confidence: pred.confidence,
                best_ground_truth: None,
                iou: 0.0,
                is_true_positive: false,
            });
            continue;
        }

        let ious = iou(&pred.bbox, gt_boxes);
        let (best_idx, best_iou) = argmax(&ious);

        let flags = claimed
            .entry(pred.image_id)
            .or_insert_with(|| vec![false; gt_boxes.len()]);

        let is_tp = best_iou >= iou_threshold && !flags[best_idx];
        if is_tp {
            flags[best_idx] = true;
        }

        trace!(
            image = pred.image_id,
            confidence = pred.confidence,
            best_idx,
            best_iou,
            is_tp,
            "matched prediction"
        );

        matches.push(Match {
            prediction_index: pred_idx,
            confidence: pred.confidence,
            best_ground_truth: Some(best_idx),
            iou: best_iou,
            is_true_positive: is_tp,
        });
    }

    matches
}

/// First index holding the maximum value. `values` must not be empty.
fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best = (0, values[0]);
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value > best.1 {
            best = (idx, value);
        }
    }
    best
}

/// Ground-truth boxes of `class_id` grouped by image.
///
/// Images without a box of the class are left out.
pub fn group_ground_truth(annotations: &ImageAnnotations, class_id: usize) -> ClassGroundTruth<'_> {
    let mut groups: ClassGroundTruth<'_> = HashMap::new();

    for (image_id, records) in annotations.iter() {
        let boxes: Vec<BoundingBox> = records
            .iter()
            .filter(|r| r.class_id == class_id)
            .map(|r| r.bbox)
            .collect();
        if !boxes.is_empty() {
            groups.insert(image_id, boxes);
        }
    }

    groups
}

/// All predictions of `class_id`, in image id order then record order.
pub fn collect_predictions(annotations: &ImageAnnotations, class_id: usize) -> Vec<ScoredBox<'_>> {
    annotations
        .iter()
        .flat_map(|(image_id, records)| {
            records
                .iter()
                .filter(move |r| r.class_id == class_id)
                .map(move |r| ScoredBox {
                    image_id,
                    confidence: r.score(),
                    bbox: r.bbox,
                })
        })
        .collect()
}
