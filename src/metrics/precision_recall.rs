//! Precision and Recall calculation.

/// Keeps precision and recall finite when a denominator is zero.
pub const PR_EPS: f64 = 1e-16;

/// Cumulative precision-recall curve over a ranked list of detections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub true_positives: usize,
    pub false_positives: usize,
}

impl PrecisionRecallCurve {
    pub fn len(&self) -> usize {
        self.precision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precision.is_empty()
    }

    /// Precision after the last detection, 0.0 for an empty curve.
    pub fn final_precision(&self) -> f64 {
        self.precision.last().copied().unwrap_or(0.0)
    }

    /// Recall after the last detection, 0.0 for an empty curve.
    pub fn final_recall(&self) -> f64 {
        self.recall.last().copied().unwrap_or(0.0)
    }
}

/// Calculate the precision-recall curve from ranked detection verdicts.
///
/// # Arguments
///
/// * `is_true_positive` - One verdict per detection, sorted by confidence (descending);
///   `false` means false positive
/// * `num_ground_truth` - Total number of ground truth boxes of the class
///
/// Point `i` uses the cumulative counts of the first `i + 1` detections:
/// `recall = tp / (n_gt + eps)` and `precision = tp / max(tp + fp, eps)`.
///
/// # Example
///
/// ```
/// use fedeval::metrics::precision_recall::calculate_precision_recall_curve;
///
/// let curve = calculate_precision_recall_curve(&[true, false, true], 4);
/// assert_eq!(curve.len(), 3);
/// assert!((curve.precision[1] - 0.5).abs() < 1e-12);
/// assert!((curve.final_recall() - 0.5).abs() < 1e-12);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn calculate_precision_recall_curve(
    is_true_positive: &[bool],
    num_ground_truth: usize,
) -> PrecisionRecallCurve {
    let mut curve = PrecisionRecallCurve {
        precision: Vec::with_capacity(is_true_positive.len()),
        recall: Vec::with_capacity(is_true_positive.len()),
        ..Default::default()
    };

    let mut tp = 0usize;
    let mut fp = 0usize;
    let n_gt = num_ground_truth as f64;

    for &is_tp in is_true_positive {
        if is_tp {
            tp += 1;
        } else {
            fp += 1;
        }

        curve.recall.push(tp as f64 / (n_gt + PR_EPS));
        curve.precision.push(tp as f64 / ((tp + fp) as f64).max(PR_EPS));
    }

    curve.true_positives = tp;
    curve.false_positives = fp;
    curve
}
