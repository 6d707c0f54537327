//! Average Precision (AP) and mean Average Precision (mAP) calculation.

/// Calculate Average Precision (AP) from a precision-recall curve.
///
/// Uses the VOC all-point method: the curve is padded with (recall 0,
/// precision 0) in front and (recall 1, precision 0) at the back, every
/// precision is raised to the highest precision at equal or greater recall,
/// and the area is summed over the steps where recall changes.
///
/// # Arguments
///
/// * `precisions` - Precision values in ranked order
/// * `recalls` - Recall values in ranked order (non-decreasing)
///
/// # Returns
///
/// Returns the Average Precision value (0.0 to 1.0). An empty curve gives 0.0.
///
/// # Example
///
/// ```
/// use fedeval::metrics::ap::calculate_ap;
///
/// // TP, FP, TP against 2 ground truth boxes
/// let precisions = vec![1.0, 0.5, 2.0 / 3.0];
/// let recalls = vec![0.5, 0.5, 1.0];
/// let ap = calculate_ap(&precisions, &recalls);
/// assert!((ap - (0.5 + 0.5 * 2.0 / 3.0)).abs() < 1e-10);
/// ```
pub fn calculate_ap(precisions: &[f64], recalls: &[f64]) -> f64 {
    debug_assert_eq!(precisions.len(), recalls.len());

    let mut mrec = Vec::with_capacity(recalls.len() + 2);
    mrec.push(0.0);
    mrec.extend_from_slice(recalls);
    mrec.push(1.0);

    let mut mpre = Vec::with_capacity(precisions.len() + 2);
    mpre.push(0.0);
    mpre.extend_from_slice(precisions);
    mpre.push(0.0);

    let envelope = precision_envelope(&mpre);

    (1..mrec.len())
        .filter(|&i| mrec[i] != mrec[i - 1])
        .map(|i| (mrec[i] - mrec[i - 1]) * envelope[i])
        .sum()
}

/// Replace each precision with the maximum of itself and every value after it.
///
/// # Example
///
/// ```
/// use fedeval::metrics::ap::precision_envelope;
///
/// assert_eq!(precision_envelope(&[0.0, 1.0, 0.5, 0.7, 0.0]), vec![1.0, 1.0, 0.7, 0.7, 0.0]);
/// ```
pub fn precision_envelope(precisions: &[f64]) -> Vec<f64> {
    let mut envelope = precisions.to_vec();
    for i in (1..envelope.len()).rev() {
        envelope[i - 1] = envelope[i - 1].max(envelope[i]);
    }
    envelope
}

/// Calculate mean Average Precision (mAP) across classes.
///
/// NaN entries (classes without ground truth) are left out of the mean. If no
/// entry is defined the result is 0.0.
///
/// # Example
///
/// ```
/// use fedeval::metrics::ap::calculate_map;
///
/// let class_aps = vec![0.8, f64::NAN, 0.6];
/// let map = calculate_map(&class_aps);
/// assert!((map - 0.7).abs() < 1e-10);
/// ```
pub fn calculate_map(class_aps: &[f64]) -> f64 {
    let defined: Vec<f64> = class_aps.iter().copied().filter(|ap| !ap.is_nan()).collect();
    if defined.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = defined.len() as f64;
    defined.iter().sum::<f64>() / count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_ap_empty() {
        let ap = calculate_ap(&[], &[]);
        assert_eq!(ap, 0.0);
    }

    #[test]
    fn test_calculate_ap_perfect() {
        let precisions = vec![1.0; 10];
        let recalls = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
        let ap = calculate_ap(&precisions, &recalls);
        assert!((ap - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_calculate_ap_partial_recall() {
        // Two of four ground truths found, no false positives
        let ap = calculate_ap(&[1.0, 1.0], &[0.25, 0.5]);
        assert!((ap - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_envelope_lifts_dips() {
        // FP then TP: the dip at recall 0.5 is lifted by the later point
        let ap = calculate_ap(&[0.0, 0.5], &[0.0, 1.0]);
        assert!((ap - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_repeated_recall_counts_once() {
        let ap = calculate_ap(&[1.0, 0.5, 0.33], &[1.0, 1.0, 1.0]);
        assert!((ap - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_calculate_map() {
        let class_aps = vec![0.8, 0.9, 0.75, 0.85];
        let map = calculate_map(&class_aps);
        assert!((map - 0.825).abs() < 1e-10);
    }

    #[test]
    fn test_calculate_map_skips_nan() {
        let map = calculate_map(&[f64::NAN, 0.5, f64::NAN]);
        assert!((map - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_calculate_map_all_nan() {
        assert_eq!(calculate_map(&[f64::NAN, f64::NAN]), 0.0);
        assert_eq!(calculate_map(&[]), 0.0);
    }
}
