//! Precision-recall and average precision calculation.

pub mod ap;
pub mod precision_recall;

pub use ap::{calculate_ap, calculate_map, precision_envelope};
pub use precision_recall::{calculate_precision_recall_curve, PrecisionRecallCurve};
