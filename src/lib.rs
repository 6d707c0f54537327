//! # fedeval
//!
//! A Rust library for scoring object detectors from YOLO label files and for
//! merging model parameters trained by several parties.
//!
//! This library provides:
//! - **mAP@0.5** (mean Average Precision at IoU=0.50) with VOC all-point interpolation
//! - **Per-class AP** with an explicit "undefined" value for classes without ground truth
//! - **FedAvg**: weighted elementwise averaging of named parameter collections
//!
//! ## Features
//!
//! - Parse YOLO text labels (`class x y w h [conf]`), skipping malformed lines with a warning
//! - Calculate IoU (Intersection over Union) between bounding boxes
//! - Greedy confidence-first matching of predictions to ground truth
//! - Calculate Average Precision (AP) and mean Average Precision (mAP)
//! - Write `results.txt` / `results.csv` reports
//! - Average parameter collections with uniform or sample-size weights
//!
//! ## Quick Start
//!
//! ```rust
//! use fedeval::config::EvalConfig;
//! use fedeval::evaluator::evaluate_with_config;
//! use fedeval::loader::{parse_labels, RecordKind};
//! use fedeval::stats::LoadStats;
//! use fedeval::ImageAnnotations;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EvalConfig::new(2).with_names(["car", "person"]);
//! let mut stats = LoadStats::new();
//!
//! let mut ground_truth = ImageAnnotations::new();
//! for record in parse_labels("0 0.5 0.5 0.2 0.2", RecordKind::GroundTruth, &config, &mut stats) {
//!     ground_truth.push("img1", record);
//! }
//! let mut predictions = ImageAnnotations::new();
//! for record in parse_labels("0 0.5 0.5 0.2 0.2 0.9", RecordKind::Prediction, &config, &mut stats) {
//!     predictions.push("img1", record);
//! }
//!
//! let report = evaluate_with_config(&ground_truth, &predictions, &config)?;
//! assert!((report.mean_ap - 1.0).abs() < 1e-10);
//! assert!(report.per_class[1].ap.is_nan()); // no "person" ground truth
//! # Ok(())
//! # }
//! ```
//!
//! ## Label Format
//!
//! One text file per image, named after the image, one object per line:
//!
//! ```text
//! class_id x_center y_center width height [confidence]
//! ```
//!
//! Coordinates are normalized to [0, 1]. Prediction lines without a
//! confidence get [`DEFAULT_CONFIDENCE`].

pub mod error;
pub mod types;
pub mod config;
pub mod geometry;
pub mod stats;
pub mod loader;
pub mod metrics;
pub mod matching;
pub mod evaluator;
pub mod report;
pub mod aggregate;

// Re-export commonly used types and functions
pub use error::{FedEvalError, Result};
pub use types::{
    BoundingBox, BoxRecord, ClassEvaluation, DatasetReport, ImageAnnotations, Parameter,
    ParameterCollection, Tensor, TensorData, DType, DEFAULT_CONFIDENCE,
};
pub use config::{EvalConfig, DatasetConfig};
pub use evaluator::{evaluate, evaluate_with_config};
pub use loader::{load_evaluation_dirs, load_label_dir, RecordKind};
pub use aggregate::{federated_average, AggregationOutcome};
