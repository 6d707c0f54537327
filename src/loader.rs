//! Loading utilities for YOLO text label files.
//!
//! Each image has one `<stem>.txt` file with one object per line:
//!
//! ```text
//! class_id x_center y_center width height [confidence]
//! ```
//!
//! Coordinates are normalized to the image size. The file stem is the image id.

use crate::config::EvalConfig;
use crate::error::{FedEvalError, Result};
use crate::stats::LoadStats;
use crate::types::{BoundingBox, BoxRecord, ImageAnnotations};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which side of the evaluation a label file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    GroundTruth,
    Prediction,
}

/// One parsed label line, before class range checks.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLine {
    /// Class id as written, truncated toward zero (may be negative)
    pub class_id: i64,
    /// [x_center, y_center, width, height]
    pub center_size: [f64; 4],
    pub confidence: Option<f64>,
}

/// Parse one label line.
///
/// Returns `Ok(None)` for blank lines and lines with fewer than five fields.
/// Fields after the sixth are ignored. The class id may be written as a float
/// (`"2.0"`).
///
/// # Errors
///
/// Returns `InvalidRecord` if a field is not a number.
///
/// # Example
///
/// ```
/// use fedeval::loader::parse_label_line;
///
/// let line = parse_label_line("3 0.5 0.5 0.2 0.1 0.87").unwrap().unwrap();
/// assert_eq!(line.class_id, 3);
/// assert_eq!(line.confidence, Some(0.87));
/// assert!(parse_label_line("3 0.5 0.5").unwrap().is_none());
/// ```
pub fn parse_label_line(line: &str) -> Result<Option<LabelLine>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Ok(None);
    }

    let number = |field: &str| -> Result<f64> {
        field
            .parse::<f64>()
            .map_err(|_| FedEvalError::InvalidRecord(format!("'{field}' is not a number in line '{line}'")))
    };

    let class_value = number(fields[0])?;
    if !class_value.is_finite() {
        return Err(FedEvalError::InvalidRecord(format!(
            "class id '{}' is not finite",
            fields[0]
        )));
    }

    let mut center_size = [0.0; 4];
    for (slot, field) in center_size.iter_mut().zip(&fields[1..5]) {
        *slot = number(*field)?;
    }

    let confidence = fields.get(5).map(|f| number(*f)).transpose()?;
    if let Some(conf) = confidence.filter(|c| !c.is_finite()) {
        return Err(FedEvalError::InvalidRecord(format!(
            "confidence '{conf}' is not finite"
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let class_id = class_value.trunc() as i64;

    Ok(Some(LabelLine {
        class_id,
        center_size,
        confidence,
    }))
}

/// Parse the contents of one label file into records.
///
/// Malformed lines are skipped with a warning and counted in `stats`; they
/// never fail the whole file.
pub fn parse_labels(
    contents: &str,
    kind: RecordKind,
    config: &EvalConfig,
    stats: &mut LoadStats,
) -> Vec<BoxRecord> {
    let mut records = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        stats.total_lines += 1;

        let parsed = match parse_label_line(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => {
                stats.skipped_short_lines += 1;
                debug!(line_no, "skipping line with fewer than 5 fields");
                continue;
            }
            Err(err) => {
                stats.skipped_unparseable += 1;
                warn!(line_no, %err, "skipping unparseable record");
                continue;
            }
        };

        let class_id = match usize::try_from(parsed.class_id) {
            Ok(id) if id < config.num_classes => id,
            _ => {
                stats.skipped_invalid_classes += 1;
                warn!(
                    line_no,
                    class_id = parsed.class_id,
                    num_classes = config.num_classes,
                    "skipping record with class id out of range"
                );
                continue;
            }
        };

        let [x, y, w, h] = parsed.center_size;
        let bbox = BoundingBox::from_center_size(x, y, w, h);
        if !bbox.as_array().iter().all(|v| v.is_finite()) || !bbox.is_valid() {
            stats.skipped_invalid_boxes += 1;
            warn!(line_no, ?bbox, "skipping record with invalid box");
            continue;
        }

        let record = match kind {
            RecordKind::GroundTruth => BoxRecord::ground_truth(class_id, bbox),
            RecordKind::Prediction => {
                let confidence = parsed.confidence.unwrap_or_else(|| {
                    stats.defaulted_confidence += 1;
                    config.default_confidence
                });
                BoxRecord::prediction(class_id, confidence, bbox)
            }
        };
        records.push(record);
    }

    records
}

/// Read one label file.
pub fn load_label_file<P: AsRef<Path>>(
    path: P,
    kind: RecordKind,
    config: &EvalConfig,
    stats: &mut LoadStats,
) -> Result<Vec<BoxRecord>> {
    let contents = fs::read_to_string(path.as_ref())?;
    stats.files_read += 1;
    Ok(parse_labels(&contents, kind, config, stats))
}

/// Read every `*.txt` label file of a directory.
///
/// Files are read in path order and keyed by file stem. An image whose file
/// holds no valid line is still registered, with no records. Other files and
/// subdirectories are ignored.
///
/// # Errors
///
/// Returns an error if the directory or one of its label files cannot be read.
pub fn load_label_dir<P: AsRef<Path>>(
    dir: P,
    kind: RecordKind,
    config: &EvalConfig,
) -> Result<(ImageAnnotations, LoadStats)> {
    let dir = dir.as_ref();
    let mut stats = LoadStats::new();
    let mut annotations = ImageAnnotations::new();

    for path in label_files(dir)? {
        let Some(image_id) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping label file with non UTF-8 name");
            continue;
        };

        let records = load_label_file(&path, kind, config, &mut stats)?;
        annotations.add_image(image_id);
        for record in records {
            annotations.push(image_id, record);
        }
    }

    info!(
        dir = %dir.display(),
        ?kind,
        images = annotations.num_images(),
        records = annotations.num_records(),
        skipped = stats.total_skipped(),
        "loaded label directory"
    );

    Ok((annotations, stats))
}

/// Load the ground truth and prediction directories of one evaluation run.
///
/// # Errors
///
/// Returns a validation error if both paths resolve to the same directory,
/// which would score the labels against themselves.
pub fn load_evaluation_dirs<P: AsRef<Path>, Q: AsRef<Path>>(
    ground_truth_dir: P,
    prediction_dir: Q,
    config: &EvalConfig,
) -> Result<(ImageAnnotations, ImageAnnotations, LoadStats)> {
    config.validate()?;

    let gt_path = fs::canonicalize(ground_truth_dir.as_ref())?;
    let pred_path = fs::canonicalize(prediction_dir.as_ref())?;
    if gt_path == pred_path {
        return Err(FedEvalError::Validation(format!(
            "prediction and ground truth directories are the same: {}",
            gt_path.display()
        )));
    }

    let (ground_truth, mut stats) = load_label_dir(&gt_path, RecordKind::GroundTruth, config)?;
    let (predictions, pred_stats) = load_label_dir(&pred_path, RecordKind::Prediction, config)?;
    stats.merge(&pred_stats);

    Ok((ground_truth, predictions, stats))
}

fn label_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_line() {
        let line = parse_label_line("1 0.5 0.4 0.2 0.1").unwrap().unwrap();
        assert_eq!(line.class_id, 1);
        assert_eq!(line.center_size, [0.5, 0.4, 0.2, 0.1]);
        assert_eq!(line.confidence, None);
    }

    #[test]
    fn test_parse_float_class_id() {
        let line = parse_label_line("2.0 0.5 0.5 0.1 0.1 0.3").unwrap().unwrap();
        assert_eq!(line.class_id, 2);
    }

    #[test]
    fn test_parse_invalid_number() {
        assert!(parse_label_line("1 0.5 abc 0.2 0.1").is_err());
        assert!(parse_label_line("nan 0.5 0.5 0.2 0.1").is_err());
    }

    #[test]
    fn test_non_finite_confidence_skipped() {
        assert!(parse_label_line("0 0.5 0.5 0.2 0.2 nan").is_err());
        assert!(parse_label_line("0 0.5 0.5 0.2 0.2 inf").is_err());

        let config = EvalConfig::new(1);
        let mut stats = LoadStats::new();
        let contents = "0 0.5 0.5 0.2 0.2 NaN\n0 0.5 0.5 0.2 0.2 -inf\n0 0.5 0.5 0.2 0.2 0.4\n";
        let records = parse_labels(contents, RecordKind::Prediction, &config, &mut stats);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, Some(0.4));
        assert_eq!(stats.skipped_unparseable, 2);
    }

    #[test]
    fn test_negative_size_dropped_zero_size_kept() {
        let config = EvalConfig::new(1);
        let mut stats = LoadStats::new();
        let contents = "0 0.5 0.5 0.0 0.2\n0 0.5 0.5 -0.1 0.2\n0 0.5 0.5 0.2 -0.1\n";
        let records = parse_labels(contents, RecordKind::GroundTruth, &config, &mut stats);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bbox.area(), 0.0);
        assert_eq!(stats.skipped_invalid_boxes, 2);
    }

    #[test]
    fn test_parse_labels_prediction_default_confidence() {
        let config = EvalConfig::new(2);
        let mut stats = LoadStats::new();
        let contents = "0 0.5 0.5 0.2 0.2 0.9\n1 0.3 0.3 0.1 0.1\n";

        let records = parse_labels(contents, RecordKind::Prediction, &config, &mut stats);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].confidence, Some(0.9));
        assert_eq!(records[1].confidence, Some(0.001));
        assert_eq!(stats.defaulted_confidence, 1);
    }

    #[test]
    fn test_parse_labels_ground_truth_drops_confidence() {
        let config = EvalConfig::new(1);
        let mut stats = LoadStats::new();
        let records = parse_labels("0 0.5 0.5 0.2 0.2 0.9", RecordKind::GroundTruth, &config, &mut stats);
        assert_eq!(records[0].confidence, None);
    }

    #[test]
    fn test_parse_labels_skips_malformed() {
        let config = EvalConfig::new(2);
        let mut stats = LoadStats::new();
        let contents = "\
0 0.5 0.5 0.2 0.2
5 0.5 0.5 0.2 0.2
-1 0.5 0.5 0.2 0.2
0 0.5 0.5
0 x 0.5 0.2 0.2
0 0.5 0.5 -0.2 0.2

1 0.1 0.1 0.1 0.1
";
        let records = parse_labels(contents, RecordKind::GroundTruth, &config, &mut stats);
        assert_eq!(records.len(), 2);
        assert_eq!(stats.total_lines, 7);
        assert_eq!(stats.skipped_invalid_classes, 2);
        assert_eq!(stats.skipped_short_lines, 1);
        assert_eq!(stats.skipped_unparseable, 1);
        assert_eq!(stats.skipped_invalid_boxes, 1);
        assert_eq!(stats.loaded_records(), 2);
    }
}
