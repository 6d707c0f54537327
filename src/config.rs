//! Evaluation settings and per-participant dataset descriptions.

use crate::error::{FedEvalError, Result};
use crate::matching::IOU_THRESHOLD;
use crate::types::DEFAULT_CONFIDENCE;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Settings for one evaluation run.
///
/// Deserializes from JSON; everything except `num_classes` has a default.
///
/// ```
/// use fedeval::config::EvalConfig;
///
/// let config: EvalConfig = serde_json::from_str(r#"{"num_classes": 3}"#).unwrap();
/// assert_eq!(config.iou_threshold, 0.5);
/// assert_eq!(config.class_names(), vec!["cls0", "cls1", "cls2"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Class ids are valid in `[0, num_classes)`
    pub num_classes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
    /// Confidence given to prediction lines without one
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,
}

fn default_iou_threshold() -> f64 {
    IOU_THRESHOLD
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

impl EvalConfig {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            names: None,
            iou_threshold: IOU_THRESHOLD,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }

    #[must_use]
    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Load and validate a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: EvalConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(FedEvalError::Validation(
                "num_classes must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(FedEvalError::Validation(format!(
                "iou_threshold must be between 0.0 and 1.0, got {}",
                self.iou_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(FedEvalError::Validation(format!(
                "default_confidence must be between 0.0 and 1.0, got {}",
                self.default_confidence
            )));
        }
        Ok(())
    }

    /// Display names for every class.
    ///
    /// Falls back to `cls{i}` for all classes when no names were given or
    /// their count does not match `num_classes`.
    pub fn class_names(&self) -> Vec<String> {
        match &self.names {
            Some(names) if names.len() == self.num_classes => names.clone(),
            _ => (0..self.num_classes).map(|i| format!("cls{i}")).collect(),
        }
    }
}

/// Dataset description supplied by one federated participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Number of classes
    pub nc: usize,
    #[serde(default)]
    pub names: Vec<String>,
}

impl DatasetConfig {
    /// Read a YOLO `data.yaml`. Keys other than `nc` and `names` are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Class count shared by every participant.
///
/// Returns a validation error when the list is empty or any `nc` differs.
pub fn consistent_class_count(configs: &[DatasetConfig]) -> Result<usize> {
    let first = configs.first().ok_or_else(|| {
        FedEvalError::Validation("at least one dataset config is required".to_string())
    })?;

    if configs.iter().any(|c| c.nc != first.nc) {
        let counts: Vec<usize> = configs.iter().map(|c| c.nc).collect();
        return Err(FedEvalError::Validation(format!(
            "dataset configs disagree on class count: {counts:?}"
        )));
    }

    Ok(first.nc)
}
