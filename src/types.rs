//! Core data types for detection records, evaluation results and parameter collections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence assigned to prediction records that carry none.
///
/// Low enough to rank such detections last, but they still count: dropping
/// them instead would change AP.
pub const DEFAULT_CONFIDENCE: f64 = 0.001;

/// Bounding box in corner form (x1, y1, x2, y2).
///
/// Coordinates are normally normalized to [0, 1] relative to the image size,
/// but nothing here enforces that. Zero-area boxes are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its corners.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a bounding box from center/size form (YOLO label layout).
    pub fn from_center_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        let [x1, y1, x2, y2] = crate::geometry::to_corner([x, y, width, height]);
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check that the corners are ordered (degenerate boxes are valid).
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One labelled object: a ground-truth box or a scored prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub class_id: usize,
    /// Confidence score (predictions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub bbox: BoundingBox,
}

impl BoxRecord {
    /// Create a ground-truth record.
    pub fn ground_truth(class_id: usize, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence: None,
            bbox,
        }
    }

    /// Create a prediction record.
    pub fn prediction(class_id: usize, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence: Some(confidence),
            bbox,
        }
    }

    /// Get the confidence score, defaulting to [`DEFAULT_CONFIDENCE`] if not present.
    pub fn score(&self) -> f64 {
        self.confidence.unwrap_or(DEFAULT_CONFIDENCE)
    }
}

/// Records grouped by image identifier.
///
/// Images iterate in identifier order. Ground truth and predictions are held in
/// separate instances and need not cover the same images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotations {
    images: BTreeMap<String, Vec<BoxRecord>>,
}

impl ImageAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image with no records. Existing records are kept.
    pub fn add_image(&mut self, image_id: impl Into<String>) {
        self.images.entry(image_id.into()).or_default();
    }

    /// Append a record to an image, registering the image if needed.
    pub fn push(&mut self, image_id: impl Into<String>, record: BoxRecord) {
        self.images.entry(image_id.into()).or_default().push(record);
    }

    pub fn get(&self, image_id: &str) -> Option<&[BoxRecord]> {
        self.images.get(image_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BoxRecord])> {
        self.images
            .iter()
            .map(|(id, records)| (id.as_str(), records.as_slice()))
    }

    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// Total number of records across all images.
    pub fn num_records(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }

    /// Number of records of `class_id` across all images.
    pub fn count_class(&self, class_id: usize) -> usize {
        self.images
            .values()
            .flatten()
            .filter(|r| r.class_id == class_id)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl FromIterator<(String, BoxRecord)> for ImageAnnotations {
    fn from_iter<I: IntoIterator<Item = (String, BoxRecord)>>(iter: I) -> Self {
        let mut annotations = Self::new();
        for (image_id, record) in iter {
            annotations.push(image_id, record);
        }
        annotations
    }
}

/// Evaluation result for a single class.
///
/// `ap`, `precision` and `recall` are NaN when the class has no ground truth
/// anywhere in the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct ClassEvaluation {
    pub class_id: usize,
    pub ap: f64,
    /// Precision at the end of the ranked prediction list
    pub precision: f64,
    /// Recall at the end of the ranked prediction list
    pub recall: f64,
    pub num_ground_truth: usize,
    pub num_predictions: usize,
    pub true_positives: usize,
}

impl ClassEvaluation {
    /// Result for a class with no ground truth.
    pub fn undefined(class_id: usize, num_predictions: usize) -> Self {
        Self {
            class_id,
            ap: f64::NAN,
            precision: f64::NAN,
            recall: f64::NAN,
            num_ground_truth: 0,
            num_predictions,
            true_positives: 0,
        }
    }

    /// Whether AP is defined (the class has ground truth).
    pub fn is_defined(&self) -> bool {
        !self.ap.is_nan()
    }
}

/// mAP and per-class results for a whole dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    /// `IoU` threshold the predictions were matched at
    pub iou_threshold: f64,
    /// Mean of the defined per-class APs, 0.0 when none is defined
    pub mean_ap: f64,
    /// One entry per class, in class id order
    pub per_class: Vec<ClassEvaluation>,
}

impl DatasetReport {
    /// AP of every class in class id order (NaN for undefined classes).
    pub fn ap_values(&self) -> Vec<f64> {
        self.per_class.iter().map(|c| c.ap).collect()
    }

    pub fn class(&self, class_id: usize) -> Option<&ClassEvaluation> {
        self.per_class.iter().find(|c| c.class_id == class_id)
    }

    /// Number of classes that contributed to the mean.
    pub fn num_defined(&self) -> usize {
        self.per_class.iter().filter(|c| c.is_defined()).count()
    }
}

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
    I64,
}

impl DType {
    pub fn is_floating(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

/// Typed dense storage for a [`Tensor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum TensorData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            TensorData::F32(_) => DType::F32,
            TensorData::F64(_) => DType::F64,
            TensorData::I64(_) => DType::I64,
        }
    }
}

/// Dense row-major tensor with a fixed shape.
///
/// Deserialization goes through [`Tensor::new`], so a decoded tensor always
/// holds `shape.product()` elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: TensorData,
}

#[derive(Deserialize)]
struct RawTensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = crate::error::FedEvalError;

    fn try_from(raw: RawTensor) -> crate::error::Result<Self> {
        Tensor::new(raw.shape, raw.data)
    }
}

impl Tensor {
    /// Create a tensor, checking that `data` holds exactly `shape.product()` elements.
    pub fn new(shape: Vec<usize>, data: TensorData) -> crate::error::Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(crate::error::FedEvalError::Validation(format!(
                "tensor of shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional f32 tensor.
    pub fn from_f32(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: TensorData::F32(values),
        }
    }

    /// One-dimensional f64 tensor.
    pub fn from_f64(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: TensorData::F64(values),
        }
    }

    /// One-dimensional i64 tensor.
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: TensorData::I64(values),
        }
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Whether the element count matches the shape.
    pub fn is_consistent(&self) -> bool {
        self.shape.iter().product::<usize>() == self.data.len()
    }

    /// Copy the elements out widened to f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            TensorData::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::F64(v) => v.clone(),
            TensorData::I64(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// A value stored under a parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Tensor(Tensor),
    /// Non-tensor checkpoint entries (epoch counters, hyperparameters, ...)
    Metadata(serde_json::Value),
}

impl Parameter {
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Parameter::Tensor(t) => Some(t),
            Parameter::Metadata(_) => None,
        }
    }

    /// Whether this is a tensor with a floating-point element type.
    pub fn is_float_tensor(&self) -> bool {
        self.as_tensor().is_some_and(|t| t.dtype().is_floating())
    }
}

impl From<Tensor> for Parameter {
    fn from(tensor: Tensor) -> Self {
        Parameter::Tensor(tensor)
    }
}

/// Named parameters of one model (a "state dict"), in lexicographic key order.
pub type ParameterCollection = BTreeMap<String, Parameter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center_size() {
        let bbox = BoundingBox::from_center_size(0.5, 0.5, 0.2, 0.4);
        assert!((bbox.x1 - 0.4).abs() < 1e-12);
        assert!((bbox.y2 - 0.7).abs() < 1e-12);
        assert!((bbox.area() - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_annotations_keep_empty_images() {
        let mut annotations = ImageAnnotations::new();
        annotations.add_image("empty");
        annotations.push("img1", BoxRecord::ground_truth(1, BoundingBox::new(0.0, 0.0, 0.1, 0.1)));

        assert_eq!(annotations.num_images(), 2);
        assert_eq!(annotations.num_records(), 1);
        assert_eq!(annotations.count_class(1), 1);
        assert!(annotations.get("empty").is_some_and(<[_]>::is_empty));
    }

    #[test]
    fn test_missing_confidence_scores_default() {
        let record = BoxRecord::ground_truth(0, BoundingBox::new(0.0, 0.0, 0.1, 0.1));
        assert_eq!(record.confidence, None);
        assert_eq!(record.score(), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_tensor_new_checks_element_count() {
        assert!(Tensor::new(vec![2, 3], TensorData::F32(vec![0.0; 6])).is_ok());
        assert!(Tensor::new(vec![2, 3], TensorData::F32(vec![0.0; 5])).is_err());
    }

    #[test]
    fn test_tensor_deserialize_checks_element_count() {
        let ok: Tensor =
            serde_json::from_str(r#"{"shape":[2],"data":{"dtype":"f32","values":[1.0,2.0]}}"#).unwrap();
        assert!(ok.is_consistent());

        let short = serde_json::from_str::<Tensor>(r#"{"shape":[2],"data":{"dtype":"f32","values":[4.0]}}"#);
        assert!(short.is_err());
    }

    #[test]
    fn test_float_tensor_detection() {
        assert!(Parameter::from(Tensor::from_f32(vec![1.0])).is_float_tensor());
        assert!(!Parameter::from(Tensor::from_i64(vec![1])).is_float_tensor());
        assert!(!Parameter::Metadata(serde_json::json!({"lr": 0.01})).is_float_tensor());
    }
}
