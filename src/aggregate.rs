//! Federated averaging (FedAvg) of parameter collections.
//!
//! Every participant contributes one [`ParameterCollection`]. The merged
//! collection holds, for each parameter name shared by all participants, the
//! weighted elementwise mean of their tensors.

use crate::error::{FedEvalError, Result};
use crate::types::{DType, Parameter, ParameterCollection, Tensor, TensorData};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Merged parameters plus what was left out and why.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub collection: ParameterCollection,
    /// Normalized weights actually applied, one per input collection
    pub weights: Vec<f64>,
    /// Names missing from at least one collection, in lexicographic order
    pub dropped_keys: Vec<String>,
    /// Shared names whose value is not a floating-point tensor (counters, metadata)
    pub skipped_keys: Vec<String>,
}

/// Normalize per-collection weights so they sum to 1.
///
/// `None` gives the uniform weight `1 / n`.
///
/// # Errors
///
/// Returns a validation error if `n` is 0, if the number of weights differs
/// from `n`, if a weight is negative or not finite, or if they sum to zero.
/// Weights whose sum overflows f64 are rescaled, not rejected.
///
/// # Example
///
/// ```
/// use fedeval::aggregate::normalize_weights;
///
/// let weights = normalize_weights(Some(&[1.0, 3.0]), 2).unwrap();
/// assert_eq!(weights, vec![0.25, 0.75]);
/// ```
pub fn normalize_weights(weights: Option<&[f64]>, n: usize) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(FedEvalError::Validation(
            "at least one parameter collection is required".to_string(),
        ));
    }

    let Some(weights) = weights else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / n as f64;
        return Ok(vec![uniform; n]);
    };

    if weights.len() != n {
        return Err(FedEvalError::Validation(format!(
            "got {} weights for {} parameter collections",
            weights.len(),
            n
        )));
    }

    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(FedEvalError::Validation(format!(
            "weights must be finite and non-negative, got {bad}"
        )));
    }

    let largest = weights.iter().copied().fold(0.0f64, f64::max);
    if largest <= 0.0 {
        return Err(FedEvalError::Validation(
            "weights must not all be zero".to_string(),
        ));
    }

    let mut scaled = weights.to_vec();
    let mut total: f64 = scaled.iter().sum();
    if !total.is_finite() {
        // sum overflowed: rescale by the largest weight first
        scaled.iter_mut().for_each(|w| *w /= largest);
        total = scaled.iter().sum();
    }

    Ok(scaled.iter().map(|w| w / total).collect())
}

/// Turn per-participant sample counts into (unnormalized) weights.
#[allow(clippy::cast_precision_loss)]
pub fn sample_sizes_to_weights(sizes: &[u64]) -> Vec<f64> {
    sizes.iter().map(|&s| s as f64).collect()
}

/// Names present in every collection, in lexicographic order.
pub fn common_keys(collections: &[ParameterCollection]) -> Vec<String> {
    let Some((first, rest)) = collections.split_first() else {
        return Vec::new();
    };

    first
        .keys()
        .filter(|key| rest.iter().all(|c| c.contains_key(*key)))
        .cloned()
        .collect()
}

/// Weighted elementwise mean of `collections` (FedAvg).
///
/// Only names shared by every collection are merged; the rest are listed in
/// `dropped_keys`. A shared name is merged when its value in the first
/// collection is a floating-point tensor, otherwise it is listed in
/// `skipped_keys`. Sums are accumulated in f64 and stored in the element type
/// of the first collection's tensor. Inputs are not modified.
///
/// Keys are merged in parallel and gathered back in lexicographic order.
///
/// # Errors
///
/// Returns a validation error for an empty input or bad weights (see
/// [`normalize_weights`]), and `ShapeMismatch` when a participant's value
/// under a merged name is not a tensor of the reference shape.
///
/// # Example
///
/// ```
/// use fedeval::aggregate::federated_average;
/// use fedeval::types::{ParameterCollection, Tensor};
///
/// let mut a = ParameterCollection::new();
/// a.insert("w".to_string(), Tensor::from_f32(vec![2.0]).into());
/// let mut b = ParameterCollection::new();
/// b.insert("w".to_string(), Tensor::from_f32(vec![4.0]).into());
///
/// let outcome = federated_average(&[a, b], None).unwrap();
/// let w = outcome.collection["w"].as_tensor().unwrap();
/// assert_eq!(w.to_f64_vec(), vec![3.0]);
/// ```
pub fn federated_average(
    collections: &[ParameterCollection],
    weights: Option<&[f64]>,
) -> Result<AggregationOutcome> {
    let weights = normalize_weights(weights, collections.len())?;

    let shared = common_keys(collections);
    let shared_set: BTreeSet<&str> = shared.iter().map(String::as_str).collect();

    let mut dropped: BTreeSet<String> = BTreeSet::new();
    for collection in collections {
        dropped.extend(
            collection
                .keys()
                .filter(|k| !shared_set.contains(k.as_str()))
                .cloned(),
        );
    }
    let dropped_keys: Vec<String> = dropped.into_iter().collect();
    if !dropped_keys.is_empty() {
        warn!(
            count = dropped_keys.len(),
            "dropping parameters not present in every collection"
        );
    }

    let reference = &collections[0];
    let (merge_keys, skipped_keys): (Vec<String>, Vec<String>) = shared
        .into_iter()
        .partition(|key| reference[key].is_float_tensor());

    let merged: Vec<(String, Parameter)> = merge_keys
        .par_iter()
        .map(|key| average_key(key, collections, &weights).map(|t| (key.clone(), Parameter::Tensor(t))))
        .collect::<Result<Vec<_>>>()?;

    info!(
        collections = collections.len(),
        merged = merged.len(),
        dropped = dropped_keys.len(),
        skipped = skipped_keys.len(),
        "federated average finished"
    );

    Ok(AggregationOutcome {
        collection: merged.into_iter().collect(),
        weights,
        dropped_keys,
        skipped_keys,
    })
}

fn average_key(key: &str, collections: &[ParameterCollection], weights: &[f64]) -> Result<Tensor> {
    let reference = collections[0][key]
        .as_tensor()
        .ok_or_else(|| FedEvalError::Validation(format!("'{key}' is not a tensor")))?;

    let mut acc = vec![0.0f64; reference.shape.iter().product::<usize>()];
    for (weight, collection) in weights.iter().zip(collections) {
        let tensor = collection[key].as_tensor().ok_or_else(|| FedEvalError::ShapeMismatch {
            key: key.to_string(),
            expected: reference.shape.clone(),
            found: Vec::new(),
        })?;
        if !tensor.is_consistent() {
            return Err(FedEvalError::ShapeMismatch {
                key: key.to_string(),
                expected: tensor.shape.clone(),
                found: vec![tensor.numel()],
            });
        }
        if tensor.shape != reference.shape {
            return Err(FedEvalError::ShapeMismatch {
                key: key.to_string(),
                expected: reference.shape.clone(),
                found: tensor.shape.clone(),
            });
        }

        for (a, v) in acc.iter_mut().zip(tensor.to_f64_vec()) {
            *a += weight * v;
        }
    }

    debug!(key, numel = acc.len(), "averaged parameter");

    #[allow(clippy::cast_possible_truncation)]
    let data = match reference.dtype() {
        DType::F32 => TensorData::F32(acc.into_iter().map(|v| v as f32).collect()),
        _ => TensorData::F64(acc),
    };

    Ok(Tensor {
        shape: reference.shape.clone(),
        data,
    })
}
