//! Merge three client checkpoints with FedAvg, weighted by sample count.

use fedeval::aggregate::{federated_average, sample_sizes_to_weights};
use fedeval::types::{Parameter, ParameterCollection, Tensor, TensorData};

fn client_checkpoint(scale: f32, with_head: bool) -> Result<ParameterCollection, Box<dyn std::error::Error>> {
    let mut checkpoint = ParameterCollection::new();
    checkpoint.insert(
        "backbone.conv1.weight".to_string(),
        Tensor::new(vec![2, 3], TensorData::F32(vec![scale; 6]))?.into(),
    );
    checkpoint.insert("backbone.bn1.bias".to_string(), Tensor::from_f32(vec![scale * 0.1; 2]).into());
    checkpoint.insert("backbone.bn1.num_batches_tracked".to_string(), Tensor::from_i64(vec![500]).into());
    if with_head {
        checkpoint.insert("head.fc.weight".to_string(), Tensor::from_f32(vec![scale; 4]).into());
    }
    checkpoint.insert("epoch".to_string(), Parameter::Metadata(serde_json::json!(10)));
    Ok(checkpoint)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== FedAvg Example ===\n");

    let clients = vec![
        client_checkpoint(1.0, true)?,
        client_checkpoint(2.0, true)?,
        client_checkpoint(4.0, false)?,
    ];
    let weights = sample_sizes_to_weights(&[100, 300, 600]);

    let outcome = federated_average(&clients, Some(weights.as_slice()))?;

    println!("Normalized weights: {:?}", outcome.weights);
    for (name, param) in &outcome.collection {
        if let Some(tensor) = param.as_tensor() {
            println!("  {name:<28} shape {:?} -> {:?}", tensor.shape, tensor.to_f64_vec());
        }
    }
    println!("Dropped (not shared): {:?}", outcome.dropped_keys);
    println!("Skipped (not float):  {:?}", outcome.skipped_keys);

    let json = serde_json::to_string_pretty(&outcome.collection)?;
    println!("\nMerged checkpoint is {} bytes of JSON", json.len());

    Ok(())
}
