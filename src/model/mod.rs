//! Model architectures.
//!
//! Both networks implement [`ImageClassifier`] so the training and
//! evaluation loops stay generic over the architecture.

pub mod deep;
pub mod simple;

use burn::prelude::*;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use deep::{DeepCnn, DeepCnnConfig};
pub use simple::{SimpleCnn, SimpleCnnConfig};

/// Which model a run trains
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Hand-written CNN
    Simple,
    /// Deep residual network, random initialization
    Deep,
    /// Deep residual network, fine-tuned from pretrained weights
    Transfer,
}

impl ModelVariant {
    /// Display name used in logs and the tracker
    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::Simple => "SimpleCNN",
            ModelVariant::Deep => "DeepCNN",
            ModelVariant::Transfer => "DeepCNN-Transfer",
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A batch of images in, per-class logits out
pub trait ImageClassifier<B: Backend> {
    /// Forward pass: [batch, 3, 32, 32] -> [batch, num_classes]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_names() {
        assert_eq!(ModelVariant::Simple.name(), "SimpleCNN");
        assert_eq!(ModelVariant::Transfer.to_string(), "DeepCNN-Transfer");
    }

    #[test]
    fn test_variant_serde() {
        let json = serde_json::to_string(&ModelVariant::Deep).unwrap();
        assert_eq!(json, "\"deep\"");
        let back: ModelVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ModelVariant::Deep);
    }
}
