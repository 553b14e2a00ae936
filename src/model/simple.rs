//! Hand-written CNN.
//!
//! Two stacks of 3x3 convolutions (128 then 256 filters), each followed by
//! 2x2 max pooling, and a classifier head with a 512-unit hidden layer,
//! 1-D batch norm and dropout. On 32x32 inputs the feature map entering the
//! head is 256 x 8 x 8.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::model::ImageClassifier;

/// Configuration for [`SimpleCnn`]
#[derive(Config, Debug)]
pub struct SimpleCnnConfig {
    /// Number of output classes
    #[config(default = "100")]
    pub num_classes: usize,

    /// Dropout rate in the classifier head
    #[config(default = "0.2")]
    pub dropout_rate: f64,
}

/// Hand-written convolutional classifier
#[derive(Module, Debug)]
pub struct SimpleCnn<B: Backend> {
    conv1_1: Conv2d<B>,
    conv1_2: Conv2d<B>,
    pool1: MaxPool2d,

    conv2_1: Conv2d<B>,
    conv2_2: Conv2d<B>,
    pool2: MaxPool2d,

    fc1: Linear<B>,
    bn: BatchNorm<B, 0>,
    dropout: Dropout,
    fc2: Linear<B>,

    relu: Relu,
}

impl<B: Backend> SimpleCnn<B> {
    /// Create a new model with randomly initialized parameters
    pub fn new(config: &SimpleCnnConfig, device: &B::Device) -> Self {
        let conv = |inp: usize, out: usize| {
            Conv2dConfig::new([inp, out], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };
        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        // Stack 1: 32x32 -> 16x16, stack 2: 16x16 -> 8x8
        let conv1_1 = conv(3, 128);
        let conv1_2 = conv(128, 128);
        let conv2_1 = conv(128, 256);
        let conv2_2 = conv(256, 256);

        let fc1 = LinearConfig::new(256 * 8 * 8, 512).init(device);
        let bn = BatchNormConfig::new(512).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(512, config.num_classes).init(device);

        Self {
            conv1_1,
            conv1_2,
            pool1: pool(),
            conv2_1,
            conv2_2,
            pool2: pool(),
            fc1,
            bn,
            dropout,
            fc2,
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> ImageClassifier<B> for SimpleCnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        // Stack 1
        let x = self.relu.forward(self.conv1_1.forward(images));
        let x = self.relu.forward(self.conv1_2.forward(x));
        let x = self.pool1.forward(x);

        // Stack 2
        let x = self.relu.forward(self.conv2_1.forward(x));
        let x = self.relu.forward(self.conv2_2.forward(x));
        let x = self.pool2.forward(x);

        // Classifier
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);
        let x = self.relu.forward(self.fc1.forward(x));
        let x = self.bn.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let config = SimpleCnnConfig::new();
        let model = SimpleCnn::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 100]);
    }

    #[test]
    fn test_custom_class_count() {
        let device = Default::default();
        let config = SimpleCnnConfig::new().with_num_classes(10);
        let model = SimpleCnn::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [1, 10]);
    }
}
