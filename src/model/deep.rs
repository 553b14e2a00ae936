//! Deep residual classifier.
//!
//! A stage-based residual network sized for 32x32 inputs: a 3x3 stem, four
//! stages of basic blocks with channel widths base * {1, 2, 4, 8}, spatial
//! downsampling at the start of stages 2-4, global average pooling and a
//! linear head. With the default two blocks per stage this is an
//! 18-layer-class network.
//!
//! The same architecture backs two variants: `deep` starts from random
//! initialization, `transfer` loads a pretrained record file and fine-tunes.

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    record::{CompactRecorder, RecorderError},
    tensor::{backend::Backend, Tensor},
};

use crate::model::ImageClassifier;

/// Configuration for [`DeepCnn`]
#[derive(Config, Debug)]
pub struct DeepCnnConfig {
    /// Number of output classes
    #[config(default = "100")]
    pub num_classes: usize,

    /// Channel width of the first stage
    #[config(default = "64")]
    pub base_filters: usize,

    /// Residual blocks per stage
    #[config(default = "2")]
    pub blocks_per_stage: usize,
}

/// 1x1 projection used when a block changes shape
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_stride([stride, stride])
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Two 3x3 convolutions with a residual connection
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
    relu: Relu,
}

impl<B: Backend> BasicBlock<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn1 = BatchNormConfig::new(out_channels).init(device);

        let conv2 = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn2 = BatchNormConfig::new(out_channels).init(device);

        let downsample = if stride != 1 || in_channels != out_channels {
            Some(Downsample::new(in_channels, out_channels, stride, device))
        } else {
            None
        };

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            downsample,
            relu: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));

        self.relu.forward(out + identity)
    }
}

/// Deep residual image classifier
#[derive(Module, Debug)]
pub struct DeepCnn<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_bn: BatchNorm<B, 2>,

    stage1: Vec<BasicBlock<B>>,
    stage2: Vec<BasicBlock<B>>,
    stage3: Vec<BasicBlock<B>>,
    stage4: Vec<BasicBlock<B>>,

    global_pool: AdaptiveAvgPool2d,
    fc: Linear<B>,

    relu: Relu,
}

impl<B: Backend> DeepCnn<B> {
    /// Create a new model with randomly initialized parameters
    pub fn new(config: &DeepCnnConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        let stem_conv = Conv2dConfig::new([3, base], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let stem_bn = BatchNormConfig::new(base).init(device);

        // CIFAR inputs are small, so only stages 2-4 downsample: 32 -> 16 -> 8 -> 4.
        let stage1 = Self::stage(base, base, 1, config.blocks_per_stage, device);
        let stage2 = Self::stage(base, base * 2, 2, config.blocks_per_stage, device);
        let stage3 = Self::stage(base * 2, base * 4, 2, config.blocks_per_stage, device);
        let stage4 = Self::stage(base * 4, base * 8, 2, config.blocks_per_stage, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc = LinearConfig::new(base * 8, config.num_classes).init(device);

        Self {
            stem_conv,
            stem_bn,
            stage1,
            stage2,
            stage3,
            stage4,
            global_pool,
            fc,
            relu: Relu::new(),
        }
    }

    fn stage(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        blocks: usize,
        device: &B::Device,
    ) -> Vec<BasicBlock<B>> {
        let mut stage = Vec::with_capacity(blocks);
        stage.push(BasicBlock::new(in_channels, out_channels, stride, device));
        for _ in 1..blocks {
            stage.push(BasicBlock::new(out_channels, out_channels, 1, device));
        }
        stage
    }

    /// Load model parameters from a record file (pretrained weights or a
    /// training checkpoint). The file must have been written for the same
    /// configuration.
    pub fn load_from_file(
        config: &DeepCnnConfig,
        path: &Path,
        device: &B::Device,
    ) -> Result<Self, RecorderError> {
        let recorder = CompactRecorder::new();
        Self::new(config, device).load_file(path, &recorder, device)
    }
}

impl<B: Backend> ImageClassifier<B> for DeepCnn<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self
            .relu
            .forward(self.stem_bn.forward(self.stem_conv.forward(images)));

        let x = self.stage1.iter().fold(x, |x, block| block.forward(x));
        let x = self.stage2.iter().fold(x, |x, block| block.forward(x));
        let x = self.stage3.iter().fold(x, |x, block| block.forward(x));
        let x = self.stage4.iter().fold(x, |x, block| block.forward(x));

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        self.fc.forward(x)
    }
}
