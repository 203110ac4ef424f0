// ============================================================
// Layer 5 - CRNN Model
// ============================================================
// Convolutional feature extractor + bidirectional LSTM sequence
// encoder + per-step classifier.
//
//   input            [N, 1, 64, 512]
//   conv 64  → pool 2×2              [N,  64, 32, 256]
//   conv 128 → pool 2×2              [N, 128, 16, 128]
//   conv 256 → BN → pool 2×2         [N, 256,  8,  64]
//   conv 512 → BN → pool 2×1         [N, 512,  4,  64]
//   conv 512                         [N, 512,  4,  64]
//   width becomes time               [N, 64, 2048]     T = W/8, F = 512·H/16
//   linear → 64, relu                [N, 64, 64]
//   dropout → BiLSTM 256             [N, 64, 512]
//   dropout → BiLSTM 256             [N, 64, 512]
//   linear → num_classes             [N, 64, V+1]
//
// All convolutions are 3×3, same padding, ReLU. Height shrinks by
// 16 and width by 8, so the image size must divide accordingly.
//
// The network only produces scores. The CTC loss is applied by the
// trainer as a separate function; inference uses `forward`, which
// adds the softmax.
//
// Reference: Shi et al. (2015) An End-to-End Trainable Neural Network
//            for Image-based Sequence Recognition (CRNN)
//            Burn Book §3 (Building Blocks)

use anyhow::{bail, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, BiLstm, BiLstmConfig, Dropout, DropoutConfig, Linear,
        LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, softmax},
};

/// Height reduction of the convolutional stack
pub const HEIGHT_FACTOR: usize = 16;
/// Width reduction of the convolutional stack
pub const WIDTH_FACTOR: usize = 8;

const CHANNELS: [usize; 5] = [64, 128, 256, 512, 512];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CrnnConfig {
    /// Vocabulary size plus one for blank
    pub num_classes: usize,
    #[config(default = 64)]
    pub img_height:  usize,
    #[config(default = 512)]
    pub img_width:   usize,
    #[config(default = 64)]
    pub embed_dim:   usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl CrnnConfig {
    /// Check the shape contract before any weights are allocated.
    pub fn validate(&self) -> Result<()> {
        if self.num_classes < 2 {
            bail!("num_classes must be at least 2 (one symbol plus blank), got {}", self.num_classes);
        }
        if self.img_height == 0 || self.img_height % HEIGHT_FACTOR != 0 {
            bail!(
                "img_height must be a positive multiple of {HEIGHT_FACTOR}, got {}",
                self.img_height
            );
        }
        if self.img_width == 0 || self.img_width % WIDTH_FACTOR != 0 {
            bail!(
                "img_width must be a positive multiple of {WIDTH_FACTOR}, got {}",
                self.img_width
            );
        }
        Ok(())
    }

    /// Output sequence length T
    pub fn timesteps(&self) -> usize {
        self.img_width / WIDTH_FACTOR
    }

    /// Features per timestep after the convolutional stack
    pub fn sequence_features(&self) -> usize {
        CHANNELS[4] * (self.img_height / HEIGHT_FACTOR)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Crnn<B> {
        let pool_2x2 = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let pool_2x1 = || MaxPool2dConfig::new([2, 1]).with_strides([2, 1]).init();

        let blocks = vec![
            ConvBlock::new([1, CHANNELS[0]], false, Some(pool_2x2()), device),
            ConvBlock::new([CHANNELS[0], CHANNELS[1]], false, Some(pool_2x2()), device),
            ConvBlock::new([CHANNELS[1], CHANNELS[2]], true, Some(pool_2x2()), device),
            ConvBlock::new([CHANNELS[2], CHANNELS[3]], true, Some(pool_2x1()), device),
            ConvBlock::new([CHANNELS[3], CHANNELS[4]], false, None, device),
        ];

        let lstm_out = 2 * self.hidden_size;

        Crnn {
            blocks,
            embed:   LinearConfig::new(self.sequence_features(), self.embed_dim).init(device),
            lstm1:   BiLstmConfig::new(self.embed_dim, self.hidden_size, true).init(device),
            lstm2:   BiLstmConfig::new(lstm_out, self.hidden_size, true).init(device),
            head:    LinearConfig::new(lstm_out, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Convolutional block ──────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: Option<BatchNorm<B, 2>>,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    fn new(channels: [usize; 2], norm: bool, pool: Option<MaxPool2d>, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new(channels, [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let norm = norm.then(|| BatchNormConfig::new(channels[1]).init(device));
        Self { conv, norm, pool }
    }

    /// conv → relu → batch norm → max pool
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv.forward(x));
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

// ─── CRNN ─────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Crnn<B: Backend> {
    pub blocks:  Vec<ConvBlock<B>>,
    pub embed:   Linear<B>,
    pub lstm1:   BiLstm<B>,
    pub lstm2:   BiLstm<B>,
    pub head:    Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> Crnn<B> {
    /// images: [N, 1, H, W] → unnormalized scores [N, T, num_classes]
    pub fn forward_logits(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x);
        }

        // [N, C, H', T] → [N, T, H', C] → [N, T, H'·C]
        let [batch, channels, height, steps] = x.dims();
        let x = x.swap_dims(1, 3).reshape([batch, steps, height * channels]);

        let x = relu(self.embed.forward(x));

        let (x, _) = self.lstm1.forward(self.dropout.forward(x), None);
        let (x, _) = self.lstm2.forward(self.dropout.forward(x), None);

        self.head.forward(x)
    }

    /// images: [N, 1, H, W] → class probabilities [N, T, num_classes],
    /// each step summing to 1
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        softmax(self.forward_logits(images), 2)
    }

    /// Width of the classifier output, compared against the
    /// vocabulary when a checkpoint is loaded.
    pub fn output_width(&self) -> usize {
        self.head.weight.val().dims()[1]
    }
}
