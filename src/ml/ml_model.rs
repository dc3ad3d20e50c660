//! スケッチ分類用CNNモデルの定義

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// モデル設定
#[derive(Config, Debug)]
pub struct SketchNetConfig {
    /// 分類クラス数
    pub num_classes: usize,
    /// 入力チャネル数
    #[config(default = 1)]
    pub channels: usize,
    /// 入力画像サイズ（正方形）
    #[config(default = 28)]
    pub image_size: usize,
}

impl SketchNetConfig {
    /// モデルを初期化
    ///
    /// 入力サイズが小さすぎて特徴マップが消える場合はエラー。
    pub fn init<B: Backend>(&self, device: &B::Device) -> anyhow::Result<SketchNet<B>> {
        // Conv (3x3, no padding) で -2、Pool (2x2) で /2（切り捨て）
        let after_conv1 = self.image_size.saturating_sub(2);
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1.saturating_sub(2);
        let after_pool2 = after_conv2 / 2;
        let feature_map_size = after_pool2.saturating_sub(2);

        if feature_map_size == 0 {
            anyhow::bail!("入力サイズが小さすぎます: {}", self.image_size);
        }

        // 特徴次元 d = 128チャネル * feature_map_size * feature_map_size
        let d = 128 * feature_map_size * feature_map_size;
        let d_half = d / 2;

        log::debug!(
            "[Model] 入力: {}x{}x{}, 特徴マップ: 128 x {}x{}, FC: {} -> {} -> {}",
            self.channels,
            self.image_size,
            self.image_size,
            feature_map_size,
            feature_map_size,
            d,
            d_half,
            self.num_classes
        );

        Ok(SketchNet {
            conv1: Conv2dConfig::new([self.channels, 32], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool1: MaxPool2dConfig::new([2, 2]).init(),
            conv2: Conv2dConfig::new([32, 64], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool2: MaxPool2dConfig::new([2, 2]).init(),
            conv3: Conv2dConfig::new([64, 128], [3, 3])
                .with_stride([1, 1])
                .init(device),
            fc1: LinearConfig::new(d, d_half).init(device),
            fc2: LinearConfig::new(d_half, self.num_classes).init(device),
            activation: Relu::new(),
        })
    }
}

/// スケッチ分類用CNNモデル
///
/// # アーキテクチャ
/// - Conv 3x3 + ReLU + MaxPool 2x2
/// - Conv 3x3 + ReLU + MaxPool 2x2
/// - Conv 3x3 + ReLU
/// - Flatten
/// - FC: d -> d/2 + ReLU
/// - FC: d/2 -> num_classes
///
/// 28x28入力では 28 -> 26 -> 13 -> 11 -> 5 -> 3 となり d = 128 * 3 * 3。
#[derive(Module, Debug)]
pub struct SketchNet<B: Backend> {
    conv1: Conv2d<B>, // channels -> 32
    pool1: MaxPool2d,
    conv2: Conv2d<B>, // 32 -> 64
    pool2: MaxPool2d,
    conv3: Conv2d<B>, // 64 -> 128

    fc1: Linear<B>, // d -> d/2
    fc2: Linear<B>, // d/2 -> num_classes

    activation: Relu,
}

impl<B: Backend> SketchNet<B> {
    /// 順伝播
    ///
    /// - `images`: [batch_size, channels, size, size]
    /// - 戻り値: クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);

        let x = self.conv3.forward(x);
        let x = self.activation.forward(x);

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);

        self.fc2.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn_ndarray::NdArray<f32>;

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let net = SketchNetConfig::new(100).init::<TestBackend>(&device).unwrap();

        let images = Tensor::<TestBackend, 4>::zeros([2, 1, 28, 28], &device);
        let output = net.forward(images);
        assert_eq!(output.dims(), [2, 100]);
    }

    #[test]
    fn test_too_small_input_rejected() {
        let device = Default::default();
        let result = SketchNetConfig::new(10)
            .with_image_size(12)
            .init::<TestBackend>(&device);
        assert!(result.is_err());
    }
}
