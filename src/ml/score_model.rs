//! 推論エンジンから見たモデルハンドル
//!
//! エンジンはモデルの読み込み方法を知らない。固定形状の入力を受け取り、
//! 固定長のスコアベクトルを返すものであれば何でもよい。

use crate::error::ClassifyResult;
use crate::types::InputShape;

/// 読み込み済みモデル
pub trait ScoreModel {
    /// モデルが期待する入力形状
    fn input_shape(&self) -> InputShape;

    /// 出力スコアの長さ（クラス数）
    fn num_classes(&self) -> usize;

    /// 推論を実行してスコアベクトルを返す
    ///
    /// 失敗は `ClassifyError::ModelInvocation` として返す。
    fn predict(&self, input: &[f32]) -> ClassifyResult<Vec<f32>>;
}

impl<M: ScoreModel + ?Sized> ScoreModel for Box<M> {
    fn input_shape(&self) -> InputShape {
        (**self).input_shape()
    }

    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn predict(&self, input: &[f32]) -> ClassifyResult<Vec<f32>> {
        (**self).predict(input)
    }
}

#[cfg(feature = "ml")]
pub use self::burn_model::{load_model, BurnSketchModel};

#[cfg(feature = "ml")]
mod burn_model {
    use anyhow::Result;
    use std::path::Path;

    use burn::{
        backend::Wgpu,
        module::Module,
        record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
        tensor::{activation::softmax, backend::Backend, Tensor},
    };
    use burn_ndarray::NdArray;
    use burn_wgpu::WgpuDevice;

    use super::ScoreModel;
    use crate::error::{ClassifyError, ClassifyResult};
    use crate::ml::ml_model::{SketchNet, SketchNetConfig};
    use crate::model::config::{AppConfig, DeviceType};
    use crate::model::{load_bundle, ModelMetadata};
    use crate::types::InputShape;

    /// Burnで実装したスケッチ分類モデル
    ///
    /// 出力はsoftmax後の確率。
    pub struct BurnSketchModel<B: Backend> {
        net: SketchNet<B>,
        device: B::Device,
        input_shape: InputShape,
        num_classes: usize,
    }

    impl<B: Backend> BurnSketchModel<B> {
        pub fn new(net: SketchNet<B>, device: B::Device, input_shape: InputShape, num_classes: usize) -> Self {
            Self {
                net,
                device,
                input_shape,
                num_classes,
            }
        }

        /// モデルバンドルから重みを復元
        pub fn load(bundle_path: &Path, device: B::Device) -> Result<(Self, ModelMetadata)> {
            let (metadata, weights) = load_bundle(bundle_path)?;

            if metadata.input_height != metadata.input_width {
                anyhow::bail!(
                    "正方形以外の入力には対応していません: {}x{}",
                    metadata.input_width,
                    metadata.input_height
                );
            }

            let net = SketchNetConfig::new(metadata.num_classes)
                .with_channels(metadata.num_channels)
                .with_image_size(metadata.input_width)
                .init::<B>(&device)?;

            let record = BinBytesRecorder::<FullPrecisionSettings>::default()
                .load(weights, &device)
                .map_err(|e| anyhow::anyhow!("モデル重みの読み込みエラー: {:?}", e))?;
            let net = net.load_record(record);

            log::info!(
                "モデルを読み込みました: {} ({} classes)",
                metadata.model_name,
                metadata.num_classes
            );

            let model = Self::new(net, device, metadata.input_shape(), metadata.num_classes);
            Ok((model, metadata))
        }

        /// 重みをバンドル用のバイト列に変換
        pub fn to_bytes(&self) -> Result<Vec<u8>> {
            BinBytesRecorder::<FullPrecisionSettings>::default()
                .record(self.net.clone().into_record(), ())
                .map_err(|e| anyhow::anyhow!("モデル重みの書き出しエラー: {:?}", e))
        }
    }

    impl<B: Backend> ScoreModel for BurnSketchModel<B> {
        fn input_shape(&self) -> InputShape {
            self.input_shape
        }

        fn num_classes(&self) -> usize {
            self.num_classes
        }

        fn predict(&self, input: &[f32]) -> ClassifyResult<Vec<f32>> {
            let shape = self.input_shape;
            if input.len() != shape.len() {
                return Err(ClassifyError::model_invocation(format!(
                    "入力長が不正です: {} (期待: {})",
                    input.len(),
                    shape.len()
                )));
            }

            // [1, C, H, W]
            let tensor = Tensor::<B, 1>::from_floats(input, &self.device).reshape([
                1,
                shape.channels,
                shape.height,
                shape.width,
            ]);

            let output = softmax(self.net.forward(tensor), 1);

            output
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| ClassifyError::model_invocation(format!("推論結果の取得エラー: {:?}", e)))
        }
    }

    /// 設定に従ってバックエンドを選び、モデルを読み込む
    pub fn load_model(config: &AppConfig) -> Result<(Box<dyn ScoreModel>, ModelMetadata)> {
        let bundle_path = Path::new(&config.model.bundle_path);
        log::info!("計算デバイス: {}", config.device_type);

        match config.device_type {
            DeviceType::Wgpu => {
                let (model, metadata) = BurnSketchModel::<Wgpu>::load(bundle_path, WgpuDevice::default())?;
                let model: Box<dyn ScoreModel> = Box::new(model);
                Ok((model, metadata))
            }
            DeviceType::Cpu => {
                let (model, metadata) =
                    BurnSketchModel::<NdArray<f32>>::load(bundle_path, Default::default())?;
                let model: Box<dyn ScoreModel> = Box::new(model);
                Ok((model, metadata))
            }
        }
    }
}

#[cfg(all(test, feature = "ml"))]
mod tests {
    use super::*;
    use crate::ml::ml_model::SketchNetConfig;
    use crate::model::config::AppConfig;
    use crate::model::{save_bundle, ModelMetadata};
    use crate::types::TraversalOrder;

    type TestBackend = burn_ndarray::NdArray<f32>;

    fn test_model() -> BurnSketchModel<TestBackend> {
        let device = Default::default();
        let net = SketchNetConfig::new(100).init::<TestBackend>(&device).unwrap();
        BurnSketchModel::new(net, device, InputShape::default(), 100)
    }

    #[test]
    fn test_predict_returns_probabilities() {
        let model = test_model();
        let scores = model.predict(&vec![0.5; 784]).unwrap();

        assert_eq!(scores.len(), 100);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!(scores.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn test_predict_rejects_wrong_length() {
        let model = test_model();
        let err = model.predict(&[0.0; 10]).unwrap_err();
        assert!(matches!(err, crate::error::ClassifyError::ModelInvocation { .. }));
    }

    #[test]
    fn test_bundle_roundtrip_keeps_predictions() {
        let model = test_model();
        let input: Vec<f32> = (0..784).map(|i| (i % 7) as f32 / 7.0).collect();
        let expected = model.predict(&input).unwrap();

        let metadata = ModelMetadata::new("test-net", InputShape::default(), 100, TraversalOrder::RowMajor);
        let path = std::env::temp_dir()
            .join(format!("quickdraw_burn_{}", std::process::id()))
            .join("net.tar.gz");
        save_bundle(&path, &metadata, &model.to_bytes().unwrap()).unwrap();

        let mut config = AppConfig::default();
        config.model.bundle_path = path.to_string_lossy().to_string();
        let (loaded, loaded_metadata) = load_model(&config).unwrap();

        assert_eq!(loaded_metadata.model_name, "test-net");
        assert_eq!(loaded.num_classes(), 100);
        let actual = loaded.predict(&input).unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5);
        }

        std::fs::remove_file(&path).ok();
    }
}
