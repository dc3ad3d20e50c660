//! モデルメタデータの定義
//!
//! モデルバンドル（tar.gz）内の `metadata.json` として保存されます。
//! 入力形状・クラス数・学習時の前処理順序を記録し、推論側はこれに合わせて
//! エンコーダとネットワークを構築します。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{InputShape, TraversalOrder, IMAGE_HEIGHT, IMAGE_WIDTH, NUM_CHANNELS, NUM_CLASSES};

/// 既定のモデル名
pub const DEFAULT_MODEL_NAME: &str = "quickdraw-acc93-v1";

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// モデル識別子
    pub model_name: String,

    /// 入力画像の高さ（ピクセル）
    pub input_height: usize,

    /// 入力画像の幅（ピクセル）
    pub input_width: usize,

    /// 入力チャネル数（グレースケールなので通常1）
    pub num_channels: usize,

    /// 出力クラス数
    pub num_classes: usize,

    /// 学習時のピクセル書き込み順序
    /// 古いバンドルには無いので既定値（行優先）を使う
    #[serde(default)]
    pub traversal: TraversalOrder,

    /// 書き出し時刻（RFC 3339）
    pub exported_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(
        model_name: impl Into<String>,
        input_shape: InputShape,
        num_classes: usize,
        traversal: TraversalOrder,
    ) -> Self {
        let exported_at = chrono::Local::now().to_rfc3339();

        Self {
            model_name: model_name.into(),
            input_height: input_shape.height,
            input_width: input_shape.width,
            num_channels: input_shape.channels,
            num_classes,
            traversal,
            exported_at,
        }
    }

    /// モデル入力形状
    pub fn input_shape(&self) -> InputShape {
        InputShape::new(self.input_height, self.input_width, self.num_channels)
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self::new(
            DEFAULT_MODEL_NAME,
            InputShape::new(IMAGE_HEIGHT, IMAGE_WIDTH, NUM_CHANNELS),
            NUM_CLASSES,
            TraversalOrder::RowMajor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metadata() {
        let metadata = ModelMetadata::default();
        assert_eq!(metadata.model_name, "quickdraw-acc93-v1");
        assert_eq!(metadata.input_shape(), InputShape::new(28, 28, 1));
        assert_eq!(metadata.num_classes, 100);
        assert!(chrono::DateTime::parse_from_rfc3339(&metadata.exported_at).is_ok());
    }

    #[test]
    fn test_traversal_defaults_when_missing() {
        let json = r#"{
            "model_name": "legacy",
            "input_height": 28,
            "input_width": 28,
            "num_channels": 1,
            "num_classes": 100,
            "exported_at": "2024-01-01T00:00:00+09:00"
        }"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.traversal, TraversalOrder::RowMajor);
    }
}
