//! アプリケーション設定管理モジュール
//!
//! 計算デバイス・モデルバンドル・ラベル表・ランキング設定をJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ml::ranking::{DEFAULT_LABEL_DELIMITER, DEFAULT_TOP_K};
use crate::types::TraversalOrder;

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// WGPU (GPU) バックエンド
    Wgpu,
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// モデルバンドル（tar.gz）のパス
    pub bundle_path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            bundle_path: "models/quickdraw-acc93-v1.tar.gz".to_string(),
        }
    }
}

/// ランキング設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingSettings {
    /// 結果に含める上位件数
    pub top_k: usize,
    /// ラベル連結時の区切り文字
    pub delimiter: String,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            delimiter: DEFAULT_LABEL_DELIMITER.to_string(),
        }
    }
}

/// エンコーダ設定
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EncoderSettings {
    /// ピクセル書き込み順序の上書き
    /// 未指定ならモデルバンドルのメタデータに従う
    #[serde(default)]
    pub traversal: Option<TraversalOrder>,
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 計算デバイスの種類
    #[serde(default)]
    pub device_type: DeviceType,
    /// モデル設定
    #[serde(default)]
    pub model: ModelSettings,
    /// ラベルJSONのパス
    #[serde(default = "default_labels_path")]
    pub labels_path: String,
    /// ランキング設定
    #[serde(default)]
    pub ranking: RankingSettings,
    /// エンコーダ設定
    #[serde(default)]
    pub encoder: EncoderSettings,
}

fn default_labels_path() -> String {
    "models/quickdraw_labels.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::default(),
            model: ModelSettings::default(),
            labels_path: default_labels_path(),
            ranking: RankingSettings::default(),
            encoder: EncoderSettings::default(),
        }
    }
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("quickdraw_config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 設定を読み込む、存在しないか壊れている場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    log::info!("設定ファイルを読み込みました: {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "設定ファイルの読み込みに失敗しました ({}): {}",
                        path.display(),
                        e
                    );
                    log::warn!("デフォルト設定を使用します");
                    Self::default()
                }
            }
        } else {
            log::info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Self::default()
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定情報をログに出力
    pub fn display(&self) {
        log::info!("=== アプリケーション設定 ===");
        log::info!("計算デバイス: {}", self.device_type);
        log::info!("モデルバンドル: {}", self.model.bundle_path);
        log::info!("ラベル表: {}", self.labels_path);
        log::info!("上位件数: {}", self.ranking.top_k);
        match self.encoder.traversal {
            Some(order) => log::info!("書き込み順序: {} (上書き)", order),
            None => log::info!("書き込み順序: メタデータに従う"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.device_type, DeviceType::Cpu);
        assert_eq!(config.ranking.top_k, 3);
        assert_eq!(config.ranking.delimiter, ", ");
        assert_eq!(config.encoder.traversal, None);
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = AppConfig::default();
        config.device_type = DeviceType::Wgpu;
        config.encoder.traversal = Some(TraversalOrder::ColumnMajor);

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.device_type, DeviceType::Wgpu);
        assert_eq!(deserialized.encoder.traversal, Some(TraversalOrder::ColumnMajor));
        assert_eq!(deserialized.labels_path, config.labels_path);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"labels_path": "labels.json"}"#).unwrap();
        assert_eq!(config.labels_path, "labels.json");
        assert_eq!(config.ranking, RankingSettings::default());
        assert_eq!(config.model.bundle_path, "models/quickdraw-acc93-v1.tar.gz");
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let path = std::env::temp_dir().join(format!("quickdraw_config_{}.json", std::process::id()));
        std::fs::write(&path, "{ broken").unwrap();
        let config = AppConfig::load_or_default(&path);
        assert_eq!(config.ranking.top_k, 3);

        let mut saved = AppConfig::default();
        saved.ranking.top_k = 5;
        saved.save(&path).unwrap();
        assert_eq!(AppConfig::load_or_default(&path).ranking.top_k, 5);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(format!("{}", DeviceType::Wgpu), "WGPU (GPU)");
        assert_eq!(format!("{}", DeviceType::Cpu), "CPU (NdArray)");
    }
}
