//! 分類パイプラインのエラー定義

use thiserror::Error;

/// 分類呼び出しで発生するエラー
///
/// いずれも呼び出し元へそのまま返す。リトライや部分的な結果は返さない。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    /// ビットマップがモデル入力サイズと一致しない
    #[error(
        "入力形状が不正です: {width}x{height} ({pixels} pixels), 期待: {expected_width}x{expected_height}"
    )]
    InvalidInputShape {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
        pixels: usize,
    },

    /// ラベル表にクラスインデックスが存在しない
    #[error("ラベルが見つかりません: クラスインデックス {index}")]
    LabelNotFound { index: usize },

    /// モデル推論の失敗
    #[error("モデル推論エラー: {reason}")]
    ModelInvocation { reason: String },

    /// エンコーダは単一チャネル入力のみ対応
    #[error("未対応のチャネル数です: {channels} (1チャネルのみ対応)")]
    UnsupportedChannels { channels: usize },
}

impl ClassifyError {
    pub fn model_invocation(reason: impl Into<String>) -> Self {
        Self::ModelInvocation {
            reason: reason.into(),
        }
    }
}

pub type ClassifyResult<T> = std::result::Result<T, ClassifyError>;
