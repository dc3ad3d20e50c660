//! 推論とランキング

use std::sync::Arc;
use std::time::Instant;

use crate::error::{ClassifyError, ClassifyResult};
use crate::ml::encoder::TensorEncoder;
use crate::ml::ranking::{compose_label, resolve_labels, top_k};
use crate::ml::score_model::ScoreModel;
use crate::model::config::RankingSettings;
use crate::model::LabelTable;
use crate::types::{Bitmap, ClassificationResult, TraversalOrder};

/// 推論エンジン
///
/// 入力テンソル用のバッファをインスタンスごとに持つため、`classify` は `&mut self`。
/// 複数スレッドから使う場合はスレッドごとにエンジンを作るか、Mutexで囲むこと。
pub struct InferenceEngine<M> {
    model: M,
    encoder: TensorEncoder,
    labels: Arc<LabelTable>,
    ranking: RankingSettings,
    scratch: Vec<f32>,
}

impl<M: ScoreModel> InferenceEngine<M> {
    /// 読み込み済みのモデルとラベル表から推論エンジンを作成
    pub fn new(
        model: M,
        labels: Arc<LabelTable>,
        traversal: TraversalOrder,
        ranking: RankingSettings,
    ) -> ClassifyResult<Self> {
        let shape = model.input_shape();
        let encoder = TensorEncoder::new(shape, traversal)?;

        let missing = labels.missing_indices(model.num_classes());
        if !missing.is_empty() {
            log::warn!(
                "ラベル表に {} 件のクラスが不足しています (例: {:?})",
                missing.len(),
                &missing[..missing.len().min(5)]
            );
        }

        log::info!(
            "推論エンジン初期化: 入力 {}x{}x{}, {} classes, 書き込み順序 {}",
            shape.height,
            shape.width,
            shape.channels,
            model.num_classes(),
            traversal
        );

        Ok(Self {
            model,
            encoder,
            labels,
            ranking: RankingSettings {
                top_k: ranking.top_k.max(1),
                ..ranking
            },
            scratch: Vec::with_capacity(shape.len()),
        })
    }

    /// ビットマップを分類
    pub fn classify(&mut self, bitmap: &Bitmap) -> ClassifyResult<ClassificationResult> {
        self.encoder.encode_into(bitmap, &mut self.scratch)?;

        let start = Instant::now();
        let scores = self.model.predict(&self.scratch)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        log::debug!("classify(): scores = {:?}, elapsed = {}ms", scores, elapsed_ms);

        let expected = self.model.num_classes();
        if scores.len() != expected {
            return Err(ClassifyError::model_invocation(format!(
                "スコア数が不正です: {} (期待: {})",
                scores.len(),
                expected
            )));
        }

        self.rank(scores, elapsed_ms)
    }

    /// 複数のビットマップを順に分類
    ///
    /// 最初のエラーで中断し、途中までの結果は返さない。
    pub fn classify_batch(&mut self, bitmaps: &[Bitmap]) -> ClassifyResult<Vec<ClassificationResult>> {
        let mut results = Vec::with_capacity(bitmaps.len());

        for bitmap in bitmaps {
            results.push(self.classify(bitmap)?);
        }

        Ok(results)
    }

    /// スコアベクトルから結果を組み立てる
    pub fn rank(&self, scores: Vec<f32>, elapsed_ms: u64) -> ClassifyResult<ClassificationResult> {
        let top_indices = top_k(&scores, self.ranking.top_k);
        let top_labels = resolve_labels(&self.labels, &top_indices)?;
        let label = compose_label(&top_labels, &self.ranking.delimiter);

        Ok(ClassificationResult::new(
            scores,
            elapsed_ms,
            top_indices,
            top_labels,
            label,
        ))
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn encoder(&self) -> &TensorEncoder {
        &self.encoder
    }

    pub fn labels(&self) -> &Arc<LabelTable> {
        &self.labels
    }
}

#[cfg(feature = "ml")]
pub use self::loader::load_engine;

#[cfg(feature = "ml")]
mod loader {
    use anyhow::Result;
    use std::sync::Arc;

    use super::InferenceEngine;
    use crate::ml::score_model::{load_model, ScoreModel};
    use crate::model::config::AppConfig;
    use crate::model::LabelTable;

    /// 設定からモデルとラベル表を読み込んで推論エンジンを作成
    ///
    /// 書き込み順序は設定で上書きされていなければバンドルのメタデータに従う。
    pub fn load_engine(config: &AppConfig) -> Result<InferenceEngine<Box<dyn ScoreModel>>> {
        let (model, metadata) = load_model(config)?;
        let labels = Arc::new(LabelTable::load(&config.labels_path)?);
        let traversal = config.encoder.traversal.unwrap_or(metadata.traversal);

        let engine = InferenceEngine::new(model, labels, traversal, config.ranking.clone())?;
        Ok(engine)
    }
}
