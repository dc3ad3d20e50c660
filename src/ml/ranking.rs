//! スコアベクトルの上位k件抽出とラベル解決

use crate::error::ClassifyResult;
use crate::model::LabelTable;

/// 既定の上位件数
pub const DEFAULT_TOP_K: usize = 3;

/// ラベル連結時の既定区切り文字
pub const DEFAULT_LABEL_DELIMITER: &str = ", ";

/// スコア降順で上位k件のインデックスを返す
///
/// 同点はインデックスの小さい方が先。NaNは最下位として扱う。
/// kがスコア数より大きい場合はスコア数まで。
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let key = |i: usize| {
        let score = scores[i];
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score
        }
    };

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    // 安定ソートなので同点は昇順のまま残る
    indices.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    indices.truncate(k);
    indices
}

/// インデックスをラベルへ解決
///
/// 1件でも見つからなければ `LabelNotFound` を返す。
pub fn resolve_labels(labels: &LabelTable, indices: &[usize]) -> ClassifyResult<Vec<String>> {
    indices
        .iter()
        .map(|&index| labels.get(index).map(str::to_string))
        .collect()
}

/// 順位順にラベルを連結
pub fn compose_label(labels: &[String], delimiter: &str) -> String {
    labels.join(delimiter)
}
