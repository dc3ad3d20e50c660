//! Quick Draw スケッチ分類
//!
//! 28x28のスケッチ画像をテンソルに変換し、学習済みモデルで推論して
//! 上位3件のカテゴリ名とスコアを返します。
//!
//! - [`ml::TensorEncoder`]: ビットマップ → 入力テンソル
//! - [`ml::InferenceEngine`]: 推論、上位k件の抽出、ラベル解決
//! - [`model`]: モデルバンドル・ラベル表・設定の読み込み

pub mod error;
pub mod types;
pub mod ml;
pub mod model;

pub use error::{ClassifyError, ClassifyResult};
pub use types::{Bitmap, ClassificationResult, InputShape, TraversalOrder};
