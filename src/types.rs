use serde::{Deserialize, Serialize};
use std::path::Path;

/// モデル入力の高さ
pub const IMAGE_HEIGHT: usize = 28;
/// モデル入力の幅
pub const IMAGE_WIDTH: usize = 28;
/// モデル入力のチャネル数（グレースケール）
pub const NUM_CHANNELS: usize = 1;
/// 分類クラス数
pub const NUM_CLASSES: usize = 100;

/// モデル入力の形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// テンソルの要素数 (height * width * channels)
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InputShape {
    fn default() -> Self {
        Self::new(IMAGE_HEIGHT, IMAGE_WIDTH, NUM_CHANNELS)
    }
}

/// ピクセルをテンソルへ書き込む順序
///
/// モデル学習時の前処理と一致していないと、エラーにはならず誤分類になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    /// 出力位置 i にソースピクセル i を書き込む（ラスター順のまま）
    ///
    /// Android版のループは外側が幅、内側が高さだが、読み出しカーソルと
    /// 書き込み位置がどちらも単純に進むため、実質的にこの順序になる。
    #[default]
    RowMajor,
    /// 転置: 出力位置 `x * height + y` にソースピクセル `y * width + x`
    ColumnMajor,
}

impl std::fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalOrder::RowMajor => write!(f, "row-major"),
            TraversalOrder::ColumnMajor => write!(f, "column-major"),
        }
    }
}

/// 手書きスケッチのビットマップ
///
/// ピクセルは `0xAARRGGBB` 形式で行優先に並ぶ。
/// ピクセル数の検証はエンコーダが行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Bitmap {
    pub fn from_argb(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// 単色で塗りつぶしたビットマップ
    pub fn filled(width: usize, height: usize, argb: u32) -> Self {
        Self::from_argb(width, height, vec![argb; width * height])
    }

    /// 画像からビットマップを作成（リサイズはしない）
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                u32::from_be_bytes([a, r, g, b])
            })
            .collect();

        Self::from_argb(width as usize, height as usize, pixels)
    }

    /// 画像ファイルを読み込む
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let img = image::open(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("画像読み込みエラー {}: {}", path.as_ref().display(), e)
        })?;
        Ok(Self::from_image(&img))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

/// 1回の分類結果
///
/// 分類呼び出しごとに作成され、以降は変更されない。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    scores: Vec<f32>,
    elapsed_ms: u64,
    top_indices: Vec<usize>,
    top_labels: Vec<String>,
    label: String,
}

impl ClassificationResult {
    pub(crate) fn new(
        scores: Vec<f32>,
        elapsed_ms: u64,
        top_indices: Vec<usize>,
        top_labels: Vec<String>,
        label: String,
    ) -> Self {
        Self {
            scores,
            elapsed_ms,
            top_indices,
            top_labels,
            label,
        }
    }

    /// モデルの生スコア
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// 推論時間（ミリ秒）
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// 上位クラスのインデックス（順位順）
    pub fn top_indices(&self) -> &[usize] {
        &self.top_indices
    }

    pub fn top_labels(&self) -> &[String] {
        &self.top_labels
    }

    /// 上位クラスのスコア（順位順）
    pub fn top_scores(&self) -> Vec<f32> {
        self.top_indices.iter().map(|&i| self.scores[i]).collect()
    }

    /// 表示用に連結したラベル
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 最上位のクラス
    pub fn best(&self) -> Option<(usize, &str, f32)> {
        let index = *self.top_indices.first()?;
        let label = self.top_labels.first()?;
        Some((index, label.as_str(), self.scores[index]))
    }
}

impl std::fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}ms)", self.label, self.elapsed_ms)
    }
}
