//! ビットマップからモデル入力テンソルへの変換

use crate::error::{ClassifyError, ClassifyResult};
use crate::types::{Bitmap, InputShape, TraversalOrder};

/// ピクセルを反転した輝度 [0, 1] に変換
///
/// 黒（インク）が 1.0、白（背景）が 0.0 になる。
pub fn convert_pixel(argb: u32) -> f32 {
    let r = ((argb >> 16) & 0xFF) as f32;
    let g = ((argb >> 8) & 0xFF) as f32;
    let b = (argb & 0xFF) as f32;

    let luma = r * 0.299 + g * 0.587 + b * 0.114;
    ((255.0 - luma) / 255.0).clamp(0.0, 1.0)
}

/// テンソルエンコーダ
///
/// 単一チャネル入力のみ対応。出力長は常に `height * width`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorEncoder {
    shape: InputShape,
    traversal: TraversalOrder,
}

impl TensorEncoder {
    pub fn new(shape: InputShape, traversal: TraversalOrder) -> ClassifyResult<Self> {
        if shape.channels != 1 {
            return Err(ClassifyError::UnsupportedChannels {
                channels: shape.channels,
            });
        }
        Ok(Self { shape, traversal })
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    pub fn traversal(&self) -> TraversalOrder {
        self.traversal
    }

    /// 新しいバッファにエンコード
    pub fn encode(&self, bitmap: &Bitmap) -> ClassifyResult<Vec<f32>> {
        let mut buffer = Vec::with_capacity(self.shape.len());
        self.encode_into(bitmap, &mut buffer)?;
        Ok(buffer)
    }

    /// 既存のバッファを再利用してエンコード
    ///
    /// バッファはクリアされてから全要素が書き込まれる。
    /// 呼び出し中は呼び出し元がバッファを排他的に保持していること。
    /// 形状エラーの場合、バッファには何も書き込まれない。
    pub fn encode_into(&self, bitmap: &Bitmap, buffer: &mut Vec<f32>) -> ClassifyResult<()> {
        self.check_shape(bitmap)?;

        let width = self.shape.width;
        let height = self.shape.height;
        let pixels = bitmap.pixels();

        buffer.clear();
        buffer.reserve(self.shape.len());

        match self.traversal {
            TraversalOrder::RowMajor => {
                buffer.extend(pixels.iter().map(|&p| convert_pixel(p)));
            }
            TraversalOrder::ColumnMajor => {
                for x in 0..width {
                    for y in 0..height {
                        buffer.push(convert_pixel(pixels[y * width + x]));
                    }
                }
            }
        }

        Ok(())
    }

    fn check_shape(&self, bitmap: &Bitmap) -> ClassifyResult<()> {
        let expected = self.shape.width * self.shape.height;
        if bitmap.width() != self.shape.width
            || bitmap.height() != self.shape.height
            || bitmap.pixels().len() != expected
        {
            return Err(ClassifyError::InvalidInputShape {
                expected_width: self.shape.width,
                expected_height: self.shape.height,
                width: bitmap.width(),
                height: bitmap.height(),
                pixels: bitmap.pixels().len(),
            });
        }
        Ok(())
    }
}

impl Default for TensorEncoder {
    fn default() -> Self {
        Self {
            shape: InputShape::default(),
            traversal: TraversalOrder::default(),
        }
    }
}
