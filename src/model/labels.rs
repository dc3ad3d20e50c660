//! クラスインデックスとラベル名の対応表
//!
//! ラベルJSONはキーが数値文字列のオブジェクト:
//! `{"0": "aircraft carrier", "1": "airplane", ...}`

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ClassifyError, ClassifyResult};

/// ラベル表
///
/// 読み込み後は変更しない。スレッド間では `Arc` で共有する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: HashMap<usize, String>,
}

impl LabelTable {
    /// JSON文字列からラベル表を作成
    ///
    /// 不正なJSON、数値でないキー、文字列でない値はすべてエラー。
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> =
            serde_json::from_str(json).context("Failed to parse label table JSON")?;

        let mut labels = HashMap::with_capacity(raw.len());
        for (key, name) in raw {
            let index: usize = key
                .trim()
                .parse()
                .with_context(|| format!("ラベルのキーが数値ではありません: {:?}", key))?;
            labels.insert(index, name);
        }

        Ok(Self { labels })
    }

    /// ラベルJSONファイルを読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file: {:?}", path))?;
        let table = Self::from_json_str(&json)
            .with_context(|| format!("Failed to load label table: {:?}", path))?;

        log::info!("ラベル表を読み込みました: {} ({}件)", path.display(), table.len());
        Ok(table)
    }

    /// ラベル名の配列から作成（配列のインデックスがクラスID）
    pub fn from_names(names: Vec<String>) -> Self {
        Self {
            labels: names.into_iter().enumerate().collect(),
        }
    }

    /// クラスインデックスからラベル名を取得
    pub fn get(&self, index: usize) -> ClassifyResult<&str> {
        self.labels
            .get(&index)
            .map(String::as_str)
            .ok_or(ClassifyError::LabelNotFound { index })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `0..num_classes` のうちラベルが無いインデックス
    pub fn missing_indices(&self, num_classes: usize) -> Vec<usize> {
        (0..num_classes)
            .filter(|i| !self.labels.contains_key(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_json() {
        let table = LabelTable::from_json_str(r#"{"0":"cat","1":"dog","2":"fish"}"#).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1).unwrap(), "dog");
        assert_eq!(table.get(3), Err(ClassifyError::LabelNotFound { index: 3 }));
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(LabelTable::from_json_str("{not json").is_err());
        assert!(LabelTable::from_json_str(r#"{"0": 12}"#).is_err());
        assert!(LabelTable::from_json_str(r#"["cat", "dog"]"#).is_err());
    }

    #[test]
    fn test_non_numeric_key_fails() {
        let err = LabelTable::from_json_str(r#"{"0":"cat","one":"dog"}"#).unwrap_err();
        assert!(err.to_string().contains("one"));
    }

    #[test]
    fn test_from_names_and_missing() {
        let table = LabelTable::from_names(vec!["cat".into(), "dog".into()]);
        assert_eq!(table.get(0).unwrap(), "cat");
        assert_eq!(table.missing_indices(4), vec![2, 3]);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("quickdraw_labels_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"0":"apple","1":"banana"}"#).unwrap();

        let table = LabelTable::load(&path).unwrap();
        assert_eq!(table.get(1).unwrap(), "banana");

        std::fs::remove_file(&path).ok();
        assert!(LabelTable::load(&path).is_err());
    }
}
