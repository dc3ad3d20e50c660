//! モデルバンドルの保存・読み込み
//!
//! モデルの重みとメタデータを1つのtar.gzにまとめます。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json   - メタデータ（入力形状、クラス数、前処理順序）
//! - model.bin       - モデルの重み（burn BinBytesRecorder形式）

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

use crate::model::model_metadata::ModelMetadata;

const METADATA_ENTRY: &str = "metadata.json";
const WEIGHTS_ENTRY: &str = "model.bin";

/// バンドルを保存し、実際に書き込んだパスを返す
///
/// 拡張子が `.gz` でなければ `.tar.gz` を付ける。
pub fn save_bundle(output_path: &Path, metadata: &ModelMetadata, weights: &[u8]) -> Result<PathBuf> {
    let bundle_path = if output_path.extension().and_then(|s| s.to_str()) == Some("gz") {
        output_path.to_path_buf()
    } else {
        output_path.with_extension("tar.gz")
    };

    if let Some(parent) = bundle_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
    }

    let file = File::create(&bundle_path)
        .with_context(|| format!("Failed to create bundle file: {:?}", bundle_path))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

    let json = metadata.to_json_string()?;
    append_entry(&mut builder, METADATA_ENTRY, json.as_bytes())?;
    append_entry(&mut builder, WEIGHTS_ENTRY, weights)?;

    builder
        .into_inner()
        .context("Failed to finalize bundle archive")?
        .finish()
        .context("Failed to flush bundle archive")?;

    log::info!("モデルバンドルを保存しました: {}", bundle_path.display());
    Ok(bundle_path)
}

fn append_entry<W: std::io::Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, data)
        .with_context(|| format!("Failed to add {} to bundle", name))
}

/// 指定したエントリを読み出す
///
/// `wanted` に含まれるエントリのみ返す。
fn read_entries(bundle_path: &Path, wanted: &[&str]) -> Result<Vec<(String, Vec<u8>)>> {
    let file = File::open(bundle_path)
        .with_context(|| format!("Failed to open bundle file: {:?}", bundle_path))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut found = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = match entry.path()?.to_str() {
            Some(name) if wanted.contains(&name) => name.to_string(),
            _ => continue,
        };

        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer)?;
        found.push((name, buffer));

        if found.len() == wanted.len() {
            break;
        }
    }

    Ok(found)
}

fn take_entry(entries: &mut Vec<(String, Vec<u8>)>, name: &str) -> Result<Vec<u8>> {
    let pos = entries
        .iter()
        .position(|(n, _)| n == name)
        .ok_or_else(|| anyhow::anyhow!("{} not found in bundle archive", name))?;
    Ok(entries.swap_remove(pos).1)
}

fn parse_metadata(bytes: Vec<u8>) -> Result<ModelMetadata> {
    let json = String::from_utf8(bytes).context("metadata.json is not valid UTF-8")?;
    ModelMetadata::from_json_string(&json)
}

/// バンドルからメタデータを読み込む
pub fn load_bundle_metadata(bundle_path: &Path) -> Result<ModelMetadata> {
    let mut entries = read_entries(bundle_path, &[METADATA_ENTRY])?;
    parse_metadata(take_entry(&mut entries, METADATA_ENTRY)?)
}

/// バンドルからモデルの重みを読み込む
pub fn load_bundle_weights(bundle_path: &Path) -> Result<Vec<u8>> {
    let mut entries = read_entries(bundle_path, &[WEIGHTS_ENTRY])?;
    take_entry(&mut entries, WEIGHTS_ENTRY)
}

/// メタデータと重みを共に読み込む
pub fn load_bundle(bundle_path: &Path) -> Result<(ModelMetadata, Vec<u8>)> {
    let mut entries = read_entries(bundle_path, &[METADATA_ENTRY, WEIGHTS_ENTRY])?;
    let metadata = parse_metadata(take_entry(&mut entries, METADATA_ENTRY)?)?;
    let weights = take_entry(&mut entries, WEIGHTS_ENTRY)?;
    Ok((metadata, weights))
}

/// メタデータをログに出力
pub fn print_bundle_info(metadata: &ModelMetadata) {
    log::info!("=== モデルメタデータ ===");
    log::info!("モデル名: {}", metadata.model_name);
    log::info!(
        "入力形状: {}x{}x{}",
        metadata.input_height,
        metadata.input_width,
        metadata.num_channels
    );
    log::info!("クラス数: {}", metadata.num_classes);
    log::info!("書き込み順序: {}", metadata.traversal);
    log::info!("書き出し日時: {}", metadata.exported_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("quickdraw_storage_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_save_and_load_bundle() {
        let metadata = ModelMetadata::default();
        let weights = vec![1u8, 2, 3, 4, 5];

        let path = save_bundle(&temp_path("roundtrip"), &metadata, &weights).unwrap();
        assert!(path.to_string_lossy().ends_with("roundtrip.tar.gz"));

        let (loaded_metadata, loaded_weights) = load_bundle(&path).unwrap();
        assert_eq!(loaded_metadata, metadata);
        assert_eq!(loaded_weights, weights);

        assert_eq!(load_bundle_metadata(&path).unwrap(), metadata);
        assert_eq!(load_bundle_weights(&path).unwrap(), weights);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_keeps_gz_extension() {
        let path = save_bundle(&temp_path("keep.tar.gz"), &ModelMetadata::default(), &[]).unwrap();
        assert_eq!(path, temp_path("keep.tar.gz"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_weights_entry() {
        let path = temp_path("metadata_only.tar.gz");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let file = File::create(&path).unwrap();
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
        let json = ModelMetadata::default().to_json_string().unwrap();
        append_entry(&mut builder, METADATA_ENTRY, json.as_bytes()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        assert!(load_bundle_metadata(&path).is_ok());
        let err = load_bundle(&path).unwrap_err();
        assert!(err.to_string().contains("model.bin not found"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        assert!(load_bundle(&temp_path("does_not_exist.tar.gz")).is_err());
    }
}
