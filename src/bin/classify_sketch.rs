//! スケッチ画像の分類ツール

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quickdraw_lib::ml::load_engine;
use quickdraw_lib::model::{load_bundle_metadata, print_bundle_info, AppConfig, DeviceType};
use quickdraw_lib::{Bitmap, TraversalOrder};

#[derive(Parser)]
#[command(name = "classify_sketch", version, about = "Quick Draw スケッチ分類")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 28x28の画像を分類して上位のカテゴリを表示
    Classify {
        /// 入力画像（リサイズは行わない）
        image: PathBuf,
        /// 設定ファイル
        #[arg(long)]
        config: Option<PathBuf>,
        /// モデルバンドル（設定を上書き）
        #[arg(long)]
        model: Option<String>,
        /// ラベルJSON（設定を上書き）
        #[arg(long)]
        labels: Option<String>,
        /// 計算デバイス: cpu | wgpu
        #[arg(long, value_parser = parse_device)]
        device: Option<DeviceType>,
        /// ピクセル書き込み順序: row-major | column-major
        #[arg(long, value_parser = parse_traversal)]
        traversal: Option<TraversalOrder>,
        /// 上位件数
        #[arg(long)]
        top_k: Option<usize>,
        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// モデルバンドルのメタデータを表示
    Inspect {
        bundle: PathBuf,
    },
}

fn parse_device(s: &str) -> Result<DeviceType, String> {
    match s {
        "cpu" => Ok(DeviceType::Cpu),
        "wgpu" => Ok(DeviceType::Wgpu),
        _ => Err(format!("unknown device: {} (cpu | wgpu)", s)),
    }
}

fn parse_traversal(s: &str) -> Result<TraversalOrder, String> {
    match s {
        "row-major" => Ok(TraversalOrder::RowMajor),
        "column-major" => Ok(TraversalOrder::ColumnMajor),
        _ => Err(format!("unknown traversal: {} (row-major | column-major)", s)),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Classify {
            image,
            config,
            model,
            labels,
            device,
            traversal,
            top_k,
            json,
        } => {
            let mut app_config = AppConfig::load_or_default(config.unwrap_or_else(AppConfig::default_path));
            if let Some(model) = model {
                app_config.model.bundle_path = model;
            }
            if let Some(labels) = labels {
                app_config.labels_path = labels;
            }
            if let Some(device) = device {
                app_config.device_type = device;
            }
            if traversal.is_some() {
                app_config.encoder.traversal = traversal;
            }
            if let Some(top_k) = top_k {
                app_config.ranking.top_k = top_k;
            }
            app_config.display();

            let mut engine = load_engine(&app_config)?;
            let bitmap = Bitmap::open(&image)?;
            let result = engine.classify(&bitmap)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.label());
                for (rank, (label, score)) in result
                    .top_labels()
                    .iter()
                    .zip(result.top_scores())
                    .enumerate()
                {
                    println!("  {}. {} ({:.4})", rank + 1, label, score);
                }
                println!("推論時間: {}ms", result.elapsed_ms());
            }
        }
        Command::Inspect { bundle } => {
            let metadata = load_bundle_metadata(&bundle)?;
            print_bundle_info(&metadata);
            println!("{}", metadata.to_json_string()?);
        }
    }

    Ok(())
}
