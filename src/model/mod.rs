pub mod model_metadata;
pub mod model_storage;
pub mod labels;
pub mod config;

pub use model_metadata::{ModelMetadata, DEFAULT_MODEL_NAME};
pub use model_storage::{save_bundle, load_bundle_metadata, load_bundle_weights, load_bundle, print_bundle_info};
pub use labels::LabelTable;
pub use config::{AppConfig, DeviceType, ModelSettings, RankingSettings, EncoderSettings};
