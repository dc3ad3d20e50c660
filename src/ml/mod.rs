pub mod encoder;
pub mod ranking;
pub mod score_model;
pub mod inference;
#[cfg(feature = "ml")]
pub mod ml_model;

pub use encoder::{convert_pixel, TensorEncoder};
pub use ranking::{top_k, DEFAULT_LABEL_DELIMITER, DEFAULT_TOP_K};
pub use score_model::ScoreModel;
pub use inference::InferenceEngine;

#[cfg(feature = "ml")]
pub use ml_model::{SketchNet, SketchNetConfig};
#[cfg(feature = "ml")]
pub use score_model::{load_model, BurnSketchModel};
#[cfg(feature = "ml")]
pub use inference::load_engine;
