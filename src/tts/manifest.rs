use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const MODEL_FILE: &str = "turbo.onnx";
pub const MANIFEST_FILE: &str = "turbo.onnx.json";

/// Sidecar description of an exported Turbo model, loaded from
/// `turbo.onnx.json` in the model directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    pub audio: AudioConfig,
    /// Token ids for text encoding. Keys are single characters, bracketed
    /// paralinguistic tags, and the `^`/`$` sentinels.
    #[serde(default)]
    pub token_id_map: HashMap<String, Vec<i64>>,
    /// WAV file in the model directory used when a request carries no
    /// reference audio.
    pub default_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Native output rate of the vocoder.
    pub sample_rate: u32,
    /// Rate the conditioning encoder expects reference audio at.
    #[serde(default = "default_reference_sample_rate")]
    pub reference_sample_rate: u32,
}

fn default_reference_sample_rate() -> u32 {
    16_000
}

impl ModelManifest {
    /// Load the manifest and resolve the model path, checking both files
    /// exist before anything heavier runs.
    pub fn load(model_dir: &Path) -> Result<(Self, PathBuf), AppError> {
        let model_path = model_dir.join(MODEL_FILE);
        let manifest_path = model_dir.join(MANIFEST_FILE);

        if !model_path.exists() {
            return Err(AppError::Generation(format!(
                "model file not found: {} (set --model-dir)",
                model_path.display()
            )));
        }

        if !manifest_path.exists() {
            return Err(AppError::Generation(format!(
                "model manifest not found: {}",
                manifest_path.display()
            )));
        }

        let manifest: ModelManifest = serde_json::from_reader(File::open(&manifest_path)?)?;

        Ok((manifest, model_path))
    }

    pub fn default_reference_path(&self, model_dir: &Path) -> PathBuf {
        model_dir.join(&self.default_reference)
    }
}
