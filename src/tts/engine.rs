use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use regex::Regex;

use crate::error::AppError;
use crate::tts::audio;
use crate::tts::manifest::ModelManifest;
use crate::tts::params::GenerationParams;

lazy_static! {
    static ref TAG_REGEX: Regex = Regex::new(r"\[[a-z][a-z ]*\]").unwrap();
}

/// Raw model output: mono f32 samples at the model's native rate.
pub struct Synthesis {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Boundary to the TTS model proper.
///
/// The model is owned elsewhere and is not safe for concurrent inference, so
/// the method takes `&mut self`; the service serializes access.
pub trait TtsModel: Send {
    fn generate(
        &mut self,
        text: &str,
        reference: Option<&Path>,
        params: &GenerationParams,
    ) -> Result<Synthesis, AppError>;
}

/// Chatterbox Turbo exported as a single ONNX graph.
pub struct TurboEngine {
    session: Session,
    manifest: ModelManifest,
    default_reference: Vec<f32>,
}

impl TurboEngine {
    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        let (manifest, model_path) = ModelManifest::load(model_dir)?;

        // Load the ONNX model using ort (official ONNX Runtime)
        let session = Session::builder()
            .map_err(|e| AppError::Generation(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::Generation(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| AppError::Generation(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| AppError::Generation(format!("Failed to load model: {}", e)))?;

        let reference_path = manifest.default_reference_path(model_dir);
        let default_reference =
            load_reference(&reference_path, manifest.audio.reference_sample_rate)
                .map_err(|e| AppError::Generation(format!("default reference voice: {}", e)))?;

        Ok(Self {
            session,
            manifest,
            default_reference,
        })
    }

    fn reference_samples(&self, reference: Option<&Path>) -> Result<Vec<f32>, AppError> {
        match reference {
            Some(path) => load_reference(path, self.manifest.audio.reference_sample_rate),
            None => Ok(self.default_reference.clone()),
        }
    }
}

impl TtsModel for TurboEngine {
    fn generate(
        &mut self,
        text: &str,
        reference: Option<&Path>,
        params: &GenerationParams,
    ) -> Result<Synthesis, AppError> {
        let token_ids = encode_text(text, &self.manifest.token_id_map);
        let reference_samples = self.reference_samples(reference)?;

        let token_count = token_ids.len();
        let reference_count = reference_samples.len();

        // tokens: [batch, sequence] = [1, token_count]
        let tokens_value = Value::from_array((vec![1, token_count], token_ids))
            .map_err(|e| AppError::Generation(format!("Failed to create token tensor: {}", e)))?;

        // reference: [batch, samples] = [1, reference_count]
        let reference_value = Value::from_array((vec![1, reference_count], reference_samples))
            .map_err(|e| {
                AppError::Generation(format!("Failed to create reference tensor: {}", e))
            })?;

        // sampling: [5] = [temperature, top_p, top_k, repetition_penalty, min_p]
        let sampling_value = Value::from_array((
            vec![5],
            vec![
                params.temperature,
                params.top_p,
                params.top_k as f32,
                params.repetition_penalty,
                params.min_p,
            ],
        ))
        .map_err(|e| AppError::Generation(format!("Failed to create sampling tensor: {}", e)))?;

        // seed: [1]; the graph always takes one, so unseeded requests draw
        // from process entropy
        let seed = params.seed.unwrap_or_else(entropy_seed);
        let seed_value = Value::from_array((vec![1], vec![seed as i64]))
            .map_err(|e| AppError::Generation(format!("Failed to create seed tensor: {}", e)))?;

        // Run inference
        let outputs = self
            .session
            .run(ort::inputs![
                tokens_value,
                reference_value,
                sampling_value,
                seed_value
            ])
            .map_err(|e| AppError::Generation(format!("Inference failed: {}", e)))?;

        // Extract audio samples from output
        let output = outputs
            .get("audio")
            .or_else(|| outputs.get("output"))
            .ok_or_else(|| AppError::Generation("Missing audio output tensor".to_string()))?;

        let output_view = output.try_extract_tensor::<f32>().map_err(|e| {
            AppError::Generation(format!("Failed to extract output tensor: {}", e))
        })?;

        let mut samples: Vec<f32> = output_view.1.iter().copied().collect();
        if samples.is_empty() {
            return Err(AppError::Generation("Model produced no audio".to_string()));
        }

        if params.norm_loudness {
            audio::normalize_loudness(
                &mut samples,
                self.manifest.audio.sample_rate,
                audio::NORM_TARGET_LUFS,
            )?;
        }

        Ok(Synthesis {
            samples,
            sample_rate: self.manifest.audio.sample_rate,
        })
    }
}

/// Decode a reference WAV and bring it to the conditioning rate.
fn load_reference(path: &Path, target_rate: u32) -> Result<Vec<f32>, AppError> {
    let (samples, rate) = audio::load_wav_mono(path)?;
    audio::resample(&samples, rate, target_rate)
}

/// Convert text to token ids using the manifest's map.
///
/// Bracketed paralinguistic tags known to the map encode as their own id
/// sequence; everything else goes character by character, skipping characters
/// the map does not know. `^`/`$` sentinels frame the sequence.
pub fn encode_text(text: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    let mut ids = Vec::new();

    if let Some(bos) = id_map.get("^") {
        ids.extend(bos);
    } else {
        ids.push(0);
    }

    let mut last_end = 0;
    for m in TAG_REGEX.find_iter(text) {
        // Bracketed words the model was not trained on read as literal text
        if let Some(tag_ids) = id_map.get(m.as_str()) {
            encode_chars(&text[last_end..m.start()], id_map, &mut ids);
            ids.extend(tag_ids);
            last_end = m.end();
        }
    }
    encode_chars(&text[last_end..], id_map, &mut ids);

    if let Some(eos) = id_map.get("$") {
        ids.extend(eos);
    } else {
        ids.push(0);
    }

    ids
}

fn encode_chars(segment: &str, id_map: &HashMap<String, Vec<i64>>, ids: &mut Vec<i64>) {
    for ch in segment.chars() {
        let ch_str = ch.to_string();
        if let Some(mapped) = id_map.get(&ch_str) {
            ids.extend(mapped);
        }
    }
}

fn entropy_seed() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_nanos() as u64 ^ u64::from(std::process::id())
}
