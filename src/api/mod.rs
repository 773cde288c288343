pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::tts::params::{
    GenerationParams, DEFAULT_MIN_P, DEFAULT_NORM_LOUDNESS, DEFAULT_REPETITION_PENALTY,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P,
};

/// Paralinguistic tags the model can vocalize, as they appear in text.
pub const EVENT_TAGS: [&str; 9] = [
    "[clear throat]",
    "[sigh]",
    "[shush]",
    "[cough]",
    "[groan]",
    "[sniff]",
    "[gasp]",
    "[chuckle]",
    "[laugh]",
];

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default = "default_min_p")]
    pub min_p: f32,
    #[serde(default = "default_norm_loudness")]
    pub norm_loudness: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub audio_prompt_path: Option<String>,
}

impl TtsRequest {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            repetition_penalty: self.repetition_penalty,
            min_p: self.min_p,
            norm_loudness: self.norm_loudness,
            seed: self.seed,
        }
    }
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

fn default_repetition_penalty() -> f32 {
    DEFAULT_REPETITION_PENALTY
}

fn default_min_p() -> f32 {
    DEFAULT_MIN_P
}

fn default_norm_loudness() -> bool {
    DEFAULT_NORM_LOUDNESS
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}
