pub mod audio;
pub mod engine;
pub mod manifest;
pub mod params;
pub mod prompt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::error::AppError;

pub use engine::{Synthesis, TtsModel, TurboEngine};
pub use params::GenerationParams;
pub use prompt::AudioPrompt;

type ModelLoader = dyn Fn() -> Result<Box<dyn TtsModel>, AppError> + Send + Sync;

/// WAV bytes ready to stream back, plus the rate they were rendered at.
#[derive(Debug)]
pub struct GeneratedAudio {
    pub wav: Vec<u8>,
    pub sample_rate: u32,
}

/// Facade over the shared model instance.
///
/// The model loads at most once, inside the same mutex that serializes
/// inference, so concurrent requests queue rather than racing the load or
/// interleaving model calls.
pub struct TtsService {
    model: Arc<Mutex<Option<Box<dyn TtsModel>>>>,
    loader: Arc<ModelLoader>,
    loaded: Arc<AtomicBool>,
}

impl TtsService {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn TtsModel>, AppError> + Send + Sync + 'static,
    {
        Self {
            model: Arc::new(Mutex::new(None)),
            loader: Arc::new(loader),
            loaded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the model has been loaded yet (reported by /api/health).
    pub fn model_loaded(&self) -> bool {
        self.loaded.load(Ordering::Relaxed)
    }

    /// Load the model now instead of on the first request.
    pub async fn preload(&self) -> Result<(), AppError> {
        let model = Arc::clone(&self.model);
        let loader = Arc::clone(&self.loader);
        let loaded = Arc::clone(&self.loaded);

        tokio::task::spawn_blocking(move || {
            let mut guard = model.blocking_lock();
            if guard.is_none() {
                *guard = Some(loader()?);
                loaded.store(true, Ordering::Relaxed);
            }
            Ok(())
        })
        .await
        .map_err(|e| AppError::Generation(format!("Model load task failed: {}", e)))?
    }

    /// Run one generation to completion and encode the result as WAV.
    ///
    /// The prompt moves into the blocking task so an uploaded temp file lives
    /// exactly as long as the model needs it, whatever the outcome.
    pub async fn generate(
        &self,
        text: String,
        prompt: AudioPrompt,
        params: GenerationParams,
    ) -> Result<GeneratedAudio, AppError> {
        let model = Arc::clone(&self.model);
        let loader = Arc::clone(&self.loader);
        let loaded = Arc::clone(&self.loaded);
        let started = Instant::now();

        let audio = tokio::task::spawn_blocking(move || {
            let mut guard = model.blocking_lock();
            let synthesis = match guard.as_mut() {
                Some(engine) => engine.generate(&text, prompt.path(), &params),
                None => {
                    tracing::info!("Loading TTS model");
                    let mut fresh = loader()?;
                    loaded.store(true, Ordering::Relaxed);
                    // Keep the model cached even if this first generation fails
                    let synthesis = fresh.generate(&text, prompt.path(), &params);
                    *guard = Some(fresh);
                    synthesis
                }
            }?;
            let wav = audio::samples_to_wav(&synthesis.samples, synthesis.sample_rate)?;

            Ok::<_, AppError>(GeneratedAudio {
                wav,
                sample_rate: synthesis.sample_rate,
            })
        })
        .await
        .map_err(|e| AppError::Generation(format!("Generation task failed: {}", e)))??;

        tracing::info!(
            "Generated {:.2}s of audio in {:.2}s",
            audio.wav.len() as f32 / 2.0 / audio.sample_rate as f32,
            started.elapsed().as_secs_f32()
        );

        Ok(audio)
    }
}
