use axum::{
    extract::multipart::Field,
    extract::{Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::str::FromStr;
use std::sync::Arc;

use super::{HealthResponse, TagsResponse, TtsRequest, EVENT_TAGS};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::tts::{AudioPrompt, GeneratedAudio, GenerationParams};

const MAX_TEXT_CHARS: usize = 10000;

pub async fn tts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, AppError> {
    validate_text(&request.text)?;
    let params = request.params().validated()?;

    let prompt = match request.audio_prompt_path.as_deref() {
        Some(path) => AudioPrompt::from_server_path(path)?,
        None => AudioPrompt::Default,
    };

    let audio = state.tts.generate(request.text, prompt, params).await?;

    Ok(wav_response(audio))
}

pub async fn tts_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut text: Option<String> = None;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    let mut params = GenerationParams::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart request: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "text" => text = Some(field_text("text", field).await?),
            "audio_file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::AudioInput(format!("failed to read audio_file: {}", e))
                })?;
                upload = Some((filename, bytes.to_vec()));
            }
            "temperature" => {
                params.temperature =
                    parse_number("temperature", &field_text("temperature", field).await?)?
            }
            "top_p" => params.top_p = parse_number("top_p", &field_text("top_p", field).await?)?,
            "top_k" => params.top_k = parse_number("top_k", &field_text("top_k", field).await?)?,
            "repetition_penalty" => {
                params.repetition_penalty = parse_number(
                    "repetition_penalty",
                    &field_text("repetition_penalty", field).await?,
                )?
            }
            "min_p" => params.min_p = parse_number("min_p", &field_text("min_p", field).await?)?,
            "norm_loudness" => {
                params.norm_loudness =
                    parse_bool("norm_loudness", &field_text("norm_loudness", field).await?)?
            }
            "seed" => params.seed = Some(parse_number("seed", &field_text("seed", field).await?)?),
            _ => {}
        }
    }

    let text = text.unwrap_or_default();
    validate_text(&text)?;
    let params = params.validated()?;

    let prompt = match upload {
        Some((filename, bytes)) => AudioPrompt::from_upload(&bytes, filename.as_deref())?,
        None => AudioPrompt::Default,
    };

    let audio = state.tts.generate(text, prompt, params).await?;

    Ok(wav_response(audio))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.tts.model_loaded(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        tags: EVENT_TAGS.iter().map(|tag| tag.to_string()).collect(),
    })
}

fn validate_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".into()));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "text too long (max {} chars)",
            MAX_TEXT_CHARS
        )));
    }
    Ok(())
}

fn wav_response(audio: GeneratedAudio) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tts_output.wav\"".to_string(),
            ),
            (
                HeaderName::from_static("x-sample-rate"),
                audio.sample_rate.to_string(),
            ),
        ],
        audio.wav,
    )
        .into_response()
}

async fn field_text(name: &'static str, field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("failed to read {}: {}", name, e)))
}

fn parse_number<T: FromStr>(name: &'static str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse::<T>().map_err(|_| {
        AppError::Validation(format!("{} must be a number, got '{}'", name, raw.trim()))
    })
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}
