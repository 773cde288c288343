use std::ops::RangeInclusive;

use crate::error::AppError;

pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_TOP_K: u32 = 1000;
pub const DEFAULT_REPETITION_PENALTY: f32 = 1.2;
pub const DEFAULT_MIN_P: f32 = 0.0;
pub const DEFAULT_NORM_LOUDNESS: bool = true;

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.05..=2.0;
pub const TOP_P_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const TOP_K_RANGE: RangeInclusive<u32> = 0..=1000;
pub const REPETITION_PENALTY_RANGE: RangeInclusive<f32> = 1.0..=2.0;
pub const MIN_P_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Sampling parameters handed to the model, one field per recognized option.
///
/// `min_p` is forwarded even though the Turbo graph ignores it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub min_p: f32,
    pub norm_loudness: bool,
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            repetition_penalty: DEFAULT_REPETITION_PENALTY,
            min_p: DEFAULT_MIN_P,
            norm_loudness: DEFAULT_NORM_LOUDNESS,
            seed: None,
        }
    }
}

impl GenerationParams {
    /// Check every field against its documented range and normalize the seed.
    ///
    /// A seed of 0 means "unseeded", same as leaving it out.
    pub fn validated(mut self) -> Result<Self, AppError> {
        check_f32("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_f32("top_p", self.top_p, TOP_P_RANGE)?;
        check_u32("top_k", self.top_k, TOP_K_RANGE)?;
        check_f32(
            "repetition_penalty",
            self.repetition_penalty,
            REPETITION_PENALTY_RANGE,
        )?;
        check_f32("min_p", self.min_p, MIN_P_RANGE)?;

        if self.seed == Some(0) {
            self.seed = None;
        }

        Ok(self)
    }
}

fn check_f32(field: &'static str, value: f32, range: RangeInclusive<f32>) -> Result<(), AppError> {
    if !value.is_finite() || !range.contains(&value) {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field,
            range.start(),
            range.end(),
            value
        )));
    }
    Ok(())
}

fn check_u32(field: &'static str, value: u32, range: RangeInclusive<u32>) -> Result<(), AppError> {
    if !range.contains(&value) {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field,
            range.start(),
            range.end(),
            value
        )));
    }
    Ok(())
}
