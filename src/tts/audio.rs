use std::io::Cursor;
use std::path::Path;

use ebur128::{EbuR128, Mode};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{FftFixedIn, Resampler};

use crate::error::AppError;

/// Loudness target for `norm_loudness`, in LUFS.
pub const NORM_TARGET_LUFS: f64 = -27.0;

/// Largest gain the normalizer will apply, to keep near-silent takes from
/// blowing up into full-scale noise.
const MAX_NORM_GAIN: f32 = 10.0;

/// Encode f32 samples as 16-bit mono PCM WAV.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| AppError::Generation(format!("Failed to create WAV writer: {}", e)))?;

        for sample in samples {
            let scaled = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer
                .write_sample(scaled)
                .map_err(|e| AppError::Generation(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| AppError::Generation(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(buffer)
}

/// Decode a WAV file to mono f32, averaging channels.
pub fn load_wav_mono(path: &Path) -> Result<(Vec<f32>, u32), AppError> {
    let reader = WavReader::open(path).map_err(|e| {
        AppError::AudioInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let decoded: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        SampleFormat::Int => {
            // i64 so the 32-bit scale stays positive
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect()
        }
        SampleFormat::Float => reader.into_samples::<f32>().collect(),
    };
    let samples = decoded.map_err(|e| {
        AppError::AudioInput(format!("cannot decode {}: {}", path.display(), e))
    })?;

    if samples.is_empty() {
        return Err(AppError::AudioInput(format!(
            "{} contains no audio samples",
            path.display()
        )));
    }

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, sample_rate))
}

/// Resample mono audio with a fixed-input-size FFT resampler, zero-padding the
/// final chunk.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AppError> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let chunk_size = 1024;
    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1)
        .map_err(|e| AppError::Generation(format!("Failed to create resampler: {}", e)))?;

    let mut input = samples.to_vec();
    let remainder = input.len() % chunk_size;
    if remainder != 0 {
        input.extend(std::iter::repeat(0.0).take(chunk_size - remainder));
    }

    let mut output = Vec::new();
    for chunk in input.chunks(chunk_size) {
        let frames = vec![chunk.to_vec()];
        let mut resampled = resampler
            .process(&frames, None)
            .map_err(|e| AppError::Generation(format!("Resample error: {}", e)))?;
        output.append(&mut resampled[0]);
    }

    Ok(output)
}

/// Bring mono audio to the target integrated loudness.
///
/// Skipped when the measured loudness is not finite (silence or audio shorter
/// than the gating window).
pub fn normalize_loudness(
    samples: &mut [f32],
    sample_rate: u32,
    target_lufs: f64,
) -> Result<(), AppError> {
    if samples.is_empty() {
        return Ok(());
    }

    let mut meter = EbuR128::new(1, sample_rate, Mode::I)
        .map_err(|e| AppError::Generation(format!("Failed to create loudness meter: {}", e)))?;

    // 1s chunks
    for chunk in samples.chunks(sample_rate as usize) {
        meter
            .add_frames_f32(chunk)
            .map_err(|e| AppError::Generation(format!("Loudness measurement failed: {}", e)))?;
    }

    let global_loudness = meter
        .loudness_global()
        .map_err(|e| AppError::Generation(format!("Loudness measurement failed: {}", e)))?;
    if !global_loudness.is_finite() {
        return Ok(());
    }

    let gain = (10f32.powf(((target_lufs - global_loudness) / 20.0) as f32)).min(MAX_NORM_GAIN);
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, amplitude: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let count = (sample_rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_samples_to_wav_empty() {
        let wav = samples_to_wav(&[], 24000).unwrap();
        // Should produce valid WAV header even for empty audio
        assert!(wav.starts_with(b"RIFF"));
    }

    #[test]
    fn test_samples_to_wav_valid() {
        let samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&samples, 24000).unwrap();
        assert!(wav.starts_with(b"RIFF"));
        assert!(wav.len() > 44); // Header + some data
    }

    #[test]
    fn test_samples_to_wav_clamps_out_of_range() {
        let wav = samples_to_wav(&[4.0, -4.0], 24000).unwrap();
        let reader = WavReader::new(Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![32767, -32767]);
    }

    #[test]
    fn test_load_wav_mono_round_trip() {
        let samples = sine(440.0, 0.5, 24000, 0.1);
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), samples_to_wav(&samples, 24000).unwrap()).unwrap();

        let (loaded, rate) = load_wav_mono(file.path()).unwrap();
        assert_eq!(rate, 24000);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in loaded.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_load_wav_mono_downmixes_stereo() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-16384i16).unwrap();
        }
        writer.finalize().unwrap();

        let (mono, rate) = load_wav_mono(file.path()).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(mono.len(), 100);
        for sample in mono {
            assert!(sample.abs() < 0.001);
        }
    }

    #[test]
    fn test_load_wav_mono_32_bit_keeps_sign() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Int,
        };
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i32::MAX / 2).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, _) = load_wav_mono(file.path()).unwrap();
        assert_eq!(samples.len(), 100);
        for sample in samples {
            assert!((sample - 0.5).abs() < 0.001);
        }
    }

    #[test]
    fn test_load_wav_mono_rejects_garbage() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), b"not a wav file at all").unwrap();
        match load_wav_mono(file.path()).unwrap_err() {
            AppError::AudioInput(_) => {}
            other => panic!("expected audio input error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_wav_mono_rejects_headers_only() {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), samples_to_wav(&[], 24000).unwrap()).unwrap();
        match load_wav_mono(file.path()).unwrap_err() {
            AppError::AudioInput(msg) => assert!(msg.contains("no audio samples")),
            other => panic!("expected audio input error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_wav_mono_rejects_truncated_data() {
        let samples = sine(440.0, 0.5, 16000, 0.1);
        let wav = samples_to_wav(&samples, 16000).unwrap();
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        // Keep the header but cut the data chunk short
        std::fs::write(file.path(), &wav[..100]).unwrap();

        match load_wav_mono(file.path()).unwrap_err() {
            AppError::AudioInput(msg) => assert!(msg.contains("cannot decode")),
            other => panic!("expected audio input error, got {:?}", other),
        }
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = sine(440.0, 0.5, 16000, 0.05);
        let out = resample(&samples, 16000, 16000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_upsamples() {
        let samples = sine(440.0, 0.5, 16000, 1.0);
        let out = resample(&samples, 16000, 24000).unwrap();
        // Padded to a chunk multiple, so expect roughly 1.5x the input length
        let expected = samples.len() * 3 / 2;
        let drift = (out.len() as i64 - expected as i64).unsigned_abs() as usize;
        assert!(drift < expected / 5, "got {} samples, expected ~{}", out.len(), expected);
    }

    #[test]
    fn test_normalize_loudness_boosts_quiet_audio() {
        let mut samples = sine(440.0, 0.01, 24000, 2.0);
        let before = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
        normalize_loudness(&mut samples, 24000, NORM_TARGET_LUFS).unwrap();
        let after = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(after > before);
    }

    #[test]
    fn test_normalize_loudness_gain_is_capped() {
        // ~-58 LUFS needs ~34x to hit the target; the cap wins
        let mut samples = sine(440.0, 0.002, 24000, 2.0);
        let before = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
        normalize_loudness(&mut samples, 24000, NORM_TARGET_LUFS).unwrap();
        let after = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!((after / before - MAX_NORM_GAIN).abs() < 1e-3);
    }

    #[test]
    fn test_normalize_loudness_attenuates_loud_audio() {
        let mut samples = sine(440.0, 0.9, 24000, 2.0);
        let before = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
        normalize_loudness(&mut samples, 24000, NORM_TARGET_LUFS).unwrap();
        let after = samples.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(after < before);
    }

    #[test]
    fn test_normalize_loudness_skips_silence() {
        let mut samples = vec![0.0f32; 48000];
        normalize_loudness(&mut samples, 24000, NORM_TARGET_LUFS).unwrap();
        assert!(samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_normalize_loudness_empty_is_noop() {
        let mut samples: Vec<f32> = Vec::new();
        normalize_loudness(&mut samples, 24000, NORM_TARGET_LUFS).unwrap();
        assert!(samples.is_empty());
    }
}
