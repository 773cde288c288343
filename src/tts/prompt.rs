use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// Voice conditioning for one request.
///
/// Either a file already on the server, bytes uploaded with the request, or
/// nothing at all, in which case the model falls back to its bundled default
/// reference voice.
#[derive(Debug)]
pub enum AudioPrompt {
    Default,
    ServerPath(PathBuf),
    Uploaded(TempAudioFile),
}

impl AudioPrompt {
    /// Use a file that already exists on the server.
    pub fn from_server_path(path: &str) -> Result<Self, AppError> {
        let path = PathBuf::from(path);
        if !path.is_file() {
            return Err(AppError::AudioInput(format!(
                "audio_prompt_path not found: {}",
                path.display()
            )));
        }
        Ok(Self::ServerPath(path))
    }

    /// Persist uploaded bytes to a scoped temporary file.
    pub fn from_upload(bytes: &[u8], filename: Option<&str>) -> Result<Self, AppError> {
        Ok(Self::Uploaded(TempAudioFile::write(bytes, filename)?))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Default => None,
            Self::ServerPath(path) => Some(path),
            Self::Uploaded(temp) => Some(temp.path()),
        }
    }
}

/// Uploaded reference audio parked on disk for the duration of one request.
///
/// The file is deleted when this value drops, so every exit path from a
/// handler releases it.
#[derive(Debug)]
pub struct TempAudioFile {
    file: NamedTempFile,
}

impl TempAudioFile {
    pub fn write(bytes: &[u8], filename: Option<&str>) -> Result<Self, AppError> {
        if bytes.is_empty() {
            return Err(AppError::AudioInput("uploaded audio file is empty".into()));
        }

        let file = tempfile::Builder::new()
            .prefix("chatterbox_ref_")
            .suffix(&upload_suffix(filename))
            .tempfile()
            .map_err(AppError::Io)?;
        std::fs::write(file.path(), bytes)?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Keep the upload's extension so the decoder sees the same kind of file the
/// client sent.
fn upload_suffix(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".wav".to_string())
}
