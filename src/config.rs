use std::path::PathBuf;

use clap::Parser;

/// Startup configuration for the server.
///
/// Every flag also reads its value from the environment so the server can be
/// configured either way in containers.
#[derive(Debug, Clone, Parser)]
#[command(name = "chatterbox-tts-server", about = "HTTP API for Chatterbox Turbo TTS", version)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Tokio worker threads for request handling
    #[arg(long, env = "WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Directory containing turbo.onnx, turbo.onnx.json and the default reference voice
    #[arg(long, env = "MODEL_DIR", default_value = "./model")]
    pub model_dir: PathBuf,

    /// Load the model at startup instead of on the first request
    #[arg(long, env = "PRELOAD")]
    pub preload: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::parse_from(["chatterbox-tts-server"]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.workers, 1);
        assert_eq!(config.model_dir, PathBuf::from("./model"));
        assert!(!config.preload);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "chatterbox-tts-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--workers",
            "4",
            "--preload",
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.workers, 4);
        assert!(config.preload);
    }
}
