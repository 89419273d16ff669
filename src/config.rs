//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable; `.env` is loaded first by
//! the binary.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::vision::{ModelSettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::DEFAULT_MAX_BODY_BYTES;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY must be set")]
    MissingModelKey,

    #[error("BLOB_READ_WRITE_TOKEN must be set when using the blob storage backend")]
    MissingBlobToken,

    #[error("Model temperature must be between 0 and 2, got {0}")]
    InvalidTemperature(f32),
}

#[derive(Debug, Parser)]
#[command(name = "plant-health")]
#[command(about = "Identify plants and assess their health from a photo or video")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeArgs),
    /// Upload a file to a running server and print the result
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// Hosted blob store over HTTP
    Blob,
    /// Local directory served under /uploads
    Local,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Credential for the text-generation model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, env = "MODEL_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    #[arg(long, env = "MODEL_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Send the image itself to the model alongside the prompt
    #[arg(long, env = "MODEL_ATTACH_IMAGE", default_value_t = true, action = ArgAction::Set)]
    pub attach_image: bool,

    /// Timeout for calls to the model and the blob store
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value_t = StorageBackend::Blob)]
    pub storage: StorageBackend,

    #[arg(long, env = "BLOB_READ_WRITE_TOKEN", hide_env_values = true)]
    pub blob_token: Option<String>,

    #[arg(long, env = "BLOB_API_URL", default_value = "https://blob.vercel-storage.com")]
    pub blob_api_url: String,

    /// Directory used by the local storage backend
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Externally visible base URL, used to build local upload URLs
    #[arg(long, env = "PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl ServeArgs {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingModelKey);
        }
        if self.storage == StorageBackend::Blob
            && self.blob_token.as_deref().map_or(true, |t| t.trim().is_empty())
        {
            return Err(ConfigError::MissingBlobToken);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            attach_image: self.attach_image,
        }
    }

    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Plant photo or video to analyze
    pub file: PathBuf,

    /// Base URL of a running plant-health server
    #[arg(long, env = "PLANT_HEALTH_URL", default_value = "http://localhost:3000")]
    pub server: String,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,
}
