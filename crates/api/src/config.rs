use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use demandlens_infra::{ConfigError, PipelineConfig};

pub const ENV_BIND_ADDR: &str = "DEMANDLENS_BIND_ADDR";
pub const ENV_OUTPUT_DIR: &str = "DEMANDLENS_OUTPUT_DIR";
pub const ENV_RUN_TIMEOUT_SECS: &str = "DEMANDLENS_RUN_TIMEOUT_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "DEMANDLENS_MAX_UPLOAD_BYTES";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_OUTPUT_DIR: &str = "ml_outputs";
const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Server settings plus the pipeline configuration every run uses.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub output_dir: PathBuf,
    pub run_timeout: Duration,
    pub max_upload_bytes: usize,
    pub pipeline: PipelineConfig,
}

impl ApiConfig {
    /// Defaults with the given output directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            output_dir: output_dir.into(),
            run_timeout: DEFAULT_RUN_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pipeline: PipelineConfig::default(),
        }
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Server settings fall back to defaults (with a warning) when malformed;
    /// a malformed pipeline setting is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pipeline = PipelineConfig::from_env()?;

        let bind_addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let output_dir = std::env::var(ENV_OUTPUT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let run_timeout = Duration::from_secs(env_or(ENV_RUN_TIMEOUT_SECS, DEFAULT_RUN_TIMEOUT.as_secs()));
        let max_upload_bytes = env_or(ENV_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            bind_addr,
            output_dir,
            run_timeout,
            max_upload_bytes,
            pipeline,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    raw.trim().parse::<T>().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "malformed setting; using default");
        default
    })
}
