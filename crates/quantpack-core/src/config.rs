//! Pipeline configuration.
//!
//! All settings are read from the environment exactly once at startup into
//! a [`PipelineConfig`] value object, which is passed read-only to each
//! pipeline stage. The CLI may override individual fields before the
//! pipeline starts; nothing mutates the configuration afterwards.

use std::path::PathBuf;

use crate::error::{QuantpackError, Result};

/// Environment keys recognized by the configuration loader.
pub struct EnvKeys;

impl EnvKeys {
    pub const MODEL: &'static str = "QUANTPACK_MODEL";
    pub const OUTTYPE: &'static str = "QUANTPACK_OUTTYPE";
    pub const MEMORY_GB: &'static str = "QUANTPACK_MEMORY_GB";
    pub const TOOLCHAIN_DIR: &'static str = "QUANTPACK_TOOLCHAIN_DIR";
    pub const CACHE_DIR: &'static str = "QUANTPACK_CACHE_DIR";
    pub const DEST_DIR: &'static str = "QUANTPACK_DEST_DIR";
    pub const CLEANUP: &'static str = "QUANTPACK_CLEANUP";
}

/// Hardcoded fallbacks for every recognized key.
pub struct Defaults;

impl Defaults {
    pub const MODEL: &'static str = "MACLAB-HFUT/PsycoLLM";
    pub const OUTTYPE: &'static str = "f16";
    pub const MEMORY_GB: u64 = 16;
    pub const TOOLCHAIN_DIR: &'static str = "llama.cpp";
    pub const CACHE_DIR: &'static str = "models";
    /// Destination root, relative to the user's home directory.
    pub const DEST_SUBDIR: &'static str = "LMStudio/models";
}

/// Read-only configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Hub identifier, `namespace/name`.
    pub model_id: String,
    /// Quantization output tag passed through to the converter
    /// (`f16`, `q8_0`, `q4_0`, `q4_k_m`, ...).
    pub outtype: String,
    /// Memory ceiling in gigabytes; drives the allocator split cap
    /// exported to the converter subprocess.
    pub memory_limit_gb: u64,
    /// llama.cpp checkout location.
    pub toolchain_dir: PathBuf,
    /// Root of per-model download caches.
    pub model_cache_dir: PathBuf,
    /// Inference app model directory root.
    pub dest_dir: PathBuf,
    /// Delete the per-model cache after placement.
    pub cleanup: bool,
    /// Hub bearer token for gated/private repositories.
    pub hf_token: Option<String>,
}

impl PipelineConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.hf_token = crate::hub::auth::resolve_token();
        Ok(config)
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Every key is optional; the memory ceiling must parse as an integer
    /// when present.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let memory_limit_gb = match lookup(EnvKeys::MEMORY_GB) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| QuantpackError::Config {
                message: format!("Invalid {} value: {raw:?}", EnvKeys::MEMORY_GB),
            })?,
            None => Defaults::MEMORY_GB,
        };

        let dest_dir = match lookup(EnvKeys::DEST_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(Defaults::DEST_SUBDIR),
        };

        Ok(Self {
            model_id: lookup(EnvKeys::MODEL).unwrap_or_else(|| Defaults::MODEL.to_string()),
            outtype: lookup(EnvKeys::OUTTYPE).unwrap_or_else(|| Defaults::OUTTYPE.to_string()),
            memory_limit_gb,
            toolchain_dir: lookup(EnvKeys::TOOLCHAIN_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(Defaults::TOOLCHAIN_DIR)),
            model_cache_dir: lookup(EnvKeys::CACHE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(Defaults::CACHE_DIR)),
            dest_dir,
            cleanup: lookup(EnvKeys::CLEANUP)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            hf_token: None,
        })
    }

    /// Last `/`-segment of the model identifier.
    pub fn model_name(&self) -> &str {
        self.model_id.rsplit('/').next().unwrap_or(&self.model_id)
    }

    /// Per-model cache directory: `{model_cache_dir}/{model_name}`.
    pub fn model_cache_path(&self) -> PathBuf {
        self.model_cache_dir.join(self.model_name())
    }

    /// Artifact filename: `{model_name}.{outtype}.gguf`.
    pub fn artifact_filename(&self) -> String {
        format!("{}.{}.gguf", self.model_name(), self.outtype)
    }

    /// Staging path for the converter output: the cache root, sibling of
    /// the per-model cache directory.
    pub fn artifact_path(&self) -> PathBuf {
        self.model_cache_dir.join(self.artifact_filename())
    }

    /// Final placement directory: `{dest_dir}/{model_name}`.
    pub fn placement_dir(&self) -> PathBuf {
        self.dest_dir.join(self.model_name())
    }

    /// `PYTORCH_CUDA_ALLOC_CONF` value derived from the memory ceiling.
    pub fn cuda_alloc_conf(&self) -> String {
        format!("max_split_size_mb:{}", self.memory_limit_gb * 64)
    }

    /// Create the model cache root if absent.
    pub fn ensure_cache_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.model_cache_dir)
            .map_err(|e| QuantpackError::io("creating model cache root", &self.model_cache_dir, e))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
