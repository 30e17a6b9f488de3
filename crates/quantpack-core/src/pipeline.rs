//! Pipeline stage sequencing.
//!
//! Strictly linear: provision toolchain, validate its Python environment,
//! fetch the model, convert, place. Each stage is awaited to completion
//! and any error aborts the run; only the artifact move inside the
//! placement stage is tolerated.

use std::path::PathBuf;

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::hub::HubClient;
use crate::toolchain::Toolchain;
use crate::{convert, place, preflight};

/// One end-to-end run over a frozen configuration.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute the full pipeline and return the artifact's final path.
    pub async fn run(&self) -> Result<PathBuf> {
        let config = &self.config;
        info!(
            "quantpack: {} -> {} ({})",
            config.model_id,
            config.artifact_filename(),
            config.outtype
        );
        config.ensure_cache_root()?;

        let toolchain = Toolchain::new(&config.toolchain_dir);
        toolchain.ensure().await?;

        preflight::check_python_packages(&toolchain.interpreter()).await?;

        let hub = HubClient::new(config.hf_token.clone())?;
        hub.fetch_model(&config.model_id, &config.model_cache_path())
            .await?;

        let artifact = convert::run_converter(config, &toolchain).await?;
        info!("Conversion complete: {}", artifact.display());

        place::place_artifact(&artifact, config)
    }
}
