//! quantpack CLI - download a Hugging Face causal LM and convert it to a
//! single-file quantized GGUF artifact.
//!
//! Every flag is optional: unset flags fall back to the corresponding
//! `QUANTPACK_*` environment key, then to the hardcoded default.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use quantpack_core::{Pipeline, PipelineConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "quantpack")]
#[command(about = "Download a Hugging Face model and convert it to GGUF")]
struct Args {
    /// Hub model identifier (namespace/name)
    #[arg(short, long)]
    model: Option<String>,

    /// Quantization output type (f16, q8_0, q4_0, q4_k_m, ...)
    #[arg(short, long)]
    outtype: Option<String>,

    /// Memory ceiling in gigabytes
    #[arg(long)]
    memory_gb: Option<u64>,

    /// llama.cpp checkout directory
    #[arg(long)]
    toolchain_dir: Option<PathBuf>,

    /// Model download cache root
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Destination model directory root
    #[arg(long)]
    dest_dir: Option<PathBuf>,

    /// Delete the model cache after a successful conversion
    #[arg(long)]
    cleanup: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Environment-derived configuration with CLI overrides applied.
    fn into_config(self) -> quantpack_core::Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env()?;
        if let Some(model) = self.model {
            config.model_id = model;
        }
        if let Some(outtype) = self.outtype {
            config.outtype = outtype;
        }
        if let Some(memory_gb) = self.memory_gb {
            config.memory_limit_gb = memory_gb;
        }
        if let Some(dir) = self.toolchain_dir {
            config.toolchain_dir = dir;
        }
        if let Some(dir) = self.cache_dir {
            config.model_cache_dir = dir;
        }
        if let Some(dir) = self.dest_dir {
            config.dest_dir = dir;
        }
        if self.cleanup {
            config.cleanup = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    match Pipeline::new(config).run().await {
        Ok(artifact) => {
            info!("Done. GGUF model ready at {}", artifact.display());
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
