//! quantpack core - headless library for turning Hugging Face causal LMs
//! into single-file quantized GGUF artifacts.
//!
//! The pipeline downloads a checkpoint from the Hub, drives the llama.cpp
//! conversion toolchain against it, and places the resulting `.gguf` file
//! into an inference app's model directory. All tensor-level work happens
//! in the external toolchain; this crate owns configuration, provisioning,
//! subprocess sequencing, and file management.
//!
//! # Example
//!
//! ```rust,ignore
//! use quantpack_core::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> quantpack_core::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let artifact = Pipeline::new(config).run().await?;
//!     println!("GGUF artifact at {}", artifact.display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod hub;
pub mod pipeline;
pub mod place;
pub mod preflight;
pub mod toolchain;

// Re-export commonly used types
pub use config::{Defaults, EnvKeys, PipelineConfig};
pub use convert::{locate_entry_point, ConverterContract, CONVERTER_CONTRACTS};
pub use error::{QuantpackError, Result};
pub use hub::{FetchMarker, HubClient};
pub use pipeline::Pipeline;
pub use toolchain::Toolchain;
