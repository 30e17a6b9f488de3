//! Artifact placement and cache cleanup.
//!
//! The one stage whose primary failure is tolerated: a failed move leaves
//! the artifact where the converter wrote it and the run still succeeds.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{QuantpackError, Result};

/// Move the converted artifact into `{dest_dir}/{model_name}/` and apply
/// cache cleanup when enabled.
///
/// Returns the artifact's final path — the destination on a successful
/// move, the original staging path when the move failed and was tolerated.
/// A missing artifact is fatal: the converter claimed success but produced
/// nothing.
pub fn place_artifact(artifact: &Path, config: &PipelineConfig) -> Result<PathBuf> {
    if !artifact.exists() {
        return Err(QuantpackError::ArtifactMissing(artifact.to_path_buf()));
    }

    let placement_dir = config.placement_dir();
    let target = placement_dir.join(artifact.file_name().unwrap_or_default());

    info!(
        "Moving {} to {}...",
        artifact.display(),
        placement_dir.display()
    );
    let placed = match move_into(artifact, &placement_dir, &target) {
        Ok(()) => {
            info!("Artifact placed at {}", target.display());
            true
        }
        Err(e) => {
            warn!(
                "Could not move artifact into {}: {e}. The file is still available at {}",
                placement_dir.display(),
                artifact.display()
            );
            false
        }
    };

    if config.cleanup {
        let cache = config.model_cache_path();
        if cache.exists() {
            info!("Cleaning up model cache {}", cache.display());
            std::fs::remove_dir_all(&cache)
                .map_err(|e| QuantpackError::io("removing model cache", &cache, e))?;
        }
    }

    Ok(if placed {
        target
    } else {
        artifact.to_path_buf()
    })
}

/// Rename with a copy+delete fallback for cross-device destinations.
fn move_into(artifact: &Path, placement_dir: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(placement_dir)?;
    if std::fs::rename(artifact, target).is_ok() {
        return Ok(());
    }
    std::fs::copy(artifact, target)?;
    std::fs::remove_file(artifact)?;
    Ok(())
}
