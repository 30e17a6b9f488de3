//! llama.cpp toolchain provisioning.
//!
//! Manages the conversion toolchain checkout: shallow git clone, cmake
//! build, and a Python venv carrying the converter's dependencies. An
//! existing toolchain directory is trusted as-is — provisioning is a
//! one-shot bootstrap, not an updater.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{QuantpackError, Result};
use crate::preflight;

/// Git repository URL for llama.cpp.
const LLAMA_CPP_REPO: &str = "https://github.com/ggml-org/llama.cpp.git";

/// Python packages the converter entry points import.
pub const CONVERTER_REQUIREMENTS: &[&str] = &[
    "torch",
    "transformers",
    "gguf",
    "sentencepiece",
    "numpy",
    "protobuf",
    "safetensors",
];

/// Handle to the conversion toolchain checkout.
pub struct Toolchain {
    dir: PathBuf,
}

impl Toolchain {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path to the toolchain checkout.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the checkout is already present on disk.
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Path to the cmake build directory.
    fn build_dir(&self) -> PathBuf {
        self.dir.join("build")
    }

    /// Path to the Python venv directory inside the checkout.
    fn venv_dir(&self) -> PathBuf {
        self.dir.join("venv")
    }

    /// Path to the Python binary inside the venv.
    pub fn venv_python(&self) -> PathBuf {
        self.venv_dir().join("bin").join("python")
    }

    /// Interpreter used to run the converter: the venv's python when
    /// present, else the system `python3`.
    pub fn interpreter(&self) -> PathBuf {
        let venv_python = self.venv_python();
        if venv_python.exists() {
            venv_python
        } else {
            PathBuf::from("python3")
        }
    }

    /// Ensure a usable toolchain exists at the configured directory.
    ///
    /// An existing directory is trusted without verification. A missing one
    /// triggers the full first-run bootstrap: clone, build, venv. Any
    /// subprocess failure is fatal; there is no retry.
    pub async fn ensure(&self) -> Result<()> {
        if self.exists() {
            debug!(
                "Toolchain directory {} already present, trusting as-is",
                self.dir.display()
            );
            return Ok(());
        }

        preflight::require_tool("git")?;
        preflight::require_tool("cmake")?;

        info!("Cloning llama.cpp into {}...", self.dir.display());
        self.git_clone().await?;

        info!("Building llama.cpp (cmake configure)...");
        self.cmake_configure().await?;
        info!("Building llama.cpp (compiling)...");
        self.cmake_build().await?;

        info!("Setting up Python environment for the converter...");
        self.setup_python_venv().await?;

        info!("llama.cpp toolchain ready");
        Ok(())
    }

    // -- Bootstrap steps ----------------------------------------------------

    async fn git_clone(&self) -> Result<()> {
        if let Some(parent) = self.dir.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| QuantpackError::io("creating toolchain parent dir", parent, e))?;
            }
        }

        let output = Command::new("git")
            .args(["clone", "--depth", "1", LLAMA_CPP_REPO])
            .arg(&self.dir)
            .output()
            .await
            .map_err(|e| QuantpackError::Toolchain {
                message: format!("Failed to run git clone: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QuantpackError::Toolchain {
                message: format!("git clone failed: {stderr}"),
            });
        }
        Ok(())
    }

    async fn cmake_configure(&self) -> Result<()> {
        let build = self.build_dir();
        std::fs::create_dir_all(&build)
            .map_err(|e| QuantpackError::io("creating toolchain build dir", &build, e))?;

        let output = Command::new("cmake")
            .arg(format!("-B{}", build.display()))
            .arg(format!("-S{}", self.dir.display()))
            .arg("-DCMAKE_BUILD_TYPE=Release")
            .output()
            .await
            .map_err(|e| QuantpackError::Toolchain {
                message: format!("Failed to run cmake configure: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QuantpackError::Toolchain {
                message: format!("cmake configure failed: {stderr}"),
            });
        }
        Ok(())
    }

    async fn cmake_build(&self) -> Result<()> {
        let nproc = std::thread::available_parallelism()
            .map(|n| n.get().to_string())
            .unwrap_or_else(|_| "4".to_string());

        let output = Command::new("cmake")
            .arg("--build")
            .arg(self.build_dir())
            .args(["--config", "Release", "-j", &nproc])
            .output()
            .await
            .map_err(|e| QuantpackError::Toolchain {
                message: format!("Failed to run cmake build: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QuantpackError::Toolchain {
                message: format!("cmake build failed: {stderr}"),
            });
        }
        Ok(())
    }

    async fn setup_python_venv(&self) -> Result<()> {
        let venv = self.venv_dir();
        let python = self.venv_python();

        let output = Command::new("python3")
            .arg("-m")
            .arg("venv")
            .arg(&venv)
            .output()
            .await
            .map_err(|e| QuantpackError::Toolchain {
                message: format!("Failed to create converter venv: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QuantpackError::Toolchain {
                message: format!("Failed to create Python venv: {stderr}"),
            });
        }

        let pip_upgrade = Command::new(&python)
            .args(["-m", "pip", "install", "--upgrade", "pip"])
            .output()
            .await
            .ok();
        if let Some(o) = pip_upgrade {
            if !o.status.success() {
                warn!("pip upgrade failed (non-fatal)");
            }
        }

        info!("Installing Python dependencies for the converter...");
        let output = Command::new(&python)
            .arg("-m")
            .arg("pip")
            .arg("install")
            .args(CONVERTER_REQUIREMENTS)
            .output()
            .await
            .map_err(|e| QuantpackError::Toolchain {
                message: format!("Failed to run pip install: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QuantpackError::Toolchain {
                message: format!("Failed to install converter dependencies: {stderr}"),
            });
        }

        info!("Converter Python environment ready");
        Ok(())
    }
}
