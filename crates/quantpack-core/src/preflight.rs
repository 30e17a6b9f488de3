//! Startup validation of external prerequisites.
//!
//! The preflight never mutates the environment: missing tools or Python
//! packages are reported as fatal validation errors with the exact repair
//! command. Installation happens only inside the toolchain provisioner's
//! first-run bootstrap.

use std::path::Path;
use std::process::Stdio;

use tracing::debug;

use crate::error::{QuantpackError, Result};

/// Packages the converter entry points must be able to import.
pub const REQUIRED_PACKAGES: &[&str] = &["torch", "numpy", "sentencepiece", "transformers", "gguf"];

/// Verify that an external tool can be spawned.
///
/// The exit status is irrelevant; only "the binary exists on PATH"
/// matters.
pub fn require_tool(name: &str) -> Result<()> {
    let probe = std::process::Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match probe {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(QuantpackError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Probe the converter interpreter for every required package.
///
/// Collects the full missing set before failing so the diagnostic names
/// one complete `pip install` command rather than the first casualty.
pub async fn check_python_packages(interpreter: &Path) -> Result<()> {
    let mut missing: Vec<&str> = Vec::new();

    for package in REQUIRED_PACKAGES {
        let status = tokio::process::Command::new(interpreter)
            .arg("-c")
            .arg(format!("import {package}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => debug!("Python package available: {}", package),
            Ok(_) => missing.push(package),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QuantpackError::ToolNotFound(
                    interpreter.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    if missing.is_empty() {
        return Ok(());
    }

    Err(QuantpackError::MissingPackages {
        packages: missing.join(", "),
        hint: format!(
            "{} -m pip install {}",
            interpreter.display(),
            missing.join(" ")
        ),
    })
}
