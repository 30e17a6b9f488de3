//! Converter entry-point contracts and invocation.
//!
//! llama.cpp has renamed its HF-to-GGUF entry point across versions. Each
//! supported version is declared as a [`ConverterContract`] — script name
//! plus argument shape — so tracking a future rename is a table edit, not
//! a new code path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{QuantpackError, Result};
use crate::toolchain::Toolchain;

/// Environment variable capping the native allocator split size.
const CUDA_ALLOC_CONF_VAR: &str = "PYTORCH_CUDA_ALLOC_CONF";

/// One supported toolchain version's invocation surface.
#[derive(Debug)]
pub struct ConverterContract {
    /// Entry-point filename within the toolchain checkout.
    pub script: &'static str,
    /// Builds the argument vector for `(model_dir, outtype, outfile)`.
    pub args: fn(&Path, &str, &Path) -> Vec<OsString>,
}

/// `<model_dir> --outtype <T> --outfile <F>`, the shape every known
/// converter generation accepts.
fn outfile_style_args(model_dir: &Path, outtype: &str, outfile: &Path) -> Vec<OsString> {
    vec![
        model_dir.as_os_str().to_os_string(),
        OsString::from("--outtype"),
        OsString::from(outtype),
        OsString::from("--outfile"),
        outfile.as_os_str().to_os_string(),
    ]
}

/// Supported converter versions, in preference order. The first script
/// that exists in the checkout wins.
pub const CONVERTER_CONTRACTS: &[ConverterContract] = &[
    // Current name
    ConverterContract {
        script: "convert_hf_to_gguf.py",
        args: outfile_style_args,
    },
    // 2023-era hyphenated name
    ConverterContract {
        script: "convert-hf-to-gguf.py",
        args: outfile_style_args,
    },
    // Legacy monolithic converter
    ConverterContract {
        script: "convert.py",
        args: outfile_style_args,
    },
];

/// Find the first existing converter entry point in the checkout.
///
/// No candidate existing is an error raised before any subprocess is
/// spawned, and the diagnostic lists every name probed.
pub fn locate_entry_point(
    toolchain_dir: &Path,
) -> Result<(PathBuf, &'static ConverterContract)> {
    for contract in CONVERTER_CONTRACTS {
        let script = toolchain_dir.join(contract.script);
        if script.exists() {
            return Ok((script, contract));
        }
    }

    Err(QuantpackError::ConverterNotFound {
        dir: toolchain_dir.to_path_buf(),
        candidates: CONVERTER_CONTRACTS
            .iter()
            .map(|c| c.script)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Run the converter against the model cache directory.
///
/// Streams the subprocess output into the log as it runs. Non-zero exit is
/// fatal. Returns the path the artifact was written to.
pub async fn run_converter(config: &PipelineConfig, toolchain: &Toolchain) -> Result<PathBuf> {
    let (script, contract) = locate_entry_point(toolchain.dir())?;
    let outfile = config.artifact_path();
    let interpreter = toolchain.interpreter();

    info!(
        "Converting model to GGUF ({}) via {}...",
        config.outtype, contract.script
    );
    let mut child = Command::new(&interpreter)
        .arg(&script)
        .args((contract.args)(
            &config.model_cache_path(),
            &config.outtype,
            &outfile,
        ))
        .env(CUDA_ALLOC_CONF_VAR, config.cuda_alloc_conf())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| QuantpackError::ConversionFailed {
            message: format!("Failed to spawn {}: {e}", contract.script),
        })?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");
    tokio::join!(
        stream_lines("stdout", stdout),
        stream_lines("stderr", stderr)
    );

    wait_and_check_exit(&mut child, contract.script).await?;
    Ok(outfile)
}

/// Drain one subprocess pipe, logging each line at debug level.
async fn stream_lines<R: AsyncRead + Unpin>(label: &str, pipe: R) {
    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!("converter {label}: {line}"),
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading converter {label}: {e}");
                break;
            }
        }
    }
}

/// Wait for the child to exit and map non-zero status to an error.
async fn wait_and_check_exit(child: &mut tokio::process::Child, name: &str) -> Result<()> {
    let status = child
        .wait()
        .await
        .map_err(|e| QuantpackError::ConversionFailed {
            message: format!("{name} process error: {e}"),
        })?;

    if !status.success() {
        return Err(QuantpackError::ConversionFailed {
            message: format!(
                "{name} exited with status: {}",
                status.code().unwrap_or(-1)
            ),
        });
    }
    Ok(())
}
