//! End-to-end pipeline tests against a fake toolchain.
//!
//! The fake toolchain directory carries a converter entry point and a venv
//! interpreter that is really a shell script: it answers `-c` import
//! probes with success and handles the conversion invocation by creating
//! (or refusing to create) the `--outfile` target. Combined with a
//! marker-complete model cache, every test here runs fully offline.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use quantpack_core::{FetchMarker, Pipeline, PipelineConfig, QuantpackError};
use tempfile::TempDir;

/// Interpreter stub for the happy path: import probes succeed and the
/// conversion invocation creates the `--outfile` target.
const CONVERTING_INTERPRETER: &str = r#"#!/bin/sh
if [ "$1" = "-c" ]; then
    exit 0
fi
out=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "--outfile" ]; then
        out="$arg"
    fi
    prev="$arg"
done
if [ -n "$out" ]; then
    : > "$out"
fi
exit 0
"#;

/// Interpreter stub whose conversion invocation fails.
const FAILING_INTERPRETER: &str = r#"#!/bin/sh
if [ "$1" = "-c" ]; then
    exit 0
fi
echo "conversion exploded" >&2
exit 1
"#;

/// Interpreter stub that claims success but writes nothing.
const SILENT_INTERPRETER: &str = r#"#!/bin/sh
exit 0
"#;

fn write_executable(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, content).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

/// Build a trusted toolchain checkout: entry point + fake venv python.
fn fake_toolchain(dir: &Path, interpreter: &str) {
    std::fs::create_dir_all(dir.join("venv").join("bin")).unwrap();
    std::fs::write(dir.join("convert_hf_to_gguf.py"), "# test stub\n").unwrap();
    write_executable(&dir.join("venv").join("bin").join("python"), interpreter);
}

/// Pre-populate a marker-complete model cache so the fetch stage skips
/// without touching the network.
fn complete_cache(cache_root: &Path, model_name: &str) {
    let model_dir = cache_root.join(model_name);
    std::fs::create_dir_all(&model_dir).unwrap();
    std::fs::write(model_dir.join("config.json"), "{}").unwrap();
    std::fs::write(model_dir.join("model.safetensors"), "weights").unwrap();

    let marker = FetchMarker {
        repo_id: format!("org/{model_name}"),
        revision: "0000000000000000000000000000000000000000".into(),
        files: vec!["config.json".into(), "model.safetensors".into()],
        fetched_at: "2026-01-01T00:00:00+00:00".into(),
    };
    marker.write_to(&model_dir).unwrap();
}

fn scenario_config(root: &Path, cleanup: bool) -> PipelineConfig {
    PipelineConfig {
        model_id: "org/demo-model".into(),
        outtype: "q8_0".into(),
        memory_limit_gb: 16,
        toolchain_dir: root.join("llama.cpp"),
        model_cache_dir: root.join("models"),
        dest_dir: root.join("dest"),
        cleanup,
        hf_token: None,
    }
}

fn scenario(root: &Path, interpreter: &str, cleanup: bool) -> PipelineConfig {
    let config = scenario_config(root, cleanup);
    fake_toolchain(&config.toolchain_dir, interpreter);
    complete_cache(&config.model_cache_dir, "demo-model");
    std::fs::create_dir_all(&config.dest_dir).unwrap();
    config
}

#[tokio::test]
async fn test_end_to_end_places_artifact() {
    let temp = TempDir::new().unwrap();
    let config = scenario(temp.path(), CONVERTING_INTERPRETER, false);

    let placed = Pipeline::new(config.clone()).run().await.unwrap();

    let expected = temp.path().join("dest/demo-model/demo-model.q8_0.gguf");
    assert_eq!(placed, expected);
    assert!(expected.exists());
    // Staging copy was moved, not duplicated.
    assert!(!config.artifact_path().exists());
    // Cleanup disabled: the cache survives the run.
    assert!(config.model_cache_path().exists());
}

#[tokio::test]
async fn test_cleanup_removes_cache_after_success() {
    let temp = TempDir::new().unwrap();
    let config = scenario(temp.path(), CONVERTING_INTERPRETER, true);

    Pipeline::new(config.clone()).run().await.unwrap();

    assert!(!config.model_cache_path().exists());
    assert!(temp
        .path()
        .join("dest/demo-model/demo-model.q8_0.gguf")
        .exists());
}

#[tokio::test]
async fn test_converter_failure_aborts_before_placement() {
    let temp = TempDir::new().unwrap();
    let config = scenario(temp.path(), FAILING_INTERPRETER, false);

    let err = Pipeline::new(config.clone()).run().await.unwrap_err();

    assert!(matches!(err, QuantpackError::ConversionFailed { .. }));
    // Placement never ran: destination has no per-model subdirectory.
    assert!(!config.placement_dir().exists());
}

#[tokio::test]
async fn test_empty_converter_output_is_fatal() {
    let temp = TempDir::new().unwrap();
    let config = scenario(temp.path(), SILENT_INTERPRETER, false);

    let err = Pipeline::new(config).run().await.unwrap_err();
    assert!(matches!(err, QuantpackError::ArtifactMissing(_)));
}

#[tokio::test]
async fn test_complete_cache_needs_no_converter_input_changes() {
    // The marker-complete cache is the only reason these tests can run
    // offline: a fetch attempt against the real Hub would fail fast here.
    let temp = TempDir::new().unwrap();
    let config = scenario(temp.path(), CONVERTING_INTERPRETER, false);
    let marker_before =
        std::fs::read_to_string(config.model_cache_path().join(".quantpack.json")).unwrap();

    Pipeline::new(config.clone()).run().await.unwrap();

    let marker_after =
        std::fs::read_to_string(config.model_cache_path().join(".quantpack.json")).unwrap();
    assert_eq!(marker_before, marker_after);
}

#[tokio::test]
async fn test_missing_toolchain_entry_point_fails_without_spawning_converter() {
    let temp = TempDir::new().unwrap();
    let config = scenario_config(temp.path(), false);

    // Toolchain dir exists (so provisioning trusts it) but carries no
    // converter script at all.
    std::fs::create_dir_all(config.toolchain_dir.join("venv").join("bin")).unwrap();
    write_executable(
        &config.toolchain_dir.join("venv").join("bin").join("python"),
        CONVERTING_INTERPRETER,
    );
    complete_cache(&config.model_cache_dir, "demo-model");

    let err = Pipeline::new(config.clone()).run().await.unwrap_err();

    assert!(matches!(err, QuantpackError::ConverterNotFound { .. }));
    assert!(!config.placement_dir().exists());
}
