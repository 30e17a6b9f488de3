//! Hub API response shapes and the fetch-completion marker.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuantpackError, Result};

/// Subset of `GET /api/models/{id}` the fetcher needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    /// Commit sha of the repository's current revision.
    pub sha: String,
}

/// One entry of `GET /api/models/{id}/tree/{revision}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Repo-relative path; may contain `/` for nested files.
    pub path: String,
    #[serde(default)]
    pub size: u64,
    /// Present for LFS-tracked blobs; `oid` is the sha256 in hex.
    #[serde(default)]
    pub lfs: Option<LfsInfo>,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == "file"
    }

    /// Last path component.
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// LFS pointer metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct LfsInfo {
    pub oid: String,
    #[serde(default)]
    pub size: u64,
}

/// Sidecar document proving a cache directory holds a fully verified
/// download. Written only after every selected file is on disk and
/// hash-checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchMarker {
    pub repo_id: String,
    pub revision: String,
    pub files: Vec<String>,
    pub fetched_at: String,
}

impl FetchMarker {
    /// Write the marker into `cache_dir`.
    pub fn write_to(&self, cache_dir: &Path) -> Result<()> {
        let path = cache_dir.join(super::MARKER_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| QuantpackError::io("writing fetch marker", &path, e))
    }

    /// Read the marker from `cache_dir`.
    pub fn read_from(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(super::MARKER_FILENAME);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| QuantpackError::io("reading fetch marker", &path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tree_entry_deserializes_hub_shape() {
        let json = r#"{
            "type": "file",
            "path": "model-00001-of-00002.safetensors",
            "size": 9976570520,
            "lfs": {
                "oid": "cde95b8edae604a1886dd4d01eeb4ad549b0a5e46cd0f1a69e38e54c0dcbea89",
                "size": 9976570520
            }
        }"#;
        let entry: TreeEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_file());
        assert_eq!(entry.filename(), "model-00001-of-00002.safetensors");
        assert_eq!(entry.lfs.unwrap().size, 9976570520);
    }

    #[test]
    fn test_tree_entry_without_lfs() {
        let json = r#"{"type": "file", "path": "config.json", "size": 651}"#;
        let entry: TreeEntry = serde_json::from_str(json).unwrap();
        assert!(entry.lfs.is_none());
    }

    #[test]
    fn test_nested_path_filename() {
        let json = r#"{"type": "file", "path": "onnx/model.onnx", "size": 12}"#;
        let entry: TreeEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.filename(), "model.onnx");
    }

    #[test]
    fn test_marker_round_trip() {
        let temp = TempDir::new().unwrap();
        let marker = FetchMarker {
            repo_id: "org/demo-model".into(),
            revision: "abc123".into(),
            files: vec!["config.json".into(), "model.safetensors".into()],
            fetched_at: "2026-01-01T00:00:00+00:00".into(),
        };
        marker.write_to(temp.path()).unwrap();

        let read = FetchMarker::read_from(temp.path()).unwrap();
        assert_eq!(read.repo_id, "org/demo-model");
        assert_eq!(read.revision, "abc123");
        assert_eq!(read.files.len(), 2);
    }
}
