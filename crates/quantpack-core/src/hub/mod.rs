//! Hub client for model metadata lookup and file download.
//!
//! A small slice of the Hub HTTP API: resolve a repository's
//! current revision, list its file tree, and stream the tokenizer/config/
//! weight files into the per-model cache directory. A completed fetch is
//! sealed with a marker file; a marker-complete cache is trusted with no
//! network traffic at all.

pub mod auth;
mod download;
mod types;

pub use types::{FetchMarker, LfsInfo, RepoInfo, TreeEntry};

use std::path::Path;

use tracing::{debug, info};

use crate::error::{QuantpackError, Result};

/// Hub API base URL.
pub const HF_API_BASE: &str = "https://huggingface.co/api";

/// Hub download base URL.
pub const HF_HUB_BASE: &str = "https://huggingface.co";

/// Completion marker filename inside a model cache directory.
pub const MARKER_FILENAME: &str = ".quantpack.json";

/// Temporary suffix for in-flight downloads.
pub(crate) const DOWNLOAD_TEMP_SUFFIX: &str = ".part";

/// Regular (non-LFS) files fetched alongside the weights. These are the
/// config/tokenizer files the converter reads. Matched by filename (the
/// last path component).
const AUXILIARY_FILE_PATTERNS: &[&str] = &[
    "config.json",
    "tokenizer.json",
    "tokenizer_config.json",
    "generation_config.json",
    "special_tokens_map.json",
    "tokenizer.model",
    "vocab.json",
    "merges.txt",
    "added_tokens.json",
    "chat_template.jinja",
    "model.safetensors.index.json",
    "pytorch_model.bin.index.json",
];

/// Client for the Hub API operations the pipeline needs.
#[derive(Debug)]
pub struct HubClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl HubClient {
    /// Create a new Hub client.
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("quantpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuantpackError::Network {
                message: format!("Failed to create HTTP client: {e}"),
                cause: None,
            })?;

        Ok(Self { client, token })
    }

    pub(crate) fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Resolve the repository's current revision.
    pub async fn repo_info(&self, repo_id: &str) -> Result<RepoInfo> {
        let url = format!("{HF_API_BASE}/models/{}", encode_repo_path(repo_id));
        let response = self.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuantpackError::RepoNotFound {
                repo_id: repo_id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(QuantpackError::HubApi {
                message: format!("{url} returned {}", response.status()),
                status_code: Some(response.status().as_u16()),
            });
        }

        Ok(response.json().await?)
    }

    /// List the repository file tree at a revision.
    pub async fn repo_tree(&self, repo_id: &str, revision: &str) -> Result<Vec<TreeEntry>> {
        let url = format!(
            "{HF_API_BASE}/models/{}/tree/{}?recursive=true",
            encode_repo_path(repo_id),
            urlencoding::encode(revision),
        );
        let response = self.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(QuantpackError::HubApi {
                message: format!("{url} returned {}", response.status()),
                status_code: Some(response.status().as_u16()),
            });
        }

        Ok(response.json().await?)
    }

    /// Produce a local copy of the model's tokenizer, config, and weight
    /// files under `cache_path`.
    ///
    /// A marker-complete cache skips entirely. A marker-less cache
    /// directory is treated as a partial download: size-matching files are
    /// kept, everything else is (re)fetched. The marker is written last.
    pub async fn fetch_model(&self, repo_id: &str, cache_path: &Path) -> Result<()> {
        if cache_path.is_dir() && cache_path.join(MARKER_FILENAME).exists() {
            match FetchMarker::read_from(cache_path) {
                Ok(marker) => info!(
                    "Model cache {} already complete (revision {}), skipping download",
                    cache_path.display(),
                    marker.revision
                ),
                Err(_) => info!(
                    "Model cache {} already complete, skipping download",
                    cache_path.display()
                ),
            }
            return Ok(());
        }

        if cache_path.is_dir() {
            info!(
                "Model cache {} exists without completion marker, resuming fetch",
                cache_path.display()
            );
        }

        info!("Downloading model: {repo_id}");
        let repo = self.repo_info(repo_id).await?;
        let tree = self.repo_tree(repo_id, &repo.sha).await?;
        let selected = select_files(&tree);

        if selected.is_empty() {
            return Err(QuantpackError::HubApi {
                message: format!(
                    "Repository {repo_id} contains no recognizable tokenizer or weight files"
                ),
                status_code: None,
            });
        }
        debug!(
            "Selected {} of {} repo files for download",
            selected.len(),
            tree.len()
        );

        std::fs::create_dir_all(cache_path)
            .map_err(|e| QuantpackError::io("creating model cache dir", cache_path, e))?;

        for entry in &selected {
            self.download_file(repo_id, &repo.sha, entry, cache_path)
                .await?;
        }

        let marker = FetchMarker {
            repo_id: repo_id.to_string(),
            revision: repo.sha.clone(),
            files: selected.iter().map(|e| e.path.clone()).collect(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };
        marker.write_to(cache_path)?;

        info!(
            "Model download complete: {} files at revision {}",
            selected.len(),
            repo.sha
        );
        Ok(())
    }
}

/// Percent-encode each path segment, preserving `/` separators.
pub(crate) fn encode_repo_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_auxiliary(filename: &str) -> bool {
    AUXILIARY_FILE_PATTERNS.iter().any(|p| filename == *p)
}

/// Select the files worth fetching: auxiliary config/tokenizer files plus
/// the weight set. Safetensors weights are preferred; `pytorch_model*.bin`
/// is the fallback when a repo predates safetensors.
fn select_files(entries: &[TreeEntry]) -> Vec<&TreeEntry> {
    let files: Vec<&TreeEntry> = entries.iter().filter(|e| e.is_file()).collect();

    let mut selected: Vec<&TreeEntry> = files
        .iter()
        .copied()
        .filter(|e| is_auxiliary(e.filename()))
        .collect();

    let safetensors: Vec<&TreeEntry> = files
        .iter()
        .copied()
        .filter(|e| e.path.ends_with(".safetensors"))
        .collect();

    if !safetensors.is_empty() {
        selected.extend(safetensors);
    } else {
        selected.extend(files.iter().copied().filter(|e| {
            let name = e.filename();
            name.starts_with("pytorch_model") && name.ends_with(".bin")
        }));
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> TreeEntry {
        TreeEntry {
            entry_type: "file".into(),
            path: path.into(),
            size: 1,
            lfs: None,
        }
    }

    fn dir_entry(path: &str) -> TreeEntry {
        TreeEntry {
            entry_type: "directory".into(),
            path: path.into(),
            size: 0,
            lfs: None,
        }
    }

    #[test]
    fn test_is_auxiliary() {
        assert!(is_auxiliary("tokenizer.json"));
        assert!(is_auxiliary("config.json"));
        assert!(!is_auxiliary("README.md"));
        assert!(!is_auxiliary("model.safetensors"));
    }

    #[test]
    fn test_select_prefers_safetensors() {
        let entries = vec![
            entry("config.json"),
            entry("tokenizer.json"),
            entry("README.md"),
            entry("model-00001-of-00002.safetensors"),
            entry("model-00002-of-00002.safetensors"),
            entry("pytorch_model.bin"),
        ];
        let selected = select_files(&entries);
        let paths: Vec<&str> = selected.iter().map(|e| e.path.as_str()).collect();

        assert!(paths.contains(&"config.json"));
        assert!(paths.contains(&"model-00001-of-00002.safetensors"));
        assert!(paths.contains(&"model-00002-of-00002.safetensors"));
        assert!(!paths.contains(&"pytorch_model.bin"));
        assert!(!paths.contains(&"README.md"));
    }

    #[test]
    fn test_select_falls_back_to_bin_weights() {
        let entries = vec![
            entry("config.json"),
            entry("pytorch_model-00001-of-00002.bin"),
            entry("pytorch_model-00002-of-00002.bin"),
            entry("pytorch_model.bin.index.json"),
            entry("training_args.bin"),
        ];
        let selected = select_files(&entries);
        let paths: Vec<&str> = selected.iter().map(|e| e.path.as_str()).collect();

        assert!(paths.contains(&"pytorch_model-00001-of-00002.bin"));
        assert!(paths.contains(&"pytorch_model.bin.index.json"));
        assert!(!paths.contains(&"training_args.bin"));
    }

    #[test]
    fn test_select_skips_directories() {
        let entries = vec![dir_entry("onnx"), entry("onnx/config.json")];
        let selected = select_files(&entries);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].path, "onnx/config.json");
    }

    #[test]
    fn test_encode_repo_path_keeps_separator() {
        assert_eq!(encode_repo_path("org/demo-model"), "org/demo-model");
        assert_eq!(encode_repo_path("org/has space"), "org/has%20space");
    }
}
