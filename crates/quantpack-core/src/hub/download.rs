//! Streaming file download with hash verification.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::types::TreeEntry;
use super::{encode_repo_path, HubClient, DOWNLOAD_TEMP_SUFFIX, HF_HUB_BASE};
use crate::error::{QuantpackError, Result};

impl HubClient {
    /// Download one repo file into `dest_dir`, streaming through a `.part`
    /// temporary that is renamed into place after the hash check passes.
    ///
    /// A file already on disk with the expected size is kept untouched.
    pub(crate) async fn download_file(
        &self,
        repo_id: &str,
        revision: &str,
        entry: &TreeEntry,
        dest_dir: &Path,
    ) -> Result<()> {
        let dest = dest_dir.join(&entry.path);

        if let Ok(meta) = std::fs::metadata(&dest) {
            if entry.size > 0 && meta.len() == entry.size {
                debug!("Keeping existing {} ({} bytes)", entry.path, entry.size);
                return Ok(());
            }
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| QuantpackError::io("creating download subdir", parent, e))?;
        }

        let url = format!(
            "{HF_HUB_BASE}/{}/resolve/{}/{}",
            encode_repo_path(repo_id),
            urlencoding::encode(revision),
            encode_repo_path(&entry.path),
        );

        info!("Downloading {} ({} bytes)", entry.path, entry.size);
        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(QuantpackError::DownloadFailed {
                url,
                message: format!("server returned {}", response.status()),
            });
        }

        let part = part_path(&dest);
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|e| QuantpackError::io("creating download temp file", &part, e))?;

        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| QuantpackError::DownloadFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| QuantpackError::io("writing download chunk", &part, e))?;
        }
        file.flush()
            .await
            .map_err(|e| QuantpackError::io("flushing download", &part, e))?;
        drop(file);

        if let Some(lfs) = &entry.lfs {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(&lfs.oid) {
                let _ = std::fs::remove_file(&part);
                return Err(QuantpackError::HashMismatch {
                    filename: entry.path.clone(),
                    expected: lfs.oid.clone(),
                    actual,
                });
            }
            debug!("sha256 verified for {}", entry.path);
        }

        std::fs::rename(&part, &dest)
            .map_err(|e| QuantpackError::io("finalizing download", &part, e))?;
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut os = dest.to_path_buf().into_os_string();
    os.push(DOWNLOAD_TEMP_SUFFIX);
    PathBuf::from(os)
}
