//! Optional capture of raw prompts and responses for offline inspection.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Make a tag usable as a file name.
pub fn safe_name(value: &str) -> String {
    value.replace(['/', ':'], "_")
}

/// Writes `{tag}_{kind}.txt` files under a directory. Failures are logged and
/// never reach the caller.
#[derive(Debug, Clone)]
pub struct DebugSink {
    dir: PathBuf,
}

impl DebugSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, tag: &str, kind: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", safe_name(tag), kind))
    }

    pub async fn write(&self, tag: &str, kind: &str, body: &str) {
        let path = self.path_for(tag, kind);
        let result = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, body).await
        }
        .await;
        if let Err(e) = result {
            warn!("Failed to write debug artifact {}: {}", path.display(), e);
        }
    }
}
