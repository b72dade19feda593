use crate::app::ports::{DataLakePort, LakeObject, PathEntry};
use crate::common::error::Result;
use crate::metrics::LakeMetrics;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A directory tree laid out like the lake (`{entity}/{YYYY}/{MM}/...`).
pub struct LocalDataLake {
    root: PathBuf,
}

impl LocalDataLake {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn relative_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl DataLakePort for LocalDataLake {
    async fn list_paths(&self, prefix: &str) -> Result<Vec<PathEntry>> {
        let base = self.root.join(prefix);
        if !base.is_dir() {
            debug!("Directory {} does not exist", base.display());
            LakeMetrics::record_list(0);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let Some(name) = self.relative_name(entry.path()) else {
                continue;
            };
            let is_directory = entry.file_type().is_dir();
            let content_length = if is_directory {
                None
            } else {
                entry.metadata().ok().map(|m| m.len())
            };
            entries.push(PathEntry {
                name,
                is_directory,
                content_length,
            });
        }

        LakeMetrics::record_list(entries.len());
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<LakeObject> {
        let bytes = tokio::fs::read(self.root.join(path)).await.map_err(|e| {
            LakeMetrics::record_error("read");
            e
        })?;
        LakeMetrics::record_read(bytes.len());
        Ok(LakeObject {
            path: path.to_string(),
            bytes,
            etag: None,
        })
    }
}
