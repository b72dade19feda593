use crate::common::error::Result;
use async_trait::async_trait;

// Storage-side ports

/// One entry returned when listing a folder of the lake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub name: String,
    pub is_directory: bool,
    pub content_length: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LakeObject {
    pub path: String,
    pub bytes: Vec<u8>,
    pub etag: Option<String>,
}

/// Read access to the hierarchical store holding ship data.
#[async_trait]
pub trait DataLakePort: Send + Sync {
    /// Every path below `prefix`, recursively. A prefix that does not exist
    /// lists as empty.
    async fn list_paths(&self, prefix: &str) -> Result<Vec<PathEntry>>;

    async fn read_file(&self, path: &str) -> Result<LakeObject>;
}

// Transport port used by the Azure adapter
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug, Default)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub etag: Option<String>,
    pub continuation: Option<String>,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, for error messages.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}
