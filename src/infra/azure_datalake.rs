use crate::app::ports::{DataLakePort, HttpClientPort, LakeObject, PathEntry};
use crate::common::constants::STORAGE_API_VERSION;
use crate::common::error::{FetchError, Result};
use crate::config::DataLakeConfig;
use crate::infra::http_client::ReqwestHttp;
use crate::infra::sas::{rfc1123, SharedKeyCredential};
use crate::metrics::LakeMetrics;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Deserialize)]
struct PathList {
    #[serde(default)]
    paths: Vec<RawPath>,
}

/// The listing API is loose about types: booleans and sizes may arrive as
/// strings or as JSON scalars.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPath {
    name: String,
    #[serde(default)]
    is_directory: Option<Value>,
    #[serde(default)]
    content_length: Option<Value>,
}

impl From<RawPath> for PathEntry {
    fn from(raw: RawPath) -> Self {
        let is_directory = match raw.is_directory {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        let content_length = match raw.content_length {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        PathEntry {
            name: raw.name,
            is_directory,
            content_length,
        }
    }
}

/// Azure Data Lake Storage Gen2 adapter.
///
/// Paths are listed through the DFS endpoint with Shared Key auth; file
/// contents are downloaded from the blob endpoint through short-lived SAS URLs.
pub struct AzureDataLake<H: HttpClientPort + ?Sized> {
    config: DataLakeConfig,
    credential: SharedKeyCredential,
    sas_ttl: Duration,
    http: Box<H>,
}

impl AzureDataLake<ReqwestHttp> {
    pub fn connect(config: DataLakeConfig, sas_ttl: Duration) -> Result<Self> {
        Self::with_http(config, sas_ttl, Box::new(ReqwestHttp::new()))
    }
}

impl<H: HttpClientPort + ?Sized> AzureDataLake<H> {
    pub fn with_http(config: DataLakeConfig, sas_ttl: Duration, http: Box<H>) -> Result<Self> {
        let credential = SharedKeyCredential::new(&config.account_name, &config.account_key)?;
        Ok(Self {
            config,
            credential,
            sas_ttl,
            http,
        })
    }

    /// Read-only URL for one blob of the data container, valid for the SAS TTL.
    pub fn signed_url(&self, blob: &str) -> Result<String> {
        let expiry = Utc::now() + self.sas_ttl;
        let sas = self.credential.blob_read_sas(
            &self.config.data_container,
            blob,
            expiry,
            STORAGE_API_VERSION,
        )?;

        let mut url = Url::parse(&self.config.blob_endpoint())?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Config(format!("cannot build blob URL from {}", self.config.blob_endpoint())))?
            .push(&self.config.data_container)
            .extend(blob.split('/'));
        url.set_query(Some(&sas));
        Ok(url.to_string())
    }

    fn list_url(&self, prefix: &str, continuation: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.config.dfs_endpoint())?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Config(format!("cannot build listing URL from {}", self.config.dfs_endpoint())))?
            .push(&self.config.data_container);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("directory", prefix)
                .append_pair("recursive", "true")
                .append_pair("resource", "filesystem");
            if let Some(token) = continuation {
                query.append_pair("continuation", token);
            }
        }
        Ok(url)
    }

    fn signed_headers(&self, url: &Url) -> Result<Vec<(String, String)>> {
        let mut headers = vec![
            ("x-ms-date".to_string(), rfc1123(Utc::now())),
            ("x-ms-version".to_string(), STORAGE_API_VERSION.to_string()),
        ];
        let authorization = self.credential.authorization("GET", url, &headers)?;
        headers.push(("Authorization".to_string(), authorization));
        Ok(headers)
    }
}

#[async_trait]
impl<H: HttpClientPort + ?Sized> DataLakePort for AzureDataLake<H> {
    #[instrument(skip(self))]
    async fn list_paths(&self, prefix: &str) -> Result<Vec<PathEntry>> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let url = self.list_url(prefix, continuation.as_deref())?;
            let headers = self.signed_headers(&url)?;
            let resp = self.http.get(url.as_str(), &headers).await?;

            if resp.status == 404 {
                debug!("Directory {} does not exist", prefix);
                LakeMetrics::record_list(0);
                return Ok(Vec::new());
            }
            if !resp.is_success() {
                LakeMetrics::record_error("list");
                return Err(FetchError::Storage {
                    status: resp.status,
                    message: resp.body_text(),
                });
            }

            let page: PathList = serde_json::from_slice(&resp.bytes)?;
            entries.extend(page.paths.into_iter().map(PathEntry::from));

            match resp.continuation.filter(|c| !c.is_empty()) {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!("Listed {} paths under {}", entries.len(), prefix);
        LakeMetrics::record_list(entries.len());
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn read_file(&self, path: &str) -> Result<LakeObject> {
        let url = self.signed_url(path)?;
        let resp = self.http.get(&url, &[]).await?;
        if !resp.is_success() {
            LakeMetrics::record_error("read");
            return Err(FetchError::Storage {
                status: resp.status,
                message: resp.body_text(),
            });
        }
        LakeMetrics::record_read(resp.bytes.len());
        Ok(LakeObject {
            path: path.to_string(),
            bytes: resp.bytes,
            etag: resp.etag,
        })
    }
}
