use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::common::constants::CONTINUATION_HEADER;
use crate::common::error::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ETAG};

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestHttp {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpGetResult> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?.to_vec();
        Ok(HttpGetResult {
            status,
            bytes,
            etag: header_string(&headers, ETAG.as_str()),
            continuation: header_string(&headers, CONTINUATION_HEADER),
        })
    }
}
