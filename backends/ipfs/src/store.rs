use crate::config::{IpfsConfig, IpfsProvider};
use crate::{BACKEND, Error};
use agentdoc_core::{
    Annotation, ContentId, Scheme, StorageBackend, StorageError, StorageResult,
};
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// File name sent with every multipart upload.
const UPLOAD_FILE_NAME: &str = "metadata.json";

#[derive(Debug, Clone)]
enum UploadTarget {
    Pinata { url: String, auth: HeaderValue },
    Node { add_url: String },
}

/// Pins documents on IPFS through Pinata or a Kubo node.
///
/// IPFS has no native tagging, so annotations passed to `upload` are
/// dropped.
#[derive(Debug, Clone)]
pub struct IpfsBackend {
    target: UploadTarget,
    client: reqwest::Client,
    timeout: Duration,
}

impl IpfsBackend {
    /// Validates the credential and prepares the client. No request is
    /// made here.
    pub fn create(config: &IpfsConfig) -> StorageResult<Self> {
        let target = match &config.provider {
            IpfsProvider::Pinata { jwt, upload_url } => {
                let jwt = jwt.trim();
                if jwt.is_empty() {
                    return Err(StorageError::configuration(BACKEND, "Pinata JWT is missing"));
                }
                let segments: Vec<&str> = jwt.split('.').collect();
                if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
                    return Err(StorageError::configuration(
                        BACKEND,
                        "Pinata JWT is malformed, expected three dot-separated segments",
                    ));
                }
                let mut auth = HeaderValue::from_str(&format!("Bearer {jwt}")).map_err(|_| {
                    StorageError::configuration(BACKEND, "Pinata JWT contains invalid characters")
                })?;
                auth.set_sensitive(true);
                UploadTarget::Pinata {
                    url: upload_url.clone(),
                    auth,
                }
            }
            IpfsProvider::Node { api_url } => {
                let parsed = url::Url::parse(api_url.trim()).map_err(|e| {
                    StorageError::configuration(BACKEND, format!("invalid node api url: {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(StorageError::configuration(
                        BACKEND,
                        format!("node api url must be http(s), got {}", parsed.scheme()),
                    ));
                }
                let base = parsed.as_str().trim_end_matches('/');
                UploadTarget::Node {
                    add_url: format!("{base}/api/v0/add?pin=true&cid-version=1"),
                }
            }
        };

        Ok(Self {
            target,
            client: reqwest::Client::new(),
            timeout: Duration::from_millis(config.upload_timeout_ms),
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn file_part(payload: Bytes) -> Result<Part, Error> {
        Ok(Part::bytes(payload.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/json")?)
    }

    async fn send(&self, payload: Bytes) -> Result<String, Error> {
        match &self.target {
            UploadTarget::Pinata { url, auth } => {
                let form = Form::new()
                    .part("file", Self::file_part(payload)?)
                    .text("network", "public");
                let res = self
                    .client
                    .post(url)
                    .header(AUTHORIZATION, auth.clone())
                    .multipart(form)
                    .send()
                    .await?;
                let body = read_success(res).await?;
                let parsed: PinataUploadRes = serde_json::from_slice(&body)?;
                Ok(parsed.data.cid)
            }
            UploadTarget::Node { add_url } => {
                let form = Form::new().part("file", Self::file_part(payload)?);
                let res = self.client.post(add_url).multipart(form).send().await?;
                let body = read_success(res).await?;
                let parsed: KuboAddRes = serde_json::from_slice(&body)?;
                Ok(parsed.hash)
            }
        }
    }
}

async fn read_success(res: reqwest::Response) -> Result<Bytes, Error> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let body = body.chars().take(256).collect();
        return Err(Error::HttpFailWithBody(status.as_u16(), body));
    }
    Ok(res.bytes().await?)
}

#[async_trait::async_trait]
impl StorageBackend for IpfsBackend {
    fn scheme(&self) -> Scheme {
        Scheme::Ipfs
    }

    fn supports_annotations(&self) -> bool {
        false
    }

    async fn upload(
        &self,
        payload: Bytes,
        _annotations: &[Annotation],
    ) -> StorageResult<ContentId> {
        let len = payload.len();
        let cid = match tokio::time::timeout(self.timeout, self.send(payload)).await {
            Ok(res) => res?,
            Err(_) => return Err(Error::Timeout(self.timeout.as_millis()).into()),
        };
        if cid.trim().is_empty() {
            return Err(Error::MissingCid.into());
        }
        log::debug!("pinned {len} bytes as {cid}");
        ContentId::new(cid)
    }
}

#[derive(Deserialize)]
struct PinataUploadRes {
    data: PinataFile,
}

#[derive(Deserialize)]
struct PinataFile {
    cid: String,
}

#[derive(Deserialize)]
struct KuboAddRes {
    #[serde(rename = "Hash")]
    hash: String,
}
