use crate::ans104::DataItem;
use crate::config::ArweaveConfig;
use crate::signer::load_signing_key;
use crate::{BACKEND, Error};
use agentdoc_core::{
    Annotation, ContentId, Scheme, StorageBackend, StorageError, StorageResult,
};
use base64::Engine;
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Uploads signed data items to a Turbo-compatible bundler.
///
/// Annotations become the data item's tags, so they are queryable on the
/// permaweb once the bundle settles.
#[derive(Clone)]
pub struct ArweaveBackend {
    key: SigningKey,
    tx_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for ArweaveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArweaveBackend")
            .field("owner", &self.owner())
            .field("tx_url", &self.tx_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ArweaveBackend {
    /// Loads the signing key and prepares the client. No request is made
    /// here, so a bad key fails at startup rather than on first write.
    pub fn create(config: &ArweaveConfig, config_dir: Option<&Path>) -> StorageResult<Self> {
        let key = load_signing_key(config, config_dir)?;
        let upload_url = config.upload_url.trim().trim_end_matches('/');
        if upload_url.is_empty() {
            return Err(StorageError::configuration(BACKEND, "upload_url is empty"));
        }
        Ok(Self {
            key,
            tx_url: format!("{upload_url}/v1/tx"),
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

    /// Public key of the signer, base64url encoded.
    pub fn owner(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.key.verifying_key().as_bytes())
    }

    async fn post(&self, raw: Bytes) -> Result<String, Error> {
        let res = self
            .client
            .post(&self.tx_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(raw)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let body = body.chars().take(256).collect();
            return Err(Error::HttpFailWithBody(status.as_u16(), body));
        }
        let parsed: TurboUploadRes = serde_json::from_slice(&res.bytes().await?)?;
        Ok(parsed.id)
    }
}

#[async_trait::async_trait]
impl StorageBackend for ArweaveBackend {
    fn scheme(&self) -> Scheme {
        Scheme::Arweave
    }

    fn supports_annotations(&self) -> bool {
        true
    }

    async fn upload(&self, payload: Bytes, annotations: &[Annotation]) -> StorageResult<ContentId> {
        let item = DataItem::sign(&self.key, &payload, annotations)?;
        let expected = item.id().to_owned();
        let size = item.as_bytes().len();

        let posted = tokio::time::timeout(self.timeout, self.post(item.into_bytes())).await;
        let returned = match posted {
            Ok(res) => res?,
            Err(_) => return Err(Error::Timeout(self.timeout.as_millis()).into()),
        };
        if returned != expected {
            return Err(Error::IdMismatch { expected, returned }.into());
        }

        log::debug!(
            "uploaded data item {expected} ({size} bytes, {} tags)",
            annotations.len()
        );
        ContentId::new(expected)
    }
}

#[derive(Deserialize)]
struct TurboUploadRes {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_KEY: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn create_requires_a_key() {
        let err = ArweaveBackend::create(&ArweaveConfig::default(), None).unwrap_err();
        assert!(matches!(err, StorageError::Configuration { .. }));
    }

    #[test]
    fn create_builds_tx_url() {
        let mut config = ArweaveConfig::with_secret_key(HEX_KEY);
        config.upload_url = "https://bundler.example/".into();
        let backend = ArweaveBackend::create(&config, None).unwrap();
        assert_eq!(backend.tx_url, "https://bundler.example/v1/tx");
        assert!(backend.supports_annotations());
        assert_eq!(backend.owner().len(), 43);
    }

    #[test]
    fn debug_does_not_leak_key() {
        let backend =
            ArweaveBackend::create(&ArweaveConfig::with_secret_key(HEX_KEY), None).unwrap();
        let debug = format!("{backend:?}");
        assert!(!debug.contains(HEX_KEY));
        assert!(debug.contains(&backend.owner()));
    }
}
