pub mod ans104;
mod config;
mod resolver;
mod signer;
mod store;

pub use config::{ArweaveConfig, DEFAULT_UPLOAD_TIMEOUT_MS, TURBO_UPLOAD_URL};
pub use resolver::ArweaveResolver;
pub use signer::{load_signing_key, parse_secret_key_bytes, parse_secret_key_string};
pub use store::ArweaveBackend;

use agentdoc_core::StorageError;
use thiserror::Error;

pub(crate) const BACKEND: &str = "arweave";

const QUOTA_HINT: &str =
    "the signing wallet has insufficient upload credit, top up credits for its address";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Got HTTP {0} with content '{1}'")]
    HttpFailWithBody(u16, String),

    #[error("upload timed out after {0}ms")]
    Timeout(u128),

    #[error("bundler returned id {returned}, expected {expected}")]
    IdMismatch { expected: String, returned: String },

    #[error("invalid tags: {0}")]
    InvalidTags(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpFailWithBody(402, _) => StorageError::quota(BACKEND, QUOTA_HINT),
            Error::HttpFailWithBody(_, body)
                if body.to_lowercase().contains("insufficient balance") =>
            {
                StorageError::quota(BACKEND, QUOTA_HINT)
            }
            other => StorageError::upload(BACKEND, other),
        }
    }
}
