mod config;
mod resolver;
mod store;

pub use config::{DEFAULT_UPLOAD_TIMEOUT_MS, IpfsConfig, IpfsProvider, PINATA_UPLOAD_URL};
pub use resolver::IpfsResolver;
pub use store::IpfsBackend;

use agentdoc_core::StorageError;
use thiserror::Error;

pub(crate) const BACKEND: &str = "ipfs";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Got HTTP {0} with content '{1}'")]
    HttpFailWithBody(u16, String),

    #[error("upload timed out after {0}ms")]
    Timeout(u128),

    #[error("response did not contain a CID")]
    MissingCid,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpFailWithBody(402, _) => StorageError::quota(
                BACKEND,
                "the pinning account has no remaining credit, upgrade the plan or switch provider",
            ),
            Error::HttpFailWithBody(403, body) if body.to_lowercase().contains("limit") => {
                StorageError::quota(
                    BACKEND,
                    "the pinning account reached its plan limit, upgrade the plan or unpin content",
                )
            }
            other => StorageError::upload(BACKEND, other),
        }
    }
}
