use std::fmt;

pub type StorageResult<T, E = StorageError> = std::result::Result<T, E>;

/// Why a single gateway could not serve a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayFailure {
    pub gateway: String,
    pub reason: String,
}

impl fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.gateway, self.reason)
    }
}

fn join_failures(failures: &[GatewayFailure]) -> String {
    if failures.is_empty() {
        return "no gateways configured".to_owned();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by storage backends and resolvers.
///
/// Messages name the backend and the identifier involved but never
/// include credentials.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    /// Missing or malformed credential/configuration. Raised when a
    /// backend is constructed, not when it is used.
    #[error("{backend} backend is misconfigured: {message}")]
    Configuration {
        backend: &'static str,
        message: String,
    },

    /// The backend refused the upload for balance or plan reasons.
    #[error("{backend} rejected the upload for lack of credit: {hint}")]
    Quota { backend: &'static str, hint: String },

    /// Generic network or protocol failure during a write.
    #[error("upload to {backend} failed: {message}")]
    Upload {
        backend: &'static str,
        message: String,
    },

    /// Every gateway failed to serve the identifier.
    #[error("all gateways failed for {identifier}: {}", join_failures(.failures))]
    Resolution {
        identifier: String,
        failures: Vec<GatewayFailure>,
    },

    /// Bytes were retrieved but are not the expected JSON document.
    #[error("content {identifier} is not a valid document: {source}")]
    Parse {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid content identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("invalid storage uri '{0}'")]
    InvalidUri(String),
}

impl StorageError {
    pub fn configuration(backend: &'static str, message: impl fmt::Display) -> Self {
        Self::Configuration {
            backend,
            message: message.to_string(),
        }
    }

    pub fn upload(backend: &'static str, message: impl fmt::Display) -> Self {
        Self::Upload {
            backend,
            message: message.to_string(),
        }
    }

    pub fn quota(backend: &'static str, hint: impl fmt::Display) -> Self {
        Self::Quota {
            backend,
            hint: hint.to_string(),
        }
    }

    /// True for failures a caller may answer by trying another backend.
    pub fn is_recoverable_write(&self) -> bool {
        matches!(self, Self::Quota { .. } | Self::Upload { .. })
    }
}

/// A metadata record that may not be written yet.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("agent name must not be empty")]
    EmptyName,
    #[error("agent description must not be empty")]
    EmptyDescription,
    #[error("wallet {0} has no chain id and no chain context was supplied")]
    WalletChainUnknown(String),
    #[error("invalid agent id '{0}', expected '<chainId>:<tokenId>'")]
    InvalidAgentId(String),
    #[error("feedback score {0} is outside 0..=100")]
    ScoreOutOfRange(u8),
    #[error("feedback reviewer must not be empty")]
    EmptyReviewer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_lists_every_gateway() {
        let err = StorageError::Resolution {
            identifier: "bafy123".into(),
            failures: vec![
                GatewayFailure {
                    gateway: "https://a".into(),
                    reason: "HTTP 404".into(),
                },
                GatewayFailure {
                    gateway: "https://b".into(),
                    reason: "timed out".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("bafy123"));
        assert!(msg.contains("https://a: HTTP 404"));
        assert!(msg.contains("https://b: timed out"));
    }

    #[test]
    fn only_quota_and_upload_are_recoverable() {
        let quota = StorageError::quota("arweave", "top up");
        let config = StorageError::configuration("ipfs", "no jwt");
        let blank = StorageError::InvalidIdentifier(" ".into());
        assert!(quota.is_recoverable_write());
        assert!(StorageError::upload("ipfs", "reset").is_recoverable_write());
        assert!(!config.is_recoverable_write());
        assert!(!blank.is_recoverable_write());
    }
}
