use base64::Engine;
use ed25519_dalek::SigningKey;
use std::path::Path;

use agentdoc_core::{StorageError, StorageResult};

use crate::BACKEND;
use crate::config::ArweaveConfig;

/// Loads the upload signing key from config.
///
/// `config_dir` resolves a relative `secret_key_file`. An inline key wins
/// over a key file.
pub fn load_signing_key(
    config: &ArweaveConfig,
    config_dir: Option<&Path>,
) -> StorageResult<SigningKey> {
    if let Some(s) = &config.secret_key {
        return parse_secret_key_string(s).ok_or_else(|| {
            StorageError::configuration(BACKEND, "secret_key is not a 32-byte hex or base64url key")
        });
    }

    let Some(path_str) = &config.secret_key_file else {
        return Err(StorageError::configuration(
            BACKEND,
            "no signing key configured, set secret_key or secret_key_file",
        ));
    };

    let path = Path::new(path_str);
    let resolved = match config_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    };

    let bytes = std::fs::read(&resolved).map_err(|e| {
        StorageError::configuration(
            BACKEND,
            format!("cannot read key file {}: {e}", resolved.display()),
        )
    })?;
    if let Ok(s) = std::str::from_utf8(&bytes)
        && let Some(key) = parse_secret_key_string(s)
    {
        return Ok(key);
    }
    parse_secret_key_bytes(&bytes).ok_or_else(|| {
        StorageError::configuration(
            BACKEND,
            format!("key file {} does not hold a 32-byte key", resolved.display()),
        )
    })
}

pub fn parse_secret_key_string(s: &str) -> Option<SigningKey> {
    let s = s.trim();
    if let Ok(bytes) = hex::decode(s)
        && let Some(key) = parse_secret_key_bytes(&bytes)
    {
        return Some(key);
    }
    let unpadded = s.trim_end_matches('=');
    if let Ok(bytes) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(unpadded)
        && let Some(key) = parse_secret_key_bytes(&bytes)
    {
        return Some(key);
    }
    None
}

pub fn parse_secret_key_bytes(bytes: &[u8]) -> Option<SigningKey> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(SigningKey::from_bytes(&arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_KEY: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn hex_and_base64url_decode_to_same_key() {
        let from_hex = parse_secret_key_string(HEX_KEY).unwrap();
        let raw = hex::decode(HEX_KEY).unwrap();
        let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&raw);
        let from_b64 = parse_secret_key_string(&b64).unwrap();
        assert_eq!(from_hex.to_bytes(), from_b64.to_bytes());

        let padded = base64::engine::general_purpose::URL_SAFE.encode(&raw);
        assert!(parse_secret_key_string(&padded).is_some());
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(parse_secret_key_string("abcd").is_none());
        assert!(parse_secret_key_string("").is_none());
        assert!(parse_secret_key_bytes(&[0u8; 31]).is_none());
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = load_signing_key(&ArweaveConfig::default(), None).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Configuration { backend: "arweave", .. }
        ));
    }

    #[test]
    fn malformed_key_is_not_echoed() {
        let config = ArweaveConfig::with_secret_key("deadbeef-not-a-key");
        let err = load_signing_key(&config, None).unwrap_err();
        assert!(!err.to_string().contains("deadbeef-not-a-key"));
    }

    #[test]
    fn relative_key_file_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("arweave.key"), format!("{HEX_KEY}\n")).unwrap();
        let config = ArweaveConfig {
            secret_key_file: Some("arweave.key".into()),
            ..ArweaveConfig::default()
        };
        let key = load_signing_key(&config, Some(dir.path())).unwrap();
        assert_eq!(hex::encode(key.to_bytes()), HEX_KEY);

        std::fs::write(dir.path().join("raw.key"), hex::decode(HEX_KEY).unwrap()).unwrap();
        let config = ArweaveConfig {
            secret_key_file: Some("raw.key".into()),
            ..ArweaveConfig::default()
        };
        assert!(load_signing_key(&config, Some(dir.path())).is_ok());
    }
}
