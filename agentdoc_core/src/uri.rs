//! Storage URIs and content identifiers.
//!
//! Formats (bit-exact):
//! - `ipfs://<cid>`
//! - `ar://<transactionId>`
//! - `http://...` / `https://...`, fetched directly
//! - the empty string, meaning "no storage configured yet"

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StorageError, StorageResult};

/// Content-addressed storage protocols.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Ipfs,
    Arweave,
}

impl Scheme {
    pub const ALL: [Scheme; 2] = [Scheme::Arweave, Scheme::Ipfs];

    /// URI prefix including `://`.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Ipfs => "ipfs://",
            Self::Arweave => "ar://",
        }
    }

    pub fn backend_name(self) -> &'static str {
        match self {
            Self::Ipfs => "ipfs",
            Self::Arweave => "arweave",
        }
    }

    /// Lower runs first when several backends may take the same write.
    /// The permanent ledger outranks the pinning network.
    pub fn priority(self) -> u8 {
        match self {
            Self::Arweave => 0,
            Self::Ipfs => 1,
        }
    }

    /// Strips this scheme's prefix (and a leading `/ipfs/` path for IPFS)
    /// and surrounding whitespace.
    pub fn strip<'a>(self, raw: &'a str) -> &'a str {
        let raw = raw.trim();
        let raw = raw.strip_prefix(self.prefix()).unwrap_or(raw);
        match self {
            Self::Ipfs => raw.strip_prefix("/ipfs/").unwrap_or(raw),
            Self::Arweave => raw,
        }
    }

    /// Normalizes `raw` to a bare identifier usable as a path segment.
    pub fn normalize_identifier(self, raw: &str) -> StorageResult<ContentId> {
        ContentId::new(self.strip(raw))
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend_name())
    }
}

impl FromStr for Scheme {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ipfs" => Ok(Self::Ipfs),
            "ar" | "arweave" => Ok(Self::Arweave),
            _ => Err(StorageError::InvalidUri(s.to_owned())),
        }
    }
}

/// Backend-native handle for uploaded bytes (a CID or a transaction id).
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Accepts a bare id or an id followed by a path inside it
    /// (`<dirCid>/agent.json`). Rejects blank input, query or fragment
    /// markers, empty segments and `.`/`..` segments.
    pub fn new(id: impl AsRef<str>) -> StorageResult<Self> {
        let id = id.as_ref().trim();
        let bad_segment = |segment: &str| segment.is_empty() || segment == "." || segment == "..";
        if id.is_empty()
            || id.contains(char::is_whitespace)
            || id.contains('?')
            || id.contains('#')
            || id.split('/').any(bad_segment)
        {
            return Err(StorageError::InvalidIdentifier(id.to_owned()));
        }
        Ok(Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentId {
    type Error = StorageError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentId> for String {
    fn from(value: ContentId) -> Self {
        value.0
    }
}

/// `scheme://identifier`. Issued once per write and never mutated.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageUri {
    scheme: Scheme,
    id: ContentId,
}

impl StorageUri {
    pub fn new(scheme: Scheme, id: ContentId) -> Self {
        Self { scheme, id }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scheme.prefix(), self.id)
    }
}

impl FromStr for StorageUri {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match UriTarget::parse(s)? {
            UriTarget::Content(uri) => Ok(uri),
            _ => Err(StorageError::InvalidUri(s.to_owned())),
        }
    }
}

impl TryFrom<String> for StorageUri {
    type Error = StorageError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StorageUri> for String {
    fn from(value: StorageUri) -> Self {
        value.to_string()
    }
}

/// What a URI string points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriTarget {
    /// Empty or blank: registered but no storage configured yet.
    Unconfigured,
    Content(StorageUri),
    /// A plain `http(s)` URL.
    Web(url::Url),
    /// A scheme this crate does not know how to read.
    Unsupported(String),
}

impl UriTarget {
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::Unconfigured);
        }
        for scheme in Scheme::ALL {
            if let Some(rest) = raw.strip_prefix(scheme.prefix()) {
                let id =
                    ContentId::new(rest).map_err(|_| StorageError::InvalidUri(raw.to_owned()))?;
                return Ok(Self::Content(StorageUri::new(scheme, id)));
            }
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = url::Url::parse(raw).map_err(|_| StorageError::InvalidUri(raw.to_owned()))?;
            return Ok(Self::Web(url));
        }
        let scheme = raw.split_once("://").map(|(s, _)| s).unwrap_or(raw);
        Ok(Self::Unsupported(scheme.to_owned()))
    }
}
