//! ANS-104 data items signed with ed25519.
//!
//! Layout of a serialized item:
//!
//! ```text
//! signature type   u16 LE (2 = ed25519)
//! signature        64 bytes
//! owner            32 bytes (public key)
//! target flag      1 byte, always 0
//! anchor flag      1 byte, always 0
//! tag count        u64 LE
//! tag bytes len    u64 LE
//! tags             Avro array of {name: bytes, value: bytes}
//! data             remaining bytes
//! ```
//!
//! The signature covers the SHA-384 deep hash of
//! `["dataitem", "1", "2", owner, target, anchor, tags, data]`, and the
//! item id is `base64url(sha256(signature))`.

use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256, Sha384};

use agentdoc_core::Annotation;

use crate::Error;

pub const SIGNATURE_TYPE_ED25519: u16 = 2;
pub const SIGNATURE_LEN: usize = 64;
pub const OWNER_LEN: usize = 32;

pub const MAX_TAGS: usize = 128;
pub const MAX_TAG_NAME_LEN: usize = 1024;
pub const MAX_TAG_VALUE_LEN: usize = 3072;

/// Input to [`deep_hash`].
pub enum DeepHashChunk<'a> {
    Blob(&'a [u8]),
    List(Vec<DeepHashChunk<'a>>),
}

fn to_array(digest: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(digest);
    out
}

pub fn deep_hash(chunk: &DeepHashChunk<'_>) -> [u8; 48] {
    match chunk {
        DeepHashChunk::Blob(data) => {
            let mut hasher = Sha384::new();
            hasher.update(Sha384::digest(format!("blob{}", data.len()).as_bytes()));
            hasher.update(Sha384::digest(data));
            to_array(&hasher.finalize())
        }
        DeepHashChunk::List(items) => {
            let mut acc = to_array(&Sha384::digest(format!("list{}", items.len()).as_bytes()));
            for item in items {
                let mut hasher = Sha384::new();
                hasher.update(acc);
                hasher.update(deep_hash(item));
                acc = to_array(&hasher.finalize());
            }
            acc
        }
    }
}

/// Zigzag varint, as Avro encodes `long`.
fn put_avro_long(buf: &mut BytesMut, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z >= 0x80 {
        buf.put_u8((z as u8 & 0x7f) | 0x80);
        z >>= 7;
    }
    buf.put_u8(z as u8);
}

fn put_avro_bytes(buf: &mut BytesMut, data: &[u8]) {
    put_avro_long(buf, data.len() as i64);
    buf.put_slice(data);
}

/// Avro-encodes tags as a single block. No tags encode to nothing.
pub fn encode_tags(tags: &[Annotation]) -> Result<Bytes, Error> {
    if tags.is_empty() {
        return Ok(Bytes::new());
    }
    if tags.len() > MAX_TAGS {
        return Err(Error::InvalidTags(format!(
            "{} tags exceed the limit of {MAX_TAGS}",
            tags.len()
        )));
    }

    let mut buf = BytesMut::new();
    put_avro_long(&mut buf, tags.len() as i64);
    for tag in tags {
        if tag.name.is_empty() || tag.name.len() > MAX_TAG_NAME_LEN {
            return Err(Error::InvalidTags(format!(
                "tag name '{}' must be 1..={MAX_TAG_NAME_LEN} bytes",
                tag.name
            )));
        }
        if tag.value.is_empty() || tag.value.len() > MAX_TAG_VALUE_LEN {
            return Err(Error::InvalidTags(format!(
                "value of tag '{}' must be 1..={MAX_TAG_VALUE_LEN} bytes",
                tag.name
            )));
        }
        put_avro_bytes(&mut buf, tag.name.as_bytes());
        put_avro_bytes(&mut buf, tag.value.as_bytes());
    }
    put_avro_long(&mut buf, 0);
    Ok(buf.freeze())
}

/// A signed, serialized data item ready for a bundler.
#[derive(Debug, Clone)]
pub struct DataItem {
    id: String,
    raw: Bytes,
}

impl DataItem {
    pub fn sign(key: &SigningKey, data: &[u8], tags: &[Annotation]) -> Result<Self, Error> {
        let owner = key.verifying_key().to_bytes();
        let raw_tags = encode_tags(tags)?;

        let message = signing_message(&owner, &raw_tags, data);
        let signature = key.sign(&message).to_bytes();
        let id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(signature));

        let mut raw = BytesMut::with_capacity(
            2 + SIGNATURE_LEN + OWNER_LEN + 2 + 16 + raw_tags.len() + data.len(),
        );
        raw.put_u16_le(SIGNATURE_TYPE_ED25519);
        raw.put_slice(&signature);
        raw.put_slice(&owner);
        raw.put_u8(0);
        raw.put_u8(0);
        raw.put_u64_le(tags.len() as u64);
        raw.put_u64_le(raw_tags.len() as u64);
        raw.put_slice(&raw_tags);
        raw.put_slice(data);

        Ok(Self {
            id,
            raw: raw.freeze(),
        })
    }

    /// Transaction id the item will be addressable by.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }

    pub fn into_bytes(self) -> Bytes {
        self.raw
    }
}

/// Deep hash over the fields an ed25519 data item signs.
pub fn signing_message(owner: &[u8], raw_tags: &[u8], data: &[u8]) -> [u8; 48] {
    let sig_type = SIGNATURE_TYPE_ED25519.to_string();
    deep_hash(&DeepHashChunk::List(vec![
        DeepHashChunk::Blob(b"dataitem"),
        DeepHashChunk::Blob(b"1"),
        DeepHashChunk::Blob(sig_type.as_bytes()),
        DeepHashChunk::Blob(owner),
        DeepHashChunk::Blob(&[]),
        DeepHashChunk::Blob(&[]),
        DeepHashChunk::Blob(raw_tags),
        DeepHashChunk::Blob(data),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn avro_longs_are_zigzag_varints() {
        let cases: [(i64, &[u8]); 5] = [
            (0, &[0x00]),
            (1, &[0x02]),
            (63, &[0x7e]),
            (64, &[0x80, 0x01]),
            (-1, &[0x01]),
        ];
        for (n, expected) in cases {
            let mut buf = BytesMut::new();
            put_avro_long(&mut buf, n);
            assert_eq!(&buf[..], expected, "encoding {n}");
        }
    }

    #[test]
    fn tags_encode_as_single_avro_block() {
        let raw = encode_tags(&[Annotation::new("a", "bc")]).unwrap();
        assert_eq!(&raw[..], &[0x02, 0x02, b'a', 0x04, b'b', b'c', 0x00]);
        assert!(encode_tags(&[]).unwrap().is_empty());
    }

    #[test]
    fn oversized_or_empty_tags_are_rejected() {
        assert!(encode_tags(&[Annotation::new("", "x")]).is_err());
        assert!(encode_tags(&[Annotation::new("k", "")]).is_err());
        let oversized = Annotation::new("k", "v".repeat(MAX_TAG_VALUE_LEN + 1));
        assert!(encode_tags(&[oversized]).is_err());
        let many: Vec<_> = (0..=MAX_TAGS).map(|i| Annotation::new(format!("t{i}"), "v")).collect();
        assert!(encode_tags(&many).is_err());
    }

    #[test]
    fn deep_hash_of_empty_list_is_tag_hash() {
        let expected = to_array(&Sha384::digest(b"list0"));
        assert_eq!(deep_hash(&DeepHashChunk::List(vec![])), expected);
    }

    #[test]
    fn deep_hash_of_blob_hashes_tag_and_data() {
        let mut hasher = Sha384::new();
        hasher.update(Sha384::digest(b"blob3"));
        hasher.update(Sha384::digest(b"abc"));
        let expected = to_array(&hasher.finalize());
        assert_eq!(deep_hash(&DeepHashChunk::Blob(b"abc")), expected);
    }

    #[test]
    fn data_item_layout_and_signature() {
        let tags = vec![
            Annotation::new("Content-Type", "application/json"),
            Annotation::new("Protocol", "ERC-8004"),
        ];
        let data = br#"{"name":"X"}"#;
        let item = DataItem::sign(&key(), data, &tags).unwrap();
        let raw = item.as_bytes();

        assert_eq!(u16::from_le_bytes([raw[0], raw[1]]), SIGNATURE_TYPE_ED25519);
        let signature: [u8; 64] = raw[2..66].try_into().unwrap();
        let owner = &raw[66..98];
        assert_eq!(owner, key().verifying_key().as_bytes());
        assert_eq!(raw[98], 0, "no target");
        assert_eq!(raw[99], 0, "no anchor");
        let tag_count = u64::from_le_bytes(raw[100..108].try_into().unwrap());
        let tag_len = u64::from_le_bytes(raw[108..116].try_into().unwrap()) as usize;
        assert_eq!(tag_count, 2);
        let raw_tags = &raw[116..116 + tag_len];
        assert_eq!(raw_tags, &encode_tags(&tags).unwrap()[..]);
        assert_eq!(&raw[116 + tag_len..], data);

        let message = signing_message(owner, raw_tags, data);
        key()
            .verifying_key()
            .verify(&message, &Signature::from_bytes(&signature))
            .unwrap();

        let expected_id =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(signature));
        assert_eq!(item.id(), expected_id);
        assert_eq!(item.id().len(), 43);
    }

    #[test]
    fn signing_is_deterministic() {
        let a = DataItem::sign(&key(), b"same", &[]).unwrap();
        let b = DataItem::sign(&key(), b"same", &[]).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
