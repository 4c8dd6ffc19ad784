#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Payload hashing for ifw
//!
//! Archives listed in repository metadata carry an expected digest. This crate
//! computes BLAKE3 and SHA-256 digests over byte slices, files and copy
//! streams, and renders them as `algorithm:hex`.

use ifw_errors::{Error, IntegrityError};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Size of chunks for streaming hash computation
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Fresh streaming hasher for this algorithm
    #[must_use]
    pub fn hasher(self) -> Hasher {
        match self {
            Self::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            Self::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(IntegrityError::InvalidHash {
                value: other.to_string(),
                message: "unknown hash algorithm".to_string(),
            }
            .into()),
        }
    }
}

/// Incremental hasher over one of the supported algorithms
pub enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    #[must_use]
    pub fn finalize(self) -> Hash {
        match self {
            Self::Sha256(h) => Hash::from_bytes(HashAlgorithm::Sha256, h.finalize().into()),
            Self::Blake3(h) => Hash::from_bytes(HashAlgorithm::Blake3, *h.finalize().as_bytes()),
        }
    }
}

/// A 32-byte digest tagged with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    algorithm: HashAlgorithm,
    bytes: [u8; 32],
}

impl Hash {
    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from hex string
    ///
    /// # Errors
    /// Returns an error if the input is not valid hexadecimal or not 32 bytes long.
    pub fn from_hex(algorithm: HashAlgorithm, s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s.trim()).map_err(|e| IntegrityError::InvalidHash {
            value: s.to_string(),
            message: format!("invalid hex: {e}"),
        })?;

        let array: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            IntegrityError::InvalidHash {
                value: s.to_string(),
                message: format!("hash must be 32 bytes, got {}", b.len()),
            }
        })?;
        Ok(Self::from_bytes(algorithm, array))
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Compute hash of a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub async fn hash_file(algorithm: HashAlgorithm, path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;

        let mut hasher = algorithm.hasher();
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize())
    }

    /// Compute hash while copying data to a writer
    ///
    /// # Errors
    /// Returns an error if reading from the reader or writing to the writer fails.
    pub async fn hash_and_copy<R, W>(
        algorithm: HashAlgorithm,
        mut reader: R,
        mut writer: W,
    ) -> Result<(Self, u64), Error>
    where
        R: AsyncReadExt + Unpin,
        W: AsyncWriteExt + Unpin,
    {
        let mut hasher = algorithm.hasher();
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }

            hasher.update(&buffer[..n]);
            writer.write_all(&buffer[..n]).await?;
            total_bytes += n as u64;
        }

        writer.flush().await?;
        Ok((hasher.finalize(), total_bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), self.to_hex())
    }
}

/// Accepts `algorithm:hex` or a bare hex digest, which is read as SHA-256.
impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((algorithm, digest)) => Self::from_hex(algorithm.parse()?, digest),
            None => Self::from_hex(HashAlgorithm::Sha256, s),
        }
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Verify a file matches an expected hash, returning the actual digest on mismatch
///
/// # Errors
/// Returns an error if the file cannot be read or hashed.
pub async fn verify_file(path: &Path, expected: &Hash) -> Result<Option<Hash>, Error> {
    let actual = Hash::hash_file(expected.algorithm(), path).await?;
    Ok(if actual == *expected { None } else { Some(actual) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_vectors() {
        let data = b"hello world";
        assert_eq!(
            Hash::from_data(HashAlgorithm::Blake3, data).to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
        assert_eq!(
            Hash::from_data(HashAlgorithm::Sha256, data).to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hash_serialization() {
        let hash = Hash::from_data(HashAlgorithm::Blake3, b"test");
        let json = serde_json::to_string(&hash).unwrap();
        assert!(json.starts_with("\"blake3:"));
        let deserialized: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, deserialized);
    }

    #[test]
    fn test_bare_hex_is_sha256() {
        let hash: Hash = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
            .parse()
            .unwrap();
        assert_eq!(hash.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(hash, Hash::from_data(HashAlgorithm::Sha256, b"hello world"));
    }

    #[tokio::test]
    async fn test_hash_file() {
        use std::io::Write;
        let mut temp = NamedTempFile::new().unwrap();
        let data = b"test file content";
        temp.write_all(data).unwrap();

        let hash = Hash::hash_file(HashAlgorithm::Sha256, temp.path())
            .await
            .unwrap();
        assert_eq!(hash, Hash::from_data(HashAlgorithm::Sha256, data));
    }

    #[tokio::test]
    async fn test_hash_and_copy() {
        let data = b"data to copy";
        let reader = std::io::Cursor::new(data);
        let mut writer = Vec::new();

        let (hash, bytes) = Hash::hash_and_copy(HashAlgorithm::Blake3, reader, &mut writer)
            .await
            .unwrap();

        assert_eq!(writer, data);
        assert_eq!(bytes, data.len() as u64);
        assert_eq!(hash, Hash::from_data(HashAlgorithm::Blake3, data));
    }
}
