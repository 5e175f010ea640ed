// src/types.rs
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a SHA-256 digest
pub const DIGEST_LEN: usize = 32;

macro_rules! sha256_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; DIGEST_LEN]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }

            /// SHA-256 over `data`
            pub fn digest(data: &[u8]) -> Self {
                Self(Sha256::digest(data).into())
            }

            pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
                &self.0
            }

            /// Lowercase hex, 64 characters
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self> {
                let mut bytes = [0u8; DIGEST_LEN];
                hex::decode_to_slice(s, &mut bytes)
                    .with_context(|| format!("Invalid {} hex: {:?}", stringify!($name), s))?;
                Ok(Self(bytes))
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let arr: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| {
                    anyhow::anyhow!(
                        "{} must be {} bytes, got {}",
                        stringify!($name),
                        DIGEST_LEN,
                        bytes.len()
                    )
                })?;
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }
    };
}

sha256_newtype!(
    /// Identity of a CT log: SHA-256 of its DER-encoded public key
    LogId
);

sha256_newtype!(
    /// Content address of a canonical roots blob: SHA-256 of the PEM bytes
    RootsHash
);

/// A log endpoint eligible for polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub submission_url: String,
    pub log_id: LogId,
}

impl Endpoint {
    pub fn new(submission_url: impl Into<String>, log_id: LogId) -> Self {
        Self {
            submission_url: submission_url.into(),
            log_id,
        }
    }

    /// URL of the log's get-roots endpoint
    /// Endpoint: GET {submission_url}/ct/v1/get-roots
    pub fn get_roots_url(&self) -> String {
        format!(
            "{}/ct/v1/get-roots",
            self.submission_url.trim_end_matches('/')
        )
    }
}
