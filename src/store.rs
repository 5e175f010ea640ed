// src/store.rs
//! Content-addressed accepted-roots store.
//!
//! Layout of the store directory:
//! - `roots_<sha256 hex>.pem`: canonical roots blob
//! - `log_<logid hex>.txt`: pointer, containing the hex hash of a blob
//!
//! Entries are written under a `.tmp` name and renamed into place, so a
//! concurrent loader never observes a partially written entry.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::canonical::{CanonicalRoots, PEM_TAG};
use crate::types::{LogId, RootsHash};

const BLOB_PREFIX: &str = "roots_";
const BLOB_SUFFIX: &str = ".pem";
const POINTER_PREFIX: &str = "log_";
const POINTER_SUFFIX: &str = ".txt";
const TEMP_SUFFIX: &str = ".tmp";

/// Handle on a store directory
#[derive(Debug, Clone)]
pub struct RootsStore {
    dir: PathBuf,
}

impl RootsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open the store, creating its directory if needed
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)
            .await
            .with_context(|| format!("Failed to create store directory {:?}", store.dir))?;
        Ok(store)
    }

    pub fn blob_path(&self, hash: &RootsHash) -> PathBuf {
        self.dir.join(format!("{}{}{}", BLOB_PREFIX, hash, BLOB_SUFFIX))
    }

    pub fn pointer_path(&self, log_id: &LogId) -> PathBuf {
        self.dir.join(format!("{}{}{}", POINTER_PREFIX, log_id, POINTER_SUFFIX))
    }

    /// Write the blob, then the pointer naming it.
    ///
    /// The blob is always written first so a pointer never names a blob this
    /// store has not got. Rewriting an existing blob is harmless: the name is
    /// the hash of the content.
    pub async fn write(&self, log_id: &LogId, roots: &CanonicalRoots) -> Result<()> {
        let blob = self.write_blob(roots).await?;
        let pointer = self.write_pointer(log_id, &roots.hash).await?;
        debug!("Wrote {:?} and {:?}", blob, pointer);
        Ok(())
    }

    pub async fn write_blob(&self, roots: &CanonicalRoots) -> Result<PathBuf> {
        let path = self.blob_path(&roots.hash);
        write_atomic(&path, roots.as_bytes()).await?;
        Ok(path)
    }

    pub async fn write_pointer(&self, log_id: &LogId, hash: &RootsHash) -> Result<PathBuf> {
        let path = self.pointer_path(log_id);
        write_atomic(&path, hash.to_hex().as_bytes()).await?;
        Ok(path)
    }

    /// Rebuild both indices from disk.
    ///
    /// Any unreadable, unparsable or mis-hashed blob fails the whole load.
    /// A pointer to a missing blob does not; see [`AcceptedRoots::roots_for_log`].
    pub async fn load(&self) -> Result<AcceptedRoots> {
        let mut by_hash = HashMap::new();
        let mut hash_by_log = BTreeMap::new();

        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read store directory {:?}", self.dir))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to list store directory {:?}", self.dir))?
        {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if let Some(hex) = entry_key(name, BLOB_PREFIX, BLOB_SUFFIX) {
                let hash = RootsHash::from_hex(hex)
                    .with_context(|| format!("Corrupt blob entry name {}", name))?;
                let collection = self.load_blob(&entry.path(), &hash).await?;
                by_hash.insert(hash, collection);
            } else if let Some(hex) = entry_key(name, POINTER_PREFIX, POINTER_SUFFIX) {
                let log_id = LogId::from_hex(hex)
                    .with_context(|| format!("Corrupt pointer entry name {}", name))?;
                let hash = self.load_pointer(&entry.path()).await?;
                hash_by_log.insert(log_id, hash);
            } else {
                debug!("Ignoring {:?} in store", name);
            }
        }

        let roots = AcceptedRoots {
            by_hash,
            hash_by_log,
        };

        info!(
            "Loaded {} root lists and {} log pointers from {:?}",
            roots.by_hash.len(),
            roots.hash_by_log.len(),
            self.dir
        );

        let dangling = roots.dangling_pointers();
        if !dangling.is_empty() {
            warn!("{} logs point at root lists missing from the store", dangling.len());
        }

        Ok(roots)
    }

    async fn load_blob(&self, path: &Path, hash: &RootsHash) -> Result<CertificateCollection> {
        let data = fs::read(path)
            .await
            .with_context(|| format!("Failed to read blob {:?}", path))?;

        let actual = RootsHash::digest(&data);
        if actual != *hash {
            anyhow::bail!("Blob {:?} has content hash {}, store is corrupt", path, actual);
        }

        let text = std::str::from_utf8(&data)
            .with_context(|| format!("Blob {:?} is not UTF-8 PEM", path))?;

        CertificateCollection::from_pem(text)
            .with_context(|| format!("Failed to parse blob {:?}", path))
    }

    async fn load_pointer(&self, path: &Path) -> Result<RootsHash> {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read pointer {:?}", path))?;

        RootsHash::from_hex(text.trim())
            .with_context(|| format!("Corrupt pointer {:?}", path))
    }
}

/// `<prefix><64 hex><suffix>` -> the hex part
fn entry_key<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)
}

/// Write to `<path>.tmp` then rename over `path`
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(TEMP_SUFFIX);
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, contents)
        .await
        .with_context(|| format!("Failed to write {:?}", temp_path))?;

    fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}

/// A root certificate as loaded from the store
#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    pub der: Vec<u8>,
    pub subject: String,
    pub not_after: DateTime<Utc>,
}

impl ParsedCertificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (subject, not_after) = {
            let (_, cert) = x509_parser::parse_x509_certificate(&der)
                .map_err(|e| anyhow::anyhow!("Failed to parse X.509 certificate: {:?}", e))?;
            (
                cert.subject().to_string(),
                cert.validity().not_after.timestamp(),
            )
        };

        let not_after = DateTime::from_timestamp(not_after, 0)
            .with_context(|| format!("notAfter {} out of range for {}", not_after, subject))?;

        Ok(Self {
            der,
            subject,
            not_after,
        })
    }
}

/// The certificates of one roots blob, in blob order
#[derive(Debug, Clone, Default)]
pub struct CertificateCollection {
    certificates: Vec<ParsedCertificate>,
}

impl CertificateCollection {
    pub fn from_pem(text: &str) -> Result<Self> {
        let blocks = pem::parse_many(text).context("Invalid PEM")?;

        if blocks.is_empty() && !text.trim().is_empty() {
            anyhow::bail!("No PEM blocks found in non-empty blob");
        }

        let certificates = blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| {
                if block.tag() != PEM_TAG {
                    anyhow::bail!("PEM block {} is {}, expected {}", i, block.tag(), PEM_TAG);
                }
                ParsedCertificate::from_der(block.into_contents())
                    .with_context(|| format!("PEM block {}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { certificates })
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedCertificate> {
        self.certificates.iter()
    }
}

/// Result of looking up a log's accepted roots
#[derive(Debug, Clone, Copy)]
pub enum RootsLookup<'a> {
    Found {
        hash: RootsHash,
        roots: &'a CertificateCollection,
    },
    /// The log has a pointer but the blob it names is not in the store
    NoRootsFound { hash: RootsHash },
    /// The log has never been through a rebuild
    UnknownLog,
}

/// In-memory indices built by [`RootsStore::load`]; read-only
#[derive(Debug, Default)]
pub struct AcceptedRoots {
    by_hash: HashMap<RootsHash, CertificateCollection>,
    hash_by_log: BTreeMap<LogId, RootsHash>,
}

impl AcceptedRoots {
    /// AcceptedRootsByHash
    pub fn roots_by_hash(&self) -> &HashMap<RootsHash, CertificateCollection> {
        &self.by_hash
    }

    /// AcceptedRootsHashByLog, in LogID order
    pub fn hash_by_log(&self) -> &BTreeMap<LogId, RootsHash> {
        &self.hash_by_log
    }

    pub fn roots_for_log(&self, log_id: &LogId) -> RootsLookup<'_> {
        match self.hash_by_log.get(log_id) {
            None => RootsLookup::UnknownLog,
            Some(hash) => match self.by_hash.get(hash) {
                Some(roots) => RootsLookup::Found { hash: *hash, roots },
                None => RootsLookup::NoRootsFound { hash: *hash },
            },
        }
    }

    /// Logs whose pointer names a blob that is not loaded
    pub fn dangling_pointers(&self) -> Vec<LogId> {
        self.hash_by_log
            .iter()
            .filter(|(_, hash)| !self.by_hash.contains_key(*hash))
            .map(|(log_id, _)| *log_id)
            .collect()
    }
}
