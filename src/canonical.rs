// src/canonical.rs
//! Canonical form of a get-roots document.
//!
//! Certificates are sorted by their base64 text before being re-encoded as
//! PEM, so the blob (and therefore its hash) does not depend on the order a
//! log returned them in. Logs accepting the same root set share one blob.

use anyhow::{Context, Result};
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::RootsHash;

/// PEM block type of every entry in a roots blob
pub const PEM_TAG: &str = "CERTIFICATE";

/// Body of GET /ct/v1/get-roots
#[derive(Debug, Deserialize)]
pub struct GetRootsResponse {
    #[serde(default)]
    pub certificates: Vec<String>,
}

/// Canonical roots blob plus its content address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRoots {
    pub pem: String,
    pub hash: RootsHash,
    /// Certificates present in `pem`
    pub certificate_count: usize,
    /// Certificates dropped as undecodable or not X.509
    pub skipped: usize,
}

impl CanonicalRoots {
    pub fn as_bytes(&self) -> &[u8] {
        self.pem.as_bytes()
    }
}

/// Canonicalize a raw get-roots document.
///
/// Fails only when the document itself is not valid JSON; a bad certificate
/// is logged and left out of the blob.
pub fn canonicalize(document: &[u8], origin: &str) -> Result<CanonicalRoots> {
    let response: GetRootsResponse = serde_json::from_slice(document)
        .with_context(|| format!("Failed to decode get-roots JSON from {}", origin))?;

    Ok(canonicalize_certificates(response.certificates, origin))
}

/// Canonicalize an already-parsed list of base64 DER certificates.
///
/// Entries that are not base64, or decode to something that is not an X.509
/// certificate, are logged and counted in `skipped`.
pub fn canonicalize_certificates(mut certificates: Vec<String>, origin: &str) -> CanonicalRoots {
    // Byte-wise order of the base64 text
    certificates.sort();

    let engine = base64::engine::general_purpose::STANDARD;

    let mut ders = Vec::with_capacity(certificates.len());
    let mut skipped = 0;

    for (i, b64_cert) in certificates.iter().enumerate() {
        let der = match engine.decode(b64_cert) {
            Ok(der) => der,
            Err(e) => {
                warn!("Error decoding certificate {} from {}: {}", i, origin, e);
                skipped += 1;
                continue;
            }
        };

        if let Err(e) = x509_parser::parse_x509_certificate(&der) {
            warn!("Certificate {} from {} is not valid X.509: {:?}", i, origin, e);
            skipped += 1;
            continue;
        }

        ders.push(der);
    }

    let pem_data = encode_pem(&ders);
    let hash = RootsHash::digest(pem_data.as_bytes());

    debug!(
        "Canonicalized {} certificates from {} ({} skipped) -> {}",
        ders.len(),
        origin,
        skipped,
        hash
    );

    CanonicalRoots {
        pem: pem_data,
        hash,
        certificate_count: ders.len(),
        skipped,
    }
}

/// Concatenated CERTIFICATE blocks, in the given order, with LF line endings
pub fn encode_pem(ders: &[Vec<u8>]) -> String {
    let mut pem_data = String::new();
    for der in ders {
        let config = pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF);
        pem_data.push_str(&pem::encode_config(&pem::Pem::new(PEM_TAG, der.clone()), config));
    }
    pem_data
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHA: &str = include_str!("../tests/fixtures/alpha.b64");
    const BETA: &str = include_str!("../tests/fixtures/beta.b64");
    const GAMMA: &str = include_str!("../tests/fixtures/gamma.b64");

    const TWO_BLOCKS_PEM: &str = "-----BEGIN CERTIFICATE-----\nQQ==\n-----END CERTIFICATE-----\n\
                                  -----BEGIN CERTIFICATE-----\nQg==\n-----END CERTIFICATE-----\n";

    fn fixtures(certs: &[&str]) -> Vec<String> {
        certs.iter().map(|c| c.trim().to_string()).collect()
    }

    fn decode(b64: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .unwrap()
    }

    #[test]
    fn test_encode_two_single_byte_blocks() {
        // "QQ==" and "Qg==" in sorted order
        let pem_data = encode_pem(&[vec![b'A'], vec![b'B']]);

        assert_eq!(pem_data, TWO_BLOCKS_PEM);
        assert_eq!(
            RootsHash::digest(pem_data.as_bytes()).to_hex(),
            "f3232796cbe742d4aaddf19012e572d272d77992fe97c752eecee80b20a9a8c8"
        );
    }

    #[test]
    fn test_order_independent() {
        let a = canonicalize_certificates(fixtures(&[ALPHA, BETA, GAMMA]), "a");
        let b = canonicalize_certificates(fixtures(&[GAMMA, ALPHA, BETA]), "b");
        assert_eq!(a.certificate_count, 3);
        assert_eq!(a.pem, b.pem);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_blocks_follow_base64_order() {
        let mut sorted = fixtures(&[GAMMA, BETA, ALPHA]);
        sorted.sort();

        let roots = canonicalize_certificates(fixtures(&[GAMMA, BETA, ALPHA]), "t");
        let blocks: Vec<Vec<u8>> = pem::parse_many(&roots.pem)
            .unwrap()
            .into_iter()
            .map(|p| p.into_contents())
            .collect();
        let expected: Vec<Vec<u8>> = sorted.iter().map(|b64| decode(b64)).collect();
        assert_eq!(blocks, expected);
    }

    #[test]
    fn test_bad_certificate_skipped() {
        let body = serde_json::json!({
            "certificates": [BETA.trim(), "!!not base64!!", ALPHA.trim()]
        })
        .to_string();
        let roots = canonicalize(body.as_bytes(), "t").unwrap();

        let expected = canonicalize_certificates(fixtures(&[ALPHA, BETA]), "t");
        assert_eq!(roots.pem, expected.pem);
        assert_eq!(roots.certificate_count, 2);
        assert_eq!(roots.skipped, 1);
    }

    #[test]
    fn test_non_certificate_skipped() {
        // Valid base64, but single bytes are not DER certificates
        let roots = canonicalize_certificates(
            vec!["QQ==".into(), ALPHA.trim().into(), "Qg==".into()],
            "t",
        );
        assert_eq!(roots.certificate_count, 1);
        assert_eq!(roots.skipped, 2);
        assert_eq!(roots.pem, encode_pem(&[decode(ALPHA)]));

        let only_junk = canonicalize(br#"{"certificates":["QQ==","Qg=="]}"#, "t").unwrap();
        assert!(only_junk.pem.is_empty());
        assert_eq!(only_junk.skipped, 2);
    }

    #[test]
    fn test_empty_list() {
        let roots = canonicalize(br#"{"certificates":[]}"#, "t").unwrap();
        assert!(roots.pem.is_empty());
        assert_eq!(roots.hash, RootsHash::digest(b""));

        let missing_field = canonicalize(b"{}", "t").unwrap();
        assert_eq!(missing_field, roots);
    }

    #[test]
    fn test_malformed_json() {
        assert!(canonicalize(b"<html>rate limited</html>", "t").is_err());
        assert!(canonicalize(b"", "t").is_err());
    }

    #[test]
    fn test_long_certificate_wrapped_at_64() {
        let der = decode(ALPHA);
        let roots = canonicalize_certificates(fixtures(&[ALPHA]), "t");

        let body: Vec<&str> = roots
            .pem
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        assert!(body.len() > 1);
        assert!(body[..body.len() - 1].iter().all(|l| l.len() == 64));
        assert!(!roots.pem.contains('\r'));

        let parsed = pem::parse(&roots.pem).unwrap();
        assert_eq!(parsed.contents(), der.as_slice());
    }
}
