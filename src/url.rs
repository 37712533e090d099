//! `did:tdw` identifier syntax
//!
//! ```text
//! did:tdw:<scid>[:<domain-colon-encoded>]
//! ```
//!
//! The optional DNS domain is carried with its dots replaced by colons
//! (`migrated.example.com` becomes `migrated:example:com`).

use crate::{DIDTdwError, ENTRY_HASH_LENGTH, METHOD};
use std::fmt::{Display, Formatter};
use url::Url;

/// Breakdown of a tdw DID into its components
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TdwDid {
    /// Self Certifying IDentifier (SCID)
    pub scid: String,

    /// DNS domain bound to this DID, in dotted form
    pub domain: Option<String>,
}

impl TdwDid {
    /// Parses a `did:tdw` string into its components
    pub fn parse(did: &str) -> Result<TdwDid, DIDTdwError> {
        let method_prefix = ["did:", METHOD, ":"].concat();
        let Some(identifier) = did.strip_prefix(method_prefix.as_str()) else {
            return Err(DIDTdwError::DIDError(format!(
                "DID ({did}) is not a did:{METHOD} DID"
            )));
        };

        let (scid, domain) = match identifier.split_once(':') {
            Some((scid, domain)) => (scid, Some(decode_domain(domain))),
            None => (identifier, None),
        };

        if scid.len() != ENTRY_HASH_LENGTH || !scid.starts_with('z') {
            return Err(DIDTdwError::DIDError(format!(
                "DID ({did}) SCID segment must be {ENTRY_HASH_LENGTH} multibase characters"
            )));
        }
        if let Some(domain) = &domain {
            validate_domain(domain)?;
        }

        Ok(TdwDid {
            scid: scid.to_string(),
            domain,
        })
    }
}

impl Display for TdwDid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.domain {
            Some(domain) => write!(
                f,
                "did:{METHOD}:{}:{}",
                self.scid,
                encode_domain(domain)
            ),
            None => write!(f, "did:{METHOD}:{}", self.scid),
        }
    }
}

/// Replaces dots with colons for embedding a domain in a DID
pub fn encode_domain(domain: &str) -> String {
    domain.replace('.', ":")
}

/// Restores a colon-encoded domain to dotted form
pub fn decode_domain(encoded: &str) -> String {
    encoded.replace(':', ".")
}

/// Builds the DID string for an SCID and optional domain.
/// Used with the `{SCID}` sentinel while deriving the genesis hash, so the
/// SCID segment itself is not validated here.
pub fn format_did(scid: &str, domain: Option<&str>) -> Result<String, DIDTdwError> {
    match domain {
        Some(domain) => {
            validate_domain(domain)?;
            Ok(format!("did:{METHOD}:{scid}:{}", encode_domain(domain)))
        }
        None => Ok(format!("did:{METHOD}:{scid}")),
    }
}

/// Ensures a caller-supplied domain is a bare DNS name
fn validate_domain(domain: &str) -> Result<(), DIDTdwError> {
    let parsed = Url::parse(&format!("https://{domain}/"))
        .map_err(|e| DIDTdwError::DIDError(format!("Invalid domain ({domain}): {e}")))?;
    if parsed.host_str() != Some(domain) || parsed.port().is_some() {
        return Err(DIDTdwError::DIDError(format!(
            "Invalid domain ({domain}): must be a bare DNS name"
        )));
    }
    Ok(())
}
