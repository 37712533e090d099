/*!
*   DID method for the Web with a self-certifying, verifiable update history
*
*   A `did:tdw` DID binds an identifier (and optionally a DNS domain) to a
*   DID Document whose entire history is an append-only log of hash-chained,
*   signed entries. Given only the log, any party can replay it from genesis
*   and verify every version of the document.
*
*   ```no_run
*   use didtdw_rs::prelude::*;
*
*   # fn main() -> Result<(), DIDTdwError> {
*   let secret = Secret::generate();
*   let options = CreateDIDOptions {
*       vms: vec![VerificationMethodInput {
*           role: VerificationRole::Authentication,
*           public_key_multibase: secret.public_key_multibase(),
*           controller: None,
*       }],
*       domain: Some("example.com".to_string()),
*       ..Default::default()
*   };
*   let created = create_did(options, &secret)?;
*   println!("{}", created.did);
*   # Ok(())
*   # }
*   ```
*/

use thiserror::Error;

pub mod canonical;
pub mod create;
pub mod document;
pub mod log_entry;
pub mod prelude;
pub mod proof;
pub mod resolve;
pub mod secrets;
pub mod update;
pub mod url;

/// Short method identifier: DIDs read `did:tdw:...`
pub const METHOD: &str = "tdw";

/// Log-format version string carried in the genesis entry's `method` field
pub const PROTOCOL: &str = "did:tdw:1";

/// Magic string used while deriving the SCID for the first LogEntry
pub const SCID_HOLDER: &str = "{SCID}";

/// Number of multibase characters in an entry hash (and therefore the SCID)
pub const ENTRY_HASH_LENGTH: usize = 24;

/// Error types for the tdw method
#[derive(Error, Debug)]
pub enum DIDTdwError {
    /// Unknown JSON-LD context URL in a document being canonicalized
    #[error("ContextResolution: unknown JSON-LD context: {0}")]
    ContextResolution(String),
    /// Proof declares a cryptosuite this crate does not implement
    #[error("CryptosuiteUnsupported: {0}")]
    CryptosuiteUnsupported(String),
    #[error("DIDError: {0}")]
    DIDError(String),
    /// An entry hash does not recompute from (previous hash, patch)
    #[error("HashMismatch: {0}")]
    HashMismatch(String),
    /// Update attempted on a deactivated log, create without an
    /// authentication key, or a structurally invalid log
    #[error("InvalidState: {0}")]
    InvalidState(String),
    #[error("KeyError: {0}")]
    KeyError(String),
    #[error("LogEntryError: {0}")]
    LogEntryError(String),
    /// DID Query NotFound
    #[error("DID Query NotFound")]
    NotFound,
    /// A proof signature fails verification
    #[error("ProofInvalid: {0}")]
    ProofInvalid(String),
    /// Genesis hash does not match the derived self-certifying identifier
    #[error("SCIDMismatch: {0}")]
    SCIDMismatch(String),
    /// `versionTime` not strictly increasing across the log
    #[error("TimeRegression: {0}")]
    TimeRegression(String),
    /// Signing key not present in the correct role array of the target document
    #[error("UnauthorizedKey: {0}")]
    UnauthorizedKey(String),
    /// A proof's `verificationMethod` cannot be resolved
    #[error("UnknownVerificationMethod: {0}")]
    UnknownVerificationMethod(String),
    /// Non-sequential `versionId`
    #[error("VersionGap: {0}")]
    VersionGap(String),
}
