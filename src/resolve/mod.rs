/*!
*  Resolving a tdw DID from its log
*
*  Resolution replays the log from genesis, enforcing at every step:
*
*  1. the genesis hash re-derives from the `{SCID}` sentinel form (the
*     DID is self-certifying),
*  2. `versionId` increments by exactly one,
*  3. `versionTime` strictly increases,
*  4. every entry hash recomputes from `(previous hash, patch)`,
*  5. every proof verifies, authorized by the document of the *previous*
*     version (genesis: by its own initial keys).
*
*  Resolution is fail-stop: the first invalid entry aborts the whole
*  operation. Returning the last good prefix would hand an attacker a
*  truncation lever.
*/

use crate::{
    DIDTdwError, PROTOCOL, SCID_HOLDER,
    document::DIDDocument,
    log_entry::{DIDLog, LogEntry, MetaData, Patch, compute_entry_hash},
    proof::verify_proof,
    url::TdwDid,
};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

pub mod controller;

use controller::ControllerResolver;

/// Outcome of a successful resolution
#[derive(Clone, Debug)]
pub struct ResolutionResult {
    /// The DID string of the resolved version (a domain migration changes
    /// it; the SCID segment never does)
    pub did: String,

    /// The reconstructed document
    pub document: DIDDocument,

    /// Version metadata for the resolved state
    pub metadata: MetaData,
}

/// Resolve a log to its document and metadata.
///
/// `at_version` selects a historical version; the default is the latest.
/// Only entries up to the target version are replayed, so a valid prefix
/// of a valid log always resolves.
pub async fn resolve_did(
    log: &DIDLog,
    at_version: Option<u32>,
    controllers: &dyn ControllerResolver,
) -> Result<ResolutionResult, DIDTdwError> {
    let genesis = log.genesis()?;

    let target = match at_version {
        Some(version) => {
            let version = usize::try_from(version).map_err(|_| DIDTdwError::NotFound)?;
            if version == 0 || version > log.entries.len() {
                return Err(DIDTdwError::NotFound);
            }
            version
        }
        None => log.entries.len(),
    };

    let mut document = verify_genesis(genesis)?;
    verify_proof(&document, &document, &genesis.proof, controllers).await?;
    debug!("Genesis entry verified for SCID {}", genesis.entry_hash);

    let mut previous = genesis;
    for entry in &log.entries[1..target] {
        document = verify_entry(entry, previous, &document, controllers).await?;
        previous = entry;
    }

    let deactivated = !document.has_authentication();
    if deactivated {
        warn!("DID ({}) is deactivated", document.id);
    }

    let metadata = MetaData {
        version_id: previous.version_id,
        version_time: previous.version_time_string(),
        created: genesis.version_time_string(),
        updated: previous.version_time_string(),
        scid: genesis.entry_hash.clone(),
        deactivated,
    };

    Ok(ResolutionResult {
        did: document.id.clone(),
        document,
        metadata,
    })
}

/// Resolve the version that was active at a given time
pub async fn resolve_did_at_time(
    log: &DIDLog,
    at_time: DateTime<FixedOffset>,
    controllers: &dyn ControllerResolver,
) -> Result<ResolutionResult, DIDTdwError> {
    let mut version = None;
    for entry in &log.entries {
        if entry.version_time <= at_time {
            version = Some(entry.version_id);
        } else {
            break;
        }
    }
    let Some(version) = version else {
        return Err(DIDTdwError::NotFound);
    };
    resolve_did(log, Some(version), controllers).await
}

/// Checks the genesis entry's structure and self-certifying hash,
/// returning the initial document
fn verify_genesis(genesis: &LogEntry) -> Result<DIDDocument, DIDTdwError> {
    if genesis.version_id != 1 {
        return Err(DIDTdwError::VersionGap(format!(
            "First LogEntry must have version ID 1, got {}",
            genesis.version_id
        )));
    }

    let Some(scid) = &genesis.patch.scid else {
        return Err(DIDTdwError::InvalidState(
            "Genesis entry has no SCID".to_string(),
        ));
    };
    match &genesis.patch.method {
        Some(method) if method == PROTOCOL => {}
        Some(method) => {
            return Err(DIDTdwError::InvalidState(format!(
                "Unsupported log format ({method}), must be {PROTOCOL}"
            )));
        }
        None => {
            return Err(DIDTdwError::InvalidState(
                "Genesis entry has no method".to_string(),
            ));
        }
    }

    // The genesis hash is the SCID itself
    if genesis.entry_hash != *scid {
        return Err(DIDTdwError::SCIDMismatch(format!(
            "Genesis entry hash ({}) does not equal the SCID ({scid})",
            genesis.entry_hash
        )));
    }
    // And the DID string must carry it
    if TdwDid::parse(&genesis.patch.document.id)?.scid != *scid {
        return Err(DIDTdwError::SCIDMismatch(format!(
            "DID ({}) does not carry the SCID ({scid})",
            genesis.patch.document.id
        )));
    }

    // Re-derive the hash from the sentinel form of the patch
    let patch_text = serde_json::to_string(&genesis.patch).map_err(|e| {
        DIDTdwError::LogEntryError(format!("Couldn't serialize genesis patch. Reason: {e}"))
    })?;
    let sentinel_patch: Patch = serde_json::from_str(&patch_text.replace(scid, SCID_HOLDER))
        .map_err(|e| {
            DIDTdwError::LogEntryError(format!(
                "Couldn't deserialize sentinel form of genesis patch. Reason: {e}"
            ))
        })?;
    let derived = compute_entry_hash("", &sentinel_patch)?;
    if derived != *scid {
        return Err(DIDTdwError::SCIDMismatch(format!(
            "SCID ({scid}) does not match calculated SCID ({derived})"
        )));
    }

    Ok(genesis.patch.document.clone())
}

/// Verifies one non-genesis entry against its predecessor and returns
/// the new document state
async fn verify_entry(
    entry: &LogEntry,
    previous: &LogEntry,
    previous_doc: &DIDDocument,
    controllers: &dyn ControllerResolver,
) -> Result<DIDDocument, DIDTdwError> {
    debug!("Verifying LogEntry: {}", entry.version_id);

    if entry.version_id != previous.version_id + 1 {
        return Err(DIDTdwError::VersionGap(format!(
            "Current LogEntry version ID ({}) must be one greater than previous version ID ({})",
            entry.version_id, previous.version_id
        )));
    }
    if entry.version_time <= previous.version_time {
        return Err(DIDTdwError::TimeRegression(format!(
            "Current versionTime ({}) must be greater than previous versionTime ({})",
            entry.version_time_string(),
            previous.version_time_string()
        )));
    }
    if entry.patch.is_genesis() {
        return Err(DIDTdwError::InvalidState(format!(
            "Entry {} carries genesis-only patch fields",
            entry.version_id
        )));
    }

    entry.verify_entry_hash(&previous.entry_hash)?;

    // The new state must verify under the keys of the previous state
    let document = entry.patch.document.clone();
    verify_proof(&document, previous_doc, &entry.proof, controllers).await?;

    Ok(document)
}
