/*!
*   Library API for creating a new tdw DID.
*
*   Creation is where the DID becomes self-certifying: the genesis entry
*   is first assembled around the `{SCID}` sentinel, hashed, and then the
*   sentinel is substituted with the resulting hash everywhere it appears.
*   The DID string therefore proves its own genesis state.
*/

use crate::{
    DIDTdwError, SCID_HOLDER,
    document::{Service, VerificationMethodInput, VerificationRole, build_document},
    log_entry::{
        DIDLog, LogEntry, MetaData, Patch, compute_entry_hash, format_timestamp, round_to_millis,
    },
    proof::sign_document,
    secrets::Secret,
};
use crate::document::DIDDocument;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

/// Configuration for creating a new DID
#[derive(Clone, Debug, Default)]
pub struct CreateDIDOptions {
    /// Key material for the initial document. At least one entry must
    /// carry the `authentication` role.
    pub vms: Vec<VerificationMethodInput>,

    /// DNS domain to bind into the DID string
    pub domain: Option<String>,

    /// Initial service endpoints
    pub services: Vec<Service>,

    /// Extra JSON-LD contexts, appended after the base DID context
    pub contexts: Vec<String>,

    /// Additional controller DIDs
    pub controllers: Vec<String>,

    /// `alsoKnownAs` aliases
    pub also_known_as: Vec<String>,

    /// Entry timestamp; defaults to now. Supplying it makes creation
    /// fully deterministic.
    pub version_time: Option<DateTime<FixedOffset>>,
}

/// Result of a create, update or deactivate operation
#[derive(Clone, Debug)]
pub struct DIDOperationResult {
    /// The DID identifier (with SCID substituted)
    pub did: String,

    /// The document state after this operation
    pub document: DIDDocument,

    /// Version metadata for this operation
    pub metadata: MetaData,

    /// The full log including the new entry (serialize to JSONL for
    /// persistence)
    pub log: DIDLog,
}

/// Create a new DID, producing a log of length 1.
///
/// The signer's public key must appear among the `authentication` inputs;
/// the genesis proof is verified against the genesis document itself.
pub fn create_did(
    options: CreateDIDOptions,
    signer: &Secret,
) -> Result<DIDOperationResult, DIDTdwError> {
    if !options
        .vms
        .iter()
        .any(|vm| vm.role == VerificationRole::Authentication)
    {
        return Err(DIDTdwError::InvalidState(
            "Creating a DID requires at least one authentication key".to_string(),
        ));
    }

    let version_time = round_to_millis(
        options
            .version_time
            .unwrap_or_else(|| Utc::now().fixed_offset()),
    );

    // Assemble the genesis state around the SCID sentinel. The DID is not
    // known yet: it depends on the hash of this very state.
    let placeholder_doc = build_document(
        SCID_HOLDER,
        options.domain.as_deref(),
        &options.vms,
        &options.services,
        &options.contexts,
        &options.controllers,
        &options.also_known_as,
    )?;
    let placeholder_patch = Patch::genesis(SCID_HOLDER, placeholder_doc);

    // The hash of the sentinel form is the self-certifying identifier
    let scid = compute_entry_hash("", &placeholder_patch)?;
    debug!("Derived SCID: {scid}");

    // Substitute the sentinel with the SCID everywhere it appears
    let patch_text = serde_json::to_string(&placeholder_patch).map_err(|e| {
        DIDTdwError::LogEntryError(format!("Couldn't serialize genesis patch. Reason: {e}"))
    })?;
    let patch: Patch = serde_json::from_str(&patch_text.replace(SCID_HOLDER, &scid))
        .map_err(|e| {
            DIDTdwError::LogEntryError(format!(
                "Couldn't deserialize genesis patch after SCID substitution. Reason: {e}"
            ))
        })?;

    // The genesis proof is authorized by the genesis document itself
    let proof = sign_document(&patch.document, &patch.document, signer, &version_time)?;

    let document = patch.document.clone();
    let entry = LogEntry {
        entry_hash: scid.clone(),
        version_id: 1,
        version_time,
        patch,
        proof,
    };

    let timestamp = format_timestamp(&version_time);
    let metadata = MetaData {
        version_id: 1,
        version_time: timestamp.clone(),
        created: timestamp.clone(),
        updated: timestamp,
        scid,
        deactivated: false,
    };

    Ok(DIDOperationResult {
        did: document.id.clone(),
        document,
        metadata,
        log: DIDLog {
            entries: vec![entry],
        },
    })
}
