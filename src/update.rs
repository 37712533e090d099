/*!
*   Library API for updating an existing tdw DID.
*
*   An update appends one entry: the full new document state, chained to
*   the previous entry by hash and signed by a key the *previous* document
*   authorizes. Deactivation is an ordinary update whose new document
*   carries no verification material; once a log is deactivated no
*   further updates are accepted.
*/

use crate::{
    DIDTdwError,
    create::DIDOperationResult,
    document::{DIDDocument, Service, VerificationMethodInput, VerificationRole, build_document},
    log_entry::{
        DIDLog, LogEntry, MetaData, Patch, compute_entry_hash, format_timestamp, round_to_millis,
    },
    proof::sign_document,
    resolve::{controller::ControllerResolver, resolve_did},
    secrets::Secret,
    url::TdwDid,
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::debug;

/// Configuration for updating a DID.
///
/// Every field is `Option`-valued: `None` keeps the corresponding field
/// of the previous document, `Some(v)` replaces it wholesale.
#[derive(Clone, Debug, Default)]
pub struct UpdateDIDOptions {
    /// Replacement key material (the complete new set)
    pub vms: Option<Vec<VerificationMethodInput>>,

    /// Replacement service endpoints
    pub services: Option<Vec<Service>>,

    /// Replacement extra contexts
    pub contexts: Option<Vec<String>>,

    /// Replacement controller DIDs
    pub controllers: Option<Vec<String>>,

    /// Replacement `alsoKnownAs` aliases
    pub also_known_as: Option<Vec<String>>,

    /// Move the DID to a new domain (changes the DID string, the SCID
    /// segment is invariant)
    pub domain: Option<String>,

    /// Entry timestamp; must be strictly greater than the previous
    /// entry's. Defaults to now, clamped forward by one millisecond when
    /// the wall clock has not advanced.
    pub version_time: Option<DateTime<FixedOffset>>,
}

/// Append an update entry to a log.
///
/// The log is fully resolved (and therefore verified) first; the signer
/// must hold an authentication key of the current document.
pub async fn update_did(
    log: &DIDLog,
    options: UpdateDIDOptions,
    signer: &Secret,
    controllers: &dyn ControllerResolver,
) -> Result<DIDOperationResult, DIDTdwError> {
    let current = resolve_did(log, None, controllers).await?;
    if current.metadata.deactivated {
        return Err(DIDTdwError::InvalidState(format!(
            "DID ({}) is deactivated and can no longer be updated",
            current.did
        )));
    }

    let scid = log.scid()?;
    let previous_entry = log.last()?;
    let previous_doc = &current.document;

    let domain = match options.domain {
        Some(domain) => Some(domain),
        None => TdwDid::parse(&current.did)?.domain,
    };

    let vms = options
        .vms
        .unwrap_or_else(|| inputs_from_document(previous_doc));
    let services = options
        .services
        .unwrap_or_else(|| carried_services(previous_doc));
    let contexts = options.contexts.unwrap_or_else(|| {
        // The base DID context is re-added by the builder
        previous_doc.context.iter().skip(1).cloned().collect()
    });
    let doc_controllers = options
        .controllers
        .or_else(|| previous_doc.controller.clone())
        .unwrap_or_default();
    let also_known_as = options
        .also_known_as
        .or_else(|| previous_doc.also_known_as.clone())
        .unwrap_or_default();

    let new_doc = build_document(
        &scid,
        domain.as_deref(),
        &vms,
        &services,
        &contexts,
        &doc_controllers,
        &also_known_as,
    )?;

    let version_time = next_version_time(options.version_time, &previous_entry.version_time)?;

    let patch = Patch::update(new_doc);
    let entry_hash = compute_entry_hash(&previous_entry.entry_hash, &patch)?;
    debug!(
        "Appending version {} with hash {entry_hash}",
        previous_entry.version_id + 1
    );

    // The signing key is authorized by the previous document, which is
    // what lets a single entry rotate the sole key or deactivate the DID
    let proof = sign_document(&patch.document, previous_doc, signer, &version_time)?;

    let document = patch.document.clone();
    let entry = LogEntry {
        entry_hash,
        version_id: previous_entry.version_id + 1,
        version_time,
        patch,
        proof,
    };

    let mut log = log.clone();
    log.entries.push(entry);

    let metadata = MetaData {
        version_id: previous_entry.version_id + 1,
        version_time: format_timestamp(&version_time),
        created: current.metadata.created,
        updated: format_timestamp(&version_time),
        scid,
        deactivated: !document.has_authentication(),
    };

    Ok(DIDOperationResult {
        did: document.id.clone(),
        document,
        metadata,
        log,
    })
}

/// Deactivate a DID: append an update whose document carries no
/// verification material. Resolvers recognize the result as terminal.
pub async fn deactivate_did(
    log: &DIDLog,
    signer: &Secret,
    controllers: &dyn ControllerResolver,
) -> Result<DIDOperationResult, DIDTdwError> {
    update_did(
        log,
        UpdateDIDOptions {
            vms: Some(Vec::new()),
            ..Default::default()
        },
        signer,
        controllers,
    )
    .await
}

/// Picks and validates the timestamp for a new entry
fn next_version_time(
    requested: Option<DateTime<FixedOffset>>,
    previous: &DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, DIDTdwError> {
    if let Some(requested) = requested {
        let requested = round_to_millis(requested);
        if requested <= *previous {
            return Err(DIDTdwError::TimeRegression(format!(
                "versionTime ({}) must be greater than the previous entry's ({})",
                format_timestamp(&requested),
                format_timestamp(previous)
            )));
        }
        return Ok(requested);
    }

    let now = round_to_millis(Utc::now().fixed_offset());
    if now <= *previous {
        // Wall clock has not advanced past the log; clamp forward
        Ok(*previous + Duration::milliseconds(1))
    } else {
        Ok(now)
    }
}

/// Reconstructs builder inputs from an existing document so unchanged
/// key material carries over to the next version
fn inputs_from_document(document: &DIDDocument) -> Vec<VerificationMethodInput> {
    let mut inputs = Vec::new();
    for role in VerificationRole::ALL {
        let Some(entries) = document.role_array(role) else {
            continue;
        };
        for entry in entries {
            if let Some(vm) = document.find_verification_method(entry.id()) {
                inputs.push(VerificationMethodInput {
                    role,
                    public_key_multibase: vm.public_key_multibase.clone(),
                    controller: if vm.controller == document.id {
                        None
                    } else {
                        Some(vm.controller.clone())
                    },
                });
            }
        }
    }
    inputs
}

/// Carries services forward, re-relativizing IDs rooted in the current
/// DID so a domain move re-derives them against the new DID
fn carried_services(document: &DIDDocument) -> Vec<Service> {
    document
        .service
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|mut service| {
            if let Some(fragment) = service.id.strip_prefix(&document.id) {
                service.id = fragment.to_string();
            }
            service
        })
        .collect()
}
