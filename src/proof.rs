/*!
*  Data Integrity proofs over DID Documents
*
*  A proof binds an Ed25519 signature to the JCS-canonical form of a
*  document plus the proof's own options:
*
*  ```text
*  verifyData = sha256(jcs(proof-options)) || sha256(jcs(document))
*  ```
*
*  Signing and verification take two documents: the one the proof covers,
*  and the one whose role arrays authorize the signing key. For a genesis
*  entry they are the same document; for an update the authorizing
*  document is the previous version, which is what makes key rotation and
*  deactivation possible in a single entry.
*/

use crate::{
    DIDTdwError,
    canonical::{canonicalize, canonicalize_proof_options, hash, multibase_decode, multibase_encode},
    document::{DIDDocument, VerificationMethod, VerificationRole},
    log_entry::format_timestamp,
    resolve::controller::ControllerResolver,
    secrets::{Secret, verify_signature},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::debug;

pub const PROOF_TYPE_DATA_INTEGRITY: &str = "DataIntegrityProof";
pub const CRYPTOSUITE_EDDSA_JCS_2022: &str = "eddsa-jcs-2022";

/// A Data Integrity proof as attached to a log entry
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityProof {
    #[serde(rename = "type")]
    pub proof_type: String,

    pub cryptosuite: String,

    /// RFC-3339 timestamp; kept as a string so re-canonicalization
    /// reproduces the signer's exact bytes
    pub created: String,

    /// ID of the verification method that authorizes this proof
    pub verification_method: String,

    pub proof_purpose: String,

    /// Multibase-encoded signature; absent only while the options are
    /// being signed
    pub proof_value: Option<String>,
}

impl DataIntegrityProof {
    /// The 64-byte signing input over a document and these proof options
    fn verify_data(&self, document: &DIDDocument) -> Result<Vec<u8>, DIDTdwError> {
        let options_hash = hash(&canonicalize_proof_options(self)?);
        let document_hash = hash(&canonicalize(document)?);
        Ok([options_hash, document_hash].concat())
    }
}

/// Signs `document` with an authentication key of `authorizing`.
///
/// The signer's public key must back a verification method listed in the
/// authorizing document's `authentication` array, otherwise
/// [`DIDTdwError::UnauthorizedKey`] is returned.
pub fn sign_document(
    document: &DIDDocument,
    authorizing: &DIDDocument,
    signer: &Secret,
    created: &DateTime<FixedOffset>,
) -> Result<DataIntegrityProof, DIDTdwError> {
    let public_key = signer.public_key_multibase();
    let Some(method) = authorizing.authentication_method_for(&public_key) else {
        return Err(DIDTdwError::UnauthorizedKey(format!(
            "Signing key ({public_key}) is not an authentication key of {}",
            authorizing.id
        )));
    };

    let mut proof = DataIntegrityProof {
        proof_type: PROOF_TYPE_DATA_INTEGRITY.to_string(),
        cryptosuite: CRYPTOSUITE_EDDSA_JCS_2022.to_string(),
        created: format_timestamp(created),
        verification_method: method.id.clone(),
        proof_purpose: VerificationRole::Authentication.as_str().to_string(),
        proof_value: None,
    };

    let signature = signer.sign(&proof.verify_data(document)?);
    proof.proof_value = Some(multibase_encode(&signature));
    Ok(proof)
}

/// Verifies a proof over `document`, with key authorization taken from
/// `authorizing`.
///
/// The proof's verification method is resolved from the authorizing
/// document, or through the controller-resolver hook when it belongs to
/// an external DID.
pub async fn verify_proof(
    document: &DIDDocument,
    authorizing: &DIDDocument,
    proof: &DataIntegrityProof,
    controllers: &dyn ControllerResolver,
) -> Result<(), DIDTdwError> {
    if proof.proof_type != PROOF_TYPE_DATA_INTEGRITY {
        return Err(DIDTdwError::CryptosuiteUnsupported(format!(
            "Unsupported proof type: {}",
            proof.proof_type
        )));
    }
    if proof.cryptosuite != CRYPTOSUITE_EDDSA_JCS_2022 {
        return Err(DIDTdwError::CryptosuiteUnsupported(format!(
            "Unsupported cryptosuite: {}",
            proof.cryptosuite
        )));
    }

    let Some(role) = VerificationRole::from_purpose(&proof.proof_purpose) else {
        return Err(DIDTdwError::ProofInvalid(format!(
            "Unknown proofPurpose: {}",
            proof.proof_purpose
        )));
    };

    let method = resolve_verification_method(authorizing, &proof.verification_method, controllers)
        .await?;

    // The key must be listed in the role array matching the proof purpose
    if !authorizing.is_authorized(role, &method.id) {
        return Err(DIDTdwError::UnauthorizedKey(format!(
            "Verification method ({}) is not in the {} role array of {}",
            method.id,
            proof.proof_purpose,
            authorizing.id
        )));
    }

    let Some(proof_value) = &proof.proof_value else {
        return Err(DIDTdwError::ProofInvalid(
            "Proof is missing a proofValue".to_string(),
        ));
    };
    let signature = multibase_decode(proof_value)
        .map_err(|e| DIDTdwError::ProofInvalid(format!("Malformed proofValue: {e}")))?;

    verify_signature(
        &method.public_key_multibase,
        &proof.verify_data(document)?,
        &signature,
    )?;

    debug!("Proof by {} verified", proof.verification_method);
    Ok(())
}

/// Resolves a proof's verification method, locally or through the
/// external-controller hook
async fn resolve_verification_method(
    authorizing: &DIDDocument,
    vm_id: &str,
    controllers: &dyn ControllerResolver,
) -> Result<VerificationMethod, DIDTdwError> {
    if let Some(method) = authorizing.find_verification_method(vm_id) {
        return Ok(method.clone());
    }

    // A VM this document doesn't define must belong to an external controller
    let Some((controller_did, _)) = vm_id.split_once('#') else {
        return Err(DIDTdwError::UnknownVerificationMethod(format!(
            "Verification method ({vm_id}) is not defined by {}",
            authorizing.id
        )));
    };
    if controller_did == authorizing.id {
        return Err(DIDTdwError::UnknownVerificationMethod(format!(
            "Verification method ({vm_id}) is not defined by {}",
            authorizing.id
        )));
    }

    debug!("Resolving external controller: {controller_did}");
    let controller_doc = controllers.resolve(controller_did).await?;
    controller_doc
        .find_verification_method(vm_id)
        .cloned()
        .ok_or_else(|| {
            DIDTdwError::UnknownVerificationMethod(format!(
                "Controller ({controller_did}) does not define {vm_id}"
            ))
        })
}
