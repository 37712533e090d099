/*!
*  Canonicalization and hashing primitives
*
*  Everything that gets hashed or signed in a tdw log is first reduced to
*  JCS (RFC 8785) canonical form, so that semantically equivalent JSON
*  produces byte-identical input to SHA-256 regardless of serializer.
*
*  Documents are JSON-LD: before canonicalizing, every `@context` URL in
*  the value is checked against a process-wide read-only table of contexts
*  this crate bundles. No network I/O ever happens here.
*/

use crate::DIDTdwError;
use ahash::HashSet;
use multibase::Base;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Base DID context, always first in a document's `@context`
pub const CONTEXT_DID_V1: &str = "https://www.w3.org/ns/did/v1";

/// JSON-LD contexts that resolve without network I/O.
/// Anything outside this table fails with [`DIDTdwError::ContextResolution`].
pub const KNOWN_CONTEXTS: &[&str] = &[
    CONTEXT_DID_V1,
    "https://w3id.org/security/suites/ed25519-2020/v1",
    "https://w3id.org/security/v1",
    "https://w3id.org/security/v2",
    "https://w3id.org/security/multikey/v1",
    "https://w3id.org/security/data-integrity/v2",
    "https://identity.foundation/linked-vp/contexts/v1",
    "https://didcomm.org/messaging/contexts/v2",
];

static CONTEXT_TABLE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| KNOWN_CONTEXTS.iter().copied().collect());

/// Checks every `@context` URL found anywhere in `value` against the
/// bundled context table.
pub fn ensure_known_contexts(value: &Value) -> Result<(), DIDTdwError> {
    match value {
        Value::Object(map) => {
            if let Some(contexts) = map.get("@context") {
                check_context_value(contexts)?;
            }
            for entry in map.values() {
                ensure_known_contexts(entry)?;
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                ensure_known_contexts(entry)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_context_value(contexts: &Value) -> Result<(), DIDTdwError> {
    match contexts {
        Value::String(url) => {
            if !CONTEXT_TABLE.contains(url.as_str()) {
                return Err(DIDTdwError::ContextResolution(url.to_string()));
            }
        }
        Value::Array(urls) => {
            for url in urls {
                check_context_value(url)?;
            }
        }
        // Inline context objects carry their own definitions, nothing to resolve
        Value::Object(_) => {}
        _ => {
            return Err(DIDTdwError::ContextResolution(format!(
                "@context must be a string or array, got: {contexts}"
            )));
        }
    }
    Ok(())
}

/// Produces the canonical byte serialization of a JSON-LD value.
pub fn canonicalize<T: Serialize>(value: &T) -> Result<Vec<u8>, DIDTdwError> {
    let value = serde_json::to_value(value).map_err(|e| {
        DIDTdwError::LogEntryError(format!("Couldn't convert value to JSON. Reason: {e}"))
    })?;
    ensure_known_contexts(&value)?;
    let jcs = serde_json_canonicalizer::to_string(&value).map_err(|e| {
        DIDTdwError::LogEntryError(format!("Couldn't generate JCS form. Reason: {e}"))
    })?;
    Ok(jcs.into_bytes())
}

/// Canonicalizes a proof-options object, stripping any signature outputs
/// (`jws`, `signatureValue`, `proofValue`) first. These are produced over
/// the options, so they can never be part of them.
pub fn canonicalize_proof_options<T: Serialize>(proof: &T) -> Result<Vec<u8>, DIDTdwError> {
    let mut value = serde_json::to_value(proof).map_err(|e| {
        DIDTdwError::LogEntryError(format!("Couldn't convert proof to JSON. Reason: {e}"))
    })?;
    if let Some(map) = value.as_object_mut() {
        map.remove("jws");
        map.remove("signatureValue");
        map.remove("proofValue");
    }
    canonicalize(&value)
}

/// SHA-256
pub fn hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Multibase-encodes bytes as base58btc with the `z` prefix
pub fn multibase_encode(bytes: &[u8]) -> String {
    multibase::encode(Base::Base58Btc, bytes)
}

/// Decodes a multibase string back to bytes
pub fn multibase_decode(input: &str) -> Result<Vec<u8>, DIDTdwError> {
    let (_, bytes) = multibase::decode(input)
        .map_err(|e| DIDTdwError::KeyError(format!("Invalid multibase string: {e}")))?;
    Ok(bytes)
}

/// Canonicalize, hash and encode a hash-input value, truncated to the
/// fixed entry-hash length. The genesis hash produced this way doubles as
/// the DID's SCID segment.
pub fn entry_hash<T: Serialize>(value: &T) -> Result<String, DIDTdwError> {
    let digest = hash(&canonicalize(value)?);
    let mut encoded = multibase_encode(&digest);
    encoded.truncate(crate::ENTRY_HASH_LENGTH);
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalize_sorts_keys() {
        let value = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let jcs = canonicalize(&value).unwrap();
        assert_eq!(jcs, br#"{"a":{"c":3,"d":2},"b":1}"#.to_vec());
    }

    #[test]
    fn canonicalize_known_context_ok() {
        let value = json!({"@context": [CONTEXT_DID_V1], "id": "did:tdw:xyz"});
        assert!(canonicalize(&value).is_ok());
    }

    #[test]
    fn canonicalize_unknown_context_fails() {
        let value = json!({"@context": ["https://example.com/unknown/v1"]});
        let result = canonicalize(&value);
        assert!(matches!(result, Err(DIDTdwError::ContextResolution(_))));
    }

    #[test]
    fn nested_context_is_checked() {
        let value = json!({
            "@context": [CONTEXT_DID_V1],
            "service": [{"@context": "https://example.com/service/v9"}]
        });
        assert!(matches!(
            canonicalize(&value),
            Err(DIDTdwError::ContextResolution(_))
        ));
    }

    #[test]
    fn proof_options_strip_signature_outputs() {
        let with_value = json!({"type": "DataIntegrityProof", "proofValue": "zabc"});
        let without = json!({"type": "DataIntegrityProof"});
        assert_eq!(
            canonicalize_proof_options(&with_value).unwrap(),
            canonicalize(&without).unwrap()
        );
    }

    #[test]
    fn entry_hash_is_multibase_and_fixed_length() {
        let hashed = entry_hash(&json!(["", {"key": "value"}])).unwrap();
        assert!(hashed.starts_with('z'));
        assert_eq!(hashed.len(), crate::ENTRY_HASH_LENGTH);
    }

    #[test]
    fn entry_hash_is_deterministic() {
        let a = entry_hash(&json!({"b": 1, "a": 2})).unwrap();
        let b = entry_hash(&json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(a, b);
    }
}
