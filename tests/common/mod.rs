use chrono::{DateTime, FixedOffset};
use didtdw_rs::prelude::*;
use didtdw_rs::secrets::{KeyCodec, encode_multikey};
use serde_json::json;

/// Route crate tracing output through `RUST_LOG` when debugging a test
#[allow(dead_code)]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[allow(dead_code)]
pub fn auth_vm(secret: &Secret) -> VerificationMethodInput {
    VerificationMethodInput {
        role: VerificationRole::Authentication,
        public_key_multibase: secret.public_key_multibase(),
        controller: None,
    }
}

#[allow(dead_code)]
pub fn assertion_vm(secret: &Secret) -> VerificationMethodInput {
    VerificationMethodInput {
        role: VerificationRole::AssertionMethod,
        public_key_multibase: secret.public_key_multibase(),
        controller: None,
    }
}

/// An X25519 key-agreement input (key material only, no signing ability)
#[allow(dead_code)]
pub fn key_agreement_vm() -> VerificationMethodInput {
    let raw: [u8; 32] = rand::random();
    VerificationMethodInput {
        role: VerificationRole::KeyAgreement,
        public_key_multibase: encode_multikey(KeyCodec::X25519, &raw),
        controller: None,
    }
}

#[allow(dead_code)]
pub fn linked_vp_service() -> Service {
    Service {
        id: "#whois".to_string(),
        service_type: "LinkedVerifiablePresentation".to_string(),
        service_endpoint: json!("https://example.com/whois.vp"),
    }
}

#[allow(dead_code)]
pub fn didcomm_service() -> Service {
    Service {
        id: "#didcomm".to_string(),
        service_type: "DIDCommMessaging".to_string(),
        service_endpoint: json!({
            "uri": "https://mediator.example.com/api",
            "accept": ["didcomm/v2"],
            "routingKeys": []
        }),
    }
}

#[allow(dead_code)]
pub fn timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    Some(DateTime::parse_from_rfc3339(value).expect("test timestamp must parse"))
}

/// Create the two-key DID on `example.com` that the update scenarios
/// build on
#[allow(dead_code)]
pub fn created_did(auth: &Secret, assertion: &Secret) -> DIDOperationResult {
    let options = CreateDIDOptions {
        vms: vec![auth_vm(auth), assertion_vm(assertion)],
        domain: Some("example.com".to_string()),
        version_time: timestamp("2025-06-01T12:00:00.000Z"),
        ..Default::default()
    };
    create_did(options, auth).expect("Failed to create DID")
}
