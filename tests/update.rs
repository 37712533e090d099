//! Update scenarios: domain migration, added services and key material,
//! external controllers, deactivation.

use didtdw_rs::prelude::*;

mod common;
use common::*;

/// Change domain and add a LinkedVerifiablePresentation service
#[tokio::test]
async fn migrate_domain_and_add_service() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let created = created_did(&auth, &assertion);

    let updated = update_did(
        &created.log,
        UpdateDIDOptions {
            domain: Some("migrated.example.com".to_string()),
            services: Some(vec![linked_vp_service()]),
            contexts: Some(vec![
                "https://identity.foundation/linked-vp/contexts/v1".to_string(),
            ]),
            version_time: timestamp("2025-06-02T12:00:00.000Z"),
            ..Default::default()
        },
        &auth,
        &DidKeyResolver,
    )
    .await
    .expect("Failed to update DID");

    // New DID carries the new domain over the same SCID
    let parsed = TdwDid::parse(&updated.did).unwrap();
    assert_eq!(parsed.domain.as_deref(), Some("migrated.example.com"));
    assert_eq!(parsed.scid, created.metadata.scid);

    assert_eq!(updated.document.service.as_ref().unwrap().len(), 1);
    assert_eq!(updated.metadata.version_id, 2);

    // Resolving the new log yields the same result
    let resolved = resolve_did(&updated.log, None, &DidKeyResolver)
        .await
        .unwrap();
    assert_eq!(resolved.did, updated.did);
    assert_eq!(resolved.document, updated.document);
    assert_eq!(resolved.metadata.version_id, 2);
}

/// Add an X25519 keyAgreement method and a DIDComm service on top of the
/// migrated DID
#[tokio::test]
async fn add_key_agreement_and_second_service() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let created = created_did(&auth, &assertion);

    let migrated = update_did(
        &created.log,
        UpdateDIDOptions {
            domain: Some("migrated.example.com".to_string()),
            services: Some(vec![linked_vp_service()]),
            contexts: Some(vec![
                "https://identity.foundation/linked-vp/contexts/v1".to_string(),
            ]),
            version_time: timestamp("2025-06-02T12:00:00.000Z"),
            ..Default::default()
        },
        &auth,
        &DidKeyResolver,
    )
    .await
    .unwrap();

    let updated = update_did(
        &migrated.log,
        UpdateDIDOptions {
            vms: Some(vec![
                auth_vm(&auth),
                assertion_vm(&assertion),
                key_agreement_vm(),
            ]),
            services: Some(vec![linked_vp_service(), didcomm_service()]),
            contexts: Some(vec![
                "https://identity.foundation/linked-vp/contexts/v1".to_string(),
                "https://didcomm.org/messaging/contexts/v2".to_string(),
            ]),
            version_time: timestamp("2025-06-03T12:00:00.000Z"),
            ..Default::default()
        },
        &auth,
        &DidKeyResolver,
    )
    .await
    .expect("Failed to add keyAgreement");

    assert_eq!(updated.document.key_agreement.as_ref().unwrap().len(), 1);
    assert_eq!(updated.document.service.as_ref().unwrap().len(), 2);
    assert_eq!(updated.metadata.version_id, 3);

    let resolved = resolve_did(&updated.log, None, &DidKeyResolver)
        .await
        .unwrap();
    assert_eq!(resolved.document, updated.document);
}

/// Add an alsoKnownAs alias; untouched fields carry over
#[tokio::test]
async fn add_also_known_as() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let mut log = created_did(&auth, &assertion).log;

    for (day, options) in [
        (
            "2025-06-02T12:00:00.000Z",
            UpdateDIDOptions {
                services: Some(vec![linked_vp_service()]),
                contexts: Some(vec![
                    "https://identity.foundation/linked-vp/contexts/v1".to_string(),
                ]),
                ..Default::default()
            },
        ),
        (
            "2025-06-03T12:00:00.000Z",
            UpdateDIDOptions {
                services: Some(vec![linked_vp_service(), didcomm_service()]),
                contexts: Some(vec![
                    "https://identity.foundation/linked-vp/contexts/v1".to_string(),
                    "https://didcomm.org/messaging/contexts/v2".to_string(),
                ]),
                ..Default::default()
            },
        ),
        (
            "2025-06-04T12:00:00.000Z",
            UpdateDIDOptions {
                also_known_as: Some(vec!["did:web:example.com".to_string()]),
                ..Default::default()
            },
        ),
    ] {
        let mut options = options;
        options.version_time = timestamp(day);
        log = update_did(&log, options, &auth, &DidKeyResolver)
            .await
            .expect("Failed to update DID")
            .log;
    }

    let resolved = resolve_did(&log, None, &DidKeyResolver).await.unwrap();
    assert_eq!(resolved.metadata.version_id, 4);
    assert_eq!(
        resolved.document.also_known_as.as_ref().unwrap(),
        &vec!["did:web:example.com".to_string()]
    );
    // Services from earlier versions carried over
    assert_eq!(resolved.document.service.as_ref().unwrap().len(), 2);
}

/// A verification method controlled by an external did:key
#[tokio::test]
async fn external_controller_method() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let external = Secret::generate();
    let external_key = external.public_key_multibase();
    let external_did = format!("did:key:{external_key}");

    let created = created_did(&auth, &assertion);
    let updated = update_did(
        &created.log,
        UpdateDIDOptions {
            vms: Some(vec![
                auth_vm(&auth),
                assertion_vm(&assertion),
                VerificationMethodInput {
                    role: VerificationRole::AssertionMethod,
                    public_key_multibase: external_key.clone(),
                    controller: Some(external_did.clone()),
                },
            ]),
            version_time: timestamp("2025-06-02T12:00:00.000Z"),
            ..Default::default()
        },
        &auth,
        &DidKeyResolver,
    )
    .await
    .expect("Failed to add external controller");

    // The external DID shows up as a document controller
    assert!(
        updated
            .document
            .controller
            .as_ref()
            .unwrap()
            .contains(&external_did)
    );
    // And its method ID ends with the controller key's tail
    let tail = &external_key[external_key.len() - 8..];
    let external_vm = updated
        .document
        .verification_method
        .iter()
        .find(|vm| vm.controller == external_did)
        .expect("external method must be defined");
    assert!(external_vm.id.ends_with(tail));

    // Entries signed by local keys still verify after the external key
    // joined the document
    let again = update_did(
        &updated.log,
        UpdateDIDOptions {
            also_known_as: Some(vec!["did:web:example.com".to_string()]),
            version_time: timestamp("2025-06-03T12:00:00.000Z"),
            ..Default::default()
        },
        &auth,
        &DidKeyResolver,
    )
    .await
    .unwrap();
    let resolved = resolve_did(&again.log, None, &DidKeyResolver)
        .await
        .unwrap();
    assert_eq!(resolved.metadata.version_id, 3);
}

/// Rotate the sole authentication key in one atomic update
#[tokio::test]
async fn rotate_sole_key() {
    let old_key = Secret::generate();
    let new_key = Secret::generate();

    let created = create_did(
        CreateDIDOptions {
            vms: vec![auth_vm(&old_key)],
            ..Default::default()
        },
        &old_key,
    )
    .unwrap();

    // The old key signs the update that replaces it
    let rotated = update_did(
        &created.log,
        UpdateDIDOptions {
            vms: Some(vec![auth_vm(&new_key)]),
            ..Default::default()
        },
        &old_key,
        &DidKeyResolver,
    )
    .await
    .expect("Failed to rotate key");

    let resolved = resolve_did(&rotated.log, None, &DidKeyResolver)
        .await
        .unwrap();
    assert_eq!(resolved.metadata.version_id, 2);
    assert_eq!(resolved.document.verification_method.len(), 1);
    assert_eq!(
        resolved.document.verification_method[0].public_key_multibase,
        new_key.public_key_multibase()
    );

    // The rotated-out key can no longer update the DID
    let stale = update_did(
        &rotated.log,
        UpdateDIDOptions::default(),
        &old_key,
        &DidKeyResolver,
    )
    .await;
    assert!(matches!(stale, Err(DIDTdwError::UnauthorizedKey(_))));
}

/// Deactivation removes all verification material and is terminal
#[tokio::test]
async fn deactivate_is_terminal() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let created = created_did(&auth, &assertion);

    let deactivated = deactivate_did(&created.log, &auth, &DidKeyResolver)
        .await
        .expect("Failed to deactivate DID");
    assert!(deactivated.metadata.deactivated);
    assert!(deactivated.document.verification_method.is_empty());

    let resolved = resolve_did(&deactivated.log, None, &DidKeyResolver)
        .await
        .unwrap();
    assert!(resolved.metadata.deactivated);

    // No further updates are accepted
    let result = update_did(
        &deactivated.log,
        UpdateDIDOptions::default(),
        &auth,
        &DidKeyResolver,
    )
    .await;
    assert!(matches!(result, Err(DIDTdwError::InvalidState(_))));
}

/// versionId and versionTime are strictly monotone across the log
#[tokio::test]
async fn entries_are_strictly_monotone() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let mut log = created_did(&auth, &assertion).log;

    // Rapid updates with defaulted timestamps exercise the clock clamp
    for _ in 0..3 {
        log = update_did(
            &log,
            UpdateDIDOptions::default(),
            &auth,
            &DidKeyResolver,
        )
        .await
        .unwrap()
        .log;
    }

    for pair in log.entries.windows(2) {
        assert_eq!(pair[1].version_id, pair[0].version_id + 1);
        assert!(pair[1].version_time > pair[0].version_time);
    }
    assert_eq!(
        resolve_did(&log, None, &DidKeyResolver)
            .await
            .unwrap()
            .metadata
            .version_id,
        4
    );
}

/// A caller-supplied timestamp earlier than the log is refused
#[tokio::test]
async fn backdated_update_is_refused() {
    let auth = Secret::generate();
    let assertion = Secret::generate();
    let created = created_did(&auth, &assertion);

    let result = update_did(
        &created.log,
        UpdateDIDOptions {
            version_time: timestamp("2025-05-01T00:00:00.000Z"),
            ..Default::default()
        },
        &auth,
        &DidKeyResolver,
    )
    .await;
    assert!(matches!(result, Err(DIDTdwError::TimeRegression(_))));
}
