/*!
*  External controller resolution
*
*  Verification methods whose `controller` is outside the DID being
*  resolved need that controller's document for key material. The lookup
*  is a pluggable async hook so applications can wire in network-backed
*  resolvers; the shipped default handles `did:key` (the document derives
*  entirely from the identifier, no I/O) and rejects every other method.
*/

use crate::{
    DIDTdwError,
    canonical::CONTEXT_DID_V1,
    document::{
        DIDDocument, VM_TYPE_MULTIKEY, VerificationMethod, VerificationMethodRef, vm_id,
    },
    secrets::decode_multikey,
};
use async_trait::async_trait;

/// Resolves the DID Document of an external controller
#[async_trait]
pub trait ControllerResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, DIDTdwError>;
}

/// Default controller resolver: derives `did:key` documents from the key
/// itself and rejects all other methods
pub struct DidKeyResolver;

#[async_trait]
impl ControllerResolver for DidKeyResolver {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, DIDTdwError> {
        let Some(multikey) = did.strip_prefix("did:key:") else {
            return Err(DIDTdwError::UnknownVerificationMethod(format!(
                "Controller ({did}) cannot be resolved: only did:key is supported"
            )));
        };
        // The identifier must carry a well-formed multikey
        decode_multikey(multikey)?;

        let method = VerificationMethod {
            id: vm_id(did, multikey)?,
            method_type: VM_TYPE_MULTIKEY.to_string(),
            controller: did.to_string(),
            public_key_multibase: multikey.to_string(),
        };

        Ok(DIDDocument {
            context: vec![CONTEXT_DID_V1.to_string()],
            id: did.to_string(),
            verification_method: vec![method.clone()],
            authentication: Some(vec![VerificationMethodRef::Reference(method.id.clone())]),
            assertion_method: Some(vec![VerificationMethodRef::Reference(method.id)]),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::Secret;

    #[tokio::test]
    async fn did_key_document_derives_from_identifier() {
        let secret = Secret::generate();
        let multikey = secret.public_key_multibase();
        let did = format!("did:key:{multikey}");

        let doc = DidKeyResolver.resolve(&did).await.unwrap();
        assert_eq!(doc.id, did);
        assert_eq!(doc.verification_method.len(), 1);
        let vm = &doc.verification_method[0];
        assert_eq!(vm.public_key_multibase, multikey);
        assert_eq!(vm.controller, did);
        assert!(vm.id.starts_with(&did));
    }

    #[tokio::test]
    async fn other_methods_are_rejected() {
        let result = DidKeyResolver.resolve("did:web:example.com").await;
        assert!(matches!(
            result,
            Err(DIDTdwError::UnknownVerificationMethod(_))
        ));
    }

    #[tokio::test]
    async fn malformed_key_is_rejected() {
        let result = DidKeyResolver.resolve("did:key:not-multibase").await;
        assert!(matches!(result, Err(DIDTdwError::KeyError(_))));
    }
}
