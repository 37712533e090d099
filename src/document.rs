/*!
*  DID Document model and builder
*
*  The document is a derived view over the log: it is never persisted on
*  its own, only rebuilt from log entry patches. The builder assembles a
*  document from caller-supplied verification methods, services and
*  contexts, deriving verification-method IDs and splitting role arrays
*  into embedded records (local controller) and `id` references (external
*  controller).
*/

use crate::{DIDTdwError, canonical::CONTEXT_DID_V1, url};
use ahash::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

/// The W3C verification-method type for multibase-encoded keys
pub const VM_TYPE_MULTIKEY: &str = "Multikey";

/// Number of trailing `publicKeyMultibase` characters used as the
/// fragment of a verification-method ID
const VM_ID_SUFFIX_LENGTH: usize = 8;

/// The role a key plays in a DID Document (not its cryptographic type,
/// which is implied by the key encoding)
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationRole {
    Authentication,
    AssertionMethod,
    KeyAgreement,
    CapabilityInvocation,
    CapabilityDelegation,
}

impl VerificationRole {
    /// All roles, in the order their arrays appear in a document
    pub const ALL: [VerificationRole; 5] = [
        VerificationRole::Authentication,
        VerificationRole::AssertionMethod,
        VerificationRole::KeyAgreement,
        VerificationRole::CapabilityInvocation,
        VerificationRole::CapabilityDelegation,
    ];

    /// The camelCase name of the matching role array / proof purpose
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationRole::Authentication => "authentication",
            VerificationRole::AssertionMethod => "assertionMethod",
            VerificationRole::KeyAgreement => "keyAgreement",
            VerificationRole::CapabilityInvocation => "capabilityInvocation",
            VerificationRole::CapabilityDelegation => "capabilityDelegation",
        }
    }

    /// Maps a proof purpose string back to a role
    pub fn from_purpose(purpose: &str) -> Option<VerificationRole> {
        VerificationRole::ALL
            .into_iter()
            .find(|role| role.as_str() == purpose)
    }
}

/// Caller-supplied key material for building a document
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethodInput {
    /// Which role array this key lands in
    pub role: VerificationRole,

    /// Multibase-encoded public key (Ed25519 for signing roles, X25519
    /// for key agreement)
    pub public_key_multibase: String,

    /// Controlling DID; `None` means the enclosing document's DID
    pub controller: Option<String>,
}

/// A verification-method record as embedded in a document
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,

    #[serde(rename = "type")]
    pub method_type: String,

    pub controller: String,

    pub public_key_multibase: String,
}

/// A role-array entry: either a full embedded record or a reference to
/// an entry in `verificationMethod`
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VerificationMethodRef {
    Embedded(VerificationMethod),
    Reference(String),
}

impl VerificationMethodRef {
    /// The ID this entry points at, whichever form it takes
    pub fn id(&self) -> &str {
        match self {
            VerificationMethodRef::Embedded(vm) => &vm.id,
            VerificationMethodRef::Reference(id) => id,
        }
    }
}

/// A service endpoint record
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,

    #[serde(rename = "type")]
    pub service_type: String,

    pub service_endpoint: Value,
}

/// A DID Document, the derived view of a log at one version
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DIDDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    pub id: String,

    pub controller: Option<Vec<String>>,

    pub also_known_as: Option<Vec<String>>,

    /// Superset of every verification method mentioned in a role array
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,

    pub authentication: Option<Vec<VerificationMethodRef>>,

    pub assertion_method: Option<Vec<VerificationMethodRef>>,

    pub key_agreement: Option<Vec<VerificationMethodRef>>,

    pub capability_invocation: Option<Vec<VerificationMethodRef>>,

    pub capability_delegation: Option<Vec<VerificationMethodRef>>,

    pub service: Option<Vec<Service>>,
}

impl DIDDocument {
    /// The role array for a given role, if the document has one
    pub fn role_array(&self, role: VerificationRole) -> Option<&Vec<VerificationMethodRef>> {
        match role {
            VerificationRole::Authentication => self.authentication.as_ref(),
            VerificationRole::AssertionMethod => self.assertion_method.as_ref(),
            VerificationRole::KeyAgreement => self.key_agreement.as_ref(),
            VerificationRole::CapabilityInvocation => self.capability_invocation.as_ref(),
            VerificationRole::CapabilityDelegation => self.capability_delegation.as_ref(),
        }
    }

    /// Looks up a verification method by ID
    pub fn find_verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|vm| vm.id == id)
    }

    /// True when a verification method ID appears (embedded or referenced)
    /// in the role array matching `role`
    pub fn is_authorized(&self, role: VerificationRole, vm_id: &str) -> bool {
        self.role_array(role)
            .is_some_and(|entries| entries.iter().any(|entry| entry.id() == vm_id))
    }

    /// A DID with no authentication material is deactivated
    pub fn has_authentication(&self) -> bool {
        self.authentication
            .as_ref()
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Finds the authentication method backed by the given public key
    pub fn authentication_method_for(
        &self,
        public_key_multibase: &str,
    ) -> Option<&VerificationMethod> {
        let entries = self.authentication.as_ref()?;
        self.verification_method.iter().find(|vm| {
            vm.public_key_multibase == public_key_multibase
                && entries.iter().any(|entry| entry.id() == vm.id)
        })
    }
}

/// Derives a verification-method ID: `{controller}#{last-8 of key}`
pub fn vm_id(controller: &str, public_key_multibase: &str) -> Result<String, DIDTdwError> {
    if public_key_multibase.len() < VM_ID_SUFFIX_LENGTH {
        return Err(DIDTdwError::KeyError(format!(
            "publicKeyMultibase ({public_key_multibase}) is too short for an ID fragment"
        )));
    }
    let suffix = &public_key_multibase[public_key_multibase.len() - VM_ID_SUFFIX_LENGTH..];
    Ok([controller, "#", suffix].concat())
}

/// Assembles a DID Document from caller inputs
pub(crate) fn build_document(
    scid: &str,
    domain: Option<&str>,
    vms: &[VerificationMethodInput],
    services: &[Service],
    contexts: &[String],
    controllers: &[String],
    also_known_as: &[String],
) -> Result<DIDDocument, DIDTdwError> {
    let did = url::format_did(scid, domain)?;

    // Materialize all verification methods, deduped by derived ID
    let mut seen: HashSet<String> = HashSet::default();
    let mut methods: Vec<VerificationMethod> = Vec::new();
    let mut roles: Vec<(VerificationRole, VerificationMethodRef)> = Vec::new();
    for input in vms {
        let controller = input.controller.clone().unwrap_or_else(|| did.clone());
        let id = vm_id(&controller, &input.public_key_multibase)?;
        let method = VerificationMethod {
            id: id.clone(),
            method_type: VM_TYPE_MULTIKEY.to_string(),
            controller: controller.clone(),
            public_key_multibase: input.public_key_multibase.clone(),
        };
        if seen.insert(id.clone()) {
            methods.push(method.clone());
        }
        // Local keys are embedded in the role array, external keys are
        // referenced so their definition is not cloned
        let entry = if controller == did {
            VerificationMethodRef::Embedded(method)
        } else {
            VerificationMethodRef::Reference(id)
        };
        if !roles
            .iter()
            .any(|(role, existing)| *role == input.role && existing.id() == entry.id())
        {
            roles.push((input.role, entry));
        }
    }

    let role_entries = |role: VerificationRole| -> Option<Vec<VerificationMethodRef>> {
        let entries: Vec<_> = roles
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, entry)| entry.clone())
            .collect();
        if entries.is_empty() { None } else { Some(entries) }
    };

    // External controllers become document controllers so role-based
    // authorization checks can see them
    let mut all_controllers: Vec<String> = Vec::new();
    for controller in controllers.iter().cloned().chain(
        methods
            .iter()
            .filter(|vm| vm.controller != did)
            .map(|vm| vm.controller.clone()),
    ) {
        if controller != did && !all_controllers.contains(&controller) {
            all_controllers.push(controller);
        }
    }

    let mut context = vec![CONTEXT_DID_V1.to_string()];
    for extra in contexts {
        if !context.contains(extra) {
            context.push(extra.clone());
        }
    }

    let services: Vec<Service> = services
        .iter()
        .map(|service| {
            let mut service = service.clone();
            if service.id.starts_with('#') {
                service.id = [did.as_str(), service.id.as_str()].concat();
            }
            service
        })
        .collect();

    Ok(DIDDocument {
        context,
        id: did,
        controller: if all_controllers.is_empty() {
            None
        } else {
            Some(all_controllers)
        },
        also_known_as: if also_known_as.is_empty() {
            None
        } else {
            Some(also_known_as.to_vec())
        },
        verification_method: methods,
        authentication: role_entries(VerificationRole::Authentication),
        assertion_method: role_entries(VerificationRole::AssertionMethod),
        key_agreement: role_entries(VerificationRole::KeyAgreement),
        capability_invocation: role_entries(VerificationRole::CapabilityInvocation),
        capability_delegation: role_entries(VerificationRole::CapabilityDelegation),
        service: if services.is_empty() {
            None
        } else {
            Some(services)
        },
    })
}
