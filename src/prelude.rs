//! Convenience re-exports for common types.
//!
//! ```
//! use didtdw_rs::prelude::*;
//! ```

pub use crate::DIDTdwError;
pub use crate::{ENTRY_HASH_LENGTH, METHOD, PROTOCOL, SCID_HOLDER};
pub use crate::create::{CreateDIDOptions, DIDOperationResult, create_did};
pub use crate::document::{
    DIDDocument, Service, VerificationMethod, VerificationMethodInput, VerificationMethodRef,
    VerificationRole,
};
pub use crate::log_entry::{DIDLog, LogEntry, MetaData, Patch};
pub use crate::proof::DataIntegrityProof;
pub use crate::resolve::controller::{ControllerResolver, DidKeyResolver};
pub use crate::resolve::{ResolutionResult, resolve_did, resolve_did_at_time};
pub use crate::secrets::Secret;
pub use crate::update::{UpdateDIDOptions, deactivate_did, update_did};
pub use crate::url::TdwDid;
