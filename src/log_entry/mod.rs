/*!
*  Every version change of the DID Document appends one LogEntry.
*
*  On the wire an entry is a positional 5-tuple:
*
*  ```text
*  [ entryHash, versionId, versionTime, patch, proof ]
*  ```
*
*  Entries chain through `entryHash`, the encoded SHA-256 of the
*  JCS-canonical form of `[previousEntryHash, patch]`. The genesis entry
*  hashes against the empty string and its hash doubles as the DID's
*  self-certifying identifier.
*/

use crate::{
    DIDTdwError, PROTOCOL, canonical, document::DIDDocument, proof::DataIntegrityProof,
};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize, de};
use serde_json::json;
use serde_with::skip_serializing_none;

pub mod read;

/// Renders a timestamp the way it travels in a log: RFC-3339 UTC with
/// millisecond precision
pub fn format_timestamp(time: &DateTime<FixedOffset>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drops sub-millisecond precision so an in-memory timestamp always
/// equals its serialized round-trip
pub(crate) fn round_to_millis(time: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    DateTime::from_timestamp_millis(time.timestamp_millis())
        .unwrap_or_default()
        .fixed_offset()
}

/// The change carried by a log entry.
///
/// The genesis entry carries the log-format version, the SCID and the
/// full initial document; every later entry carries the complete new
/// document state (full-state replacement).
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Patch {
    /// Log-format version, genesis only
    pub method: Option<String>,

    /// Self-certifying identifier, genesis only
    pub scid: Option<String>,

    /// The complete document state after applying this entry
    #[serde(flatten)]
    pub document: DIDDocument,
}

impl Patch {
    /// The genesis patch: full initial state plus method and SCID
    pub fn genesis(scid: &str, document: DIDDocument) -> Patch {
        Patch {
            method: Some(PROTOCOL.to_string()),
            scid: Some(scid.to_string()),
            document,
        }
    }

    /// An update patch: the complete new document state
    pub fn update(document: DIDDocument) -> Patch {
        Patch {
            method: None,
            scid: None,
            document,
        }
    }

    /// True when this patch carries genesis-only fields
    pub fn is_genesis(&self) -> bool {
        self.method.is_some() || self.scid.is_some()
    }
}

/// One version of the DID: a hash-chained, signed 5-tuple
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    /// Multibase hash over `[previousEntryHash, patch]`
    pub entry_hash: String,

    /// Monotone counter starting at 1
    pub version_id: u32,

    /// Strictly monotone across the log
    pub version_time: DateTime<FixedOffset>,

    pub patch: Patch,

    pub proof: DataIntegrityProof,
}

// Wire form of a LogEntry: the positional JSON array
type LogEntryTuple = (String, u32, String, Patch, DataIntegrityProof);

impl Serialize for LogEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (
            &self.entry_hash,
            self.version_id,
            format_timestamp(&self.version_time),
            &self.patch,
            &self.proof,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LogEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (entry_hash, version_id, version_time, patch, proof) =
            LogEntryTuple::deserialize(deserializer)?;
        let version_time = DateTime::parse_from_rfc3339(&version_time).map_err(|e| {
            de::Error::custom(format!("invalid versionTime ({version_time}): {e}"))
        })?;
        Ok(LogEntry {
            entry_hash,
            version_id,
            version_time,
            patch,
            proof,
        })
    }
}

impl LogEntry {
    /// The serialized form of this entry's versionTime
    pub fn version_time_string(&self) -> String {
        format_timestamp(&self.version_time)
    }

    /// Recomputes this entry's hash from the previous entry's hash and
    /// checks it against the stored value
    pub fn verify_entry_hash(&self, previous_hash: &str) -> Result<(), DIDTdwError> {
        let calculated = compute_entry_hash(previous_hash, &self.patch)?;
        if calculated != self.entry_hash {
            return Err(DIDTdwError::HashMismatch(format!(
                "Entry {} hash ({}) does not match calculated hash ({calculated})",
                self.version_id, self.entry_hash
            )));
        }
        Ok(())
    }
}

/// Hash over the chain input `[previousEntryHash, patch]`.
/// The genesis entry uses the empty string as its predecessor.
pub fn compute_entry_hash(previous_hash: &str, patch: &Patch) -> Result<String, DIDTdwError> {
    canonical::entry_hash(&json!([previous_hash, patch]))
}

/// Resolved Document MetaData
/// Returned alongside the document on a successful resolve
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    pub version_id: u32,
    pub version_time: String,
    pub created: String,
    pub updated: String,
    pub scid: String,
    pub deactivated: bool,
}

/// The ordered, chained sequence of entries that constitutes the
/// authoritative history of a DID
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DIDLog {
    pub entries: Vec<LogEntry>,
}

impl DIDLog {
    /// The genesis entry; every valid log has one
    pub fn genesis(&self) -> Result<&LogEntry, DIDTdwError> {
        self.entries
            .first()
            .ok_or_else(|| DIDTdwError::InvalidState("Log has no entries".to_string()))
    }

    /// The most recent entry
    pub fn last(&self) -> Result<&LogEntry, DIDTdwError> {
        self.entries
            .last()
            .ok_or_else(|| DIDTdwError::InvalidState("Log has no entries".to_string()))
    }

    /// The log's identity: the SCID carried by the genesis patch
    pub fn scid(&self) -> Result<String, DIDTdwError> {
        self.genesis()?
            .patch
            .scid
            .clone()
            .ok_or_else(|| DIDTdwError::InvalidState("Genesis entry has no SCID".to_string()))
    }
}
