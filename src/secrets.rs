/*!
*  Key material handling
*
*  Public keys travel through the log multibase-encoded with their
*  multicodec prefix (`z6Mk...` for Ed25519, `z6LS...` for X25519).
*  [`Secret`] wraps an Ed25519 keypair and is the only type in this crate
*  that ever touches private key bytes.
*/

use crate::DIDTdwError;
use crate::canonical::{multibase_decode, multibase_encode};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Multicodec prefix for an Ed25519 public key
const ED25519_PUB: [u8; 2] = [0xed, 0x01];

/// Multicodec prefix for an X25519 public key
const X25519_PUB: [u8; 2] = [0xec, 0x01];

/// Cryptographic key type, as carried by the multicodec prefix of a
/// multibase-encoded public key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCodec {
    /// Signing keys (`z6Mk...`)
    Ed25519,
    /// Key-agreement keys (`z6LS...`)
    X25519,
}

impl KeyCodec {
    fn prefix(self) -> [u8; 2] {
        match self {
            KeyCodec::Ed25519 => ED25519_PUB,
            KeyCodec::X25519 => X25519_PUB,
        }
    }
}

/// Encodes raw public key bytes as a multibase multikey
pub fn encode_multikey(codec: KeyCodec, raw: &[u8]) -> String {
    let mut bytes = codec.prefix().to_vec();
    bytes.extend_from_slice(raw);
    multibase_encode(&bytes)
}

/// Decodes a multikey string into its codec and raw key bytes
pub fn decode_multikey(multikey: &str) -> Result<(KeyCodec, Vec<u8>), DIDTdwError> {
    let bytes = multibase_decode(multikey)?;
    let Some((prefix, raw)) = bytes.split_at_checked(2) else {
        return Err(DIDTdwError::KeyError(format!(
            "Multikey ({multikey}) is too short to carry a multicodec prefix"
        )));
    };
    let codec = if prefix == ED25519_PUB {
        KeyCodec::Ed25519
    } else if prefix == X25519_PUB {
        KeyCodec::X25519
    } else {
        return Err(DIDTdwError::KeyError(format!(
            "Multikey ({multikey}) has unsupported multicodec prefix {prefix:02x?}"
        )));
    };
    Ok((codec, raw.to_vec()))
}

/// Decodes an Ed25519 multikey into a verifying key
pub fn decode_verifying_key(multikey: &str) -> Result<VerifyingKey, DIDTdwError> {
    let (codec, raw) = decode_multikey(multikey)?;
    if codec != KeyCodec::Ed25519 {
        return Err(DIDTdwError::KeyError(format!(
            "Multikey ({multikey}) is not an Ed25519 key"
        )));
    }
    let raw: [u8; 32] = raw.try_into().map_err(|_| {
        DIDTdwError::KeyError(format!("Multikey ({multikey}) is not 32 bytes long"))
    })?;
    VerifyingKey::from_bytes(&raw)
        .map_err(|e| DIDTdwError::KeyError(format!("Invalid Ed25519 public key: {e}")))
}

/// An Ed25519 keypair used to sign log entries
#[derive(Clone)]
pub struct Secret {
    signing_key: SigningKey,
}

impl Secret {
    /// Generates a fresh Ed25519 keypair from the system CSPRNG
    pub fn generate() -> Self {
        Secret {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Builds a Secret from a raw 32-byte Ed25519 seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Secret {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// The multibase multikey form of the public key (`z6Mk...`)
    pub fn public_key_multibase(&self) -> String {
        encode_multikey(
            KeyCodec::Ed25519,
            self.signing_key.verifying_key().as_bytes(),
        )
    }

    /// Signs arbitrary bytes, returning the raw 64-byte signature
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Secret {
    // Private key bytes must never end up in logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("public_key", &self.public_key_multibase())
            .finish_non_exhaustive()
    }
}

/// Verifies an Ed25519 signature against a multikey-encoded public key
pub fn verify_signature(
    public_key_multibase: &str,
    data: &[u8],
    signature: &[u8],
) -> Result<(), DIDTdwError> {
    let verifying_key = decode_verifying_key(public_key_multibase)?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| DIDTdwError::ProofInvalid(format!("Malformed signature: {e}")))?;
    verifying_key
        .verify(data, &signature)
        .map_err(|e| DIDTdwError::ProofInvalid(format!("Signature verification failed: {e}")))
}
