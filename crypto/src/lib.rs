//! Ember Coin cryptography
//!
//! Recoverable secp256k1 ECDSA over 256-bit digests. Signatures are the
//! 65-byte compact form (r || s || recovery id), so the signing public key
//! can be recovered from a signature and the digest it covers without
//! shipping the key on the wire.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Hash data with SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash several slices as one SHA-256 preimage.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// 20-byte identifier of a public key: the first 20 bytes of the SHA-256
/// hash of the compressed key. Serves as the staking address and the
/// coinbase beneficiary identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyId([u8; 20]);

impl KeyId {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = sha256(&key.to_compressed());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_hex())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for KeyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for KeyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(&s).map_err(serde::de::Error::custom)?
        } else {
            <Vec<u8>>::deserialize(deserializer)?
        };
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 20 bytes"))?;
        Ok(Self(arr))
    }
}

/// Signing key for a locally operated masternode.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key using the OS RNG.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let inner =
            SigningKey::from_bytes(bytes.into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { inner })
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_bytes(&arr)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: *self.inner.verifying_key(),
        }
    }

    /// Sign a 256-bit digest, producing a compact recoverable signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<CompactSignature, CryptoError> {
        let (sig, recovery_id) = self
            .inner
            .sign_prehash_recoverable(digest)
            .map_err(|_| CryptoError::InvalidSignature)?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(CompactSignature(bytes))
    }
}

impl fmt::Debug for PrivateKey {
    // Never print key material.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_hex())
            .finish()
    }
}

/// Public key on the secp256k1 curve.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Parse a SEC1-encoded key (33-byte compressed or 65-byte uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { inner })
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Compressed SEC1 encoding (33 bytes).
    pub fn to_compressed(&self) -> [u8; 33] {
        let point = self.inner.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    pub fn key_id(&self) -> KeyId {
        KeyId::from_public_key(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// Compact recoverable ECDSA signature: r || s || recovery id (65 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature([u8; 65]);

impl CompactSignature {
    pub const fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 65] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }

    /// Recover the public key that produced this signature over `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey, CryptoError> {
        let sig =
            EcdsaSignature::from_slice(&self.0[..64]).map_err(|_| CryptoError::InvalidSignature)?;
        let recovery_id = RecoveryId::from_byte(self.0[64]).ok_or(CryptoError::InvalidSignature)?;

        let inner = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(PublicKey { inner })
    }
}

impl Default for CompactSignature {
    fn default() -> Self {
        Self([0u8; 65])
    }
}

impl fmt::Debug for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactSignature({})", self.to_hex())
    }
}

impl Serialize for CompactSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for CompactSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(&s).map_err(serde::de::Error::custom)?
        } else {
            <Vec<u8>>::deserialize(deserializer)?
        };
        let arr: [u8; 65] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 65 bytes"))?;
        Ok(Self(arr))
    }
}

/// Script opcodes for the pay-to-pubkey staking output form.
const OP_PUSH_33: u8 = 0x21;
const OP_CHECKSIG: u8 = 0xac;

/// Build the pay-to-pubkey script locking a staking output.
pub fn pubkey_script(key: &PublicKey) -> Vec<u8> {
    let mut script = Vec::with_capacity(35);
    script.push(OP_PUSH_33);
    script.extend_from_slice(&key.to_compressed());
    script.push(OP_CHECKSIG);
    script
}

/// Extract the controlling key id from a staking output script.
///
/// Returns `None` for any script that is not the pay-to-pubkey form.
pub fn extract_key_id(script: &[u8]) -> Option<KeyId> {
    if script.len() != 35 || script[0] != OP_PUSH_33 || script[34] != OP_CHECKSIG {
        return None;
    }
    let key = PublicKey::from_sec1_bytes(&script[1..34]).ok()?;
    Some(key.key_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_recover() {
        let key = PrivateKey::generate();
        let digest = sha256(b"test message");

        let sig = key.sign_digest(&digest).unwrap();
        let recovered = sig.recover(&digest).unwrap();

        assert_eq!(recovered, key.public_key());
        assert_eq!(recovered.key_id(), key.public_key().key_id());
    }

    #[test]
    fn test_recover_wrong_digest() {
        let key = PrivateKey::generate();
        let digest = sha256(b"test message");
        let other = sha256(b"another message");

        let sig = key.sign_digest(&digest).unwrap();

        // Recovery over a different digest either fails or yields a
        // different key; it never yields the signer.
        if let Ok(recovered) = sig.recover(&other) {
            assert_ne!(recovered, key.public_key());
        }
    }

    #[test]
    fn test_flipped_signature_bit() {
        let key = PrivateKey::generate();
        let digest = sha256(b"attestation");

        let sig = key.sign_digest(&digest).unwrap();
        let mut bytes = sig.to_bytes();
        bytes[7] ^= 0x01;
        let tampered = CompactSignature::from_bytes(bytes);

        if let Ok(recovered) = tampered.recover(&digest) {
            assert_ne!(recovered, key.public_key());
        }
    }

    #[test]
    fn test_private_key_hex_roundtrip() {
        let key = PrivateKey::generate();
        let restored = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(restored.public_key(), key.public_key());
    }

    #[test]
    fn test_pubkey_script_roundtrip() {
        let key = PrivateKey::generate();
        let script = pubkey_script(&key.public_key());

        assert_eq!(script.len(), 35);
        assert_eq!(extract_key_id(&script), Some(key.public_key().key_id()));
    }

    #[test]
    fn test_extract_key_id_rejects_garbage() {
        assert_eq!(extract_key_id(&[]), None);
        assert_eq!(extract_key_id(&[0u8; 35]), None);
        assert_eq!(extract_key_id(&[0u8; 40]), None);
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let key = PrivateKey::generate();
        let digest = sha256(b"roundtrip");
        let sig = key.sign_digest(&digest).unwrap();

        let restored = CompactSignature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(restored, sig);
    }
}
