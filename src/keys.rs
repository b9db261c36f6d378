//! Key material adapter.
//!
//! Turns a DID-linked key pair into an `Ed25519VerificationKey2018` and, from
//! there, into the key pair used to produce detached JWS signatures.

use std::convert::TryInto;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const ED25519_VERIFICATION_KEY_2018: &str = "Ed25519VerificationKey2018";

/// Algorithm a key pair is declared for, by JOSE name.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    EdDSA,
    ES256K,
    ES256,
    RS256,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EdDSA => "EdDSA",
            Self::ES256K => "ES256K",
            Self::ES256 => "ES256",
            Self::RS256 => "RS256",
        };
        f.write_str(name)
    }
}

/// Hex strings, with or without a `0x` prefix.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let string = String::deserialize(deserializer)?;
        super::decode_hex(&string).map_err(serde::de::Error::custom)
    }
}

fn decode_hex(string: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(string.strip_prefix("0x").unwrap_or(string))
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub algorithm: KeyAlgorithm,
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    /// Either the 32-byte Ed25519 seed or the 64-byte `seed || public key` form.
    #[serde(with = "hex_bytes")]
    pub private_key: Vec<u8>,
}

impl KeyPair {
    pub fn new(algorithm: KeyAlgorithm, public_key: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            algorithm,
            public_key,
            private_key,
        }
    }

    /// Construct a key pair from hex-encoded keys, optionally `0x`-prefixed.
    pub fn from_hex(algorithm: KeyAlgorithm, public_key: &str, private_key: &str) -> Result<Self, Error> {
        Ok(Self::new(
            algorithm,
            decode_hex(public_key)?,
            decode_hex(private_key)?,
        ))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("public_key", &hex::encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DIDWithKeys {
    pub did: String,
    pub key_pair: KeyPair,
}

/// An `Ed25519VerificationKey2018` carrying both halves of the key pair.
///
/// Built per signing call and never persisted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKey {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    pub public_key_base58: String,
    pub private_key_base58: String,
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("id", &self.id)
            .field("type_", &self.type_)
            .field("controller", &self.controller)
            .field("public_key_base58", &self.public_key_base58)
            .finish_non_exhaustive()
    }
}

impl VerificationKey {
    pub fn public_key(&self) -> Result<Vec<u8>, Error> {
        Ok(bs58::decode(&self.public_key_base58).into_vec()?)
    }

    /// Decode the key pair for signing.
    pub fn signer(&self) -> Result<Ed25519KeyPair, Error> {
        let private_key = bs58::decode(&self.private_key_base58).into_vec()?;
        Ed25519KeyPair::from_bytes(&private_key, &self.public_key()?)
    }
}

/// Derive the verification key for a DID-linked key pair.
///
/// The key id is `did#fragment`, the fragment being the last colon-separated
/// segment of the DID.
pub fn derive_verification_key(keys: &DIDWithKeys) -> Result<VerificationKey, Error> {
    let DIDWithKeys { did, key_pair } = keys;
    if key_pair.algorithm != KeyAlgorithm::EdDSA {
        return Err(Error::UnsupportedAlgorithm(key_pair.algorithm.to_string()));
    }
    let fragment = did.rsplit(':').next().unwrap_or(did);
    Ok(VerificationKey {
        id: format!("{}#{}", did, fragment),
        type_: ED25519_VERIFICATION_KEY_2018.to_string(),
        controller: did.clone(),
        public_key_base58: bs58::encode(&key_pair.public_key).into_string(),
        private_key_base58: bs58::encode(&key_pair.private_key).into_string(),
    })
}

/// Ed25519 seed and public key, checked for length and consistency.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    seed: [u8; 32],
    public_key: [u8; 32],
}

impl Ed25519KeyPair {
    /// Accepts a 32-byte seed or a 64-byte `seed || public key` private key.
    ///
    /// The public key is derived from the seed and must equal `public_key`.
    pub fn from_bytes(private_key: &[u8], public_key: &[u8]) -> Result<Self, Error> {
        if public_key.len() != 32 {
            return Err(Error::InvalidKeyLength(public_key.len()));
        }
        let seed = match private_key.len() {
            32 => private_key,
            64 => {
                if private_key[32..] != public_key[..] {
                    return Err(Error::InconsistentKeyPair);
                }
                &private_key[..32]
            }
            length => return Err(Error::InvalidKeyLength(length)),
        };
        if derive_public_key(seed)?[..] != public_key[..] {
            return Err(Error::InconsistentKeyPair);
        }
        Ok(Self {
            seed: seed.try_into()?,
            public_key: public_key.try_into()?,
        })
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

#[cfg(feature = "ring")]
fn derive_public_key(seed: &[u8]) -> Result<Vec<u8>, Error> {
    use ring::signature::KeyPair as _;
    let key_pair = ring::signature::Ed25519KeyPair::from_seed_unchecked(seed)
        .map_err(|_| Error::InvalidKeyPair)?;
    Ok(key_pair.public_key().as_ref().to_vec())
}

#[cfg(all(not(feature = "ring"), feature = "ed25519-dalek"))]
fn derive_public_key(seed: &[u8]) -> Result<Vec<u8>, Error> {
    let secret = ed25519_dalek::SecretKey::from_bytes(seed)?;
    Ok(ed25519_dalek::PublicKey::from(&secret).to_bytes().to_vec())
}

impl fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}
