use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::keys::Ed25519KeyPair;

// RFC 7515 - JSON Web Signature (JWS)
// RFC 7797 - JSON Web Signature (JWS) Unencoded Payload Option

/// JOSE signature algorithm names.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    EdDSA,
    ES256,
    ES256K,
    RS256,
    PS256,
    #[serde(rename = "none")]
    None,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::EdDSA
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Header {
    #[serde(rename = "alg")]
    pub algorithm: Algorithm,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "kid")]
    pub key_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "typ")]
    pub type_: Option<String>,

    // Serialized ahead of `crit`: `{"alg":"EdDSA","b64":false,"crit":["b64"]}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "b64")]
    pub base64urlencode_payload: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "crit")]
    pub critical: Option<Vec<String>>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub additional_parameters: BTreeMap<String, serde_json::Value>,
}

pub fn base64_encode_json<T: Serialize>(object: &T) -> Result<String, Error> {
    let json = serde_json::to_string(&object)?;
    Ok(base64::encode_config(json, base64::URL_SAFE_NO_PAD))
}

pub fn sign_bytes(algorithm: Algorithm, data: &[u8], key: &Ed25519KeyPair) -> Result<Vec<u8>, Error> {
    if algorithm != Algorithm::EdDSA {
        return Err(Error::AlgorithmMismatch);
    }
    #[cfg(feature = "ring")]
    {
        let key_pair =
            ring::signature::Ed25519KeyPair::from_seed_and_public_key(key.seed(), key.public_key())
                .map_err(|_| Error::InvalidKeyPair)?;
        return Ok(key_pair.sign(data).as_ref().to_vec());
    }
    #[cfg(all(not(feature = "ring"), feature = "ed25519-dalek"))]
    {
        use ed25519_dalek::Signer;
        let secret = ed25519_dalek::SecretKey::from_bytes(key.seed())?;
        let public = ed25519_dalek::PublicKey::from_bytes(key.public_key())?;
        let keypair = ed25519_dalek::Keypair { secret, public };
        return Ok(keypair.try_sign(data)?.to_bytes().to_vec());
    }
    #[cfg(all(not(feature = "ring"), not(feature = "ed25519-dalek")))]
    {
        let _ = (data, key);
        compile_error!("Ed25519 requires either the `ring` or the `ed25519-dalek` feature.");
    }
}

pub fn sign_bytes_b64(algorithm: Algorithm, data: &[u8], key: &Ed25519KeyPair) -> Result<String, Error> {
    let signature = sign_bytes(algorithm, data, key)?;
    let sig_b64 = base64::encode_config(signature, base64::URL_SAFE_NO_PAD);
    Ok(sig_b64)
}

pub fn verify_bytes(
    algorithm: Algorithm,
    data: &[u8],
    public_key: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    if algorithm != Algorithm::EdDSA {
        return Err(Error::AlgorithmMismatch);
    }
    #[cfg(feature = "ring")]
    {
        use ring::signature::UnparsedPublicKey;
        let public_key = UnparsedPublicKey::new(&ring::signature::ED25519, public_key);
        return public_key
            .verify(data, signature)
            .map_err(|_| Error::InvalidSignature);
    }
    #[cfg(all(not(feature = "ring"), feature = "ed25519-dalek"))]
    {
        use ed25519_dalek::Verifier;
        use std::convert::TryFrom;
        let public_key = ed25519_dalek::PublicKey::from_bytes(public_key)?;
        let signature =
            ed25519_dalek::Signature::try_from(signature).map_err(|_| Error::InvalidSignature)?;
        return public_key
            .verify(data, &signature)
            .map_err(|_| Error::InvalidSignature);
    }
    #[cfg(all(not(feature = "ring"), not(feature = "ed25519-dalek")))]
    {
        let _ = (data, public_key, signature);
        compile_error!("Ed25519 requires either the `ring` or the `ed25519-dalek` feature.");
    }
}

/// Header for a JWS over an unencoded, detached payload (RFC 7797).
pub fn unencoded_payload_header(algorithm: Algorithm) -> Header {
    Header {
        algorithm,
        critical: Some(vec!["b64".to_string()]),
        base64urlencode_payload: Some(false),
        ..Default::default()
    }
}

pub fn detached_sign_unencoded_payload(
    algorithm: Algorithm,
    payload: &[u8],
    key: &Ed25519KeyPair,
) -> Result<String, Error> {
    let header = unencoded_payload_header(algorithm);
    let header_b64 = base64_encode_json(&header)?;
    let signing_input = [header_b64.as_bytes(), b".", payload].concat();
    let sig_b64 = sign_bytes_b64(header.algorithm, &signing_input, key)?;
    let jws = header_b64 + ".." + &sig_b64;
    Ok(jws)
}

pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = jws.splitn(3, '.');
    Ok(
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c), None) => (a, b, c),
            _ => return Err(Error::InvalidJWS),
        },
    )
}

pub fn split_detached_jws(jws: &str) -> Result<(&str, &str), Error> {
    let (header_b64, omitted_payload, signature_b64) = split_jws(jws)?;
    if !omitted_payload.is_empty() {
        return Err(Error::InvalidJWS);
    }
    Ok((header_b64, signature_b64))
}

pub struct DecodedJWS {
    pub header: Header,
    pub signing_input: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Decode the JOSE header and signature of a detached JWS over an unencoded
/// payload.
///
/// "crit" (critical) header parameters are checked and disallowed if
/// unrecognized/unsupported.
pub fn decode_jws_parts(
    header_b64: &str,
    payload: &[u8],
    signature_b64: &str,
) -> Result<DecodedJWS, Error> {
    let signature = base64::decode_config(signature_b64, base64::URL_SAFE_NO_PAD)?;
    let header_json = base64::decode_config(header_b64, base64::URL_SAFE_NO_PAD)?;
    let header: Header = serde_json::from_slice(&header_json)?;
    if header.base64urlencode_payload != Some(false) {
        return Err(Error::ExpectedUnencodedHeader);
    }
    for name in header.critical.iter().flatten() {
        match name.as_str() {
            "alg" | "jku" | "jwk" | "kid" | "x5u" | "x5c" | "x5t" | "x5t#S256" | "typ" | "cty"
            | "crit" => return Err(Error::InvalidCriticalHeader),
            "b64" => {}
            _ => return Err(Error::UnknownCriticalHeader),
        }
    }
    let signing_input = [header_b64.as_bytes(), b".", payload].concat();
    Ok(DecodedJWS {
        header,
        signing_input,
        signature,
    })
}

/// Verify a JWS with detached, unencoded payload. Returns the JWS header on success.
pub fn detached_verify(jws: &str, payload: &[u8], public_key: &[u8]) -> Result<Header, Error> {
    let (header_b64, signature_b64) = split_detached_jws(jws)?;
    let DecodedJWS {
        header,
        signing_input,
        signature,
    } = decode_jws_parts(header_b64, payload, signature_b64)?;
    verify_bytes(header.algorithm, &signing_input, public_key, &signature)?;
    Ok(header)
}
