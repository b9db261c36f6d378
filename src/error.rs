use base64::DecodeError as Base64Error;
use bs58::decode::Error as Base58Error;
#[cfg(feature = "ed25519-dalek")]
use ed25519_dalek::SignatureError as Ed25519SignatureError;
use hex::FromHexError;
use serde_json::Error as SerdeJSONError;
use std::array::TryFromSliceError;
use thiserror::Error;

use crate::loader::UnknownContext;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Key must have EdDSA algorithm to be converted into an Ed25519VerificationKey2018 (found {0})")]
    UnsupportedAlgorithm(String),
    #[error("Missing verifiable credential")]
    MissingCredential,
    #[error("JWT token is insufficient data for the presentation.")]
    UnsupportedFormat,
    #[error("A presentation can embed a single verifiable credential, found {0}")]
    MultipleCredentials(usize),
    #[error("A challenge is required for a verifiable presentation.")]
    MissingChallenge,
    #[error("Unable to resolve JSON-LD context: {0}")]
    ContextResolution(String),
    #[error("There are no items found in the credential.")]
    EmptyResult,
    #[error("{kind} is not valid JSON-LD: {source}")]
    NotValidJsonLd {
        kind: &'static str,
        source: JsonLdError,
    },
    #[error(transparent)]
    JsonLd(#[from] JsonLdError),
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),
    #[error("Private key does not match public key")]
    InconsistentKeyPair,
    #[error("Invalid key pair")]
    InvalidKeyPair,
    #[error("Invalid JWS")]
    InvalidJWS,
    #[error("Expected unencoded payload (b64: false)")]
    ExpectedUnencodedHeader,
    #[error("Invalid critical header")]
    InvalidCriticalHeader,
    #[error("Unknown critical header")]
    UnknownCriticalHeader,
    #[error("Algorithm in JWS header does not match the key")]
    AlgorithmMismatch,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Missing proof signature")]
    MissingProofSignature,
    #[error("Missing proof")]
    MissingProof,
    #[error("Proof type not implemented: {0}")]
    ProofTypeNotImplemented(String),
    #[error("Missing canonical identifier")]
    MissingIdentifier,
    #[error("Missing chosen issuer")]
    MissingChosenIssuer,
    #[error("Expected N-Quad")]
    ExpectedNQuad,
    #[error("Expected term")]
    ExpectedTerm,
    #[error("Expected IRI reference")]
    ExpectedIRIRef,
    #[error("Expected blank node label")]
    ExpectedBlankNodeLabel,
    #[error("Expected literal")]
    ExpectedLiteral,
    #[error("Expected language tag")]
    ExpectedLang,
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
    #[error("Blank node predicates are not supported")]
    UnsupportedBlankPredicate,
    #[error("Expected object")]
    ExpectedObject,
    #[error("Expected array")]
    ExpectedArray,
    #[error("Expected string")]
    ExpectedString,
    #[error("Expected list array")]
    ExpectedArrayList,
    #[error("Expected value")]
    ExpectedValue,
    #[error("Missing active property")]
    MissingActiveProperty,
    #[error("Missing active property entry")]
    MissingActivePropertyEntry,
    #[error("Missing graph")]
    MissingGraph,
    #[error("Conflicting indexes")]
    ConflictingIndexes,
    #[error("Unable to serialize double")]
    SerializeDouble,
    #[error("Invalid date-time: {0}")]
    DateTime(#[from] chrono::ParseError),
    #[error(transparent)]
    SerdeJSON(#[from] SerdeJSONError),
    #[error(transparent)]
    Base64(#[from] Base64Error),
    #[error(transparent)]
    Base58(#[from] Base58Error),
    #[error(transparent)]
    Hex(#[from] FromHexError),
    #[error(transparent)]
    TryFromSlice(#[from] TryFromSliceError),
    #[cfg(feature = "ed25519-dalek")]
    #[error(transparent)]
    Ed25519(#[from] Ed25519SignatureError),
}

/// Errors raised while expanding a JSON-LD document.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum JsonLdError {
    #[error(transparent)]
    UnknownContext(#[from] UnknownContext),
    #[error("property \"{0}\" is not defined by the context")]
    UndefinedTerm(String),
    #[error("identifier \"{0}\" is not an absolute IRI")]
    RelativeId(String),
    #[error(transparent)]
    Expansion(json_ld::ExpandError),
}

impl From<json_ld::ExpandError> for JsonLdError {
    fn from(e: json_ld::ExpandError) -> Self {
        use json_ld::context_processing::Error as ProcessingError;
        use json_ld::expansion::Error as ExpansionError;
        use json_ld::{ContextLoadError, ExpandError};
        let load_error = match &e {
            ExpandError::Loading(e) => Some(e),
            ExpandError::ContextLoading(ContextLoadError::LoadingDocumentFailed(e)) => Some(e),
            ExpandError::ContextProcessing(ProcessingError::ContextLoadingFailed(e))
            | ExpandError::Expansion(ExpansionError::ContextProcessing(
                ProcessingError::ContextLoadingFailed(e),
            )) => Some(e),
            _ => None,
        };
        if let Some(load_error) = load_error {
            return Self::UnknownContext(UnknownContext(load_error.target.to_string()));
        }
        match e {
            ExpandError::Expansion(ExpansionError::KeyExpansionFailed(key)) => {
                Self::UndefinedTerm(key)
            }
            e => Self::Expansion(e),
        }
    }
}
