//! Linked Data proofs.
//!
//! <https://w3c-ccg.github.io/ld-proofs/>

use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, JsonLdError};
use crate::hash::sha256;
use crate::jsonld::json_to_dataset;
use crate::jws::{detached_sign_unencoded_payload, detached_verify, Algorithm};
use crate::keys::VerificationKey;
use crate::loader::{ContextResolver, UnknownContext, SECURITY_V2_CONTEXT};
use crate::rdf::DataSet;
use crate::urdna2015;
use crate::vc::{Proof, VCDateTime};

pub const ED25519_SIGNATURE_2018: &str = "Ed25519Signature2018";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    AssertionMethod,
    Authentication,
}

impl Default for ProofPurpose {
    fn default() -> Self {
        Self::AssertionMethod
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDataProofOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<ProofPurpose>,
    /// Defaults to the id of the signing key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    /// Defaults to the current time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

pub trait LinkedDataDocument {
    /// RDF dataset of the document, without its proof.
    fn to_dataset_for_signing(&self, resolver: &dyn ContextResolver) -> Result<DataSet, Error>;

    /// URDNA2015-normalized N-Quads of the document, without its proof.
    fn to_canonical_nquads(&self, resolver: &dyn ContextResolver) -> Result<String, Error> {
        let dataset = self.to_dataset_for_signing(resolver)?;
        urdna2015::normalize(&dataset)?.to_nquads()
    }
}

/// Convert a JSON-LD document to an RDF dataset, reporting JSON-LD errors
/// against `kind` ("credential", "presentation", ...).
///
/// Strict expansion rejects terms, types and identifiers that the contexts
/// do not map to absolute IRIs.
pub fn document_to_dataset(
    document: &Value,
    kind: &'static str,
    resolver: &dyn ContextResolver,
    strict: bool,
) -> Result<DataSet, Error> {
    json_to_dataset(document, resolver, !strict).map_err(|err| match err {
        Error::JsonLd(JsonLdError::UnknownContext(UnknownContext(iri))) => {
            Error::ContextResolution(iri)
        }
        Error::JsonLd(source) => Error::NotValidJsonLd { kind, source },
        err => err,
    })
}

impl LinkedDataDocument for Proof {
    fn to_dataset_for_signing(&self, resolver: &dyn ContextResolver) -> Result<DataSet, Error> {
        let mut value = serde_json::to_value(self)?;
        let object = value.as_object_mut().ok_or(Error::ExpectedObject)?;
        object.remove("jws");
        object.remove("proofValue");
        object.insert(
            "@context".to_string(),
            Value::String(SECURITY_V2_CONTEXT.to_string()),
        );
        document_to_dataset(&value, "proof", resolver, false)
    }
}

pub trait ProofSuite {
    fn sign(
        document: &dyn LinkedDataDocument,
        options: &LinkedDataProofOptions,
        key: &VerificationKey,
        resolver: &dyn ContextResolver,
    ) -> Result<Proof, Error>;
    fn verify(
        proof: &Proof,
        document: &dyn LinkedDataDocument,
        public_key: &[u8],
        resolver: &dyn ContextResolver,
    ) -> Result<(), Error>;
}

pub struct LinkedDataProofs;
impl LinkedDataProofs {
    // https://w3c-ccg.github.io/ld-proofs/#proof-algorithm
    pub fn sign(
        document: &dyn LinkedDataDocument,
        options: &LinkedDataProofOptions,
        key: &VerificationKey,
        resolver: &dyn ContextResolver,
    ) -> Result<Proof, Error> {
        Ed25519Signature2018::sign(document, options, key, resolver)
    }

    // https://w3c-ccg.github.io/ld-proofs/#proof-verification-algorithm
    pub fn verify(
        proof: &Proof,
        document: &dyn LinkedDataDocument,
        public_key: &[u8],
        resolver: &dyn ContextResolver,
    ) -> Result<(), Error> {
        match proof.type_.as_str() {
            ED25519_SIGNATURE_2018 => {
                Ed25519Signature2018::verify(proof, document, public_key, resolver)
            }
            other => Err(Error::ProofTypeNotImplemented(other.to_string())),
        }
    }
}

/// `sha256(c14n(proof options)) || sha256(c14n(document))`
fn to_signing_input(
    document: &dyn LinkedDataDocument,
    proof: &Proof,
    resolver: &dyn ContextResolver,
) -> Result<Vec<u8>, Error> {
    let doc_dataset = document.to_dataset_for_signing(resolver)?;
    if doc_dataset.is_empty() {
        return Err(Error::EmptyResult);
    }
    let doc_normalized = urdna2015::normalize(&doc_dataset)?.to_nquads()?;
    let sigopts_normalized = proof.to_canonical_nquads(resolver)?;
    debug!(
        "canonicalized document ({} quads) and proof options ({} quads)",
        doc_dataset.len(),
        sigopts_normalized.lines().count()
    );
    let sigopts_digest = sha256(sigopts_normalized.as_bytes())?;
    let doc_digest = sha256(doc_normalized.as_bytes())?;
    Ok([sigopts_digest.as_ref(), doc_digest.as_ref()].concat())
}

pub struct Ed25519Signature2018;
impl ProofSuite for Ed25519Signature2018 {
    fn sign(
        document: &dyn LinkedDataDocument,
        options: &LinkedDataProofOptions,
        key: &VerificationKey,
        resolver: &dyn ContextResolver,
    ) -> Result<Proof, Error> {
        let signer = key.signer()?;
        let created = options.created.unwrap_or_else(Utc::now);
        let mut proof = Proof {
            created: Some(VCDateTime::new(created, SecondsFormat::Secs)),
            verification_method: Some(
                options
                    .verification_method
                    .clone()
                    .unwrap_or_else(|| key.id.clone()),
            ),
            proof_purpose: Some(options.proof_purpose.unwrap_or_default()),
            challenge: options.challenge.clone(),
            domain: options.domain.clone(),
            ..Proof::new(ED25519_SIGNATURE_2018)
        };
        let message = to_signing_input(document, &proof, resolver)?;
        debug!(
            "signing with verification method {}",
            proof.verification_method.as_deref().unwrap_or_default()
        );
        proof.jws = Some(detached_sign_unencoded_payload(
            Algorithm::EdDSA,
            &message,
            &signer,
        )?);
        Ok(proof)
    }

    fn verify(
        proof: &Proof,
        document: &dyn LinkedDataDocument,
        public_key: &[u8],
        resolver: &dyn ContextResolver,
    ) -> Result<(), Error> {
        let jws = match &proof.jws {
            None => return Err(Error::MissingProofSignature),
            Some(jws) => jws,
        };
        let message = to_signing_input(document, proof, resolver)?;
        detached_verify(jws, &message, public_key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_verification_key, DIDWithKeys, KeyAlgorithm, KeyPair};
    use crate::loader::StaticLoader;
    use serde_json::json;

    const DID: &str = "did:key:z6MknTZPNAtKXhYUC51KueL2RmJX6nMhZAbjfzV6LRv17Juz";

    struct JsonDocument(Value);

    impl LinkedDataDocument for JsonDocument {
        fn to_dataset_for_signing(&self, resolver: &dyn ContextResolver) -> Result<DataSet, Error> {
            document_to_dataset(&self.0, "document", resolver, true)
        }
    }

    fn key() -> VerificationKey {
        derive_verification_key(&DIDWithKeys {
            did: DID.to_string(),
            key_pair: KeyPair::from_hex(
                KeyAlgorithm::EdDSA,
                "76f11a56051843a758f457c5891bac494056d447f3606e5131648c453d6f30f5",
                "b2e15a821fe57b6af467ab4c3aaa264456a14f90bed5cf8a00f013bdbe7177be",
            )
            .unwrap(),
        })
        .unwrap()
    }

    fn created() -> DateTime<Utc> {
        "2023-10-07T20:19:38Z".parse().unwrap()
    }

    fn options() -> LinkedDataProofOptions {
        LinkedDataProofOptions {
            created: Some(created()),
            ..Default::default()
        }
    }

    fn document() -> JsonDocument {
        JsonDocument(json!({
            "@context": "https://schema.org/",
            "@id": "https://example.org/alice",
            "name": "Alice"
        }))
    }

    #[test]
    fn proof_options_nquads() {
        let proof = Proof {
            created: Some(VCDateTime::new(created(), SecondsFormat::Secs)),
            verification_method: Some(key().id),
            proof_purpose: Some(ProofPurpose::AssertionMethod),
            jws: Some("ignored".to_string()),
            ..Proof::new(ED25519_SIGNATURE_2018)
        };
        let expected = format!(
            "_:c14n0 <http://purl.org/dc/terms/created> \"2023-10-07T20:19:38Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> .\n\
             _:c14n0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://w3id.org/security#Ed25519Signature2018> .\n\
             _:c14n0 <https://w3id.org/security#proofPurpose> <https://w3id.org/security#assertionMethod> .\n\
             _:c14n0 <https://w3id.org/security#verificationMethod> <{}#z6MknTZPNAtKXhYUC51KueL2RmJX6nMhZAbjfzV6LRv17Juz> .\n",
            DID
        );
        assert_eq!(proof.to_canonical_nquads(&StaticLoader).unwrap(), expected);
    }

    #[test]
    fn sign_verify() {
        let key = key();
        let document = document();
        let proof = LinkedDataProofs::sign(&document, &options(), &key, &StaticLoader).unwrap();
        assert_eq!(proof.type_, ED25519_SIGNATURE_2018);
        assert_eq!(proof.created.as_ref().unwrap().as_str(), "2023-10-07T20:19:38Z");
        assert_eq!(proof.proof_purpose, Some(ProofPurpose::AssertionMethod));
        assert_eq!(proof.verification_method.as_deref(), Some(key.id.as_str()));
        let public_key = key.public_key().unwrap();
        LinkedDataProofs::verify(&proof, &document, &public_key, &StaticLoader).unwrap();

        let other = JsonDocument(json!({
            "@context": "https://schema.org/",
            "@id": "https://example.org/alice",
            "name": "Mallory"
        }));
        assert!(matches!(
            LinkedDataProofs::verify(&proof, &other, &public_key, &StaticLoader),
            Err(Error::InvalidSignature)
        ));

        let mut unsigned = proof.clone();
        unsigned.jws = None;
        assert!(matches!(
            LinkedDataProofs::verify(&unsigned, &document, &public_key, &StaticLoader),
            Err(Error::MissingProofSignature)
        ));

        let mut other_type = proof;
        other_type.type_ = "RsaSignature2018".to_string();
        assert!(matches!(
            LinkedDataProofs::verify(&other_type, &document, &public_key, &StaticLoader),
            Err(Error::ProofTypeNotImplemented(_))
        ));
    }

    #[test]
    fn challenge_is_signed() {
        let key = key();
        let document = document();
        let options = LinkedDataProofOptions {
            proof_purpose: Some(ProofPurpose::Authentication),
            challenge: Some("abc".to_string()),
            domain: Some("example.org".to_string()),
            ..options()
        };
        let mut proof = LinkedDataProofs::sign(&document, &options, &key, &StaticLoader).unwrap();
        assert_eq!(proof.challenge.as_deref(), Some("abc"));
        assert_eq!(proof.domain.as_deref(), Some("example.org"));
        proof.challenge = Some("xyz".to_string());
        assert!(matches!(
            LinkedDataProofs::verify(&proof, &document, &key.public_key().unwrap(), &StaticLoader),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn empty_document() {
        let document = JsonDocument(json!({"@context": "https://schema.org/"}));
        assert!(matches!(
            LinkedDataProofs::sign(&document, &options(), &key(), &StaticLoader),
            Err(Error::EmptyResult)
        ));
    }

    #[test]
    fn unknown_context() {
        let document = JsonDocument(json!({
            "@context": "https://example.org/unknown-context",
            "name": "Alice"
        }));
        match LinkedDataProofs::sign(&document, &options(), &key(), &StaticLoader) {
            Err(Error::ContextResolution(iri)) => {
                assert_eq!(iri, "https://example.org/unknown-context")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn undefined_term() {
        let document = JsonDocument(json!({
            "@context": {"name": "http://schema.org/name"},
            "name": "Alice",
            "nickname": "Al"
        }));
        let err = LinkedDataProofs::sign(&document, &options(), &key(), &StaticLoader).unwrap_err();
        assert!(err.to_string().starts_with("document is not valid JSON-LD:"));
        match err {
            Error::NotValidJsonLd {
                source: JsonLdError::UndefinedTerm(term),
                ..
            } => assert_eq!(term, "nickname"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn relative_type() {
        let value = json!({
            "@context": {"name": "http://schema.org/name"},
            "@id": "http://example.org/alice",
            "@type": "Person",
            "name": "Alice"
        });
        let err = document_to_dataset(&value, "document", &StaticLoader, true).unwrap_err();
        assert!(
            matches!(
                err,
                Error::NotValidJsonLd {
                    source: JsonLdError::Expansion(_),
                    ..
                }
            ),
            "{:?}",
            err
        );
        // Lax expansion keeps the type, toRdf drops it.
        let dataset = document_to_dataset(&value, "document", &StaticLoader, false).unwrap();
        assert_eq!(
            dataset.to_nquads().unwrap(),
            "<http://example.org/alice> <http://schema.org/name> \"Alice\" .\n"
        );
    }
}
