//! Issue [W3C Verifiable Credentials][vc-data-model] and Presentations secured
//! with `Ed25519Signature2018` [Linked Data proofs][ld-proofs].
//!
//! A document is expanded as JSON-LD against locally available contexts,
//! converted to an RDF dataset and normalized with [URDNA2015][rdf-canon]. The
//! proof signs `sha256(proof options) || sha256(document)` as a detached
//! [JWS][jws] with an unencoded payload.
//!
//! [vc-data-model]: <https://www.w3.org/TR/vc-data-model/>
//! [ld-proofs]: <https://w3c-ccg.github.io/ld-proofs/>
//! [rdf-canon]: <https://w3c-ccg.github.io/rdf-dataset-canonicalization/spec/>
//! [jws]: <https://www.rfc-editor.org/rfc/rfc7797>
//!
//! # Basic Usage
//!
//! ```
//! use serde_json::json;
//! use vc_jsonld_signer::{DIDWithKeys, JsonLdService, SignatureService};
//!
//! let keys: DIDWithKeys = serde_json::from_value(json!({
//!     "did": "did:key:z6MknTZPNAtKXhYUC51KueL2RmJX6nMhZAbjfzV6LRv17Juz",
//!     "keyPair": {
//!         "algorithm": "EdDSA",
//!         "publicKey": "0x76f11a56051843a758f457c5891bac494056d447f3606e5131648c453d6f30f5",
//!         "privateKey": "0xb2e15a821fe57b6af467ab4c3aaa264456a14f90bed5cf8a00f013bdbe7177be"
//!     }
//! }))?;
//! let payload = serde_json::from_value(json!({
//!     "@context": [
//!         "https://www.w3.org/2018/credentials/v1",
//!         "https://schema.org/docs/jsonldcontext.jsonld"
//!     ],
//!     "type": ["VerifiableCredential", "ProofOfName"],
//!     "issuer": {"id": keys.did},
//!     "issuanceDate": "2023-05-18T17:34:26.000Z",
//!     "credentialSubject": {
//!         "id": "did:ethr:maticmum:0x5F880a6eB77c12Db2e14F29bfE3b1aaf94C95508",
//!         "name": "Ollie"
//!     }
//! }))?;
//!
//! let service = JsonLdService::default();
//! let credential = service.sign_vc(&keys, &payload, None)?;
//! assert!(credential.contains("\"proofPurpose\":\"assertionMethod\""));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod error;
pub mod hash;
pub mod jsonld;
pub mod jws;
pub mod keys;
pub mod ldp;
pub mod loader;
pub mod rdf;
pub mod service;
pub mod urdna2015;
pub mod vc;

pub use error::{Error, JsonLdError};
pub use keys::{derive_verification_key, DIDWithKeys, KeyAlgorithm, KeyPair, VerificationKey};
pub use ldp::{LinkedDataProofOptions, ProofPurpose};
pub use loader::{ContextLoader, ContextResolver, StaticLoader};
pub use service::{JsonLdService, SignatureService};
pub use vc::{
    CreateCredentialOptions, CreatePresentationOptions, Credential, CredentialPayload,
    Presentation, PresentationPayload,
};
