use std::collections::HashMap;
use std::sync::Arc;

use chrono::prelude::*;
use serde_json::{json, Value};
use vc_jsonld_signer::error::Error;
use vc_jsonld_signer::ldp::LinkedDataDocument;
use vc_jsonld_signer::vc::{issue_credential, issue_presentation, IssuanceDate};
use vc_jsonld_signer::{
    ContextLoader, CreatePresentationOptions, Credential, CredentialPayload, DIDWithKeys,
    JsonLdService, KeyAlgorithm, KeyPair, LinkedDataProofOptions, Presentation,
    PresentationPayload, ProofPurpose, SignatureService, StaticLoader,
};

const DID: &str = "did:key:z6MknTZPNAtKXhYUC51KueL2RmJX6nMhZAbjfzV6LRv17Juz";
const SUBJECT: &str = "did:ethr:maticmum:0x5F880a6eB77c12Db2e14F29bfE3b1aaf94C95508";
const PUBLIC_KEY: &str = "0x76f11a56051843a758f457c5891bac494056d447f3606e5131648c453d6f30f5";
const PRIVATE_KEY: &str = "0xb2e15a821fe57b6af467ab4c3aaa264456a14f90bed5cf8a00f013bdbe7177be76f11a56051843a758f457c5891bac494056d447f3606e5131648c453d6f30f5";

const GOLDEN_JWS: &str = "eyJhbGciOiJFZERTQSIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19..ChSGNIRN8MCACFGgZ6DAwE2ysTYHgr7ZvwktrBwejp8MbdIn6zDGcGY9HSpvdF9cqA_NXfz78ZlWsUZTC4mNBQ";

fn keys(algorithm: KeyAlgorithm) -> DIDWithKeys {
    DIDWithKeys {
        did: DID.to_string(),
        key_pair: KeyPair::from_hex(algorithm, PUBLIC_KEY, PRIVATE_KEY).unwrap(),
    }
}

fn public_key() -> Vec<u8> {
    hex::decode(PUBLIC_KEY.trim_start_matches("0x")).unwrap()
}

fn vc_payload() -> Value {
    json!({
        "@context": [
            "https://www.w3.org/2018/credentials/v1",
            "https://schema.org/docs/jsonldcontext.jsonld"
        ],
        "type": ["VerifiableCredential", "ProofOfName"],
        "issuer": {"id": DID},
        "issuanceDate": "2023-05-18T17:34:26.000Z",
        "credentialSubject": {
            "id": SUBJECT,
            "name": "Ollie"
        }
    })
}

fn credential_payload() -> CredentialPayload {
    serde_json::from_value(vc_payload()).unwrap()
}

fn pinned() -> LinkedDataProofOptions {
    LinkedDataProofOptions {
        created: Some("2023-10-07T20:19:38Z".parse().unwrap()),
        ..Default::default()
    }
}

fn signed_credential() -> Credential {
    issue_credential(
        &keys(KeyAlgorithm::EdDSA),
        &credential_payload(),
        &pinned(),
        &StaticLoader,
    )
    .unwrap()
}

fn vp_payload() -> PresentationPayload {
    serde_json::from_value(json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": "VerifiablePresentation",
        "holder": DID,
        "verifiableCredential": [signed_credential()]
    }))
    .unwrap()
}

fn assert_nquads_eq(actual: &str, expected: &str) {
    if actual != expected {
        let changes = difference::Changeset::new(expected, actual, "\n");
        panic!("canonical N-Quads differ:\n{}", changes);
    }
}

#[test]
fn golden_credential() {
    let credential = signed_credential();
    let expected = format!(
        "<{subject}> <http://schema.org/name> \"Ollie\" .\n\
         _:c14n0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/ProofOfName> .\n\
         _:c14n0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://www.w3.org/2018/credentials#VerifiableCredential> .\n\
         _:c14n0 <https://www.w3.org/2018/credentials#credentialSubject> <{subject}> .\n\
         _:c14n0 <https://www.w3.org/2018/credentials#issuanceDate> \"2023-05-18T17:34:26.000Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> .\n\
         _:c14n0 <https://www.w3.org/2018/credentials#issuer> <{did}> .\n",
        subject = SUBJECT,
        did = DID
    );
    assert_nquads_eq(
        &credential.to_canonical_nquads(&StaticLoader).unwrap(),
        &expected,
    );

    let proof = credential.proof.as_ref().unwrap();
    assert_eq!(proof.jws.as_deref(), Some(GOLDEN_JWS));
    let mut expected_vc = vc_payload();
    expected_vc["proof"] = json!({
        "type": "Ed25519Signature2018",
        "created": "2023-10-07T20:19:38Z",
        "verificationMethod": format!("{}#z6MknTZPNAtKXhYUC51KueL2RmJX6nMhZAbjfzV6LRv17Juz", DID),
        "proofPurpose": "assertionMethod",
        "jws": GOLDEN_JWS
    });
    assert_eq!(serde_json::to_value(&credential).unwrap(), expected_vc);
    credential.verify(&public_key(), &StaticLoader).unwrap();
}

#[test]
fn schema_org_iri_and_typed_properties() {
    let mut value = vc_payload();
    value["credentialSubject"]["sameAs"] = json!("https://example.org/ollie");
    value["credentialSubject"]["birthDate"] = json!("2000-01-01");
    let payload: CredentialPayload = serde_json::from_value(value).unwrap();
    let credential = issue_credential(
        &keys(KeyAlgorithm::EdDSA),
        &payload,
        &pinned(),
        &StaticLoader,
    )
    .unwrap();
    let expected = format!(
        "<{subject}> <http://schema.org/birthDate> \"2000-01-01\"^^<http://schema.org/Date> .\n\
         <{subject}> <http://schema.org/name> \"Ollie\" .\n\
         <{subject}> <http://schema.org/sameAs> <https://example.org/ollie> .\n\
         _:c14n0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/ProofOfName> .\n\
         _:c14n0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://www.w3.org/2018/credentials#VerifiableCredential> .\n\
         _:c14n0 <https://www.w3.org/2018/credentials#credentialSubject> <{subject}> .\n\
         _:c14n0 <https://www.w3.org/2018/credentials#issuanceDate> \"2023-05-18T17:34:26.000Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> .\n\
         _:c14n0 <https://www.w3.org/2018/credentials#issuer> <{did}> .\n",
        subject = SUBJECT,
        did = DID
    );
    assert_nquads_eq(
        &credential.to_canonical_nquads(&StaticLoader).unwrap(),
        &expected,
    );
    credential.verify(&public_key(), &StaticLoader).unwrap();
}

#[test]
fn sign_vc_service() {
    let service = JsonLdService::default();
    assert_eq!(service.name(), "jsonld");
    let output = service
        .sign_vc(&keys(KeyAlgorithm::EdDSA), &credential_payload(), None)
        .unwrap();
    let credential: Credential = serde_json::from_str(&output).unwrap();
    assert!(credential.id.is_none());
    let proof = credential.proof.as_ref().unwrap();
    assert_eq!(proof.proof_purpose, Some(ProofPurpose::AssertionMethod));
    assert!(proof.created.as_ref().unwrap().as_str().ends_with('Z'));
    credential.verify(&public_key(), service.loader()).unwrap();
}

#[test]
fn optional_id() {
    let service = JsonLdService::default();
    let output = service
        .sign_vc(&keys(KeyAlgorithm::EdDSA), &credential_payload(), None)
        .unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert!(value.get("id").is_none());

    let mut payload = credential_payload();
    payload.id = Some("urn:uuid:7a6cafb9-11c3-41a8-98d8-8b5a45c2548f".to_string());
    let output = service
        .sign_vc(&keys(KeyAlgorithm::EdDSA), &payload, None)
        .unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["id"], "urn:uuid:7a6cafb9-11c3-41a8-98d8-8b5a45c2548f");
}

#[test]
fn issuance_date_value() {
    let mut payload = credential_payload();
    payload.issuance_date = IssuanceDate::from(
        "2023-05-18T17:34:26Z".parse::<DateTime<Utc>>().unwrap(),
    );
    let credential =
        issue_credential(&keys(KeyAlgorithm::EdDSA), &payload, &pinned(), &StaticLoader).unwrap();
    assert_eq!(credential.issuance_date.as_str(), "2023-05-18T17:34:26.000Z");
    assert_eq!(credential, signed_credential());
}

#[test]
fn algorithm_gate() {
    let service = JsonLdService::default();
    for algorithm in &[KeyAlgorithm::ES256K, KeyAlgorithm::ES256, KeyAlgorithm::RS256] {
        let err = service
            .sign_vc(&keys(*algorithm), &credential_payload(), None)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
        let configs = CreatePresentationOptions {
            challenge: Some("jasonschallenge".to_string()),
            ..Default::default()
        };
        let err = service
            .sign_vp(&keys(*algorithm), &vp_payload(), Some(&configs))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }
}

#[test]
fn missing_schema_context() {
    let mut value = vc_payload();
    value["@context"] = json!(["https://www.w3.org/2018/credentials/v1"]);
    let payload: CredentialPayload = serde_json::from_value(value).unwrap();
    let err = JsonLdService::default()
        .sign_vc(&keys(KeyAlgorithm::EdDSA), &payload, None)
        .unwrap_err();
    assert!(
        err.to_string().starts_with("credential is not valid JSON-LD:"),
        "{}",
        err
    );
}

#[test]
fn unknown_context() {
    let mut value = vc_payload();
    value["@context"] = json!([
        "https://www.w3.org/2018/credentials/v1",
        "https://example.org/contexts/name/v1"
    ]);
    value["credentialSubject"] = json!({"id": SUBJECT, "nickname": "Ollie"});
    value["type"] = json!("VerifiableCredential");
    let payload: CredentialPayload = serde_json::from_value(value).unwrap();

    match JsonLdService::default().sign_vc(&keys(KeyAlgorithm::EdDSA), &payload, None) {
        Err(Error::ContextResolution(iri)) => {
            assert_eq!(iri, "https://example.org/contexts/name/v1")
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let mut contexts = HashMap::new();
    contexts.insert(
        "https://example.org/contexts/name/v1".to_string(),
        r#"{"@context": {"nickname": "https://example.org/vocab#nickname"}}"#.to_string(),
    );
    let loader = ContextLoader::empty()
        .with_static_loader()
        .with_context_map_from(contexts)
        .unwrap();
    let service = JsonLdService::new(loader);
    let output = service
        .sign_vc(&keys(KeyAlgorithm::EdDSA), &payload, None)
        .unwrap();
    let credential: Credential = serde_json::from_str(&output).unwrap();
    credential.verify(&public_key(), service.loader()).unwrap();
}

#[test]
fn tampered_credential() {
    let mut credential = signed_credential();
    if let Some(subject) = credential.credential_subject.first().cloned() {
        let mut subject = subject;
        subject.insert("name".to_string(), json!("Mallory"));
        credential.credential_subject = subject.into();
    }
    assert!(matches!(
        credential.verify(&public_key(), &StaticLoader),
        Err(Error::InvalidSignature)
    ));

    let mut credential = signed_credential();
    credential.proof = None;
    assert!(matches!(
        credential.verify(&public_key(), &StaticLoader),
        Err(Error::MissingProof)
    ));
}

#[test]
fn sign_vp_service() {
    let service = JsonLdService::default();
    let configs = CreatePresentationOptions {
        challenge: Some("jasonschallenge".to_string()),
        ..Default::default()
    };
    let output = service
        .sign_vp(&keys(KeyAlgorithm::EdDSA), &vp_payload(), Some(&configs))
        .unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["type"], "VerifiablePresentation");
    assert!(value["verifiableCredential"].is_object());
    assert_eq!(value["proof"]["proofPurpose"], "authentication");
    assert_eq!(value["proof"]["challenge"], "jasonschallenge");
    assert!(value["proof"].get("domain").is_none());

    let presentation: Presentation = serde_json::from_value(value).unwrap();
    presentation.verify(&public_key(), &StaticLoader).unwrap();
    presentation
        .verifiable_credential
        .verify(&public_key(), &StaticLoader)
        .unwrap();

    let mut tampered = presentation;
    tampered.holder = Some("did:example:mallory".to_string());
    assert!(matches!(
        tampered.verify(&public_key(), &StaticLoader),
        Err(Error::InvalidSignature)
    ));
}

#[test]
fn presentation_canonical_form() {
    let options = LinkedDataProofOptions {
        challenge: Some("jasonschallenge".to_string()),
        ..pinned()
    };
    let presentation = issue_presentation(
        &keys(KeyAlgorithm::EdDSA),
        &vp_payload(),
        &options,
        &StaticLoader,
    )
    .unwrap();
    // The credential and its proof each land in their own named graph.
    let expected = format!(
        "<{subject}> <http://schema.org/name> \"Ollie\" _:c14n1 .\n\
         _:c14n2 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://www.w3.org/2018/credentials#VerifiablePresentation> .\n\
         _:c14n2 <https://www.w3.org/2018/credentials#holder> <{did}> .\n\
         _:c14n2 <https://www.w3.org/2018/credentials#verifiableCredential> _:c14n1 .\n\
         _:c14n3 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/ProofOfName> _:c14n1 .\n\
         _:c14n3 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://www.w3.org/2018/credentials#VerifiableCredential> _:c14n1 .\n\
         _:c14n3 <https://w3id.org/security#proof> _:c14n0 _:c14n1 .\n\
         _:c14n3 <https://www.w3.org/2018/credentials#credentialSubject> <{subject}> _:c14n1 .\n\
         _:c14n3 <https://www.w3.org/2018/credentials#issuanceDate> \"2023-05-18T17:34:26.000Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> _:c14n1 .\n\
         _:c14n3 <https://www.w3.org/2018/credentials#issuer> <{did}> _:c14n1 .\n\
         _:c14n4 <http://purl.org/dc/terms/created> \"2023-10-07T20:19:38Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> _:c14n0 .\n\
         _:c14n4 <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://w3id.org/security#Ed25519Signature2018> _:c14n0 .\n\
         _:c14n4 <https://w3id.org/security#jws> \"{jws}\" _:c14n0 .\n\
         _:c14n4 <https://w3id.org/security#proofPurpose> <https://w3id.org/security#assertionMethod> _:c14n0 .\n\
         _:c14n4 <https://w3id.org/security#verificationMethod> <{did}#z6MknTZPNAtKXhYUC51KueL2RmJX6nMhZAbjfzV6LRv17Juz> _:c14n0 .\n",
        subject = SUBJECT,
        did = DID,
        jws = GOLDEN_JWS
    );
    assert_nquads_eq(
        &presentation.to_canonical_nquads(&StaticLoader).unwrap(),
        &expected,
    );
}

#[test]
fn presentation_domain() {
    let options = LinkedDataProofOptions {
        challenge: Some("jasonschallenge".to_string()),
        domain: Some("example.org".to_string()),
        ..pinned()
    };
    let presentation = issue_presentation(
        &keys(KeyAlgorithm::EdDSA),
        &vp_payload(),
        &options,
        &StaticLoader,
    )
    .unwrap();
    let proof = presentation.proof.as_ref().unwrap();
    assert_eq!(proof.domain.as_deref(), Some("example.org"));
    assert_eq!(proof.created.as_ref().unwrap().as_str(), "2023-10-07T20:19:38Z");
    presentation.verify(&public_key(), &StaticLoader).unwrap();
}

#[test]
fn presentation_checks() {
    let service = JsonLdService::default();
    let eddsa = keys(KeyAlgorithm::EdDSA);
    let es256k = keys(KeyAlgorithm::ES256K);
    let configs = CreatePresentationOptions {
        challenge: Some("jasonschallenge".to_string()),
        ..Default::default()
    };

    let mut payload = vp_payload();
    payload.verifiable_credential.clear();
    let err = service.sign_vp(&es256k, &payload, None).unwrap_err();
    assert!(matches!(err, Error::MissingCredential));
    assert_eq!(err.to_string(), "Missing verifiable credential");

    let payload: PresentationPayload = serde_json::from_value(json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": "VerifiablePresentation",
        "holder": DID,
        "verifiableCredential": ["eyJhbGciOiJFUzI1NksifQ.e30.c2ln", signed_credential()]
    }))
    .unwrap();
    let err = service.sign_vp(&es256k, &payload, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "JWT token is insufficient data for the presentation."
    );

    let mut payload = vp_payload();
    payload
        .verifiable_credential
        .push(payload.verifiable_credential[0].clone());
    assert!(matches!(
        service.sign_vp(&eddsa, &payload, Some(&configs)),
        Err(Error::MultipleCredentials(2))
    ));

    assert!(matches!(
        service.sign_vp(&es256k, &vp_payload(), None),
        Err(Error::UnsupportedAlgorithm(_))
    ));

    let err = service.sign_vp(&eddsa, &vp_payload(), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "A challenge is required for a verifiable presentation."
    );
    let empty = CreatePresentationOptions {
        challenge: Some(String::new()),
        ..Default::default()
    };
    assert!(matches!(
        service.sign_vp(&eddsa, &vp_payload(), Some(&empty)),
        Err(Error::MissingChallenge)
    ));
}

#[test]
fn canonical_form_ignores_ordering() {
    let mut value = vc_payload();
    value["credentialSubject"] = json!([
        {"name": "Ollie", "email": "ollie@example.org"},
        {"name": "Jason"}
    ]);
    let first: CredentialPayload = serde_json::from_value(value.clone()).unwrap();
    value["credentialSubject"] = json!([
        {"name": "Jason"},
        {"email": "ollie@example.org", "name": "Ollie"}
    ]);
    value["type"] = json!(["ProofOfName", "VerifiableCredential"]);
    let second: CredentialPayload = serde_json::from_value(value).unwrap();

    let eddsa = keys(KeyAlgorithm::EdDSA);
    let first = issue_credential(&eddsa, &first, &pinned(), &StaticLoader).unwrap();
    let second = issue_credential(&eddsa, &second, &pinned(), &StaticLoader).unwrap();
    assert_nquads_eq(
        &first.to_canonical_nquads(&StaticLoader).unwrap(),
        &second.to_canonical_nquads(&StaticLoader).unwrap(),
    );
    assert_eq!(
        first.proof.as_ref().unwrap().jws,
        second.proof.as_ref().unwrap().jws
    );
}

#[test]
fn concurrent_signing() {
    let service = Arc::new(JsonLdService::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            std::thread::spawn(move || {
                issue_credential(
                    &keys(KeyAlgorithm::EdDSA),
                    &credential_payload(),
                    &pinned(),
                    service.loader(),
                )
                .unwrap()
            })
        })
        .collect();
    for handle in handles {
        let credential = handle.join().unwrap();
        assert_eq!(
            credential.proof.unwrap().jws.as_deref(),
            Some(GOLDEN_JWS)
        );
    }
}

#[tokio::test]
async fn spawn_blocking() {
    let service = JsonLdService::default();
    let output = tokio::task::spawn_blocking(move || {
        service.sign_vc(&keys(KeyAlgorithm::EdDSA), &credential_payload(), None)
    })
    .await
    .unwrap()
    .unwrap();
    let credential: Credential = serde_json::from_str(&output).unwrap();
    credential.verify(&public_key(), &StaticLoader).unwrap();
}
