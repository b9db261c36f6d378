use std::convert::TryFrom;
use std::fmt;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::keys::{derive_verification_key, DIDWithKeys};
use crate::ldp::{
    document_to_dataset, LinkedDataDocument, LinkedDataProofOptions, LinkedDataProofs,
    ProofPurpose,
};
use crate::loader::ContextResolver;
use crate::rdf::DataSet;

// ********************************************
// * Data Structures for Verifiable Credentials
// * W3C Recommendation 19 November 2019
// * https://www.w3.org/TR/vc-data-model/
// ********************************************

pub const DEFAULT_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const SCHEMA_CONTEXT: &str = "https://schema.org/docs/jsonldcontext.jsonld";

pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";
pub const VERIFIABLE_PRESENTATION: &str = "VerifiablePresentation";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first(),
        }
    }

    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq<T>,
    {
        match self {
            Self::One(value) => x == value,
            Self::Many(values) => values.contains(x),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
#[serde(try_from = "ContextsUnchecked")]
pub enum Contexts {
    One(Context),
    Many(Vec<Context>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ContextsUnchecked {
    One(Context),
    Many(Vec<Context>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Context {
    URI(String),
    Object(Map<String, Value>),
}

impl TryFrom<ContextsUnchecked> for Contexts {
    type Error = &'static str;
    fn try_from(context: ContextsUnchecked) -> Result<Self, Self::Error> {
        // first context must be the default
        let first_context = match &context {
            ContextsUnchecked::One(context) => context,
            ContextsUnchecked::Many(contexts) => contexts.first().ok_or("Missing context")?,
        };
        match first_context {
            Context::URI(uri) if uri == DEFAULT_CONTEXT => {}
            Context::URI(_) => return Err("Invalid context"),
            Context::Object(_) => return Err("Base context must be URI"),
        }
        Ok(match context {
            ContextsUnchecked::One(context) => Contexts::One(context),
            ContextsUnchecked::Many(contexts) => Contexts::Many(contexts),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
#[serde(try_from = "IssuerUnchecked")]
pub enum Issuer {
    URI(String),
    Object(ObjectWithId),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum IssuerUnchecked {
    URI(String),
    Object(ObjectWithId),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectWithId {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

impl Issuer {
    pub fn get_id(&self) -> &str {
        match self {
            Self::URI(uri) => uri,
            Self::Object(object) => &object.id,
        }
    }
}

impl TryFrom<IssuerUnchecked> for Issuer {
    type Error = &'static str;
    fn try_from(issuer: IssuerUnchecked) -> Result<Self, Self::Error> {
        // must be either URI or object containing id property
        match issuer {
            IssuerUnchecked::URI(uri) => {
                if uri.contains(':') {
                    Ok(Issuer::URI(uri))
                } else {
                    Err("Issuer string is not a URI")
                }
            }
            // id property is already required by the ObjectWithId struct
            IssuerUnchecked::Object(object) => Ok(Issuer::Object(object)),
        }
    }
}

/// RFC 3339 date-time that keeps the lexical form it was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VCDateTime {
    date_time: DateTime<FixedOffset>,
    lexical: String,
}

impl VCDateTime {
    /// Render `date_time` in UTC with a `Z` suffix, at the given precision.
    ///
    /// [`SecondsFormat::Millis`] gives the ECMAScript `toISOString` form.
    pub fn new(date_time: DateTime<Utc>, format: SecondsFormat) -> Self {
        Self {
            lexical: date_time.to_rfc3339_opts(format, true),
            date_time: date_time.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.lexical
    }

    pub fn date_time(&self) -> DateTime<FixedOffset> {
        self.date_time
    }
}

impl TryFrom<String> for VCDateTime {
    type Error = chrono::ParseError;
    fn try_from(lexical: String) -> Result<Self, Self::Error> {
        let date_time = DateTime::parse_from_rfc3339(&lexical)?;
        Ok(Self { date_time, lexical })
    }
}

impl From<VCDateTime> for String {
    fn from(date_time: VCDateTime) -> Self {
        date_time.lexical
    }
}

impl fmt::Display for VCDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical)
    }
}

/// Issuance date as supplied by the caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum IssuanceDate {
    String(String),
    DateTime(DateTime<Utc>),
}

impl IssuanceDate {
    /// Date values take the `toISOString` form. Strings pass through unchanged
    /// once checked as RFC 3339.
    pub fn to_vc_date_time(&self) -> Result<VCDateTime, Error> {
        Ok(match self {
            Self::String(string) => VCDateTime::try_from(string.clone())?,
            Self::DateTime(date_time) => VCDateTime::new(*date_time, SecondsFormat::Millis),
        })
    }
}

impl From<DateTime<Utc>> for IssuanceDate {
    fn from(date_time: DateTime<Utc>) -> Self {
        Self::DateTime(date_time)
    }
}

impl From<&str> for IssuanceDate {
    fn from(string: &str) -> Self {
        Self::String(string.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<VCDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<ProofPurpose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

impl Proof {
    pub fn new(type_: &str) -> Self {
        Self {
            type_: type_.to_string(),
            created: None,
            verification_method: None,
            proof_purpose: None,
            challenge: None,
            domain: None,
            nonce: None,
            jws: None,
            property_set: None,
        }
    }
}

/// Credential input for [`sign_vc`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    #[serde(rename = "@context")]
    pub context: Contexts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    pub issuer: Issuer,
    pub issuance_date: IssuanceDate,
    pub credential_subject: OneOrMany<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: Contexts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    pub issuer: Issuer,
    pub issuance_date: VCDateTime,
    pub credential_subject: OneOrMany<Map<String, Value>>,
    // This field is populated only when using
    // embedded proofs such as LD-PROOF
    //   https://w3c-ccg.github.io/ld-proofs/
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub property_set: Option<Map<String, Value>>,
}

impl Credential {
    /// Unsigned credential carrying the payload's properties.
    pub fn from_payload(payload: &CredentialPayload) -> Result<Self, Error> {
        Ok(Self {
            context: payload.context.clone(),
            id: payload.id.clone(),
            type_: payload.type_.clone(),
            issuer: payload.issuer.clone(),
            issuance_date: payload.issuance_date.to_vc_date_time()?,
            credential_subject: payload.credential_subject.clone(),
            proof: None,
            property_set: None,
        })
    }

    pub fn verify(&self, public_key: &[u8], resolver: &dyn ContextResolver) -> Result<(), Error> {
        let proof = self.proof.as_ref().ok_or(Error::MissingProof)?;
        LinkedDataProofs::verify(proof, self, public_key, resolver)
    }
}

impl LinkedDataDocument for Credential {
    fn to_dataset_for_signing(&self, resolver: &dyn ContextResolver) -> Result<DataSet, Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("proof");
        }
        document_to_dataset(&value, "credential", resolver, true)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CredentialOrJWT {
    Credential(Credential),
    JWT(String),
}

/// Presentation input for [`sign_vp`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationPayload {
    #[serde(rename = "@context")]
    pub context: Contexts,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    #[serde(default)]
    pub verifiable_credential: Vec<CredentialOrJWT>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(rename = "@context")]
    pub context: Contexts,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    pub verifiable_credential: Credential,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Presentation {
    /// Verify the presentation proof. The embedded credential keeps its own
    /// proof, checked with [`Credential::verify`] against the issuer key.
    pub fn verify(&self, public_key: &[u8], resolver: &dyn ContextResolver) -> Result<(), Error> {
        let proof = self.proof.as_ref().ok_or(Error::MissingProof)?;
        LinkedDataProofs::verify(proof, self, public_key, resolver)
    }
}

impl LinkedDataDocument for Presentation {
    fn to_dataset_for_signing(&self, resolver: &dyn ContextResolver) -> Result<DataSet, Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("proof");
        }
        document_to_dataset(&value, "presentation", resolver, true)
    }
}

/// Options for [`sign_vc`]. Currently none.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredentialOptions {}

/// Options for [`sign_vp`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePresentationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Sign a credential with an `assertionMethod` proof.
///
/// `options.proof_purpose` is overridden. The other options are passed on to
/// the proof suite.
pub fn issue_credential(
    keys: &DIDWithKeys,
    payload: &CredentialPayload,
    options: &LinkedDataProofOptions,
    resolver: &dyn ContextResolver,
) -> Result<Credential, Error> {
    let key = derive_verification_key(keys)?;
    let mut credential = Credential::from_payload(payload)?;
    let options = LinkedDataProofOptions {
        proof_purpose: Some(ProofPurpose::AssertionMethod),
        ..options.clone()
    };
    let proof = LinkedDataProofs::sign(&credential, &options, &key, resolver)?;
    credential.proof = Some(proof);
    Ok(credential)
}

/// Sign a presentation of a single credential with an `authentication` proof.
///
/// `options.challenge` is required.
pub fn issue_presentation(
    keys: &DIDWithKeys,
    payload: &PresentationPayload,
    options: &LinkedDataProofOptions,
    resolver: &dyn ContextResolver,
) -> Result<Presentation, Error> {
    let credential = match payload.verifiable_credential.as_slice() {
        [] => return Err(Error::MissingCredential),
        [CredentialOrJWT::JWT(_), ..] => return Err(Error::UnsupportedFormat),
        [CredentialOrJWT::Credential(credential)] => credential,
        credentials => return Err(Error::MultipleCredentials(credentials.len())),
    };
    let key = derive_verification_key(keys)?;
    match options.challenge.as_deref() {
        Some(challenge) if !challenge.is_empty() => {}
        _ => return Err(Error::MissingChallenge),
    }
    let mut presentation = Presentation {
        context: payload.context.clone(),
        type_: payload.type_.clone(),
        holder: payload.holder.clone(),
        verifiable_credential: credential.clone(),
        proof: None,
    };
    let options = LinkedDataProofOptions {
        proof_purpose: Some(ProofPurpose::Authentication),
        ..options.clone()
    };
    let proof = LinkedDataProofs::sign(&presentation, &options, &key, resolver)?;
    presentation.proof = Some(proof);
    Ok(presentation)
}

/// Sign a credential and serialize it to JSON.
pub fn sign_vc(
    keys: &DIDWithKeys,
    payload: &CredentialPayload,
    _configs: Option<&CreateCredentialOptions>,
    resolver: &dyn ContextResolver,
) -> Result<String, Error> {
    let credential = issue_credential(keys, payload, &LinkedDataProofOptions::default(), resolver)?;
    Ok(serde_json::to_string(&credential)?)
}

/// Sign a presentation and serialize it to JSON.
pub fn sign_vp(
    keys: &DIDWithKeys,
    payload: &PresentationPayload,
    configs: Option<&CreatePresentationOptions>,
    resolver: &dyn ContextResolver,
) -> Result<String, Error> {
    let configs = configs.cloned().unwrap_or_default();
    let options = LinkedDataProofOptions {
        challenge: configs.challenge,
        domain: configs.domain,
        ..Default::default()
    };
    let presentation = issue_presentation(keys, payload, &options, resolver)?;
    Ok(serde_json::to_string(&presentation)?)
}
