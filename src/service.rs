//! Signature services.

use crate::error::Error;
use crate::keys::DIDWithKeys;
use crate::loader::ContextLoader;
use crate::vc::{
    sign_vc, sign_vp, CreateCredentialOptions, CreatePresentationOptions, CredentialPayload,
    PresentationPayload,
};

/// A signer of credentials and presentations, producing JSON documents.
pub trait SignatureService {
    fn name(&self) -> &str;

    fn sign_vc(
        &self,
        keys: &DIDWithKeys,
        payload: &CredentialPayload,
        configs: Option<&CreateCredentialOptions>,
    ) -> Result<String, Error>;

    fn sign_vp(
        &self,
        keys: &DIDWithKeys,
        payload: &PresentationPayload,
        configs: Option<&CreatePresentationOptions>,
    ) -> Result<String, Error>;
}

/// Linked Data proofs with `Ed25519Signature2018`.
#[derive(Debug, Clone, Default)]
pub struct JsonLdService {
    loader: ContextLoader,
}

impl JsonLdService {
    pub const NAME: &'static str = "jsonld";

    pub fn new(loader: ContextLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &ContextLoader {
        &self.loader
    }
}

impl SignatureService for JsonLdService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sign_vc(
        &self,
        keys: &DIDWithKeys,
        payload: &CredentialPayload,
        configs: Option<&CreateCredentialOptions>,
    ) -> Result<String, Error> {
        sign_vc(keys, payload, configs, &self.loader)
    }

    fn sign_vp(
        &self,
        keys: &DIDWithKeys,
        payload: &PresentationPayload,
        configs: Option<&CreatePresentationOptions>,
    ) -> Result<String, Error> {
        sign_vp(keys, payload, configs, &self.loader)
    }
}
