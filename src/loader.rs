//! JSON-LD context loaders.
//!
//! Contexts are never fetched over the network. The [`StaticLoader`] serves the
//! contexts bundled in the `vc-jsonld-contexts` crate, and a [`ContextLoader`]
//! can additionally serve application-supplied context documents. Both are
//! [`json_ld::Loader`]s.

use std::collections::HashMap;
use std::sync::Arc;

use iref::{Iri, IriBuf};
use json_ld::{LoadError, Loader};
use json_syntax::Parse;
use thiserror::Error;

/// Remote JSON-LD document.
pub type RemoteDocument = json_ld::RemoteDocument<IriBuf>;

pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const SECURITY_V1_CONTEXT: &str = "https://w3id.org/security/v1";
pub const SECURITY_V2_CONTEXT: &str = "https://w3id.org/security/v2";
pub const SCHEMA_ORG_CONTEXT: &str = "https://schema.org/";
pub const SCHEMA_ORG_CONTEXT_NO_SLASH: &str = "https://schema.org";
pub const SCHEMA_ORG_HTTP_CONTEXT: &str = "http://schema.org/";
pub const SCHEMA_ORG_DOCS_CONTEXT: &str = "https://schema.org/docs/jsonldcontext.jsonld";

/// Load a remote context from its static definition.
///
/// Panics if the bundled document is not JSON or its IRI is invalid: both
/// are fixed at build time.
fn load_static_context(iri: &str, content: &str) -> RemoteDocument {
    let url = IriBuf::new(iri.to_string()).expect("bundled context IRI is valid");
    let (document, _) = json_syntax::Value::parse_str(content)
        .unwrap_or_else(|e| panic!("bundled context {} is not valid JSON: {}", iri, e));
    RemoteDocument::new(Some(url), "application/ld+json".parse().ok(), document)
}

lazy_static! {
    pub static ref CREDENTIALS_V1_CONTEXT_DOCUMENT: RemoteDocument = load_static_context(
        CREDENTIALS_V1_CONTEXT,
        vc_jsonld_contexts::CREDENTIALS_V1
    );
    pub static ref SECURITY_V1_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(SECURITY_V1_CONTEXT, vc_jsonld_contexts::SECURITY_V1);
    pub static ref SECURITY_V2_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(SECURITY_V2_CONTEXT, vc_jsonld_contexts::SECURITY_V2);
    pub static ref SCHEMA_ORG_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(SCHEMA_ORG_CONTEXT, vc_jsonld_contexts::SCHEMA_ORG);
}

/// Error raised by a context resolver when it has no document for an IRI.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown context: {0}")]
pub struct UnknownContext(pub String);

/// Resolve a context IRI to its JSON-LD document.
///
/// Implementations must be deterministic and free of side effects.
pub trait ContextResolver {
    fn resolve(&self, iri: &str) -> Result<RemoteDocument, UnknownContext>;
}

impl<T: ContextResolver + ?Sized> ContextResolver for &T {
    fn resolve(&self, iri: &str) -> Result<RemoteDocument, UnknownContext> {
        (**self).resolve(iri)
    }
}

/// A [`ContextResolver`] seen as a [`json_ld::Loader`].
pub struct ResolverLoader<'a>(pub &'a dyn ContextResolver);

impl Loader for ResolverLoader<'_> {
    async fn load(&self, url: &Iri) -> Result<RemoteDocument, LoadError> {
        self.0
            .resolve(url.as_str())
            .map_err(|e| LoadError::new(url.to_owned(), e))
    }
}

/// Serves the bundled contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl ContextResolver for StaticLoader {
    fn resolve(&self, iri: &str) -> Result<RemoteDocument, UnknownContext> {
        match iri {
            CREDENTIALS_V1_CONTEXT => Ok(CREDENTIALS_V1_CONTEXT_DOCUMENT.clone()),
            SECURITY_V1_CONTEXT => Ok(SECURITY_V1_CONTEXT_DOCUMENT.clone()),
            SECURITY_V2_CONTEXT => Ok(SECURITY_V2_CONTEXT_DOCUMENT.clone()),
            SCHEMA_ORG_CONTEXT
            | SCHEMA_ORG_CONTEXT_NO_SLASH
            | SCHEMA_ORG_HTTP_CONTEXT
            | SCHEMA_ORG_DOCS_CONTEXT => Ok(SCHEMA_ORG_CONTEXT_DOCUMENT.clone()),
            _ => Err(UnknownContext(iri.to_string())),
        }
    }
}

impl Loader for StaticLoader {
    async fn load(&self, url: &Iri) -> Result<RemoteDocument, LoadError> {
        ResolverLoader(self).load(url).await
    }
}

pub type ContextMap = HashMap<IriBuf, RemoteDocument>;

/// Error that can be raised by the [`ContextLoader::with_context_map_from`]
/// constructor function.
///
/// This error is raised either if some input document is not JSON, or if it is
/// bound to an invalid IRI.
#[derive(Debug, Error)]
pub enum FromContextMapError {
    #[error(transparent)]
    ParseError(#[from] json_syntax::parse::Error),

    #[error("invalid IRI `{0}`")]
    InvalidIri(String),
}

#[derive(Clone)]
pub struct ContextLoader {
    // Specifies if StaticLoader is meant to be checked first.
    static_loader: Option<StaticLoader>,
    // Application-specific context documents, parsed once and shared.
    context_map: Option<Arc<ContextMap>>,
}

impl std::fmt::Debug for ContextLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("ContextLoader")
            .field("static_loader", &self.static_loader.is_some())
            .finish_non_exhaustive()
    }
}

impl ContextLoader {
    /// Constructs an "empty" ContextLoader.
    pub fn empty() -> Self {
        Self {
            static_loader: None,
            context_map: None,
        }
    }

    /// Using the builder pattern, the StaticLoader can be enabled so that contexts are checked
    /// against it before being checked against context_map.
    pub fn with_static_loader(mut self) -> Self {
        self.static_loader = Some(StaticLoader);
        self
    }

    /// Using the builder pattern, the map of additional contexts can be set.  These context objects
    /// will be checked after StaticLoader (if it's specified).  preparsed_context_map should map
    /// the context URLs to their JSON content.
    pub fn with_context_map_from(
        mut self,
        preparsed_context_map: HashMap<String, String>,
    ) -> Result<Self, FromContextMapError> {
        let context_map = preparsed_context_map
            .into_iter()
            .map(
                |(url, jsonld)| -> Result<(IriBuf, RemoteDocument), FromContextMapError> {
                    let iri = IriBuf::new(url.clone())
                        .map_err(|_| FromContextMapError::InvalidIri(url))?;
                    let (doc, _) = json_syntax::Value::parse_str(&jsonld)?;
                    let remote_doc = RemoteDocument::new(
                        Some(iri.clone()),
                        "application/ld+json".parse().ok(),
                        doc,
                    );
                    Ok((iri, remote_doc))
                },
            )
            .collect::<Result<ContextMap, FromContextMapError>>()?;
        self.context_map = Some(Arc::new(context_map));
        Ok(self)
    }
}

/// The default ContextLoader only uses StaticLoader.
impl Default for ContextLoader {
    fn default() -> Self {
        Self {
            static_loader: Some(StaticLoader),
            context_map: None,
        }
    }
}

impl ContextResolver for ContextLoader {
    fn resolve(&self, iri: &str) -> Result<RemoteDocument, UnknownContext> {
        if let Some(static_loader) = &self.static_loader {
            if let Ok(doc) = static_loader.resolve(iri) {
                return Ok(doc);
            }
        }
        let doc = match (&self.context_map, Iri::new(iri)) {
            (Some(context_map), Ok(iri)) => context_map.get(iri),
            _ => None,
        };
        match doc {
            Some(doc) => Ok(doc.clone()),
            None => {
                warn!("context not available locally: {}", iri);
                Err(UnknownContext(iri.to_string()))
            }
        }
    }
}

impl Loader for ContextLoader {
    async fn load(&self, url: &Iri) -> Result<RemoteDocument, LoadError> {
        ResolverLoader(self).load(url).await
    }
}
