//! JSON-LD context documents bundled for offline use.
//!
//! Each constant holds the raw text of a context document, keyed in the doc
//! comment by the IRI it is served from.

/// <https://www.w3.org/2018/credentials/v1>
pub const CREDENTIALS_V1: &str = include_str!("../w3c-2018-credentials-v1.jsonld");
/// <https://w3id.org/security/v1>
pub const SECURITY_V1: &str = include_str!("../w3id-security-v1.jsonld");
/// <https://w3id.org/security/v2>
pub const SECURITY_V2: &str = include_str!("../w3id-security-v2.jsonld");
/// <https://schema.org/>
pub const SCHEMA_ORG: &str = include_str!("../schema.org.jsonld");
