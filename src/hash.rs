//! SHA-256, backed by `ring` (default) or by the pure-Rust `sha2` crate
//! when the `sha` feature is enabled without `ring`.

use crate::error::Error;

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> Result<[u8; 32], Error> {
    #[cfg(feature = "ring")]
    {
        use ring::digest;
        use std::convert::TryInto;
        let hash = digest::digest(&digest::SHA256, data).as_ref().try_into()?;
        return Ok(hash);
    }
    #[cfg(all(not(feature = "ring"), feature = "sha2"))]
    {
        use sha2::Digest;
        let mut hasher = sha2::Sha256::new();
        hasher.update(data);
        let hash = hasher.finalize().into();
        return Ok(hash);
    }
    #[cfg(all(not(feature = "ring"), not(feature = "sha2")))]
    {
        let _ = data;
        compile_error!("SHA-256 requires either the `ring` or the `sha` feature.");
    }
}

/// SHA-256 digest of `data` as a lowercase hex string, the form URDNA2015
/// compares hashes in.
pub fn sha256_lowerhex(data: &[u8]) -> Result<String, Error> {
    Ok(hex::encode(sha256(data)?))
}
