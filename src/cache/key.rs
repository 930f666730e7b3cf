//! Cache keys and out-of-line value references.
//!
//! An assignment is stored with each object value replaced by a
//! [`StoredValue::CachedRef`] to the SHA-256 of its JSON form. The cache key
//! is the SHA-256 of `(model id, stored params)`, so equal objects always
//! map to the same key and blob.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::space::ParameterAssignment;
use crate::value::{OpaqueValue, ParamValue};

/// How one parameter value is recorded in a cache entry.
///
/// Primitives are kept inline. Objects are replaced by a reference to their
/// content hash and stored out-of-line in the blob store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    /// A primitive value stored as-is.
    Literal(ParamValue),
    /// The SHA-256 hex hash of an out-of-line [`OpaqueValue`].
    CachedRef(String),
}

/// Hex-encoded SHA-256 of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Content hash of an opaque value: kind and payload both contribute.
pub(crate) fn blob_hash(value: &OpaqueValue) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| Error::Storage(e.to_string()))?;
    Ok(sha256_hex(&json))
}

/// Replaces every object value of `assignment` by its content reference.
pub(crate) fn to_stored(assignment: &ParameterAssignment) -> Result<Vec<(String, StoredValue)>> {
    assignment
        .iter()
        .map(|(name, value)| {
            let stored = match value {
                ParamValue::Object(obj) => StoredValue::CachedRef(blob_hash(obj)?),
                primitive => StoredValue::Literal(primitive.clone()),
            };
            Ok((name.to_owned(), stored))
        })
        .collect()
}

/// The cache key of `(model_id, params)`.
pub(crate) fn cache_key(model_id: &str, params: &[(String, StoredValue)]) -> Result<String> {
    let json = serde_json::to_vec(&(model_id, params)).map_err(|e| Error::Storage(e.to_string()))?;
    Ok(sha256_hex(&json))
}
