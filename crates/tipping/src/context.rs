use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON form of the inbound fields.
///
/// `BTreeMap` serializes in key order, so the token depends only on the field set and not
/// on the order Slack sent the fields in.
pub fn context_uid(fields: &BTreeMap<String, String>) -> String {
    let canonical = serde_json::to_string(fields)
        .unwrap_or_else(|error| format!("serialization_error:{error}"));
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
