//! Stored access policies and their wire codec.

use crate::error::ValidationError;
use crate::message::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of stored access policies on a single queue.
///
/// The ceiling is a per-resource-kind constant; other resource kinds carry
/// their own value and pass it to the codec explicitly.
pub const QUEUE_MAX_ACCESS_POLICIES: usize = 5;

/// A named permission grant with an optional validity window.
///
/// Unset fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<Timestamp>,
}

impl AccessPolicy {
    /// Create a policy with a permission string and validity window
    pub fn new(permission: String, start: Timestamp, expiry: Timestamp) -> Self {
        Self {
            permission: Some(permission),
            start: Some(start),
            expiry: Some(expiry),
        }
    }
}

/// Wire representation of one named policy entry.
///
/// `start` and `expiry` travel as ISO-8601 UTC strings; an identifier may
/// legitimately carry no policy body at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIdentifier {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

/// Encode a name -> policy mapping into wire identifiers.
///
/// Fails with [`ValidationError::TooManyAccessPolicies`] when the mapping
/// exceeds `max`, before anything is sent. An empty mapping encodes to an
/// empty identifier list, which clears all policies on the resource.
pub fn encode_access_policies(
    policies: &HashMap<String, AccessPolicy>,
    max: usize,
) -> Result<Vec<SignedIdentifier>, ValidationError> {
    if policies.len() > max {
        return Err(ValidationError::TooManyAccessPolicies {
            provided: policies.len(),
            max,
        });
    }

    // Sort for a deterministic wire order
    let mut names: Vec<&String> = policies.keys().collect();
    names.sort();

    Ok(names
        .into_iter()
        .map(|name| {
            let policy = &policies[name];
            SignedIdentifier {
                id: name.clone(),
                permission: policy.permission.clone(),
                start: policy.start.map(|t| t.to_iso8601()),
                expiry: policy.expiry.map(|t| t.to_iso8601()),
            }
        })
        .collect())
}

/// Decode wire identifiers into a name -> policy mapping.
///
/// Identifiers with no policy body decode to a default [`AccessPolicy`] so
/// callers can always index by id.
pub fn decode_access_policies(
    identifiers: Vec<SignedIdentifier>,
) -> Result<HashMap<String, AccessPolicy>, ValidationError> {
    let mut policies = HashMap::with_capacity(identifiers.len());

    for identifier in identifiers {
        let policy = AccessPolicy {
            permission: identifier.permission,
            start: identifier
                .start
                .as_deref()
                .map(Timestamp::from_iso8601)
                .transpose()?,
            expiry: identifier
                .expiry
                .as_deref()
                .map(Timestamp::from_iso8601)
                .transpose()?,
        };
        policies.insert(identifier.id, policy);
    }

    Ok(policies)
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
