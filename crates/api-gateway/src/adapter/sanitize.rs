//! Projection of node documents onto their public shapes.

use crate::hub::Topic;
use serde_json::{Map, Value};

/// Public fields of a pushed block
pub const BLOCK_FIELDS: &[&str] = &[
    "version",
    "currency",
    "number",
    "issuer",
    "issuersFrame",
    "issuersFrameVar",
    "issuersCount",
    "parameters",
    "membersCount",
    "monetaryMass",
    "powMin",
    "time",
    "medianTime",
    "dividend",
    "unitbase",
    "hash",
    "previousHash",
    "previousIssuer",
    "identities",
    "certifications",
    "joiners",
    "actives",
    "leavers",
    "revoked",
    "excluded",
    "transactions",
    "inner_hash",
    "signature",
    "nonce",
];

/// Public fields of a pushed peer
pub const PEER_FIELDS: &[&str] = &[
    "version",
    "currency",
    "pubkey",
    "block",
    "endpoints",
    "signature",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("document is not a JSON object")]
    NotAnObject,
}

/// Turns an internal document into the message pushed for a topic.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, topic: Topic, document: &Value) -> Result<Value, SanitizeError>;
}

/// Keeps only the public fields of each topic; missing fields stay missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DtoProjection;

impl DtoProjection {
    pub fn fields(topic: Topic) -> &'static [&'static str] {
        match topic {
            Topic::Block => BLOCK_FIELDS,
            Topic::Peer => PEER_FIELDS,
        }
    }
}

impl Sanitizer for DtoProjection {
    fn sanitize(&self, topic: Topic, document: &Value) -> Result<Value, SanitizeError> {
        let object = document.as_object().ok_or(SanitizeError::NotAnObject)?;
        let projected: Map<String, Value> = Self::fields(topic)
            .iter()
            .filter_map(|&field| object.get(field).map(|v| (field.to_string(), v.clone())))
            .collect();
        Ok(Value::Object(projected))
    }
}
