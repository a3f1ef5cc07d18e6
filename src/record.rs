use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{Config, Workshop};

/// Random per-run token that makes the submitted tutorial unguessable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingKey(String);

impl GradingKey {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GradingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TutorialPayload {
    pub title: String,
    pub tutorial_url: String,
    pub image_path: String,
    pub description: String,
    pub published: bool,
}

impl TutorialPayload {
    pub fn new(student: &str, key: &GradingKey) -> Self {
        Self {
            title: format!("Workshop autograded by {student}"),
            tutorial_url: format!("http://www.{key}.com"),
            image_path: format!("{key}.PNG"),
            description: format!("A tutorial about {key}"),
            published: true,
        }
    }
}

pub fn default_post_payload() -> Value {
    json!({ "POST": false })
}

pub fn default_get_payload() -> Value {
    json!({ "GET": false })
}

/// Fingerprint of which keys a payload carries, not of their values: two
/// responses with the same fields hash the same regardless of content or
/// field order. Non-objects have no keys.
pub fn key_set_hash(payload: &Value) -> String {
    let mut keys: Vec<&str> = match payload {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        _ => Vec::new(),
    };
    keys.sort_unstable();

    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Outcome of one grading run, written once to the results file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GradingRecord {
    student: String,
    key: String,
    host: String,
    workshop: Workshop,
    post_payload: Value,
    post_hash: String,
    get_payload: Value,
    get_hash: String,
    response_code: u16,
    error: Option<String>,
}

impl GradingRecord {
    pub fn new(
        config: &Config,
        key: &GradingKey,
        post_payload: Value,
        get_payload: Value,
        response_code: u16,
        error: Option<String>,
    ) -> Self {
        Self {
            student: config.name.clone(),
            key: key.to_string(),
            host: config.host_url(),
            workshop: config.workshop,
            post_hash: key_set_hash(&post_payload),
            post_payload,
            get_hash: key_set_hash(&get_payload),
            get_payload,
            response_code,
            error,
        }
    }

    #[cfg(test)]
    pub fn post_payload(&self) -> &Value {
        &self.post_payload
    }

    #[cfg(test)]
    pub fn get_payload(&self) -> &Value {
        &self.get_payload
    }

    pub fn response_code(&self) -> u16 {
        self.response_code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
