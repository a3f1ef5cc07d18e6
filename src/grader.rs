use http::StatusCode;
use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::record::{
    default_get_payload, default_post_payload, GradingKey, GradingRecord, TutorialPayload,
};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum GradeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Invalid HTTP status code returned: {}", .0.as_u16())]
    Status(StatusCode),
    #[error("{call} response is not valid JSON: {source}")]
    Decode {
        call: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("create response has no usable \"id\" field")]
    MissingId,
}

struct Exchange {
    status: u16,
    post: Value,
    get: Value,
}

impl Default for Exchange {
    fn default() -> Self {
        Self {
            status: 0,
            post: default_post_payload(),
            get: default_get_payload(),
        }
    }
}

impl Exchange {
    async fn run<T: Transport>(
        &mut self,
        transport: &mut T,
        payload: &TutorialPayload,
    ) -> Result<(), GradeError> {
        let res = transport.create(payload).await?;
        self.status = res.status.as_u16();

        if !matches!(res.status, StatusCode::OK | StatusCode::CREATED) {
            return Err(GradeError::Status(res.status));
        }

        let post: Value =
            serde_json::from_slice(&res.body).map_err(|source| GradeError::Decode {
                call: "create",
                source,
            })?;
        self.post = post;
        let id = tutorial_id(&self.post).ok_or(GradeError::MissingId)?;

        let body = transport.fetch(&id).await?;
        self.get = serde_json::from_str(&body).map_err(|source| GradeError::Decode {
            call: "fetch",
            source,
        })?;

        Ok(())
    }
}

/// Runs one create, and on success one fetch, and records the outcome.
/// Any failure along the way ends the exchange and becomes the record's
/// error; payloads not obtained keep their placeholders.
pub async fn grade<T: Transport>(
    transport: &mut T,
    config: &Config,
    key: &GradingKey,
) -> GradingRecord {
    let payload = TutorialPayload::new(&config.name, key);

    let mut exchange = Exchange::default();
    let error = match exchange.run(transport, &payload).await {
        Ok(()) => {
            info!("graded {} with status {}", config.host_url(), exchange.status);
            None
        }
        Err(err) => {
            warn!("grading {} failed: {err}", config.host_url());
            Some(err.to_string())
        }
    };

    GradingRecord::new(config, key, exchange.post, exchange.get, exchange.status, error)
}

fn tutorial_id(post: &Value) -> Option<String> {
    match post.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
