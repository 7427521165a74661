//! HTTP strategy built on reqwest.

use super::{classify_status, Outcome, Payload};
use crate::config::{BoostConfig, StatusPolicy};
use crate::error::BoostError;
use crate::task::{HttpTarget, RequestBody};

use anyhow::anyhow;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::time::Duration;

/// Sends one GET or POST per attempt and keeps only 200 responses.
#[derive(Clone)]
pub struct HttpTransport {
    client: ClientWithMiddleware,
    parse_json: bool,
    status_policy: StatusPolicy,
}

impl HttpTransport {
    /// Create a transport with a plain reqwest client using the configured timeout.
    pub fn from_config(config: &BoostConfig) -> Result<Self, BoostError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(ClientBuilder::new(client).build(), config))
    }

    /// Create a transport on top of an existing client, e.g. one carrying
    /// a proxy pool or tracing middleware.
    pub fn with_client(client: ClientWithMiddleware, config: &BoostConfig) -> Self {
        Self {
            client,
            parse_json: config.parse_json,
            status_policy: config.status_policy,
        }
    }

    /// Perform a single request against `target`.
    pub async fn send(&self, target: &HttpTarget, timeout: Duration) -> Outcome {
        let mut request = match target.body {
            Some(_) => self.client.post(&target.url),
            None => self.client.get(&target.url),
        };
        request = request.headers(target.headers.clone()).timeout(timeout);

        match &target.body {
            Some(RequestBody::Json(value)) => {
                let bytes = match serde_json::to_vec(value) {
                    Ok(bytes) => bytes,
                    Err(e) => return Outcome::Terminal(anyhow!("cannot encode body for {}: {}", target.url, e)),
                };
                if !target.headers.contains_key(CONTENT_TYPE) {
                    request = request.header(CONTENT_TYPE, "application/json");
                }
                request = request.body(bytes);
            }
            Some(RequestBody::Raw(bytes)) => request = request.body(bytes.clone()),
            None => {}
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Request to {} failed: {}", target.url, e);
                return Outcome::Transient(anyhow!(e));
            }
        };

        let status = response.status().as_u16();
        if let Err(outcome) = classify_status(status, self.status_policy, &target.url) {
            return outcome;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Outcome::Transient(anyhow!("reading body of {}: {}", target.url, e)),
        };

        if self.parse_json {
            match serde_json::from_slice(&body) {
                Ok(value) => Outcome::Success(Payload::Json(value)),
                Err(e) => Outcome::Transient(anyhow!("{} returned invalid json: {}", target.url, e)),
            }
        } else {
            Outcome::Success(Payload::Raw(body.to_vec()))
        }
    }
}
