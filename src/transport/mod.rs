//! The "perform one unit of work" seam.
//!
//! A [`Transport`] makes exactly one attempt at a target and classifies the
//! result. Retrying, ordering and bookkeeping all live in the worker.

pub mod http;
pub mod probe;

use crate::config::BoostConfig;
use crate::error::BoostError;
use crate::task::Target;
use anyhow::anyhow;
use async_trait::async_trait;
use std::time::Duration;

pub use self::http::HttpTransport;
pub use self::probe::ProxyProbe;

/// Body of a successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Decoded JSON body.
    Json(serde_json::Value),
    /// Raw response bytes.
    Raw(Vec<u8>),
}

impl Payload {
    /// The decoded body, if the payload is JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    /// The raw body, if the payload was not decoded.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Json(_) => None,
            Payload::Raw(bytes) => Some(bytes),
        }
    }
}

/// Classification of a single attempt.
#[derive(Debug)]
pub enum Outcome {
    Success(Payload),
    /// Worth retrying: transport errors, timeouts, retryable statuses,
    /// malformed responses.
    Transient(anyhow::Error),
    /// Retrying cannot help; the task is resolved as rejected.
    Terminal(anyhow::Error),
}

/// A strategy that performs one network attempt.
///
/// Implementations must not panic on network failure and should honour
/// `timeout`; the worker enforces it as well.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn attempt(&self, target: &Target, timeout: Duration) -> Outcome;
}

/// Default strategy: dispatches on the target variant.
pub struct NetworkTransport {
    http: HttpTransport,
    probe: ProxyProbe,
}

impl NetworkTransport {
    /// Combine two already configured strategies.
    pub fn new(http: HttpTransport, probe: ProxyProbe) -> Self {
        Self { http, probe }
    }

    /// Build both strategies from the batch configuration.
    pub fn from_config(config: &BoostConfig) -> Result<Self, BoostError> {
        Ok(Self {
            http: HttpTransport::from_config(config)?,
            probe: ProxyProbe::new(config.status_policy),
        })
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn attempt(&self, target: &Target, timeout: Duration) -> Outcome {
        match target {
            Target::Http(http) => self.http.send(http, timeout).await,
            Target::Proxy(probe) => self.probe.probe(probe, timeout).await,
        }
    }
}

/// Classify a status code shared by both strategies.
pub(crate) fn classify_status(
    status: u16,
    policy: crate::config::StatusPolicy,
    what: &str,
) -> Result<(), Outcome> {
    if status == 200 {
        return Ok(());
    }
    let cause = anyhow!("{} returned status {}", what, status);
    if policy.is_retryable(status) {
        Err(Outcome::Transient(cause))
    } else {
        Err(Outcome::Terminal(cause))
    }
}
