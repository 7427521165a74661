//! Targets and the tasks that carry them through the queue.

use crate::proxy::ProxyParams;
use http::HeaderMap;

/// Body of an HTTP target. A target with a body is sent as POST.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `content-type: application/json`
    /// unless the target sets its own content type.
    Json(serde_json::Value),
    /// Sent verbatim.
    Raw(Vec<u8>),
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Raw(bytes)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Raw(text.into_bytes())
    }
}

/// A request handled by the HTTP strategy.
#[derive(Debug, Clone)]
pub struct HttpTarget {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl HttpTarget {
    /// A plain GET request without extra headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A connectivity probe of `domain` through `proxy`.
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    pub proxy: ProxyParams,
    pub domain: String,
}

/// What a single task talks to.
#[derive(Debug, Clone)]
pub enum Target {
    Http(HttpTarget),
    Proxy(ProxyTarget),
}

impl Target {
    /// Returns `true` if both targets are served by the same strategy.
    pub fn same_shape(&self, other: &Target) -> bool {
        matches!(
            (self, other),
            (Target::Http(_), Target::Http(_)) | (Target::Proxy(_), Target::Proxy(_))
        )
    }

    /// Short description used in log lines.
    pub fn describe(&self) -> String {
        match self {
            Target::Http(http) => http.url.clone(),
            Target::Proxy(probe) => format!("{} via {}", probe.domain, probe.proxy),
        }
    }
}

impl From<HttpTarget> for Target {
    fn from(target: HttpTarget) -> Self {
        Target::Http(target)
    }
}

impl From<ProxyTarget> for Target {
    fn from(target: ProxyTarget) -> Self {
        Target::Proxy(target)
    }
}

/// One unit of work: the target plus its position in the batch.
#[derive(Debug)]
pub struct Task {
    /// Position of the target in the input list. Never changes.
    pub index: usize,
    pub target: Target,
    /// Number of failed attempts so far.
    pub retry_count: u32,
}

impl Task {
    /// A fresh task with no failed attempts.
    pub fn new(index: usize, target: Target) -> Self {
        Self {
            index,
            target,
            retry_count: 0,
        }
    }
}
