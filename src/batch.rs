//! Validated construction of target lists.
//!
//! Everything here runs before any network activity, so a malformed batch
//! fails fast with a descriptive error instead of producing empty slots.

use crate::error::BoostError;
use crate::proxy::ProxyParams;
use crate::task::{HttpTarget, ProxyTarget, RequestBody, Target};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// Header pairs for a single target.
pub type HeaderList = Vec<(String, String)>;

/// A list of HTTP requests with optional per-target headers and bodies.
#[derive(Debug, Clone, Default)]
pub struct HttpBatch {
    urls: Vec<String>,
    headers: Option<Vec<HeaderList>>,
    bodies: Option<Vec<Option<RequestBody>>>,
}

impl HttpBatch {
    /// One GET target per URL, without headers or bodies.
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            headers: None,
            bodies: None,
        }
    }

    /// Set headers for every target. Must have one entry per URL.
    pub fn headers(mut self, headers: Vec<HeaderList>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Set bodies for every target. Must have one entry per URL;
    /// `Some` makes that target a POST.
    pub fn bodies(mut self, bodies: Vec<Option<RequestBody>>) -> Self {
        self.bodies = Some(bodies);
        self
    }

    /// Number of URLs in the batch.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns `true` if the batch has no URLs.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Validate the batch and turn it into targets, preserving order.
    pub fn into_targets(self) -> Result<Vec<Target>, BoostError> {
        let expected = self.urls.len();
        if let Some(headers) = &self.headers {
            check_len("headers", expected, headers.len())?;
        }
        if let Some(bodies) = &self.bodies {
            check_len("bodies", expected, bodies.len())?;
        }

        let mut headers = self.headers.map(Vec::into_iter);
        let mut bodies = self.bodies.map(Vec::into_iter);

        self.urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                validate_url(index, &url)?;
                let header_list = headers.as_mut().and_then(Iterator::next).unwrap_or_default();
                let body = bodies.as_mut().and_then(Iterator::next).flatten();
                Ok(Target::Http(HttpTarget {
                    url,
                    headers: build_headers(index, header_list)?,
                    body,
                }))
            })
            .collect()
    }
}

/// A list of proxies to probe against a single domain.
#[derive(Debug, Clone)]
pub struct ProbeBatch {
    proxies: Vec<ProxyParams>,
    domain: String,
}

impl ProbeBatch {
    /// Probe every proxy against `domain`.
    pub fn new(proxies: Vec<ProxyParams>, domain: impl Into<String>) -> Self {
        Self {
            proxies,
            domain: domain.into(),
        }
    }

    /// Parse a newline separated proxy list (see [`ProxyParams::parse_list`]).
    pub fn from_proxy_list(content: &str, domain: impl Into<String>) -> Result<Self, BoostError> {
        Ok(Self::new(ProxyParams::parse_list(content)?, domain))
    }

    /// Number of proxies in the batch.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns `true` if the batch has no proxies.
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Validate the batch and turn it into targets, preserving order.
    pub fn into_targets(self) -> Result<Vec<Target>, BoostError> {
        let domain = self.domain.trim().to_string();
        if domain.is_empty() || domain.contains(char::is_whitespace) || domain.contains('/') {
            return Err(BoostError::InvalidDomain(self.domain));
        }

        Ok(self
            .proxies
            .into_iter()
            .map(|proxy| {
                Target::Proxy(ProxyTarget {
                    proxy,
                    domain: domain.clone(),
                })
            })
            .collect())
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), BoostError> {
    if expected != actual {
        return Err(BoostError::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

fn validate_url(index: usize, url: &str) -> Result<(), BoostError> {
    let invalid = |reason: String| BoostError::InvalidUrl {
        index,
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

fn build_headers(index: usize, list: HeaderList) -> Result<HeaderMap, BoostError> {
    let mut headers = HeaderMap::with_capacity(list.len());
    for (name, value) in list {
        let invalid = |reason: String| BoostError::InvalidHeader {
            index,
            name: name.clone(),
            reason,
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| invalid(e.to_string()))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
