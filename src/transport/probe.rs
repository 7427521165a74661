//! Raw connectivity probe through a SOCKS proxy.

use super::{classify_status, Outcome, Payload};
use crate::config::StatusPolicy;
use crate::proxy::ProxyKind;
use crate::task::ProxyTarget;

use anyhow::anyhow;
use log::debug;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};

/// Port probed on the target domain.
const HTTP_PORT: u16 = 80;
/// Upper bound on bytes read from the probed server.
pub const READ_LIMIT: usize = 64;

/// Opens a tunnel through the proxy, sends a bare request line and checks
/// the status token of the reply.
#[derive(Debug, Clone)]
pub struct ProxyProbe {
    status_policy: StatusPolicy,
}

impl ProxyProbe {
    pub fn new(status_policy: StatusPolicy) -> Self {
        Self { status_policy }
    }

    /// Probe `target.domain` through `target.proxy`.
    pub async fn probe(&self, target: &ProxyTarget, timeout: Duration) -> Outcome {
        match tokio::time::timeout(timeout, exchange(target)).await {
            Ok(Ok(prefix)) => classify_prefix(prefix, self.status_policy, &target.proxy.to_string()),
            Ok(Err(e)) => {
                debug!("Probe through {} failed: {}", target.proxy, e);
                Outcome::Transient(e)
            }
            Err(_) => Outcome::Transient(anyhow!(
                "probe through {} timed out after {:?}",
                target.proxy,
                timeout
            )),
        }
    }
}

/// Connect, send the request line and read the response prefix.
/// The stream is dropped, and with it the connection closed, on every return.
async fn exchange(target: &ProxyTarget) -> anyhow::Result<Vec<u8>> {
    let mut stream = connect(target).await?;

    let request = format!("GET / HTTP/1.1\r\nHost:{}\r\n\r\n", target.domain);
    stream.write_all(request.as_bytes()).await?;

    let mut prefix = Vec::with_capacity(READ_LIMIT);
    let mut chunk = [0u8; READ_LIMIT];
    while prefix.len() < READ_LIMIT && status_token(&prefix, true).is_none() {
        let n = stream.read(&mut chunk[..READ_LIMIT - prefix.len()]).await?;
        if n == 0 {
            break;
        }
        prefix.extend_from_slice(&chunk[..n]);
    }
    Ok(prefix)
}

async fn connect(target: &ProxyTarget) -> anyhow::Result<TcpStream> {
    let proxy = target.proxy.addr.as_str();
    let dest = (target.domain.as_str(), HTTP_PORT);

    let stream = match (target.proxy.kind, &target.proxy.credentials) {
        (ProxyKind::Socks5, None) => Socks5Stream::connect(proxy, dest).await?.into_inner(),
        (ProxyKind::Socks5, Some((user, pass))) => {
            Socks5Stream::connect_with_password(proxy, dest, user, pass)
                .await?
                .into_inner()
        }
        (ProxyKind::Socks4, None) => Socks4Stream::connect(proxy, dest).await?.into_inner(),
        (ProxyKind::Socks4, Some((user, _))) => {
            Socks4Stream::connect_with_userid(proxy, dest, user)
                .await?
                .into_inner()
        }
    };
    Ok(stream)
}

/// Second token of the first line.
///
/// With `complete` set, a token is only returned once something follows it,
/// so a partially read status such as `HTTP/1.1 20` is not mistaken for a
/// full one.
fn status_token(prefix: &[u8], complete: bool) -> Option<&[u8]> {
    let line_end = prefix.iter().position(|&b| b == b'\r' || b == b'\n');
    let line = &prefix[..line_end.unwrap_or(prefix.len())];
    let mut tokens = line.split(|&b| b == b' ').filter(|t| !t.is_empty());
    tokens.next()?;
    let status = tokens.next()?;
    if complete && line_end.is_none() && tokens.next().is_none() {
        return None;
    }
    Some(status)
}

fn classify_prefix(prefix: Vec<u8>, policy: StatusPolicy, via: &str) -> Outcome {
    let status = status_token(&prefix, false)
        .and_then(|token| std::str::from_utf8(token).ok())
        .and_then(|token| token.parse::<u16>().ok());

    let Some(status) = status else {
        return Outcome::Transient(anyhow!(
            "malformed response through {} ({} bytes)",
            via,
            prefix.len()
        ));
    };
    if let Err(outcome) = classify_status(status, policy, via) {
        return outcome;
    }
    Outcome::Success(Payload::Raw(prefix))
}
