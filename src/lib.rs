//! # request-boost
//!
//! Fan a batch of independent network operations out over a bounded pool of
//! workers, retry failures up to a cap, and get the results back in the
//! order of the input list.
//!
//! Two strategies ship with the crate: plain HTTP requests through reqwest,
//! and raw connectivity probes through SOCKS proxies. Any other operation can
//! be plugged in by implementing [`Transport`].

pub mod batch;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod output;
pub mod progress;
pub mod proxy;
pub mod queue;
pub mod task;
pub mod transport;
mod utils;
mod worker;

pub use batch::{HeaderList, HttpBatch, ProbeBatch};
pub use config::{BoostConfig, BoostConfigBuilder, StatusPolicy};
pub use dispatcher::{boosted_requests, probe_proxies, Dispatcher};
pub use error::BoostError;
pub use output::{BatchOutput, BatchStats, Slot};
pub use progress::{LogProgress, ProgressSink};
pub use proxy::{ProxyKind, ProxyParams};
pub use task::{HttpTarget, ProxyTarget, RequestBody, Target, Task};
pub use transport::{HttpTransport, NetworkTransport, Outcome, Payload, ProxyProbe, Transport};
