//! SDK configuration
//!
//! [`Config`] is immutable after build and cheap to clone (the error
//! callback is reference counted). [`ConfigBuilder`] validates the API key
//! at `build()`; every other field is accepted as given.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorCallback, Result, TellError};
use crate::validation::decode_api_key;

/// Default collector endpoint
pub const DEFAULT_ENDPOINT: &str = "collect.tell.rs:50000";

/// Configuration for the Tell SDK.
#[derive(Clone)]
pub struct Config {
    api_key_bytes: [u8; 16],
    service: String,
    endpoint: String,
    batch_size: usize,
    flush_interval: Duration,
    max_retries: u32,
    close_timeout: Duration,
    network_timeout: Duration,
    on_error: Option<ErrorCallback>,
}

impl Config {
    /// Start building a config from a 32-character hex API key.
    pub fn builder(api_key: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(api_key)
    }

    /// Production preset: `collect.tell.rs:50000`, batches of 100, 10 s
    /// flush interval, 3 retries.
    pub fn production(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    /// Development preset: `localhost:50000`, batches of 10, 2 s flush
    /// interval.
    pub fn development(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key)
            .endpoint("localhost:50000")
            .batch_size(10)
            .flush_interval(Duration::from_millis(2000))
            .build()
    }

    /// The decoded 16-byte API key.
    pub fn api_key_bytes(&self) -> &[u8; 16] {
        &self.api_key_bytes
    }

    /// Service name stamped on events; empty resolves to `"app"` at
    /// encode time.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Collector endpoint as `host:port`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Records per batch before an immediate flush.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Time between scheduled flushes.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Retry attempts after a failed first send; 0 disables the retry pool.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// How long `flush` and `close` wait for the worker.
    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    /// Connect and send timeout for the transport.
    pub fn network_timeout(&self) -> Duration {
        self.network_timeout
    }

    /// The configured error callback, if any.
    pub fn on_error(&self) -> Option<&ErrorCallback> {
        self.on_error.as_ref()
    }

    pub(crate) fn report_error(&self, err: &TellError) {
        if let Some(callback) = &self.on_error {
            callback(err);
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service", &self.service)
            .field("endpoint", &self.endpoint)
            .field("batch_size", &self.batch_size)
            .field("flush_interval", &self.flush_interval)
            .field("max_retries", &self.max_retries)
            .field("close_timeout", &self.close_timeout)
            .field("network_timeout", &self.network_timeout)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`Config`].
pub struct ConfigBuilder {
    api_key: String,
    service: String,
    endpoint: String,
    batch_size: usize,
    flush_interval: Duration,
    max_retries: u32,
    close_timeout: Duration,
    network_timeout: Duration,
    on_error: Option<ErrorCallback>,
}

impl ConfigBuilder {
    fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            service: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: 100,
            flush_interval: Duration::from_millis(10_000),
            max_retries: 3,
            close_timeout: Duration::from_millis(5_000),
            network_timeout: Duration::from_millis(30_000),
            on_error: None,
        }
    }

    /// Service name stamped on every event.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Collector endpoint as `host:port`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Records per batch before an immediate flush.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Time between scheduled flushes.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Retry attempts after a failed first send.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// How long `flush` and `close` wait for the worker.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Connect and send timeout for the transport.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Callback invoked with asynchronous errors, possibly concurrently.
    pub fn on_error(mut self, callback: impl Fn(&TellError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Build the config.
    ///
    /// # Errors
    ///
    /// Returns a Configuration error if the API key is not exactly 32 hex
    /// characters.
    pub fn build(self) -> Result<Config> {
        let api_key_bytes = decode_api_key(&self.api_key)?;
        Ok(Config {
            api_key_bytes,
            service: self.service,
            endpoint: self.endpoint,
            batch_size: self.batch_size,
            flush_interval: self.flush_interval,
            max_retries: self.max_retries,
            close_timeout: self.close_timeout,
            network_timeout: self.network_timeout,
            on_error: self.on_error,
        })
    }
}
