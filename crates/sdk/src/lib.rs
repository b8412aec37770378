//! Tell SDK - embedded analytics and logging client
//!
//! This crate embeds in an application process, accepts product analytics
//! events (track, identify, group, revenue, alias) and severity-tagged
//! structured logs on the caller's thread, and delivers them asynchronously
//! in framed binary batches over a persistent TCP connection to a Tell
//! collector.
//!
//! # Design
//!
//! - **Sub-microsecond callers**: every ingestion method serializes its
//!   payload, builds a queued record and hands it off. No I/O, no blocking
//!   on other callers, only short bounded critical sections.
//! - **Single background worker**: one dedicated thread drains a bounded
//!   queue (drop-oldest on overflow), batches by size and time, encodes
//!   with [`tell_encoding`] and sends length-prefixed frames.
//! - **Bounded retries**: a failed first send hands the frame to a pool of
//!   at most 8 retry threads with exponential backoff and jitter.
//! - **Asynchronous errors**: after construction nothing fails
//!   synchronously; faults reach the caller only through the configured
//!   error callback.
//!
//! # Quick Start
//!
//! ```no_run
//! use tell_sdk::{Config, Props, Tell};
//!
//! # fn main() -> Result<(), tell_sdk::TellError> {
//! let config = Config::builder("a1b2c3d4e5f60718293a4b5c6d7e8f90")
//!     .service("checkout")
//!     .build()?;
//! let client = Tell::create(config)?;
//!
//! client.track(
//!     "user_123",
//!     "Page Viewed",
//!     &Props::new().add("url", "/home").add("status", 200),
//! );
//! client.log_info("cache warmed", "", &Props::new());
//!
//! client.close();
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod props;
mod transport;
mod validation;
mod worker;

pub use client::Tell;
pub use config::{Config, ConfigBuilder, DEFAULT_ENDPOINT};
pub use error::{ErrorCallback, ErrorKind, Result, TellError};
pub use props::{PropValue, Props};
pub use validation::{
    check_event_name, check_log_message, check_service_name, check_user_id, decode_api_key,
};

// Re-export the wire-level enums callers see in the public API
pub use tell_encoding::{EventType, LogLevel};

#[cfg(test)]
mod transport_test;
