//! Tell client - public API
//!
//! The [`Tell`] facade validates inputs, composes JSON payloads as raw
//! bytes, snapshots the session id and super-properties, and hands records
//! to the background worker. Every ingestion method returns immediately;
//! only [`Tell::flush`] and [`Tell::close`] wait, and never longer than the
//! configured close timeout.
//!
//! # Example
//!
//! ```no_run
//! use tell_sdk::{Config, Props, Tell};
//!
//! # fn main() -> Result<(), tell_sdk::TellError> {
//! let client = Tell::create(Config::production("a1b2c3d4e5f60718293a4b5c6d7e8f90")?)?;
//! client.track("user_123", "Page Viewed", &Props::new().add("url", "/home"));
//! client.close();
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use uuid::Uuid;

use tell_encoding::{EventType, LogLevel};

use crate::config::Config;
use crate::error::{ErrorCallback, Result, TellError};
use crate::props::{write_escaped, Props};
use crate::validation::{check_event_name, check_log_message, check_service_name, check_user_id};
use crate::worker::{QueuedEvent, QueuedLog, Worker, DEFAULT_SERVICE};

/// The Tell analytics and logging client.
///
/// Created via [`Tell::create`]; ready to use immediately. All methods take
/// `&self` and the client is `Send + Sync`, so one instance can serve every
/// thread in the process.
pub struct Tell {
    device_id: [u8; 16],
    session_id: RwLock<[u8; 16]>,
    super_props: RwLock<BTreeMap<String, Vec<u8>>>,
    on_error: Option<ErrorCallback>,
    close_timeout: Duration,
    worker: Worker,
}

impl std::fmt::Debug for Tell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tell").finish_non_exhaustive()
    }
}

impl Tell {
    /// Create a new client and spawn the background worker.
    ///
    /// # Errors
    ///
    /// Returns a Configuration error if the endpoint cannot be parsed, or
    /// an Io error if the worker thread cannot be spawned.
    pub fn create(config: Config) -> Result<Self> {
        let on_error = config.on_error().cloned();
        let close_timeout = config.close_timeout();
        let worker = Worker::spawn(config)?;

        Ok(Self {
            device_id: generate_uuid(),
            session_id: RwLock::new(generate_uuid()),
            super_props: RwLock::new(BTreeMap::new()),
            on_error,
            close_timeout,
            worker,
        })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Track a user action. Never blocks, never panics; invalid input is
    /// reported through the error callback and dropped.
    pub fn track(&self, user_id: &str, event_name: &str, properties: &Props) {
        if !check_user_id(user_id) {
            self.report_error(TellError::validation("userId", "is required"));
            return;
        }
        if !check_event_name(event_name) {
            let reason = if event_name.is_empty() {
                "is required"
            } else {
                "must be at most 256 characters"
            };
            self.report_error(TellError::validation("eventName", reason));
            return;
        }

        let super_raw = self.read_super_props();
        let payload = merge_json_payload(b"\"user_id\":", user_id, properties, &super_raw);

        self.enqueue_event(EventType::Track, Some(event_name.to_string()), payload);
    }

    /// Identify a user with optional traits. Super-properties are not
    /// merged into identify payloads.
    pub fn identify(&self, user_id: &str, traits: &Props) {
        if !check_user_id(user_id) {
            self.report_error(TellError::validation("userId", "is required"));
            return;
        }

        let mut buf = Vec::with_capacity(64 + user_id.len());
        buf.extend_from_slice(b"{\"user_id\":\"");
        write_escaped(&mut buf, user_id);
        buf.push(b'"');

        if !traits.is_empty() {
            buf.extend_from_slice(b",\"traits\":");
            buf.extend_from_slice(&traits.to_json_bytes());
        }
        buf.push(b'}');

        self.enqueue_event(EventType::Identify, None, buf);
    }

    /// Associate a user with a group.
    pub fn group(&self, user_id: &str, group_id: &str, properties: &Props) {
        if !check_user_id(user_id) {
            self.report_error(TellError::validation("userId", "is required"));
            return;
        }
        if group_id.is_empty() {
            self.report_error(TellError::validation("groupId", "is required"));
            return;
        }

        let super_raw = self.read_super_props();

        let mut buf = Vec::with_capacity(80 + user_id.len() + group_id.len() + super_raw.len());
        buf.extend_from_slice(b"{\"group_id\":\"");
        write_escaped(&mut buf, group_id);
        buf.push(b'"');

        buf.extend_from_slice(b",\"user_id\":\"");
        write_escaped(&mut buf, user_id);
        buf.push(b'"');

        append_optional_props(&mut buf, properties, &super_raw);

        self.enqueue_event(EventType::Group, None, buf);
    }

    /// Track a revenue event. The event name is fixed to "Order Completed".
    pub fn revenue(
        &self,
        user_id: &str,
        amount: f64,
        currency: &str,
        order_id: &str,
        properties: &Props,
    ) {
        if !check_user_id(user_id) {
            self.report_error(TellError::validation("userId", "is required"));
            return;
        }
        if amount <= 0.0 {
            self.report_error(TellError::validation("amount", "must be positive"));
            return;
        }
        if currency.is_empty() {
            self.report_error(TellError::validation("currency", "is required"));
            return;
        }
        if order_id.is_empty() {
            self.report_error(TellError::validation("orderId", "is required"));
            return;
        }

        let super_raw = self.read_super_props();

        let mut buf =
            Vec::with_capacity(120 + user_id.len() + currency.len() + order_id.len() + super_raw.len());
        buf.extend_from_slice(b"{\"user_id\":\"");
        write_escaped(&mut buf, user_id);
        buf.push(b'"');

        buf.extend_from_slice(b",\"amount\":");
        {
            use std::io::Write as _;
            let _ = write!(buf, "{amount}");
        }

        buf.extend_from_slice(b",\"currency\":\"");
        write_escaped(&mut buf, currency);
        buf.push(b'"');

        buf.extend_from_slice(b",\"order_id\":\"");
        write_escaped(&mut buf, order_id);
        buf.push(b'"');

        append_optional_props(&mut buf, properties, &super_raw);

        self.enqueue_event(EventType::Track, Some("Order Completed".to_string()), buf);
    }

    /// Link two user identities.
    pub fn alias(&self, previous_id: &str, user_id: &str) {
        if previous_id.is_empty() {
            self.report_error(TellError::validation("previousId", "is required"));
            return;
        }
        if !check_user_id(user_id) {
            self.report_error(TellError::validation("userId", "is required"));
            return;
        }

        let mut buf = Vec::with_capacity(40 + previous_id.len() + user_id.len());
        buf.extend_from_slice(b"{\"previous_id\":\"");
        write_escaped(&mut buf, previous_id);
        buf.extend_from_slice(b"\",\"user_id\":\"");
        write_escaped(&mut buf, user_id);
        buf.extend_from_slice(b"\"}");

        self.enqueue_event(EventType::Alias, None, buf);
    }

    // =========================================================================
    // Logging
    // =========================================================================

    /// Send a structured log entry. An empty `service` resolves to `"app"`.
    pub fn log(&self, level: LogLevel, message: &str, service: &str, data: &Props) {
        if !check_log_message(message) {
            let reason = if message.is_empty() {
                "is required"
            } else {
                "must be at most 65536 characters"
            };
            self.report_error(TellError::validation("message", reason));
            return;
        }
        if !check_service_name(service) {
            self.report_error(TellError::validation(
                "service",
                "must be at most 256 characters",
            ));
            return;
        }

        let payload = merge_json_payload(b"\"message\":", message, data, &[]);

        let service = if service.is_empty() {
            DEFAULT_SERVICE
        } else {
            service
        };

        self.worker.send_log(QueuedLog {
            level,
            timestamp: now_ms(),
            session_id: self.read_session_id(),
            source: None,
            service: service.to_string(),
            payload,
        });
    }

    /// Log at Emergency severity.
    pub fn log_emergency(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Emergency, message, service, data);
    }

    /// Log at Alert severity.
    pub fn log_alert(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Alert, message, service, data);
    }

    /// Log at Critical severity.
    pub fn log_critical(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Critical, message, service, data);
    }

    /// Log at Error severity.
    pub fn log_error(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Error, message, service, data);
    }

    /// Log at Warning severity.
    pub fn log_warning(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Warning, message, service, data);
    }

    /// Log at Notice severity.
    pub fn log_notice(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Notice, message, service, data);
    }

    /// Log at Info severity.
    pub fn log_info(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Info, message, service, data);
    }

    /// Log at Debug severity.
    pub fn log_debug(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Debug, message, service, data);
    }

    /// Log at Trace severity.
    pub fn log_trace(&self, message: &str, service: &str, data: &Props) {
        self.log(LogLevel::Trace, message, service, data);
    }

    // =========================================================================
    // Super properties
    // =========================================================================

    /// Register properties merged into every track/group/revenue payload.
    /// Re-registering a key overwrites its value.
    pub fn register_props(&self, properties: &Props) {
        if properties.is_empty() {
            return;
        }
        let mut map = self.super_props.write();
        parse_props_into_map(properties.raw(), &mut map);
    }

    /// Remove a super property by key. Removing an absent key is a no-op.
    pub fn unregister(&self, key: &str) {
        self.super_props.write().remove(key);
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Rotate the session id. Records already enqueued keep the old id.
    pub fn reset_session(&self) {
        *self.session_id.write() = generate_uuid();
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Force-send all queued batches. Blocks until the worker has handed
    /// every previously enqueued record to the transport, or until the
    /// close timeout expires (expiry returns silently).
    pub fn flush(&self) {
        let done = self.worker.send_flush();
        let _ = done.recv_timeout(self.close_timeout);
    }

    /// Flush, close the connection and stop the worker. Blocks up to the
    /// close timeout. Later API calls are accepted but never delivered.
    pub fn close(&self) {
        let done = self.worker.send_close();
        let _ = done.recv_timeout(self.close_timeout);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn enqueue_event(&self, event_type: EventType, event_name: Option<String>, payload: Vec<u8>) {
        self.worker.send_event(QueuedEvent {
            event_type,
            timestamp: now_ms(),
            device_id: self.device_id,
            session_id: self.read_session_id(),
            event_name,
            payload,
        });
    }

    fn report_error(&self, err: TellError) {
        if let Some(callback) = &self.on_error {
            callback(&err);
        }
    }

    fn read_session_id(&self) -> [u8; 16] {
        *self.session_id.read()
    }

    /// Serialize the super-props map to its raw comma-separated form.
    fn read_super_props(&self) -> Vec<u8> {
        let map = self.super_props.read();
        if map.is_empty() {
            return Vec::new();
        }

        let mut result = Vec::new();
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                result.push(b',');
            }
            result.push(b'"');
            write_escaped(&mut result, key);
            result.push(b'"');
            result.push(b':');
            result.extend_from_slice(value);
        }
        result
    }
}

/// Build `{<key_colon>"<value>"[,<super-props>][,<props inner>]}`.
/// Super-props come before event props so event keys win under
/// last-key-wins at the collector.
fn merge_json_payload(key_colon: &[u8], value: &str, props: &Props, super_raw: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + key_colon.len() + value.len() + 2 + super_raw.len());

    buf.push(b'{');
    buf.extend_from_slice(key_colon);

    buf.push(b'"');
    write_escaped(&mut buf, value);
    buf.push(b'"');

    append_optional_props(&mut buf, props, super_raw);

    buf
}

/// Append `[,<super-props>]` then either `,<props inner>}` or `}` to an
/// open JSON object.
fn append_optional_props(buf: &mut Vec<u8>, props: &Props, super_raw: &[u8]) {
    if !super_raw.is_empty() {
        buf.push(b',');
        buf.extend_from_slice(super_raw);
    }

    if !props.is_empty() {
        // props JSON is `{...}`; skipping the opening brace splices the
        // entries and its closing brace ends the outer object
        let props_json = props.to_json_bytes();
        buf.push(b',');
        buf.extend_from_slice(&props_json[1..]);
    } else {
        buf.push(b'}');
    }
}

/// Parse a Props raw form (`"key":value,...`) into the map, upserting each
/// entry. Keys are unescaped; values are kept as raw JSON bytes.
fn parse_props_into_map(raw: &[u8], map: &mut BTreeMap<String, Vec<u8>>) {
    let n = raw.len();
    let mut i = 0;
    while i < n {
        if raw[i] != b'"' {
            break;
        }
        i += 1; // skip opening quote

        // Read key, unescaping
        let mut key = Vec::new();
        while i < n && raw[i] != b'"' {
            if raw[i] == b'\\' && i + 1 < n {
                match raw[i + 1] {
                    b'"' => key.push(b'"'),
                    b'\\' => key.push(b'\\'),
                    b'/' => key.push(b'/'),
                    b'b' => key.push(0x08),
                    b'f' => key.push(0x0C),
                    b'n' => key.push(b'\n'),
                    b'r' => key.push(b'\r'),
                    b't' => key.push(b'\t'),
                    other => {
                        key.push(b'\\');
                        key.push(other);
                    }
                }
                i += 2;
            } else {
                key.push(raw[i]);
                i += 1;
            }
        }
        if i < n {
            i += 1; // skip closing quote
        }
        if i < n && raw[i] == b':' {
            i += 1;
        }

        // Read value as raw JSON bytes
        let value_start = i;
        if i < n && raw[i] == b'"' {
            i += 1;
            while i < n {
                if raw[i] == b'\\' && i + 1 < n {
                    i += 2;
                } else if raw[i] == b'"' {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
        } else {
            while i < n && raw[i] != b',' {
                i += 1;
            }
        }

        let key = String::from_utf8_lossy(&key).into_owned();
        map.insert(key, raw[value_start..i].to_vec());

        if i < n && raw[i] == b',' {
            i += 1;
        }
    }
}

/// Generate a v4 UUID as 16 raw bytes.
fn generate_uuid() -> [u8; 16] {
    *Uuid::new_v4().as_bytes()
}

/// Milliseconds since the Unix epoch. Monotonicity is not required.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
