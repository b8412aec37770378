//! Background delivery worker
//!
//! One dedicated OS thread owns the queue, the batching buffers and the
//! transport. Producers hand it records through a mutex-guarded FIFO with
//! drop-oldest overflow, so enqueueing never blocks on I/O and never waits
//! for the consumer.
//!
//! Failed first sends go to a bounded pool of retry threads, each with its
//! own connection. Retry threads are tracked and joined at shutdown, and
//! finished handles are reaped before every spawn.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use tracing::{debug, trace};

use tell_encoding::{
    encode_batch_into, encode_event_data_into, encode_log_data_into, BatchParams, EventParams,
    EventType, LogEntryParams, LogLevel, SchemaType, DEFAULT_VERSION,
};

use crate::config::Config;
use crate::error::{Result, TellError};
use crate::transport::{Endpoint, TcpTransport};

/// Maximum queued messages before the oldest is discarded
const MAX_QUEUE_SIZE: usize = 10_000;

/// Maximum concurrent retry threads
const MAX_RETRY_THREADS: usize = 8;

/// Cap on a single retry backoff delay
const MAX_RETRY_DELAY_MS: f64 = 30_000.0;

/// Service name used when the config leaves it empty
pub(crate) const DEFAULT_SERVICE: &str = "app";

/// Queued event ready to be encoded.
#[derive(Debug)]
pub(crate) struct QueuedEvent {
    pub event_type: EventType,
    pub timestamp: u64,
    pub device_id: [u8; 16],
    pub session_id: [u8; 16],
    pub event_name: Option<String>,
    pub payload: Vec<u8>,
    // service is config-level; the worker stamps it when building params
}

/// Queued log entry ready to be encoded.
#[derive(Debug)]
pub(crate) struct QueuedLog {
    pub level: LogLevel,
    pub timestamp: u64,
    pub session_id: [u8; 16],
    pub source: Option<String>,
    pub service: String,
    pub payload: Vec<u8>,
}

/// Message in the worker mailbox. Flush and close carry a completion
/// channel signalled after the flush they were batched with.
pub(crate) enum WorkerMessage {
    Event(QueuedEvent),
    Log(QueuedLog),
    Flush(Sender<()>),
    Close(Sender<()>),
}

struct Mailbox {
    queue: Mutex<VecDeque<WorkerMessage>>,
    available: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Push a message, discarding the oldest one when the queue is at
    /// capacity. Wakes the worker only on the empty to non-empty edge.
    fn push(&self, msg: WorkerMessage) {
        let was_empty;
        {
            let mut queue = self.queue.lock();
            was_empty = queue.is_empty();
            if queue.len() >= MAX_QUEUE_SIZE {
                // Back-pressure by loss: discard the oldest message
                queue.pop_front();
            }
            queue.push_back(msg);
        }
        if was_empty {
            self.available.notify_one();
        }
    }
}

/// Handle to the background worker thread.
pub(crate) struct Worker {
    mailbox: Arc<Mailbox>,
    thread: Option<JoinHandle<()>>,
    retry_threads: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Worker {
    /// Parse the endpoint, build the transport and start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns a Configuration error if the endpoint is malformed.
    pub fn spawn(config: Config) -> Result<Self> {
        let endpoint = Endpoint::parse(config.endpoint())?;
        let transport = TcpTransport::new(endpoint.clone(), config.network_timeout());

        let mailbox = Arc::new(Mailbox::new());
        let retry_threads = Arc::new(Mutex::new(Vec::new()));

        let state = WorkerState {
            event_buffer: Vec::with_capacity(config.batch_size()),
            log_buffer: Vec::with_capacity(config.batch_size()),
            data_buf: Vec::with_capacity(64 * 1024),
            batch_buf: Vec::with_capacity(64 * 1024),
            batch_counter: AtomicU64::new(1),
            config,
            endpoint,
            transport,
            mailbox: Arc::clone(&mailbox),
            retry_threads: Arc::clone(&retry_threads),
        };

        let thread = thread::Builder::new()
            .name("tell-worker".to_string())
            .spawn(move || state.run())
            .map_err(|err| TellError::io(format!("failed to spawn worker thread: {err}")))?;

        Ok(Self {
            mailbox,
            thread: Some(thread),
            retry_threads,
        })
    }

    /// Queue an event (non-blocking).
    pub fn send_event(&self, event: QueuedEvent) {
        self.enqueue(WorkerMessage::Event(event));
    }

    /// Queue a log entry (non-blocking).
    pub fn send_log(&self, log: QueuedLog) {
        self.enqueue(WorkerMessage::Log(log));
    }

    /// Request a flush. The returned channel resolves once every record
    /// enqueued before this call has been handed to the transport.
    pub fn send_flush(&self) -> Receiver<()> {
        let (done, wait) = bounded(1);
        self.enqueue(WorkerMessage::Flush(done));
        wait
    }

    /// Request flush-and-shutdown. The returned channel resolves once the
    /// final flush completes and the connection is closed.
    pub fn send_close(&self) -> Receiver<()> {
        let (done, wait) = bounded(1);
        self.enqueue(WorkerMessage::Close(done));
        wait
    }

    fn enqueue(&self, msg: WorkerMessage) {
        self.mailbox.push(msg);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.send_close();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        let handles = std::mem::take(&mut *self.retry_threads.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

/// Everything owned by the worker thread.
struct WorkerState {
    config: Config,
    endpoint: Endpoint,
    transport: TcpTransport,
    mailbox: Arc<Mailbox>,
    retry_threads: Arc<Mutex<Vec<JoinHandle<()>>>>,

    event_buffer: Vec<QueuedEvent>,
    log_buffer: Vec<QueuedLog>,

    // Reusable encoding buffers
    data_buf: Vec<u8>,
    batch_buf: Vec<u8>,

    batch_counter: AtomicU64,
}

impl WorkerState {
    fn run(mut self) {
        let flush_interval = self.config.flush_interval();
        let batch_size = self.config.batch_size();
        let mut next_flush = Instant::now() + flush_interval;

        loop {
            let mut local = {
                let mut queue = self.mailbox.queue.lock();
                while queue.is_empty() {
                    if self.mailbox.available.wait_until(&mut queue, next_flush).timed_out() {
                        break;
                    }
                }
                std::mem::take(&mut *queue)
            };

            let mut should_flush = false;
            let mut should_close = false;
            let mut completions: Vec<Sender<()>> = Vec::new();

            for msg in local.drain(..) {
                match msg {
                    WorkerMessage::Event(event) => {
                        self.event_buffer.push(event);
                        if self.event_buffer.len() >= batch_size {
                            self.flush_events();
                        }
                    }
                    WorkerMessage::Log(log) => {
                        self.log_buffer.push(log);
                        if self.log_buffer.len() >= batch_size {
                            self.flush_logs();
                        }
                    }
                    WorkerMessage::Flush(done) => {
                        should_flush = true;
                        completions.push(done);
                    }
                    WorkerMessage::Close(done) => {
                        should_close = true;
                        completions.push(done);
                    }
                }
            }

            // Timer-based flush
            let now = Instant::now();
            if now >= next_flush {
                should_flush = true;
                next_flush = now + flush_interval;
            }

            if should_flush || should_close {
                self.flush_events();
                self.flush_logs();

                for done in completions {
                    let _ = done.send(());
                }
            }

            if should_close {
                trace!("worker closing");
                self.transport.close_connection();
                return;
            }
        }
    }

    fn flush_events(&mut self) {
        if self.event_buffer.is_empty() {
            return;
        }

        let events = std::mem::take(&mut self.event_buffer);
        let mut data_buf = std::mem::take(&mut self.data_buf);
        data_buf.clear();

        let data_start = {
            let service = if self.config.service().is_empty() {
                DEFAULT_SERVICE
            } else {
                self.config.service()
            };

            let params: Vec<EventParams<'_>> = events
                .iter()
                .map(|event| EventParams {
                    event_type: event.event_type,
                    timestamp: event.timestamp,
                    service: Some(service),
                    device_id: Some(&event.device_id),
                    session_id: Some(&event.session_id),
                    event_name: event.event_name.as_deref(),
                    payload: &event.payload,
                })
                .collect();

            encode_event_data_into(&mut data_buf, &params)
        };

        self.send_batch(SchemaType::Event, &data_buf, data_start);
        self.data_buf = data_buf;
    }

    fn flush_logs(&mut self) {
        if self.log_buffer.is_empty() {
            return;
        }

        let logs = std::mem::take(&mut self.log_buffer);
        let mut data_buf = std::mem::take(&mut self.data_buf);
        data_buf.clear();

        let data_start = {
            let params: Vec<LogEntryParams<'_>> = logs
                .iter()
                .map(|log| LogEntryParams {
                    session_id: Some(&log.session_id),
                    level: log.level,
                    timestamp: log.timestamp,
                    source: log.source.as_deref(),
                    service: if log.service.is_empty() {
                        None
                    } else {
                        Some(log.service.as_str())
                    },
                    payload: &log.payload,
                    ..Default::default()
                })
                .collect();

            encode_log_data_into(&mut data_buf, &params)
        };

        self.send_batch(SchemaType::Log, &data_buf, data_start);
        self.data_buf = data_buf;
    }

    fn send_batch(&mut self, schema_type: SchemaType, data_buf: &[u8], data_start: usize) {
        let mut batch_buf = std::mem::take(&mut self.batch_buf);
        batch_buf.clear();
        encode_batch_into(
            &mut batch_buf,
            &BatchParams {
                api_key: self.config.api_key_bytes(),
                schema_type,
                version: DEFAULT_VERSION,
                batch_id: self.batch_counter.fetch_add(1, Ordering::Relaxed),
                data: &data_buf[data_start..],
            },
        );

        self.send_or_retry(&batch_buf);
        self.batch_buf = batch_buf;
    }

    fn send_or_retry(&mut self, frame: &[u8]) {
        if self.transport.send_frame(frame) {
            return; // Fast path: sent on first try
        }

        if self.config.max_retries() == 0 {
            self.config
                .report_error(&TellError::network("send failed, no retries configured"));
            return;
        }

        let mut threads = self.retry_threads.lock();

        // Reap finished retry threads before checking the pool limit
        let mut i = 0;
        while i < threads.len() {
            if threads[i].is_finished() {
                let _ = threads.swap_remove(i).join();
            } else {
                i += 1;
            }
        }

        if threads.len() >= MAX_RETRY_THREADS {
            drop(threads);
            self.config
                .report_error(&TellError::network("send failed, retry pool full"));
            return;
        }

        debug!(len = frame.len(), "first send failed, scheduling retries");

        let config = self.config.clone();
        let endpoint = self.endpoint.clone();
        let frame = frame.to_vec();
        match thread::Builder::new()
            .name("tell-retry".to_string())
            .spawn(move || retry_send(config, endpoint, frame))
        {
            Ok(handle) => threads.push(handle),
            Err(_) => {
                drop(threads);
                self.config
                    .report_error(&TellError::network("send failed, retry thread unavailable"));
            }
        }
    }
}

/// Retry loop run on a dedicated thread with its own connection.
///
/// Delay before attempt n is `min(30s, 1000ms * 1.5^(n-1) + jitter)` with
/// jitter drawn uniformly from [0, 0.2 * base).
fn retry_send(config: Config, endpoint: Endpoint, frame: Vec<u8>) {
    let mut transport = TcpTransport::new(endpoint, config.network_timeout());
    let mut rng = rand::thread_rng();

    for attempt in 1..=config.max_retries() {
        let base = 1000.0 * 1.5f64.powi(attempt as i32 - 1);
        let jitter = rng.gen_range(0.0..base * 0.2);
        let delay = (base + jitter).min(MAX_RETRY_DELAY_MS);

        thread::sleep(Duration::from_millis(delay as u64));

        if transport.send_frame(&frame) {
            trace!(attempt, "batch delivered on retry");
            return;
        }
    }

    config.report_error(&TellError::network(format!(
        "send failed after {} retries",
        config.max_retries()
    )));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_event(tag: u64) -> WorkerMessage {
        WorkerMessage::Event(QueuedEvent {
            event_type: EventType::Track,
            timestamp: tag,
            device_id: [0; 16],
            session_id: [0; 16],
            event_name: None,
            payload: Vec::new(),
        })
    }

    fn timestamp_of(msg: &WorkerMessage) -> u64 {
        match msg {
            WorkerMessage::Event(event) => event.timestamp,
            _ => panic!("expected event message"),
        }
    }

    #[test]
    fn mailbox_caps_at_queue_limit() {
        let mailbox = Mailbox::new();
        for tag in 0..(MAX_QUEUE_SIZE as u64 * 2) {
            mailbox.push(probe_event(tag));
        }

        let queue = mailbox.queue.lock();
        assert_eq!(queue.len(), MAX_QUEUE_SIZE);
    }

    #[test]
    fn mailbox_overflow_drops_oldest() {
        let mailbox = Mailbox::new();
        let total = MAX_QUEUE_SIZE as u64 + 5;
        for tag in 0..total {
            mailbox.push(probe_event(tag));
        }

        // The survivors are the most recent MAX_QUEUE_SIZE messages
        let queue = mailbox.queue.lock();
        assert_eq!(timestamp_of(queue.front().expect("non-empty")), 5);
        assert_eq!(timestamp_of(queue.back().expect("non-empty")), total - 1);
    }

    #[test]
    fn mailbox_preserves_fifo_order() {
        let mailbox = Mailbox::new();
        for tag in 0..100 {
            mailbox.push(probe_event(tag));
        }

        let queue = mailbox.queue.lock();
        for (i, msg) in queue.iter().enumerate() {
            assert_eq!(timestamp_of(msg), i as u64);
        }
    }

    #[test]
    fn flush_signal_keeps_completion_channel() {
        let mailbox = Mailbox::new();
        let (done, wait) = bounded(1);
        mailbox.push(WorkerMessage::Flush(done));

        let mut queue = mailbox.queue.lock();
        match queue.pop_front().expect("message queued") {
            WorkerMessage::Flush(done) => {
                done.send(()).expect("receiver alive");
                assert!(wait.try_recv().is_ok());
            }
            _ => panic!("expected flush message"),
        }
    }
}
