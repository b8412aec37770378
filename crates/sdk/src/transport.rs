//! TCP transport with auto-reconnect
//!
//! A single persistent connection per owner. The transport is not thread
//! safe; the worker owns one and each retry task owns its own.
//!
//! Frames are `[u32 big-endian length][payload]`. Any connect or send
//! failure closes the socket and makes `send_frame` return false; the next
//! call reconnects lazily.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::SockRef;
use tracing::debug;

use crate::error::{Result, TellError};

/// Parsed `host:port` collector address.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse an endpoint string. The rightmost `:` separates host from a
    /// decimal port in [1, 65535].
    ///
    /// # Errors
    ///
    /// Returns a Configuration error on a missing colon or invalid port.
    pub fn parse(endpoint: &str) -> Result<Self> {
        let Some(colon) = endpoint.rfind(':') else {
            return Err(TellError::configuration(format!(
                "endpoint must be host:port, got: {endpoint}"
            )));
        };

        let host = endpoint[..colon].to_string();
        let port: u32 = endpoint[colon + 1..].parse().map_err(|_| {
            TellError::configuration(format!("endpoint port is not a valid number: {endpoint}"))
        })?;

        if port == 0 || port > 65_535 {
            return Err(TellError::configuration(format!(
                "endpoint port must be 1-65535, got: {port}"
            )));
        }

        Ok(Self {
            host,
            port: port as u16,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Persistent TCP connection to the collector.
pub(crate) struct TcpTransport {
    endpoint: Endpoint,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a transport for an already-parsed endpoint. No connection is
    /// made until the first send.
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            stream: None,
        }
    }

    /// Send one length-prefixed frame, reconnecting if necessary.
    ///
    /// Returns false on any failure; the socket is closed and the next
    /// call will reconnect.
    pub fn send_frame(&mut self, data: &[u8]) -> bool {
        if data.len() > u32::MAX as usize {
            return false;
        }

        if self.stream.is_none() {
            match self.connect() {
                Ok(stream) => self.stream = Some(stream),
                Err(err) => {
                    debug!(
                        host = self.endpoint.host(),
                        port = self.endpoint.port(),
                        error = %err,
                        "connect failed"
                    );
                    return false;
                }
            }
        }

        let header = (data.len() as u32).to_be_bytes();
        if self.write_all(&header) && self.write_all(data) {
            return true;
        }

        self.close_connection();
        false
    }

    /// Drop the connection. The next send reconnects.
    pub fn close_connection(&mut self) {
        self.stream = None;
    }

    fn write_all(&mut self, data: &[u8]) -> bool {
        match &mut self.stream {
            Some(stream) => stream.write_all(data).is_ok(),
            None => false,
        }
    }

    /// Resolve the host (both v6 and v4 candidates) and attempt each
    /// address with the configured timeout.
    fn connect(&self) -> std::io::Result<TcpStream> {
        let addrs = (self.endpoint.host(), self.endpoint.port()).to_socket_addrs()?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    self.configure_socket(&stream);
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no addresses resolved for {}", self.endpoint.host()),
            )
        }))
    }

    fn configure_socket(&self, stream: &TcpStream) {
        let _ = stream.set_nodelay(true);
        let _ = stream.set_write_timeout(Some(self.timeout));
        let _ = SockRef::from(stream).set_keepalive(true);
    }
}
