//! Tests for endpoint parsing and the framed TCP transport

use std::io::Read;
use std::net::TcpListener;
use std::time::Duration;

use crate::error::ErrorKind;
use crate::transport::{Endpoint, TcpTransport};

#[test]
fn parse_host_and_port() {
    let endpoint = Endpoint::parse("collect.tell.rs:50000").expect("valid endpoint");
    assert_eq!(endpoint.host(), "collect.tell.rs");
    assert_eq!(endpoint.port(), 50_000);
}

#[test]
fn parse_uses_rightmost_colon() {
    // IPv6-ish host with multiple colons
    let endpoint = Endpoint::parse("::1:50000").expect("valid endpoint");
    assert_eq!(endpoint.host(), "::1");
    assert_eq!(endpoint.port(), 50_000);
}

#[test]
fn parse_rejects_missing_colon() {
    let err = Endpoint::parse("localhost").expect_err("no port");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.message().contains("host:port"));
}

#[test]
fn parse_rejects_non_numeric_port() {
    let err = Endpoint::parse("localhost:fifty").expect_err("bad port");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn parse_rejects_port_zero() {
    let err = Endpoint::parse("localhost:0").expect_err("port 0");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.message().contains("1-65535"));
}

#[test]
fn parse_rejects_port_out_of_range() {
    let err = Endpoint::parse("localhost:65536").expect_err("port too large");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn parse_accepts_port_boundaries() {
    assert_eq!(Endpoint::parse("h:1").expect("port 1").port(), 1);
    assert_eq!(Endpoint::parse("h:65535").expect("port 65535").port(), 65_535);
}

#[test]
fn send_frame_writes_length_prefix() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let endpoint = Endpoint::parse(&format!("127.0.0.1:{}", addr.port())).expect("endpoint");
    let mut transport = TcpTransport::new(endpoint, Duration::from_millis(1000));

    let payload = b"frame payload bytes";
    assert!(transport.send_frame(payload));

    let (mut conn, _) = listener.accept().expect("accept");
    let mut header = [0u8; 4];
    conn.read_exact(&mut header).expect("read header");
    assert_eq!(u32::from_be_bytes(header) as usize, payload.len());

    let mut body = vec![0u8; payload.len()];
    conn.read_exact(&mut body).expect("read body");
    assert_eq!(body, payload);
}

#[test]
fn connection_persists_across_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let endpoint = Endpoint::parse(&format!("127.0.0.1:{}", addr.port())).expect("endpoint");
    let mut transport = TcpTransport::new(endpoint, Duration::from_millis(1000));

    assert!(transport.send_frame(b"one"));
    assert!(transport.send_frame(b"two"));

    // Both frames arrive on a single accepted connection
    let (mut conn, _) = listener.accept().expect("accept");
    let mut buf = vec![0u8; (4 + 3) * 2];
    conn.read_exact(&mut buf).expect("read both frames");
    assert_eq!(&buf[4..7], b"one");
    assert_eq!(&buf[11..14], b"two");
}

#[test]
fn send_fails_when_unreachable() {
    // Reserved TEST-NET-1 address; connect times out or is refused
    let endpoint = Endpoint::parse("192.0.2.1:50000").expect("endpoint");
    let mut transport = TcpTransport::new(endpoint, Duration::from_millis(50));

    assert!(!transport.send_frame(b"dropped"));
}

#[test]
fn send_fails_fast_on_refused_port() {
    // Bind then drop to get a port with nothing listening
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").port()
    };

    let endpoint = Endpoint::parse(&format!("127.0.0.1:{port}")).expect("endpoint");
    let mut transport = TcpTransport::new(endpoint, Duration::from_millis(500));

    assert!(!transport.send_frame(b"nobody home"));
    // A second attempt reconnects and fails again rather than panicking
    assert!(!transport.send_frame(b"still nobody"));
}

#[test]
fn close_then_send_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let endpoint = Endpoint::parse(&format!("127.0.0.1:{}", addr.port())).expect("endpoint");
    let mut transport = TcpTransport::new(endpoint, Duration::from_millis(1000));

    assert!(transport.send_frame(b"first"));
    transport.close_connection();
    assert!(transport.send_frame(b"second"));

    // Two separate connections were accepted
    let (_c1, _) = listener.accept().expect("first accept");
    let (_c2, _) = listener.accept().expect("second accept");
}
