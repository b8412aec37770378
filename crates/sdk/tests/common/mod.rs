//! Shared test helpers: a TCP capture server speaking the framed protocol.
#![allow(dead_code)] // each test binary uses a different subset

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Frames received by the capture server, in arrival order.
pub type Frames = Arc<Mutex<Vec<Vec<u8>>>>;

/// Start a listener that strips the 4-byte big-endian length prefix from
/// every frame and records the payload bytes. Returns the endpoint string
/// and the shared frame log.
pub fn start_capture_server() -> (String, Frames) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind capture server");
    let addr = format!(
        "127.0.0.1:{}",
        listener.local_addr().expect("local addr").port()
    );

    let frames: Frames = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&frames);

    thread::spawn(move || {
        for conn in listener.incoming() {
            let Ok(mut conn) = conn else { continue };
            let captured = Arc::clone(&captured);
            thread::spawn(move || loop {
                let mut header = [0u8; 4];
                if conn.read_exact(&mut header).is_err() {
                    return;
                }
                let len = u32::from_be_bytes(header) as usize;
                let mut body = vec![0u8; len];
                if conn.read_exact(&mut body).is_err() {
                    return;
                }
                captured.lock().expect("frame lock").push(body);
            });
        }
    });

    (addr, frames)
}

/// Wait until at least `count` frames have arrived, or the timeout passes.
/// Returns a snapshot of everything received.
pub fn wait_for_frames(frames: &Frames, count: usize, timeout: Duration) -> Vec<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    loop {
        {
            let guard = frames.lock().expect("frame lock");
            if guard.len() >= count {
                return guard.clone();
            }
        }
        if Instant::now() >= deadline {
            return frames.lock().expect("frame lock").clone();
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Snapshot the frames received so far.
pub fn snapshot_frames(frames: &Frames) -> Vec<Vec<u8>> {
    frames.lock().expect("frame lock").clone()
}
