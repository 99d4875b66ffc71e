//! In-process HTTP fixture for client tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub chunks: Vec<(Duration, Vec<u8>)>,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![(Duration::ZERO, body.as_bytes().to_vec())],
        }
    }

    pub fn stream(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: chunks
                .iter()
                .map(|chunk| (Duration::from_millis(15), chunk.as_bytes().to_vec()))
                .collect(),
        }
    }

    pub fn then_after(mut self, pause: Duration, chunk: &str) -> Self {
        self.chunks.push((pause, chunk.as_bytes().to_vec()));
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub target: String,
    pub body: String,
}

pub(crate) struct Fixture {
    pub base: String,
    handle: JoinHandle<Vec<Recorded>>,
}

impl Fixture {
    /// Serves `replies` in accept order, one connection each, then stops.
    pub fn serve(replies: Vec<Reply>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base = format!("http://{}", listener.local_addr()?);
        let handle = thread::spawn(move || {
            let mut connections = Vec::new();
            for reply in replies {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                connections.push(thread::spawn(move || handle_connection(stream, reply)));
            }
            connections
                .into_iter()
                .filter_map(|connection| connection.join().ok().flatten())
                .collect()
        });
        Ok(Self { base, handle })
    }

    pub fn requests(self) -> Vec<Recorded> {
        self.handle.join().unwrap_or_default()
    }
}

/// A base URL nothing listens on.
pub(crate) fn dead_base() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

fn handle_connection(stream: TcpStream, reply: Reply) -> Option<Recorded> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).ok()? == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    let mut stream = stream;
    let reason = if (200..300).contains(&reply.status) {
        "OK"
    } else {
        "Error"
    };
    let head = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
        reply.status, reply.content_type
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.flush();
    for (pause, chunk) in reply.chunks {
        thread::sleep(pause);
        if stream.write_all(&chunk).is_err() || stream.flush().is_err() {
            break;
        }
    }

    Some(Recorded {
        method,
        target,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}
