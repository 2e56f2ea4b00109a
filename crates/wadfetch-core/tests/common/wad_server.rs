//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed path -> response table. Unknown paths get 404. A route can
//! advertise a longer Content-Length than it sends to simulate a dropped
//! connection mid-transfer.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// If set, sent as Content-Length instead of the real body length.
    pub advertised_len: Option<usize>,
}

impl Route {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            advertised_len: None,
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: code,
            body: format!("error {}", code).into_bytes(),
            advertised_len: None,
        }
    }

    pub fn truncated(body: &[u8], advertised_len: usize) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            advertised_len: Some(advertised_len),
        }
    }
}

/// A running server. Requests are recorded as request paths.
pub struct WadServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl WadServer {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. `base` is e.g.
/// "http://127.0.0.1:12345/wads/"; routes are keyed by the full request path
/// ("/wads/doom2.wad"). The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> WadServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(p, r)| (p.to_string(), r))
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &routes, &log));
        }
    });
    WadServer {
        base: format!("http://127.0.0.1:{}/wads/", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Route>,
    log: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let path = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    log.lock().unwrap().push(path.clone());

    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));
    let reason = match route.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let len = route.advertised_len.unwrap_or(route.body.len());
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status, reason, len
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}
