//! A tiny in-process HTTP responder standing in for the artifact-manager service and the
//! storage endpoint behind its upload URLs. One request per connection, `Connection: close`.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// `create`, `edit`, ... for RPC calls; `None` for raw uploads.
    pub fn rpc_method(&self) -> Option<&str> {
        self.path.strip_prefix("/public/services/artifact-manager/")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Behaviour {
    /// Every `create` answers 409, as if the artifacts already existed.
    pub existing: bool,
    /// Upload PUTs whose path contains this string answer 500.
    pub fail_upload_containing: Option<&'static str>,
    /// Error responses advertise a longer body than they send, then hang up.
    pub truncate_error_bodies: bool,
}

pub struct MockHypha {
    pub base_url: String,
    pub log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockHypha {
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn rpc_calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.rpc_method().map(str::to_string))
            .collect()
    }

    pub fn uploads(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "PUT")
            .collect()
    }
}

pub async fn spawn_mock_hypha(behaviour: Behaviour) -> MockHypha {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_in = log.clone();
    let base_in = base_url.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let log = log_in.clone();
            let base = base_in.clone();
            tokio::spawn(async move {
                let Some(req) = read_request(&mut stream).await else {
                    return;
                };
                let (status, body) = respond(&req, &base, behaviour);
                log.lock().unwrap().push(req);
                let advertised = if behaviour.truncate_error_bodies && !status.starts_with('2') {
                    body.len() + 64
                } else {
                    body.len()
                };
                let resp = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {advertised}\r\nConnection: close\r\n\r\n{body}"
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    MockHypha { base_url, log }
}

fn respond(req: &Recorded, base: &str, behaviour: Behaviour) -> (&'static str, String) {
    const OK: &str = "200 OK";
    if req.method == "PUT" {
        let failing = behaviour
            .fail_upload_containing
            .map(|needle| req.path.contains(needle))
            .unwrap_or(false);
        return if failing {
            ("500 Internal Server Error", "upload rejected".to_string())
        } else {
            (OK, String::new())
        };
    }

    let body = req.json();
    match req.rpc_method() {
        Some("create") if behaviour.existing => (
            "409 Conflict",
            json!({"detail": "artifact already exists"}).to_string(),
        ),
        Some("create") => {
            let alias = body["alias"].as_str().unwrap_or_default();
            (
                OK,
                json!({"id": format!("ri-scale/{alias}"), "alias": alias}).to_string(),
            )
        }
        Some("edit") | Some("read") | Some("commit") => {
            (OK, json!({"id": body["artifact_id"]}).to_string())
        }
        Some("put_file") => {
            let file_path = body["file_path"].as_str().unwrap_or_default();
            (OK, json!(format!("{base}/upload/{file_path}")).to_string())
        }
        _ => ("404 Not Found", json!({"detail": "unknown"}).to_string()),
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            match key.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(Recorded {
        method,
        path,
        authorization,
        body: buf[header_end..].to_vec(),
    })
}

/// Writes a model directory with a manifest and two payload files.
pub fn write_model_dir(root: &Path, model_id: &str) {
    std::fs::write(
        root.join("manifest.yaml"),
        format!("id: {model_id}\nname: E2E Model\ndescription: end-to-end fixture\n"),
    )
    .unwrap();
    std::fs::write(root.join("weights.bin"), vec![1u8; 32]).unwrap();
    std::fs::create_dir_all(root.join("extra")).unwrap();
    std::fs::write(root.join("extra/readme.txt"), "hello").unwrap();
}
