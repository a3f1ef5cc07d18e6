//! In-process stand-in for a student's tutorials service.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::TcpListener;

pub struct Reply {
    status: StatusCode,
    body: String,
}

impl Reply {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

pub type Handler = fn(&Method, &str, &[u8]) -> Reply;

#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub path: String,
    pub host: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct TestServer {
    port: u16,
    hits: Arc<Mutex<Vec<Hit>>>,
    connections: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

pub async fn spawn(handler: Handler) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));

    let server = TestServer {
        port,
        hits: hits.clone(),
        connections: connections.clone(),
    };

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            connections.fetch_add(1, Ordering::SeqCst);
            let hits = hits.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let hits = hits.clone();
                    async move {
                        let reply = record(req, &hits, handler).await;
                        let res = Response::builder()
                            .status(reply.status)
                            .header(header::CONTENT_TYPE, "application/json")
                            .body(Full::new(Bytes::from(reply.body)))
                            .unwrap();
                        Ok::<_, Infallible>(res)
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    server
}

async fn record(req: Request<Incoming>, hits: &Mutex<Vec<Hit>>, handler: Handler) -> Reply {
    let header_text = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    let host = header_text(header::HOST);
    let accept = header_text(header::ACCEPT);
    let content_type = header_text(header::CONTENT_TYPE);
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let body = req.into_body().collect().await.unwrap().to_bytes();
    let reply = handler(&method, &path, &body);

    hits.lock().unwrap().push(Hit {
        method,
        path,
        host,
        accept,
        content_type,
        body,
    });
    reply
}
