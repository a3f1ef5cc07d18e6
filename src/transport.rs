use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http::request::Request;
use http::{header, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_native_tls::{native_tls, TlsConnector};

use crate::config::Scheme;
use crate::record::TutorialPayload;

const COLLECTION_PATH: &str = "/api/tutorials/";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve {authority}: {source}")]
    Resolve {
        authority: String,
        #[source]
        source: io::Error,
    },
    #[error("could not resolve {0}: no addresses found")]
    NoAddress(String),
    #[error("connection to {authority} refused")]
    Refused {
        authority: String,
        #[source]
        source: io::Error,
    },
    #[error("could not connect to {authority}: {source}")]
    Connect {
        authority: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("TLS handshake failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),
    #[error("could not build request: {0}")]
    Request(#[from] http::Error),
    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("response body is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// The two calls the grader makes against the tutorials resource.
pub trait Transport {
    async fn create(&mut self, payload: &TutorialPayload) -> Result<RawResponse, TransportError>;

    async fn fetch(&mut self, id: &str) -> Result<String, TransportError>;
}

/// HTTP/1.1 client for one `host:port`, holding at most one connection.
pub struct HttpTransport {
    scheme: Scheme,
    host: String,
    authority: String,
    timeout: Duration,
    sender: Option<SendRequest<Full<Bytes>>>,
}

impl HttpTransport {
    pub fn new(scheme: Scheme, host: &str, port: &str, timeout: Duration) -> Self {
        Self {
            scheme,
            host: host.to_owned(),
            authority: format!("{host}:{port}"),
            timeout,
            sender: None,
        }
    }

    async fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Bytes,
    ) -> Result<RawResponse, TransportError> {
        let timeout = self.timeout;
        let result = tokio::time::timeout(timeout, self.exchange(method, path, body)).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                // a half-finished exchange leaves the connection unusable
                self.sender = None;
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    async fn exchange(
        &mut self,
        method: Method,
        path: &str,
        body: Bytes,
    ) -> Result<RawResponse, TransportError> {
        let sender = match self.sender.take() {
            Some(sender) if !sender.is_closed() => sender,
            _ => self.connect().await?,
        };
        let sender = self.sender.insert(sender);
        sender.ready().await?;

        let req = Request::builder()
            .method(method.clone())
            .uri(path)
            .header(header::HOST, self.authority.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(body))?;

        info!("{method} {}://{}{path}", self.scheme, self.authority);
        let res = sender.send_request(req).await?;
        let status = res.status();
        debug!("{method} {path} -> {status}");

        let body = res.collect().await?.to_bytes();

        Ok(RawResponse { status, body })
    }

    async fn connect(&self) -> Result<SendRequest<Full<Bytes>>, TransportError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(self.authority.as_str())
            .await
            .map_err(|source| TransportError::Resolve {
                authority: self.authority.clone(),
                source,
            })?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::NoAddress(self.authority.clone()));
        }

        let stream = TcpStream::connect(addrs.as_slice())
            .await
            .map_err(|source| match source.kind() {
                io::ErrorKind::ConnectionRefused => TransportError::Refused {
                    authority: self.authority.clone(),
                    source,
                },
                _ => TransportError::Connect {
                    authority: self.authority.clone(),
                    source,
                },
            })?;
        debug!("connected to {}", self.authority);

        match self.scheme {
            Scheme::Http => handshake(stream).await,
            Scheme::Https => {
                let connector = TlsConnector::from(native_tls::TlsConnector::new()?);
                let stream = connector.connect(&self.host, stream).await?;
                handshake(stream).await
            }
        }
    }
}

async fn handshake<S>(stream: S) -> Result<SendRequest<Full<Bytes>>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::task::spawn(async move {
        if let Err(err) = conn.await {
            warn!("connection failed: {:?}", err);
        }
    });
    Ok(sender)
}

impl Transport for HttpTransport {
    async fn create(&mut self, payload: &TutorialPayload) -> Result<RawResponse, TransportError> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::POST, COLLECTION_PATH, Bytes::from(body)).await
    }

    async fn fetch(&mut self, id: &str) -> Result<String, TransportError> {
        let path = format!("{COLLECTION_PATH}{id}/");
        let res = self.send(Method::GET, &path, Bytes::new()).await?;
        Ok(String::from_utf8(res.body.to_vec())?)
    }
}
