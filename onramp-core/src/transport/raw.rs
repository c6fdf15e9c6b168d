//! Secondary transport: HTTP/1.1 written by hand over a `tokio` socket.
//!
//! `https` endpoints are wrapped in `tokio-rustls` with the webpki roots;
//! `http` endpoints use the plain socket. The response is read until its
//! `Content-Length` is satisfied or the peer closes (`Connection: close`),
//! and parsed with `httparse`.

use super::{API_KEY_HEADER, Transport, TransportError, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use bytes::Bytes;
use httparse::Status;
use rustls::pki_types::ServerName;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::{Host, Url};

/// Responses larger than this are rejected.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
const READ_CHUNK: usize = 8 * 1024;
const MAX_HEADERS: usize = 64;

pub struct RawTransport {
    tls: TlsConnector,
}

impl RawTransport {
    pub fn new() -> Result<Self, TransportError> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Unavailable(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
        })
    }
}

#[async_trait]
impl Transport for RawTransport {
    fn name(&self) -> &'static str {
        "raw"
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let target = Target::from_url(&request.url)?;
        let head = encode_head(request, &target)?;

        let stream = TcpStream::connect((target.connect_host.as_str(), target.port))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let raw = if target.tls {
            let server_name = ServerName::try_from(target.connect_host.clone())
                .map_err(|e| TransportError::Other(format!("invalid server name: {e}")))?;
            let mut stream = self
                .tls
                .connect(server_name, stream)
                .await
                .map_err(|e| TransportError::Connect(format!("tls handshake failed: {e}")))?;
            exchange(&mut stream, &head, &request.body).await?
        } else {
            let mut stream = stream;
            exchange(&mut stream, &head, &request.body).await?
        };

        parse_response(&raw)
    }
}

/// Where and how to connect for a given endpoint URL.
#[derive(Debug)]
struct Target {
    connect_host: String,
    host_header: String,
    port: u16,
    tls: bool,
    path: String,
}

impl Target {
    fn from_url(url: &Url) -> Result<Self, TransportError> {
        let tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(TransportError::Other(format!("unsupported scheme {other}"))),
        };
        let connect_host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(TransportError::Other("endpoint has no host".into())),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::Other("endpoint has no port".into()))?;
        let host = url.host_str().unwrap_or(&connect_host);
        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };

        Ok(Self {
            connect_host,
            host_header,
            port,
            tls,
            path,
        })
    }
}

fn encode_head(request: &UpstreamRequest, target: &Target) -> Result<Vec<u8>, TransportError> {
    let api_key = request.api_key.expose();
    if [api_key, request.user_agent.as_str()]
        .iter()
        .any(|value| value.contains(['\r', '\n']))
    {
        return Err(TransportError::Other("header value contains a line break".into()));
    }

    let head = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         {API_KEY_HEADER}: {api_key}\r\n\
         Content-Type: application/json\r\n\
         Accept: application/json\r\n\
         User-Agent: {user_agent}\r\n\
         Content-Length: {length}\r\n\
         Connection: close\r\n\
         \r\n",
        path = target.path,
        host = target.host_header,
        user_agent = request.user_agent,
        length = request.body.len(),
    );
    Ok(head.into_bytes())
}

async fn exchange<S>(stream: &mut S, head: &[u8], body: &[u8]) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let write_err = |e: io::Error| TransportError::Other(format!("failed to send request: {e}"));
    stream.write_all(head).await.map_err(write_err)?;
    stream.write_all(body).await.map_err(write_err)?;
    stream.flush().await.map_err(write_err)?;

    read_response(stream, MAX_RESPONSE_BYTES).await
}

/// Read until the declared body length has arrived or the peer closes.
async fn read_response<S>(stream: &mut S, limit: usize) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        if declared_length(&raw).is_some_and(|total| raw.len() >= total) {
            break;
        }

        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            // Many servers close TLS without close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !raw.is_empty() => break,
            Err(e) => {
                return Err(TransportError::Other(format!(
                    "failed to read response: {e}"
                )));
            }
        };

        if raw.len() + n > limit {
            return Err(TransportError::Other(format!(
                "response exceeds {limit} bytes"
            )));
        }
        raw.extend_from_slice(&buf[..n]);
    }

    Ok(raw)
}

/// Head plus body length, once a complete head with `Content-Length` (and no
/// chunked encoding) has been received.
fn declared_length(raw: &[u8]) -> Option<usize> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    let Ok(Status::Complete(offset)) = response.parse(raw) else {
        return None;
    };

    let mut length = None;
    for header in response.headers.iter() {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            return None;
        }
        if header.name.eq_ignore_ascii_case("content-length") {
            length = std::str::from_utf8(header.value)
                .ok()
                .and_then(|value| value.trim().parse::<usize>().ok());
        }
    }
    length.map(|length| offset + length)
}

fn parse_response(raw: &[u8]) -> Result<UpstreamResponse, TransportError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    let offset = match response.parse(raw) {
        Ok(Status::Complete(offset)) => offset,
        Ok(Status::Partial) => return Err(TransportError::Other("truncated response head".into())),
        Err(e) => {
            return Err(TransportError::Other(format!(
                "malformed response head: {e}"
            )));
        }
    };
    let status = response
        .code
        .ok_or_else(|| TransportError::Other("response without status code".into()))?;

    let header = |name: &str| {
        response
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| String::from_utf8_lossy(h.value).trim().to_ascii_lowercase())
    };
    let chunked = header("transfer-encoding").is_some_and(|value| value.contains("chunked"));
    let content_length = header("content-length").and_then(|value| value.parse::<usize>().ok());

    let payload = &raw[offset..];
    let body = if chunked {
        decode_chunked(payload)?
    } else if let Some(length) = content_length {
        payload
            .get(..length)
            .ok_or_else(|| TransportError::Other("truncated response body".into()))?
            .to_vec()
    } else {
        payload.to_vec()
    };

    Ok(UpstreamResponse {
        status,
        body: Bytes::from(body),
    })
}

fn decode_chunked(mut buf: &[u8]) -> Result<Vec<u8>, TransportError> {
    let truncated = || TransportError::Other("truncated chunked body".into());
    let mut body = Vec::new();

    loop {
        let (start, size) = match httparse::parse_chunk_size(buf) {
            Ok(Status::Complete(parsed)) => parsed,
            Ok(Status::Partial) => return Err(truncated()),
            Err(_) => return Err(TransportError::Other("invalid chunk size".into())),
        };
        let size = usize::try_from(size).map_err(|_| truncated())?;
        buf = &buf[start..];

        if size == 0 {
            return Ok(body);
        }

        body.extend_from_slice(buf.get(..size).ok_or_else(truncated)?);
        buf = buf
            .get(size..)
            .and_then(|rest| rest.strip_prefix(b"\r\n"))
            .ok_or_else(truncated)?;
    }
}
