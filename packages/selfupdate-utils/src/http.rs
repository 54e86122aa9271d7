use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Empty};
use hyper::{body::Incoming, header, Method, Response, StatusCode, Uri};
#[cfg(not(feature = "rustls-platform-verifier"))]
use hyper_rustls::ConfigBuilderExt;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use once_cell::sync::Lazy;
use rustls::ClientConfig;
#[cfg(feature = "rustls-platform-verifier")]
use rustls_platform_verifier::BuilderVerifierExt;
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

/// Upper bound on followed `Location` hops for a single request.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("invalid url '{url}': {source}")]
    InvalidUri {
        url: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },
    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("connection failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),
    #[error("tls setup failed: {0}")]
    Tls(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("more than {0} redirects")]
    TooManyRedirects(usize),
    #[error("redirect {0} without a usable Location header")]
    BadRedirect(u16),
}

#[derive(Debug)]
pub struct ResponseData {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: Option<Bytes>,
}

impl ResponseData {
    pub fn is_success(&self) -> bool {
        http_status_is_ok(self.status)
    }
}

impl fmt::Display for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response status: {}, body: {}",
            self.status,
            self.body.as_ref().map_or_else(
                || "".to_string(),
                |body| String::from_utf8_lossy(body).to_string(),
            )
        )
    }
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;

/// Shared hyper client that speaks both `http` and `https`, follows redirects
/// and bounds every wait on the network by a single timeout.
#[derive(Clone)]
pub struct HttpClient {
    inner: HttpsClient,
    timeout: Duration,
    default_headers: Arc<HashMap<String, String>>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let connector = https_connector()?;
        Ok(Self {
            inner: Client::builder(TokioExecutor::new()).build(connector),
            timeout,
            default_headers: Arc::new(HashMap::new()),
        })
    }

    /// Header sent with every request unless overridden per call.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.default_headers).insert(key.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET and collect the whole body. Only for small documents such as
    /// release metadata; downloads go through [`HttpClient::get_stream`].
    pub async fn get(
        &self,
        url: &str,
        header_map: &HashMap<String, String>,
    ) -> Result<ResponseData, HttpError> {
        let mut res = self.send(Method::GET, url, header_map).await?;
        let status = res.status().as_u16();
        let content_length = content_length(&res);
        let mut body = BytesMut::new();
        while let Some(chunk) = self.next_chunk(res.body_mut()).await? {
            body.extend_from_slice(&chunk);
        }
        Ok(ResponseData {
            status,
            content_length,
            body: Some(body.freeze()),
        })
    }

    pub async fn head(
        &self,
        url: &str,
        header_map: &HashMap<String, String>,
    ) -> Result<ResponseData, HttpError> {
        let res = self.send(Method::HEAD, url, header_map).await?;
        Ok(ResponseData {
            status: res.status().as_u16(),
            content_length: content_length(&res),
            body: None,
        })
    }

    /// GET returning the response with its body still unread.
    pub async fn get_stream(
        &self,
        url: &str,
        header_map: &HashMap<String, String>,
    ) -> Result<Response<Incoming>, HttpError> {
        self.send(Method::GET, url, header_map).await
    }

    /// Next data frame of a streaming body, `None` at end of stream.
    /// Trailer frames are skipped.
    pub async fn next_chunk(&self, body: &mut Incoming) -> Result<Option<Bytes>, HttpError> {
        loop {
            let frame = tokio::time::timeout(self.timeout, body.frame())
                .await
                .map_err(|_| HttpError::Timeout(self.timeout))?;
            match frame {
                None => return Ok(None),
                Some(frame) => {
                    if let Ok(data) = frame?.into_data() {
                        return Ok(Some(data));
                    }
                }
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        header_map: &HashMap<String, String>,
    ) -> Result<Response<Incoming>, HttpError> {
        let mut uri = parse_uri(url)?;
        for _ in 0..=MAX_REDIRECTS {
            let mut req = hyper::Request::builder()
                .method(method.clone())
                .uri(uri.clone());
            for (key, value) in self.default_headers.iter() {
                if !header_map.contains_key(key) {
                    req = req.header(key, value);
                }
            }
            for (key, value) in header_map {
                req = req.header(key, value);
            }
            let req = req.body(Empty::<Bytes>::new())?;

            let res = tokio::time::timeout(self.timeout, self.inner.request(req))
                .await
                .map_err(|_| HttpError::Timeout(self.timeout))??;

            if !is_redirect(res.status()) {
                return Ok(res);
            }
            let status = res.status().as_u16();
            let next = res
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| resolve_location(&uri, location))
                .ok_or(HttpError::BadRedirect(status))?;
            tracing::debug!("{} {} redirected ({}) to {}", method, uri, status, next);
            uri = next;
        }
        Err(HttpError::TooManyRedirects(MAX_REDIRECTS))
    }
}

fn parse_uri(url: &str) -> Result<Uri, HttpError> {
    url.parse::<Uri>().map_err(|source| HttpError::InvalidUri {
        url: url.to_string(),
        source,
    })
}

pub fn content_length(res: &Response<Incoming>) -> Option<u64> {
    res.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Resolve a `Location` value against the URI that produced it. Handles
/// absolute URLs and absolute paths, which is what release hosts send.
fn resolve_location(base: &Uri, location: &str) -> Option<Uri> {
    let location = location.trim();
    if let Ok(uri) = location.parse::<Uri>() {
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Some(uri);
        }
    }
    if location.starts_with('/') {
        let scheme = base.scheme_str()?;
        let authority = base.authority()?;
        return format!("{}://{}{}", scheme, authority, location).parse().ok();
    }
    None
}

pub fn http_status_is_ok(status: u16) -> bool {
    if let Ok(status) = StatusCode::from_u16(status) {
        !(status.is_client_error() || status.is_server_error())
    } else {
        false
    }
}

static PROVIDER: Lazy<Arc<rustls::crypto::CryptoProvider>> =
    Lazy::new(|| Arc::new(rustls::crypto::ring::default_provider()));

fn https_connector() -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let provider = PROVIDER.clone();
    let tls: ClientConfig;
    #[cfg(feature = "rustls-platform-verifier")]
    {
        tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| HttpError::Tls(e.to_string()))?
            .with_platform_verifier()
            .map_err(|e| HttpError::Tls(e.to_string()))?
            .with_no_client_auth();
    }
    #[cfg(all(feature = "webpki-roots", not(feature = "rustls-platform-verifier")))]
    {
        tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| HttpError::Tls(e.to_string()))?
            .with_webpki_roots()
            .with_no_client_auth();
    }
    #[cfg(all(
        feature = "native-tokio",
        not(feature = "webpki-roots"),
        not(feature = "rustls-platform-verifier")
    ))]
    {
        tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| HttpError::Tls(e.to_string()))?
            .with_native_roots()
            .map_err(|e| HttpError::Tls(e.to_string()))?
            .with_no_client_auth();
    }
    #[cfg(all(
        not(feature = "native-tokio"),
        not(feature = "webpki-roots"),
        not(feature = "rustls-platform-verifier")
    ))]
    {
        compile_error!("No TLS backend enabled");
    }
    Ok(hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build())
}
