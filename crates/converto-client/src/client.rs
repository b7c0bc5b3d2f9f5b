//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use converto_oauth::SessionToken;

use crate::api::{
    AuthApi, BackgroundApi, CompressApi, ConvertApi, HealthApi, TasksApi, UserApi,
};
use crate::error::{Error, ErrorResponse, Result};
use crate::types::Download;

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Default timeout for JSON requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for processing requests that return file data.
const DEFAULT_PROCESSING_TIMEOUT: Duration = Duration::from_secs(600);

/// Converto backend client.
///
/// # Example
///
/// ```no_run
/// use converto_client::{ConvertJob, ConvertoClient};
///
/// # async fn example() -> converto_client::Result<()> {
/// let client = ConvertoClient::builder()
///     .base_url("http://localhost:8000/api")
///     .auth_token("session-token")
///     .build()?;
///
/// let zip = client
///     .convert()
///     .convert(&[ConvertJob::new("/data/photo.png", "webp")])
///     .await?;
/// println!("{} bytes", zip.archive.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConvertoClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) processing_timeout: Duration,
    pub(crate) authenticated: bool,
}

impl ConvertoClient {
    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client for a backend on this machine with default settings.
    pub fn localhost() -> Result<Self> {
        Self::builder().base_url(DEFAULT_BASE_URL).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether a session token was configured.
    pub fn is_authenticated(&self) -> bool {
        self.inner.authenticated
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Email/password auth endpoints.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// File format conversion.
    pub fn convert(&self) -> ConvertApi {
        ConvertApi::new(self.clone())
    }

    /// Image, audio and video compression.
    pub fn compress(&self) -> CompressApi {
        CompressApi::new(self.clone())
    }

    /// Background removal.
    pub fn background(&self) -> BackgroundApi {
        BackgroundApi::new(self.clone())
    }

    /// Task history.
    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(self.clone())
    }

    /// Account settings.
    pub fn user(&self) -> UserApi {
        UserApi::new(self.clone())
    }

    /// Backend health.
    pub fn health(&self) -> HealthApi {
        HealthApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path relative to the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body and JSON response.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body whose response is file data.
    pub(crate) async fn post_for_download<B>(&self, path: &str, body: &B) -> Result<Download>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        tracing::debug!(%url, "Requesting download");
        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.processing_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);
        let data = response.bytes().await?.to_vec();
        Ok(Download { file_name, data })
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    pub(crate) async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(err) => {
                let message = err.message();
                match status {
                    404 => Error::NotFound(message),
                    401 => Error::Auth(message),
                    _ => Error::Api { status, message },
                }
            }
            Err(_) => match status {
                401 => Error::Auth(format!("HTTP {}", status)),
                _ => Error::Api {
                    status,
                    message: format!("HTTP {}", status),
                },
            },
        }
    }
}

/// Pull the file name out of a `Content-Disposition` header.
///
/// Prefers the RFC 5987 `filename*=UTF-8''...` form over plain `filename=`.
pub(crate) fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.trim().rsplit('\'').next().unwrap_or_default();
                if let Ok(decoded) = urlencoding::decode(encoded)
                    && !decoded.is_empty()
                {
                    return Some(decoded.into_owned());
                }
            }
            "filename" => {
                let name = value.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

/// Builder for creating a [`ConvertoClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
    processing_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            processing_timeout: DEFAULT_PROCESSING_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the backend base URL (including any `/api` prefix).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token sent with every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Use the access token of a backend session.
    pub fn session(self, session: &SessionToken) -> Self {
        self.auth_token(session.access_token.clone())
    }

    /// Set the timeout for JSON requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout for conversion, compression and background removal.
    pub fn processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ConvertoClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let authenticated = match &self.auth_token {
            Some(token) if !token.is_empty() => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| Error::Config("Invalid auth token".to_string()))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                true
            }
            _ => false,
        };

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("converto-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(ConvertoClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                processing_timeout: self.processing_timeout,
                authenticated,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
