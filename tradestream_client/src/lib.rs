//! HTTP client for a running tradestream ingestion server
//!
//! Single-record puts against the `/api/v1/put_record` API, plus a `ping`
//! for startup health checks. The server assigns each stored record a
//! sequence number and routes it to a shard based on the partition key.

use reqwest::{Body, IntoUrl, Method, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use url::Url;

/// Primary error type for the [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("base URL error: {0}")]
    BaseUrl(#[source] reqwest::Error),

    #[error("request URL error: {0}")]
    RequestUrl(#[from] url::ParseError),

    #[error("failed to parse JSON response: {0}")]
    Json(#[source] reqwest::Error),

    #[error("server responded with error [{error_code}]: {message}")]
    ApiError {
        code: StatusCode,
        /// The service error code string, e.g.
        /// `ProvisionedThroughputExceededException`
        error_code: String,
        message: String,
    },

    #[error("failed to send {method} {url} request: {source}")]
    RequestSend {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    fn request_send(method: Method, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::RequestSend {
            method,
            url: url.into(),
            source,
        }
    }

    /// Build an [`Error::ApiError`] from a non-success response
    async fn from_response(resp: reqwest::Response) -> Self {
        let code = resp.status();

        #[derive(Deserialize)]
        struct ErrorBody {
            error_code: String,
            message: String,
        }

        match resp.json::<ErrorBody>().await {
            Ok(body) => Self::ApiError {
                code,
                error_code: body.error_code,
                message: body.message,
            },
            Err(_) => Self::ApiError {
                code,
                error_code: code.canonical_reason().unwrap_or("Unknown").to_string(),
                message: String::new(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The tradestream ingestion client
///
/// For programmatic access to the HTTP API of a running tradestream
/// ingestion server
#[derive(Debug, Clone)]
pub struct Client {
    /// The base URL for making requests to a running server
    base_url: Url,
    /// The `Bearer` token to use for authenticating on each request to the server
    auth_token: Option<Secret<String>>,
    /// A [`reqwest::Client`] for handling HTTP requests
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new [`Client`]
    pub fn new<U: IntoUrl>(base_url: U) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into_url().map_err(Error::BaseUrl)?,
            auth_token: None,
            http_client: reqwest::Client::new(),
        })
    }

    /// Set the `Bearer` token that will be sent with each request to the server
    ///
    /// # Example
    /// ```
    /// # use tradestream_client::Client;
    /// # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let token = "secret-token-string";
    /// let client = Client::new("http://localhost:8282")?
    ///     .with_auth_token(token);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_auth_token<S: Into<String>>(mut self, auth_token: S) -> Self {
        self.auth_token = Some(Secret::new(auth_token.into()));
        self
    }

    /// Compose a request to the `/api/v1/put_record` API
    ///
    /// # Example
    /// ```no_run
    /// # use tradestream_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("http://localhost:8282")?;
    /// let resp = client
    ///     .api_v1_put_record("trades")
    ///     .partition_key("113427455640312821154458202477256070485")
    ///     .body(r#"{"tickerSymbol":"AAPL"}"#)
    ///     .send()
    ///     .await
    ///     .expect("send put_record request");
    /// println!("stored in {} as {}", resp.shard_id, resp.sequence_number);
    /// # Ok(())
    /// # }
    /// ```
    pub fn api_v1_put_record<S: Into<String>>(
        &self,
        stream: S,
    ) -> PutRecordRequestBuilder<'_, NoBody> {
        PutRecordRequestBuilder {
            client: self,
            stream: stream.into(),
            partition_key: None,
            body: NoBody,
        }
    }

    /// Send a `/ping` request to the server, returning its version and revision
    pub async fn ping(&self) -> Result<PingResponse> {
        let url = self.base_url.join("/ping")?;
        let mut req = self.http_client.get(url.clone());
        if let Some(t) = &self.auth_token {
            req = req.bearer_auth(t.expose_secret());
        }
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(Method::GET, url, src))?;
        if resp.status() != StatusCode::OK {
            return Err(Error::from_response(resp).await);
        }
        resp.json().await.map_err(Error::Json)
    }
}

/// The response of a `/ping` request
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    version: String,
    revision: String,
}

impl PingResponse {
    /// Get the `version` from the response
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the `revision` from the response
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

/// The response of a successful `/api/v1/put_record` request
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRecordResponse {
    /// The server-assigned sequence number of the stored record
    pub sequence_number: String,
    /// The shard the record was routed to
    pub shard_id: String,
}

/// Typestate for a [`PutRecordRequestBuilder`] that has not had a body set yet
#[derive(Debug, Copy, Clone)]
pub struct NoBody;

/// Builder for a `/api/v1/put_record` request
#[derive(Debug)]
pub struct PutRecordRequestBuilder<'c, B> {
    client: &'c Client,
    stream: String,
    partition_key: Option<String>,
    body: B,
}

impl<'c, B> PutRecordRequestBuilder<'c, B> {
    /// Set the partition key that determines the target shard
    ///
    /// If not specified, the server picks a shard itself.
    pub fn partition_key<S: Into<String>>(mut self, partition_key: S) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }
}

impl<'c> PutRecordRequestBuilder<'c, NoBody> {
    /// Set the record payload, serialized bytes of the domain event
    pub fn body<T: Into<Body>>(self, body: T) -> PutRecordRequestBuilder<'c, Body> {
        PutRecordRequestBuilder {
            client: self.client,
            stream: self.stream,
            partition_key: self.partition_key,
            body: body.into(),
        }
    }
}

impl PutRecordRequestBuilder<'_, Body> {
    /// Send the put_record request to the server
    pub async fn send(self) -> Result<PutRecordResponse> {
        let url = self.client.base_url.join("/api/v1/put_record")?;

        #[derive(Serialize)]
        struct Params<'a> {
            stream: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            partition_key: Option<&'a str>,
        }

        let params = Params {
            stream: &self.stream,
            partition_key: self.partition_key.as_deref(),
        };
        let mut req = self
            .client
            .http_client
            .post(url.clone())
            .query(&params)
            .body(self.body);
        if let Some(t) = &self.client.auth_token {
            req = req.bearer_auth(t.expose_secret());
        }
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(Method::POST, url, src))?;
        match resp.status() {
            StatusCode::OK => resp.json().await.map_err(Error::Json),
            _ => Err(Error::from_response(resp).await),
        }
    }
}
