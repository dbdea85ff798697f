//! A model provider for OpenAI-compatible chat completion APIs.
//!
//! User messages with image and audio parts are sent as `image_url` (data
//! URL) and `input_audio` parts. Transient failures are retried here, with
//! exponential backoff, so callers never need a retry loop of their own.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use backoff::ExponentialBackoffBuilder;
use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use switchyard_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use tracing::Instrument;

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use proto::ChatCompletionRequest;
use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    transient: bool,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            transient: false,
        }
    }

    fn from_status(status: StatusCode, detail: &str) -> Self {
        let kind = if status == StatusCode::TOO_MANY_REQUESTS {
            ErrorKind::RateLimitExceeded
        } else {
            ErrorKind::Other
        };
        Self {
            message: format!("HTTP {status}: {}", detail.trim()),
            kind,
            transient: status == StatusCode::TOO_MANY_REQUESTS
                || status.is_server_error(),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req, &self.config);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let span = debug_span!("openai request", model = %config.model);

        async move {
            let resp = match config.retry_budget {
                None => send_once(&client, &config, &body).await?,
                Some(budget) => {
                    let policy = ExponentialBackoffBuilder::new()
                        .with_max_elapsed_time(Some(budget))
                        .build();
                    backoff::future::retry(policy, || async {
                        send_once(&client, &config, &body).await.map_err(|err| {
                            if err.transient {
                                warn!("transient failure, will retry: {err}");
                                backoff::Error::transient(err)
                            } else {
                                backoff::Error::permanent(err)
                            }
                        })
                    })
                    .await?
                }
            };

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse::<Mime>().ok())
                .is_some_and(|m| {
                    m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
                });
            if !is_event_stream {
                return Err(Error::new(
                    format!("unexpected content type: {content_type:?}"),
                    ErrorKind::MalformedResponse,
                ));
            }

            let sse = Sse::new(Chunks::from_response(resp));
            Ok(OpenAIResponse::from_sse(sse))
        }
        .instrument(span)
    }
}

async fn send_once(
    client: &Client,
    config: &OpenAIConfig,
    body: &ChatCompletionRequest,
) -> Result<Response, Error> {
    let mut builder = client
        .post(format!("{}/chat/completions", config.base_url))
        .bearer_auth(&config.api_key)
        .header(header::ACCEPT, "text/event-stream")
        .json(body);
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }

    let resp = builder.send().await.map_err(|err| Error {
        message: format!("{err}"),
        kind: ErrorKind::Other,
        transient: err.is_connect() || err.is_timeout(),
    })?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    Err(Error::from_status(status, &detail))
}
