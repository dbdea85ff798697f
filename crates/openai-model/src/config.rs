use std::fmt::{self, Debug};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(30);

/// Builder for [`OpenAIConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    retry_budget: Option<Option<Duration>>,
}

impl OpenAIConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            request_timeout: None,
            retry_budget: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets a timeout for a whole request, including the streamed body.
    ///
    /// There is no timeout by default.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets how long transient failures (rate limits, server errors,
    /// connection failures) are retried with exponential backoff. `None`
    /// disables retrying. Defaults to 30 seconds.
    #[inline]
    pub fn with_retry_budget(mut self, budget: Option<Duration>) -> Self {
        self.retry_budget = Some(budget);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> OpenAIConfig {
        OpenAIConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            request_timeout: self.request_timeout,
            retry_budget: self.retry_budget.unwrap_or(Some(DEFAULT_RETRY_BUDGET)),
        }
    }
}

impl Debug for OpenAIConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("retry_budget", &self.retry_budget)
            .finish()
    }
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpenAIConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) retry_budget: Option<Duration>,
}

impl OpenAIConfig {
    /// Returns the model identifier.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("retry_budget", &self.retry_budget)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OpenAIConfigBuilder::with_api_key("sk-secret").build();
        assert_eq!(config.model(), "gpt-4o");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.retry_budget, Some(Duration::from_secs(30)));
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn test_overrides() {
        let config = OpenAIConfigBuilder::with_api_key("k")
            .with_model("gpt-4o-mini")
            .with_base_url("http://localhost:8080/v1/")
            .with_retry_budget(None)
            .build();
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.retry_budget, None);
    }
}
