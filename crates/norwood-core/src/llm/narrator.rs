//! Narrative generation with retry and timeout handling.
//!
//! Wraps a provider and produces one narrative per staged prediction,
//! retrying transient failures with exponential backoff.

use std::sync::Arc;

use super::provider::{LlmProvider, LlmRequest};
use super::retry;
use crate::error::AnalysisError;
use crate::types::Narrative;

/// Configuration for narrative generation.
#[derive(Debug, Clone)]
pub struct NarrateOptions {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries per narrative
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for NarrateOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Produces LLM narratives for staged predictions.
pub struct Narrator {
    provider: Arc<dyn LlmProvider>,
    options: NarrateOptions,
}

impl Narrator {
    pub fn new(provider: Box<dyn LlmProvider>, options: NarrateOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            options,
        }
    }

    /// Provider name, for logging.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a narrative, retrying transient failures.
    pub async fn narrate(&self, request: &LlmRequest) -> Result<Narrative, AnalysisError> {
        let mut last_error = AnalysisError::Llm {
            message: "No attempts made".to_string(),
            status_code: None,
        };

        for attempt in 0..=self.options.retry_attempts {
            if attempt > 0 {
                let delay = retry::backoff_duration(attempt - 1, self.options.retry_delay_ms);
                tracing::debug!(
                    "Narrative retry {attempt}/{} after {delay:?}",
                    self.options.retry_attempts
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(
                std::time::Duration::from_millis(self.options.timeout_ms),
                self.provider.generate(request),
            )
            .await
            {
                Ok(Ok(response)) => {
                    return Ok(Narrative {
                        text: response.text,
                        llm_model: response.model,
                        llm_latency_ms: response.latency_ms,
                        llm_tokens: response.tokens_used,
                    });
                }
                Ok(Err(e)) => {
                    let retryable = retry::is_retryable(&e);
                    last_error = e;
                    if !retryable {
                        break;
                    }
                }
                Err(_) => {
                    last_error = AnalysisError::Timeout {
                        stage: "llm".to_string(),
                        timeout_ms: self.options.timeout_ms,
                    };
                    // Timeouts are retryable
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::LlmResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// A configurable mock LLM provider.
    ///
    /// Each call to `generate()` invokes the response factory with the
    /// current call index, so tests can return different results per attempt.
    struct MockProvider {
        response_fn: Box<dyn Fn(u32) -> Result<LlmResponse, AnalysisError> + Send + Sync>,
        call_count: Arc<AtomicU32>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn with_responses(
            f: impl Fn(u32) -> Result<LlmResponse, AnalysisError> + Send + Sync + 'static,
        ) -> (Self, Arc<AtomicU32>) {
            let call_count = Arc::new(AtomicU32::new(0));
            (
                Self {
                    response_fn: Box::new(f),
                    call_count: call_count.clone(),
                    delay: None,
                },
                call_count,
            )
        }
    }

    fn ok_response(text: &str) -> Result<LlmResponse, AnalysisError> {
        Ok(LlmResponse {
            text: text.to_string(),
            model: "mock-v1".to_string(),
            tokens_used: Some(42),
            latency_ms: 10,
        })
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, AnalysisError> {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.response_fn)(call)
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn request() -> LlmRequest {
        LlmRequest {
            image: None,
            prompt: "explain".to_string(),
            max_tokens: 100,
            temperature: 0.3,
        }
    }

    fn fast_options() -> NarrateOptions {
        NarrateOptions {
            timeout_ms: 500,
            retry_attempts: 3,
            retry_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_narrate_success() {
        let (provider, calls) = MockProvider::with_responses(|_| ok_response("Stage looks early."));
        let narrator = Narrator::new(Box::new(provider), fast_options());

        let narrative = narrator.narrate(&request()).await.unwrap();
        assert_eq!(narrative.text, "Stage looks early.");
        assert_eq!(narrative.llm_model, "mock-v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_narrate_retries_transient_then_succeeds() {
        let (provider, calls) = MockProvider::with_responses(|call| {
            if call == 0 {
                Err(AnalysisError::Llm {
                    message: "HTTP 503".to_string(),
                    status_code: Some(503),
                })
            } else {
                ok_response("Recovered.")
            }
        });
        let narrator = Narrator::new(Box::new(provider), fast_options());

        let narrative = narrator.narrate(&request()).await.unwrap();
        assert_eq!(narrative.text, "Recovered.");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_narrate_gives_up_on_permanent_error() {
        let (provider, calls) = MockProvider::with_responses(|_| {
            Err(AnalysisError::Llm {
                message: "HTTP 401: unauthorized".to_string(),
                status_code: Some(401),
            })
        });
        let narrator = Narrator::new(Box::new(provider), fast_options());

        let err = narrator.narrate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        // Non-retryable: a single attempt
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_narrate_exhausts_retries() {
        let (provider, calls) = MockProvider::with_responses(|_| {
            Err(AnalysisError::Llm {
                message: "HTTP 500".to_string(),
                status_code: Some(500),
            })
        });
        let narrator = Narrator::new(Box::new(provider), fast_options());

        let err = narrator.narrate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        // Initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_narrate_times_out_slow_provider() {
        let (mut provider, _) = MockProvider::with_responses(|_| ok_response("too late"));
        provider.delay = Some(Duration::from_millis(200));
        let narrator = Narrator::new(
            Box::new(provider),
            NarrateOptions {
                timeout_ms: 20,
                retry_attempts: 0,
                retry_delay_ms: 1,
            },
        );

        let err = narrator.narrate(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout { .. }));
    }
}
