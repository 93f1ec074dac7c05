// ============================================
// WORLDSMITH - Invocation Engine
// ============================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::error::ClassifiedError;
use super::request::InvocationRequest;
use super::response::{self, ModelOutput, Usage};
use super::retry::{decide, BackoffSchedule, RetryDecision};
use super::transport::{HttpTransport, Transport};

/// How one attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded { usage: Usage },
    Failed(ClassifiedError),
}

/// One concrete network call within an invocation
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 0-based
    pub index: u32,
    /// On tokio's clock, the same one timeouts and backoff run on
    pub started_at: Instant,
    pub latency: Duration,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded { .. })
    }
}

/// Progress hook for display purposes. Called once per finished attempt.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, attempt: &Attempt);
}

impl<F> AttemptObserver for F
where
    F: Fn(&Attempt) + Send + Sync,
{
    fn on_attempt(&self, attempt: &Attempt) {
        self(attempt)
    }
}

/// Runs one logical request as a bounded sequence of attempts.
///
/// The engine holds no per-invocation state: clones share only the
/// transport, so any number of invocations may run concurrently.
#[derive(Clone)]
pub struct InvocationEngine {
    transport: Arc<dyn Transport>,
    backoff: BackoffSchedule,
}

impl Default for InvocationEngine {
    fn default() -> Self {
        Self::new(Arc::new(HttpTransport::new()))
    }
}

impl InvocationEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            backoff: BackoffSchedule::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    /// Invoke without external cancellation or progress reporting.
    pub async fn invoke(&self, request: &InvocationRequest) -> Result<ModelOutput, ClassifiedError> {
        self.invoke_with(request, &CancellationToken::new(), None)
            .await
    }

    /// Invoke with a caller-owned cancellation token and an optional
    /// progress observer.
    pub async fn invoke_with(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
        observer: Option<&dyn AttemptObserver>,
    ) -> Result<ModelOutput, ClassifiedError> {
        if let Err(e) = request.validate() {
            tracing::warn!(error = %e, "Rejecting invocation before any attempt");
            return Err(e);
        }

        let span = tracing::info_span!(
            "invocation",
            invocation_id = %uuid::Uuid::new_v4(),
            model = %request.model,
            transport = self.transport.name(),
        );

        self.run_attempts(request, cancel, observer)
            .instrument(span)
            .await
    }

    async fn run_attempts(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
        observer: Option<&dyn AttemptObserver>,
    ) -> Result<ModelOutput, ClassifiedError> {
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut attempt_index = 0u32;

        let result = loop {
            let started_at = Instant::now();
            let result = self.attempt(request, cancel).await;
            let latency = started_at.elapsed();

            let outcome = match &result {
                Ok(output) => AttemptOutcome::Succeeded {
                    usage: output.usage,
                },
                Err(e) => AttemptOutcome::Failed(e.clone()),
            };
            let attempt = Attempt {
                index: attempt_index,
                started_at,
                latency,
                outcome,
            };
            log_attempt(&attempt);
            if let Some(observer) = observer {
                observer.on_attempt(&attempt);
            }
            attempts.push(attempt);

            let error = match result {
                Ok(output) => break Ok(output),
                Err(e) => e,
            };

            match decide(&error, attempt_index, request.max_retries, &self.backoff) {
                RetryDecision::NoRetry => break Err(error),
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        attempt = attempt_index,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break Err(ClassifiedError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                    attempt_index += 1;
                }
            }
        };

        let total: Duration = attempts.iter().map(|a| a.latency).sum();
        match &result {
            Ok(output) => tracing::info!(
                attempts = attempts.len(),
                total_latency_ms = total.as_millis() as u64,
                prompt_tokens = output.usage.prompt_tokens,
                completion_tokens = output.usage.completion_tokens,
                "Invocation succeeded"
            ),
            Err(e) => tracing::error!(
                attempts = attempts.len(),
                total_latency_ms = total.as_millis() as u64,
                kind = %e.kind(),
                error = %e,
                "Invocation failed"
            ),
        }

        result
    }

    /// One network call raced against the attempt timeout and the
    /// cancellation token. Dropping the transport future aborts the
    /// in-flight request.
    async fn attempt(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> Result<ModelOutput, ClassifiedError> {
        let send = timeout(request.timeout, self.transport.send(request));

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClassifiedError::Cancelled),
            result = send => match result {
                Err(_elapsed) => {
                    return Err(ClassifiedError::TimedOut {
                        timeout: request.timeout,
                    })
                }
                Ok(Err(e)) => {
                    return Err(ClassifiedError::NetworkFault {
                        message: e.to_string(),
                    })
                }
                Ok(Ok(reply)) => reply,
            },
        };

        if !reply.is_success() {
            let message = response::error_message(reply.status, &reply.body);
            return Err(ClassifiedError::from_status(reply.status, message));
        }

        response::parse_success(&reply.body).ok_or_else(|| ClassifiedError::Unknown {
            message: "response body lacks choices[0].message.content".to_string(),
            status: Some(reply.status),
        })
    }
}

fn log_attempt(attempt: &Attempt) {
    let latency_ms = attempt.latency.as_millis() as u64;
    match &attempt.outcome {
        AttemptOutcome::Succeeded { usage } => tracing::debug!(
            attempt = attempt.index,
            latency_ms,
            completion_tokens = usage.completion_tokens,
            outcome = "success",
            "Attempt finished"
        ),
        AttemptOutcome::Failed(e) => tracing::debug!(
            attempt = attempt.index,
            latency_ms,
            outcome = %e.kind(),
            status = e.status(),
            "Attempt finished"
        ),
    }
}
