// ============================================
// WORLDSMITH - Structured Generation Pipeline
// ============================================
//
// invoke -> extract -> validate, as one call with an explicit stage trail.
// Terminal failures never loop back into invocation; re-prompting after a
// shape failure is the caller's decision.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::extract::{validate, ExtractionError, Extractor, ValidationError};
use crate::llm::{AttemptObserver, ClassifiedError, InvocationEngine, InvocationRequest, Usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Invoking,
    Succeeded,
    Failed,
    Extracting,
    Extracted,
    ExtractionFailed,
    Validating,
    Valid,
    Invalid,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::Failed | Stage::ExtractionFailed | Stage::Invalid | Stage::Valid
        )
    }

    /// Transitions the pipeline is allowed to take.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Invoking)
                | (Stage::Invoking, Stage::Succeeded)
                | (Stage::Invoking, Stage::Failed)
                | (Stage::Succeeded, Stage::Extracting)
                | (Stage::Extracting, Stage::Extracted)
                | (Stage::Extracting, Stage::ExtractionFailed)
                | (Stage::Extracted, Stage::Validating)
                | (Stage::Validating, Stage::Valid)
                | (Stage::Validating, Stage::Invalid)
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Invocation(#[from] ClassifiedError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl PipelineError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Invocation(e) => e.user_message(),
            PipelineError::Extraction(e) => e.user_message(),
            PipelineError::Validation(e) => e.user_message(),
        }
    }

    /// Stage the pipeline stopped in.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Invocation(_) => Stage::Failed,
            PipelineError::Extraction(_) => Stage::ExtractionFailed,
            PipelineError::Validation(_) => Stage::Invalid,
        }
    }
}

/// A validated object plus the usage of the invocation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutput {
    pub value: Value,
    pub usage: Usage,
}

impl StructuredOutput {
    /// Deserialize the validated object into a caller type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

/// One caller-facing structured generation.
pub struct StructuredCall<'a> {
    engine: &'a InvocationEngine,
    extractor: Extractor,
    required: Vec<String>,
    stages: Vec<Stage>,
}

impl<'a> StructuredCall<'a> {
    pub fn new(engine: &'a InvocationEngine) -> Self {
        Self {
            engine,
            extractor: Extractor::new(),
            required: Vec::new(),
            stages: vec![Stage::Idle],
        }
    }

    pub fn extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn require<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Stages visited so far, starting with `Idle`.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage().can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage(),
            next
        );
        tracing::debug!(from = ?self.stage(), to = ?next, "Pipeline stage");
        self.stages.push(next);
    }

    pub async fn run(&mut self, request: &InvocationRequest) -> Result<StructuredOutput, PipelineError> {
        self.run_with(request, &CancellationToken::new(), None).await
    }

    pub async fn run_with(
        &mut self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
        observer: Option<&dyn AttemptObserver>,
    ) -> Result<StructuredOutput, PipelineError> {
        self.advance(Stage::Invoking);
        let output = match self.engine.invoke_with(request, cancel, observer).await {
            Ok(output) => {
                self.advance(Stage::Succeeded);
                output
            }
            Err(e) => {
                self.advance(Stage::Failed);
                return Err(e.into());
            }
        };

        self.advance(Stage::Extracting);
        let value = match self.extractor.extract(&output.text) {
            Ok(value) => {
                self.advance(Stage::Extracted);
                value
            }
            Err(e) => {
                self.advance(Stage::ExtractionFailed);
                return Err(e.into());
            }
        };

        self.advance(Stage::Validating);
        if let Err(e) = validate(&value, self.required.as_slice()) {
            self.advance(Stage::Invalid);
            return Err(e.into());
        }
        self.advance(Stage::Valid);

        Ok(StructuredOutput {
            value,
            usage: output.usage,
        })
    }
}

/// Convenience wrapper: run one structured call with default extraction.
pub async fn generate_structured<S: AsRef<str>>(
    engine: &InvocationEngine,
    request: &InvocationRequest,
    required: &[S],
) -> Result<StructuredOutput, PipelineError> {
    StructuredCall::new(engine)
        .require(required.iter().map(|s| s.as_ref().to_string()))
        .run(request)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Failed.is_terminal());
        assert!(Stage::ExtractionFailed.is_terminal());
        assert!(Stage::Invalid.is_terminal());
        assert!(Stage::Valid.is_terminal());
        assert!(!Stage::Succeeded.is_terminal());
        assert!(!Stage::Extracted.is_terminal());
    }

    #[test]
    fn test_no_transition_back_to_invoking() {
        for stage in [Stage::Failed, Stage::ExtractionFailed, Stage::Invalid, Stage::Valid] {
            assert!(!stage.can_advance_to(Stage::Invoking));
        }
        assert!(Stage::Idle.can_advance_to(Stage::Invoking));
        assert!(!Stage::Succeeded.can_advance_to(Stage::Validating));
    }

    #[test]
    fn test_error_stage_mapping() {
        let err: PipelineError = ClassifiedError::Cancelled.into();
        assert_eq!(err.stage(), Stage::Failed);

        let err: PipelineError = ValidationError::MissingField {
            field: "name".into(),
        }
        .into();
        assert_eq!(err.stage(), Stage::Invalid);
        assert_eq!(err.to_string(), "missing required field: name");
    }
}
