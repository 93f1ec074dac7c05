//! Resilient model invocation and tolerant structured-output extraction.
//!
//! [`llm::InvocationEngine`] performs a chat-completions call under a
//! per-attempt timeout, caller cancellation and bounded exponential
//! backoff. [`extract`] recovers one JSON object from noisy model output
//! and checks required fields. [`pipeline`] chains the two.

pub mod config;
pub mod extract;
pub mod llm;
pub mod pipeline;

pub use config::Settings;
pub use extract::{extract, validate, ExtractionError, Extractor, ValidationError};
pub use llm::{ClassifiedError, InvocationEngine, InvocationRequest, Message};
pub use pipeline::{generate_structured, PipelineError, Stage, StructuredCall, StructuredOutput};
