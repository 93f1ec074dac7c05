mod engine;
mod error;
mod request;
mod response;
mod retry;
mod transport;

pub use engine::{Attempt, AttemptObserver, AttemptOutcome, InvocationEngine};
pub use error::{ClassifiedError, ErrorKind};
pub use request::{redact, GenerationParams, InvocationRequest, Message, Role};
pub use response::{ModelOutput, Usage};
pub use retry::{decide, BackoffSchedule, RetryDecision, UNKNOWN_RETRY_LIMIT};
pub use transport::{request_body, HttpTransport, Transport, TransportError, TransportResponse};
