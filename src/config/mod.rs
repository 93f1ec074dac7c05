mod settings;

pub use settings::{BackoffConfig, Settings};
