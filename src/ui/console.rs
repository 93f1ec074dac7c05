use colored::Colorize;
use serde_json::Value;

use worldsmith::llm::{redact, Attempt, AttemptOutcome, Usage};
use worldsmith::Settings;

pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "[INFO]".blue(), message);
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "[WARN]".yellow(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "[ERROR]".red(), message);
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "[OK]".green(), message);
    }

    pub fn attempt(&self, attempt: &Attempt) {
        let latency = format!("{}ms", attempt.latency.as_millis()).dimmed();
        match &attempt.outcome {
            AttemptOutcome::Succeeded { .. } => eprintln!(
                "  {} attempt {} {}",
                "✓".green(),
                attempt.index + 1,
                latency
            ),
            AttemptOutcome::Failed(e) => eprintln!(
                "  {} attempt {} {} {}",
                "✗".red(),
                attempt.index + 1,
                latency,
                e.to_string().dimmed()
            ),
        }
    }

    /// Structured result on stdout, everything else on stderr.
    pub fn object(&self, value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", value),
        }
    }

    pub fn usage(&self, usage: &Usage) {
        eprintln!(
            "{} {} prompt + {} completion = {} tokens",
            "[USAGE]".magenta(),
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total()
        );
    }

    pub fn show_config(&self, settings: &Settings) {
        println!("\n{}", "CONFIGURATION".bold().underline());
        println!("{}", "─".repeat(50));

        println!("  {} {}", "Endpoint:".yellow(), settings.endpoint.cyan());
        println!("  {} {}", "Model:".yellow(), settings.model.cyan());

        let key = match settings.get_api_key() {
            Some(key) => redact(&key).green(),
            None => "not set".red(),
        };
        println!("  {} {}", "API key:".yellow(), key);
        if let Some(env_var) = &settings.api_key_env {
            println!("  {} {}", "Key env var:".yellow(), env_var.dimmed());
        }

        println!("\n  {}", "Generation:".yellow());
        println!("    Temperature: {}", settings.temperature);
        println!("    Max tokens: {}", settings.max_tokens);
        println!(
            "    JSON mode: {}",
            if settings.json_mode {
                "yes".green()
            } else {
                "no".red()
            }
        );

        println!("\n  {}", "Resilience:".yellow());
        println!("    Timeout per attempt: {}ms", settings.timeout_ms);
        println!("    Max retries: {}", settings.max_retries);
        println!(
            "    Backoff: {}ms doubling, capped at {}ms",
            settings.backoff.base_delay_ms, settings.backoff.max_delay_ms
        );
        println!(
            "    Missing-comma repair: {}",
            if settings.extract.repair_missing_commas {
                "on".green()
            } else {
                "off".red()
            }
        );
        println!();
    }
}
