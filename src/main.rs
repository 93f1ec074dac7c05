mod cli;
mod ui;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldsmith::extract::{validate, ExtractOptions, Extractor};
use worldsmith::llm::{Attempt, HttpTransport, InvocationEngine, Message};
use worldsmith::{PipelineError, Settings, StructuredCall};

use crate::cli::{Cli, Commands};
use crate::ui::Console;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // before any settings load, so `api_key_env` can name a key from .env
    dotenvy::dotenv().ok();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(Path::new(path))?,
        None => Settings::load()?,
    };
    let console = Console::new();

    match cli.command {
        Commands::Generate {
            prompt,
            system,
            require,
            timeout_ms,
            max_retries,
        } => {
            let mut settings = settings;
            if let Some(timeout_ms) = timeout_ms {
                settings.timeout_ms = timeout_ms;
            }
            if let Some(max_retries) = max_retries {
                settings.max_retries = max_retries;
            }
            generate(&console, &settings, system, prompt, require).await?;
        }
        Commands::Extract {
            file,
            require,
            no_comma_repair,
        } => {
            let mut options = settings.extract;
            if no_comma_repair {
                options.repair_missing_commas = false;
            }
            extract_file(&console, &file, &require, options)?;
        }
        Commands::Config => {
            console.show_config(&settings);
        }
    }

    Ok(())
}

async fn generate(
    console: &Console,
    settings: &Settings,
    system: Option<String>,
    prompt: String,
    require: Vec<String>,
) -> Result<()> {
    let mut messages = Vec::new();
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let request = settings.invocation_request(messages);
    let engine = InvocationEngine::new(Arc::new(HttpTransport::new()))
        .with_backoff(settings.backoff.schedule());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    console.info(&format!("Invoking {} at {}", settings.model, settings.endpoint));
    let observer = |attempt: &Attempt| console.attempt(attempt);

    let mut call = StructuredCall::new(&engine)
        .extractor(Extractor::with_options(settings.extract))
        .require(require);

    match call.run_with(&request, &cancel, Some(&observer)).await {
        Ok(output) => {
            console.success("Response validated");
            console.usage(&output.usage);
            console.object(&output.value);
            Ok(())
        }
        Err(e) => {
            report(console, &e);
            Err(e).context("Generation failed")
        }
    }
}

fn extract_file(
    console: &Console,
    file: &str,
    require: &[String],
    options: ExtractOptions,
) -> Result<()> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?
    };

    let value = Extractor::with_options(options)
        .extract(&raw)
        .map_err(PipelineError::from)
        .and_then(|value| {
            validate(&value, require)?;
            Ok(value)
        });

    match value {
        Ok(value) => {
            console.success("Extracted and validated");
            console.object(&value);
            Ok(())
        }
        Err(e) => {
            report(console, &e);
            Err(e).context("Extraction failed")
        }
    }
}

fn report(console: &Console, error: &PipelineError) {
    console.error(error.user_message());
    tracing::debug!(stage = ?error.stage(), error = %error, "Pipeline failed");
    if let PipelineError::Validation(e) = error {
        if let Some(field) = e.field() {
            console.warn(&format!("Missing field: {}", field));
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "worldsmith=debug"
    } else {
        "worldsmith=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
