use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "worldsmith")]
#[command(author = "Worldsmith Team")]
#[command(version)]
#[command(about = "Generate structured worlds from a language model, resiliently.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read configuration from this file instead of the user config dir
    #[arg(short, long, global = true, env = "WORLDSMITH_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prompt the model and print the validated JSON object
    Generate {
        /// The user prompt
        #[arg(required = true)]
        prompt: String,

        /// System prompt sent before the user prompt
        #[arg(short, long)]
        system: Option<String>,

        /// Field that must be present and non-empty (repeatable, checked in order)
        #[arg(short, long = "require")]
        require: Vec<String>,

        /// Per-attempt timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Retries after the first attempt
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Run extraction and validation on saved model output ("-" for stdin)
    Extract {
        /// File containing raw model output
        #[arg(required = true)]
        file: String,

        /// Field that must be present and non-empty (repeatable, checked in order)
        #[arg(short, long = "require")]
        require: Vec<String>,

        /// Disable the missing-comma heuristic
        #[arg(long)]
        no_comma_repair: bool,
    },

    /// Show current configuration
    Config,
}
