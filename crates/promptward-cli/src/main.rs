//! Promptward CLI - scan text for prompt-injection attempts

use std::io::Read;
use std::sync::Arc;

use clap::Parser;

use promptward_core::{ScanError, ScanOptions, Ward};
use promptward_scanner::{PromptInjectionScanner, ScannerConfig};

#[derive(Parser)]
#[command(name = "promptward")]
#[command(about = "Promptward - prompt-injection scanning for LLM endpoints")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Scan text (argument or stdin) and print the verdict as JSON
    Scan {
        /// Text to scan; read from stdin when omitted
        text: Option<String>,

        /// Detection threshold override
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Print the scanner configuration resolved from the environment
    CheckConfig,
    /// Show which engine the scanner would run with
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    match cli.command {
        Some(Commands::Scan { text, threshold }) => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };

            let scanner = PromptInjectionScanner::from_env();
            let ward = Ward::builder().scanner(Arc::new(scanner)).build();

            let mut options = ScanOptions::default();
            options.threshold = threshold;
            let report = ward.analyze(&text, &options);

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::CheckConfig) => {
            let config = ScannerConfig::from_env();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Some(Commands::Status) => {
            let scanner = PromptInjectionScanner::from_env();
            println!("engine: {}", scanner.engine_name());
        }
        None => {
            println!("Promptward v0.1.0 - Use --help for commands");
        }
    }

    Ok(())
}

/// Reads stdin as UTF-8; non-UTF-8 payloads are rejected at this boundary.
fn read_stdin() -> anyhow::Result<String> {
    let mut bytes = Vec::new();
    std::io::stdin().read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ScanError::InvalidInput(format!("stdin is not valid UTF-8: {e}")))?;
    Ok(text)
}
