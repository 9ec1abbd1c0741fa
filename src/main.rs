//! Sepal CLI - inference support utilities

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use sepal::error::{FixSuggestion, SupportError};
use sepal::monitor::detect_gpus;
use sepal::prompt::sanitize_prompt;
use sepal::tokens::{count_tokens, Vendor};

#[derive(Parser)]
#[command(name = "sepal")]
#[command(about = "Inference support utilities for specimen-label extraction pipelines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report installed GPUs and the host's VRAM capability class
    Gpus {
        /// Emit the inventory as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count prompt tokens with the target model's tokenizer
    Count {
        /// File to count; reads stdin when omitted
        file: Option<PathBuf>,

        /// Model vendor (openai, google, mistral, ...)
        #[arg(short, long, default_value = "openai")]
        vendor: String,

        /// Model name the prompt will be sent to
        #[arg(short, long, default_value = "gpt-4")]
        model: String,
    },

    /// Strip invalid UTF-8 byte sequences from a file, writing to stdout
    Sanitize {
        /// File to sanitize
        file: PathBuf,
    },
}

fn main() {
    // Initialize tracing; logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Gpus { json } => report_gpus(json),
        Commands::Count { file, vendor, model } => count_file(file, &vendor, &model),
        Commands::Sanitize { file } => sanitize_file(&file),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn report_gpus(json: bool) -> Result<(), SupportError> {
    let inventory = detect_gpus();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&inventory).expect("inventory serializes")
        );
        return Ok(());
    }

    println!("{} {}", "Number of GPUs:".cyan().bold(), inventory.count());
    for (i, device) in inventory.devices.iter().enumerate() {
        println!("  GPU_{}: {} ({:.1} GB)", i, device.name, device.vram_gb);
    }
    println!(
        "{} {:.2} GB",
        "Total VRAM:".cyan().bold(),
        inventory.total_vram_gb
    );
    println!(
        "{} {}",
        "Capability class:".cyan().bold(),
        inventory.capability.to_string().green()
    );

    Ok(())
}

fn count_file(file: Option<PathBuf>, vendor: &str, model: &str) -> Result<(), SupportError> {
    let bytes = match file {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    // Count what would actually be sent: sanitized text
    let text = sanitize_prompt(&bytes);
    let vendor = Vendor::parse(vendor);
    let count = count_tokens(&text, vendor, model);

    println!(
        "{} tokens ({} / {})",
        count.to_string().bold(),
        vendor,
        model
    );
    Ok(())
}

fn sanitize_file(file: &PathBuf) -> Result<(), SupportError> {
    let bytes = std::fs::read(file)?;
    print!("{}", sanitize_prompt(&bytes));
    Ok(())
}
