//! Command-line surface: argument parsing, the interactive notes prompt, and the
//! end-of-run summary.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use crate::errors::AppError;
use crate::generation::pipeline::{self, RunReport};
use crate::generation::tone::Tone;
use crate::inbox;
use crate::shapes::Shape;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "certpost")]
#[command(about = "Turn certificates in inbox/ into LinkedIn posts filed under done/")]
#[command(version)]
pub struct Cli {
    /// Process a single certificate: a file name inside inbox/
    pub file: Option<String>,

    /// Post tone: casual, formal or default
    #[arg(long, default_value = "default")]
    pub tone: String,

    /// Directory holding inbox/, done/, context.json and last_shape.txt
    #[arg(long, env = "CERTPOST_DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Never ask for quick context when a certificate has no notes file
    #[arg(long)]
    pub no_prompt: bool,
}

impl Cli {
    /// Unknown tones fall back to the default with a warning.
    pub fn tone(&self) -> Tone {
        let (tone, recognized) = Tone::parse_lenient(&self.tone);
        if !recognized {
            warn!("Unknown tone '{}', using '{tone}'", self.tone);
        }
        tone
    }

    /// Prompting needs a person on the other end of stdin.
    pub fn should_prompt(&self) -> bool {
        !self.no_prompt && io::stdin().is_terminal()
    }
}

/// Resolves the single-file argument to `inbox/<name>`.
///
/// Only the file name is used, so `inbox/bls.pdf` and `bls.pdf` both work, and a
/// same-named file elsewhere is never picked up and moved.
pub fn resolve_single(file: &str, inbox_dir: &Path) -> Result<PathBuf, AppError> {
    let name = Path::new(file)
        .file_name()
        .ok_or_else(|| AppError::Validation(format!("'{file}' is not a file name")))?;
    let in_inbox = inbox_dir.join(name);
    if in_inbox.is_file() {
        return Ok(in_inbox);
    }
    Err(AppError::NotFound(format!(
        "Certificate '{}' in {}",
        name.to_string_lossy(),
        inbox_dir.display()
    )))
}

/// Certificates to process: the single named one, or everything in the inbox.
///
/// Needs no credentials, so an empty inbox can be reported before the API key is checked.
pub fn discover(file: Option<&str>, inbox_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    match file {
        Some(file) => Ok(vec![resolve_single(file, inbox_dir)?]),
        None => inbox::find_all_certs(inbox_dir)
            .with_context(|| format!("Failed to list {}", inbox_dir.display())),
    }
}

/// Runs the pipeline over `certs`, prompting for quick context when enabled.
pub async fn run(state: &AppState, certs: &[PathBuf], tone: Tone, prompt: bool) -> RunReport {
    pipeline::run_batch(state, certs, tone, |cert: &Path| {
        let name = cert
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        async move {
            if !prompt {
                return None;
            }
            tokio::task::spawn_blocking(move || ask_quick_context(&name))
                .await
                .ok()
                .flatten()
        }
    })
    .await
}

fn ask_quick_context(name: &str) -> Option<String> {
    print!("\n{name} has no notes. Quick context (Enter to skip): ");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line.trim().to_string()).filter(|l| !l.is_empty())
}

pub fn print_empty_inbox(inbox_dir: &Path) {
    println!("No certificates found in {}", inbox_dir.display());
    println!(
        "Drop files there ({}, {}) and run again.",
        inbox::SUPPORTED_DOCS.join(", "),
        inbox::SUPPORTED_IMAGES.join(", ")
    );
    println!("Optional: add <name>.notes.txt beside a certificate with what you did there.");
}

/// Prints each post, then the summary. `next_shape` is what the next run would pick.
pub fn print_report(report: &RunReport, next_shape: Shape) {
    for outcome in &report.succeeded {
        println!("\n{}", "═".repeat(60));
        println!(
            "{}  →  {}",
            outcome.file,
            outcome.dest_dir.display()
        );
        println!(
            "shape: {}  |  {} chars  |  confidence: {}",
            outcome.shape.display_name(),
            outcome.char_count(),
            outcome.post.metadata.confidence
        );
        println!("{}", "─".repeat(60));
        println!("{}", outcome.post.text);
    }

    println!("\n{}", "═".repeat(60));
    println!(
        "Done: {} posted, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    let low: Vec<_> = report.low_confidence().collect();
    if !low.is_empty() {
        println!("\nReview before posting (low confidence):");
        for outcome in low {
            let reason = match outcome.post.metadata.flag_reason.as_str() {
                "" => "no reason given",
                r => r,
            };
            println!("  - {}: {reason}", outcome.post_path.display());
        }
    }

    if !report.failed.is_empty() {
        println!("\nFailed (left in inbox):");
        for failure in &report.failed {
            println!("  - {} [{}] {}", failure.file, failure.error.code(), failure.error);
        }
    }

    if let Some(last) = report.succeeded.last() {
        println!("\nLast shape used: {}", last.shape.display_name());
    }
    println!("Next post will use: {}", next_shape.display_name());
}
