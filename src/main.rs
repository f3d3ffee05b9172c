use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use paper_extract::{parser, pdf, DocumentRecord, Extraction, Field, ProviderKind, Settings};

#[derive(Parser)]
#[command(name = "paper_extract", about = "Extract a fixed-schema record from PDF documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the record and write it as JSON
    Extract(ExtractArgs),
    /// Print the normalized document text
    Text {
        /// PDF file to read
        pdf: PathBuf,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// PDF file to read
    pdf: PathBuf,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Refine the baseline with a completion provider
    #[arg(long)]
    enhance: bool,
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long = "max-tokens")]
    max_tokens: Option<u32>,
    /// Provider timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Settings file (default: ./paper_extract.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ExtractArgs {
    fn apply(&self, settings: &mut Settings) {
        if self.enhance {
            settings.enhance = true;
        }
        if let Some(p) = self.provider {
            settings.provider = p;
        }
        if let Some(m) = &self.model {
            settings.model = Some(m.clone());
        }
        if let Some(t) = self.temperature {
            settings.temperature = t;
        }
        if let Some(n) = self.max_tokens {
            settings.max_output_tokens = n;
        }
        if let Some(s) = self.timeout {
            settings.timeout_secs = s;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => {
            let mut settings =
                Settings::load(args.config.as_deref()).context("failed to load settings")?;
            args.apply(&mut settings);
            info!(
                enhance = settings.enhance,
                provider = ?settings.provider,
                model = settings.model(),
                "settings loaded"
            );

            let raw = pdf::join_pages(&pdf::read_pages(&args.pdf)?);
            let pipeline = settings.pipeline();

            let spinner = if pipeline.enhancement_enabled() {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
                );
                pb.set_message(format!("waiting for {}", settings.model()));
                pb.enable_steady_tick(Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };
            let extraction = pipeline.run(&raw).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            let extraction = extraction?;

            print_summary(&extraction);
            write_record(&extraction.record, args.output.as_deref())?;
            if let Some(out) = &args.output {
                eprintln!("\nSaved to {}", out.display());
            }
        }
        Commands::Text { pdf: path } => {
            let raw = pdf::join_pages(&pdf::read_pages(&path)?);
            println!("{}", parser::normalize(&raw));
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn write_record(record: &DocumentRecord, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("failed to serialize record")?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("failed to write to stdout")?;
        }
    }
    Ok(())
}

fn print_summary(extraction: &Extraction) {
    let r = &extraction.record;
    eprintln!("Extraction results");
    eprintln!("==================");
    eprintln!("Enhancement: {}", extraction.enhancement.label());
    eprintln!("Title:        {}", truncate(&r.document, 100));
    eprintln!("Introduction: {}", truncate(&r.introduction, 200));
    eprintln!("Thoughts:     {}", truncate(&r.thoughts, 200));
    eprintln!("Answers:      {}", truncate(&r.answers, 200));

    let filled: Vec<&str> = Field::ALL
        .into_iter()
        .filter(|f| !f.is_required() && r.get(*f).is_some())
        .map(|f| f.key())
        .collect();
    if filled.is_empty() {
        eprintln!("Optional:     none found");
    } else {
        eprintln!("Optional:     {}", filled.join(", "));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

// ── Tests ──
