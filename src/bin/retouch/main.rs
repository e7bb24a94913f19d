//! Command-line image editing session.
//!
//! Loads a source image, applies instructions one after another through the
//! remote image model, and optionally exports selected history entries.
//!
//! Usage:
//!   retouch --input photo.png --instruction "make it blue" --select-all [OPTIONS]

mod import;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use retouch::gateway::config::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use retouch::{EditSession, GatewayConfig, GeminiGateway, TransferToken};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "retouch",
    about = "Edit an image with natural-language instructions",
    version
)]
struct Args {
    /// Source image (png, jpeg or webp)
    #[arg(short, long)]
    input: PathBuf,

    /// Extra images to import into the history
    #[arg(long = "import")]
    imports: Vec<PathBuf>,

    /// Edit instruction; repeat to chain edits
    #[arg(short = 'p', long = "instruction")]
    instructions: Vec<String>,

    /// Inspiration image sent alongside the source
    #[arg(long, conflicts_with = "inspiration_from")]
    inspiration: Option<PathBuf>,

    /// Use a history entry (by index, after imports) as inspiration
    #[arg(long)]
    inspiration_from: Option<String>,

    /// History indices to export (0-based)
    #[arg(short, long = "select")]
    selections: Vec<usize>,

    /// Export every history entry
    #[arg(long, conflicts_with = "selections")]
    select_all: bool,

    /// Directory for the exported archive
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// API key for the image model (defaults to $API_KEY, then $GEMINI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Image model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Model API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Stop at the first failed edit
    #[arg(long)]
    abort_on_error: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "retouch=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // 1. Source image
    let mut session = EditSession::new();
    let source = import::read_required_image(&args.input).await?;
    session.start_with_upload(source);

    // 2. Bulk import
    if !args.imports.is_empty() {
        let images = import::read_images(&args.imports).await?;
        let skipped = args.imports.len() - images.len();
        let added = session.import_uploads(images);
        println!("Imported {} images ({} skipped)", added, skipped);
    }

    // 3. Inspiration
    if let Some(ref path) = args.inspiration {
        let image = import::read_required_image(path).await?;
        session.set_inspiration(image);
    } else if let Some(ref raw) = args.inspiration_from {
        let token: TransferToken = raw.parse()?;
        session
            .set_inspiration_from_transfer(token)
            .context("Invalid --inspiration-from index")?;
    }

    // 4. Edits
    if !args.instructions.is_empty() {
        let config = GatewayConfig::from_env()
            .with_api_key_override(args.api_key.as_deref())
            .with_model(&args.model)
            .with_base_url(&args.base_url)
            .with_timeout_secs(args.timeout_secs);
        let gateway = GeminiGateway::new(config)?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        spinner.enable_steady_tick(Duration::from_millis(120));

        let mut failed = 0;
        for instruction in &args.instructions {
            spinner.set_message(instruction.clone());
            session.set_instruction(instruction);

            match session.generate(&gateway).await {
                Some(index) => {
                    spinner.println(format!("OK: [{}] {}", index, instruction));
                }
                None => {
                    failed += 1;
                    let message = session.error().unwrap_or("Nothing to edit").to_string();
                    spinner.println(format!("FAIL: {} - {}", instruction, message));
                    if args.abort_on_error {
                        spinner.finish_and_clear();
                        anyhow::bail!("Editing aborted: {}", message);
                    }
                }
            }
        }
        spinner.finish_and_clear();

        if failed > 0 {
            eprintln!("{} of {} edits failed", failed, args.instructions.len());
        }
    }

    // 5. Export
    let indices: Vec<usize> = if args.select_all {
        (0..session.len()).collect()
    } else {
        args.selections.clone()
    };
    for index in indices {
        if !session.is_selected(index) {
            session
                .toggle_selection(index)
                .with_context(|| format!("Invalid --select index {}", index))?;
        }
    }

    if let Some(archive) = session.export_selected() {
        std::fs::create_dir_all(&args.output_dir)?;
        let path = args.output_dir.join(&archive.file_name);
        std::fs::write(&path, &archive.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "Exported {} entries -> {} ({} bytes)",
            archive.item_count,
            path.display(),
            archive.bytes.len()
        );
    } else if let Some(message) = session.error() {
        anyhow::bail!("{}", message);
    }

    // Summary
    println!();
    println!("History:");
    for (i, entry) in session.history().iter().enumerate() {
        let marker = if session.cursor() == Some(i) { "*" } else { " " };
        match entry.instruction.as_deref() {
            Some(instruction) => println!(" {}{:>3}  {}", marker, i, instruction),
            None => println!(" {}{:>3}  (upload) {}", marker, i, entry.image.name),
        }
    }

    Ok(())
}
