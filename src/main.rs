//! CLI entry point for `emlgrab`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use emlgrab::config::{self, Config};
use emlgrab::extract::pipeline::{self, BatchReport, ExtractionRequest};

#[derive(Parser)]
#[command(name = "emlgrab", version, about = "Extract attachments from EML files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// EML files or directories to extract from
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract attachments from EML files or directories
    Extract {
        /// EML files or directories (scanned recursively for *.eml)
        inputs: Vec<PathBuf>,
        /// Output directory (default: extracted_attachments next to the first input)
        #[arg(short, long, env = "EMLGRAB_OUTPUT")]
        output: Option<PathBuf>,
        /// Write directly into the output directory, without per-subject subfolders
        #[arg(long)]
        flat: bool,
        /// Group written files into per-extension subfolders
        #[arg(long)]
        by_extension: bool,
        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List attachments of one EML file without writing anything
    List {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Extract {
            inputs,
            output,
            flat,
            by_extension,
            json,
        }) => cmd_extract(
            &inputs,
            output.as_deref(),
            !flat && config.extract.subject_subfolders,
            by_extension || config.extract.classify_by_extension,
            json,
            &config,
        ),
        None => cmd_extract(
            &cli.inputs,
            None,
            config.extract.subject_subfolders,
            config.extract.classify_by_extension,
            false,
            &config,
        ),
        Some(Commands::List { path, json }) => cmd_list(&path, json),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emlgrab.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Run a batch extraction and print the report.
fn cmd_extract(
    inputs: &[PathBuf],
    output: Option<&Path>,
    by_subject: bool,
    by_extension: bool,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files given. Try 'emlgrab --help'.");
    }
    for input in inputs {
        if !input.exists() {
            anyhow::bail!("File not found: {}", input.display());
        }
    }

    let files = pipeline::collect_inputs(inputs)?;
    if files.is_empty() {
        println!("  No .eml files found.");
        return Ok(());
    }

    let output_root = output
        .map(Path::to_path_buf)
        .or_else(|| config.extract.default_output_dir.clone())
        .unwrap_or_else(|| {
            pipeline::default_output_root(&files[0], &config.extract.output_folder_name)
        });

    if !json {
        println!(
            "  Extracting attachments from {} file(s) to {}",
            files.len(),
            output_root.display()
        );
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let requests: Vec<ExtractionRequest> = files
        .into_iter()
        .map(|source| ExtractionRequest {
            source,
            output_root: output_root.clone(),
            subject_subfolder: by_subject,
            classify_by_extension: by_extension,
        })
        .collect();

    let start = Instant::now();
    let report = pipeline::extract_batch(
        &requests,
        Some(&|current, _total| {
            pb.set_position(current as u64);
        }),
    );
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    if json {
        print_report_json(&requests, &report)?;
    } else {
        print_report_table(&requests, &report, elapsed);
    }

    Ok(())
}

/// Print per-file results and batch totals as a human-readable table.
fn print_report_table(
    requests: &[ExtractionRequest],
    report: &BatchReport,
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    for (request, result) in requests.iter().zip(&report.results) {
        match &result.error {
            None => println!(
                "  {} — {} attachment(s)",
                request.source.display(),
                result.written.len()
            ),
            Some(e) => println!("  {} — FAILED: {e}", request.source.display()),
        }
    }

    let s = &report.summary;
    println!();
    println!("  {:<20} {}", "Processed", s.processed);
    println!("  {:<20} {}", "Succeeded", s.succeeded);
    println!("  {:<20} {}", "Failed", s.failed);
    println!("  {:<20} {}", "Attachments", s.attachments);
    println!(
        "  {:<20} {}",
        "Bytes written",
        format_size(s.bytes_written, BINARY)
    );
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}

/// Print per-file results and batch totals as JSON.
fn print_report_json(requests: &[ExtractionRequest], report: &BatchReport) -> anyhow::Result<()> {
    let files: Vec<serde_json::Value> = requests
        .iter()
        .zip(&report.results)
        .map(|(request, result)| {
            serde_json::json!({
                "source": request.source.to_string_lossy(),
                "written": result
                    .written
                    .iter()
                    .map(|p| p.to_string_lossy())
                    .collect::<Vec<_>>(),
                "bytes_written": result.bytes_written,
                "error": result.error.as_ref().map(|e| e.to_string()),
            })
        })
        .collect();

    let output = serde_json::json!({
        "summary": report.summary,
        "files": files,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// List the attachments of one EML file.
fn cmd_list(path: &Path, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let attachments = pipeline::list_attachments(path)?;

    if json {
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "attachment_count": attachments.len(),
            "attachments": attachments,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if attachments.is_empty() {
        println!("  No attachments.");
        return Ok(());
    }

    use humansize::{format_size, BINARY};
    println!();
    println!("  {:<40} {:<25} {:>10}", "Filename", "Type", "Size");
    println!("  {}", "-".repeat(77));
    for att in &attachments {
        let name_trunc: String = att.filename.chars().take(39).collect();
        let type_trunc: String = att.content_type.chars().take(24).collect();
        println!(
            "  {:<40} {:<25} {:>10}",
            name_trunc,
            type_trunc,
            format_size(att.size, BINARY)
        );
    }
    println!();

    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emlgrab", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
