//! CLI binary for edgequake-mdrelink.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_mdrelink::{
    convert_and_save_as, convert_files, preview, read_document, BatchReport, Change,
    ConversionConfig, ConversionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Relinking");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        self.bar.set_message(path.display().to_string());
    }

    fn on_file_complete(&self, _index: usize, _total: usize, path: &Path, changes: usize) {
        self.bar.println(format!(
            "  {} {:<48}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{changes:>4} paths")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, _index: usize, _total: usize, path: &Path, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:<48}  {}",
            red("✗"),
            path.display(),
            red(first_line)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_files.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} files relinked",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files relinked  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&self.errors.load(Ordering::SeqCst).to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show what would change, write nothing
  mdrelink --dry-run post.md

  # Rewrite in place under upload/
  mdrelink post.md

  # Move to a CDN prefix and switch every image to .webp
  mdrelink --prefix https://cdn.example.com/img --ext webp post.md

  # Save as a new file, leaving the original untouched
  mdrelink post.md -o dist/post.md

  # Convert many files in place
  mdrelink docs/*.md

  # Machine-readable change list
  mdrelink --dry-run --json post.md > changes.json

WHAT GETS REWRITTEN:
  ![alt](path "title")       Markdown images
  <img src="path">           HTML images (disable with --no-html)

  Left untouched: http(s)://, data:, //host/... and #anchor paths, paths
  already under the target prefix, plain links, and anything inside fenced
  or inline code.

ENVIRONMENT VARIABLES:
  MDRELINK_PREFIX         Default for --prefix
  MDRELINK_EXT            Default for --ext
  RUST_LOG                Override log filter (e.g. RUST_LOG=debug)
"#;

/// Rewrite local image paths in Markdown files.
#[derive(Parser, Debug)]
#[command(
    name = "mdrelink",
    version,
    about = "Rewrite local image paths in Markdown files to a new prefix and extension",
    long_about = "Point every locally referenced image of a Markdown document at a new \
location (prefix and, optionally, extension). URLs, code blocks and everything else are \
copied through unchanged.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Prefix rewritten images are placed under.
    #[arg(short, long, env = "MDRELINK_PREFIX", default_value = "upload")]
    prefix: String,

    /// New image extension (e.g. webp). Empty keeps the original.
    #[arg(short, long, env = "MDRELINK_EXT", default_value = "")]
    ext: String,

    /// Write the result to this file instead of overwriting the input.
    #[arg(short, long, env = "MDRELINK_OUTPUT", conflicts_with_all = ["stdout", "dry_run"])]
    output: Option<PathBuf>,

    /// Print the rewritten Markdown to stdout instead of saving.
    #[arg(long, conflicts_with = "dry_run")]
    stdout: bool,

    /// List the changes without writing anything.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Ignore inline HTML <img> tags.
    #[arg(long, env = "MDRELINK_NO_HTML")]
    no_html: bool,

    /// Output JSON (change lists or batch report).
    #[arg(long, env = "MDRELINK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MDRELINK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MDRELINK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MDRELINK_QUIET")]
    quiet: bool,
}

/// One file's change list, as printed by `--dry-run --json`.
#[derive(Serialize)]
struct PreviewReport<'a> {
    path: &'a Path,
    changes: Vec<Change>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters during an
    // in-place batch, so library INFO logs are muted while it is active.
    let in_place = cli.output.is_none() && !cli.stdout && !cli.dry_run;
    let show_progress = in_place && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if (cli.output.is_some() || cli.stdout) && cli.inputs.len() > 1 {
        anyhow::bail!("--output and --stdout take exactly one input file");
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    if cli.dry_run {
        return run_dry_run(&cli, &config);
    }

    if cli.stdout {
        let input = &cli.inputs[0];
        let content = read_document(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let result = preview(&content, &config);
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.new_content.as_bytes())
            .context("Failed to write to stdout")?;
        if !cli.quiet {
            eprintln!("{} paths rewritten", result.changes.len());
        }
        return Ok(());
    }

    if let Some(ref output_path) = cli.output {
        let input = &cli.inputs[0];
        let changes = convert_and_save_as(input, output_path, &config).context("Conversion failed")?;
        if cli.json {
            println!("{}", serde_json::json!({ "path": output_path, "changes": changes }));
        } else if !cli.quiet {
            eprintln!(
                "{}  {} paths  {}  →  {}",
                green("✔"),
                changes,
                input.display(),
                bold(&output_path.display().to_string()),
            );
        }
        return Ok(());
    }

    let report = convert_files(&cli.inputs, &config);
    print_batch(&cli, &report, show_progress)?;

    if report.stats.failed_files > 0 {
        anyhow::bail!(
            "{} of {} files failed",
            report.stats.failed_files,
            report.stats.total_files
        );
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .target_prefix(cli.prefix.as_str())
        .target_extension(cli.ext.as_str())
        .html_images(!cli.no_html);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print each file's change list; never writes.
fn run_dry_run(cli: &Cli, config: &ConversionConfig) -> Result<()> {
    let mut reports = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let content = read_document(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let result = preview(&content, config);
        reports.push(PreviewReport {
            path: input,
            changes: result.changes,
        });
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialise changes")?
        );
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for report in &reports {
        writeln!(
            out,
            "{}  {}",
            bold(&report.path.display().to_string()),
            dim(&format!("{} changes", report.changes.len()))
        )?;
        if report.changes.is_empty() {
            writeln!(out, "   {}", dim("no image paths to convert"))?;
        }
        for (i, change) in report.changes.iter().enumerate() {
            writeln!(
                out,
                "  {:>3}. {} {} {} {}",
                i + 1,
                dim(&format!("L{}", change.line)),
                red(&change.old_path),
                cyan("→"),
                green(&change.new_path),
            )?;
        }
    }
    Ok(())
}

fn print_batch(cli: &Cli, report: &BatchReport, show_progress: bool) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }
    // With the bar active the callback already printed per-file lines.
    if !show_progress {
        for file in &report.files {
            match &file.error {
                None => eprintln!("{}  {}  {} paths", green("✓"), file.path.display(), file.changes),
                Some(e) => eprintln!("{}  {}", red("✗"), e),
            }
        }
    }
    eprintln!(
        "   {} paths rewritten  —  {}ms total",
        dim(&report.stats.total_changes.to_string()),
        report.stats.duration_ms,
    );
    Ok(())
}
