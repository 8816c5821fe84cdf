use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tsqlbricks_core::config::CONFIG_FILE_NAME;
use tsqlbricks_core::{BatchReport, Config, FileStatus};
use tsqlbricks_engine::{convert_directory, convert_or_diagnose, BatchOptions, Converter, LowercasePlan};

/// tsqlbricks - convert T-SQL dbt models to Databricks SQL
#[derive(Parser)]
#[command(name = "tsqlbricks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: tsqlbricks.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single file
    Convert {
        /// T-SQL input file
        input: PathBuf,

        /// Where the converted file (or its diagnostic) is written
        output: PathBuf,
    },

    /// Convert every SQL file under a directory, mirroring its layout
    ConvertDir {
        /// Input directory
        input_dir: PathBuf,

        /// Output directory (deleted and recreated)
        output_dir: PathBuf,

        /// Number of files converted concurrently (default: available cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Also write a JSON report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Lowercase the content and names of converted files
    Lowercase {
        /// Directory to process
        #[arg(default_value = "output")]
        dir: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    tracing::debug!(?config, "configuration loaded");
    let invocation = std::env::args().collect::<Vec<_>>().join(" ");
    let converter = Converter::new(invocation).with_header(config.header);

    match cli.command {
        Commands::Convert { input, output } => convert_command(&converter, &input, &output),
        Commands::ConvertDir {
            input_dir,
            output_dir,
            jobs,
            report,
        } => {
            convert_dir_command(
                converter,
                &config,
                &input_dir,
                &output_dir,
                jobs,
                report.as_deref(),
                cli.verbose,
            )
            .await
        }
        Commands::Lowercase { dir, yes } => lowercase_command(&config, &dir, yes),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = Path::new(CONFIG_FILE_NAME);
    if default_path.exists() {
        return Config::from_file(default_path)
            .with_context(|| format!("Failed to load config {}", default_path.display()));
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Convert one file. A failed conversion still exits successfully: the
/// diagnostic at the output path is the result.
fn convert_command(converter: &Converter, input: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    println!("Processing: {}", input.display());
    let outcome = convert_or_diagnose(converter, input, output);
    print_outcome(&outcome.input, &outcome.status);

    Ok(())
}

async fn convert_dir_command(
    converter: Converter,
    config: &Config,
    input_dir: &Path,
    output_dir: &Path,
    jobs: Option<usize>,
    report_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let mut options = BatchOptions::from_config(config);
    if let Some(jobs) = jobs {
        options = options.with_jobs(jobs);
    }

    if verbose {
        eprintln!(
            "{} {} -> {} ({} workers)",
            "Converting".cyan(),
            input_dir.display(),
            output_dir.display(),
            options.jobs
        );
    }

    let report = convert_directory(Arc::new(converter), input_dir, output_dir, &options)
        .await
        .context("Batch conversion did not start")?;

    for outcome in &report.files {
        print_outcome(&outcome.input, &outcome.status);
    }

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    print_batch_summary(&report);
    Ok(())
}

fn print_outcome(input: &Path, status: &FileStatus) {
    match status {
        FileStatus::Converted => println!("{} {}", "✓ Converted".green(), input.display()),
        FileStatus::Failed { message } => {
            println!("{} {}", "✗ Failed".red().bold(), input.display());
            println!("    {}", message);
        }
        FileStatus::Unwritable { message } => {
            println!("{} {}", "✗ Unwritable".red().bold(), input.display());
            println!("    {}", message);
        }
    }
}

fn print_batch_summary(report: &BatchReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Conversion Summary".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("  Files:     {}", report.summary.total);
    println!("  Converted: {}", report.summary.converted.to_string().green());

    if report.summary.failed > 0 {
        println!("  Failed:    {}", report.summary.failed.to_string().red().bold());
    } else {
        println!("  Failed:    {}", report.summary.failed.to_string().green());
    }

    if report.summary.unwritable > 0 {
        println!("  Unwritable: {}", report.summary.unwritable.to_string().red().bold());
    }
    println!();

    if report.has_failures() {
        println!("{}", "Failed files contain a diagnostic in place of converted SQL:".yellow());
        for outcome in report.failures() {
            println!("  {}", outcome.output.display());
        }
    } else {
        println!("{}", "✓ All files converted".green().bold());
    }
}

fn lowercase_command(config: &Config, dir: &Path, yes: bool) -> Result<()> {
    let plan = match LowercasePlan::scan(dir, &config.extension) {
        Ok(plan) => plan,
        Err(err) => {
            println!("\n{} {}", "Error:".red().bold(), err);
            return Ok(());
        }
    };

    if plan.is_empty() {
        println!("\nNo SQL files found in '{}'", dir.display());
        return Ok(());
    }

    println!("\n{}", "Files that will be converted to lowercase:".bold());
    println!("{}", "=".repeat(42));
    for (directory, files) in plan.by_directory() {
        println!("\n{}", directory.display().to_string().cyan());
        for file in files {
            println!("  └─ {}", file);
        }
    }
    println!("\nTotal SQL files found: {}", plan.files.len());

    if !yes && !confirm("\nProceed with conversion? (y/n): ")? {
        println!("Operation cancelled.");
        return Ok(());
    }

    println!("\nProcessing files...");
    for outcome in plan.apply() {
        match &outcome.result {
            Ok(()) if outcome.renamed() => println!(
                "{} {} → {}",
                "✓ Renamed and converted:".green(),
                outcome.from.display(),
                outcome.to.display()
            ),
            Ok(()) => println!("{} {}", "✓ Converted content:".green(), outcome.from.display()),
            Err(err) => println!("{} {}: {}", "✗ Error processing".red(), outcome.from.display(), err),
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
