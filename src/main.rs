use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use lumi_reporter::report::{self, codec, ResultMapper};
use lumi_reporter::runner::{self, ReportingListener, RunController};
use lumi_reporter::utils::config::ReporterConfig;

#[derive(Parser)]
#[command(name = "lumi-reporter")]
#[command(author = "NL Team")]
#[command(version = "0.1.3")]
#[command(about = "Report test run results to Testomat.io", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a JUnit XML file (or a directory of them) as one test run
    Junit {
        /// Path to junit.xml or a reports directory
        path: PathBuf,

        /// Run title (defaults to TESTOMATIO_TITLE, then the suite package)
        #[arg(short, long)]
        title: Option<String>,

        /// Reporter endpoint (defaults to TESTOMATIO_URL, then app.testomat.io)
        #[arg(long)]
        url: Option<String>,

        /// Suffix appended to the suite name for the file field
        #[arg(short, long)]
        extension: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Number of parallel reporting workers
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Print the result payloads instead of sending them
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Junit {
            path,
            title,
            url,
            extension,
            timeout,
            jobs,
            dry_run,
        } => {
            let mut config = ReporterConfig::from_env();
            if let Some(title) = title {
                config = config.with_run_title(title);
            }
            if let Some(url) = url {
                config = config.with_base_url(url);
            }
            if let Some(extension) = extension {
                config = config.with_file_extension(extension);
            }
            if let Some(secs) = timeout {
                config = config.with_timeout(Duration::from_secs(secs));
            }

            println!(
                "{} Reporting JUnit results from: {}",
                "▶".green().bold(),
                path.display()
            );

            let batch = report::load_junit(&path)?;
            println!(
                "  Run: {}",
                config.resolve_run_title(&batch.name).cyan()
            );
            println!("  Tests: {}", batch.events.len());
            println!("  Endpoint: {}", config.base_url.cyan());
            if jobs > 1 {
                println!("  Workers: {}", jobs.to_string().yellow());
            }

            if dry_run {
                let mapper = ResultMapper::from_config(&config);
                for event in &batch.events {
                    println!("{}", codec::encode_result(&mapper.map(event))?);
                }
                return Ok(());
            }

            let controller = RunController::from_config(config)?;
            let mut listener = ReportingListener::new(controller);
            let outcome = runner::run_batch(&mut listener, &batch, jobs)?;

            let summary = listener.summary();
            println!(
                "\n{} Test run {}",
                "■".blue().bold(),
                listener.controller().uid().unwrap_or_default().cyan()
            );
            println!(
                "  {} reported, {} failed to report",
                summary.delivered.to_string().green(),
                summary.failed.to_string().red()
            );
            if outcome.finished {
                println!("  {}", "Finished".green());
            } else {
                println!("  {}", "Failed to finish test run".red());
            }
        }
    }

    Ok(())
}
