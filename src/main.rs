use clap::Parser;
use dumpdex::config::IngestConfig;
use dumpdex::error::{IngestError, SetupError};
use dumpdex::index::IndexReader;
use dumpdex::ingest::{IngestReport, run_ingest};
use dumpdex::output::Console;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dumpdex")]
#[command(about = "Bulk-load a Wikipedia XML dump into a full-text index")]
#[command(version)]
struct Cli {
    /// Wikipedia dump (.xml, .xml.bz2 or .xml.gz)
    corpus: PathBuf,

    /// Directory to write the index to (created if missing)
    output: PathBuf,

    /// Commit after this many documents [default: 1000000]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    commit_interval: Option<u64>,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a progress line every N documents
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    report_every: Option<u64>,

    /// Restart the dump from the beginning when it ends
    #[arg(long)]
    forever: bool,

    /// Index Image:/File: pages too
    #[arg(long)]
    keep_image_docs: bool,

    /// URL prefix for article links
    #[arg(long)]
    base_url: Option<String>,

    /// Only print diagnostics
    #[arg(short, long)]
    quiet: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Settings file merged with command-line overrides
    fn ingest_config(&self) -> Result<IngestConfig, IngestError> {
        let mut config = IngestConfig::load(self.config.as_deref())
            .map_err(|e| SetupError::Config(format!("{:#}", e)))?;

        if let Some(interval) = self.commit_interval {
            config.commit_interval = interval;
        }
        if let Some(n) = self.report_every {
            config.report_every = n;
        }
        if self.forever {
            config.forever = true;
        }
        if self.keep_image_docs {
            config.keep_image_only_docs = true;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize logging: {}", e);
    }

    let console = Console::new(cli.quiet);

    let result = cli
        .ingest_config()
        .and_then(|config| run_ingest(&config, &cli.corpus, &cli.output, console));

    match result {
        Ok(report) => {
            print_report(&console, &report, &cli.output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            console.diagnostic(&err.to_string());
            ExitCode::from(err.exit_code())
        }
    }
}

fn print_report(console: &Console, report: &IngestReport, output: &Path) {
    if console.is_quiet() {
        return;
    }

    console.info(&format!(
        "Total data processed: {} bytes ({} bytes read from dump)",
        report.bytes_processed, report.source_bytes_read
    ));

    match IndexReader::open(output) {
        Ok(reader) => console.summary(&format!(
            "Index should be located at {} ({} documents committed)",
            output.display(),
            reader.num_docs()
        )),
        Err(e) => {
            tracing::warn!("could not reopen index for verification: {:#}", e);
            console.summary(&format!(
                "Index should be located at {}",
                output.display()
            ));
        }
    }
}
