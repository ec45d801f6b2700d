use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use po_autotranslate::{
    batch::BatchCoordinator,
    cancel::Cancellation,
    catalog::{CatalogWriter, Template},
    config::{Config, Overrides},
    engine::{EchoPolicy, ResolutionEngine},
    events::{EventSink, Phase, ProgressEvent},
    report,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// Machine-translate a gettext template into per-locale .po/.mo catalogs.
///
/// Every flag overrides the matching environment variable.
#[derive(Debug, Parser)]
#[command(name = "po-autotranslate", version, about)]
struct Cli {
    /// Template to translate (POT_FILE)
    #[arg(long)]
    pot: Option<PathBuf>,

    /// Directory for the generated catalogs (OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Comma-separated fallback chain, e.g. google,mymemory,libre (PROVIDERS)
    #[arg(long)]
    providers: Option<String>,

    /// Attempts per provider (MAX_RETRIES)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Comma-separated language codes; all known languages when omitted (TARGET_LANGUAGES)
    #[arg(long)]
    languages: Option<String>,

    /// Concurrent resolutions (CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop the run after this many seconds; 0 disables (RUN_TIMEOUT_SECS)
    #[arg(long)]
    run_timeout: Option<u64>,

    /// accept or reject translations identical to the source (ECHO_POLICY)
    #[arg(long)]
    echo_policy: Option<String>,

    /// Print the known languages and exit
    #[arg(long)]
    list_languages: bool,
}

impl Cli {
    fn overrides(&self) -> Result<Overrides> {
        Ok(Overrides {
            pot_file: self.pot.clone(),
            output_dir: self.output_dir.clone(),
            providers: self.providers.clone(),
            max_retries: self.max_retries,
            languages: self.languages.clone(),
            concurrency: self.concurrency,
            run_timeout_secs: self.run_timeout,
            echo_policy: self
                .echo_policy
                .as_deref()
                .map(str::parse::<EchoPolicy>)
                .transpose()?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("po_autotranslate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?.apply_overrides(cli.overrides()?)?;
    let registry = config.registry()?;

    if cli.list_languages {
        for locale in registry.list_all() {
            println!("{:8} {:8} {}", locale.code(), locale.catalog_tag(), locale.display_name());
        }
        return Ok(());
    }

    let pot_file = config.pot_file()?;
    let template = Template::read(pot_file)
        .with_context(|| format!("Failed to load template {}", pot_file.display()))?;
    let locales = config.selected_locales(&registry)?;

    info!(
        "Loaded {} entries from {}",
        template.entries.len(),
        pot_file.display()
    );
    if template.entries.is_empty() {
        warn!("Template has no entries, nothing to translate");
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("po-autotranslate/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let (events, rx) = EventSink::channel();
    let engine = Arc::new(
        ResolutionEngine::new(config.build_chain(client), config.resolution_settings())
            .with_events(events.clone()),
    );
    let coordinator = BatchCoordinator::new(engine, config.batch_settings()).with_events(events);

    let total = (template.entries.len() * locales.len()) as u64;
    let renderer = tokio::spawn(render_progress(rx, total));

    // Ctrl-C stops the run; completed results are still written
    let cancellation = Cancellation::new();
    let token = cancellation.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight requests");
            cancellation.cancel();
        }
    });

    let report = coordinator.run(&template.entries, &locales, token).await;

    // Dropping the last senders ends the renderer
    drop(coordinator);
    let _ = renderer.await;

    let writer = CatalogWriter::new(&config.output_dir);
    let written = writer
        .write_all(&template, &report.catalogs)
        .context("Failed to write catalogs")?;
    info!(
        "Wrote {} catalogs to {}",
        written.len(),
        config.output_dir.display()
    );

    println!("\n{}", report::render(&report));

    if report.cancelled {
        warn!("Run was interrupted before every entry was translated");
    }
    Ok(())
}

/// Drive a progress bar from the event stream until every sender is gone.
async fn render_progress(mut rx: UnboundedReceiver<ProgressEvent>, total: u64) {
    let progress_bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("=>-"));
    progress_bar.enable_steady_tick(Duration::from_millis(120));

    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::PairCompleted(progress) => {
                progress_bar.set_position(progress.completed as u64);
                progress_bar.set_message(format!(
                    "{} ok, {} failed",
                    progress.succeeded_total, progress.failed_total
                ));
            }
            ProgressEvent::Resolution(attempt) if attempt.phase == Phase::Attempt && attempt.attempt > 1 => {
                if let Some(provider) = attempt.provider {
                    progress_bar.set_message(format!(
                        "retrying {} for {} (attempt {})",
                        provider, attempt.locale, attempt.attempt
                    ));
                }
            }
            _ => {}
        }
    }

    progress_bar.finish_and_clear();
}
