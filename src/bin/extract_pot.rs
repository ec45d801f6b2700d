//! Build a gettext template from the PHP sources of a WordPress plugin.
//!
//! Usage: cargo run --bin extract-pot -- --search-dir ./my-plugin --output languages/my-plugin.pot

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use po_autotranslate::extract::{find_php_files, find_plugin_name, PotBuilder};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "extract-pot", version, about = "Extract translatable strings from PHP sources")]
struct Cli {
    /// Directory to scan
    #[arg(long, env = "SEARCH_DIR", default_value = "./")]
    search_dir: PathBuf,

    /// Template file to write
    #[arg(long, env = "OUTPUT_FILE", default_value = "translations.pot")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("po_autotranslate=info".parse()?)
                .add_directive("extract_pot=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let search_dir = cli.search_dir.canonicalize().with_context(|| {
        format!("Search directory not found: {}", cli.search_dir.display())
    })?;

    info!("Scanning directory: {}", search_dir.display());
    let files = find_php_files(&search_dir)?;
    if files.is_empty() {
        warn!("No PHP files found in {}", search_dir.display());
        return Ok(());
    }

    let plugin_name = find_plugin_name(&files);
    info!("Plugin name detected: {}", plugin_name);

    let progress_bar = ProgressBar::new(files.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("Parsing PHP [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("=>-"));

    let mut builder = PotBuilder::new(&search_dir);
    for file in &files {
        progress_bar.set_message(
            file.strip_prefix(&search_dir)
                .unwrap_or(file)
                .display()
                .to_string(),
        );
        builder.scan_file(file);
        progress_bar.inc(1);
    }
    progress_bar.finish_and_clear();

    let extraction = builder.finish(plugin_name);
    if extraction.entries.is_empty() {
        bail!("No translatable strings found under {}", search_dir.display());
    }

    let creation_date = chrono::Local::now().format("%Y-%m-%d %H:%M%z").to_string();
    extraction
        .write(&cli.output, &creation_date)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    info!("POT file generated: {}", cli.output.display());
    extraction.log_summary(&cli.output);
    Ok(())
}
