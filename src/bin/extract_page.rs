use anyhow::{Context, Result};
use clap::Parser;
use kbscraper::{
    browser::{within_frame, Browser, Locator, SnapshotBrowser, SnapshotPage},
    extract::extract,
};
use std::{fs, path::PathBuf, time::Duration};
use tracing_subscriber::{fmt, EnvFilter};

/// Runs the field extractor over a saved copy of an article's content frame
/// and prints the fields as JSON.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Saved HTML of the article's content frame
    frame: PathBuf,

    /// Milliseconds to wait for each missing element
    #[arg(long, default_value_t = 0)]
    wait_ms: u64,
}

const SNAPSHOT_URL: &str = "snapshot://article";

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let html = fs::read_to_string(&args.frame)
        .with_context(|| format!("reading {}", args.frame.display()))?;

    let browser = SnapshotBrowser::new();
    browser.add_page(SNAPSHOT_URL, SnapshotPage::framed(html));
    browser.navigate(SNAPSHOT_URL).await?;
    let frame = browser
        .find_element(&Locator::tag("iframe"))
        .await?
        .context("snapshot host has no frame")?;

    let wait = Duration::from_millis(args.wait_ms);
    let fields = within_frame(&browser, frame, || extract(&browser, wait)).await?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}
