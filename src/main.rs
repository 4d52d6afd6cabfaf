use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use kbscraper::{
    batch,
    browser::{driver::ChromeDriver, with_session, Browser, WebDriverBrowser},
    config::{ProxyConfig, Settings, DEFAULT_WEBDRIVER_URL},
    export,
    fetch::LANDING_URL,
    worklist,
};
use std::{io, path::PathBuf, time::Duration};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

/// Exports knowledge-base articles listed in a spreadsheet to a new spreadsheet.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Worklist spreadsheet with a 「記事」 column
    input: Option<PathBuf>,

    /// WebDriver endpoint to use when no chromedriver is launched
    #[arg(long, default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver: Url,

    /// chromedriver binary to launch for this run
    #[arg(long)]
    chromedriver: Option<PathBuf>,

    /// Port for the launched chromedriver
    #[arg(long, default_value_t = 9515)]
    chromedriver_port: u16,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// Seconds to wait for each page element
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,
}

fn select_input(arg: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    #[cfg(feature = "dialog")]
    {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Excelファイルを選択してください")
            .add_filter("Excel files", &["xlsx", "xls"])
            .pick_file()
        {
            return Ok(path);
        }
    }
    bail!("no input file selected");
}

async fn run(args: Args) -> Result<()> {
    // ─── 1) worklist ─────────────────────────────────────────────────
    let input = select_input(args.input)?;
    let rows = worklist::load(&input)?;

    // ─── 2) settings ─────────────────────────────────────────────────
    let settings = Settings {
        webdriver_url: args.webdriver.to_string(),
        chromedriver: args.chromedriver,
        headless: !args.no_headless,
        timeout: Duration::from_secs(args.timeout_secs),
        proxy: ProxyConfig::from_env(),
    };
    debug!(?settings, "settings");

    // ─── 3) browser session ──────────────────────────────────────────
    let driver = match &settings.chromedriver {
        Some(bin) => Some(ChromeDriver::spawn(bin, args.chromedriver_port).await?),
        None => None,
    };
    let endpoint = driver
        .as_ref()
        .map(|d| d.url().to_string())
        .unwrap_or_else(|| settings.webdriver_url.clone());

    let browser = match WebDriverBrowser::connect(&endpoint, &settings.chrome_args()).await {
        Ok(b) => b,
        Err(e) => {
            if let Some(d) = driver {
                d.shutdown().await;
            }
            return Err(e);
        }
    };

    // ─── 4) landing page + batch, session always closed ──────────────
    let result = with_session(&browser, || async {
        browser
            .navigate(LANDING_URL)
            .await
            .context("initial page unreachable")?;
        Ok::<_, anyhow::Error>(batch::run(&browser, &rows, settings.timeout).await)
    })
    .await;

    if let Some(d) = driver {
        d.shutdown().await;
    }
    let records = result?;

    // ─── 5) output ───────────────────────────────────────────────────
    let out = export::output_path(&input, Local::now().naive_local());
    export::write_workbook(&out, &records)?;
    info!(path = %out.display(), "all done");
    Ok(())
}

fn wait_for_enter() {
    println!("Press Enter to exit...");
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) => debug!(error = %e, "no .env loaded"),
    }

    let args = Args::parse();
    let pause = args.pause;
    info!("startup");

    let result = run(args).await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    if pause {
        wait_for_enter();
    }
    result
}
