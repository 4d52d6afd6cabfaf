// src/browser/driver.rs

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::{path::Path, process::Stdio, time::Duration};
use tokio::{
    process::{Child, Command},
    time::{sleep, Instant},
};
use tracing::{debug, info, warn};

const READY_TIMEOUT: Duration = Duration::from_secs(15);
const READY_POLL: Duration = Duration::from_millis(200);

#[derive(Deserialize)]
struct Status {
    value: StatusValue,
}

#[derive(Deserialize)]
struct StatusValue {
    #[serde(default)]
    ready: bool,
}

/// A chromedriver child process, killed on [`ChromeDriver::shutdown`] or drop.
pub struct ChromeDriver {
    child: Child,
    url: String,
}

impl ChromeDriver {
    /// Spawns `binary --port=<port>` and waits for it to report ready.
    pub async fn spawn(binary: &Path, port: u16) -> Result<Self> {
        let child = Command::new(binary)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", binary.display()))?;
        let url = format!("http://localhost:{}", port);
        info!(binary = %binary.display(), %url, "chromedriver started");

        let mut driver = Self { child, url };
        if let Err(e) = driver.wait_ready().await {
            driver.shutdown().await;
            return Err(e);
        }
        Ok(driver)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn wait_ready(&mut self) -> Result<()> {
        // Local endpoint; never route it through a proxy.
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(2))
            .build()?;
        let status_url = format!("{}/status", self.url);
        let deadline = Instant::now() + READY_TIMEOUT;

        loop {
            if let Some(exit) = self.child.try_wait()? {
                bail!("chromedriver exited early: {}", exit);
            }
            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let status: Status = resp.json().await.context("decoding /status")?;
                    if status.value.ready {
                        debug!("chromedriver ready");
                        return Ok(());
                    }
                }
                Ok(resp) => debug!(status = %resp.status(), "chromedriver not ready"),
                Err(e) => debug!(error = %e, "chromedriver not reachable yet"),
            }
            if Instant::now() >= deadline {
                bail!("chromedriver not ready after {:?}", READY_TIMEOUT);
            }
            sleep(READY_POLL).await;
        }
    }

    pub async fn shutdown(mut self) {
        match self.child.kill().await {
            Ok(()) => info!("chromedriver stopped"),
            Err(e) => warn!(error = %e, "failed to stop chromedriver"),
        }
    }
}
