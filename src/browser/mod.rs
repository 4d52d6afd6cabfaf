// src/browser/mod.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use std::{
    fmt,
    future::Future,
    panic::{resume_unwind, AssertUnwindSafe},
    time::Duration,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

pub mod driver;
pub mod snapshot;
pub mod webdriver;

pub use snapshot::{SnapshotBrowser, SnapshotPage};
pub use webdriver::WebDriverBrowser;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How to find an element in the current browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Css(String),
    Tag(String),
}

impl Locator {
    pub fn id(s: impl Into<String>) -> Self {
        Locator::Id(s.into())
    }

    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn tag(s: impl Into<String>) -> Self {
        Locator::Tag(s.into())
    }

    /// Equivalent CSS selector.
    pub fn to_css(&self) -> String {
        match self {
            Locator::Id(id) => format!("[id=\"{}\"]", id.replace('"', "\\\"")),
            Locator::Css(css) => css.clone(),
            Locator::Tag(tag) => tag.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Css(css) => write!(f, "css `{}`", css),
            Locator::Tag(tag) => write!(f, "<{}>", tag),
        }
    }
}

/// A handle to an element in a rendered page.
#[async_trait]
pub trait PageElement: Send + Sync + Sized {
    /// Attribute (or, for form controls, current property) value.
    async fn attr(&self, name: &str) -> Result<Option<String>>;

    /// Visible text.
    async fn text(&self) -> Result<String>;

    /// First descendant matching `locator`, `None` if there is none.
    async fn find(&self, locator: &Locator) -> Result<Option<Self>>;
}

/// The navigation collaborator: one browsing session, used sequentially.
#[async_trait]
pub trait Browser: Send + Sync {
    type Element: PageElement;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Immediate lookup in the current context, `None` if nothing matches.
    async fn find_element(&self, locator: &Locator) -> Result<Option<Self::Element>>;

    async fn switch_to_frame(&self, frame: Self::Element) -> Result<()>;

    async fn switch_to_default_content(&self) -> Result<()>;

    /// Ends the session and releases whatever backs it.
    async fn close(&self) -> Result<()>;

    /// Polls until `locator` matches or `timeout` elapses (`None`).
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Option<Self::Element>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.find_element(locator).await? {
                return Ok(Some(el));
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(%locator, ?timeout, "wait timed out");
                return Ok(None);
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Runs `f` inside `frame`, then returns to the top-level document on every
/// exit path, including a panic inside `f`.
pub async fn within_frame<B, F, Fut, T>(browser: &B, frame: B::Element, f: F) -> Result<T>
where
    B: Browser + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    browser
        .switch_to_frame(frame)
        .await
        .context("switching into frame")?;

    let out = AssertUnwindSafe(f()).catch_unwind().await;

    if let Err(e) = browser.switch_to_default_content().await {
        warn!(error = %e, "failed to return to top-level document");
    }

    match out {
        Ok(v) => Ok(v),
        Err(panic) => resume_unwind(panic),
    }
}

/// Runs `f` with the session and closes the session afterwards, whether `f`
/// returned, failed or panicked.
pub async fn with_session<B, F, Fut, T>(browser: &B, f: F) -> Result<T>
where
    B: Browser + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let out = AssertUnwindSafe(f()).catch_unwind().await;

    if let Err(e) = browser.close().await {
        warn!(error = %e, "failed to close browser session");
    }

    match out {
        Ok(res) => res,
        Err(panic) => resume_unwind(panic),
    }
}
