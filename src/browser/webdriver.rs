// src/browser/webdriver.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{
    elements::Element, error::CmdError, wd::Capabilities, Client, ClientBuilder,
    Locator as WdLocator,
};
use serde_json::json;
use tracing::{debug, info};

use super::{Browser, Locator, PageElement};

fn to_wd(locator: &Locator) -> WdLocator<'_> {
    match locator {
        Locator::Id(id) => WdLocator::Id(id),
        Locator::Css(css) => WdLocator::Css(css),
        Locator::Tag(tag) => WdLocator::Css(tag),
    }
}

/// "No such element" becomes `None`; everything else is an error.
fn found<T>(res: Result<T, CmdError>, locator: &Locator) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_miss() => Ok(None),
        Err(e) => Err(e).with_context(|| format!("looking up {}", locator)),
    }
}

/// Chrome driven over the WebDriver protocol.
pub struct WebDriverBrowser {
    client: Client,
}

impl WebDriverBrowser {
    /// Opens a Chrome session on the WebDriver server at `webdriver_url`.
    pub async fn connect(webdriver_url: &str, chrome_args: &[String]) -> Result<Self> {
        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": chrome_args }),
        );
        debug!(?chrome_args, "chrome arguments");

        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("opening WebDriver session on {}", webdriver_url))?;
        info!(webdriver = %webdriver_url, "browser session opened");
        Ok(Self { client })
    }
}

#[async_trait]
impl PageElement for Element {
    async fn attr(&self, name: &str) -> Result<Option<String>> {
        // `prop` reflects the live value of form controls.
        if name == "value" {
            if let Some(v) = Element::prop(self, name).await.context("reading property")? {
                return Ok(Some(v));
            }
        }
        Ok(Element::attr(self, name).await.context("reading attribute")?)
    }

    async fn text(&self) -> Result<String> {
        Ok(Element::text(self).await.context("reading text")?)
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Self>> {
        found(Element::find(self, to_wd(locator)).await, locator)
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigating to {}", url))
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<Element>> {
        found(self.client.find(to_wd(locator)).await, locator)
    }

    async fn switch_to_frame(&self, frame: Element) -> Result<()> {
        frame.enter_frame().await.context("entering frame")?;
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        self.client
            .enter_frame(None)
            .await
            .context("returning to top-level document")
    }

    async fn close(&self) -> Result<()> {
        self.client
            .clone()
            .close()
            .await
            .context("closing WebDriver session")?;
        info!("browser session closed");
        Ok(())
    }
}
