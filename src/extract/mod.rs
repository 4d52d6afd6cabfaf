// src/extract/mod.rs

use anyhow::Result;
use std::{future::Future, time::Duration};
use tracing::debug;

use crate::browser::{Browser, Locator, PageElement};
use crate::record::ArticleFields;

pub mod section;

pub use section::Sections;

const NUMBER_ID: &str = "number";
const TITLE_ID: &str = "title";
const KEYWORDS_ID: &str = "keywords";
const PUBLISH_START_ID: &str = "enjoy_openperiod_start_d";
const PUBLISH_END_ID: &str = "enjoy_openperiod_end_d";
const DATE_INPUT_CSS: &str = "input.ms-crm-Input";
const CONTENT_ID: &str = "content";
const CATEGORY_CSS: &str = "span.ms-crm-LookupItem-Name";
const AUDIENCE_ID: &str = "mjs_target";
const SELECTED_OPTION_CSS: &str = "option[selected]";

/// Awaits one extraction rule; a miss or an error yields the default.
pub async fn or_default<T, F>(field: &'static str, rule: F) -> T
where
    T: Default,
    F: Future<Output = Result<Option<T>>>,
{
    match rule.await {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!(field, "not found");
            T::default()
        }
        Err(e) => {
            debug!(field, error = %e, "extraction failed");
            T::default()
        }
    }
}

/// `value` of the control with id `id`.
async fn control_value<B: Browser + ?Sized>(browser: &B, id: &str, timeout: Duration) -> Result<Option<String>> {
    match browser.wait_for(&Locator::id(id), timeout).await? {
        Some(el) => el.attr("value").await,
        None => Ok(None),
    }
}

/// `value` of the first `css` match inside the container with id `id`.
async fn nested_value<B: Browser + ?Sized>(
    browser: &B,
    id: &str,
    css: &str,
    timeout: Duration,
) -> Result<Option<String>> {
    let Some(container) = browser.wait_for(&Locator::id(id), timeout).await? else {
        return Ok(None);
    };
    match container.find(&Locator::css(css)).await? {
        Some(input) => input.attr("value").await,
        None => Ok(None),
    }
}

async fn sections<B: Browser + ?Sized>(browser: &B, timeout: Duration) -> Result<Option<Sections>> {
    Ok(control_value(browser, CONTENT_ID, timeout)
        .await?
        .map(|v| Sections::from_escaped(&v)))
}

async fn category<B: Browser + ?Sized>(browser: &B, timeout: Duration) -> Result<Option<String>> {
    match browser.wait_for(&Locator::css(CATEGORY_CSS), timeout).await? {
        Some(el) => Ok(Some(el.text().await?.trim().to_string())),
        None => Ok(None),
    }
}

async fn audience<B: Browser + ?Sized>(browser: &B, timeout: Duration) -> Result<Option<String>> {
    let Some(select) = browser.wait_for(&Locator::id(AUDIENCE_ID), timeout).await? else {
        return Ok(None);
    };
    match select.find(&Locator::css(SELECTED_OPTION_CSS)).await? {
        Some(opt) => Ok(Some(opt.text().await?.trim().to_string())),
        None => Ok(None),
    }
}

/// Reads every article field from the current browsing context, which must
/// already be the article's content frame. Each field waits at most
/// `timeout` and falls back to `""` on its own.
pub async fn extract<B: Browser + ?Sized>(browser: &B, timeout: Duration) -> ArticleFields {
    let article_number = or_default("article_number", control_value(browser, NUMBER_ID, timeout)).await;
    let title = or_default("title", control_value(browser, TITLE_ID, timeout)).await;
    let keywords = or_default("keywords", control_value(browser, KEYWORDS_ID, timeout)).await;

    let publish_start = or_default(
        "publish_start",
        nested_value(browser, PUBLISH_START_ID, DATE_INPUT_CSS, timeout),
    )
    .await;
    let publish_end = or_default(
        "publish_end",
        nested_value(browser, PUBLISH_END_ID, DATE_INPUT_CSS, timeout),
    )
    .await;

    let Sections {
        question,
        answer,
        comments,
    } = or_default("sections", sections(browser, timeout)).await;

    let category = or_default("category", category(browser, timeout)).await;
    let audience = or_default("audience", audience(browser, timeout)).await;

    ArticleFields {
        article_number,
        title,
        keywords,
        publish_start,
        publish_end,
        question,
        answer,
        comments,
        category,
        audience,
    }
}
