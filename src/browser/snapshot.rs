// src/browser/snapshot.rs
//
// A `Browser` over saved HTML. Each element handle carries its document
// source and its position in document order; lookups re-parse the source,
// which keeps handles `Send` and the parse deterministic.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{Browser, Locator, PageElement};

const FRAME_HOST: &str = r#"<html><body><iframe id="contentIFrame0" src="about:blank"></iframe></body></html>"#;

/// A saved page: the top-level document and, optionally, the content of its
/// embedded frame.
#[derive(Debug, Clone)]
pub struct SnapshotPage {
    document: Arc<str>,
    frame: Option<Arc<str>>,
}

impl SnapshotPage {
    /// A page with no frame content.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: Arc::from(document.into()),
            frame: None,
        }
    }

    /// A page whose top-level document is just an `<iframe>` showing `frame`.
    pub fn framed(frame: impl Into<String>) -> Self {
        Self::with_frame(FRAME_HOST, frame)
    }

    pub fn with_frame(document: impl Into<String>, frame: impl Into<String>) -> Self {
        Self {
            document: Arc::from(document.into()),
            frame: Some(Arc::from(frame.into())),
        }
    }
}

#[derive(Debug, Default)]
struct Context {
    current: Option<SnapshotPage>,
    in_frame: bool,
    closed: bool,
}

/// In-memory browsing session over [`SnapshotPage`]s keyed by URL.
/// Navigating to an unknown URL fails like an unreachable host would.
#[derive(Debug, Default)]
pub struct SnapshotBrowser {
    pages: Mutex<HashMap<String, SnapshotPage>>,
    ctx: Mutex<Context>,
}

impl SnapshotBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: impl Into<String>, page: SnapshotPage) {
        lock(&self.pages).insert(url.into(), page);
    }

    pub fn in_frame(&self) -> bool {
        lock(&self.ctx).in_frame
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.ctx).closed
    }

    fn current_source(&self) -> Result<Arc<str>> {
        let ctx = lock(&self.ctx);
        if ctx.closed {
            bail!("session closed");
        }
        let page = ctx.current.as_ref().ok_or_else(|| anyhow!("no page loaded"))?;
        if ctx.in_frame {
            page.frame
                .clone()
                .ok_or_else(|| anyhow!("current frame has no content"))
        } else {
            Ok(page.document.clone())
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Element handle: document source plus position in document order.
#[derive(Debug, Clone)]
pub struct SnapshotElement {
    source: Arc<str>,
    index: usize,
    tag: String,
}

fn elements(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn selector(locator: &Locator) -> Result<Selector> {
    Selector::parse(&locator.to_css())
        .map_err(|e| anyhow!("invalid selector for {}: {:?}", locator, e))
}

/// First match for `locator` under element `scope` (whole document if `None`).
fn locate(source: &Arc<str>, scope: Option<usize>, locator: &Locator) -> Result<Option<SnapshotElement>> {
    let sel = selector(locator)?;
    let doc = Html::parse_document(source);
    let all = elements(&doc);
    let found = match scope {
        None => doc.select(&sel).next(),
        Some(i) => all.get(i).and_then(|el| el.select(&sel).next()),
    };
    Ok(found.and_then(|f| {
        all.iter().position(|e| e.id() == f.id()).map(|index| SnapshotElement {
            source: source.clone(),
            index,
            tag: f.value().name().to_string(),
        })
    }))
}

impl SnapshotElement {
    fn with_ref<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Result<T> {
        let doc = Html::parse_document(&self.source);
        let all = elements(&doc);
        let el = all
            .get(self.index)
            .copied()
            .ok_or_else(|| anyhow!("stale element <{}>", self.tag))?;
        Ok(f(el))
    }
}

#[async_trait]
impl PageElement for SnapshotElement {
    async fn attr(&self, name: &str) -> Result<Option<String>> {
        self.with_ref(|el| el.value().attr(name).map(str::to_string))
    }

    async fn text(&self) -> Result<String> {
        self.with_ref(|el| el.text().collect::<String>())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Self>> {
        locate(&self.source, Some(self.index), locator)
    }
}

#[async_trait]
impl Browser for SnapshotBrowser {
    type Element = SnapshotElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = lock(&self.pages)
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("unreachable: no snapshot for {}", url))?;
        let mut ctx = lock(&self.ctx);
        if ctx.closed {
            bail!("session closed");
        }
        ctx.current = Some(page);
        ctx.in_frame = false;
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<SnapshotElement>> {
        let source = self.current_source()?;
        locate(&source, None, locator)
    }

    async fn switch_to_frame(&self, frame: SnapshotElement) -> Result<()> {
        if frame.tag != "iframe" {
            bail!("<{}> is not a frame", frame.tag);
        }
        let mut ctx = lock(&self.ctx);
        if ctx.in_frame {
            bail!("nested frames are not supported");
        }
        match &ctx.current {
            Some(page) if page.frame.is_some() => {
                ctx.in_frame = true;
                Ok(())
            }
            Some(_) => bail!("frame has no content"),
            None => bail!("no page loaded"),
        }
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        lock(&self.ctx).in_frame = false;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut ctx = lock(&self.ctx);
        ctx.closed = true;
        ctx.current = None;
        ctx.in_frame = false;
        Ok(())
    }
}
