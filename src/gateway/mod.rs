//! Page-automation boundary.
//!
//! The campaign body drives the remote site exclusively through these
//! traits. The production implementation lives in [`webdriver`]; tests use
//! scripted in-memory doubles.

pub mod webdriver;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by any gateway operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("session error: {0}")]
    Session(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Could not find {0}")]
    ElementMissing(String),

    #[error("interaction failed: {0}")]
    Interaction(String),

    #[error("session is closed")]
    Closed,
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Opens browser sessions. One session is owned by one campaign body.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Open a session backed by a persistent profile directory so the
    /// authenticated state survives restarts.
    async fn open_session(
        &self,
        profile_dir: &Path,
        headless: bool,
    ) -> GatewayResult<Box<dyn PageSession>>;
}

/// A live page. Not shared: only the campaign body holds it.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate and wait for the page to settle. Returns the resolved URL,
    /// which may differ from the requested one after redirects.
    async fn navigate(&mut self, url: &str) -> GatewayResult<String>;

    async fn query(&self, locator: &Locator) -> GatewayResult<Option<Box<dyn PageElement>>>;

    async fn query_all(&self, locator: &Locator) -> GatewayResult<Vec<Box<dyn PageElement>>>;

    /// Release the underlying browser resources.
    async fn close(self: Box<Self>) -> GatewayResult<()>;
}

#[async_trait]
pub trait PageElement: Send + Sync {
    async fn text(&self) -> GatewayResult<String>;

    async fn attribute(&self, name: &str) -> GatewayResult<Option<String>>;

    async fn click(&self) -> GatewayResult<()>;

    /// Replace the element's value with `text`.
    async fn fill(&self, text: &str) -> GatewayResult<()>;

    /// Query within this element's subtree.
    async fn query(&self, locator: &Locator) -> GatewayResult<Option<Box<dyn PageElement>>>;
}
