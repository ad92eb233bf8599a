//! WebDriver-backed gateway (chromedriver or any W3C endpoint).

use std::path::Path;

use async_trait::async_trait;
use thirtyfour::ChromiumLikeCapabilities;
use thirtyfour::prelude::*;
use tracing::{debug, info};

use super::{Gateway, GatewayError, GatewayResult, Locator, PageElement, PageSession};

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Launches Chrome through a WebDriver server with a persistent user-data
/// directory, so a manual login is reused by later campaigns.
pub struct WebDriverGateway {
    server_url: String,
}

impl WebDriverGateway {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }
}

impl Default for WebDriverGateway {
    fn default() -> Self {
        Self::new(DEFAULT_WEBDRIVER_URL)
    }
}

fn session_err(e: WebDriverError) -> GatewayError {
    GatewayError::Session(e.to_string())
}

fn interaction_err(e: WebDriverError) -> GatewayError {
    GatewayError::Interaction(e.to_string())
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Css(s) => By::Css(s.as_str()),
        Locator::XPath(s) => By::XPath(s.as_str()),
    }
}

#[async_trait]
impl Gateway for WebDriverGateway {
    async fn open_session(
        &self,
        profile_dir: &Path,
        headless: bool,
    ) -> GatewayResult<Box<dyn PageSession>> {
        std::fs::create_dir_all(profile_dir).map_err(|e| {
            GatewayError::Session(format!(
                "cannot create profile dir {}: {}",
                profile_dir.display(),
                e
            ))
        })?;

        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg(&format!("--user-data-dir={}", profile_dir.display()))
            .map_err(session_err)?;
        caps.add_arg("--window-size=1280,800").map_err(session_err)?;
        if headless {
            caps.set_headless().map_err(session_err)?;
        }

        let driver = WebDriver::new(&self.server_url, caps)
            .await
            .map_err(session_err)?;
        info!(server = %self.server_url, profile = %profile_dir.display(), headless, "webdriver session opened");
        Ok(Box::new(WebDriverSession { driver }))
    }
}

struct WebDriverSession {
    driver: WebDriver,
}

fn first_element(found: Vec<WebElement>) -> Option<Box<dyn PageElement>> {
    found
        .into_iter()
        .next()
        .map(|el| Box::new(WebDriverElement(el)) as Box<dyn PageElement>)
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> GatewayResult<String> {
        debug!(url, "navigate");
        self.driver
            .goto(url)
            .await
            .map_err(|e| GatewayError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let current = self.driver.current_url().await.map_err(interaction_err)?;
        Ok(current.to_string())
    }

    async fn query(&self, locator: &Locator) -> GatewayResult<Option<Box<dyn PageElement>>> {
        let found = self
            .driver
            .find_all(by(locator))
            .await
            .map_err(interaction_err)?;
        Ok(first_element(found))
    }

    async fn query_all(&self, locator: &Locator) -> GatewayResult<Vec<Box<dyn PageElement>>> {
        let found = self
            .driver
            .find_all(by(locator))
            .await
            .map_err(interaction_err)?;
        Ok(found
            .into_iter()
            .map(|el| Box::new(WebDriverElement(el)) as Box<dyn PageElement>)
            .collect())
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        self.driver.quit().await.map_err(session_err)
    }
}

struct WebDriverElement(WebElement);

#[async_trait]
impl PageElement for WebDriverElement {
    async fn text(&self) -> GatewayResult<String> {
        self.0.text().await.map_err(interaction_err)
    }

    async fn attribute(&self, name: &str) -> GatewayResult<Option<String>> {
        self.0.attr(name).await.map_err(interaction_err)
    }

    async fn click(&self) -> GatewayResult<()> {
        self.0.click().await.map_err(interaction_err)
    }

    async fn fill(&self, text: &str) -> GatewayResult<()> {
        self.0.clear().await.map_err(interaction_err)?;
        self.0.send_keys(text).await.map_err(interaction_err)
    }

    async fn query(&self, locator: &Locator) -> GatewayResult<Option<Box<dyn PageElement>>> {
        let found = self.0.find_all(by(locator)).await.map_err(interaction_err)?;
        Ok(first_element(found))
    }
}
