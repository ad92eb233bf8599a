//! Target-site profile: URLs, locators and classification rules.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::gateway::Locator;

/// Title fragments that mark a profile as an executive (case-insensitive).
pub const EXECUTIVE_MARKERS: &[&str] = &[
    "CEO", "CTO", "COO", "CFO", "VP", "Director", "Head of", "Chief",
];

pub const MAX_POSTINGS_PER_TITLE: usize = 10;
pub const MAX_CANDIDATES_PER_COMPANY: usize = 5;

/// URLs and locators for the site the campaign drives.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub origin: String,
    pub job_card: Locator,
    pub job_title: Locator,
    pub job_company: Locator,
    pub job_link: Locator,
    pub person_card: Locator,
    pub person_name: Locator,
    pub person_title: Locator,
    pub person_link: Locator,
    pub connect_button: Locator,
    pub more_button: Locator,
    pub connect_menu_item: Locator,
    pub add_note_button: Locator,
    pub note_field: Locator,
    pub send_button: Locator,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::linkedin()
    }
}

impl SiteProfile {
    pub fn linkedin() -> Self {
        Self::with_origin("https://www.linkedin.com")
    }

    /// Same locators against another origin (staging mirrors, tests).
    pub fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            job_card: Locator::css(".job-card-container"),
            job_title: Locator::css(".job-card-list__title"),
            job_company: Locator::css(".job-card-container__primary-description"),
            job_link: Locator::css("a.job-card-container__link"),
            person_card: Locator::css(".entity-result"),
            person_name: Locator::css(".entity-result__title-text a span[aria-hidden='true']"),
            person_title: Locator::css(".entity-result__primary-subtitle"),
            person_link: Locator::css(".entity-result__title-text a"),
            connect_button: Locator::xpath("//button[contains(normalize-space(.), 'Connect')]"),
            more_button: Locator::xpath("//button[contains(normalize-space(.), 'More')]"),
            connect_menu_item: Locator::xpath(
                "//div[@role='menuitem'][contains(normalize-space(.), 'Connect')]",
            ),
            add_note_button: Locator::xpath("//button[contains(normalize-space(.), 'Add a note')]"),
            note_field: Locator::css("textarea[name='message']"),
            send_button: Locator::xpath("//button[contains(normalize-space(.), 'Send')]"),
        }
    }

    pub fn feed_url(&self) -> String {
        format!("{}/feed/", self.origin)
    }

    /// Job search for `keywords`, bounded to the recency window.
    pub fn job_search_url(&self, keywords: &str, posted_within_days: u32) -> String {
        let mut url = format!(
            "{}/jobs/search/?keywords={}",
            self.origin,
            encode(keywords)
        );
        if let Some(window) = recency_filter(posted_within_days) {
            url.push_str("&f_TPR=");
            url.push_str(window);
        }
        url
    }

    pub fn people_search_url(&self, company: &str) -> String {
        format!(
            "{}/search/results/people/?keywords={}&origin=GLOBAL_SEARCH_HEADER",
            self.origin,
            encode(company)
        )
    }

    /// Resolve a possibly relative link against the origin.
    pub fn absolute_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            format!("{}{}", self.origin, link)
        } else {
            format!("{}/{}", self.origin, link)
        }
    }
}

/// The session is unauthenticated when the site bounced us to a login or
/// security checkpoint page.
pub fn is_login_wall(resolved_url: &str) -> bool {
    resolved_url.contains("login") || resolved_url.contains("checkpoint")
}

/// Site filter code for the recency window; `None` means no filter.
pub fn recency_filter(posted_within_days: u32) -> Option<&'static str> {
    match posted_within_days {
        0..=1 => Some("r86400"),
        2..=7 => Some("r604800"),
        8..=30 => Some("r2592000"),
        _ => None,
    }
}

pub fn is_executive_title(title: &str) -> bool {
    let title = title.to_lowercase();
    EXECUTIVE_MARKERS
        .iter()
        .any(|marker| title.contains(&marker.to_lowercase()))
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}
