//! Interest-rate and bank-name scraping from public bank web pages.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// `info` of a bank whose page could not be fetched.
pub const FETCH_ERROR: &str = "Error fetching data";

pub const DEFAULT_BANK_LIST_URL: &str =
    "https://www.rbi.org.in/Scripts/BS_PressReleaseDisplay.aspx";

const MAX_CONCURRENT_FETCHES: usize = 5;
const SNIPPET_LINES: usize = 10;
const MAX_BANK_NAMES: usize = 15;
const RATE_KEYWORDS: [&str; 4] = ["interest", "rate", "%", "deposit"];

/// A bank and the page listing its deposit rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankPage {
    pub bank: String,
    pub url: String,
}

impl BankPage {
    pub fn new(bank: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            bank: bank.into(),
            url: url.into(),
        }
    }
}

pub fn default_rate_pages() -> Vec<BankPage> {
    vec![
        BankPage::new(
            "SBI",
            "https://www.sbi.co.in/web/interest-rates/deposit-rates",
        ),
        BankPage::new("HDFC", "https://www.hdfcbank.com/personal/resources/rates"),
        BankPage::new(
            "ICICI",
            "https://www.icicibank.com/Personal-Banking/deposits/fixed-deposit-interest-rates.page",
        ),
    ]
}

/// Rate lines scraped from one bank page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateInfo {
    pub bank: String,
    pub url: String,
    pub info: String,
}

#[derive(Debug, Clone)]
pub struct RateScraper {
    client: reqwest::Client,
    pages: Vec<BankPage>,
    bank_list_url: String,
}

impl RateScraper {
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(pages: Vec<BankPage>, bank_list_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .context("Failed to build HTTP client for scraping")?;
        Ok(Self {
            client,
            pages,
            bank_list_url: bank_list_url.into(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(default_rate_pages(), DEFAULT_BANK_LIST_URL)
    }

    /// Fetch every configured page, at most five at a time.
    ///
    /// Returns one entry per page in configured order. A page that fails keeps
    /// its entry with [`FETCH_ERROR`] as `info`.
    pub async fn scrape_interest_rates(&self) -> Vec<RateInfo> {
        info!(banks = self.pages.len(), "scraping interest rates");
        let rates = stream::iter(0..self.pages.len())
            .map(|i| self.fetch_rate(&self.pages[i]))
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect::<Vec<_>>()
            .await;
        info!("interest rate scraping completed");
        rates
    }

    /// Distinct link texts mentioning "Bank" on the bank list page, at most 15.
    /// Empty if the page can't be fetched.
    pub async fn scrape_bank_names(&self) -> Vec<String> {
        match self.fetch_page(&self.bank_list_url).await {
            Ok(body) => {
                let names = bank_names(&body);
                info!(count = names.len(), "scraped bank names");
                names
            }
            Err(err) => {
                warn!("Failed to fetch bank list: {err:#}");
                Vec::new()
            }
        }
    }

    async fn fetch_rate(&self, page: &BankPage) -> RateInfo {
        let info = match self.fetch_page(&page.url).await {
            Ok(body) => {
                info!(bank = %page.bank, "scraped interest rates");
                rate_snippet(&body)
            }
            Err(err) => {
                warn!(bank = %page.bank, "Failed to fetch rates: {err:#}");
                FETCH_ERROR.to_string()
            }
        };

        RateInfo {
            bank: page.bank.clone(),
            url: page.url.clone(),
            info,
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()
            .context("Bank page returned an error status")?
            .text()
            .await
            .context("Failed to read bank page")
    }
}

/// The first lines of the page text that mention rates, lowercased.
pub fn rate_snippet(html: &str) -> String {
    let text = Html::parse_document(html)
        .root_element()
        .text()
        .collect::<String>()
        .to_lowercase();

    text.lines()
        .map(str::trim)
        .filter(|line| RATE_KEYWORDS.iter().any(|keyword| line.contains(keyword)))
        .take(SNIPPET_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn bank_names(html: &str) -> Vec<String> {
    let Ok(links) = Selector::parse("a") else {
        return Vec::new();
    };

    let names: BTreeSet<String> = Html::parse_document(html)
        .select(&links)
        .map(|link| link.text().collect::<String>())
        .filter(|text| text.contains("Bank"))
        .map(|text| text.trim().to_string())
        .collect();

    names.into_iter().take(MAX_BANK_NAMES).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_snippet_keeps_matching_lines() {
        let html = "<html><body><p>Fixed Deposit Interest Rates</p>\n\
                    <p>1 year: 6.80%</p>\n\
                    <p>Contact us</p></body></html>";
        assert_eq!(rate_snippet(html), "fixed deposit interest rates\n1 year: 6.80%");
    }

    #[test]
    fn test_rate_snippet_is_capped() {
        let rows: String = (0..25).map(|n| format!("<p>tenor {n}: 7%</p>\n")).collect();
        let html = format!("<html><body>{rows}</body></html>");
        assert_eq!(rate_snippet(&html).lines().count(), SNIPPET_LINES);
    }

    #[test]
    fn test_bank_names_are_distinct_and_capped() {
        let mut html = String::from(
            "<a href='#'> State Bank of India </a><a>State Bank of India</a><a>Press releases</a>",
        );
        for n in 0..30 {
            html.push_str(&format!("<a>Bank number {n:02}</a>"));
        }

        let names = bank_names(&html);
        assert_eq!(names.len(), MAX_BANK_NAMES);
        assert!(names.iter().all(|name| name.contains("Bank")));
        assert!(!names.iter().any(|name| name.starts_with(' ')));

        let few = bank_names("<a> State Bank of India </a><a>State Bank of India</a>");
        assert_eq!(few, vec!["State Bank of India"]);
    }
}
