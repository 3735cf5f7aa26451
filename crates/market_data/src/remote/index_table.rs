use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use common::config::IndexSourceSettings;
use common::error::UniverseError;
use common::models::Ticker;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::traits::UniverseSource;

/// Index membership scraped from an HTML page (a Wikipedia constituents
/// table). The symbol column is found by header keyword, so it survives the
/// columns being reordered or renamed slightly.
pub struct IndexTableSource {
    client: Client,
    settings: IndexSourceSettings,
    timeout: Duration,
}

impl IndexTableSource {
    pub fn new(settings: IndexSourceSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("breakout-scanner/0.1 (index membership)")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            settings,
            timeout,
        })
    }

    async fn fetch_page(&self) -> Result<String, UniverseError> {
        let response = self
            .client
            .get(&self.settings.url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UniverseError::Timeout(self.timeout)
                } else {
                    UniverseError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UniverseError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| UniverseError::Request(e.to_string()))
    }
}

#[async_trait]
impl UniverseSource for IndexTableSource {
    fn name(&self) -> String {
        self.settings.name.clone()
    }

    async fn try_fetch_symbols(&self) -> Result<BTreeSet<Ticker>, UniverseError> {
        let html = self.fetch_page().await?;
        debug!("{}: fetched {} bytes", self.settings.name, html.len());
        extract_symbols(&html, &self.settings)
    }
}

/// Pulls the symbol column out of the first table whose header row has a
/// cell containing one of the configured keywords.
pub fn extract_symbols(
    html: &str,
    settings: &IndexSourceSettings,
) -> Result<BTreeSet<Ticker>, UniverseError> {
    let document = Html::parse_document(html);
    let tables = selector("table")?;
    let rows = selector("tr")?;

    for table in document.select(&tables) {
        let mut table_rows = table.select(&rows);
        let Some(column) = table_rows
            .by_ref()
            .find_map(|row| symbol_column(row, &settings.header_keywords))
        else {
            continue;
        };

        let symbols: BTreeSet<Ticker> = table_rows
            .filter_map(|row| cells(row).nth(column))
            .filter_map(|cell| normalize(&cell_text(cell), settings))
            .collect();

        if !symbols.is_empty() {
            return Ok(symbols);
        }
    }

    Err(UniverseError::NoSymbolColumn(settings.header_keywords.clone()))
}

fn selector(css: &str) -> Result<Selector, UniverseError> {
    Selector::parse(css).map_err(|e| UniverseError::Malformed(e.to_string()))
}

/// Position of the first header cell matching a keyword. Only rows made of
/// `th` cells count as header rows.
fn symbol_column(row: ElementRef<'_>, keywords: &[String]) -> Option<usize> {
    let headers: Vec<ElementRef<'_>> = cells(row).collect();
    if headers.is_empty() || headers.iter().any(|cell| cell.value().name() != "th") {
        return None;
    }

    headers.iter().position(|cell| {
        let text = cell_text(*cell);
        keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    })
}

fn cells(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let text: String = cell.text().collect();
    // Drop footnote markers such as "[1]".
    match text.split_once('[') {
        Some((head, _)) => head.trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn normalize(raw: &str, settings: &IndexSourceSettings) -> Option<Ticker> {
    let mut symbol = raw.trim().to_string();
    for (from, to) in &settings.replacements {
        symbol = symbol.replace(from.as_str(), to);
    }

    // Placeholder cells must be rejected before the suffix makes them look valid.
    let ticker = Ticker::parse(&symbol)?;
    match &settings.suffix {
        Some(suffix) if !ticker.as_str().ends_with(suffix.as_str()) => {
            Ticker::parse(&format!("{ticker}{suffix}"))
        }
        _ => Some(ticker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp500() -> IndexSourceSettings {
        IndexSourceSettings::defaults().remove(0)
    }

    fn dax() -> IndexSourceSettings {
        IndexSourceSettings::defaults().remove(1)
    }

    fn tickers(set: &BTreeSet<Ticker>) -> Vec<&str> {
        set.iter().map(Ticker::as_str).collect()
    }

    #[test]
    fn us_table_replaces_dots() {
        let html = r#"
            <table class="wikitable">
              <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th></tr>
              <tr><td><a href="/x">MMM</a></td><td>3M</td><td>Industrials</td></tr>
              <tr><td>BRK.B</td><td>Berkshire Hathaway</td><td>Financials</td></tr>
              <tr><td>MMM</td><td>3M again</td><td>Industrials</td></tr>
            </table>"#;

        let symbols = extract_symbols(html, &sp500()).unwrap();
        assert_eq!(tickers(&symbols), vec!["BRK-B", "MMM"]);
    }

    #[test]
    fn german_table_gets_suffix_once() {
        let html = r#"
            <table><tr><th>Navigation</th></tr><tr><td>nothing here</td></tr></table>
            <table class="wikitable sortable">
              <tr><th>Logo</th><th>Name</th><th>Kürzel[2]</th><th>Branche</th></tr>
              <tr><td></td><td>Adidas</td><td>ADS</td><td>Konsumgüter</td></tr>
              <tr><td></td><td>SAP</td><td>SAP.DE</td><td>Software</td></tr>
              <tr><td></td><td>Leer</td><td> </td><td>-</td></tr>
            </table>"#;

        let symbols = extract_symbols(html, &dax()).unwrap();
        assert_eq!(tickers(&symbols), vec!["ADS.DE", "SAP.DE"]);
    }

    #[test]
    fn placeholder_symbols_are_dropped_before_the_suffix() {
        let html = r#"
            <table class="wikitable">
              <tr><th>Name</th><th>Kürzel</th></tr>
              <tr><td>Adidas</td><td>ADS</td></tr>
              <tr><td>Unbekannt</td><td>-</td></tr>
              <tr><td>Leer</td><td>nan</td></tr>
              <tr><td>Strich</td><td>–</td></tr>
              <tr><td>Fußnote</td><td>[3]</td></tr>
            </table>"#;

        let symbols = extract_symbols(html, &dax()).unwrap();
        assert_eq!(tickers(&symbols), vec!["ADS.DE"]);
    }

    #[test]
    fn header_match_is_case_sensitive() {
        let html = r#"<table><tr><th>symbol</th></tr><tr><td>ADS</td></tr></table>"#;

        let err = extract_symbols(html, &dax()).unwrap_err();
        assert!(matches!(err, UniverseError::NoSymbolColumn(_)));
    }
}
