//! Heating degree-day values scraped from the climate.weather.gc.ca daily report.
//!
//! The report has no stable identifiers, so the value is read by position:
//! row `day` of the table, 5th cell. This is best-effort. A missing row or
//! cell is detected and reported as "no value", but if the page layout shifts
//! so that a different column lands in 5th place, the wrong number is
//! returned and nothing here can tell. Setting a header label in
//! [`ReportLayout`] catches the common case of a reordered header.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, error, warn};

use crate::error::Upstream;

/// 1-based column holding the degree-day value.
pub const DEGREE_DAY_COLUMN: usize = 5;

/// Where the value lives in the report table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub column: usize,
    /// Text the header cell of `column` must contain (case-insensitive).
    pub header_label: Option<String>,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            column: DEGREE_DAY_COLUMN,
            header_label: None,
        }
    }
}

/// Outcome of reading one cell out of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Value(String),
    RowMissing { day: u32 },
    CellMissing { day: u32, column: usize },
    HeaderMismatch { expected: String, found: Option<String> },
}

/// Reads the trimmed text of cell `layout.column` in the `day`-th table row.
///
/// Rows and cells are matched with `:nth-child`, so positions count element
/// siblings within their parent. Several rows can match (a header row in
/// `<thead>` is also `tr:nth-child(1)`); the first one in document order that
/// has the cell is used.
pub fn extract_cell(html: &str, day: u32, layout: &ReportLayout) -> Extraction {
    let document = Html::parse_document(html);

    if let Some(expected) = &layout.header_label {
        let found = first_text(&document, &format!("th:nth-child({})", layout.column));
        let matches = found
            .as_deref()
            .is_some_and(|h| h.to_lowercase().contains(&expected.to_lowercase()));
        if !matches {
            return Extraction::HeaderMismatch {
                expected: expected.clone(),
                found,
            };
        }
    }

    let (Ok(row_sel), Ok(cell_sel)) = (
        Selector::parse(&format!("tr:nth-child({day})")),
        Selector::parse(&format!("td:nth-child({})", layout.column)),
    ) else {
        return Extraction::RowMissing { day };
    };

    let mut rows = document.select(&row_sel).peekable();
    if rows.peek().is_none() {
        return Extraction::RowMissing { day };
    }

    match rows.find_map(|row| row.select(&cell_sel).next()) {
        Some(cell) => Extraction::Value(cell.text().collect::<String>().trim().to_string()),
        None => Extraction::CellMissing {
            day,
            column: layout.column,
        },
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Fetches the fixed degree-day report and extracts one day's value.
#[derive(Debug, Clone)]
pub struct DegreeDayScraper {
    http: Client,
    report_url: String,
    layout: ReportLayout,
}

impl DegreeDayScraper {
    pub fn new(http: Client, report_url: String, layout: ReportLayout) -> Self {
        Self {
            http,
            report_url,
            layout,
        }
    }

    /// Value for day-of-month `day`, or `None` when it cannot be read.
    ///
    /// Never fails: transport errors, bad statuses and structural mismatches
    /// are logged and yield `None`. `day` is not checked against the calendar.
    pub async fn scrape_day(&self, day: u32) -> Option<String> {
        let html = match self.fetch_report().await {
            Ok(html) => html,
            Err(err) => {
                error!(upstream = %Upstream::DegreeDay, error = %err, "Error scraping data");
                return None;
            }
        };

        match extract_cell(&html, day, &self.layout) {
            Extraction::Value(value) => {
                debug!(day, value = %value, "Target data");
                Some(value)
            }
            Extraction::RowMissing { day } => {
                error!(day, "Target row not found in the HTML");
                None
            }
            Extraction::CellMissing { day, column } => {
                error!(day, column, "Target cell not found in the row");
                None
            }
            Extraction::HeaderMismatch { expected, found } => {
                warn!(expected = %expected, ?found, "Report header does not match, layout may have shifted");
                None
            }
        }
    }

    async fn fetch_report(&self) -> reqwest::Result<String> {
        debug!(url = %self.report_url, "requesting degree-day report");
        self.http
            .get(&self.report_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
