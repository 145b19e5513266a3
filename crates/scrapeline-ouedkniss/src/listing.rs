//! Search-results crawler producing the identifier CSV for the fetch pipeline.
//!
//! Pages through a category sorted by refresh date until the remote reports no
//! more pages, an empty page, or a non-200 status.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scrapeline_core::Transport;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::query;

/// Search endpoint (differs from the details endpoint)
pub const SEARCH_ENDPOINT: &str = "https://api.ouedkniss.com/graphql";

/// Announcements per search page
pub const PAGE_SIZE: u32 = 48;

pub const SEARCH_QUERY: &str = "query SearchQuery($q: String, $filter: SearchFilterInput) { \
    search(q: $q, filter: $filter) { announcements { \
    data { id title slug refreshedAt price priceUnit \
    cities { name } store { name } \
    smallDescription { specification { codename } valueText } } \
    paginatorInfo { hasMorePages lastPage } } } }";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Headers the search endpoint expects from a browser session
pub fn browser_headers(category: &str) -> HeaderMap {
    let referer = format!("https://www.ouedkniss.com/{category}/1");
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let pairs = [
        ("accept", "*/*"),
        ("accept-language", "fr"),
        ("locale", "fr"),
        ("origin", "https://www.ouedkniss.com"),
        ("referer", referer.as_str()),
        ("user-agent", USER_AGENT),
        ("x-app-version", "3.3.70"),
        ("x-track-id", "abcd1234"),
        ("x-track-timestamp", timestamp.as_str()),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        // Skip values that are not valid header text (e.g. odd category slugs)
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    headers
}

/// Crawl parameters
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub category: String,
    /// Stop after this many pages even if more remain
    pub max_pages: Option<u32>,
    pub page_delay: Duration,
    pub timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            category: "immobilier".to_string(),
            max_pages: None,
            page_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct SearchData {
    search: Search,
}

#[derive(Deserialize)]
struct Search {
    announcements: Page,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Listing>,
    #[serde(rename = "paginatorInfo")]
    paginator: Option<Paginator>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paginator {
    #[serde(default)]
    has_more_pages: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    id: Option<String>,
    title: Option<String>,
    slug: Option<String>,
    refreshed_at: Option<String>,
    price: Option<serde_json::Value>,
    price_unit: Option<String>,
    cities: Option<Vec<Named>>,
    store: Option<Named>,
    small_description: Option<Vec<Option<SmallDescription>>>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmallDescription {
    specification: Option<Specification>,
    value_text: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Specification {
    codename: Option<String>,
}

/// One CSV row of the crawl output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRow {
    pub id: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub price: Option<String>,
    #[serde(rename = "priceUnit")]
    pub price_unit: Option<String>,
    pub area: Option<String>,
    pub city: String,
    pub store: Option<String>,
}

/// `valueText` of the first entry whose codename mentions `superficie`
fn extract_area(desc: &[Option<SmallDescription>]) -> Option<String> {
    desc.iter().flatten().find_map(|item| {
        let codename = item.specification.as_ref()?.codename.as_deref()?;
        if !codename.to_lowercase().contains("superficie") {
            return None;
        }
        item.value_text.as_ref().map(value_text)
    })
}

fn value_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        // valueText is sometimes a list of strings
        serde_json::Value::Array(items) => items
            .iter()
            .map(|i| i.as_str().map_or_else(|| i.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

impl From<Listing> for ListingRow {
    fn from(a: Listing) -> Self {
        let area = a.small_description.as_deref().and_then(extract_area);
        let city = a
            .cities
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            id: a.id,
            title: a.title,
            slug: a.slug,
            created_at: a.refreshed_at,
            price: a.price.as_ref().map(value_text),
            price_unit: a.price_unit,
            area,
            city,
            store: a.store.and_then(|s| s.name),
        }
    }
}

/// Sequential page crawler over a [`Transport`] bound to the search endpoint
pub struct ListingCrawler<T> {
    transport: T,
    options: CrawlOptions,
    shutdown: &'static AtomicBool,
}

impl<T: Transport> ListingCrawler<T> {
    pub fn new(transport: T, options: CrawlOptions, shutdown: &'static AtomicBool) -> Self {
        Self {
            transport,
            options,
            shutdown,
        }
    }

    fn page_request(&self, page: u32) -> Vec<u8> {
        query::request_body(
            SEARCH_QUERY,
            json!({
                "q": null,
                "filter": {
                    "categorySlug": self.options.category,
                    "page": page,
                    "orderByField": {"field": "REFRESHED_AT"},
                    "count": PAGE_SIZE,
                }
            }),
        )
    }

    /// Collect rows from page 1 until the listing is exhausted.
    ///
    /// A transport failure or undecodable page is an error; a non-200 status
    /// ends the crawl with the rows gathered so far.
    pub async fn crawl(&self) -> Result<Vec<ListingRow>> {
        let mut rows = Vec::new();
        let mut page = 1u32;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                log::warn!("Shutdown requested, stopping at page {page}");
                break;
            }
            log::info!("Fetching page {page}...");

            let resp = self
                .transport
                .post_json(self.page_request(page), None, self.options.timeout)
                .await
                .with_context(|| format!("search page {page}"))?;
            if !resp.is_ok() {
                log::error!(
                    "Server error on page {page}: HTTP {}: {}",
                    resp.status,
                    String::from_utf8_lossy(&resp.body)
                );
                break;
            }

            let (data, errors) = query::decode_envelope::<SearchData>(&resp.body)
                .with_context(|| format!("decoding search page {page}"))?;
            if let Some(errors) = errors {
                log::warn!("Page {page} reported errors: {errors}");
            }
            let Some(data) = data else {
                log::warn!("Page {page} carried no data, stopping");
                break;
            };

            let announcements = data.search.announcements;
            if announcements.data.is_empty() {
                break;
            }
            let n = announcements.data.len();
            rows.extend(announcements.data.into_iter().map(ListingRow::from));
            log::debug!("Page {page}: {n} rows ({} total)", rows.len());

            let has_more = announcements.paginator.is_some_and(|p| p.has_more_pages);
            if !has_more || self.options.max_pages.is_some_and(|max| page >= max) {
                break;
            }
            page += 1;
            tokio::time::sleep(self.options.page_delay).await;
        }

        Ok(rows)
    }
}

/// Write rows as CSV with a header line, prefixed with a UTF-8 BOM so
/// spreadsheet tools pick the right encoding.
pub fn write_csv<W: Write>(rows: &[ListingRow], mut writer: W) -> Result<()> {
    writer.write_all("\u{feff}".as_bytes())?;
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record([
            "id",
            "title",
            "slug",
            "createdAt",
            "price",
            "priceUnit",
            "area",
            "city",
            "store",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use scrapeline_core::{HttpResponse, TransportError};
    use serde_json::Value;

    fn listing(v: Value) -> Listing {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn area_from_superficie_entry() {
        let a = listing(json!({
            "id": "1",
            "smallDescription": [
                null,
                {"specification": {"codename": "pieces"}, "valueText": "F3"},
                {"specification": {"codename": "Superficie_Totale"}, "valueText": "120 m²"},
                {"specification": {"codename": "superficie"}, "valueText": "90 m²"}
            ]
        }));
        assert_eq!(ListingRow::from(a).area.as_deref(), Some("120 m²"));
    }

    #[test]
    fn area_missing() {
        let a = listing(json!({"id": "1", "smallDescription": [{"valueText": "x"}]}));
        assert_eq!(ListingRow::from(a).area, None);
        let a = listing(json!({"id": "1"}));
        assert_eq!(ListingRow::from(a).area, None);
    }

    #[test]
    fn row_mapping() {
        let a = listing(json!({
            "id": "38122211",
            "title": "Vente F3",
            "slug": "vente-f3",
            "refreshedAt": "2025-11-02T10:00:00Z",
            "price": 1850,
            "priceUnit": "MILLION",
            "cities": [{"name": "Alger"}, {"name": "Bab Ezzouar"}],
            "store": {"name": "Agence"}
        }));
        let row = ListingRow::from(a);
        assert_eq!(row.created_at.as_deref(), Some("2025-11-02T10:00:00Z"));
        assert_eq!(row.price.as_deref(), Some("1850"));
        assert_eq!(row.city, "Alger, Bab Ezzouar");
        assert_eq!(row.store.as_deref(), Some("Agence"));
    }

    #[test]
    fn csv_header_uses_wire_names() {
        let row = ListingRow {
            id: Some("1".into()),
            title: Some("t".into()),
            slug: None,
            created_at: Some("2025".into()),
            price: None,
            price_unit: None,
            area: None,
            city: "Oran".into(),
            store: None,
        };
        let mut out = Vec::new();
        write_csv(&[row], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("\u{feff}id,title,slug,createdAt,price,priceUnit,area,city,store")
        );
        assert_eq!(lines.next(), Some("1,t,,2025,,,,Oran,"));
    }

    #[test]
    fn empty_csv_still_has_header() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("createdAt"));
    }

    struct Pages {
        replies: Mutex<VecDeque<HttpResponse>>,
        requested: Mutex<Vec<u64>>,
    }

    impl Transport for &Pages {
        fn proxy_count(&self) -> usize {
            0
        }

        async fn post_json(
            &self,
            body: Vec<u8>,
            _proxy: Option<usize>,
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            let body: Value = serde_json::from_slice(&body).unwrap();
            let page = body["variables"]["filter"]["page"].as_u64().unwrap();
            self.requested.lock().unwrap().push(page);
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or(HttpResponse {
                status: 500,
                body: b"exhausted".to_vec(),
            }))
        }
    }

    fn page(ids: &[&str], more: bool) -> HttpResponse {
        let data: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        let body = json!({"data": {"search": {"announcements": {
            "data": data,
            "paginatorInfo": {"hasMorePages": more, "lastPage": 9}
        }}}});
        HttpResponse {
            status: 200,
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn pages(replies: Vec<HttpResponse>) -> Pages {
        Pages {
            replies: Mutex::new(replies.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn never() -> &'static AtomicBool {
        Box::leak(Box::new(AtomicBool::new(false)))
    }

    fn ids(rows: &[ListingRow]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.id.as_deref()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_no_more_pages() {
        let t = pages(vec![page(&["1", "2"], true), page(&["3"], false)]);
        let crawler = ListingCrawler::new(&t, CrawlOptions::default(), never());
        let rows = crawler.crawl().await.unwrap();
        assert_eq!(ids(&rows), vec!["1", "2", "3"]);
        assert_eq!(*t.requested.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_empty_page() {
        let t = pages(vec![page(&["1"], true), page(&[], true)]);
        let crawler = ListingCrawler::new(&t, CrawlOptions::default(), never());
        assert_eq!(ids(&crawler.crawl().await.unwrap()), vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_server_error_keeping_rows() {
        let t = pages(vec![page(&["1"], true)]);
        let crawler = ListingCrawler::new(&t, CrawlOptions::default(), never());
        assert_eq!(ids(&crawler.crawl().await.unwrap()), vec!["1"]);
        assert_eq!(*t.requested.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_max_pages() {
        let t = pages(vec![page(&["1"], true), page(&["2"], true)]);
        let options = CrawlOptions {
            max_pages: Some(1),
            ..Default::default()
        };
        let crawler = ListingCrawler::new(&t, options, never());
        assert_eq!(ids(&crawler.crawl().await.unwrap()), vec!["1"]);
    }

    #[test]
    fn headers_carry_referer_and_timestamp() {
        let h = browser_headers("immobilier");
        assert_eq!(h["referer"], "https://www.ouedkniss.com/immobilier/1");
        assert_eq!(h["x-app-version"], "3.3.70");
        assert!(h["x-track-timestamp"].to_str().unwrap().parse::<i64>().is_ok());
    }
}
