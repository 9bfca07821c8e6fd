use crate::{EnrichedRecord, ScrapeError, SeriesRecord};
use futures::{
    future,
    stream::{self, Stream, StreamExt},
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::{collections::BTreeMap, future::Future, time::Duration};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.dongchedi.com/auto/series/";
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("static selector"));

// Vendor image host plus the full-width size token.
static IMAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"dcarimg\.com.*~1200x0").expect("static pattern"));

/// Detail page of a series. Also used as the link in posted messages.
pub fn series_url(base_url: &str, id: &str) -> String {
    format!("{base_url}{id}")
}

/// `//host/path` becomes `https://host/path`; anything else is returned as is.
pub fn normalize_image_url(src: &str) -> String {
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_string(),
    }
}

/// First `<img>` whose `src` points at the vendor host with the full-width
/// size token.
pub fn extract_image_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| IMAGE_PATTERN.is_match(src))
        .map(normalize_image_url)
}

/// Runs `f` over `items` with at most `width` futures in flight. A slot frees
/// up as soon as its future finishes, even if earlier items are still
/// pending; results are held back and emitted in input order.
pub fn map_ordered<I, F, Fut>(items: I, width: usize, mut f: F) -> impl Stream<Item = Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .enumerate()
        .map(move |(index, item)| {
            let fut = f(item);
            async move { (index, fut.await) }
        })
        .buffer_unordered(width.max(1))
        .scan(
            (0usize, BTreeMap::new()),
            |(next, parked), (index, output)| {
                parked.insert(index, output);
                let mut ready = Vec::new();
                while let Some(output) = parked.remove(&*next) {
                    ready.push(output);
                    *next += 1;
                }
                future::ready(Some(stream::iter(ready)))
            },
        )
        .flatten()
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Successful rows, in input order.
    pub enriched: Vec<EnrichedRecord>,
    /// Rows that produced no image URL.
    pub dropped: usize,
}

impl ScrapeReport {
    pub fn total(&self) -> usize {
        self.enriched.len() + self.dropped
    }
}

pub struct Scraper {
    client: Client,
    base_url: Url,
    concurrent_requests: usize,
}

impl Scraper {
    pub fn new(
        base_url: &str,
        concurrent_requests: usize,
        timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?,
            base_url: Url::parse(base_url)?,
            concurrent_requests: concurrent_requests.max(1),
        })
    }

    pub fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    /// Fetches every record's detail page through the bounded pool and keeps
    /// the rows that resolved to an image, in input order.
    pub async fn scrape(&self, records: Vec<SeriesRecord>) -> ScrapeReport {
        let total = records.len();
        let mut report = ScrapeReport::default();

        let mut results = Box::pin(map_ordered(records, self.concurrent_requests, |record| {
            self.resolve(record)
        }));

        let mut done = 0;
        while let Some((record, image_url)) = results.next().await {
            done += 1;
            match image_url {
                Some(image_url) => report.enriched.push(EnrichedRecord { record, image_url }),
                None => report.dropped += 1,
            }
            if done % 50 == 0 || done == total {
                info!(done, total, "progress");
            }
        }

        report
    }

    async fn resolve(&self, record: SeriesRecord) -> (SeriesRecord, Option<String>) {
        let image_url = self.fetch_image(&record).await;
        (record, image_url)
    }

    /// Resolves the record's image URL. Any failure is logged and reported
    /// as `None`.
    pub async fn fetch_image(&self, record: &SeriesRecord) -> Option<String> {
        match self.try_fetch_image(&record.id).await {
            Ok(url) => {
                debug!(id = %record.id, %url, "found image");
                Some(url)
            }
            Err(e) => {
                debug!(id = %record.id, error = %e, "no image, dropping row");
                None
            }
        }
    }

    async fn try_fetch_image(&self, id: &str) -> Result<String, ScrapeError> {
        let body = self.fetch_page(id).await?;
        extract_image_url(&body).ok_or(ScrapeError::ImageNotFound)
    }

    async fn fetch_page(&self, id: &str) -> Result<String, ScrapeError> {
        let res = self
            .client
            .get(series_url(self.base_url.as_str(), id))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ScrapeError::Status(res.status()));
        }

        Ok(res.text().await?)
    }
}
