//! Elasticsearch scroll-API source.

use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::{Payload, QueryParams, Record};
use crate::errors::SourceError;
use crate::sources::{RecordStream, Source};

const SCROLL_KEEP_ALIVE: &str = "2m";

/// How the source authenticates against the cluster.
#[derive(Debug, Clone)]
pub enum ElasticsearchAuth {
    /// `Authorization: ApiKey <key>` header.
    ApiKey(String),
    /// HTTP basic auth.
    Basic {
        /// Username.
        user: String,
        /// Password.
        password: String,
    },
}

/// Connection settings for an [`ElasticsearchSource`].
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Search endpoint URL (e.g. `http://host:9200/index/_search`).
    pub url: String,
    /// Hits requested per scroll page.
    pub batch_size: usize,
    /// Cluster credentials.
    pub auth: ElasticsearchAuth,
}

impl ElasticsearchConfig {
    /// Creates a configuration with the default batch size of 1000.
    #[must_use]
    pub fn new(url: impl Into<String>, auth: ElasticsearchAuth) -> Self {
        Self {
            url: url.into(),
            batch_size: 1000,
            auth,
        }
    }

    /// Sets the scroll batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Streams documents out of Elasticsearch via the scroll API.
///
/// Each hit becomes a record keyed by `_id`, with the whole hit document as
/// the payload. Any non-success HTTP response — on the initial search or a
/// scroll continuation — is a fatal stream error.
pub struct ElasticsearchSource {
    config: ElasticsearchConfig,
    client: reqwest::blocking::Client,
    total_fetched: u64,
}

impl ElasticsearchSource {
    /// Creates a source from a configuration.
    #[must_use]
    pub fn new(config: ElasticsearchConfig) -> Self {
        Self {
            config,
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            total_fetched: 0,
        }
    }
}

fn build_query(params: Option<&QueryParams>) -> Result<serde_json::Value, SourceError> {
    let Some(params) = params else {
        return Ok(json!({"query": {"match_all": {}}}));
    };
    if params.match_all {
        return Ok(json!({"query": {"match_all": {}}}));
    }

    match (&params.gte, &params.lte) {
        (Some(gte), Some(lte)) => Ok(json!({
            "query": {
                "range": {
                    "@timestamp": {
                        "gte": gte,
                        "lte": lte,
                        "format": "strict_date_optional_time",
                    }
                }
            }
        })),
        _ => Err(SourceError::Configuration(
            "gte and lte are required unless match_all is set".to_string(),
        )),
    }
}

/// Derives the `/_search/scroll` endpoint from a search URL: strip the
/// `/_search` suffix, then the index segment.
fn scroll_endpoint(search_url: &str) -> String {
    let base = search_url.split("/_search").next().unwrap_or(search_url);
    let base = base.rsplit_once('/').map_or(base, |(head, _)| head);
    format!("{base}/_search/scroll")
}

fn apply_auth(
    request: reqwest::blocking::RequestBuilder,
    auth: &ElasticsearchAuth,
) -> reqwest::blocking::RequestBuilder {
    match auth {
        ElasticsearchAuth::ApiKey(key) => request.header("Authorization", format!("ApiKey {key}")),
        ElasticsearchAuth::Basic { user, password } => {
            request.basic_auth(user, Some(password.as_str()))
        }
    }
}

fn hit_to_record(hit: &serde_json::Value) -> Record {
    let id = hit
        .get("_id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    Record::new(id, Payload::Json(hit.clone()))
}

struct ScrollPage {
    scroll_id: Option<String>,
    hits: VecDeque<serde_json::Value>,
}

fn parse_page(body: serde_json::Value) -> ScrollPage {
    let scroll_id = body
        .get("_scroll_id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let hits = body
        .get("hits")
        .and_then(|hits| hits.get("hits"))
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default()
        .into();
    ScrollPage { scroll_id, hits }
}

fn execute(
    request: reqwest::blocking::RequestBuilder,
) -> Result<serde_json::Value, SourceError> {
    let response = request.send().map_err(|err| SourceError::Http {
        status: 0,
        message: err.to_string(),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            status: status.as_u16(),
            message: response.text().unwrap_or_default(),
        });
    }
    response.json().map_err(|err| SourceError::Http {
        status: 0,
        message: format!("invalid response body: {err}"),
    })
}

struct ScrollStream<'a> {
    client: &'a reqwest::blocking::Client,
    auth: ElasticsearchAuth,
    scroll_url: String,
    page: ScrollPage,
    finished: bool,
    limit: Option<u64>,
    emitted: u64,
    total_fetched: &'a mut u64,
}

impl ScrollStream<'_> {
    fn next_page(&mut self) -> Result<(), SourceError> {
        let Some(scroll_id) = self.page.scroll_id.clone() else {
            self.finished = true;
            return Ok(());
        };

        let body = json!({
            "scroll": SCROLL_KEEP_ALIVE,
            "scroll_id": scroll_id,
        });
        let request = apply_auth(self.client.post(&self.scroll_url), &self.auth).json(&body);
        let page = parse_page(execute(request)?);

        if page.hits.is_empty() {
            self.finished = true;
        }
        debug!(hits = page.hits.len(), "fetched scroll page");
        self.page = page;
        Ok(())
    }
}

impl Iterator for ScrollStream<'_> {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return None;
        }

        while self.page.hits.is_empty() {
            if self.finished {
                return None;
            }
            if let Err(err) = self.next_page() {
                self.finished = true;
                return Some(Err(err));
            }
        }

        let hit = self.page.hits.pop_front()?;
        self.emitted += 1;
        *self.total_fetched += 1;
        Some(Ok(hit_to_record(&hit)))
    }
}

impl Source for ElasticsearchSource {
    fn fetch(&mut self, params: Option<&QueryParams>) -> Result<RecordStream<'_>, SourceError> {
        let query = build_query(params)?;
        info!(url = %self.config.url, batch_size = self.config.batch_size, "starting Elasticsearch scroll");

        let request = apply_auth(self.client.post(&self.config.url), &self.config.auth)
            .query(&[
                ("scroll", SCROLL_KEEP_ALIVE.to_string()),
                ("size", self.config.batch_size.to_string()),
            ])
            .json(&query);
        let page = parse_page(execute(request)?);
        let finished = page.hits.is_empty();

        Ok(Box::new(ScrollStream {
            client: &self.client,
            auth: self.config.auth.clone(),
            scroll_url: scroll_endpoint(&self.config.url),
            page,
            finished,
            limit: params.and_then(|p| p.limit),
            emitted: 0,
            total_fetched: &mut self.total_fetched,
        }))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        info!(total_fetched = self.total_fetched, "Elasticsearch source closed");
        Ok(())
    }
}

impl std::fmt::Debug for ElasticsearchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchSource")
            .field("url", &self.config.url)
            .field("batch_size", &self.config.batch_size)
            .field("total_fetched", &self.total_fetched)
            .finish()
    }
}
