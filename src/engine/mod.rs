mod filters;
mod response;

use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, FuturesUnordered};
use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use filters::{split_filter_csv, FilterError, FilterSpec, StatusPattern};
pub use response::is_valid_password_content;

pub const DEFAULT_PLACEHOLDER: &str = "FUZZ";

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("placeholder token must not be empty")]
    EmptyPlaceholder,

    #[error("URL template must contain the placeholder '{placeholder}': {template}")]
    MissingPlaceholder {
        template: String,
        placeholder: String,
    },

    #[error("invalid URL template: {template}: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme '{scheme}', expected http or https")]
    UnsupportedScheme { scheme: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

/// A response that returned 200, passed the filters and looks like a passwd
/// file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub status: u16,
    pub size: usize,
    pub content: String,
}

/// Receives every qualifying result of a scan.
///
/// Sinks are called synchronously from the engine while other requests are
/// still in flight, so implementations keep their own state behind atomics or
/// a mutex.
pub trait ResultSink: Send + Sync {
    fn on_result(&self, result: &ProbeResult);

    /// Called once per payload after its request has finished, failed or not.
    fn on_progress(&self, _finished: usize, _total: usize) {}
}

impl<F> ResultSink for F
where
    F: Fn(&ProbeResult) + Send + Sync,
{
    fn on_result(&self, result: &ProbeResult) {
        self(result)
    }
}

pub type SinkRef = Arc<dyn ResultSink>;

#[derive(Debug, Default)]
struct ProbeStats {
    dispatched: AtomicUsize,
    responded: AtomicUsize,
    transport_failures: AtomicUsize,
    filtered: AtomicUsize,
    signature_mismatch: AtomicUsize,
    hits: AtomicUsize,
}

/// Diagnostic counters of a scan. They never change which results are
/// reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProbeCounters {
    pub dispatched: usize,
    pub responded: usize,
    pub transport_failures: usize,
    pub filtered: usize,
    pub signature_mismatch: usize,
    pub hits: usize,
}

impl ProbeStats {
    fn reset(&self) {
        for counter in [
            &self.dispatched,
            &self.responded,
            &self.transport_failures,
            &self.filtered,
            &self.signature_mismatch,
            &self.hits,
        ] {
            counter.store(0, Relaxed);
        }
    }

    fn snapshot(&self) -> ProbeCounters {
        ProbeCounters {
            dispatched: self.dispatched.load(Relaxed),
            responded: self.responded.load(Relaxed),
            transport_failures: self.transport_failures.load(Relaxed),
            filtered: self.filtered.load(Relaxed),
            signature_mismatch: self.signature_mismatch.load(Relaxed),
            hits: self.hits.load(Relaxed),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout_seconds: Option<usize>,
    pub follow_redirects: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            follow_redirects: true,
        }
    }
}

pub fn build_client(options: &ClientOptions) -> Result<reqwest::Client, EngineError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );

    let redirect_policy = if options.follow_redirects {
        reqwest::redirect::Policy::limited(10)
    } else {
        reqwest::redirect::Policy::none()
    };

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(redirect_policy)
        .danger_accept_invalid_hostnames(true)
        .danger_accept_invalid_certs(true);
    if let Some(secs) = options.timeout_seconds.filter(|s| *s > 0) {
        builder = builder.timeout(Duration::from_secs(secs as u64));
    }

    builder
        .build()
        .map_err(|e| EngineError::HttpClientBuild { source: e })
}

/// Replaces every occurrence of `placeholder` in `template` with `payload`.
pub fn substitute_placeholder(template: &str, placeholder: &str, payload: &str) -> String {
    template.replace(placeholder, payload)
}

/// Checks that a template can be scanned: it carries the placeholder and,
/// once filled in, is an http(s) URL.
pub fn validate_template(template: &str, placeholder: &str) -> Result<(), EngineError> {
    if placeholder.is_empty() {
        return Err(EngineError::EmptyPlaceholder);
    }
    if !template.contains(placeholder) {
        return Err(EngineError::MissingPlaceholder {
            template: template.to_string(),
            placeholder: placeholder.to_string(),
        });
    }
    let probe = substitute_placeholder(template, placeholder, "probe");
    let url = Url::parse(&probe).map_err(|e| EngineError::InvalidTemplate {
        template: template.to_string(),
        source: e,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(EngineError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

/// Sends one GET per payload and reports the responses that look like a
/// leaked password file.
pub struct ProbeEngine {
    template: String,
    placeholder: String,
    payloads: Vec<String>,
    filters: FilterSpec,
    sinks: Vec<SinkRef>,
    client: reqwest::Client,
    concurrency: Option<usize>,
    stats: ProbeStats,
    finished: AtomicUsize,
}

impl ProbeEngine {
    pub fn new(
        template: &str,
        placeholder: &str,
        payloads: Vec<String>,
        filters: FilterSpec,
        client: reqwest::Client,
    ) -> Result<Self, EngineError> {
        validate_template(template, placeholder)?;
        Ok(Self {
            template: template.to_string(),
            placeholder: placeholder.to_string(),
            payloads,
            filters,
            sinks: Vec::new(),
            client,
            concurrency: None,
            stats: ProbeStats::default(),
            finished: AtomicUsize::new(0),
        })
    }

    /// Caps the number of in-flight requests. `None` launches every payload
    /// at once.
    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency.filter(|c| *c > 0);
        self
    }

    pub fn add_sink(&mut self, sink: SinkRef) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: SinkRef) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn payloads(&self) -> &[String] {
        &self.payloads
    }

    pub fn counters(&self) -> ProbeCounters {
        self.stats.snapshot()
    }

    pub fn target_url(&self, payload: &str) -> String {
        substitute_placeholder(&self.template, &self.placeholder, payload)
    }

    /// Resolves once every request has completed or failed. Counters and
    /// progress start from zero on every call.
    pub async fn run(&self) {
        self.stats.reset();
        self.finished.store(0, Relaxed);
        let urls: Vec<String> = self.payloads.iter().map(|p| self.target_url(p)).collect();
        debug!(
            "probing {} url(s), concurrency {}",
            urls.len(),
            self.concurrency
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        );

        match self.concurrency {
            Some(cap) => {
                stream::iter(urls)
                    .map(|url| self.probe(url))
                    .buffer_unordered(cap)
                    .collect::<Vec<()>>()
                    .await;
            }
            None => {
                let mut in_flight: FuturesUnordered<_> =
                    urls.into_iter().map(|url| self.probe(url)).collect();
                while in_flight.next().await.is_some() {}
            }
        }

        debug!("probe finished: {:?}", self.counters());
    }

    async fn probe(&self, url: String) {
        self.stats.dispatched.fetch_add(1, Relaxed);
        if let Some(resp) = response::fetch(&self.client, &url).await {
            self.stats.responded.fetch_add(1, Relaxed);
            self.evaluate(url, resp);
        } else {
            self.stats.transport_failures.fetch_add(1, Relaxed);
        }

        let finished = self.finished.fetch_add(1, Relaxed) + 1;
        for sink in self.sinks.iter() {
            sink.on_progress(finished, self.payloads.len());
        }
    }

    fn evaluate(&self, url: String, resp: response::ProbeResponse) {
        if resp.status != 200 || !self.filters.passes(resp.status, resp.size) {
            self.stats.filtered.fetch_add(1, Relaxed);
            return;
        }
        if !is_valid_password_content(&resp.content) {
            self.stats.signature_mismatch.fetch_add(1, Relaxed);
            return;
        }
        self.stats.hits.fetch_add(1, Relaxed);

        let result = ProbeResult {
            url,
            status: resp.status,
            size: resp.size,
            content: resp.content,
        };
        for sink in self.sinks.iter() {
            sink.on_result(&result);
        }
    }
}
