pub mod console;

use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::engine::{ProbeResult, ResultSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub url: String,
    pub status: u16,
    pub size: usize,
    pub content: String,
}

impl From<&ProbeResult> for OutputRecord {
    fn from(r: &ProbeResult) -> Self {
        Self {
            url: r.url.clone(),
            status: r.status,
            size: r.size,
            content: r.content.clone(),
        }
    }
}

pub fn render_text(records: &[OutputRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!("[{}] Size: {:<6} URL: {}\n", r.status, r.size, r.url));
    }
    out.into_bytes()
}

pub fn render_json(records: &[OutputRecord]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(records)
}

pub fn render(records: &[OutputRecord], format: OutputFormat) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(records)),
        OutputFormat::Json => render_json(records),
    }
}

/// Counts hits so the caller can report a scan that found nothing.
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: AtomicUsize,
}

impl HitCounter {
    pub fn new_ref() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Relaxed)
    }

    pub fn any(&self) -> bool {
        self.hits() > 0
    }
}

impl ResultSink for HitCounter {
    fn on_result(&self, _result: &ProbeResult) {
        self.hits.fetch_add(1, Relaxed);
    }
}

/// Keeps a copy of every hit for the report file.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<OutputRecord>>,
}

impl CollectingSink {
    pub fn new_ref() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records sorted by URL, since completion order is arbitrary.
    pub fn records(&self) -> Vec<OutputRecord> {
        let mut out = match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        out.sort_by(|a, b| a.url.cmp(&b.url));
        out
    }
}

impl ResultSink for CollectingSink {
    fn on_result(&self, result: &ProbeResult) {
        let record = OutputRecord::from(result);
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
