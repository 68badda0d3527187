use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use crate::engine::{
    self, ClientOptions, EngineError, FilterError, FilterSpec, ProbeCounters, ProbeEngine, SinkRef,
};
use crate::generator::{Generator, TargetOs};

pub const MAX_DEPTH_LIMIT: usize = 64;

#[derive(Clone, Debug)]
pub struct Options {
    pub template: String,
    pub placeholder: String,
    pub os: TargetOs,
    pub max_depth: usize,
    pub custom_file: Option<String>,
    pub status_filters: Vec<String>,
    pub size_filters: Vec<String>,
    pub concurrency: Option<usize>,
    pub timeout_seconds: Option<usize>,
    pub follow_redirects: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            template: String::new(),
            placeholder: engine::DEFAULT_PLACEHOLDER.to_string(),
            os: TargetOs::Linux,
            max_depth: 5,
            custom_file: None,
            status_filters: Vec::new(),
            size_filters: Vec::new(),
            concurrency: None,
            timeout_seconds: None,
            follow_redirects: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid max_depth {value}, expected 1..={max}")]
    InvalidMaxDepth { value: usize, max: usize },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Clone, Debug)]
pub struct ScanSummary {
    pub payloads: usize,
    pub hits: usize,
    pub counters: ProbeCounters,
    pub elapsed: Duration,
}

/// Validated scan request. Nothing touches the network until `run`.
#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
    filters: FilterSpec,
    generator: Generator,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.max_depth == 0 || options.max_depth > MAX_DEPTH_LIMIT {
            return Err(RunnerError::InvalidMaxDepth {
                value: options.max_depth,
                max: MAX_DEPTH_LIMIT,
            });
        }
        engine::validate_template(&options.template, &options.placeholder)?;
        let filters = FilterSpec::parse(&options.status_filters, &options.size_filters)?;
        let generator = Generator::new(
            options.os,
            options.max_depth,
            options.custom_file.as_deref(),
        );
        Ok(Self {
            options,
            filters,
            generator,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn payloads(&self) -> Vec<String> {
        self.generator.payloads()
    }

    /// Runs the whole scan, feeding every hit to each of `sinks`.
    pub async fn run(&self, sinks: Vec<SinkRef>) -> Result<ScanSummary, RunnerError> {
        let started_at = Instant::now();

        let payloads = self.payloads();
        let payload_count = payloads.len();
        let client = engine::build_client(&ClientOptions {
            timeout_seconds: self.options.timeout_seconds,
            follow_redirects: self.options.follow_redirects,
        })?;

        let mut probe = ProbeEngine::new(
            &self.options.template,
            &self.options.placeholder,
            payloads,
            self.filters.clone(),
            client,
        )?
        .with_concurrency(self.options.concurrency);
        for sink in sinks {
            probe.add_sink(sink);
        }

        info!(
            "scanning {} with {} payload(s) across {} file(s)",
            self.options.template,
            payload_count,
            self.generator.target_files().len()
        );
        probe.run().await;

        let counters = probe.counters();
        let elapsed = started_at.elapsed();
        info!(
            "scan complete: {} hit(s), {} transport failure(s) in {:?}",
            counters.hits, counters.transport_failures, elapsed
        );
        Ok(ScanSummary {
            payloads: payload_count,
            hits: counters.hits,
            counters,
            elapsed,
        })
    }
}
