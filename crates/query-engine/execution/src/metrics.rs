//! Metrics setup and update for query execution.

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// The collection of all metrics exposed through the `/metrics` endpoint.
#[derive(Debug, Clone)]
pub struct Metrics {
    queries_total: IntCounter,
    queries_forbidden_total: IntCounter,
    cache_hits_total: IntCounter,
    query_execution_time: Histogram,
}

impl Metrics {
    /// Set up counters and gauges used to produce Prometheus metrics
    pub fn initialize(metrics_registry: &mut Registry) -> Result<Self, prometheus::Error> {
        let queries_total = add_int_counter_metric(
            metrics_registry,
            "cypher_compiler_queries_total",
            "Total successful queries.",
        )?;
        let queries_forbidden_total = add_int_counter_metric(
            metrics_registry,
            "cypher_compiler_queries_forbidden_total",
            "Queries rejected by an authorization guard.",
        )?;
        let cache_hits_total = add_int_counter_metric(
            metrics_registry,
            "cypher_compiler_cache_hits_total",
            "Statements answered from the request cache.",
        )?;
        let query_execution_time = add_histogram_metric(
            metrics_registry,
            "cypher_compiler_query_execution_time",
            "Time taken to execute a statement against the database.",
        )?;
        Ok(Self {
            queries_total,
            queries_forbidden_total,
            cache_hits_total,
            query_execution_time,
        })
    }

    pub fn record_successful_query(&self) {
        self.queries_total.inc();
    }

    pub fn record_forbidden_query(&self) {
        self.queries_forbidden_total.inc();
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.inc();
    }

    pub fn time_query_execution(&self) -> prometheus::HistogramTimer {
        self.query_execution_time.start_timer()
    }

    pub fn queries_total(&self) -> u64 {
        self.queries_total.get()
    }

    pub fn cache_hits_total(&self) -> u64 {
        self.cache_hits_total.get()
    }

    pub fn queries_forbidden_total(&self) -> u64 {
        self.queries_forbidden_total.get()
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<IntCounter, prometheus::Error> {
    let int_counter = IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    register_collector(metrics_registry, int_counter)
}

/// Create a new histogram metric using the default buckets, and register it with the provided
/// Prometheus Registry.
fn add_histogram_metric(
    metrics_registry: &mut Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<Histogram, prometheus::Error> {
    let histogram = Histogram::with_opts(HistogramOpts::new(metric_name, metric_description))?;
    register_collector(metrics_registry, histogram)
}

/// Register a new collector with the registry, and returns it for later use.
fn register_collector<Collector: prometheus::core::Collector + std::clone::Clone + 'static>(
    metrics_registry: &mut Registry,
    collector: Collector,
) -> Result<Collector, prometheus::Error> {
    metrics_registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}
