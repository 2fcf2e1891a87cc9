use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the garagehub service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: GaugeVec,

    // Record store metrics
    pub database_operations_total: CounterVec,
    pub database_operation_duration_seconds: HistogramVec,

    // Blob metrics
    pub blob_operations_total: CounterVec,

    // Business logic metrics
    pub garage_operations_total: CounterVec,
    pub entity_operations_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics instance with all required metrics registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests processed"),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;

        let http_requests_in_flight = GaugeVec::new(
            Opts::new(
                "http_requests_in_flight",
                "Number of HTTP requests currently being processed",
            ),
            &["method", "endpoint"],
        )?;

        let database_operations_total = CounterVec::new(
            Opts::new("database_operations_total", "Total number of record store operations"),
            &["operation", "collection", "status"],
        )?;

        let database_operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "database_operation_duration_seconds",
                "Record store operation duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["operation", "collection"],
        )?;

        let blob_operations_total = CounterVec::new(
            Opts::new("blob_operations_total", "Total number of blob store operations"),
            &["operation", "status"],
        )?;

        let garage_operations_total = CounterVec::new(
            Opts::new("garage_operations_total", "Total number of garage lifecycle operations"),
            &["operation", "status"],
        )?;

        let entity_operations_total = CounterVec::new(
            Opts::new(
                "entity_operations_total",
                "Total number of zone, payment, user and contact operations",
            ),
            &["entity", "operation", "status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(database_operations_total.clone()))?;
        registry.register(Box::new(database_operation_duration_seconds.clone()))?;
        registry.register(Box::new(blob_operations_total.clone()))?;
        registry.register(Box::new(garage_operations_total.clone()))?;
        registry.register(Box::new(entity_operations_total.clone()))?;

        info!("Prometheus metrics initialized successfully");

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            database_operations_total,
            database_operation_duration_seconds,
            blob_operations_total,
            garage_operations_total,
            entity_operations_total,
        })
    }

    /// Get the metrics registry for exposing metrics endpoint
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Record HTTP request metrics
    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    /// Record record store operation metrics
    pub fn record_database_operation(
        &self,
        operation: &str,
        collection: &str,
        success: bool,
        duration_seconds: f64,
    ) {
        self.database_operations_total
            .with_label_values(&[operation, collection, status_label(success)])
            .inc();

        self.database_operation_duration_seconds
            .with_label_values(&[operation, collection])
            .observe(duration_seconds);
    }

    /// Record a blob store or blob delete outcome
    pub fn record_blob_operation(&self, operation: &str, success: bool) {
        self.blob_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    /// Record garage lifecycle metrics
    pub fn record_garage_operation(&self, operation: &str, success: bool) {
        self.garage_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    /// Record a collaborator entity operation
    pub fn record_entity_operation(&self, entity: &str, operation: &str, success: bool) {
        self.entity_operations_total
            .with_label_values(&[entity, operation, status_label(success)])
            .inc();
    }

    /// Increment in-flight requests
    pub fn increment_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .inc();
    }

    /// Decrement in-flight requests
    pub fn decrement_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .dec();
    }
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_http_request_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_http_request("GET", "/api/garages", 200, 0.123);
        metrics.record_http_request("POST", "/api/garages", 201, 0.456);

        let metrics_text = metrics.encode().unwrap();
        assert!(metrics_text.contains("http_requests_total"));
        assert!(metrics_text.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_database_operation_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_database_operation("find_by_id", "garages", true, 0.050);
        metrics.record_database_operation("update", "zones", false, 0.100);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("database_operations_total"));
        assert!(encoded.contains("collection=\"zones\""));
    }

    #[test]
    fn test_business_metrics_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_garage_operation("update", true);
        metrics.record_blob_operation("store", true);
        metrics.record_blob_operation("delete", false);
        metrics.record_entity_operation("Zone", "create", true);

        let failures = metrics
            .blob_operations_total
            .with_label_values(&["delete", "error"])
            .get();
        assert_eq!(failures, 1.0);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("garage_operations_total"));
        assert!(encoded.contains("entity_operations_total"));
    }

    #[test]
    fn test_in_flight_requests() {
        let metrics = Metrics::new().unwrap();

        metrics.increment_in_flight("GET", "/api/garages");
        metrics.increment_in_flight("GET", "/api/garages");
        metrics.decrement_in_flight("GET", "/api/garages");

        let in_flight = metrics
            .http_requests_in_flight
            .with_label_values(&["GET", "/api/garages"])
            .get();
        assert_eq!(in_flight, 1.0);
    }
}
