#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    metrics::{Counter, Histogram, MeterProvider as _},
    KeyValue,
};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics::SdkMeterProvider;
#[cfg(feature = "metrics")]
use prometheus::{Encoder, Registry, TextEncoder};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<AdminMetrics> = Lazy::new(AdminMetrics::init);

#[cfg(feature = "metrics")]
pub struct AdminMetrics {
    registry: Registry,
    _provider: SdkMeterProvider,
    pub objects_relocated_total: Counter<u64>,
    pub statements_total: Counter<u64>,
    pub statement_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl AdminMetrics {
    pub fn init() -> Self {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("failed to build prometheus exporter");
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("athena_admin");

        let objects_relocated_total = meter
            .u64_counter("athena_admin_objects_relocated_total")
            .with_description("Objects copied into their partitioned location")
            .build();

        let statements_total = meter
            .u64_counter("athena_admin_statements_total")
            .with_description("Statements submitted to the query engine")
            .build();

        let statement_duration = meter
            .f64_histogram("athena_admin_statement_duration_seconds")
            .with_description("Time until a submitted statement completed")
            .build();

        Self {
            registry,
            _provider: provider,
            objects_relocated_total,
            statements_total,
            statement_duration,
        }
    }

    pub fn record_relocation(&self, table: &str) {
        self.objects_relocated_total
            .add(1, &[KeyValue::new("table", table.to_string())]);
    }

    pub fn record_statement(&self, kind: &'static str, elapsed: std::time::Duration) {
        let attrs = [KeyValue::new("kind", kind)];
        self.statements_total.add(1, &attrs);
        self.statement_duration.record(elapsed.as_secs_f64(), &attrs);
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            log::warn!("failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn relocate_table_span(table: &str) -> Span {
        info_span!("relocate_table", table = %table)
    }

    pub fn statement_span(kind: &'static str, table: &str) -> Span {
        info_span!("execute_statement", kind = kind, table = %table)
    }
}
