//! Structured logging + optional OpenTelemetry export, ported from the
//! teacher's telemetry setup. Falls back to plain console logging when
//! no collector endpoint is configured.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use opentelemetry::global;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{TonicExporterBuilder, WithExportConfig};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Config as OtelTraceConfig;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

static METER: OnceLock<SdkMeterProvider> = OnceLock::new();

/// Initialize the global tracing subscriber. With no endpoint, logs go to
/// the console only; with one configured, spans/metrics are additionally
/// exported over OTLP and console output stays on only if `console` is set.
pub fn init_telemetry(endpoint: &Option<String>, console: bool) {
    let Some(endpoint) = endpoint else {
        Registry::default()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(tracing_subscriber::fmt::layer())
            .init();
        return;
    };

    let service_resource = Resource::new(vec![
        KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ]);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(build_tonic_exporter(endpoint))
        .with_trace_config(OtelTraceConfig::default().with_resource(service_resource.clone()))
        .install_batch(runtime::Tokio)
        .context("failed to install OTLP tracer")
        .unwrap();

    let meter = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(build_tonic_exporter(endpoint))
        .with_resource(service_resource)
        .build()
        .context("failed to install OTLP meter")
        .unwrap();
    METER.set(meter.clone()).ok();

    global::set_text_map_propagator(TraceContextPropagator::new());

    let registry = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(OpenTelemetryLayer::new(tracer))
        .with(MetricsLayer::new(meter));

    if console {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry.init();
    }
}

fn build_tonic_exporter(endpoint: &str) -> TonicExporterBuilder {
    opentelemetry_otlp::new_exporter()
        .tonic()
        .with_timeout(Duration::from_secs(15))
        .with_endpoint(endpoint)
}

pub fn shutdown_meter_provider() {
    if let Some(meter) = METER.get() {
        let _ = meter.shutdown();
    }
}
