use crate::config::{Environment, LogLevel};
use opentelemetry::global;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Uses RUST_LOG environment variable for filtering, falling back to the
/// configured log level.
///
/// Spans are bridged to OpenTelemetry through a layer bound to the named
/// global tracer, so they reach the OTLP provider installed by
/// `common::TelemetryGuard::init` (call it before this). Without a guard the
/// global tracer stays a no-op and spans are formatted locally only.
pub fn setup_logging(service_name: &str, log_level: LogLevel, environment: Environment) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.as_str().into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer(service_name));

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}

/// The bare `tracing_opentelemetry::layer()` is pinned to a noop tracer and
/// never consults the global provider; binding the named global tracer here
/// is what routes spans to the configured exporter.
fn otel_layer<S>(service_name: &str) -> OpenTelemetryLayer<S, global::BoxedTracer>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_opentelemetry::layer().with_tracer(global::tracer(service_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;

    #[test]
    fn span_layer_is_bound_to_the_global_tracer() {
        let layer = otel_layer::<Registry>("common-test");
        let type_name = std::any::type_name_of_val(&layer);

        assert!(
            !type_name.contains("NoopTracer"),
            "span layer is pinned to the noop tracer: {type_name}"
        );
        assert!(
            type_name.contains("BoxedTracer"),
            "span layer is not bound to the global tracer: {type_name}"
        );
    }
}
