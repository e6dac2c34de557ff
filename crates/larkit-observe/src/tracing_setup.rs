//! Global tracing subscriber: a fmt layer filtered by `RUST_LOG` or the
//! CLI's verbosity, plus an optional OpenTelemetry bridge.
//!
//! ```no_run
//! larkit_observe::tracing_setup::init_tracing("info", false).unwrap();
//! // ... run ...
//! larkit_observe::tracing_setup::shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Instrumentation scope name for exported spans.
pub const SERVICE_NAME: &str = "larkit";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber.
///
/// With `enable_otel`, spans are additionally exported through a stdout
/// span exporter; swap it for OTLP when shipping spans to a collector.
///
/// # Errors
///
/// Fails on an unparseable filter or when a subscriber is already installed.
pub fn init_tracing(default_filter: &str, enable_otel: bool) -> Result<(), BoxError> {
    let filter = resolve_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default_filter)?;

    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(SERVICE_NAME);
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// `RUST_LOG` wins over the CLI-chosen default when it is set and non-empty.
fn resolve_filter(env: Option<String>, default_filter: &str) -> Result<EnvFilter, ParseError> {
    match env.filter(|v| !v.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_new(default_filter),
    }
}

/// Flush buffered spans. No-op when OpenTelemetry was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_take_priority() {
        let filter = resolve_filter(Some("larkit_core=trace".into()), "warn").unwrap();
        assert_eq!(filter.to_string(), "larkit_core=trace");
    }

    #[test]
    fn blank_env_falls_back_to_default() {
        let filter = resolve_filter(Some("  ".into()), "info").unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn shutdown_without_otel_is_a_no_op() {
        shutdown_tracing();
    }
}
