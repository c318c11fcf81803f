//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! The host calls [`init_tracing`] once at startup and keeps the returned
//! guard alive for the life of the process; dropping it flushes any
//! buffered OTel spans.
//!
//! ```no_run
//! let _guard = kindred_observe::tracing_setup::init_tracing(
//!     kindred_observe::tracing_setup::OtelExport::Disabled,
//! ).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where OpenTelemetry spans go, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtelExport {
    /// Structured logs only, no span export.
    Disabled,
    /// Span export to stdout, for local development. Swap the exporter for
    /// OTLP in production.
    Stdout,
}

/// Keeps the OTel tracer provider alive; dropping it flushes and shuts the
/// provider down. Holds nothing when export is disabled.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Warning: OTel tracer provider shutdown error: {e}");
            }
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Installs a structured `fmt` layer with target visibility and span close
/// timing, filtered by `RUST_LOG` (`EnvFilter::from_default_env()`). With
/// [`OtelExport::Stdout`], tracing spans are additionally bridged to
/// OpenTelemetry.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(export: OtelExport) -> Result<TracingGuard, Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let env_filter = EnvFilter::from_default_env();

    match export {
        OtelExport::Stdout => {
            let provider = SdkTracerProvider::builder()
                .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                .build();
            let tracer = provider.tracer("kindred");
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

            opentelemetry::global::set_tracer_provider(provider.clone());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(otel_layer)
                .try_init()?;

            Ok(TracingGuard {
                provider: Some(provider),
            })
        }
        OtelExport::Disabled => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;

            Ok(TracingGuard { provider: None })
        }
    }
}
