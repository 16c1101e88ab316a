//! Span export setup.
//!
//! # Responsibilities
//! - Build the tracer provider each service creates its spans with
//! - Export spans over OTLP/HTTP when an endpoint is configured
//! - Flush pending spans on shutdown
//!
//! # Design Decisions
//! - The provider is owned by the process, never installed globally; the
//!   tracer is handed to handlers through their state
//! - W3C trace context is the only propagation format (see `propagation`)

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{Sampler, SdkTracerProvider},
    Resource,
};

use crate::config::ObservabilityConfig;
use crate::propagation::Tracer;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),
}

/// Owns the tracer provider for the lifetime of a service process.
pub struct Telemetry {
    provider: SdkTracerProvider,
    service_name: String,
}

impl Telemetry {
    pub fn init(config: &ObservabilityConfig, service_name: &str) -> Result<Self, TelemetryError> {
        let resource = Resource::builder()
            .with_service_name(service_name.to_string())
            .build();
        let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.sample_ratio,
        )));

        let mut builder = SdkTracerProvider::builder()
            .with_resource(resource)
            .with_sampler(sampler);

        match &config.otlp_endpoint {
            Some(endpoint) => {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .with_endpoint(endpoint.clone())
                    .build()?;
                builder = builder.with_batch_exporter(exporter);
                tracing::info!(service = service_name, endpoint = %endpoint, "Span export enabled");
            }
            None => {
                tracing::info!(
                    service = service_name,
                    "No OTLP endpoint configured, spans are propagated but not exported"
                );
            }
        }

        Ok(Self {
            provider: builder.build(),
            service_name: service_name.to_string(),
        })
    }

    pub fn tracer(&self) -> Tracer {
        self.provider.tracer(self.service_name.clone())
    }

    /// Flush and stop the exporter.
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::error!(error = ?e, "Error shutting down tracer provider");
        } else {
            tracing::debug!("Tracer provider shutdown complete");
        }
    }
}
