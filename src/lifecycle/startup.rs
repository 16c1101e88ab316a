//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble one service from its config section: storage, seed data, routes
//! - Initialize span export and metrics
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::shutdown::Shutdown;
use super::signals;
use crate::config::{ConfigError, LedgerConfig, ManagerConfig, ReceiverConfig, SenderConfig};
use crate::error::LedgerError;
use crate::http::manager::{self, ManagerState};
use crate::http::probe::{self, ReceiverState, SenderState};
use crate::http::visits::{self, VisitsState};
use crate::http::ServiceServer;
use crate::ledger::{schema, CounterClient, Ledger, SequentialIds};
use crate::observability::{metrics, Telemetry, TelemetryError};
use crate::probe::{receiver::PLAYLISTS, Receiver, Sender};
use crate::propagation::Tracer;
use crate::rates::{RateLedger, ADVERTISEMENT_RATE};
use crate::storage::{MemorySession, SessionHandle};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("failed to seed storage: {0}")]
    Seed(#[from] LedgerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// The four deployable services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Service {
    Manager,
    Visits,
    Sender,
    Receiver,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::Manager => "manager",
            Service::Visits => "visits",
            Service::Sender => "sender",
            Service::Receiver => "receiver",
        }
    }

    /// Name reported as the span resource's `service.name`.
    pub fn resource_name(&self) -> String {
        format!("{} microservice", self.name())
    }

    pub fn bind_address<'a>(&self, config: &'a LedgerConfig) -> &'a str {
        match self {
            Service::Manager => &config.manager.bind_address,
            Service::Visits => &config.visits.bind_address,
            Service::Sender => &config.sender.bind_address,
            Service::Receiver => &config.receiver.bind_address,
        }
    }
}

pub async fn manager_server(
    config: &ManagerConfig,
    tracer: Tracer,
) -> Result<ServiceServer, StartupError> {
    let memory = MemorySession::new();
    for table in schema::TABLES {
        memory.create_table(table);
    }
    let ledger = Ledger::new(
        SessionHandle::new(memory),
        Arc::new(SequentialIds::new()),
        Arc::new(CounterClient::new(config.visits_url.as_str())),
    );
    for (site, pricing) in &config.sites {
        ledger.seed_site(site, *pricing).await?;
    }
    for (advertiser, amount) in &config.budgets {
        ledger.credit_budget(advertiser, *amount).await?;
    }
    Ok(ServiceServer::new(
        Service::Manager.name(),
        manager::router(ManagerState { ledger, tracer }),
    ))
}

pub fn visits_server(tracer: Tracer) -> ServiceServer {
    let memory = MemorySession::new();
    memory.create_table(ADVERTISEMENT_RATE);
    let rates = RateLedger::new(SessionHandle::new(memory));
    ServiceServer::new(
        Service::Visits.name(),
        visits::router(VisitsState { rates, tracer }),
    )
}

pub fn sender_server(config: &SenderConfig, tracer: Tracer) -> ServiceServer {
    let sender = Sender::new(config.receiver_url.as_str());
    ServiceServer::new(
        Service::Sender.name(),
        probe::sender_router(SenderState { sender, tracer }),
    )
}

pub async fn receiver_server(
    config: &ReceiverConfig,
    tracer: Tracer,
) -> Result<ServiceServer, StartupError> {
    let memory = MemorySession::new();
    memory.create_table(PLAYLISTS);
    let receiver = Receiver::new(SessionHandle::new(memory));
    receiver.seed(&config.playlists).await?;
    Ok(ServiceServer::new(
        Service::Receiver.name(),
        probe::receiver_router(ReceiverState { receiver, tracer }),
    ))
}

/// Build the server for `service` from its config section.
pub async fn build(
    service: Service,
    config: &LedgerConfig,
    tracer: Tracer,
) -> Result<ServiceServer, StartupError> {
    match service {
        Service::Manager => manager_server(&config.manager, tracer).await,
        Service::Visits => Ok(visits_server(tracer)),
        Service::Sender => Ok(sender_server(&config.sender, tracer)),
        Service::Receiver => receiver_server(&config.receiver, tracer).await,
    }
}

/// Run `service` until SIGINT/SIGTERM, then flush pending spans.
pub async fn launch(service: Service, config: LedgerConfig) -> Result<(), StartupError> {
    let telemetry = Telemetry::init(&config.observability, &service.resource_name())?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = build(service, &config, telemetry.tracer()).await?;

    let address = service.bind_address(&config);
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })?;
    tracing::info!(service = service.name(), address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(Arc::clone(&shutdown));

    let served = server.run(listener, shutdown.subscribe()).await;

    if let Err(e) = tokio::task::spawn_blocking(move || telemetry.shutdown()).await {
        tracing::error!(error = %e, "Span exporter flush task failed");
    }
    served?;
    tracing::info!(service = service.name(), "Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(Service::Visits.resource_name(), "visits microservice");
        let config = LedgerConfig::default();
        assert_eq!(Service::Manager.bind_address(&config), "0.0.0.0:8081");
        assert_eq!(Service::Receiver.bind_address(&config), "0.0.0.0:8083");
    }
}
