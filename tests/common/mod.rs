//! Shared utilities for the multi-service integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::trace::{SpanKind, TracerProvider as _};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::net::TcpListener;

use ad_ledger::http::manager::{self, ManagerState};
use ad_ledger::ledger::{schema, CounterClient, Ledger, SequentialIds};
use ad_ledger::propagation::Tracer;
use ad_ledger::storage::{Clock, MemorySession, SessionHandle};
use ad_ledger::{ServiceServer, Shutdown};

/// A server running on an ephemeral port. Dropping it stops the server.
pub struct TestServer {
    pub url: String,
    _shutdown: Shutdown,
}

impl TestServer {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

pub async fn spawn(server: ServiceServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    TestServer {
        url,
        _shutdown: shutdown,
    }
}

/// Tracer whose finished spans are kept in memory. Keep the provider alive
/// for as long as spans are expected.
pub fn in_memory_tracer() -> (Tracer, InMemorySpanExporter, SdkTracerProvider) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (provider.tracer("integration"), exporter, provider)
}

pub fn find_span(exporter: &InMemorySpanExporter, name: &str, kind: SpanKind) -> Option<SpanData> {
    exporter
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .find(|s| s.name == name && s.span_kind == kind)
}

/// Poll `check` until it holds; best-effort writes land after the reply.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// An orchestrator whose storage stays inspectable from the test.
pub struct ManagerHarness {
    pub server: TestServer,
    pub memory: MemorySession,
}

/// Spawn an orchestrator calling the counter service at `visits_url`, with
/// `google.com` priced at 100 and `acme` credited 1000.
pub async fn spawn_manager(visits_url: &str, tracer: Tracer) -> ManagerHarness {
    let memory = MemorySession::new().with_clock(Clock::Fixed(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ));
    for table in schema::TABLES {
        memory.create_table(table);
    }
    let ledger = Ledger::new(
        SessionHandle::new(memory.clone()),
        Arc::new(SequentialIds::starting_at(1, 100)),
        Arc::new(CounterClient::new(visits_url)),
    );
    ledger.seed_site("google.com", 100).await.unwrap();
    ledger.credit_budget("acme", 1000).await.unwrap();

    let server = ServiceServer::new(
        "manager",
        manager::router(ManagerState { ledger, tracer }),
    );
    ManagerHarness {
        server: spawn(server).await,
        memory,
    }
}

impl ManagerHarness {
    pub fn budget(&self, advertiser: &str) -> i64 {
        self.memory
            .dump(schema::ADVERTISER.name)
            .unwrap()
            .into_iter()
            .find(|row| row.get_text("name").unwrap() == advertiser)
            .map(|row| row.get_int("budget").unwrap())
            .unwrap()
    }

    pub fn ad_rows(&self) -> Vec<ad_ledger::storage::Row> {
        self.memory.dump(schema::ADVERTISEMENT.name).unwrap()
    }
}
