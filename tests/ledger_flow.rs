//! End-to-end tests of the orchestrator talking to the counter service.

use axum::http::StatusCode;
use opentelemetry::trace::SpanKind;
use serde_json::{json, Value};

use ad_ledger::lifecycle::startup::visits_server;

mod common;

use common::{eventually, find_span, in_memory_tracer, spawn, spawn_manager};

#[tokio::test]
async fn test_create_ad_then_bump_and_query() {
    let (tracer, _exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;
    let client = reqwest::Client::new();

    let res = client
        .post(manager.server.endpoint("/create_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("active_to", "week")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok", "reason": ""}));

    eventually(|| manager.budget("acme") == 900 && manager.ad_rows().len() == 1).await;
    let ad = &manager.ad_rows()[0];
    assert_eq!(ad.get_int("rate_id").unwrap(), 100);
    assert_eq!(ad.get_date("active_to").unwrap().to_string(), "2024-01-08");

    let res = client
        .post(visits.endpoint("/bump_up/100"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bumps: i64 = client
        .get(visits.endpoint("/query_bumps/100"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bumps, 1);

    let lines: Vec<String> = client
        .get(manager.server.endpoint("/query_bumps/acme"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        lines,
        vec!["ad_id=1, advertiser=acme, site=google.com, active_to=2024-01-08, rate_id=100, bumps=1"]
    );
}

#[tokio::test]
async fn test_rejected_requests() {
    let (tracer, _exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;
    let client = reqwest::Client::new();

    let cases = [
        vec![("advertiser", "acme"), ("site", "bing.com"), ("active_to", "week")],
        vec![("advertiser", "acme"), ("site", "google.com"), ("active_to", "fortnight")],
        vec![
            ("advertiser", "acme"),
            ("site", "google.com"),
            ("active_to", "day"),
            ("classic_tracing", "true"),
            ("otel_tracing", "true"),
        ],
    ];
    for query in cases {
        let res = client
            .post(manager.server.endpoint("/create_ad"))
            .query(&query)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{:?}", query);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "error");
    }

    let res = client
        .post(manager.server.endpoint("/create_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("active_to", "fortnight")])
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["reason"],
        "unsupported active_to value (not any of <day>, <week>, <month>, <year>)"
    );

    assert_eq!(manager.budget("acme"), 1000);
    assert!(manager.ad_rows().is_empty());
}

#[tokio::test]
async fn test_otel_request_spans_both_services() {
    let (tracer, exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;

    let res = reqwest::Client::new()
        .post(manager.server.endpoint("/create_ad"))
        .query(&[
            ("advertiser", "acme"),
            ("site", "google.com"),
            ("active_to", "day"),
            ("otel_tracing", "true"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    eventually(|| find_span(&exporter, "create_ad", SpanKind::Server).is_some()).await;
    let root = find_span(&exporter, "create_ad", SpanKind::Server).unwrap();
    let call = find_span(&exporter, "init_rate", SpanKind::Internal).unwrap();
    let remote = find_span(&exporter, "init_rate", SpanKind::Server).unwrap();
    let pricing = find_span(&exporter, "query_pricing", SpanKind::Client).unwrap();

    let trace_id = root.span_context.trace_id();
    assert_eq!(call.span_context.trace_id(), trace_id);
    assert_eq!(remote.span_context.trace_id(), trace_id);
    assert_eq!(call.parent_span_id, root.span_context.span_id());
    assert_eq!(remote.parent_span_id, call.span_context.span_id());
    assert_eq!(pricing.parent_span_id, root.span_context.span_id());

    let stored = find_span(&exporter, "add_rate", SpanKind::Client).unwrap();
    assert_eq!(stored.parent_span_id, remote.span_context.span_id());
}

#[tokio::test]
async fn test_untraced_request_creates_no_spans() {
    let (tracer, exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;

    let res = reqwest::Client::new()
        .post(manager.server.endpoint("/create_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("active_to", "month")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    eventually(|| manager.ad_rows().len() == 1).await;

    assert!(exporter.get_finished_spans().unwrap().is_empty());
}

#[tokio::test]
async fn test_resetup_moves_ad_to_fresh_rate() {
    let (tracer, _exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;
    let client = reqwest::Client::new();

    client
        .post(manager.server.endpoint("/create_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("active_to", "year")])
        .send()
        .await
        .unwrap();
    eventually(|| manager.ad_rows().len() == 1).await;
    let ad_id = manager.ad_rows()[0].get_int("id").unwrap().to_string();

    client
        .post(visits.endpoint("/bump_up/100"))
        .send()
        .await
        .unwrap();

    let res = client
        .post(manager.server.endpoint("/resetup_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("ad_id", ad_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    assert_eq!(manager.ad_rows()[0].get_int("rate_id").unwrap(), 101);

    let old = client
        .get(visits.endpoint("/query_bumps/100"))
        .send()
        .await
        .unwrap();
    assert_eq!(old.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let fresh: i64 = client
        .get(visits.endpoint("/query_bumps/101"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fresh, 0);

    let missing = client
        .post(manager.server.endpoint("/resetup_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("ad_id", "42")])
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["reason"], "no such ad");
}

#[tokio::test]
async fn test_bump_unknown_rate_is_rejected() {
    let (tracer, _exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer)).await;

    let res = reqwest::Client::new()
        .post(visits.endpoint("/bump_up/7"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "error", "reason": "no such rate"}));
}

#[tokio::test]
async fn test_flag_values_other_than_true_mean_off() {
    let (tracer, exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;
    let client = reqwest::Client::new();

    for value in ["yes", "True", "1", ""] {
        let res = client
            .post(manager.server.endpoint("/create_ad"))
            .query(&[
                ("advertiser", "acme"),
                ("site", "google.com"),
                ("active_to", "day"),
                ("otel_tracing", value),
                ("classic_tracing", value),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{:?}", value);
    }
    eventually(|| manager.ad_rows().len() == 4).await;
    assert!(exporter.get_finished_spans().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_parameters_render_status_payload() {
    let (tracer, _exporter, _provider) = in_memory_tracer();
    let visits = spawn(visits_server(tracer.clone())).await;
    let manager = spawn_manager(&visits.url, tracer).await;
    let client = reqwest::Client::new();

    let res = client
        .post(manager.server.endpoint("/create_ad"))
        .query(&[("site", "google.com"), ("active_to", "day")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["reason"].as_str().unwrap().contains("advertiser"));

    let res = client
        .post(manager.server.endpoint("/resetup_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("ad_id", "first")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");

    let res = client
        .post(visits.endpoint("/bump_up/seven"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_unreachable_counter_fails_create_after_debit() {
    let (tracer, _exporter, _provider) = in_memory_tracer();
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);
    let manager = spawn_manager(&dead_url, tracer).await;

    let res = reqwest::Client::new()
        .post(manager.server.endpoint("/create_ad"))
        .query(&[("advertiser", "acme"), ("site", "google.com"), ("active_to", "week")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["reason"].as_str().unwrap().starts_with("downstream call failed"));

    eventually(|| manager.budget("acme") == 900 && manager.ad_rows().len() == 1).await;
    assert_eq!(manager.ad_rows()[0].get_int("rate_id").unwrap(), 100);
}
