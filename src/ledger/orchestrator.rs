//! Ledger orchestration: create, query and re-provision advertisements.

use std::sync::Arc;

use super::counter_client::RateCounter;
use super::ids::IdAllocator;
use super::schema::Statements;
use super::types::{AdId, AdRecord, DurationToken, RateId};
use crate::error::{LedgerError, LedgerResult};
use crate::http::response::{Reply, StatusResponse};
use crate::propagation::TraceStrategy;
use crate::storage::{SessionHandle, Value};

pub const NO_SUCH_SITE: &str = "no such site in our pricing list";
pub const NO_SUCH_AD: &str = "no such ad";

/// The orchestrator. Cheap to clone; clones share storage, ids and client.
#[derive(Clone, Debug)]
pub struct Ledger {
    session: SessionHandle,
    statements: Arc<Statements>,
    ids: Arc<dyn IdAllocator>,
    counter: Arc<dyn RateCounter>,
}

impl Ledger {
    pub fn new(
        session: SessionHandle,
        ids: Arc<dyn IdAllocator>,
        counter: Arc<dyn RateCounter>,
    ) -> Self {
        Self {
            session,
            statements: Arc::new(Statements::prepare()),
            ids,
            counter,
        }
    }

    /// Set the pricing of a site.
    pub async fn seed_site(&self, site: &str, pricing: i64) -> LedgerResult<()> {
        let bound = self
            .statements
            .insert_site
            .bind(vec![site.into(), Value::Int(pricing)])?;
        self.session.execute(bound, &TraceStrategy::Untraced).await?;
        tracing::info!(site, pricing, "Site pricing seeded");
        Ok(())
    }

    /// Credit an advertiser's budget.
    pub async fn credit_budget(&self, advertiser: &str, amount: i64) -> LedgerResult<()> {
        let bound = self
            .statements
            .add_budget
            .bind(vec![Value::Int(amount), advertiser.into()])?;
        self.session.execute(bound, &TraceStrategy::Untraced).await?;
        tracing::info!(advertiser, amount, "Budget credited");
        Ok(())
    }

    /// Debit the site's price from the advertiser, store a new advertisement
    /// and ask the counter service to initialize its rate. The counter
    /// service's reply is returned as is.
    pub async fn create_ad(
        &self,
        advertiser: &str,
        site: &str,
        active_to: &str,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Reply<StatusResponse>> {
        let token: DurationToken = active_to.parse()?;

        let date_stmt = self.statements.current_date.bind(Vec::new())?;
        let pricing_stmt = self.statements.query_pricing.bind(vec![site.into()])?;
        let (date, pricing) = tokio::join!(
            self.session.execute(date_stmt, strategy),
            self.session.execute(pricing_stmt, strategy),
        );

        let today = date?
            .one()
            .ok_or_else(|| LedgerError::ServerError("storage returned no current date".into()))?
            .get_date("current_date")?;
        let active_to = token
            .advance(today)
            .ok_or_else(|| LedgerError::ServerError("active_to date out of range".into()))?;

        let pricing = pricing?;
        let pricing = match pricing.one() {
            Some(row) => row.get_int("pricing")?,
            None => {
                tracing::debug!(advertiser, site, "Site has no pricing");
                return Err(LedgerError::NotFound(NO_SUCH_SITE.to_string()));
            }
        };

        // Budget may go negative; there is no rollback if later steps fail.
        let debit = self
            .statements
            .decrease_budget
            .bind(vec![Value::Int(pricing), advertiser.into()])?;
        self.session.execute_best_effort(debit, strategy).discard();

        let ad_id = self.ids.next_ad_id();
        let rate_id = self.ids.next_rate_id();

        let insert = self.statements.create_ad.bind(vec![
            advertiser.into(),
            site.into(),
            ad_id.into(),
            rate_id.into(),
            active_to.into(),
        ])?;
        self.session.execute_best_effort(insert, strategy).discard();

        tracing::info!(
            advertiser,
            site,
            ad_id = %ad_id,
            rate_id = %rate_id,
            active_to = %active_to,
            pricing,
            tracing = strategy.label(),
            "Advertisement created"
        );

        self.counter.init_rate(rate_id, strategy).await
    }

    /// One line per advertisement of `advertiser` whose bump count could be
    /// read. Advertisements whose count query fails are left out.
    pub async fn query_bumps(
        &self,
        advertiser: &str,
        strategy: &TraceStrategy,
    ) -> LedgerResult<Vec<String>> {
        let bound = self.statements.query_ads.bind(vec![advertiser.into()])?;
        let ads = self.session.execute(bound, strategy).await?;

        let mut report = Vec::with_capacity(ads.rows().len());
        for row in ads.rows() {
            let ad = match AdRecord::from_row(row) {
                Ok(ad) => ad,
                Err(e) => {
                    tracing::warn!(advertiser, row = %row, error = %e, "Skipping unreadable advertisement");
                    continue;
                }
            };
            match self.counter.query_bumps(ad.rate_id, strategy).await {
                Ok(bumps) => report.push(ad.describe(bumps)),
                Err(e) => {
                    tracing::warn!(
                        advertiser,
                        ad_id = %ad.ad_id,
                        rate_id = %ad.rate_id,
                        error = %e,
                        "Bumps query failed"
                    );
                }
            }
        }
        Ok(report)
    }

    /// Replace the rate of an existing advertisement: delete the old counter,
    /// point the advertisement at a fresh rate id and initialize it.
    ///
    /// The steps are not atomic. A failure between delete and init leaves the
    /// advertisement pointing at a counter that was never created.
    pub async fn resetup_ad(
        &self,
        advertiser: &str,
        site: &str,
        ad_id: AdId,
        strategy: &TraceStrategy,
    ) -> LedgerResult<StatusResponse> {
        let lookup = self.statements.query_rate_id.bind(vec![
            advertiser.into(),
            site.into(),
            ad_id.into(),
        ])?;
        let current = self.session.execute(lookup, strategy).await?;
        let old_rate = match current.one() {
            Some(row) => RateId(row.get_int("rate_id")?),
            None => return Err(LedgerError::NotFound(NO_SUCH_AD.to_string())),
        };

        log_counter_reply(
            "delete_rate",
            old_rate,
            self.counter.delete_rate(old_rate, strategy).await,
        );

        let new_rate = self.ids.next_rate_id();
        let update = self.statements.update_rate_id.bind(vec![
            new_rate.into(),
            advertiser.into(),
            site.into(),
            ad_id.into(),
        ])?;
        self.session.execute(update, strategy).await?;

        log_counter_reply(
            "init_rate",
            new_rate,
            self.counter.init_rate(new_rate, strategy).await,
        );

        tracing::info!(
            advertiser,
            site,
            ad_id = %ad_id,
            old_rate_id = %old_rate,
            rate_id = %new_rate,
            "Advertisement re-provisioned"
        );
        Ok(StatusResponse::ok())
    }
}

fn log_counter_reply(
    endpoint: &'static str,
    rate_id: RateId,
    reply: LedgerResult<Reply<StatusResponse>>,
) {
    match reply {
        Ok(reply) if reply.status.is_success() => {
            tracing::debug!(endpoint, rate_id = %rate_id, "Counter service accepted request");
        }
        Ok(reply) => {
            tracing::warn!(
                endpoint,
                rate_id = %rate_id,
                status = %reply.status,
                reason = %reply.body.reason,
                "Counter service rejected request"
            );
        }
        Err(e) => {
            tracing::warn!(endpoint, rate_id = %rate_id, error = %e, "Counter service call failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use opentelemetry::trace::SpanKind;

    use crate::ledger::ids::SequentialIds;
    use crate::ledger::schema::{ADVERTISEMENT, TABLES};
    use crate::observability::tracing::test_support::in_memory_tracer;
    use crate::propagation::{CausalContext, SpanScope};
    use crate::storage::{Clock, MemorySession, Row};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Init(RateId),
        Query(RateId),
        Delete(RateId),
    }

    /// Records calls; query_bumps fails for rate ids listed in `failing`.
    #[derive(Debug, Default)]
    struct RecordingCounter {
        calls: Mutex<Vec<Call>>,
        failing: Vec<RateId>,
    }

    impl RecordingCounter {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RateCounter for RecordingCounter {
        async fn init_rate(
            &self,
            rate_id: RateId,
            _strategy: &TraceStrategy,
        ) -> LedgerResult<Reply<StatusResponse>> {
            self.calls.lock().unwrap().push(Call::Init(rate_id));
            Ok(Reply::ok())
        }

        async fn query_bumps(&self, rate_id: RateId, _strategy: &TraceStrategy) -> LedgerResult<i64> {
            self.calls.lock().unwrap().push(Call::Query(rate_id));
            if self.failing.contains(&rate_id) {
                return Err(LedgerError::DownstreamStatus {
                    endpoint: "query_bumps",
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            Ok(rate_id.0 * 10)
        }

        async fn delete_rate(
            &self,
            rate_id: RateId,
            _strategy: &TraceStrategy,
        ) -> LedgerResult<Reply<StatusResponse>> {
            self.calls.lock().unwrap().push(Call::Delete(rate_id));
            Ok(Reply::ok())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    async fn setup(counter: RecordingCounter) -> (Ledger, MemorySession, Arc<RecordingCounter>) {
        let memory = MemorySession::new().with_clock(Clock::Fixed(today()));
        for table in TABLES {
            memory.create_table(table);
        }
        let counter = Arc::new(counter);
        let ledger = Ledger::new(
            SessionHandle::new(memory.clone()),
            Arc::new(SequentialIds::new()),
            counter.clone(),
        );
        ledger.seed_site("google.com", 100).await.unwrap();
        ledger.credit_budget("acme", 1000).await.unwrap();
        (ledger, memory, counter)
    }

    async fn eventually<F: Fn() -> bool>(check: F) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    fn budget(memory: &MemorySession) -> i64 {
        memory.dump("advertiser").unwrap()[0].get_int("budget").unwrap()
    }

    fn ads(memory: &MemorySession) -> Vec<Row> {
        memory.dump(ADVERTISEMENT.name).unwrap()
    }

    #[tokio::test]
    async fn test_create_ad_debits_budget_and_inits_rate() {
        let (ledger, memory, counter) = setup(RecordingCounter::default()).await;

        let reply = ledger
            .create_ad("acme", "google.com", "week", &TraceStrategy::Untraced)
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.is_ok());

        eventually(|| budget(&memory) == 900 && ads(&memory).len() == 1).await;
        let ad = AdRecord::from_row(&ads(&memory)[0]).unwrap();
        assert_eq!(ad.ad_id, AdId(0));
        assert_eq!(ad.rate_id, RateId(0));
        assert_eq!(ad.active_to, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(counter.calls(), vec![Call::Init(RateId(0))]);
    }

    #[tokio::test]
    async fn test_create_ad_rejections_touch_nothing() {
        let (ledger, memory, counter) = setup(RecordingCounter::default()).await;

        let err = ledger
            .create_ad("acme", "google.com", "fortnight", &TraceStrategy::Untraced)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        let err = ledger
            .create_ad("acme", "bing.com", "day", &TraceStrategy::Untraced)
            .await
            .unwrap_err();
        match err {
            LedgerError::NotFound(reason) => assert_eq!(reason, NO_SUCH_SITE),
            other => panic!("unexpected {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(budget(&memory), 1000);
        assert!(ads(&memory).is_empty());
        assert!(counter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_debit_is_not_observed() {
        let (ledger, memory, counter) = setup(RecordingCounter::default()).await;
        memory.inject_failure("decrease_budget");

        let reply = ledger
            .create_ad("acme", "google.com", "day", &TraceStrategy::Untraced)
            .await
            .unwrap();
        assert!(reply.body.is_ok());
        eventually(|| ads(&memory).len() == 1).await;
        assert_eq!(budget(&memory), 1000);
        assert_eq!(counter.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_query_bumps_skips_failed_items() {
        let counter = RecordingCounter {
            failing: vec![RateId(1)],
            ..Default::default()
        };
        let (ledger, memory, _counter) = setup(counter).await;
        ledger.seed_site("yahoo.com", 10).await.unwrap();
        for site in ["google.com", "yahoo.com", "google.com"] {
            ledger
                .create_ad("acme", site, "day", &TraceStrategy::Untraced)
                .await
                .unwrap();
        }
        eventually(|| ads(&memory).len() == 3).await;

        let report = ledger
            .query_bumps("acme", &TraceStrategy::Untraced)
            .await
            .unwrap();
        assert_eq!(
            report,
            vec![
                "ad_id=0, advertiser=acme, site=google.com, active_to=2024-01-02, rate_id=0, bumps=0"
                    .to_string(),
                "ad_id=2, advertiser=acme, site=google.com, active_to=2024-01-02, rate_id=2, bumps=20"
                    .to_string(),
            ]
        );
        assert!(ledger
            .query_bumps("nobody", &TraceStrategy::Untraced)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_query_bumps_skips_unreadable_rows() {
        let (ledger, _memory, _counter) = setup(RecordingCounter::default()).await;
        ledger
            .create_ad("acme", "google.com", "day", &TraceStrategy::Untraced)
            .await
            .unwrap();
        // An upsert on an unknown key leaves a row without active_to.
        let partial = ledger
            .statements
            .update_rate_id
            .bind(vec![
                Value::Int(7),
                "acme".into(),
                "google.com".into(),
                Value::Int(99),
            ])
            .unwrap();
        ledger
            .session
            .execute(partial, &TraceStrategy::Untraced)
            .await
            .unwrap();

        let mut report = Vec::new();
        for _ in 0..100 {
            report = ledger
                .query_bumps("acme", &TraceStrategy::Untraced)
                .await
                .unwrap();
            if !report.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            report,
            vec!["ad_id=0, advertiser=acme, site=google.com, active_to=2024-01-02, rate_id=0, bumps=0"
                .to_string()]
        );
    }

    #[tokio::test]
    async fn test_resetup_replaces_rate() {
        let (ledger, memory, counter) = setup(RecordingCounter::default()).await;
        ledger
            .create_ad("acme", "google.com", "month", &TraceStrategy::Untraced)
            .await
            .unwrap();
        eventually(|| ads(&memory).len() == 1).await;

        let status = ledger
            .resetup_ad("acme", "google.com", AdId(0), &TraceStrategy::Untraced)
            .await
            .unwrap();
        assert!(status.is_ok());
        assert_eq!(
            counter.calls(),
            vec![
                Call::Init(RateId(0)),
                Call::Delete(RateId(0)),
                Call::Init(RateId(1))
            ]
        );
        let ad = AdRecord::from_row(&ads(&memory)[0]).unwrap();
        assert_eq!(ad.rate_id, RateId(1));
    }

    #[tokio::test]
    async fn test_resetup_unknown_ad_makes_no_calls() {
        let (ledger, _memory, counter) = setup(RecordingCounter::default()).await;
        let err = ledger
            .resetup_ad("acme", "google.com", AdId(42), &TraceStrategy::Untraced)
            .await
            .unwrap_err();
        match err {
            LedgerError::NotFound(reason) => assert_eq!(reason, NO_SUCH_AD),
            other => panic!("unexpected {:?}", other),
        }
        assert!(counter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_classic_request_traces_storage_only() {
        let (ledger, memory, _counter) = setup(RecordingCounter::default()).await;
        ledger
            .query_bumps("acme", &TraceStrategy::Classic)
            .await
            .unwrap();
        let traces = memory.diagnostics().snapshot();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].statement, "query_ads");
    }

    #[tokio::test]
    async fn test_application_request_parents_storage_spans() {
        let (ledger, _memory, _counter) = setup(RecordingCounter::default()).await;
        let (tracer, exporter, _provider) = in_memory_tracer();
        let server = SpanScope::start(
            &tracer,
            &CausalContext::empty(),
            "query_bumps",
            SpanKind::Server,
            Vec::new(),
        );
        ledger
            .query_bumps("acme", &TraceStrategy::Application(server.trace()))
            .await
            .unwrap();
        let server_id = server.causal_context().span_context().span_id();
        drop(server);

        let spans = exporter.get_finished_spans().unwrap();
        let query = spans.iter().find(|s| s.name == "query_ads").unwrap();
        assert_eq!(query.parent_span_id, server_id);
    }
}
