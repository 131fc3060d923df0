use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use tracing::{info, warn};

use sachet_core::analytics::analysis::{parse_analysis, AnalysisOutcome, PromptTemplate};
use sachet_core::analytics::segments::{segment_customers, SegmentRules};
use sachet_core::domain::customer::Customer;

use crate::llm::LlmClient;

pub struct CustomerAnalyst {
    client: Arc<dyn LlmClient>,
    template: PromptTemplate,
    rules: SegmentRules,
}

impl CustomerAnalyst {
    pub fn new(client: Arc<dyn LlmClient>, rules: SegmentRules) -> Self {
        Self { client, template: PromptTemplate::default(), rules }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn rules(&self) -> &SegmentRules {
        &self.rules
    }

    /// Never fails: an empty list short-circuits to `NoData` without calling the service,
    /// and every failure after that collapses to `Unavailable`.
    pub async fn analyze<Tz>(&self, customers: &[Customer], now: &DateTime<Tz>) -> AnalysisOutcome
    where
        Tz: TimeZone,
    {
        if customers.is_empty() {
            return AnalysisOutcome::NoData;
        }

        let counts = segment_customers(customers, &self.rules, now);
        let prompt = match self.template.render(customers, &counts, &self.rules) {
            Ok(prompt) => prompt,
            Err(error) => return unavailable("render", error.to_string()),
        };

        let reply = match self.client.complete(&prompt).await {
            Ok(reply) => reply,
            Err(error) => return unavailable("request", format!("{error:#}")),
        };

        match parse_analysis(&reply) {
            Ok(result) => {
                info!(
                    event_name = "analysis.completed",
                    customers = customers.len(),
                    clusters = result.clusters.len(),
                    "customer analysis completed"
                );
                AnalysisOutcome::Completed(result)
            }
            Err(error) => unavailable("parse", error.to_string()),
        }
    }
}

fn unavailable(stage: &'static str, reason: String) -> AnalysisOutcome {
    warn!(event_name = "analysis.unavailable", stage, error = %reason, "customer analysis failed");
    AnalysisOutcome::Unavailable { reason }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use sachet_core::analytics::analysis::{AnalysisOutcome, AnalysisResult, PromptTemplate};
    use sachet_core::analytics::segments::SegmentRules;
    use sachet_core::domain::customer::{Customer, CustomerId};

    use super::CustomerAnalyst;
    use crate::llm::LlmClient;

    enum Reply {
        Text(&'static str),
        Fail,
    }

    struct StubClient {
        reply: Reply,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl StubClient {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().expect("prompt lock").last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().expect("prompt lock").push(prompt.to_string());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => bail!("connection refused"),
            }
        }
    }

    fn customer(name: &str, bags: u32, age_days: i64) -> Customer {
        let rules = SegmentRules::default();
        Customer {
            id: CustomerId::new(),
            business_name: name.to_string(),
            contact_name: "Esi".to_string(),
            phone: "0240001111".to_string(),
            gps_address: String::new(),
            latitude: rules.reference.latitude,
            longitude: rules.reference.longitude,
            average_bags: bags,
            last_visit: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn empty_list_short_circuits_without_calling_the_service() {
        let stub = StubClient::new(Reply::Text("{}"));
        let analyst = CustomerAnalyst::new(stub.clone(), SegmentRules::default());

        let outcome = analyst.analyze(&[], &Utc::now()).await;

        assert_eq!(outcome, AnalysisOutcome::NoData);
        assert_eq!(outcome.into_result(), AnalysisResult::no_data());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn transport_failure_becomes_unavailable() {
        let stub = StubClient::new(Reply::Fail);
        let analyst = CustomerAnalyst::new(stub.clone(), SegmentRules::default());

        let outcome = analyst.analyze(&[customer("Osu", 60, 1)], &Utc::now()).await;

        assert!(matches!(
            outcome,
            AnalysisOutcome::Unavailable { ref reason } if reason.contains("connection refused")
        ));
        assert_eq!(outcome.into_result(), AnalysisResult::unavailable());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn unparseable_reply_becomes_unavailable() {
        let stub = StubClient::new(Reply::Text("I think you should sell more water."));
        let analyst = CustomerAnalyst::new(stub, SegmentRules::default());

        let outcome = analyst.analyze(&[customer("Osu", 60, 1)], &Utc::now()).await;

        assert_eq!(outcome.kind(), "unavailable");
    }

    #[tokio::test]
    async fn well_formed_reply_is_returned() {
        let stub = StubClient::new(Reply::Text(
            r#"{"summary":"Two strong outlets","strategy":"Weekly route","clusters":["Osu"]}"#,
        ));
        let analyst = CustomerAnalyst::new(stub, SegmentRules::default());

        let outcome = analyst.analyze(&[customer("Osu", 60, 1)], &Utc::now()).await;

        assert_eq!(
            outcome,
            AnalysisOutcome::Completed(AnalysisResult {
                summary: "Two strong outlets".to_string(),
                strategy: "Weekly route".to_string(),
                clusters: vec!["Osu".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn prompt_carries_segment_counts_for_the_given_instant() {
        let stub = StubClient::new(Reply::Fail);
        let analyst = CustomerAnalyst::new(stub.clone(), SegmentRules::default()).with_template(
            PromptTemplate::from_source("hv={{ high_volume }} local={{ local }} new={{ new }}")
                .expect("template"),
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
        let mut fresh = customer("Fresh", 51, 0);
        fresh.last_visit = now - Duration::days(3);
        let mut old = customer("Old", 50, 0);
        old.last_visit = now - Duration::days(45);

        analyst.analyze(&[fresh, old], &now).await;

        assert_eq!(stub.last_prompt(), "hv=1 local=2 new=1");
    }
}
