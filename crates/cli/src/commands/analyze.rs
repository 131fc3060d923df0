use chrono::Local;
use serde_json::json;

use sachet_agent::{build_client, CustomerAnalyst};
use sachet_core::analytics::analysis::AnalysisOutcome;
use sachet_db::{CustomerRepository, SqlCustomerRepository};

use crate::commands::{
    build_runtime, finish, load_config, open_migrated_pool, CommandFailure, CommandResult,
};

pub fn run() -> CommandResult {
    let config = match load_config("analyze") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let template = match config.analytics.prompt_template() {
        Ok(template) => template,
        Err(error) => {
            return CommandResult::failure("analyze", "config_validation", error.to_string(), 2)
        }
    };
    let client = match build_client(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("analyze", "runtime_init", format!("{error:#}"), 3)
        }
    };
    let runtime = match build_runtime("analyze") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let analyst =
        CustomerAnalyst::new(client, config.analytics.segment_rules()).with_template(template);

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let customers = SqlCustomerRepository::new(pool.clone())
            .list()
            .await
            .map_err(|error| ("persistence", error.to_string(), 5u8))?;
        pool.close().await;

        let outcome = analyst.analyze(&customers, &Local::now()).await;
        Ok::<_, CommandFailure>(outcome_result(customers.len(), outcome))
    });

    finish("analyze", result)
}

/// The fallback results are still successful command output; `outcome` tells them apart.
fn outcome_result(customer_count: usize, outcome: AnalysisOutcome) -> CommandResult {
    let kind = outcome.kind();
    let reason = match &outcome {
        AnalysisOutcome::Unavailable { reason } => Some(reason.clone()),
        _ => None,
    };
    let result = outcome.into_result();

    CommandResult::with_data(
        "analyze",
        format!("analysis {kind} for {customer_count} customers"),
        json!({
            "outcome": kind,
            "reason": reason,
            "summary": result.summary,
            "strategy": result.strategy,
            "clusters": result.clusters,
        }),
    )
}
