use chrono::Local;

use sachet_core::analytics::dashboard::DashboardSnapshot;
use sachet_db::{CustomerRepository, SqlCustomerRepository};

use crate::commands::{
    build_runtime, finish, load_config, open_migrated_pool, CommandFailure, CommandResult,
};

/// Segments are evaluated against the operator's local calendar.
pub fn run() -> CommandResult {
    let config = match load_config("dashboard") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("dashboard") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let customers = SqlCustomerRepository::new(pool.clone())
            .list()
            .await
            .map_err(|error| ("persistence", error.to_string(), 5u8))?;
        pool.close().await;

        let snapshot = DashboardSnapshot::build(
            &customers,
            &config.analytics.segment_rules(),
            &config.analytics.summary_options(),
            &Local::now(),
        );
        let message = format!(
            "{} customers, {} bags/week, {} high volume, {} local, {} new",
            snapshot.total_customers,
            snapshot.total_bags,
            snapshot.segments.high_volume,
            snapshot.segments.local,
            snapshot.segments.new
        );
        let data = serde_json::to_value(&snapshot)
            .map_err(|error| ("serialization", error.to_string(), 5u8))?;

        Ok::<_, CommandFailure>(CommandResult::with_data("dashboard", message, data))
    });

    finish("dashboard", result)
}
