use sachet_db::{DemoCustomerDataset, DemoCustomerInfo};

use crate::commands::{
    build_runtime, finish, load_config, open_migrated_pool, CommandFailure, CommandResult,
};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;

        let seed_result = DemoCustomerDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoCustomerDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        if !verification.all_present {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            return Err(("seed_verification", verification_message(&failed_checks), 6u8));
        }

        Ok::<_, CommandFailure>(CommandResult::success(
            "seed",
            seed_message(&seed_result.customers_seeded, seed_result.rows_inserted),
        ))
    });

    finish("seed", result)
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some demo customers failed to load".to_string()
    } else {
        format!("Seed verification failed for customers: {}", failed_checks.join(", "))
    }
}

fn seed_message(customers: &[DemoCustomerInfo], rows_inserted: u64) -> String {
    let lines: Vec<String> = customers
        .iter()
        .map(|customer| format!("  - {} ({})", customer.business_name, customer.id))
        .collect();
    format!(
        "demo customer dataset ready ({rows_inserted} new of {}):\n{}",
        customers.len(),
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use sachet_db::DemoCustomerInfo;

    use super::{seed_message, verification_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        assert_eq!(
            verification_message(&["Makola Cold Store", "Labone Chop Bar"]),
            "Seed verification failed for customers: Makola Cold Store, Labone Chop Bar"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(verification_message(&[]), "Some demo customers failed to load");
    }

    #[test]
    fn seed_message_reports_new_rows_against_total() {
        let customers = [DemoCustomerInfo { id: "c-1", business_name: "Osu Kiosk" }];

        assert_eq!(
            seed_message(&customers, 0),
            "demo customer dataset ready (0 new of 1):\n  - Osu Kiosk (c-1)"
        );
    }
}
