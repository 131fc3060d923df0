use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Contract for one seeded demo customer.
struct DemoCustomerContract {
    id: &'static str,
    business_name: &'static str,
    average_bags: i64,
}

const DEMO_CUSTOMERS: &[DemoCustomerContract] = &[
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000001",
        business_name: "Osu Oxford Street Kiosk",
        average_bags: 85,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000002",
        business_name: "Makola Cold Store",
        average_bags: 120,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000003",
        business_name: "Labone Chop Bar",
        average_bags: 30,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000004",
        business_name: "East Legon Mini Mart",
        average_bags: 55,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000005",
        business_name: "Kaneshie Market Stall",
        average_bags: 12,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000006",
        business_name: "Tema Harbour Canteen",
        average_bags: 200,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000007",
        business_name: "Airport Residential Spot",
        average_bags: 40,
    },
    DemoCustomerContract {
        id: "0b6f1c3e-6a55-4c1a-9d1e-2f6a1a000008",
        business_name: "Madina Lorry Station",
        average_bags: 64,
    },
];

/// Deterministic demo customer base around Accra for local runs and smoke checks.
pub struct DemoCustomerDataset;

impl DemoCustomerDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_customers.sql");

    /// Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        let inserted = sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;

        let customers_seeded = DEMO_CUSTOMERS
            .iter()
            .map(|customer| DemoCustomerInfo {
                id: customer.id,
                business_name: customer.business_name,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { customers_seeded, rows_inserted: inserted })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for customer in DEMO_CUSTOMERS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer WHERE id = ?1 AND business_name = ?2 AND average_bags = ?3)",
            )
            .bind(customer.id)
            .bind(customer.business_name)
            .bind(customer.average_bags)
            .fetch_one(pool)
            .await?;
            checks.push((customer.business_name, present == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub customers_seeded: Vec<DemoCustomerInfo>,
    pub rows_inserted: u64,
}

#[derive(Debug)]
pub struct DemoCustomerInfo {
    pub id: &'static str,
    pub business_name: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{CustomerRepository, SqlCustomerRepository};
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_mentions_every_contract_row() {
        for customer in DEMO_CUSTOMERS {
            assert!(DemoCustomerDataset::SQL.contains(customer.id), "{} missing", customer.id);
        }
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let before = DemoCustomerDataset::verify(&pool).await.expect("verify empty database");
        assert!(!before.all_present);

        let first = DemoCustomerDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification =
            DemoCustomerDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.customers_seeded.len(), DEMO_CUSTOMERS.len());
        assert_eq!(first.rows_inserted, DEMO_CUSTOMERS.len() as u64);

        let second = DemoCustomerDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoCustomerDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.rows_inserted, 0);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn seeded_rows_decode_through_the_repository() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoCustomerDataset::load(&pool).await.expect("load seed fixtures");

        let customers = SqlCustomerRepository::new(pool).list().await.expect("list customers");

        assert_eq!(customers.len(), DEMO_CUSTOMERS.len());
        assert_eq!(customers[0].business_name, "Osu Oxford Street Kiosk");
        assert_eq!(customers[7].business_name, "Madina Lorry Station");
        assert_eq!(customers.iter().map(|c| u64::from(c.average_bags)).sum::<u64>(), 606);
    }
}
