use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use sachet_core::domain::customer::{Customer, CustomerId};

use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so that `ORDER BY` on the text column is chronological.
fn timestamp_to_sql(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let business_name: String =
        row.try_get("business_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let contact_name: String =
        row.try_get("contact_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone: String = row.try_get("phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gps_address: String =
        row.try_get("gps_address").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let latitude: f64 =
        row.try_get("latitude").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let longitude: f64 =
        row.try_get("longitude").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let average_bags: i64 =
        row.try_get("average_bags").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_visit_str: String =
        row.try_get("last_visit").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let id = id
        .parse::<CustomerId>()
        .map_err(|e| RepositoryError::Decode(format!("customer id `{id}`: {e}")))?;
    let average_bags = u32::try_from(average_bags).map_err(|_| {
        RepositoryError::Decode(format!("average_bags out of range: {average_bags}"))
    })?;

    Ok(Customer {
        id,
        business_name,
        contact_name,
        phone,
        gps_address,
        latitude,
        longitude,
        average_bags,
        last_visit: parse_timestamp("last_visit", &last_visit_str)?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, business_name, contact_name, phone, gps_address, latitude, longitude,
                    average_bags, last_visit
             FROM customer ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, business_name, contact_name, phone, gps_address, latitude, longitude,
                    average_bags, last_visit
             FROM customer WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let last_visit = timestamp_to_sql(&customer.last_visit);

        // created_at keeps the first insert's value on upsert.
        sqlx::query(
            "INSERT INTO customer (id, business_name, contact_name, phone, gps_address,
                                   latitude, longitude, average_bags, last_visit, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 business_name = excluded.business_name,
                 contact_name = excluded.contact_name,
                 phone = excluded.phone,
                 gps_address = excluded.gps_address,
                 latitude = excluded.latitude,
                 longitude = excluded.longitude,
                 average_bags = excluded.average_bags,
                 last_visit = excluded.last_visit",
        )
        .bind(customer.id.to_string())
        .bind(&customer.business_name)
        .bind(&customer.contact_name)
        .bind(&customer.phone)
        .bind(&customer.gps_address)
        .bind(customer.latitude)
        .bind(customer.longitude)
        .bind(i64::from(customer.average_bags))
        .bind(&last_visit)
        .bind(&last_visit)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use sachet_core::domain::customer::{Customer, CustomerId};

    use super::SqlCustomerRepository;
    use crate::repositories::CustomerRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_customer(name: &str, bags: u32, age_days: i64) -> Customer {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Customer {
            id: CustomerId::new(),
            business_name: name.to_string(),
            contact_name: "Akosua".to_string(),
            phone: "0244000111".to_string(),
            gps_address: "GA-183-8164".to_string(),
            latitude: 5.6037,
            longitude: -0.1870,
            average_bags: bags,
            last_visit: created - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);
        let customer = sample_customer("Osu Kiosk", 64, 0);

        repo.save(customer.clone()).await.expect("save");
        let found = repo.find_by_id(&customer.id).await.expect("find");

        assert_eq!(found, Some(customer));
    }

    #[tokio::test]
    async fn find_missing_returns_none() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);

        let found = repo.find_by_id(&CustomerId::new()).await.expect("find");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn list_returns_creation_order() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);
        let newest = sample_customer("Newest", 10, 0);
        let oldest = sample_customer("Oldest", 20, 40);
        let middle = sample_customer("Middle", 30, 5);

        repo.save(newest.clone()).await.expect("save newest");
        repo.save(oldest.clone()).await.expect("save oldest");
        repo.save(middle.clone()).await.expect("save middle");

        let names: Vec<String> = repo
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|customer| customer.business_name)
            .collect();

        assert_eq!(names, vec!["Oldest", "Middle", "Newest"]);
    }

    #[tokio::test]
    async fn save_updates_existing_record_in_place() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);
        let mut customer = sample_customer("Labone Chop Bar", 30, 2);
        repo.save(customer.clone()).await.expect("save");

        customer.average_bags = 75;
        customer.phone = "0200000999".to_string();
        repo.save(customer.clone()).await.expect("update");

        let all = repo.list().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].average_bags, 75);
        assert_eq!(all[0].phone, "0200000999");
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_was_removed() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);
        let customer = sample_customer("Madina Stall", 5, 1);
        repo.save(customer.clone()).await.expect("save");

        assert!(repo.delete(&customer.id).await.expect("delete"));
        assert!(!repo.delete(&customer.id).await.expect("second delete"));
        assert!(repo.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn corrupt_timestamp_is_a_decode_error() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO customer (id, business_name, contact_name, phone, gps_address,
                                   latitude, longitude, average_bags, last_visit, created_at)
             VALUES ('0b6f1c3e-6a55-4c1a-9d1e-2f6a1a0000ff', 'Broken', '', '024', '',
                     5.6, -0.2, 1, 'yesterday', 'yesterday')",
        )
        .execute(&pool)
        .await
        .expect("insert raw row");

        let repo = SqlCustomerRepository::new(pool);
        let error = repo.list().await.expect_err("decode should fail");

        assert!(error.to_string().contains("last_visit"));
    }
}
