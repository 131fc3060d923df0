use std::collections::HashMap;

use tokio::sync::RwLock;

use sachet_core::domain::customer::{Customer, CustomerId};

use super::{CustomerRepository, RepositoryError};

/// Next insertion sequence plus customers keyed by id, each tagged with its sequence.
type Store = (u64, HashMap<CustomerId, (u64, Customer)>);

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    store: RwLock<Store>,
}

impl InMemoryCustomerRepository {
    pub async fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let repo = Self::default();
        for customer in customers {
            repo.insert(customer).await;
        }
        repo
    }

    async fn insert(&self, customer: Customer) {
        let mut store = self.store.write().await;
        let (next_sequence, customers) = &mut *store;
        if let Some((_, existing)) = customers.get_mut(&customer.id) {
            *existing = customer;
            return;
        }

        let sequence = *next_sequence;
        *next_sequence += 1;
        customers.insert(customer.id, (sequence, customer));
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let store = self.store.read().await;
        let mut ordered: Vec<&(u64, Customer)> = store.1.values().collect();
        ordered.sort_by_key(|(sequence, _)| *sequence);
        Ok(ordered.into_iter().map(|(_, customer)| customer.clone()).collect())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.1.get(id).map(|(_, customer)| customer.clone()))
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        self.insert(customer).await;
        Ok(())
    }

    async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError> {
        let mut store = self.store.write().await;
        Ok(store.1.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use sachet_core::domain::customer::{Customer, CustomerId};

    use crate::repositories::{CustomerRepository, InMemoryCustomerRepository};

    fn customer(name: &str, bags: u32) -> Customer {
        Customer {
            id: CustomerId::new(),
            business_name: name.to_string(),
            contact_name: String::new(),
            phone: "0201112222".to_string(),
            gps_address: String::new(),
            latitude: 5.6,
            longitude: -0.19,
            average_bags: bags,
            last_visit: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_customer_repo_round_trip() {
        let repo = InMemoryCustomerRepository::default();
        let customer = customer("Osu Kiosk", 40);

        repo.save(customer.clone()).await.expect("save customer");
        let found = repo.find_by_id(&customer.id).await.expect("find customer");

        assert_eq!(found, Some(customer));
    }

    #[tokio::test]
    async fn list_keeps_insertion_order_across_updates() {
        let first = customer("First", 1);
        let second = customer("Second", 2);
        let repo =
            InMemoryCustomerRepository::with_customers([first.clone(), second.clone()]).await;

        let mut updated = first.clone();
        updated.average_bags = 99;
        repo.save(updated).await.expect("update first");

        let listed = repo.list().await.expect("list");
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[0].average_bags, 99);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn customer_saved_after_a_delete_goes_to_the_end() {
        let first = customer("First", 1);
        let second = customer("Second", 2);
        let repo =
            InMemoryCustomerRepository::with_customers([first.clone(), second.clone()]).await;

        assert!(repo.delete(&first.id).await.expect("delete first"));
        repo.save(first.clone()).await.expect("re-save first");

        let order: Vec<_> = repo.list().await.expect("list").into_iter().map(|c| c.id).collect();
        assert_eq!(order, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn concurrent_saves_get_distinct_positions() {
        let repo = std::sync::Arc::new(InMemoryCustomerRepository::default());
        let customers: Vec<Customer> =
            (0..16).map(|index| customer(&format!("Outlet {index}"), index)).collect();

        let handles: Vec<_> = customers
            .iter()
            .cloned()
            .map(|customer| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.save(customer).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("save");
        }

        let listed = repo.list().await.expect("list");
        assert_eq!(listed.len(), 16);
        let store = repo.store.read().await;
        let mut sequences: Vec<u64> = store.1.values().map(|(sequence, _)| *sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (0..16).collect::<Vec<u64>>());
        assert_eq!(store.0, 16);
    }

    #[tokio::test]
    async fn delete_removes_the_customer() {
        let target = customer("Target", 5);
        let repo = InMemoryCustomerRepository::with_customers([target.clone()]).await;

        assert!(repo.delete(&target.id).await.expect("delete"));
        assert!(repo.find_by_id(&target.id).await.expect("find").is_none());
        assert!(!repo.delete(&target.id).await.expect("delete again"));
    }
}
