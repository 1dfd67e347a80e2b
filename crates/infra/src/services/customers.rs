use std::sync::Arc;

use chrono::Utc;

use invoicer_parties::{Customer, CustomerId, CustomerPatch, NewCustomer};

use super::error::ServiceResult;
use crate::store::{Collection, RecordStore};

/// Customer lifecycle on top of the record store.
#[derive(Debug, Clone)]
pub struct CustomerService {
    customers: Collection<Customer>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            customers: Collection::new(store),
        }
    }

    pub async fn create(&self, input: NewCustomer) -> ServiceResult<Customer> {
        let customer = Customer::create(input, Utc::now())?;
        let stored = self.customers.add(customer).await?;
        tracing::info!(customer_id = %stored.id_typed(), "customer created");
        Ok(stored)
    }

    pub async fn get(&self, id: &CustomerId) -> ServiceResult<Option<Customer>> {
        Ok(self.customers.get(id).await?)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Customer>> {
        Ok(self.customers.all().await?)
    }

    /// Merge `patch` over the stored customer. A missing customer is `NotFound`.
    pub async fn update(&self, id: &CustomerId, patch: CustomerPatch) -> ServiceResult<Customer> {
        let existing = self.customers.require(id).await?;
        let updated = existing.apply_patch(patch, Utc::now())?;
        let stored = self.customers.put(updated).await?;
        tracing::debug!(customer_id = %id, "customer updated");
        Ok(stored)
    }

    pub async fn delete(&self, id: &CustomerId) -> ServiceResult<()> {
        self.customers.delete(id).await?;
        tracing::info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    /// Case-insensitive match on name, email or company. A blank query returns everyone.
    pub async fn search(&self, query: &str) -> ServiceResult<Vec<Customer>> {
        let all = self.customers.all().await?;
        Ok(all.into_iter().filter(|c| c.matches(query)).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<Customer>> {
        let hits = self.customers.query("by-email", email.trim()).await?;
        Ok(hits.into_iter().next())
    }
}
