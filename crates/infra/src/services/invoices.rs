use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use invoicer_invoicing::{
    Invoice, InvoiceId, InvoicePatch, InvoiceStatus, InvoiceSummary, NewInvoice,
    generate_invoice_number,
};

use super::error::{ServiceError, ServiceResult};
use crate::store::{Collection, RecordStore};

const NUMBER_ATTEMPTS: usize = 32;

/// Whether two invoices may share an invoice number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvoiceNumberPolicy {
    #[default]
    Unique,
    AllowDuplicates,
}

impl InvoiceNumberPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::AllowDuplicates => "allow-duplicates",
        }
    }
}

impl core::fmt::Display for InvoiceNumberPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceNumberPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unique" => Ok(Self::Unique),
            "allow-duplicates" => Ok(Self::AllowDuplicates),
            other => Err(format!(
                "unknown invoice number policy '{other}' (expected 'unique' or 'allow-duplicates')"
            )),
        }
    }
}

/// Invoice lifecycle on top of the record store.
///
/// Every write recomputes the invoice's derived totals before it reaches the store.
#[derive(Debug, Clone)]
pub struct InvoiceService {
    invoices: Collection<Invoice>,
    policy: InvoiceNumberPolicy,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_policy(store, InvoiceNumberPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn RecordStore>, policy: InvoiceNumberPolicy) -> Self {
        Self {
            invoices: Collection::new(store),
            policy,
        }
    }

    pub fn policy(&self) -> InvoiceNumberPolicy {
        self.policy
    }

    pub async fn create(&self, input: NewInvoice) -> ServiceResult<Invoice> {
        let invoice = Invoice::create(input, Utc::now())?;
        self.insert(invoice).await
    }

    /// Persist an already-built invoice as a new record.
    pub async fn insert(&self, invoice: Invoice) -> ServiceResult<Invoice> {
        self.ensure_number_free(invoice.invoice_number(), invoice.id_typed())
            .await?;
        let stored = self.invoices.add(invoice).await?;
        tracing::info!(
            invoice_id = %stored.id_typed(),
            invoice_number = stored.invoice_number(),
            grand_total = stored.grand_total(),
            "invoice created"
        );
        Ok(stored)
    }

    /// Merge `patch` over the stored invoice. A missing invoice is `NotFound`.
    pub async fn update(&self, id: &InvoiceId, patch: InvoicePatch) -> ServiceResult<Invoice> {
        let existing = self.invoices.require(id).await?;
        let updated = existing.apply_patch(patch, Utc::now())?;
        if updated.invoice_number() != existing.invoice_number() {
            self.ensure_number_free(updated.invoice_number(), *id).await?;
        }
        let stored = self.invoices.put(updated).await?;
        tracing::debug!(invoice_id = %id, status = %stored.status(), "invoice updated");
        Ok(stored)
    }

    pub async fn set_status(&self, id: &InvoiceId, status: InvoiceStatus) -> ServiceResult<Invoice> {
        self.update(id, InvoicePatch::status(status)).await
    }

    /// Delete an invoice together with its items.
    pub async fn delete(&self, id: &InvoiceId) -> ServiceResult<()> {
        self.invoices.delete(id).await?;
        tracing::info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }

    pub async fn get(&self, id: &InvoiceId) -> ServiceResult<Option<Invoice>> {
        Ok(self.invoices.get(id).await?)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Invoice>> {
        Ok(self.invoices.all().await?)
    }

    pub async fn by_status(&self, status: InvoiceStatus) -> ServiceResult<Vec<Invoice>> {
        Ok(self.invoices.query("by-status", status.as_str()).await?)
    }

    pub async fn by_number(&self, invoice_number: &str) -> ServiceResult<Vec<Invoice>> {
        Ok(self
            .invoices
            .query("by-invoiceNumber", invoice_number.trim())
            .await?)
    }

    /// Invoices dated within `start..=end`.
    pub async fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<Vec<Invoice>> {
        let all = self.invoices.all().await?;
        Ok(all
            .into_iter()
            .filter(|invoice| (start..=end).contains(&invoice.invoice_date()))
            .collect())
    }

    pub async fn summary(&self) -> ServiceResult<InvoiceSummary> {
        let all = self.invoices.all().await?;
        Ok(InvoiceSummary::from_invoices(&all))
    }

    /// Suggest an invoice number for `date`, unused in the store when numbers are unique.
    pub async fn next_invoice_number(&self, date: NaiveDate) -> ServiceResult<String> {
        let mut candidate = generate_invoice_number(date);
        if self.policy == InvoiceNumberPolicy::AllowDuplicates {
            return Ok(candidate);
        }
        for _ in 0..NUMBER_ATTEMPTS {
            if self.by_number(&candidate).await?.is_empty() {
                return Ok(candidate);
            }
            candidate = generate_invoice_number(date);
        }
        Err(ServiceError::InvoiceNumbersExhausted(
            date.format("INV-%Y%m").to_string(),
        ))
    }

    async fn ensure_number_free(&self, invoice_number: &str, owner: InvoiceId) -> ServiceResult<()> {
        if self.policy == InvoiceNumberPolicy::AllowDuplicates {
            return Ok(());
        }
        let taken = self
            .by_number(invoice_number)
            .await?
            .iter()
            .any(|other| other.id_typed() != owner);
        if taken {
            tracing::debug!(invoice_number, "rejected duplicate invoice number");
            return Err(ServiceError::DuplicateInvoiceNumber(invoice_number.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use invoicer_core::Entity;
    use invoicer_invoicing::{CustomerSnapshot, NewItem};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn draft(number: &str, day: u32) -> NewInvoice {
        NewInvoice {
            invoice_number: number.to_string(),
            customer: CustomerSnapshot::new("Acme", "billing@acme.test", "1 Main St"),
            invoice_date: date(day),
            due_date: date(day) + chrono::Duration::days(30),
            currency: "USD".to_string(),
            notes: String::new(),
            status: InvoiceStatus::Draft,
            items: vec![NewItem::new("Consulting", 2, 100.0, 10.0)],
        }
    }

    fn service(policy: InvoiceNumberPolicy) -> InvoiceService {
        InvoiceService::with_policy(Arc::new(InMemoryRecordStore::invoicing()), policy)
    }

    #[tokio::test]
    async fn create_computes_totals() {
        let service = service(InvoiceNumberPolicy::Unique);
        let invoice = service.create(draft("INV-1", 1)).await.unwrap();

        assert_eq!(invoice.subtotal(), 200.0);
        assert_eq!(invoice.tax_total(), 20.0);
        assert_eq!(invoice.grand_total(), 220.0);
        assert_eq!(service.get(invoice.id()).await.unwrap(), Some(invoice));
    }

    #[tokio::test]
    async fn unique_policy_rejects_taken_numbers() {
        let service = service(InvoiceNumberPolicy::Unique);
        service.create(draft("INV-1", 1)).await.unwrap();

        let err = service.create(draft("INV-1", 2)).await.unwrap_err();
        assert_eq!(err, ServiceError::DuplicateInvoiceNumber("INV-1".to_string()));
    }

    #[tokio::test]
    async fn allow_duplicates_policy_accepts_taken_numbers() {
        let service = service(InvoiceNumberPolicy::AllowDuplicates);
        service.create(draft("INV-1", 1)).await.unwrap();
        service.create(draft("INV-1", 2)).await.unwrap();
        assert_eq!(service.by_number("INV-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_items_and_recomputes() {
        let service = service(InvoiceNumberPolicy::Unique);
        let invoice = service.create(draft("INV-1", 1)).await.unwrap();

        let patch = InvoicePatch {
            items: Some(vec![NewItem::new("Support", 1, 50.0, 0.0)]),
            ..InvoicePatch::default()
        };
        let updated = service.update(invoice.id(), patch).await.unwrap();

        assert_eq!(updated.grand_total(), 50.0);
        assert!(updated.is_consistent());
        assert!(updated.updated_at() > invoice.updated_at());
    }

    #[tokio::test]
    async fn renumbering_onto_a_taken_number_is_rejected() {
        let service = service(InvoiceNumberPolicy::Unique);
        service.create(draft("INV-1", 1)).await.unwrap();
        let second = service.create(draft("INV-2", 1)).await.unwrap();

        let patch = InvoicePatch {
            invoice_number: Some("INV-1".to_string()),
            ..InvoicePatch::default()
        };
        let err = service.update(second.id(), patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateInvoiceNumber(_)));

        // Keeping its own number is fine.
        service
            .update(second.id(), InvoicePatch::status(InvoiceStatus::Sent))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_and_date_queries() {
        let service = service(InvoiceNumberPolicy::Unique);
        let a = service.create(draft("INV-1", 1)).await.unwrap();
        service.create(draft("INV-2", 10)).await.unwrap();
        service.create(draft("INV-3", 20)).await.unwrap();
        service.set_status(a.id(), InvoiceStatus::Sent).await.unwrap();

        let sent = service.by_status(InvoiceStatus::Sent).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].invoice_number(), "INV-1");
        assert_eq!(service.by_status(InvoiceStatus::Draft).await.unwrap().len(), 2);

        let range = service.by_date_range(date(1), date(10)).await.unwrap();
        let numbers: Vec<_> = range.iter().map(|i| i.invoice_number()).collect();
        assert_eq!(numbers, vec!["INV-1", "INV-2"]);
    }

    #[tokio::test]
    async fn summary_counts_pending_and_overdue() {
        let service = service(InvoiceNumberPolicy::Unique);
        let a = service.create(draft("INV-1", 1)).await.unwrap();
        let b = service.create(draft("INV-2", 2)).await.unwrap();
        service.set_status(a.id(), InvoiceStatus::Sent).await.unwrap();
        service.set_status(b.id(), InvoiceStatus::Overdue).await.unwrap();

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.total_invoices, 2);
        assert_eq!(summary.pending_invoices, 1);
        assert_eq!(summary.overdue_invoices, 1);
        assert_eq!(summary.total_amount, 440.0);
    }

    #[tokio::test]
    async fn delete_removes_the_invoice() {
        let service = service(InvoiceNumberPolicy::Unique);
        let invoice = service.create(draft("INV-1", 1)).await.unwrap();
        service.delete(invoice.id()).await.unwrap();
        assert!(service.get(invoice.id()).await.unwrap().is_none());
        assert!(service.by_number("INV-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn next_invoice_number_is_unused() {
        let service = service(InvoiceNumberPolicy::Unique);
        let number = service.next_invoice_number(date(5)).await.unwrap();
        assert!(number.starts_with("INV-202403-"));
        assert!(service.by_number(&number).await.unwrap().is_empty());
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!(
            "unique".parse::<InvoiceNumberPolicy>(),
            Ok(InvoiceNumberPolicy::Unique)
        );
        assert_eq!(
            "Allow-Duplicates".parse::<InvoiceNumberPolicy>(),
            Ok(InvoiceNumberPolicy::AllowDuplicates)
        );
        assert!("sometimes".parse::<InvoiceNumberPolicy>().is_err());
    }
}
