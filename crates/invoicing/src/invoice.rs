use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use invoicer_core::validate::{is_currency_code, is_email};
use invoicer_core::{
    DomainError, Entity, ValidationErrors, ValueObject, next_update_timestamp, record_id_newtype,
};
use invoicer_parties::Customer;

use crate::totals::{InvoiceTotals, ItemTotals, PricedLine, compute_invoice_totals, compute_item_totals};

record_id_newtype!(
    /// Invoice identifier.
    InvoiceId
);

record_id_newtype!(
    /// Identifier of an item, unique within its invoice.
    ItemId
);

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Unpaid,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Unpaid,
        InvoiceStatus::Overdue,
    ];

    /// Stored (and indexed) form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                DomainError::invalid_value(format!(
                    "unknown invoice status '{s}' (expected draft, sent, paid, unpaid or overdue)"
                ))
            })
    }
}

/// Customer details copied onto an invoice when it is issued.
///
/// This is a value copy, not a reference: later edits to the customer record do not
/// change invoices that were already issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

impl ValueObject for CustomerSnapshot {}

impl CustomerSnapshot {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address: address.into(),
        }
    }

    /// Snapshot the billing details of `customer` as they are right now.
    pub fn of(customer: &Customer) -> Self {
        Self::new(customer.name(), customer.email(), customer.address())
    }

    fn validate_into(&self, errors: &mut ValidationErrors) {
        errors.require("customer.name", &self.name);
        if !self.email.trim().is_empty() && !is_email(&self.email) {
            errors.push("customer.email", "is not a valid e-mail address");
        }
    }

    fn trimmed(self) -> Self {
        Self::new(self.name.trim(), self.email.trim(), self.address.trim())
    }
}

/// Draft of an invoice line, as entered by an operator or read from an import row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    /// Existing item id to keep when editing; a fresh id is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub tax_rate: f64,
}

impl NewItem {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: f64, tax_rate: f64) -> Self {
        Self {
            id: None,
            description: description.into(),
            quantity,
            unit_price,
            tax_rate,
        }
    }

    fn validate_into(&self, position: usize, errors: &mut ValidationErrors) {
        let field = |name: &str| format!("items[{position}].{name}");
        errors.require(&field("description"), &self.description);
        if self.quantity < 1 {
            errors.push(field("quantity"), "must be at least 1");
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            errors.push(field("unitPrice"), "must be a number of at least 0");
        }
        if !self.tax_rate.is_finite() || !(0.0..=100.0).contains(&self.tax_rate) {
            errors.push(field("taxRate"), "must be between 0 and 100");
        }
    }
}

impl PricedLine for NewItem {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> f64 {
        self.unit_price
    }

    fn tax_rate(&self) -> f64 {
        self.tax_rate
    }
}

/// An invoice line. Owned by its invoice; it has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    id: ItemId,
    description: String,
    quantity: u32,
    unit_price: f64,
    tax_rate: f64,
    subtotal: f64,
    tax_amount: f64,
    total: f64,
}

impl Item {
    fn from_draft(draft: NewItem) -> Self {
        let totals = compute_item_totals(draft.quantity, draft.unit_price, draft.tax_rate);
        Self {
            id: draft.id.unwrap_or_default(),
            description: draft.description.trim().to_string(),
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            tax_rate: draft.tax_rate,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total: totals.total,
        }
    }

    /// Overwrite the derived fields from quantity, unit price and tax rate.
    pub fn recompute(&mut self) {
        let totals = compute_item_totals(self.quantity, self.unit_price, self.tax_rate);
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total = totals.total;
    }

    /// Whether the derived fields match the raw pricing inputs.
    pub fn is_consistent(&self) -> bool {
        self.totals() == compute_item_totals(self.quantity, self.unit_price, self.tax_rate)
    }

    /// Draft carrying this item's id and raw inputs, for editing.
    pub fn to_draft(&self) -> NewItem {
        NewItem {
            id: Some(self.id),
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn subtotal(&self) -> f64 {
        self.subtotal
    }

    pub fn tax_amount(&self) -> f64 {
        self.tax_amount
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn totals(&self) -> ItemTotals {
        ItemTotals {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }
}

impl PricedLine for Item {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> f64 {
        self.unit_price
    }

    fn tax_rate(&self) -> f64 {
        self.tax_rate
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub invoice_number: String,
    pub customer: CustomerSnapshot,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub items: Vec<NewItem>,
}

impl NewInvoice {
    /// Check the invoice header and every item, reporting all problems together.
    ///
    /// Due date before invoice date is deliberately not checked here.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_header(
            &self.invoice_number,
            &self.customer,
            &self.currency,
            &mut errors,
        );
        validate_items(&self.items, &mut errors);
        errors.into_result()
    }
}

/// Partial update of an invoice. `None` keeps the existing value.
///
/// `items`, when present, replaces the whole item list; drafts carrying an existing
/// item id keep that id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    pub invoice_number: Option<String>,
    pub customer: Option<CustomerSnapshot>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub items: Option<Vec<NewItem>>,
}

impl InvoicePatch {
    /// Patch that only changes the status.
    pub fn status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A stored invoice with its embedded items and derived totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: InvoiceId,
    invoice_number: String,
    customer: CustomerSnapshot,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    #[serde(default)]
    notes: String,
    status: InvoiceStatus,
    items: Vec<Item>,
    subtotal: f64,
    tax_total: f64,
    grand_total: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Build a new invoice with a freshly generated id and computed totals.
    pub fn create(input: NewInvoice, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        Self::create_with_id(InvoiceId::new(), input, now)
    }

    pub fn create_with_id(
        id: InvoiceId,
        input: NewInvoice,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        input.validate()?;
        let mut invoice = Self {
            id,
            invoice_number: input.invoice_number.trim().to_string(),
            customer: input.customer.trimmed(),
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            currency: input.currency.trim().to_string(),
            notes: input.notes,
            status: input.status,
            items: input.items.into_iter().map(Item::from_draft).collect(),
            subtotal: 0.0,
            tax_total: 0.0,
            grand_total: 0.0,
            created_at: now,
            updated_at: now,
        };
        invoice.recompute();
        Ok(invoice)
    }

    /// Merge `patch` over this invoice, recompute totals and bump `updated_at`.
    pub fn apply_patch(
        &self,
        patch: InvoicePatch,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let invoice_number = patch
            .invoice_number
            .map_or_else(|| self.invoice_number.clone(), |n| n.trim().to_string());
        let customer = patch
            .customer
            .map_or_else(|| self.customer.clone(), CustomerSnapshot::trimmed);
        let currency = patch
            .currency
            .map_or_else(|| self.currency.clone(), |c| c.trim().to_string());

        let mut errors = ValidationErrors::new();
        validate_header(&invoice_number, &customer, &currency, &mut errors);
        let items = match patch.items {
            Some(drafts) => {
                validate_items(&drafts, &mut errors);
                drafts.into_iter().map(Item::from_draft).collect()
            }
            None => self.items.clone(),
        };
        errors.into_result()?;

        let mut merged = Self {
            id: self.id,
            invoice_number,
            customer,
            invoice_date: patch.invoice_date.unwrap_or(self.invoice_date),
            due_date: patch.due_date.unwrap_or(self.due_date),
            currency,
            notes: patch.notes.unwrap_or_else(|| self.notes.clone()),
            status: patch.status.unwrap_or(self.status),
            items,
            subtotal: 0.0,
            tax_total: 0.0,
            grand_total: 0.0,
            created_at: self.created_at,
            updated_at: next_update_timestamp(self.updated_at, now),
        };
        merged.recompute();
        Ok(merged)
    }

    /// Recompute every item's derived fields and the invoice totals.
    ///
    /// Records read from storage are trusted as written; call this before persisting any
    /// invoice whose items may have been touched.
    pub fn recompute(&mut self) {
        for item in &mut self.items {
            item.recompute();
        }
        let totals = compute_invoice_totals(&self.items);
        self.subtotal = totals.subtotal;
        self.tax_total = totals.tax_total;
        self.grand_total = totals.grand_total;
    }

    /// Whether every derived field agrees with the raw item inputs.
    pub fn is_consistent(&self) -> bool {
        self.items.iter().all(Item::is_consistent)
            && self.totals() == compute_invoice_totals(&self.items)
    }

    /// Draft reproducing this invoice, for edit forms.
    pub fn to_draft(&self) -> NewInvoice {
        NewInvoice {
            invoice_number: self.invoice_number.clone(),
            customer: self.customer.clone(),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            currency: self.currency.clone(),
            notes: self.notes.clone(),
            status: self.status,
            items: self.items.iter().map(Item::to_draft).collect(),
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn subtotal(&self) -> f64 {
        self.subtotal
    }

    pub fn tax_total(&self) -> f64 {
        self.tax_total
    }

    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            tax_total: self.tax_total,
            grand_total: self.grand_total,
        }
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn validate_header(
    invoice_number: &str,
    customer: &CustomerSnapshot,
    currency: &str,
    errors: &mut ValidationErrors,
) {
    errors.require("invoiceNumber", invoice_number);
    customer.validate_into(errors);
    if !is_currency_code(currency.trim()) {
        errors.push("currency", "must be a three-letter uppercase currency code");
    }
}

fn validate_items(items: &[NewItem], errors: &mut ValidationErrors) {
    if items.is_empty() {
        errors.push("items", "at least one item is required");
    }
    let mut seen = HashSet::new();
    for (position, item) in items.iter().enumerate() {
        item.validate_into(position, errors);
        if let Some(id) = item.id {
            if !seen.insert(id) {
                errors.push(format!("items[{position}].id"), "duplicates another item id");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use invoicer_parties::{CustomerPatch, NewCustomer};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn draft() -> NewInvoice {
        NewInvoice {
            invoice_number: "INV-001".to_string(),
            customer: CustomerSnapshot::new("John Doe", "john@example.com", "1 Main St"),
            invoice_date: date("2024-03-15"),
            due_date: date("2024-04-15"),
            currency: "USD".to_string(),
            notes: String::new(),
            status: InvoiceStatus::Draft,
            items: vec![NewItem::new("Web Development", 2, 100.0, 10.0)],
        }
    }

    #[test]
    fn create_computes_item_and_invoice_totals() {
        let invoice = Invoice::create(draft(), Utc::now()).unwrap();

        let item = &invoice.items()[0];
        assert_eq!(item.subtotal(), 200.0);
        assert_eq!(item.tax_amount(), 20.0);
        assert_eq!(item.total(), 220.0);
        assert_eq!(
            invoice.totals(),
            InvoiceTotals {
                subtotal: 200.0,
                tax_total: 20.0,
                grand_total: 220.0
            }
        );
        assert!(invoice.is_consistent());
        assert_eq!(invoice.created_at(), invoice.updated_at());
    }

    #[test]
    fn validation_reports_every_defect() {
        let mut input = draft();
        input.invoice_number = " ".to_string();
        input.customer.name = String::new();
        input.currency = "usd".to_string();
        input.items = vec![NewItem::new("", 0, -1.0, 150.0)];

        let err = Invoice::create(input, Utc::now()).unwrap_err();
        for field in [
            "invoiceNumber",
            "customer.name",
            "currency",
            "items[0].description",
            "items[0].quantity",
            "items[0].unitPrice",
            "items[0].taxRate",
        ] {
            assert!(err.has_field(field), "missing error for {field}: {err}");
        }
    }

    #[test]
    fn invoice_needs_at_least_one_item() {
        let mut input = draft();
        input.items.clear();
        let err = Invoice::create(input, Utc::now()).unwrap_err();
        assert!(err.has_field("items"));
    }

    #[test]
    fn due_date_before_invoice_date_is_accepted() {
        let mut input = draft();
        input.due_date = date("2024-01-01");
        assert!(Invoice::create(input, Utc::now()).is_ok());
    }

    #[test]
    fn patching_items_recomputes_totals_and_keeps_identity() {
        let now = Utc::now();
        let invoice = Invoice::create(draft(), now).unwrap();
        let kept_id = invoice.items()[0].id();

        let mut items = invoice.to_draft().items;
        items[0].quantity = 3;
        items.push(NewItem::new("Hosting", 1, 50.0, 0.0));

        let updated = invoice
            .apply_patch(
                InvoicePatch {
                    items: Some(items),
                    ..InvoicePatch::default()
                },
                now,
            )
            .unwrap();

        assert_eq!(updated.id(), invoice.id());
        assert_eq!(updated.items()[0].id(), kept_id);
        assert_eq!(updated.subtotal(), 350.0);
        assert_eq!(updated.tax_total(), 30.0);
        assert_eq!(updated.grand_total(), 380.0);
        assert!(updated.updated_at() > invoice.updated_at());
        assert_eq!(updated.created_at(), invoice.created_at());
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let invoice = Invoice::create(draft(), Utc::now()).unwrap();
        let item = invoice.items()[0].to_draft();
        let patch = InvoicePatch {
            items: Some(vec![item.clone(), item]),
            ..InvoicePatch::default()
        };
        let err = invoice.apply_patch(patch, Utc::now()).unwrap_err();
        assert!(err.has_field("items[1].id"));
    }

    #[test]
    fn recompute_repairs_stale_derived_fields() {
        let invoice = Invoice::create(draft(), Utc::now()).unwrap();
        let mut json = serde_json::to_value(&invoice).unwrap();
        json["items"][0]["total"] = serde_json::json!(9999.0);
        json["grandTotal"] = serde_json::json!(1.0);

        let mut stale: Invoice = serde_json::from_value(json).unwrap();
        assert!(!stale.is_consistent());
        assert_eq!(compute_invoice_totals(stale.items()).grand_total, 220.0);

        stale.recompute();
        assert!(stale.is_consistent());
        assert_eq!(stale, invoice);
    }

    #[test]
    fn customer_snapshot_does_not_follow_customer_edits() {
        let now = Utc::now();
        let customer =
            Customer::create(NewCustomer::new("Jane", "jane@example.com", "1 Main St"), now)
                .unwrap();

        let mut input = draft();
        input.customer = CustomerSnapshot::of(&customer);
        let invoice = Invoice::create(input, now).unwrap();

        let moved = customer
            .apply_patch(
                CustomerPatch {
                    address: Some("99 New Rd".to_string()),
                    ..CustomerPatch::default()
                },
                now + Duration::seconds(1),
            )
            .unwrap();

        assert_eq!(moved.address(), "99 New Rd");
        assert_eq!(invoice.customer().address, "1 Main St");
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert_eq!("PAID".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert!("pending".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn serializes_with_indexable_camel_case_keys() {
        let invoice = Invoice::create(draft(), Utc::now()).unwrap();
        let json = serde_json::to_value(&invoice).unwrap();

        assert_eq!(json["invoiceNumber"], "INV-001");
        assert_eq!(json["invoiceDate"], "2024-03-15");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["customer"]["name"], "John Doe");
        assert_eq!(json["items"][0]["taxAmount"], 20.0);
    }
}
