use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoicer_core::validate::is_email;
use invoicer_core::{Entity, ValidationErrors, next_update_timestamp, record_id_newtype};

record_id_newtype!(
    /// Customer identifier.
    CustomerId
);

/// Input for creating a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewCustomer {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// Check required fields and the e-mail shape, reporting every problem.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_fields(&self.name, &self.email, &self.address)
    }
}

/// Partial update of a customer.
///
/// `None` keeps the existing value. For the optional fields, `Some("")` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tax_id: Option<String>,
    pub notes: Option<String>,
}

/// A stored customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    id: CustomerId,
    name: String,
    email: String,
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Customer {
    /// Build a new customer with a freshly generated id.
    pub fn create(input: NewCustomer, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        Self::create_with_id(CustomerId::new(), input, now)
    }

    pub fn create_with_id(
        id: CustomerId,
        input: NewCustomer,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            address: input.address.trim().to_string(),
            phone: normalize_optional(input.phone),
            company: normalize_optional(input.company),
            tax_id: normalize_optional(input.tax_id),
            notes: normalize_optional(input.notes),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge `patch` over this customer and bump `updated_at`.
    ///
    /// The id and creation time never change. The merged record is re-validated as a whole.
    pub fn apply_patch(
        &self,
        patch: CustomerPatch,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let merged = Self {
            id: self.id,
            name: patch.name.map_or_else(|| self.name.clone(), |v| v.trim().to_string()),
            email: patch.email.map_or_else(|| self.email.clone(), |v| v.trim().to_string()),
            address: patch
                .address
                .map_or_else(|| self.address.clone(), |v| v.trim().to_string()),
            phone: merge_optional(&self.phone, patch.phone),
            company: merge_optional(&self.company, patch.company),
            tax_id: merge_optional(&self.tax_id, patch.tax_id),
            notes: merge_optional(&self.notes, patch.notes),
            created_at: self.created_at,
            updated_at: next_update_timestamp(self.updated_at, now),
        };
        validate_fields(&merged.name, &merged.email, &merged.address)?;
        Ok(merged)
    }

    /// Case-insensitive substring match over name, email and company.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
            || self
                .company
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle))
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Entity for Customer {
    type Id = CustomerId;

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

fn validate_fields(name: &str, email: &str, address: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("name", name);
    errors.require("email", email);
    if !email.trim().is_empty() && !is_email(email) {
        errors.push("email", "is not a valid e-mail address");
    }
    errors.require("address", address);
    errors.into_result()
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn merge_optional(existing: &Option<String>, patch: Option<String>) -> Option<String> {
    match patch {
        None => existing.clone(),
        Some(v) => normalize_optional(Some(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jane() -> NewCustomer {
        NewCustomer {
            phone: Some(" 555-0100 ".to_string()),
            company: Some("Acme Ltd".to_string()),
            ..NewCustomer::new("Jane Doe", "jane@example.com", "1 Main St")
        }
    }

    #[test]
    fn create_sets_matching_timestamps_and_trims() {
        let now = Utc::now();
        let customer = Customer::create(jane(), now).unwrap();

        assert_eq!(customer.created_at(), now);
        assert_eq!(customer.updated_at(), now);
        assert_eq!(customer.phone(), Some("555-0100"));
        assert_eq!(customer.tax_id(), None);
    }

    #[test]
    fn create_reports_all_missing_fields_together() {
        let err = Customer::create(NewCustomer::default(), Utc::now()).unwrap_err();

        assert_eq!(err.len(), 3);
        assert!(err.has_field("name"));
        assert!(err.has_field("email"));
        assert!(err.has_field("address"));
    }

    #[test]
    fn create_rejects_malformed_email() {
        let input = NewCustomer::new("Jane", "jane-at-example", "1 Main St");
        let err = Customer::create(input, Utc::now()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_field("email"));
    }

    #[test]
    fn patch_keeps_id_and_created_at_and_bumps_updated_at() {
        let now = Utc::now();
        let customer = Customer::create(jane(), now).unwrap();

        let patch = CustomerPatch {
            name: Some("Jane Smith".to_string()),
            company: Some(String::new()),
            ..CustomerPatch::default()
        };
        // Same instant: the update timestamp must still move forward.
        let updated = customer.apply_patch(patch, now).unwrap();

        assert_eq!(updated.id(), customer.id());
        assert_eq!(updated.created_at(), customer.created_at());
        assert!(updated.updated_at() > customer.updated_at());
        assert_eq!(updated.name(), "Jane Smith");
        assert_eq!(updated.email(), "jane@example.com");
        assert_eq!(updated.company(), None);
        assert_eq!(updated.phone(), Some("555-0100"));
    }

    #[test]
    fn patch_that_blanks_a_required_field_is_rejected() {
        let customer = Customer::create(jane(), Utc::now()).unwrap();
        let patch = CustomerPatch {
            email: Some("   ".to_string()),
            ..CustomerPatch::default()
        };
        let err = customer
            .apply_patch(patch, Utc::now() + Duration::seconds(1))
            .unwrap_err();
        assert!(err.has_field("email"));
    }

    #[test]
    fn matches_is_case_insensitive_over_name_email_and_company() {
        let customer = Customer::create(jane(), Utc::now()).unwrap();
        assert!(customer.matches("JANE"));
        assert!(customer.matches("example.com"));
        assert!(customer.matches("acme"));
        assert!(customer.matches(""));
        assert!(!customer.matches("globex"));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let customer = Customer::create(jane(), Utc::now()).unwrap();
        let json = serde_json::to_value(&customer).unwrap();

        assert_eq!(json["name"], "Jane Doe");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("taxId").is_none());

        let back: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(back, customer);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: every patch strictly advances `updated_at` and never touches the id.
            #[test]
            fn patches_always_advance_updated_at(
                names in prop::collection::vec("[A-Za-z][A-Za-z ]{0,20}", 1..8)
            ) {
                let now = Utc::now();
                let mut customer = Customer::create(jane(), now).unwrap();
                let id = customer.id_typed();

                for name in names {
                    let before = customer.updated_at();
                    let patch = CustomerPatch { name: Some(name), ..CustomerPatch::default() };
                    customer = customer.apply_patch(patch, now).unwrap();
                    prop_assert!(customer.updated_at() > before);
                    prop_assert_eq!(customer.id_typed(), id);
                }
            }
        }
    }
}
