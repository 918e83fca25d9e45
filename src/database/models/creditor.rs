use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{check_email, clear_reference, finish, require, require_if_present, Case, Validate};
use crate::database::scope::{ScopedEntity, TenantId};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Creditor {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub case_id: Option<Uuid>,
    pub name: String,
    /// Tax identifier (CIF/NIF); unique within the tenant when present
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub debt_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCreditor {
    pub case_id: Option<Uuid>,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub debt_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreditorPatch {
    pub case_id: Option<Uuid>,
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub debt_amount: Option<Decimal>,
}

fn check_common(errors: &mut FieldErrors, email: Option<&String>, debt: Option<Decimal>) {
    if let Some(email) = email {
        check_email(errors, "email", email);
    }
    if matches!(debt, Some(d) if d.is_sign_negative()) {
        errors.insert("debt_amount".to_string(), "Amount cannot be negative".to_string());
    }
}

fn normalize_tax_id(tax_id: Option<String>) -> Option<String> {
    tax_id
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
}

impl Validate for NewCreditor {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name", &self.name);
        check_common(&mut errors, self.email.as_ref(), self.debt_amount);
        finish(errors)
    }
}

impl Validate for CreditorPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_if_present(&mut errors, "name", self.name.as_ref());
        check_common(&mut errors, self.email.as_ref(), self.debt_amount);
        finish(errors)
    }
}

impl ScopedEntity for Creditor {
    type Create = NewCreditor;
    type Update = CreditorPatch;

    const LABEL: &'static str = "Creditor";

    fn on_parent_deleted(&mut self, parent: &str, id: Uuid) -> bool {
        if parent == Case::LABEL {
            clear_reference(&mut self.case_id, id);
        }
        false
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(tenant: TenantId, input: NewCreditor) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            case_id: input.case_id,
            name: input.name.trim().to_string(),
            tax_id: normalize_tax_id(input.tax_id),
            email: input.email.map(|e| e.trim().to_ascii_lowercase()),
            phone: input.phone,
            address: input.address,
            debt_amount: input.debt_amount,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: CreditorPatch) {
        if input.case_id.is_some() {
            self.case_id = input.case_id;
        }
        if let Some(name) = input.name {
            self.name = name.trim().to_string();
        }
        if input.tax_id.is_some() {
            self.tax_id = normalize_tax_id(input.tax_id);
        }
        if let Some(email) = input.email {
            self.email = Some(email.trim().to_ascii_lowercase());
        }
        if input.phone.is_some() {
            self.phone = input.phone;
        }
        if input.address.is_some() {
            self.address = input.address;
        }
        if input.debt_amount.is_some() {
            self.debt_amount = input.debt_amount;
        }
        self.updated_at = Utc::now();
    }

    fn unique_key(&self) -> Option<String> {
        self.tax_id.clone()
    }

    fn conflict_message() -> String {
        "A creditor with this tax id already exists".to_string()
    }
}
