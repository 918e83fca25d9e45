use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{check_email, finish, require, require_if_present, Validate};
use crate::database::scope::{ScopedEntity, TenantId};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lawyer {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Bar association membership number
    pub bar_number: Option<String>,
    pub specialty: Option<String>,
    pub province_code: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLawyer {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bar_number: Option<String>,
    pub specialty: Option<String>,
    pub province_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LawyerPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bar_number: Option<String>,
    pub specialty: Option<String>,
    pub province_code: Option<String>,
    pub active: Option<bool>,
}

impl Validate for NewLawyer {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "full_name", &self.full_name);
        check_email(&mut errors, "email", &self.email);
        finish(errors)
    }
}

impl Validate for LawyerPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_if_present(&mut errors, "full_name", self.full_name.as_ref());
        if let Some(email) = &self.email {
            check_email(&mut errors, "email", email);
        }
        finish(errors)
    }
}

impl ScopedEntity for Lawyer {
    type Create = NewLawyer;
    type Update = LawyerPatch;

    const LABEL: &'static str = "Lawyer";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(tenant: TenantId, input: NewLawyer) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            full_name: input.full_name.trim().to_string(),
            email: input.email.trim().to_ascii_lowercase(),
            phone: input.phone,
            bar_number: input.bar_number,
            specialty: input.specialty,
            province_code: input.province_code,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: LawyerPatch) {
        if let Some(full_name) = input.full_name {
            self.full_name = full_name.trim().to_string();
        }
        if let Some(email) = input.email {
            self.email = email.trim().to_ascii_lowercase();
        }
        if input.phone.is_some() {
            self.phone = input.phone;
        }
        if input.bar_number.is_some() {
            self.bar_number = input.bar_number;
        }
        if input.specialty.is_some() {
            self.specialty = input.specialty;
        }
        if input.province_code.is_some() {
            self.province_code = input.province_code;
        }
        if let Some(active) = input.active {
            self.active = active;
        }
        self.updated_at = Utc::now();
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }

    fn conflict_message() -> String {
        "A lawyer with this email already exists".to_string()
    }
}
