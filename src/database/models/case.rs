use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{clear_reference, finish, require, require_if_present, text_enum, Lawyer, Validate};
use crate::database::scope::{ScopedEntity, TenantId};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Closed,
    Archived,
}

text_enum!(CaseStatus, "case status", {
    Open => "open",
    InProgress => "in_progress",
    Closed => "closed",
    Archived => "archived",
});

/// A judicial process followed by the firm
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Case {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub case_number: String,
    pub title: String,
    pub debtor_name: String,
    pub court: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CaseStatus,
    pub process_type_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub guarantee_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub amount_claimed: Option<Decimal>,
    pub filed_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCase {
    pub case_number: String,
    pub title: Option<String>,
    pub debtor_name: String,
    pub court: Option<String>,
    pub status: Option<CaseStatus>,
    pub process_type_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub guarantee_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub amount_claimed: Option<Decimal>,
    pub filed_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CasePatch {
    pub case_number: Option<String>,
    pub title: Option<String>,
    pub debtor_name: Option<String>,
    pub court: Option<String>,
    pub status: Option<CaseStatus>,
    pub process_type_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub guarantee_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub amount_claimed: Option<Decimal>,
    pub filed_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

fn check_amount(errors: &mut FieldErrors, amount: Option<Decimal>) {
    if matches!(amount, Some(a) if a.is_sign_negative()) {
        errors.insert("amount_claimed".to_string(), "Amount cannot be negative".to_string());
    }
}

impl Validate for NewCase {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "case_number", &self.case_number);
        require(&mut errors, "debtor_name", &self.debtor_name);
        check_amount(&mut errors, self.amount_claimed);
        finish(errors)
    }
}

impl Validate for CasePatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_if_present(&mut errors, "case_number", self.case_number.as_ref());
        require_if_present(&mut errors, "debtor_name", self.debtor_name.as_ref());
        check_amount(&mut errors, self.amount_claimed);
        finish(errors)
    }
}

impl ScopedEntity for Case {
    type Create = NewCase;
    type Update = CasePatch;

    const LABEL: &'static str = "Judicial process";

    fn on_parent_deleted(&mut self, parent: &str, id: Uuid) -> bool {
        if parent == Lawyer::LABEL {
            clear_reference(&mut self.lawyer_id, id);
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

    fn build(tenant: TenantId, input: NewCase) -> Self {
        let now = Utc::now();
        let case_number = input.case_number.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            title: input
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| case_number.clone()),
            case_number,
            debtor_name: input.debtor_name.trim().to_string(),
            court: input.court,
            status: input.status.unwrap_or(CaseStatus::Open),
            process_type_id: input.process_type_id,
            product_id: input.product_id,
            guarantee_id: input.guarantee_id,
            lawyer_id: input.lawyer_id,
            amount_claimed: input.amount_claimed,
            filed_on: input.filed_on,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: CasePatch) {
        if let Some(case_number) = input.case_number {
            self.case_number = case_number.trim().to_string();
        }
        if let Some(title) = input.title {
            self.title = title.trim().to_string();
        }
        if let Some(debtor_name) = input.debtor_name {
            self.debtor_name = debtor_name.trim().to_string();
        }
        if input.court.is_some() {
            self.court = input.court;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        if input.process_type_id.is_some() {
            self.process_type_id = input.process_type_id;
        }
        if input.product_id.is_some() {
            self.product_id = input.product_id;
        }
        if input.guarantee_id.is_some() {
            self.guarantee_id = input.guarantee_id;
        }
        if input.lawyer_id.is_some() {
            self.lawyer_id = input.lawyer_id;
        }
        if input.amount_claimed.is_some() {
            self.amount_claimed = input.amount_claimed;
        }
        if input.filed_on.is_some() {
            self.filed_on = input.filed_on;
        }
        if input.notes.is_some() {
            self.notes = input.notes;
        }
        self.updated_at = Utc::now();
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.case_number.clone())
    }

    fn conflict_message() -> String {
        "A judicial process with this case number already exists".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_case() -> NewCase {
        NewCase {
            case_number: " 123/2024 ".into(),
            title: None,
            debtor_name: "Construcciones Pérez SL".into(),
            court: None,
            status: None,
            process_type_id: None,
            product_id: None,
            guarantee_id: None,
            lawyer_id: None,
            amount_claimed: None,
            filed_on: None,
            notes: None,
        }
    }

    #[test]
    fn build_defaults_title_and_status() {
        let case = Case::build(TenantId::from(Uuid::new_v4()), new_case());
        assert_eq!(case.case_number, "123/2024");
        assert_eq!(case.title, "123/2024");
        assert_eq!(case.status, CaseStatus::Open);
    }

    #[test]
    fn negative_amount_is_rejected() {
        let input = NewCase {
            amount_claimed: Some(Decimal::new(-100, 2)),
            ..new_case()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.contains_key("amount_claimed"));
    }

    #[test]
    fn status_deserializes_from_snake_case() {
        let patch: CasePatch = serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(patch.status, Some(CaseStatus::InProgress));
        assert!(serde_json::from_str::<CasePatch>(r#"{"status":"lost"}"#).is_err());
    }
}
