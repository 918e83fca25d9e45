use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{clear_reference, finish, require, require_if_present, text_enum, Case, User, Validate};
use crate::database::scope::{ScopedEntity, TenantId};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Call,
    Email,
    Meeting,
    Filing,
    Hearing,
    Note,
}

text_enum!(ActivityKind, "activity kind", {
    Call => "call",
    Email => "email",
    Meeting => "meeting",
    Filing => "filing",
    Hearing => "hearing",
    Note => "note",
});

/// Work logged against a case
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub case_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: ActivityKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub case_id: Uuid,
    pub kind: ActivityKind,
    pub description: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    /// Stamped from the authenticated user
    #[serde(skip)]
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    pub kind: Option<ActivityKind>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
}

fn check_duration(errors: &mut FieldErrors, minutes: Option<i32>) {
    if matches!(minutes, Some(m) if m < 0) {
        errors.insert("duration_minutes".to_string(), "Duration cannot be negative".to_string());
    }
}

impl Validate for NewActivity {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "description", &self.description);
        check_duration(&mut errors, self.duration_minutes);
        finish(errors)
    }
}

impl Validate for ActivityPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_if_present(&mut errors, "description", self.description.as_ref());
        check_duration(&mut errors, self.duration_minutes);
        finish(errors)
    }
}

impl ScopedEntity for Activity {
    type Create = NewActivity;
    type Update = ActivityPatch;

    const LABEL: &'static str = "Activity";

    /// Activities cascade with their case
    fn on_parent_deleted(&mut self, parent: &str, id: Uuid) -> bool {
        if parent == User::LABEL {
            clear_reference(&mut self.created_by, id);
        }
        parent == Case::LABEL && self.case_id == id
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

    fn build(tenant: TenantId, input: NewActivity) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            case_id: input.case_id,
            kind: input.kind,
            description: input.description.trim().to_string(),
            occurred_at: input.occurred_at.unwrap_or(now),
            duration_minutes: input.duration_minutes,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: ActivityPatch) {
        if let Some(kind) = input.kind {
            self.kind = kind;
        }
        if let Some(description) = input.description {
            self.description = description.trim().to_string();
        }
        if let Some(occurred_at) = input.occurred_at {
            self.occurred_at = occurred_at;
        }
        if input.duration_minutes.is_some() {
            self.duration_minutes = input.duration_minutes;
        }
        self.updated_at = Utc::now();
    }
}
