use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{clear_reference, finish, require, require_if_present, Case, User, Validate};
use crate::database::scope::{ScopedEntity, TenantId};
use crate::error::FieldErrors;

/// Calendar entry (hearing, deadline, meeting)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub case_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub case_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(skip)]
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub case_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
}

impl Event {
    /// Checks that need the merged row, not just the patch
    pub fn check_window(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(ends_at) = self.ends_at {
            if ends_at < self.starts_at {
                errors.insert("ends_at".to_string(), "End must not be before start".to_string());
            }
        }
        finish(errors)
    }
}

impl Validate for NewEvent {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title);
        if let Some(ends_at) = self.ends_at {
            if ends_at < self.starts_at {
                errors.insert("ends_at".to_string(), "End must not be before start".to_string());
            }
        }
        finish(errors)
    }
}

impl Validate for EventPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_if_present(&mut errors, "title", self.title.as_ref());
        finish(errors)
    }
}

impl ScopedEntity for Event {
    type Create = NewEvent;
    type Update = EventPatch;

    const LABEL: &'static str = "Event";

    fn on_parent_deleted(&mut self, parent: &str, id: Uuid) -> bool {
        if parent == Case::LABEL {
            clear_reference(&mut self.case_id, id);
        } else if parent == User::LABEL {
            clear_reference(&mut self.owner_id, id);
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

    fn build(tenant: TenantId, input: NewEvent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            case_id: input.case_id,
            title: input.title.trim().to_string(),
            description: input.description,
            location: input.location,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            all_day: input.all_day,
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: EventPatch) {
        if input.case_id.is_some() {
            self.case_id = input.case_id;
        }
        if let Some(title) = input.title {
            self.title = title.trim().to_string();
        }
        if input.description.is_some() {
            self.description = input.description;
        }
        if input.location.is_some() {
            self.location = input.location;
        }
        if let Some(starts_at) = input.starts_at {
            self.starts_at = starts_at;
        }
        if input.ends_at.is_some() {
            self.ends_at = input.ends_at;
        }
        if let Some(all_day) = input.all_day {
            self.all_day = all_day;
        }
        self.updated_at = Utc::now();
    }
}
