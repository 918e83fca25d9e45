use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::scope::{ScopedEntity, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Already-validated user with a hashed password
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

impl ScopedEntity for User {
    type Create = NewUser;
    type Update = UserPatch;

    const LABEL: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(tenant: TenantId, input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            email: input.email.trim().to_ascii_lowercase(),
            name: input.name.trim().to_string(),
            password_hash: input.password_hash,
            role: input.role,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: UserPatch) {
        if let Some(name) = input.name {
            self.name = name.trim().to_string();
        }
        if let Some(password_hash) = input.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(role) = input.role {
            self.role = role;
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
        "A user with this email already exists".to_string()
    }
}
