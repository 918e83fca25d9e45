// handlers/public/usuarios/mod.rs - token acquisition within a tenant
//
// Both routes require a resolved tenant: accounts exist per tenant and the
// issued token is bound to it.

use serde::Serialize;

use crate::auth::TokenKeys;
use crate::database::models::User;
use crate::error::ApiError;

pub mod login; // POST /api/usuarios/login
pub mod register; // POST /api/usuarios/register

pub use login::login;
pub use register::register;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

impl TokenResponse {
    pub(crate) fn issue(keys: &TokenKeys, user: User) -> Result<Self, ApiError> {
        Ok(Self {
            token: keys.issue(&user)?,
            token_type: "Bearer",
            expires_in: keys.expiry_seconds(),
            user,
        })
    }
}
