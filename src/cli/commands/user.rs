use anyhow::{anyhow, bail};
use clap::Subcommand;
use serde_json::json;

use crate::auth::{hash_password, MIN_PASSWORD_LEN};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::catalog::ROLE_ADMIN;
use crate::database::models::{NewUser, User};
use crate::database::postgres::{PgCatalogStore, PgScoped, PgTenantStore};
use crate::database::{CatalogStore, Database, ScopedRepository, TenantId, TenantStore};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user in a tenant. The only way to create root accounts.")]
    Create {
        #[arg(long, help = "Tenant subdomain")]
        tenant: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long, env = "LEXCASE_USER_PASSWORD", help = "Password (or LEXCASE_USER_PASSWORD)")]
        password: String,

        #[arg(long, default_value = ROLE_ADMIN)]
        role: String,
    },
}

pub async fn handle(cmd: UserCommands, database: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create {
            tenant,
            email,
            name,
            password,
            role,
        } => {
            if password.chars().count() < MIN_PASSWORD_LEN {
                bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
            }

            let tenant = PgTenantStore::new(database)
                .find_by_subdomain(&tenant.to_ascii_lowercase())
                .await?
                .ok_or_else(|| anyhow!("Tenant '{}' not found", tenant))?;
            if PgCatalogStore::new(database).role_by_name(&role).await?.is_none() {
                bail!("Unknown role '{}'", role);
            }

            let users: PgScoped<User> = PgScoped::new(database);
            let user = users
                .create(
                    TenantId::from(tenant.id),
                    NewUser {
                        email,
                        name,
                        password_hash: hash_password(&password)?,
                        role,
                    },
                )
                .await?;

            output_success(
                output_format,
                &format!("Created {} user {} in tenant {}", user.role, user.email, tenant.subdomain),
                Some(json!({ "user": user })),
            )
        }
    }
}
