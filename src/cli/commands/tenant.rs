use std::sync::Arc;

use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::models::{NewTenant, TenantStatus, TenantUpdate};
use crate::database::postgres::PgTenantStore;
use crate::database::{Database, TenantStore};
use crate::services::TenantProvisioner;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Provision a tenant (no-op when the subdomain exists)")]
    Provision {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,

        #[arg(long, help = "Display name")]
        name: Option<String>,

        #[arg(long, help = "Legal company name")]
        company: Option<String>,

        #[arg(long, help = "Custom domain")]
        domain: Option<String>,
    },

    #[command(about = "List all tenants")]
    List,

    #[command(about = "Change tenant status")]
    Status {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,

        #[arg(help = "active, inactive or suspended")]
        status: String,
    },
}

pub async fn handle(cmd: TenantCommands, database: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    let store: Arc<dyn TenantStore> = Arc::new(PgTenantStore::new(database));

    match cmd {
        TenantCommands::Provision {
            subdomain,
            name,
            company,
            domain,
        } => {
            let request = NewTenant {
                name,
                company_name: company,
                custom_domain: domain,
                ..NewTenant::for_subdomain(subdomain)
            };
            let outcome = TenantProvisioner::new(store).provision(request).await?;
            let message = if outcome.created {
                format!("Provisioned tenant {}", outcome.tenant.subdomain)
            } else {
                format!("Tenant {} already exists", outcome.tenant.subdomain)
            };
            output_success(
                output_format,
                &message,
                Some(json!({ "created": outcome.created, "tenant": outcome.tenant })),
            )
        }
        TenantCommands::List => {
            let tenants = store.list().await?;
            if tenants.is_empty() {
                return output_empty_collection(output_format, "tenants", "No tenants provisioned");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "tenants": tenants }))?);
                }
                OutputFormat::Text => {
                    println!("{:<20} {:<30} {:<10} {:<25} {}", "SUBDOMAIN", "NAME", "STATUS", "CUSTOM DOMAIN", "CREATED");
                    println!("{}", "-".repeat(105));
                    for tenant in &tenants {
                        println!(
                            "{:<20} {:<30} {:<10} {:<25} {}",
                            tenant.subdomain,
                            tenant.name,
                            tenant.status,
                            tenant.custom_domain.as_deref().unwrap_or("-"),
                            tenant.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
        TenantCommands::Status { subdomain, status } => {
            let status: TenantStatus = status.parse()?;
            let tenant = store
                .find_by_subdomain(&subdomain.to_ascii_lowercase())
                .await?
                .ok_or_else(|| anyhow!("Tenant '{}' not found", subdomain))?;

            let update = TenantUpdate {
                status: Some(status),
                ..Default::default()
            };
            let tenant = store
                .update(tenant.id, update)
                .await?
                .ok_or_else(|| anyhow!("Tenant '{}' disappeared during update", subdomain))?;
            output_success(
                output_format,
                &format!("Tenant {} is now {}", tenant.subdomain, tenant.status),
                Some(json!({ "tenant": tenant })),
            )
        }
    }
}
