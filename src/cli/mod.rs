pub mod commands;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::database::Database;

#[derive(Parser)]
#[command(name = "lexcase")]
#[command(about = "Lexcase CLI - database and tenant administration")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending schema migrations and seed the catalog")]
    Migrate,

    #[command(about = "Tenant provisioning and status")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "User accounts")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Connect with the same configuration the server uses
pub fn connect() -> anyhow::Result<Database> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    Database::connect_lazy(&config.database).context("failed to configure database pool")
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let database = connect()?;

    let result = match cli.command {
        Commands::Migrate => commands::migrate::handle(&database, output_format).await,
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, &database, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, &database, output_format).await,
    };

    database.close().await;
    result
}
