use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::schema;
use crate::database::Database;

pub async fn handle(database: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    let applied = schema::migrate(database.pool()).await?;

    let message = if applied.is_empty() {
        "Schema is up to date".to_string()
    } else {
        format!("Applied {} migration(s): {}", applied.len(), applied.join(", "))
    };
    output_success(output_format, &message, Some(json!({ "applied": applied })))
}
